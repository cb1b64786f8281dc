//! Session negotiator for the timetable platform
//!
//! The platform's GWT client is stateful server-side: a session is minted by
//! the landing page cookie, then shaped by a fixed three-step handshake
//! (initial configuration, anonymous login) whose bodies are recorded
//! protocol fixtures. The session is modelled as an explicit owned resource
//! that is handed to the catalog walker and fetcher, never as a hidden
//! singleton, so independent sessions can be exercised in isolation.
//!
//! A live session must not be shared between two refresh passes; the cache
//! manager serializes passes process-wide.

use std::num::NonZeroU32;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::header::SET_COOKIE;
use reqwest::Client;
use tracing::{debug, info, warn};

use crate::constants::{ade, fixtures, http, limits};
use crate::errors::{SessionError, SessionResult};

/// HTTP client settings for one session
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Request timeout
    pub request_timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// Rate limit for remote calls (requests per second)
    pub rate_limit_rps: u32,
    /// Retry budget for transient failures
    pub max_retries: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: http::DEFAULT_TIMEOUT,
            connect_timeout: http::CONNECT_TIMEOUT,
            rate_limit_rps: limits::DEFAULT_RATE_LIMIT_RPS,
            max_retries: limits::MAX_RETRIES,
        }
    }
}

/// One negotiated, authenticated platform session
#[derive(Debug)]
pub struct AdeSession {
    client: Client,
    /// Session cookie line replayed verbatim on every RPC call
    cookie: String,
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    max_retries: u32,
}

impl AdeSession {
    /// Negotiate a fresh session: mint the cookie, then replay the fixed
    /// handshake in order, each step reusing the cookie state mutated by
    /// the previous one
    pub async fn negotiate(config: &ClientConfig) -> SessionResult<Self> {
        let client = Self::build_http_client(config)?;
        let rate_limiter = Self::build_rate_limiter(config.rate_limit_rps)?;

        let cookie = Self::mint_cookie(&client, config.max_retries).await?;
        debug!("session cookie minted");

        let session = Self {
            client,
            cookie,
            rate_limiter,
            max_retries: config.max_retries,
        };

        session
            .handshake_step(
                "initial-configuration",
                ade::CONFIGURATION_SERVICE,
                fixtures::INITIAL_CONFIGURATION_BODY.to_string(),
            )
            .await?;
        session
            .handshake_step(
                "login",
                ade::WEB_CLIENT_SERVICE,
                fixtures::LOGIN_BODY.to_string(),
            )
            .await?;

        info!("negotiated timetable platform session");
        Ok(session)
    }

    fn build_http_client(config: &ClientConfig) -> SessionResult<Client> {
        Client::builder()
            .cookie_store(true) // the platform mutates session cookies across steps
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(http::USER_AGENT)
            .pool_idle_timeout(http::POOL_IDLE_TIMEOUT)
            .pool_max_idle_per_host(http::POOL_MAX_PER_HOST)
            .build()
            .map_err(SessionError::Http)
    }

    fn build_rate_limiter(
        rate_limit_rps: u32,
    ) -> SessionResult<RateLimiter<NotKeyed, InMemoryState, DefaultClock>> {
        let quota = Quota::per_second(NonZeroU32::new(rate_limit_rps).ok_or_else(|| {
            SessionError::InvalidRateLimit {
                reason: "rate limit must be non-zero".to_string(),
            }
        })?);
        Ok(RateLimiter::direct(quota))
    }

    /// Fetch the landing page and lift the session cookie, stripping the
    /// path/secure attributes exactly as the observed web client does
    async fn mint_cookie(client: &Client, max_retries: u32) -> SessionResult<String> {
        let mut retries = 0;
        loop {
            match client.get(ade::SESSION_PAGE_URL).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_server_error() && retries < max_retries {
                        retries += 1;
                        let delay = backoff_delay(retries);
                        warn!(status = %status, "landing page error, retrying in {:?}", delay);
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    if !status.is_success() {
                        return Err(SessionError::HandshakeFailed {
                            step: "landing-page",
                            status: status.as_u16(),
                        });
                    }
                    let cookie = response
                        .headers()
                        .get(SET_COOKIE)
                        .and_then(|v| v.to_str().ok())
                        .ok_or(SessionError::CookieMissing)?;
                    return Ok(cookie.replace(ade::COOKIE_STRIP_SUFFIX, ""));
                }
                Err(e) if retries < max_retries => {
                    retries += 1;
                    let delay = backoff_delay(retries);
                    warn!("landing page unreachable: {e}. retrying in {:?}", delay);
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(SessionError::Http(e)),
            }
        }
    }

    /// One ordered handshake step; non-success after the retry budget is a
    /// connectivity failure for the whole pass
    async fn handshake_step(
        &self,
        step: &'static str,
        service: &str,
        body: String,
    ) -> SessionResult<()> {
        let mut retries = 0;
        loop {
            match self.post_rpc(service, body.clone(), None).await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_server_error() && retries < self.max_retries {
                        retries += 1;
                        tokio::time::sleep(backoff_delay(retries)).await;
                        continue;
                    }
                    if !status.is_success() {
                        return Err(SessionError::HandshakeFailed {
                            step,
                            status: status.as_u16(),
                        });
                    }
                    debug!(step, "handshake step complete");
                    return Ok(());
                }
                Err(e) if retries < self.max_retries => {
                    retries += 1;
                    let delay = backoff_delay(retries);
                    warn!(step, "handshake request failed: {e}. retrying in {:?}", delay);
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(SessionError::Http(e)),
            }
        }
    }

    /// Retry budget this session was negotiated with
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Post one GWT-RPC body to a service endpoint with the protocol's
    /// fixed header contract
    ///
    /// `extra_cookie` carries the catalog walker's tree-state fragment when
    /// a listing call needs it.
    pub(crate) async fn post_rpc(
        &self,
        service: &str,
        body: String,
        extra_cookie: Option<&str>,
    ) -> reqwest::Result<reqwest::Response> {
        self.rate_limiter.until_ready().await;

        let url = format!("{}{}", ade::MODULE_BASE_URL, service);
        let cookie = match extra_cookie {
            Some(fragment) => format!("{}{}", self.cookie, fragment),
            None => self.cookie.clone(),
        };
        self.client
            .post(&url)
            .header("Cookie", cookie)
            .header("X-GWT-Module-Base", ade::MODULE_BASE_URL)
            .header("X-GWT-Permutation", ade::GWT_PERMUTATION)
            .header("Content-Type", ade::GWT_CONTENT_TYPE)
            .body(body)
            .send()
            .await
    }

    /// Enumerate the academic-year projects as `(period_id, label)` pairs
    ///
    /// Used for startup diagnostics; the live period index is derived from
    /// the current date, not from this list.
    pub async fn project_list(&self) -> SessionResult<Vec<(String, String)>> {
        let response = self
            .post_rpc(
                ade::WEB_CLIENT_SERVICE,
                fixtures::PROJECT_LIST_BODY.to_string(),
                None,
            )
            .await
            .map_err(SessionError::Http)?;
        let body = response.text().await.map_err(SessionError::Http)?;
        Ok(parse_project_list(&body))
    }

    /// Select the academic period for this session; must run once per pass
    /// before any catalog or timetable call
    pub async fn load_project(&self, period: i64) -> SessionResult<()> {
        let body = format!("{}{}|1|", fixtures::LOAD_PROJECT_PREFIX, period);
        let response = self
            .post_rpc(ade::DIRECT_PLANNING_SERVICE, body, None)
            .await
            .map_err(SessionError::Http)?;
        let status = response.status();
        if !status.is_success() {
            return Err(SessionError::HandshakeFailed {
                step: "load-project",
                status: status.as_u16(),
            });
        }
        debug!(period, "academic period selected");
        Ok(())
    }
}

/// Exponential backoff for transient failures
pub(crate) fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_millis(limits::RETRY_BASE_DELAY_MS * 2_u64.pow(attempt))
}

/// Parse a `method4getProjectList` response into `(period_id, label)` pairs
fn parse_project_list(raw: &str) -> Vec<(String, String)> {
    raw.split("{\"")
        .skip(1)
        .filter_map(|entry| {
            let mut fields = entry.split("\"\"");
            let label = fields.next()?;
            let id = fields.next()?;
            if id.is_empty() || label.is_empty() {
                return None;
            }
            Some((id.to_string(), label.to_string()))
        })
        .collect()
}
