//! Snapshot cache manager
//!
//! Owns the single published [`CacheSnapshot`] and its lifecycle:
//!
//! ```text
//! Empty ──pass ok──▶ Valid ──TTL──▶ Stale ──pass ok──▶ Valid
//!   │                                 │
//!   └──pass fail──▶ Empty             └──pass fail──▶ Stale (kept)
//! ```
//!
//! Once a snapshot has been published the cache never regresses to
//! `Empty`: a failed pass keeps serving the previous data as stale.
//! Consumers receive snapshots behind `Arc` and a pass publishes by
//! swapping the reference, so readers are never blocked by a refresh.
//!
//! The data source sits behind [`SnapshotSource`] so the lifecycle is
//! testable without the network; [`AdeSource`] is the production source.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, Utc};
use futures::future::BoxFuture;
use futures::FutureExt;
use futures::StreamExt;
use tokio::fs;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::app::catalog::{self, RoomCategory};
use crate::app::decoder::{self, DayFilter};
use crate::app::fetcher;
use crate::app::mirror;
use crate::app::models::{CacheSnapshot, RoomSchedule};
use crate::app::session::{AdeSession, ClientConfig};
use crate::constants::{cache as cache_constants, workers};
use crate::errors::{AppError, CacheError, CacheResult, SessionError};

/// Lifecycle state of the published snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// Nothing published yet
    Empty,
    /// A pass is in flight and nothing has ever been published
    Refreshing,
    /// Published and within its TTL
    Valid,
    /// Published but past its TTL, or the last pass failed
    Stale,
}

/// What a consumer is willing to wait for when the snapshot is stale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshPolicy {
    /// Return the stale snapshot immediately and refresh in the background
    #[default]
    ServeStaleAndRefresh,
    /// Wait for the in-flight or newly started pass to finish
    BlockUntilFresh,
}

/// Produces one full room map per refresh pass
pub trait SnapshotSource: Send + Sync + 'static {
    fn collect(&self) -> BoxFuture<'_, Result<BTreeMap<String, RoomSchedule>, AppError>>;
}

/// Cache tuning knobs
#[derive(Debug, Clone)]
pub struct CacheOptions {
    /// How long a published snapshot stays `Valid`
    pub ttl: Duration,
    /// Snapshot persistence location; `None` disables persistence
    pub state_file: Option<PathBuf>,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            ttl: cache_constants::DEFAULT_TTL,
            state_file: default_state_file(),
        }
    }
}

/// Default snapshot path under the platform cache directory
pub fn default_state_file() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| {
        dir.join(cache_constants::APP_DIR_NAME)
            .join(cache_constants::STATE_FILE_NAME)
    })
}

struct Inner<S> {
    source: S,
    options: CacheOptions,
    snapshot: RwLock<Option<Arc<CacheSnapshot>>>,
    refreshing: RwLock<bool>,
    // Serializes passes process-wide; generation lets a waiter detect that
    // the pass it queued behind already published.
    pass_lock: Mutex<()>,
    generation: AtomicU64,
}

/// Shared handle to the cache; cheap to clone
pub struct CacheManager<S> {
    inner: Arc<Inner<S>>,
}

impl<S> Clone for CacheManager<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: SnapshotSource> CacheManager<S> {
    pub fn new(source: S, options: CacheOptions) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                options,
                snapshot: RwLock::new(None),
                refreshing: RwLock::new(false),
                pass_lock: Mutex::new(()),
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Current lifecycle state; staleness is derived from the snapshot's
    /// age at the moment of the call
    pub async fn state(&self) -> CacheState {
        let snapshot = self.inner.snapshot.read().await;
        match snapshot.as_ref() {
            Some(snap) if self.is_fresh(snap) => CacheState::Valid,
            Some(_) => CacheState::Stale,
            None if *self.inner.refreshing.read().await => CacheState::Refreshing,
            None => CacheState::Empty,
        }
    }

    /// The published snapshot, if any, regardless of freshness
    pub async fn peek(&self) -> Option<Arc<CacheSnapshot>> {
        self.inner.snapshot.read().await.clone()
    }

    /// Get a snapshot under the given policy
    ///
    /// Empty always blocks on a pass. Stale either returns immediately with
    /// a background pass queued, or waits, per the policy. A failed pass on
    /// an empty cache yields `None`; it never panics and never discards a
    /// previously published snapshot.
    pub async fn get_snapshot(&self, policy: RefreshPolicy) -> Option<Arc<CacheSnapshot>> {
        {
            let snapshot = self.inner.snapshot.read().await;
            if let Some(snap) = snapshot.as_ref() {
                if self.is_fresh(snap) {
                    return Some(Arc::clone(snap));
                }
                if policy == RefreshPolicy::ServeStaleAndRefresh {
                    let stale = Arc::clone(snap);
                    self.spawn_background_pass();
                    return Some(stale);
                }
            }
        }

        match self.force_refresh().await {
            Ok(snap) => Some(snap),
            Err(e) => {
                warn!("refresh pass failed: {e}");
                self.peek().await
            }
        }
    }

    /// Run (or join) a refresh pass and return the snapshot it published
    ///
    /// If a pass is already in flight this waits for it and returns its
    /// result instead of starting a second one.
    pub async fn force_refresh(&self) -> Result<Arc<CacheSnapshot>, AppError> {
        let seen = self.inner.generation.load(Ordering::Acquire);
        let _guard = self.inner.pass_lock.lock().await;

        // The pass we queued behind already published a newer snapshot.
        if self.inner.generation.load(Ordering::Acquire) > seen {
            if let Some(snap) = self.peek().await {
                return Ok(snap);
            }
        }

        *self.inner.refreshing.write().await = true;
        let outcome = self.inner.source.collect().await;
        *self.inner.refreshing.write().await = false;

        match outcome {
            Ok(rooms) => {
                let generation = self.inner.generation.fetch_add(1, Ordering::AcqRel) + 1;
                let snap = Arc::new(CacheSnapshot::new(generation, rooms));
                *self.inner.snapshot.write().await = Some(Arc::clone(&snap));
                info!(
                    generation,
                    rooms = snap.room_count(),
                    "published fresh snapshot"
                );
                if let Err(e) = self.persist(&snap).await {
                    warn!("snapshot persistence failed: {e}");
                }
                Ok(snap)
            }
            // Previous snapshot stays published; staleness follows from its
            // age, so there is no state to roll back.
            Err(e) => Err(e),
        }
    }

    fn spawn_background_pass(&self) {
        let manager = self.clone();
        tokio::spawn(async move {
            if let Err(e) = manager.force_refresh().await {
                warn!("background refresh pass failed: {e}");
            }
        });
    }

    fn is_fresh(&self, snapshot: &CacheSnapshot) -> bool {
        let age = Utc::now().signed_duration_since(snapshot.fetched_at);
        age.to_std()
            .map(|age| age < self.inner.options.ttl)
            .unwrap_or(true)
    }

    /// Persist the snapshot atomically (temp file + rename)
    async fn persist(&self, snapshot: &CacheSnapshot) -> CacheResult<()> {
        let Some(path) = self.inner.options.state_file.as_ref() else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| CacheError::StateFile {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let payload = serde_json::to_vec_pretty(snapshot)?;
        let mut temp_path = path.clone().into_os_string();
        temp_path.push(cache_constants::TEMP_FILE_SUFFIX);
        let temp_path = PathBuf::from(temp_path);

        fs::write(&temp_path, payload)
            .await
            .map_err(|source| CacheError::StateFile {
                path: temp_path.clone(),
                source,
            })?;
        fs::rename(&temp_path, path)
            .await
            .map_err(|source| CacheError::StateFile {
                path: path.clone(),
                source,
            })?;
        debug!(path = %path.display(), "snapshot persisted");
        Ok(())
    }

    /// Load a previously persisted snapshot, pre-populating the cache
    ///
    /// The loaded snapshot is always treated as stale. Absence of the state
    /// file is not an error; a corrupt file is.
    pub async fn load_persisted(&self) -> CacheResult<bool> {
        let Some(path) = self.inner.options.state_file.as_ref() else {
            return Ok(false);
        };
        let raw = match fs::read(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(source) => {
                return Err(CacheError::StateFile {
                    path: path.clone(),
                    source,
                })
            }
        };

        let snapshot: CacheSnapshot = serde_json::from_slice(&raw)?;
        self.inner
            .generation
            .store(snapshot.generation, Ordering::Release);
        info!(
            rooms = snapshot.room_count(),
            fetched_at = %snapshot.fetched_at,
            "restored persisted snapshot"
        );
        *self.inner.snapshot.write().await = Some(Arc::new(snapshot));
        Ok(true)
    }
}

/// Production snapshot source: mirror first, full scrape as fallback
pub struct AdeSource {
    client_config: ClientConfig,
    worker_count: usize,
    mirror_client: reqwest::Client,
}

impl AdeSource {
    pub fn new(client_config: ClientConfig, worker_count: usize) -> Result<Self, SessionError> {
        let mirror_client = reqwest::Client::builder()
            .timeout(client_config.request_timeout)
            .connect_timeout(client_config.connect_timeout)
            .build()
            .map_err(SessionError::Http)?;
        Ok(Self {
            client_config,
            worker_count: worker_count.clamp(1, workers::MAX_WORKER_COUNT),
            mirror_client,
        })
    }

    async fn collect_pass(&self) -> Result<BTreeMap<String, RoomSchedule>, AppError> {
        let today = Local::now().date_naive();
        let weekday = fetcher::weekday_index(today);

        match mirror::fetch_mirror(&self.mirror_client, weekday).await {
            Ok(rooms) => {
                info!(rooms = rooms.len(), "refresh served by mirror");
                return Ok(rooms);
            }
            Err(e) => debug!("mirror unavailable ({e}), falling back to scrape"),
        }

        let session = AdeSession::negotiate(&self.client_config).await?;
        let period = fetcher::period_index(today);
        let week = fetcher::week_number(today);
        session.load_project(period).await?;

        let mut resources = Vec::new();
        let mut failed_categories = 0;
        for category in RoomCategory::ALL {
            match catalog::list_rooms(&session, category).await {
                Ok(rooms) => resources.extend(rooms),
                Err(e) => {
                    warn!(category = category.label(), "catalog bucket failed: {e}");
                    failed_categories += 1;
                }
            }
        }
        if failed_categories == RoomCategory::ALL.len() {
            return Err(AppError::generic("every catalog bucket failed"));
        }

        // Retired rooms keep their catalog entry with "old" in the number.
        resources.retain(|room| !room.room_number().contains("old"));

        let rooms: BTreeMap<String, RoomSchedule> = futures::stream::iter(resources)
            .map(|room| {
                let session = &session;
                async move {
                    let number = room.room_number().to_string();
                    let schedule = match fetcher::fetch_raw(session, &room.id, week, period).await {
                        Ok(raw) => {
                            let decoded = decoder::decode(&raw, &room.path, DayFilter::Only(weekday));
                            RoomSchedule {
                                capacity: decoded.capacity,
                                busy: decoded.busy,
                                available: decoded.available,
                            }
                        }
                        Err(e) => {
                            warn!(room = %number, "room fetch failed: {e}");
                            RoomSchedule::unavailable(catalog::room_capacity(&room.path))
                        }
                    };
                    (number, schedule)
                }
            })
            .buffer_unordered(self.worker_count)
            .collect()
            .await;

        info!(rooms = rooms.len(), "refresh served by scrape");
        Ok(rooms)
    }
}

impl SnapshotSource for AdeSource {
    fn collect(&self) -> BoxFuture<'_, Result<BTreeMap<String, RoomSchedule>, AppError>> {
        self.collect_pass().boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::app::models::{BusyInterval, ClockTime};

    /// Scripted source: yields each queued outcome once, in order
    struct StubSource {
        outcomes: Mutex<Vec<Result<BTreeMap<String, RoomSchedule>, String>>>,
    }

    impl StubSource {
        fn new(outcomes: Vec<Result<BTreeMap<String, RoomSchedule>, String>>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes),
            }
        }
    }

    impl SnapshotSource for StubSource {
        fn collect(&self) -> BoxFuture<'_, Result<BTreeMap<String, RoomSchedule>, AppError>> {
            async {
                let mut outcomes = self.outcomes.lock().await;
                outcomes
                    .remove(0)
                    .map_err(|reason| AppError::generic(reason))
            }
            .boxed()
        }
    }

    fn one_room(number: &str) -> BTreeMap<String, RoomSchedule> {
        let mut rooms = BTreeMap::new();
        rooms.insert(
            number.to_string(),
            RoomSchedule {
                capacity: Some(30),
                busy: vec![BusyInterval::new(
                    0,
                    ClockTime::new(8, 0),
                    ClockTime::new(10, 0),
                )],
                available: true,
            },
        );
        rooms
    }

    fn no_persistence(ttl: Duration) -> CacheOptions {
        CacheOptions {
            ttl,
            state_file: None,
        }
    }

    #[tokio::test]
    async fn empty_cache_blocks_on_first_pass() {
        let source = StubSource::new(vec![Ok(one_room("2101"))]);
        let cache = CacheManager::new(source, no_persistence(Duration::from_secs(3600)));

        assert_eq!(cache.state().await, CacheState::Empty);
        let snap = cache
            .get_snapshot(RefreshPolicy::ServeStaleAndRefresh)
            .await
            .unwrap();
        assert_eq!(snap.generation, 1);
        assert_eq!(snap.room_count(), 1);
        assert_eq!(cache.state().await, CacheState::Valid);
    }

    #[tokio::test]
    async fn failed_first_pass_yields_none_and_stays_empty() {
        let source = StubSource::new(vec![Err("down".to_string())]);
        let cache = CacheManager::new(source, no_persistence(Duration::from_secs(3600)));

        let snap = cache.get_snapshot(RefreshPolicy::BlockUntilFresh).await;
        assert!(snap.is_none());
        assert_eq!(cache.state().await, CacheState::Empty);
    }

    #[tokio::test]
    async fn failed_pass_keeps_previous_snapshot_untouched() {
        let source = StubSource::new(vec![Ok(one_room("2101")), Err("down".to_string())]);
        let cache = CacheManager::new(source, no_persistence(Duration::from_secs(3600)));

        let first = cache.force_refresh().await.unwrap();
        assert!(cache.force_refresh().await.is_err());

        let kept = cache.peek().await.unwrap();
        assert_eq!(kept.generation, first.generation);
        assert_eq!(kept.fetched_at, first.fetched_at);
        assert_eq!(kept.rooms, first.rooms);
    }

    #[tokio::test]
    async fn cache_never_regresses_to_empty() {
        let source = StubSource::new(vec![
            Ok(one_room("2101")),
            Err("down".to_string()),
            Err("still down".to_string()),
        ]);
        let cache = CacheManager::new(source, no_persistence(Duration::from_millis(0)));

        cache.force_refresh().await.unwrap();
        let _ = cache.force_refresh().await;
        let _ = cache.force_refresh().await;

        // TTL of zero makes the surviving snapshot stale, never absent.
        assert_eq!(cache.state().await, CacheState::Stale);
        assert!(cache.peek().await.is_some());
    }

    #[tokio::test]
    async fn successful_pass_increments_generation() {
        let source = StubSource::new(vec![Ok(one_room("2101")), Ok(one_room("2102"))]);
        let cache = CacheManager::new(source, no_persistence(Duration::from_millis(0)));

        assert_eq!(cache.force_refresh().await.unwrap().generation, 1);
        assert_eq!(cache.force_refresh().await.unwrap().generation, 2);
    }

    #[tokio::test]
    async fn fresh_snapshot_short_circuits_the_source() {
        let source = StubSource::new(vec![Ok(one_room("2101"))]);
        let cache = CacheManager::new(source, no_persistence(Duration::from_secs(3600)));

        cache.force_refresh().await.unwrap();
        // Fresh path must not consume the (now empty) outcome script.
        let snap = cache
            .get_snapshot(RefreshPolicy::BlockUntilFresh)
            .await
            .unwrap();
        assert_eq!(snap.generation, 1);
    }

    #[tokio::test]
    async fn persistence_round_trips_through_the_state_file() {
        let dir = tempfile::tempdir().unwrap();
        let state_file = dir.path().join("snapshot.json");
        let options = CacheOptions {
            ttl: Duration::from_secs(3600),
            state_file: Some(state_file.clone()),
        };

        let writer = CacheManager::new(StubSource::new(vec![Ok(one_room("2101"))]), options.clone());
        let written = writer.force_refresh().await.unwrap();
        assert!(state_file.exists());

        let reader = CacheManager::new(StubSource::new(vec![]), options);
        assert!(reader.load_persisted().await.unwrap());
        let restored = reader.peek().await.unwrap();
        assert_eq!(restored.generation, written.generation);
        assert_eq!(restored.rooms, written.rooms);
    }

    #[tokio::test]
    async fn missing_state_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let options = CacheOptions {
            ttl: Duration::from_secs(3600),
            state_file: Some(dir.path().join("absent.json")),
        };
        let cache = CacheManager::new(StubSource::new(vec![]), options);
        assert!(!cache.load_persisted().await.unwrap());
        assert_eq!(cache.state().await, CacheState::Empty);
    }

    #[tokio::test]
    async fn restored_snapshot_resumes_the_generation_counter() {
        let dir = tempfile::tempdir().unwrap();
        let options = CacheOptions {
            ttl: Duration::from_millis(0),
            state_file: Some(dir.path().join("snapshot.json")),
        };

        let writer = CacheManager::new(
            StubSource::new(vec![Ok(one_room("2101")), Ok(one_room("2102"))]),
            options.clone(),
        );
        writer.force_refresh().await.unwrap();
        writer.force_refresh().await.unwrap();

        let reader = CacheManager::new(StubSource::new(vec![Ok(one_room("2103"))]), options);
        reader.load_persisted().await.unwrap();
        assert_eq!(reader.peek().await.unwrap().generation, 2);
        assert_eq!(reader.force_refresh().await.unwrap().generation, 3);
    }
}
