//! Timetable fetcher
//!
//! Retrieving one room's weekly grid takes exactly two RPC calls, in order:
//! a "select" call (`method5getLegends`) that updates the server-side
//! planning selection, then the grid fetch (`method8getTimetable`). The
//! fetch is meaningless without the preceding select.
//!
//! The platform addresses weeks and academic periods through its own
//! numbering, anchored on a fixed Monday; the mapping below is
//! reverse-engineered from the deployed client and preserved exactly,
//! including its wrap behavior.

use chrono::{Datelike, NaiveDate};
use tracing::{debug, warn};

use crate::app::session::AdeSession;
use crate::constants::{ade, calendar, fixtures};
use crate::errors::{FetchError, FetchResult};

/// Unparsed response text for one `(room, week, period)` query
pub type RawGridPayload = String;

/// The anchor Monday the platform counts weeks and weekdays from
pub fn anchor_monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(
        calendar::ANCHOR_YEAR,
        calendar::ANCHOR_MONTH,
        calendar::ANCHOR_DAY,
    )
    .expect("anchor date is a valid calendar day")
}

/// Weekday index counted from the anchor Monday (0 = Monday)
pub fn weekday_index(date: NaiveDate) -> u8 {
    (date - anchor_monday()).num_days().rem_euclid(7) as u8
}

/// Platform week number for a date
///
/// Position in the 52-week cycle plus a fixed offset; when the offset
/// pushes the result to a full cycle the platform's correction subtracts
/// 59, which can legitimately produce negative values. Preserved as
/// observed.
pub fn week_number(date: NaiveDate) -> i64 {
    let weeks = (date - anchor_monday()).num_days().div_euclid(7);
    let mut week = weeks.rem_euclid(52) + calendar::WEEK_OFFSET;
    if week >= 52 {
        week -= calendar::WEEK_WRAP;
    }
    week
}

/// Academic-period index for a date; rolls over every September
pub fn period_index(date: NaiveDate) -> i64 {
    let year = i64::from(date.year());
    if date.month() >= calendar::PERIOD_ROLLOVER_MONTH {
        year - i64::from(calendar::ANCHOR_YEAR) + calendar::PERIOD_BASE
    } else {
        year - i64::from(calendar::ANCHOR_YEAR) - 1 + calendar::PERIOD_BASE
    }
}

/// Fetch one room's raw weekly grid
///
/// Transient failures (network, 5xx) are retried with backoff up to the
/// session's budget; 4xx responses are permanent and never retried.
pub async fn fetch_raw(
    session: &AdeSession,
    room_id: &str,
    week: i64,
    period: i64,
) -> FetchResult<RawGridPayload> {
    let max_retries = session.max_retries();
    let select_body = format!(
        "{}{room_id}|8|1|9|{week}|7|11|1|{period}|",
        fixtures::SELECT_HEADER
    );
    let timetable_body = format!(
        "{}{period}|0|10|1|11|{room_id}|10|1|11|{week}|1235|185|1|10|0|",
        fixtures::TIMETABLE_HEADER
    );

    // The select must land before the fetch on every attempt, so a retry
    // replays the whole two-call sequence.
    let mut retries = 0;
    loop {
        match fetch_attempt(session, room_id, &select_body, &timetable_body).await {
            Ok(payload) => return Ok(payload),
            Err(e) if e.is_transient() && retries < max_retries => {
                retries += 1;
                let delay = super::session::backoff_delay(retries);
                warn!(room_id, attempt = retries, "transient fetch failure: {e}, retrying");
                tokio::time::sleep(delay).await;
            }
            Err(e) if e.is_transient() => {
                return Err(FetchError::RetriesExhausted {
                    room_id: room_id.to_string(),
                    max_retries,
                });
            }
            Err(e) => return Err(e),
        }
    }
}

async fn fetch_attempt(
    session: &AdeSession,
    room_id: &str,
    select_body: &str,
    timetable_body: &str,
) -> FetchResult<RawGridPayload> {
    let tree_cookie = crate::app::catalog::RoomCategory::Video30.tree_cookie_fragment();

    let select = session
        .post_rpc(
            ade::PLANNING_SERVICE,
            select_body.to_string(),
            Some(&tree_cookie),
        )
        .await
        .map_err(|e| transient(room_id, e))?;
    check_status(room_id, select.status())?;

    let fetch = session
        .post_rpc(
            ade::PLANNING_SERVICE,
            timetable_body.to_string(),
            Some(&tree_cookie),
        )
        .await
        .map_err(|e| transient(room_id, e))?;
    check_status(room_id, fetch.status())?;

    let payload = fetch.text().await.map_err(|e| transient(room_id, e))?;
    debug!(room_id, bytes = payload.len(), "fetched raw grid");
    Ok(payload)
}

fn transient(room_id: &str, e: reqwest::Error) -> FetchError {
    FetchError::Transient {
        room_id: room_id.to_string(),
        reason: e.to_string(),
    }
}

fn check_status(room_id: &str, status: reqwest::StatusCode) -> FetchResult<()> {
    if status.is_success() {
        Ok(())
    } else if status.is_client_error() {
        Err(FetchError::Permanent {
            room_id: room_id.to_string(),
            status: status.as_u16(),
        })
    } else {
        Err(FetchError::Transient {
            room_id: room_id.to_string(),
            reason: format!("HTTP {status}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn weekday_counts_from_anchor_monday() {
        assert_eq!(weekday_index(date(2024, 12, 30)), 0);
        assert_eq!(weekday_index(date(2025, 1, 1)), 2);
        assert_eq!(weekday_index(date(2025, 1, 5)), 6);
        assert_eq!(weekday_index(date(2025, 1, 6)), 0);
    }

    #[test]
    fn week_number_matches_platform_numbering() {
        // week of 20 January 2025 is platform week 22
        assert_eq!(week_number(date(2025, 1, 20)), 22);
        assert_eq!(week_number(date(2025, 1, 26)), 22);
        assert_eq!(week_number(date(2024, 12, 30)), 19);
    }

    #[test]
    fn week_number_wrap_is_preserved_as_observed() {
        // 33 full weeks after the anchor: 33 + 19 = 52, corrected by -59
        let d = date(2025, 8, 18);
        assert_eq!((d - anchor_monday()).num_days() / 7, 33);
        assert_eq!(week_number(d), -7);
    }

    #[test]
    fn period_rolls_over_in_september() {
        assert_eq!(period_index(date(2025, 5, 15)), 12);
        assert_eq!(period_index(date(2025, 8, 31)), 12);
        assert_eq!(period_index(date(2025, 9, 1)), 13);
        assert_eq!(period_index(date(2026, 3, 10)), 13);
        assert_eq!(period_index(date(2026, 10, 1)), 14);
    }

    #[test]
    fn request_bodies_interpolate_the_query_triple() {
        let select = format!("{}{}|8|1|9|{}|7|11|1|{}|", fixtures::SELECT_HEADER, 22785, 22, 12);
        assert!(select.contains("method5getLegends"));
        assert!(select.ends_with("|22785|8|1|9|22|7|11|1|12|"));

        let fetch = format!(
            "{}{}|0|10|1|11|{}|10|1|11|{}|1235|185|1|10|0|",
            fixtures::TIMETABLE_HEADER,
            12,
            22785,
            22
        );
        assert!(fetch.contains("method8getTimetable"));
        assert!(fetch.ends_with("|25|12|0|10|1|11|22785|10|1|11|22|1235|185|1|10|0|"));
    }
}
