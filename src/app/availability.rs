//! Availability resolver
//!
//! Turns a room's sorted busy intervals and the current wall-clock time
//! into a free/occupied verdict with a "free until" horizon.

use std::collections::BTreeMap;

use crate::app::models::{AvailabilityStatus, BusyInterval, CacheSnapshot, ClockTime, FreeUntil};

/// Resolve one room's status at `now`
///
/// `busy` must be sorted by start time and restricted to a single day,
/// which is what the decoder produces under a day filter. An interval
/// starting exactly at `now` counts as occupied.
pub fn resolve(busy: &[BusyInterval], now: ClockTime) -> AvailabilityStatus {
    for interval in busy {
        if now < interval.start {
            return AvailabilityStatus::free(FreeUntil::At(interval.start));
        }
        if now < interval.end {
            return AvailabilityStatus::occupied();
        }
    }
    // Past the last interval (or there were none): free for the rest of
    // the day.
    AvailabilityStatus::free(FreeUntil::Tomorrow)
}

/// Resolve every room in a snapshot, keeping only the free ones
///
/// Rooms flagged unavailable (fetch or decode failed) are excluded rather
/// than guessed at.
pub fn free_rooms(snapshot: &CacheSnapshot, now: ClockTime) -> BTreeMap<String, FreeUntil> {
    snapshot
        .rooms
        .iter()
        .filter(|(_, schedule)| schedule.available)
        .filter_map(|(room, schedule)| {
            let status = resolve(&schedule.busy, now);
            if status.is_free {
                Some((room.clone(), status.free_until.unwrap_or(FreeUntil::Tomorrow)))
            } else {
                None
            }
        })
        .collect()
}
