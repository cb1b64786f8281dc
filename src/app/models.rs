//! Core data model for decoded room availability
//!
//! Everything downstream of the decoder speaks in terms of these types:
//! wall-clock times in the platform's display granularity, half-open busy
//! intervals, per-room schedules, and the immutable snapshot the cache
//! manager publishes.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A wall-clock time in the platform's display granularity
///
/// The quantization rules can legitimately roll a late slot over to 24:00,
/// which `chrono::NaiveTime` cannot hold, so this stays a plain pair.
/// Renders as the platform does: `08h30`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClockTime {
    pub hour: u8,
    pub minute: u8,
}

impl ClockTime {
    pub fn new(hour: u8, minute: u8) -> Self {
        Self { hour, minute }
    }

    /// Minutes since midnight, the comparison key used by the resolver
    pub fn minutes_of_day(&self) -> u32 {
        u32::from(self.hour) * 60 + u32::from(self.minute)
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}h{:02}", self.hour, self.minute)
    }
}

/// One occupied slot, half-open `[start, end)`
///
/// `day` is a weekday index counted from the anchor Monday (0 = Monday).
/// Per-room lists are sorted ascending by `(day, start, end)` and contain no
/// duplicate tuples; the decoder enforces both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BusyInterval {
    pub day: u8,
    pub start: ClockTime,
    pub end: ClockTime,
}

impl BusyInterval {
    pub fn new(day: u8, start: ClockTime, end: ClockTime) -> Self {
        Self { day, start, end }
    }
}

/// Decoded schedule for one room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSchedule {
    /// Theoretical seat count, when the catalog path carried one
    pub capacity: Option<u32>,
    /// Sorted, deduplicated busy intervals
    pub busy: Vec<BusyInterval>,
    /// False when this room's payload was malformed or unfetchable this
    /// pass; such rooms are reported as unknown, never as free
    pub available: bool,
}

impl RoomSchedule {
    /// Schedule for a room whose payload could not be decoded this pass
    pub fn unavailable(capacity: Option<u32>) -> Self {
        Self {
            capacity,
            busy: Vec::new(),
            available: false,
        }
    }
}

/// One immutable, fully-recomputed view of all room schedules
///
/// Published atomically behind an `Arc`; a refresh builds a brand-new
/// snapshot and swaps the reference, never mutating in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSnapshot {
    /// When the underlying data was fetched
    pub fetched_at: DateTime<Utc>,
    /// Monotonic publication counter
    pub generation: u64,
    /// Room number (last path segment) to schedule
    pub rooms: BTreeMap<String, RoomSchedule>,
}

impl CacheSnapshot {
    pub fn new(generation: u64, rooms: BTreeMap<String, RoomSchedule>) -> Self {
        Self {
            fetched_at: Utc::now(),
            generation,
            rooms,
        }
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}

/// Until when a free room stays free
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FreeUntil {
    /// Free until this clock time (the next interval's start)
    At(ClockTime),
    /// No further known occupancy before the next calendar day
    Tomorrow,
}

impl fmt::Display for FreeUntil {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FreeUntil::At(t) => t.fmt(f),
            FreeUntil::Tomorrow => f.write_str("demain"),
        }
    }
}

/// Free/occupied verdict for one room at one instant
///
/// Computed on demand from a snapshot, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AvailabilityStatus {
    pub is_free: bool,
    /// Present only when the room is free
    pub free_until: Option<FreeUntil>,
}

impl AvailabilityStatus {
    pub fn occupied() -> Self {
        Self {
            is_free: false,
            free_until: None,
        }
    }

    pub fn free(until: FreeUntil) -> Self {
        Self {
            is_free: true,
            free_until: Some(until),
        }
    }
}
