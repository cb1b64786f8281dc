//! Grid decoder for raw timetable payloads
//!
//! The platform answers a timetable query with a GWT-RPC envelope whose
//! leading integer table is a flattened week-long occupancy grid. The web
//! client renders it by scanning for boundary markers; this module replays
//! that scan as an explicit tokenizer plus a small state walk over the
//! integer array, with identical semantics.
//!
//! The marker band, drop threshold, slot rate, day-start clock and the two
//! minute-quantization rules are reverse-engineered from the deployed
//! client's observed output. They are reproduced bit-for-bit; a deviation
//! from recorded fixtures is a mismatch to investigate, not a bug to fix.

use tracing::debug;

use crate::app::catalog;
use crate::app::models::{BusyInterval, ClockTime};
use crate::constants::grid;

/// Which weekdays a decode pass keeps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayFilter {
    /// Keep only boundary events on this weekday index (0 = Monday)
    Only(u8),
    /// Keep all seven days
    AllDays,
}

impl DayFilter {
    fn keeps(&self, day: u8) -> bool {
        match self {
            DayFilter::Only(d) => *d == day,
            DayFilter::AllDays => true,
        }
    }
}

/// Result of decoding one room's raw payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedSchedule {
    /// Capacity resolved from the display path, independent of the grid
    pub capacity: Option<u32>,
    /// Sorted, deduplicated busy intervals
    pub busy: Vec<BusyInterval>,
    /// False when the envelope was malformed; the busy list is then empty
    pub available: bool,
}

/// Decode one raw grid payload into busy intervals plus capacity
///
/// A malformed envelope yields `(capacity, [], available = false)` so that a
/// single bad room can never abort a batch.
pub fn decode(raw: &str, display_path: &str, filter: DayFilter) -> DecodedSchedule {
    let capacity = catalog::room_capacity(display_path);

    // A usable display path has at least category.bucket.room depth
    if display_path.matches('.').count() < 2 {
        debug!(path = display_path, "display path too shallow, room unusable");
        return DecodedSchedule {
            capacity,
            busy: Vec::new(),
            available: false,
        };
    }

    let values = match extract_grid(raw) {
        Some(v) => v,
        None => {
            debug!(path = display_path, "payload did not match grid envelope");
            return DecodedSchedule {
                capacity,
                busy: Vec::new(),
                available: false,
            };
        }
    };

    let mut busy: Vec<BusyInterval> = scan_boundaries(&values)
        .filter(|event| filter.keeps(event.day))
        .filter_map(BoundaryEvent::into_interval)
        .collect();

    busy.sort_unstable();
    busy.dedup();

    DecodedSchedule {
        capacity,
        busy,
        available: true,
    }
}

/// Extract the integer grid between the `//OK[` marker and the string table
///
/// Returns `None` when the envelope marker is absent or any token fails to
/// parse as an integer.
fn extract_grid(raw: &str) -> Option<Vec<i64>> {
    let after_marker = raw.split(grid::ENVELOPE_MARKER).nth(1)?;
    let ints = after_marker.split(grid::ENVELOPE_END).next()?;
    ints.split(',')
        .map(|tok| tok.trim().parse::<i64>().ok())
        .collect()
}

/// One slot transition found in the integer grid
#[derive(Debug, Clone, Copy)]
struct BoundaryEvent {
    day: u8,
    slot_offset: i64,
    duration: i64,
}

impl BoundaryEvent {
    /// Convert the slot coordinates into a wall-clock interval
    ///
    /// Intervals that quantize to zero or negative length are dropped.
    fn into_interval(self) -> Option<BusyInterval> {
        let start_hours = self.slot_offset as f64 / grid::SLOTS_PER_HOUR
            + grid::DAY_START_HOURS
            + grid::START_NUDGE_HOURS;
        let end_hours = self.slot_offset as f64 / grid::SLOTS_PER_HOUR
            + grid::DAY_START_HOURS
            + self.duration as f64 / grid::SLOTS_PER_HOUR;

        let start = hours_to_clock(start_hours);
        let end = hours_to_clock(end_hours);
        if start.minutes_of_day() >= end.minutes_of_day() {
            return None;
        }
        Some(BusyInterval::new(self.day, start, end))
    }
}

/// Scan the integer grid for boundary events
///
/// An event fires at index `i` when `t[i]` sits in the marker band and the
/// next value drops sharply below the threshold. The context window reads
/// the slot offset at `i-2`, the day code at `i-1` and the duration code at
/// `i+1`; events whose window would fall off the array are skipped.
fn scan_boundaries(values: &[i64]) -> impl Iterator<Item = BoundaryEvent> + '_ {
    let upper = values.len().saturating_sub(1);
    (2..upper).filter_map(move |i| {
        let here = values[i];
        let next = values[i + 1];
        let in_band = (grid::MARKER_BAND_MIN..=grid::MARKER_BAND_MAX).contains(&here);
        if !(in_band && next != here && next < grid::DROP_THRESHOLD) {
            return None;
        }
        let day_code = values[i - 1];
        Some(BoundaryEvent {
            day: day_code.div_euclid(grid::SLOTS_PER_DAY) as u8,
            slot_offset: values[i - 2],
            duration: next,
        })
    })
}

/// Map fractional hours to the platform's displayed clock granularity
///
/// Truncates to whole seconds, floors the minute to its tens digit, then
/// applies the two observed corrections: `:20` snaps up to `:30` and `:50`
/// rolls over to the next hour at `:00` (which may produce 24:00).
fn hours_to_clock(hours: f64) -> ClockTime {
    let secs = (hours * 3600.0) as i64;
    let hour = (secs.div_euclid(3600)).rem_euclid(24) as u8;
    let minute = (secs.rem_euclid(3600) / 60) as u8;
    quantize(hour, (minute / 10) * 10)
}

fn quantize(hour: u8, minute: u8) -> ClockTime {
    match minute {
        20 => ClockTime::new(hour, 30),
        50 => ClockTime::new(hour + 1, 0),
        _ => ClockTime::new(hour, minute),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PATH: &str = "01-Enseignement.03-Vid\u{e9}o.vid\u{e9}o capacit\u{e9} 30.2101";

    /// Build an envelope with one boundary event per (offset, day_code, duration)
    fn payload(events: &[(i64, i64, i64)]) -> String {
        let mut ints: Vec<i64> = vec![0, 0, 0];
        for &(offset, day_code, duration) in events {
            // window shape: [offset, day_code, marker, duration, pad, pad]
            ints.extend_from_slice(&[offset, day_code, 175, duration, 0, 0]);
        }
        format!(
            "//OK[{},[\"strings\"],0,7]",
            ints.iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(",")
        )
    }

    #[test]
    fn decodes_known_boundary_to_literal_clock_pair() {
        // offset 13 for 1.49 h => 08h30 -> 10h00 on Wednesday (day code 2*176)
        let raw = payload(&[(13, 352, 19)]);
        let decoded = decode(&raw, PATH, DayFilter::Only(2));
        assert!(decoded.available);
        assert_eq!(
            decoded.busy,
            vec![BusyInterval::new(
                2,
                ClockTime::new(8, 30),
                ClockTime::new(10, 0)
            )]
        );
        assert_eq!(decoded.capacity, Some(30));
    }

    #[test]
    fn snap_up_rule_renders_next_half_hour() {
        let raw = payload(&[(0, 0, 25)]);
        let decoded = decode(&raw, PATH, DayFilter::Only(0));
        assert_eq!(decoded.busy[0].start, ClockTime::new(7, 30));
        // end 9.4608 h floors to 09h20 and snaps to 09h30
        assert_eq!(decoded.busy[0].end, ClockTime::new(9, 30));
    }

    #[test]
    fn roll_over_rule_renders_next_hour() {
        // offset 6 start computes to 07h59 -> floor 07h50 -> roll to 08h00
        let raw = payload(&[(6, 0, 19)]);
        let decoded = decode(&raw, PATH, DayFilter::Only(0));
        assert_eq!(decoded.busy[0].start, ClockTime::new(8, 0));
    }

    #[test]
    fn quantize_covers_both_remainders() {
        assert_eq!(quantize(9, 20), ClockTime::new(9, 30));
        assert_eq!(quantize(23, 50), ClockTime::new(24, 0));
        assert_eq!(quantize(10, 0), ClockTime::new(10, 0));
        assert_eq!(quantize(10, 30), ClockTime::new(10, 30));
    }

    #[test]
    fn day_filter_keeps_only_requested_day() {
        let raw = payload(&[(13, 0, 19), (13, 352, 19), (13, 5 * 176, 19)]);
        let today = decode(&raw, PATH, DayFilter::Only(2));
        assert_eq!(today.busy.len(), 1);
        assert_eq!(today.busy[0].day, 2);

        let week = decode(&raw, PATH, DayFilter::AllDays);
        let days: Vec<u8> = week.busy.iter().map(|iv| iv.day).collect();
        assert_eq!(days, vec![0, 2, 5]);
    }

    #[test]
    fn intervals_are_sorted_and_deduplicated() {
        // same event twice plus an earlier one, deliberately out of order
        let raw = payload(&[(40, 352, 19), (13, 352, 19), (40, 352, 19)]);
        let decoded = decode(&raw, PATH, DayFilter::Only(2));
        assert_eq!(decoded.busy.len(), 2);
        assert!(decoded.busy.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn start_before_end_always_holds() {
        let raw = payload(&[(13, 352, 19), (100, 352, 38)]);
        let decoded = decode(&raw, PATH, DayFilter::AllDays);
        for iv in &decoded.busy {
            assert!(iv.start.minutes_of_day() < iv.end.minutes_of_day());
        }
    }

    #[test]
    fn malformed_payload_is_flagged_not_fatal() {
        let decoded = decode("<html>maintenance</html>", PATH, DayFilter::AllDays);
        assert!(!decoded.available);
        assert!(decoded.busy.is_empty());
        // capacity still resolves from the path alone
        assert_eq!(decoded.capacity, Some(30));
    }

    #[test]
    fn non_integer_grid_token_is_malformed() {
        let decoded = decode("//OK[1,2,x,4,[\"s\"]]", PATH, DayFilter::AllDays);
        assert!(!decoded.available);
    }

    #[test]
    fn shallow_path_is_unusable() {
        let decoded = decode(&payload(&[(13, 352, 19)]), "loose-node", DayFilter::AllDays);
        assert!(!decoded.available);
        assert_eq!(decoded.capacity, None);
    }

    #[test]
    fn marker_band_requires_sharp_drop() {
        // 175 followed by a value above the threshold is not a boundary
        let raw = "//OK[0,0,0,13,352,175,150,0,0,[\"s\"]]";
        let decoded = decode(raw, PATH, DayFilter::AllDays);
        assert!(decoded.available);
        assert!(decoded.busy.is_empty());
    }
}
