//! End-to-end decoding fixtures
//!
//! Exercises the decode-then-resolve pipeline on recorded-style raw grid
//! payloads, the way a refresh pass consumes them.

use ade_rooms::app::{decode, free_rooms, resolve, DayFilter};
use ade_rooms::app::{BusyInterval, CacheSnapshot, ClockTime, FreeUntil, RoomSchedule};

const VIDEO_PATH: &str = "01-Enseignement.03-Vid\u{e9}o.vid\u{e9}o capacit\u{e9} 30.2101";
const AMPHI_PATH: &str = "01-Enseignement.01-Amphis.0110";

/// Assemble a raw GWT-RPC grid envelope from boundary windows
///
/// Each window is `(slot_offset, day_code, duration)`; padding keeps every
/// other token outside the marker band so only the intended boundaries fire.
fn grid_payload(events: &[(i64, i64, i64)]) -> String {
    let mut ints: Vec<i64> = vec![7, 0, 31];
    for &(offset, day_code, duration) in events {
        ints.extend_from_slice(&[offset, day_code, 175, duration, 0, 0]);
    }
    format!(
        "//OK[{},[\"java.util.ArrayList/4159755760\",\"com.adesoft.gwt.core.client.rpc.data.planning.PlanningData\"],0,7]",
        ints.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(",")
    )
}

#[test]
fn recorded_style_payload_reproduces_literal_clock_pair() {
    // Wednesday (day code 2 * 176), slot 13 for 19 slots: 08h30 to 10h00
    let raw = grid_payload(&[(13, 352, 19)]);
    let decoded = decode(&raw, VIDEO_PATH, DayFilter::Only(2));

    assert!(decoded.available);
    assert_eq!(decoded.capacity, Some(30));
    assert_eq!(
        decoded.busy,
        vec![BusyInterval::new(
            2,
            ClockTime::new(8, 30),
            ClockTime::new(10, 0)
        )]
    );
}

#[test]
fn amphitheater_capacity_comes_from_the_fixed_table() {
    let raw = grid_payload(&[(13, 0, 19)]);
    let decoded = decode(&raw, AMPHI_PATH, DayFilter::Only(0));
    assert_eq!(decoded.capacity, Some(116));
}

#[test]
fn one_malformed_payload_leaves_the_rest_of_the_batch_intact() {
    // A refresh pass decodes each room independently; the third payload is
    // a maintenance page instead of a grid envelope.
    let payloads = [
        ("2101", grid_payload(&[(13, 0, 19)])),
        ("2102", grid_payload(&[(40, 0, 19)])),
        ("2103", "<html>503 Service Unavailable</html>".to_string()),
        ("2104", grid_payload(&[])),
    ];

    let mut rooms = std::collections::BTreeMap::new();
    for (number, raw) in &payloads {
        let path = format!("01-Enseignement.03-Vid\u{e9}o.vid\u{e9}o capacit\u{e9} 30.{number}");
        let decoded = decode(raw, &path, DayFilter::Only(0));
        rooms.insert(
            number.to_string(),
            RoomSchedule {
                capacity: decoded.capacity,
                busy: decoded.busy,
                available: decoded.available,
            },
        );
    }

    assert_eq!(rooms.len(), 4);
    assert!(rooms["2101"].available);
    assert!(rooms["2102"].available);
    assert!(!rooms["2103"].available);
    assert!(rooms["2104"].available);
    assert_eq!(rooms["2101"].busy.len(), 1);
    assert!(rooms["2104"].busy.is_empty());

    // The unavailable room never shows up as free downstream.
    let snapshot = CacheSnapshot::new(1, rooms);
    let free = free_rooms(&snapshot, ClockTime::new(7, 0));
    assert!(free.contains_key("2104"));
    assert!(!free.contains_key("2103"));
}

#[test]
fn decode_then_resolve_reports_the_next_busy_start() {
    // Monday: 08h30-10h00 then 13h00 onwards
    let raw = grid_payload(&[(13, 0, 19), (70, 0, 25)]);
    let decoded = decode(&raw, VIDEO_PATH, DayFilter::Only(0));
    assert!(decoded.available);
    assert_eq!(decoded.busy.len(), 2);

    let mid_morning = resolve(&decoded.busy, ClockTime::new(10, 30));
    assert!(mid_morning.is_free);
    assert_eq!(
        mid_morning.free_until,
        Some(FreeUntil::At(decoded.busy[1].start))
    );

    let during_class = resolve(&decoded.busy, ClockTime::new(9, 0));
    assert!(!during_class.is_free);

    let evening = resolve(&decoded.busy, ClockTime::new(20, 0));
    assert_eq!(evening.free_until, Some(FreeUntil::Tomorrow));
}

#[test]
fn week_wide_decode_keeps_days_apart() {
    let raw = grid_payload(&[(13, 0, 19), (13, 352, 19), (13, 4 * 176, 19)]);

    let week = decode(&raw, VIDEO_PATH, DayFilter::AllDays);
    let days: Vec<u8> = week.busy.iter().map(|iv| iv.day).collect();
    assert_eq!(days, vec![0, 2, 4]);

    let friday = decode(&raw, VIDEO_PATH, DayFilter::Only(4));
    assert_eq!(friday.busy.len(), 1);
    assert_eq!(friday.busy[0].day, 4);
}
