//! Mirrored summary endpoint client
//!
//! A community mirror publishes a pre-computed room map as plain JSON.
//! When it is reachable a refresh pass takes the map wholesale and skips
//! the whole scrape sequence; any failure here just falls back to
//! scraping, so every error is soft.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::debug;

use crate::app::models::{BusyInterval, ClockTime, RoomSchedule};
use crate::constants::ade;
use crate::errors::{MirrorError, MirrorResult};

/// Fetch and parse the mirrored room map
///
/// `today` is the weekday index stamped on the mirror's intervals, which
/// carry clock times only.
pub async fn fetch_mirror(client: &reqwest::Client, today: u8) -> MirrorResult<BTreeMap<String, RoomSchedule>> {
    let response = client
        .get(ade::MIRROR_URL)
        .send()
        .await
        .map_err(MirrorError::Http)?;
    let status = response.status();
    if !status.is_success() {
        return Err(MirrorError::Status {
            status: status.as_u16(),
        });
    }
    let payload: Value = response.json().await.map_err(MirrorError::Http)?;
    let rooms = parse_room_map(&payload, today)?;
    debug!(rooms = rooms.len(), "mirror payload accepted");
    Ok(rooms)
}

/// Parse the mirror's JSON object into room schedules
///
/// The mirror is loosely typed (capacities arrive as numbers or strings,
/// rooms with no occupancy carry an empty list), so each field is coerced
/// rather than strictly deserialized. A room entry that cannot be coerced
/// poisons the whole payload; a wrong map is worse than no map.
pub fn parse_room_map(payload: &Value, today: u8) -> MirrorResult<BTreeMap<String, RoomSchedule>> {
    let map = payload.as_object().ok_or(MirrorError::InvalidPayload {
        reason: "top-level value is not an object".to_string(),
    })?;
    if map.is_empty() {
        return Err(MirrorError::Empty);
    }

    let mut rooms = BTreeMap::new();
    for (room, entry) in map {
        let capacity = entry.get("capacity").and_then(coerce_capacity);
        let busy = match entry.get("busy") {
            Some(Value::Array(pairs)) => parse_busy(pairs, today, room)?,
            _ => Vec::new(),
        };
        rooms.insert(
            room.clone(),
            RoomSchedule {
                capacity,
                busy,
                available: true,
            },
        );
    }
    Ok(rooms)
}

/// Capacity arrives as a JSON number or a decimal string
fn coerce_capacity(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Busy entries are `[[start_h, start_m], [end_h, end_m]]` pairs
fn parse_busy(pairs: &[Value], today: u8, room: &str) -> MirrorResult<Vec<BusyInterval>> {
    let mut busy = Vec::with_capacity(pairs.len());
    for pair in pairs {
        let bounds = pair.as_array().filter(|b| b.len() == 2).ok_or_else(|| invalid(room))?;
        let start = coerce_clock(&bounds[0]).ok_or_else(|| invalid(room))?;
        let end = coerce_clock(&bounds[1]).ok_or_else(|| invalid(room))?;
        busy.push(BusyInterval::new(today, start, end));
    }
    busy.sort_unstable();
    busy.dedup();
    Ok(busy)
}

fn coerce_clock(value: &Value) -> Option<ClockTime> {
    let parts = value.as_array()?;
    if parts.len() != 2 {
        return None;
    }
    let hour = u8::try_from(parts[0].as_u64()?).ok()?;
    let minute = u8::try_from(parts[1].as_u64()?).ok()?;
    Some(ClockTime::new(hour, minute))
}

fn invalid(room: &str) -> MirrorError {
    MirrorError::InvalidPayload {
        reason: format!("malformed busy entry for room {room}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_a_typical_room_map() {
        let payload = json!({
            "0110": {
                "capacity": 116,
                "freeUntil": "demain",
                "busy": []
            },
            "2202": {
                "capacity": "30",
                "freeUntil": "13h00",
                "busy": [[[8, 0], [10, 30]], [[13, 0], [15, 0]]]
            }
        });

        let rooms = parse_room_map(&payload, 2).unwrap();
        assert_eq!(rooms.len(), 2);

        let amphi = &rooms["0110"];
        assert_eq!(amphi.capacity, Some(116));
        assert!(amphi.busy.is_empty());
        assert!(amphi.available);

        let video = &rooms["2202"];
        assert_eq!(video.capacity, Some(30));
        assert_eq!(
            video.busy,
            vec![
                BusyInterval::new(2, ClockTime::new(8, 0), ClockTime::new(10, 30)),
                BusyInterval::new(2, ClockTime::new(13, 0), ClockTime::new(15, 0)),
            ]
        );
    }

    #[test]
    fn empty_map_is_rejected() {
        assert!(matches!(
            parse_room_map(&json!({}), 0),
            Err(MirrorError::Empty)
        ));
    }

    #[test]
    fn non_object_payload_is_rejected() {
        assert!(matches!(
            parse_room_map(&json!([1, 2, 3]), 0),
            Err(MirrorError::InvalidPayload { .. })
        ));
    }

    #[test]
    fn malformed_busy_entry_poisons_the_payload() {
        let payload = json!({
            "2202": { "capacity": 30, "busy": [[[8, 0]]] }
        });
        assert!(matches!(
            parse_room_map(&payload, 0),
            Err(MirrorError::InvalidPayload { .. })
        ));
    }

    #[test]
    fn unparseable_capacity_becomes_unknown() {
        let payload = json!({
            "0160": { "capacity": "beaucoup", "busy": [] }
        });
        let rooms = parse_room_map(&payload, 0).unwrap();
        assert_eq!(rooms["0160"].capacity, None);
    }
}
