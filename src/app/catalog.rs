//! Resource catalog walker
//!
//! The platform exposes rooms as a resource tree; this installation's
//! teaching rooms live in a fixed, small set of buckets (one amphitheater
//! bucket plus several video-capacity buckets). Each bucket is a closed
//! enum variant so adding or removing one is an explicit one-line change.
//!
//! Listing a bucket replays its recorded `method4getChildren` request and
//! parses the response with an explicit tokenizer over the escaped field
//! format, instead of the positional string slicing the original client
//! performs.

use tracing::debug;

use crate::app::session::AdeSession;
use crate::constants::{ade, fixtures};
use crate::errors::{CatalogError, CatalogResult};

/// Fixed room capacities of the amphitheater bucket, keyed by room number;
/// these are not embedded in the display path
const AMPHITHEATER_CAPACITIES: [(&str, u32); 4] =
    [("0110", 116), ("0160", 116), ("0210", 156), ("0260", 156)];

/// One bucket of the installation's room tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoomCategory {
    Amphitheater,
    Video16,
    Video28,
    Video30,
    Video32,
    Video40,
    Video48,
    Video72,
}

impl RoomCategory {
    /// Every bucket this installation serves, in walk order
    pub const ALL: [RoomCategory; 8] = [
        RoomCategory::Amphitheater,
        RoomCategory::Video16,
        RoomCategory::Video28,
        RoomCategory::Video30,
        RoomCategory::Video32,
        RoomCategory::Video40,
        RoomCategory::Video48,
        RoomCategory::Video72,
    ];

    /// Platform tree node id of this bucket
    pub fn node_id(&self) -> u32 {
        match self {
            RoomCategory::Amphitheater => 795,
            RoomCategory::Video16 => 175,
            RoomCategory::Video28 => 3352,
            RoomCategory::Video30 => 2271,
            RoomCategory::Video32 => 2700,
            RoomCategory::Video40 => 5819,
            RoomCategory::Video48 => 184,
            RoomCategory::Video72 => 3357,
        }
    }

    /// Display label as the platform renders it
    pub fn label(&self) -> &'static str {
        match self {
            RoomCategory::Amphitheater => "01-Amphis",
            RoomCategory::Video16 => "vid\u{e9}o capacit\u{e9} 16",
            RoomCategory::Video28 => "vid\u{e9}o capacit\u{e9} 28",
            RoomCategory::Video30 => "vid\u{e9}o capacit\u{e9} 30",
            RoomCategory::Video32 => "vid\u{e9}o capacit\u{e9} 32",
            RoomCategory::Video40 => "vid\u{e9}o capacit\u{e9} 40",
            RoomCategory::Video48 => "vid\u{e9}o capacit\u{e9} 48",
            RoomCategory::Video72 => "vid\u{e9}o capacit\u{e9} 72",
        }
    }

    /// Full display path of the bucket node
    pub fn display_path(&self) -> String {
        match self {
            RoomCategory::Amphitheater => "01-Enseignement.01-Amphis".to_string(),
            _ => format!("01-Enseignement.03-Vid\u{e9}o.{}", self.label()),
        }
    }

    /// Tree depth of the bucket node in its recorded request
    fn depth(&self) -> u8 {
        match self {
            RoomCategory::Amphitheater => 2,
            _ => 3,
        }
    }

    /// Sibling rank field of the bucket node in its recorded request
    fn rank(&self) -> i32 {
        match self {
            RoomCategory::Amphitheater | RoomCategory::Video16 => -1,
            RoomCategory::Video28 => 19,
            RoomCategory::Video30 => 9,
            RoomCategory::Video32 => 5,
            RoomCategory::Video40 => 1,
            RoomCategory::Video48 => 3,
            RoomCategory::Video72 => 8,
        }
    }

    /// Node ids the recorded request carried in the tree-state cookie
    fn expanded_nodes(&self) -> &'static [i32] {
        match self {
            RoomCategory::Amphitheater => &[-3, 49],
            RoomCategory::Video16 => &[-3, 49, 791],
            _ => &[-3, 49, 2271],
        }
    }

    /// The `Direct Planning Tree` cookie fragment the web client appends
    /// alongside the session cookie for this bucket's listing
    pub fn tree_cookie_fragment(&self) -> String {
        let ids = self
            .expanded_nodes()
            .iter()
            .map(|id| format!("\"s:{id}\""))
            .collect::<Vec<_>>()
            .join(",");
        format!(
            "Direct Planning Tree\t'{{\"state\":{{\"sortField\":\"s:NAME\", \
             \"sortDir\":\"s:ASC\", \"expanded\":[{ids}]}}}}'"
        )
    }

    /// Recorded `method4getChildren` body for this bucket
    ///
    /// Only the node descriptor varies between buckets; header, field table
    /// and payload indices are byte-identical across recordings.
    pub fn request_body(&self) -> String {
        let descriptor = format!(
            "{{\"{id}\"\"true\"\"{depth}\"\"{rank}\"\"0\"\"0\"\"0\"\"false\"[2]\
             {{\"ColorField\"\"COLOR\"\"LabelColor\"\"255,255,255\"\"false\"\"false\"\
             {{\"StringField\"\"NAME\"\"LabelName\"\"{label}\"\"false\"\"false\"\
             \"{path}\"\"classroom\"\"3\"\"2\"[0]",
            id = self.node_id(),
            depth = self.depth(),
            rank = self.rank(),
            label = self.label(),
            path = self.display_path(),
        );
        format!(
            "{}{}{}",
            fixtures::GET_CHILDREN_HEADER,
            descriptor,
            fixtures::GET_CHILDREN_TAIL
        )
    }
}

/// One room as enumerated from the catalog tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomResource {
    /// Opaque platform-assigned resource id
    pub id: String,
    /// Hierarchical display path, e.g. `01-Enseignement.03-Vidéo.vidéo capacité 30.2101`
    pub path: String,
}

impl RoomResource {
    /// Stable business key: the path segment after the last separator
    pub fn room_number(&self) -> &str {
        room_number(&self.path)
    }
}

/// Last display-path segment
pub fn room_number(path: &str) -> &str {
    path.rsplit('.').next().unwrap_or(path)
}

/// Capacity derived from a room's display path
///
/// The amphitheater bucket uses a fixed lookup keyed by room number; other
/// buckets carry a trailing `<label> <integer>` bucket segment. Any parse
/// failure yields `None`, which never blocks processing.
pub fn room_capacity(path: &str) -> Option<u32> {
    if path.matches('.').count() < 2 {
        return None;
    }
    if path.contains("Amphis") {
        let number = room_number(path);
        return AMPHITHEATER_CAPACITIES
            .iter()
            .find(|(n, _)| *n == number)
            .map(|(_, c)| *c);
    }
    let bucket = path.rsplit('.').nth(1)?;
    bucket.rsplit(' ').next()?.parse().ok()
}

/// The fixed, enumerable category set with display labels
pub fn list_categories() -> Vec<(RoomCategory, &'static str)> {
    RoomCategory::ALL.iter().map(|c| (*c, c.label())).collect()
}

/// Enumerate the rooms of one bucket
///
/// An empty bucket yields an empty list, never an error.
pub async fn list_rooms(
    session: &AdeSession,
    category: RoomCategory,
) -> CatalogResult<Vec<RoomResource>> {
    let response = session
        .post_rpc(
            ade::DIRECT_PLANNING_SERVICE,
            category.request_body(),
            Some(&category.tree_cookie_fragment()),
        )
        .await
        .map_err(|source| CatalogError::Http {
            category: category.label(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(CatalogError::Status {
            category: category.label(),
            status: status.as_u16(),
        });
    }

    let body = response.text().await.map_err(|source| CatalogError::Http {
        category: category.label(),
        source,
    })?;

    let rooms = parse_children_response(&body);
    debug!(
        category = category.label(),
        rooms = rooms.len(),
        "enumerated catalog bucket"
    );
    Ok(rooms)
}

/// Tokenize a `method4getChildren` response into room resources
///
/// Entries open at the escaped marker `]{\"`; fields are separated by
/// `\"\"`. Nested color descriptors are glued to their entry first so the
/// entry split cannot tear them apart. Field 0 is the resource id, field 18
/// the display path; entries without both are skipped.
pub fn parse_children_response(raw: &str) -> Vec<RoomResource> {
    const ENTRY_MARKER: &str = "]{\\\"";
    const COLOR_GLUE: (&str, &str) = ("]{\\\"Color", "Color");
    const FIELD_SEP: &str = "\\\"\\\"";

    let normalized = raw.replace(COLOR_GLUE.0, COLOR_GLUE.1);
    normalized
        .split(ENTRY_MARKER)
        .skip(1)
        .filter_map(|entry| {
            let fields: Vec<&str> = entry.split(FIELD_SEP).collect();
            let id = fields.first()?;
            let path = fields.get(18)?;
            if id.is_empty() || path.is_empty() {
                return None;
            }
            Some(RoomResource {
                id: (*id).to_string(),
                path: (*path).to_string(),
            })
        })
        .collect()
}
