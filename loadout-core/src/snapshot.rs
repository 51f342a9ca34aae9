//! Point-in-time authoritative reads of the item/bearer set.

use serde::{Deserialize, Serialize};

use crate::event::Timestamp;
use crate::item::{Bearer, BearerId, Item};

/// Ground truth as of a single instant.
///
/// Fetched on navigation and whenever the event buffer overflows; replaced
/// wholesale, never patched in place. Adopting a snapshot supersedes every
/// buffered event older than `as_of`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Epoch milliseconds (wire name `timestamp`).
    #[serde(rename = "timestamp")]
    pub as_of: Timestamp,
    pub items: Vec<Item>,
    #[serde(default)]
    pub bearers: Vec<Bearer>,
}

impl Snapshot {
    /// A snapshot with no rows, anchored at `as_of`.
    pub fn empty(as_of: Timestamp) -> Self {
        Self {
            as_of,
            items: Vec::new(),
            bearers: Vec::new(),
        }
    }

    /// Look up a bearer's display name. A dangling reference resolves to
    /// `None` and reads as unassigned.
    pub fn bearer_name(&self, id: BearerId) -> Option<&str> {
        self.bearers
            .iter()
            .find(|bearer| bearer.id == id)
            .map(|bearer| bearer.name.as_str())
    }
}
