//! Deterministic merge of the three racing inputs into one displayed view.
//!
//! ```text
//! Snapshot (authoritative, stale)  ──┐
//! EventBuffer (live, may repeat)   ──┼──► reconcile ──► ReconciledView
//! SpeculativeAction (unconfirmed)  ──┘
//! ```
//!
//! Merge policy:
//! - candidates fold in list order — snapshot rows, then creations, then
//!   updates, speculative last — into an identity-keyed slot table where
//!   the last write wins and the first appearance fixes the position;
//! - a deletion is a dominant tombstone: it removes its id no matter where
//!   the delete sat relative to creates/updates for that id;
//! - the bearer filter is re-applied after the merge, because a merge can
//!   introduce entries the filter was never evaluated against;
//! - ordering is a case-folded stable sort on description, then the fixed
//!   category bucketing.
//!
//! A speculative creation and its confirmed echo may coexist briefly; they
//! are never content-matched. The speculative entry vanishes when its
//! round trip settles.

use std::collections::{HashMap, HashSet};

use crate::event::{ChangeEvent, ItemChange, SpeculativeAction};
use crate::item::{BearerFilter, ItemId};
use crate::snapshot::Snapshot;
use crate::view::{ReconciledView, ViewEntry};

/// Merge `snapshot` + `events` + an optional in-flight `speculative`
/// action, filter by bearer, sort, and bucket by category.
///
/// Pure function of its inputs; events are read in arrival order.
pub fn reconcile(
    snapshot: &Snapshot,
    events: &[ChangeEvent],
    speculative: Option<&SpeculativeAction>,
    filter: &BearerFilter,
) -> ReconciledView {
    let changes = events
        .iter()
        .map(|event| &event.change)
        .chain(speculative.map(SpeculativeAction::change));

    let mut created: Vec<ViewEntry> = Vec::new();
    let mut updated: Vec<ViewEntry> = Vec::new();
    let mut deleted: HashSet<ItemId> = HashSet::new();
    for change in changes {
        match change {
            ItemChange::Created { id, draft } => {
                created.push(ViewEntry::from_draft(*id, draft));
            }
            ItemChange::Updated { id, draft } => {
                updated.push(ViewEntry::from_draft(Some(*id), draft));
            }
            ItemChange::Deleted { id } => {
                deleted.insert(*id);
            }
        }
    }

    // Creations fold before updates so a later update supersedes its own
    // creation echo; within each set, buffer order decides.
    let mut entries: Vec<ViewEntry> =
        Vec::with_capacity(snapshot.items.len() + created.len() + updated.len());
    let mut slot_by_id: HashMap<ItemId, usize> = HashMap::new();
    let candidates = snapshot
        .items
        .iter()
        .map(ViewEntry::from_item)
        .chain(created)
        .chain(updated);
    for entry in candidates {
        match entry.id {
            Some(id) => match slot_by_id.get(&id) {
                Some(&slot) => entries[slot] = entry,
                None => {
                    slot_by_id.insert(id, entries.len());
                    entries.push(entry);
                }
            },
            // Id-less speculative creations never collide with anything.
            None => entries.push(entry),
        }
    }

    // Deletion dominates whatever the fold kept for that id.
    entries.retain(|entry| entry.id.is_none_or(|id| !deleted.contains(&id)));

    entries.retain(|entry| filter.matches(entry.bearer_id));

    // Stable: equal descriptions keep their relative order.
    entries.sort_by_cached_key(|entry| entry.description.to_lowercase());

    ReconciledView::project(entries)
}
