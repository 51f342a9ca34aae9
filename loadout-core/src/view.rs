//! Category-bucketed projection of the reconciled entry list.

use serde::Serialize;

use crate::event::ItemDraft;
use crate::item::{BearerId, Bulk, Category, Item, ItemId};

/// One row of the displayed view: a confirmed item or a speculative
/// creation still awaiting its server-assigned id.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewEntry {
    /// None while the creation is speculative.
    pub id: Option<ItemId>,
    pub category: Category,
    pub description: String,
    pub bulk: Bulk,
    pub count: u32,
    pub bearer_id: Option<BearerId>,
}

impl ViewEntry {
    pub(crate) fn from_item(item: &Item) -> Self {
        Self {
            id: Some(item.id),
            category: item.category,
            description: item.description.clone(),
            bulk: item.bulk,
            count: item.count,
            bearer_id: item.bearer_id,
        }
    }

    pub(crate) fn from_draft(id: Option<ItemId>, draft: &ItemDraft) -> Self {
        Self {
            id,
            category: draft.category,
            description: draft.description.clone(),
            bulk: draft.bulk,
            count: draft.count,
            bearer_id: draft.bearer_id,
        }
    }

    /// Whether this entry is still awaiting server confirmation.
    pub fn is_speculative(&self) -> bool {
        self.id.is_none()
    }
}

/// The computed read-only projection: per-category entry lists in the
/// fixed display order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconciledView {
    buckets: Vec<(Category, Vec<ViewEntry>)>,
}

impl ReconciledView {
    /// Group an already-sorted entry sequence into the fixed category
    /// order, preserving relative order within each bucket.
    pub fn project(entries: Vec<ViewEntry>) -> Self {
        let mut buckets: Vec<(Category, Vec<ViewEntry>)> = Category::ORDER
            .iter()
            .map(|category| (*category, Vec::new()))
            .collect();
        for entry in entries {
            buckets[entry.category.display_index()].1.push(entry);
        }
        Self { buckets }
    }

    /// Entries in one category.
    pub fn category(&self, category: Category) -> &[ViewEntry] {
        match self.buckets.get(category.display_index()) {
            Some((_, entries)) => entries,
            None => &[],
        }
    }

    /// Buckets in display order.
    pub fn buckets(&self) -> impl Iterator<Item = (Category, &[ViewEntry])> {
        self.buckets
            .iter()
            .map(|(category, entries)| (*category, entries.as_slice()))
    }

    /// All entries, flattened in display order.
    pub fn iter(&self) -> impl Iterator<Item = &ViewEntry> {
        self.buckets.iter().flat_map(|(_, entries)| entries.iter())
    }

    pub fn len(&self) -> usize {
        self.buckets.iter().map(|(_, entries)| entries.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
