//! Interfaces to the persistence and access-control collaborators.
//!
//! The engine never owns storage: snapshots, mutations, and grant
//! resolution are supplied from outside through these traits, and the
//! persistence layer is expected to publish exactly one room event per
//! confirmed mutation, stamped at persistence time. Nothing here retries —
//! retry is the caller's policy, not the engine's.

#![allow(async_fn_in_trait)]

use serde::{Deserialize, Serialize};

use crate::event::ItemDraft;
use crate::item::{Bearer, BearerFilter, BearerId, Item, ItemId, Party};
use crate::snapshot::Snapshot;

/// Failures surfaced by the collaborators.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    /// The grant key maps to no party. Terminal for the request: no
    /// partial data, no retry.
    GrantNotFound,
    /// The collaborator refused the mutation.
    Rejected(String),
    /// The collaborator could not be reached.
    Unavailable(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GrantNotFound => write!(f, "Access grant not found"),
            Self::Rejected(reason) => write!(f, "Mutation rejected: {reason}"),
            Self::Unavailable(reason) => write!(f, "Store unavailable: {reason}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Snapshot fetch response: ground truth plus the filter it was evaluated
/// against, echoed back so the client can re-apply it after merges.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotResponse {
    #[serde(flatten)]
    pub snapshot: Snapshot,
    #[serde(default)]
    pub filters: BearerFilter,
}

/// Maps an opaque grant key to the party it unlocks.
pub trait PartyDirectory {
    async fn resolve(&self, grant_key: &str) -> Result<Party, StoreError>;
}

/// Supplies point-in-time reads, pre-sorted by description and pre-filtered
/// by bearer.
pub trait SnapshotSource {
    async fn fetch(
        &self,
        party: Party,
        filter: &BearerFilter,
    ) -> Result<SnapshotResponse, StoreError>;
}

/// Item mutations, named after the wire actions they confirm. Every
/// success carries the stored row (or, for deletion, the removed id) so
/// the caller can publish the confirmed event.
pub trait ItemStore {
    async fn create_item(&self, party: Party, draft: ItemDraft) -> Result<Item, StoreError>;
    async fn update_item(
        &self,
        party: Party,
        id: ItemId,
        draft: ItemDraft,
    ) -> Result<Item, StoreError>;
    async fn delete_item(&self, party: Party, id: ItemId) -> Result<ItemId, StoreError>;
}

/// Bearer management. Deleting a bearer may leave items with dangling
/// references; those read as unassigned.
pub trait BearerStore {
    async fn create_bearer(&self, party: Party, name: String) -> Result<Bearer, StoreError>;
    async fn delete_bearer(&self, party: Party, id: BearerId) -> Result<BearerId, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_response_wire_shape() {
        let response: SnapshotResponse = serde_json::from_str(
            r#"{
                "timestamp": 100,
                "items": [],
                "bearers": [],
                "filters": {"bearerId": [3]}
            }"#,
        )
        .unwrap();
        assert_eq!(response.snapshot.as_of, 100);
        assert_eq!(response.filters.bearer_id, vec![3]);
    }

    #[test]
    fn test_snapshot_response_filters_default_empty() {
        let response: SnapshotResponse =
            serde_json::from_str(r#"{"timestamp": 1, "items": []}"#).unwrap();
        assert!(response.filters.is_empty());
    }

    #[test]
    fn test_store_error_display() {
        assert_eq!(
            StoreError::GrantNotFound.to_string(),
            "Access grant not found"
        );
        assert_eq!(
            StoreError::Rejected("count".to_string()).to_string(),
            "Mutation rejected: count"
        );
    }
}
