//! # loadout-core — shared-inventory data model and reconciliation
//!
//! The pure half of the Loadout sync engine: no networking, no storage,
//! no async. Everything here is a deterministic function of the three
//! inputs a client juggles while looking at a party's inventory:
//!
//! ```text
//! ┌──────────────┐   fetch    ┌─────────────┐
//! │ Persistence  │ ─────────► │ Snapshot    │──┐
//! │ (external)   │            └─────────────┘  │
//! └──────┬───────┘                             │
//!        │ publish            ┌─────────────┐  ├─► reconcile ─► ReconciledView
//!        ▼                    │ EventBuffer │──┤
//! ┌──────────────┐  deliver   └─────────────┘  │
//! │ Relay room   │ ─────────►  append          │
//! └──────────────┘            ┌─────────────┐  │
//!   local edit ─────────────► │ Speculative │──┘
//!                             └─────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`item`] — items, bearers, parties, the closed category/bulk sets
//! - [`event`] — change events, classification, validation
//! - [`snapshot`] — point-in-time authoritative reads
//! - [`buffer`] — the append-only event log and its refresh policy
//! - [`reconcile`] — the merge algorithm
//! - [`view`] — category-bucketed projection
//! - [`session`] — per-client state holder driving the above
//! - [`store`] — traits for the persistence/access collaborators

pub mod buffer;
pub mod event;
pub mod item;
pub mod reconcile;
pub mod session;
pub mod snapshot;
pub mod store;
pub mod view;

// Re-exports for convenience
pub use buffer::EventBuffer;
pub use event::{
    now_millis, ChangeEvent, ItemChange, ItemDraft, SpeculativeAction, Timestamp,
    ValidationError,
};
pub use item::{Bearer, BearerFilter, BearerId, Bulk, Category, Item, ItemId, Party, PartyId};
pub use reconcile::reconcile;
pub use session::ViewSession;
pub use snapshot::Snapshot;
pub use store::{
    BearerStore, ItemStore, PartyDirectory, SnapshotResponse, SnapshotSource, StoreError,
};
pub use view::{ReconciledView, ViewEntry};
