//! Per-client view state.
//!
//! A [`ViewSession`] owns the reconciliation inputs for one client looking
//! at one party: the current snapshot, the event buffer, at most one
//! in-flight speculative action, and the active bearer filter. It runs
//! single-threaded and never blocks; the displayed view is a pure function
//! of whatever the session holds at the moment [`ViewSession::view`] runs.
//!
//! The session does no I/O of its own. The owner feeds it delivered events
//! via [`observe`](ViewSession::observe), fetches and
//! [`adopts`](ViewSession::adopt_snapshot) snapshots when asked, and drives
//! the speculative lifecycle around each mutation round trip.

use crate::buffer::EventBuffer;
use crate::event::{ChangeEvent, SpeculativeAction};
use crate::item::{Bearer, BearerFilter};
use crate::reconcile::reconcile;
use crate::snapshot::Snapshot;
use crate::view::ReconciledView;

#[derive(Debug, Clone, Default)]
pub struct ViewSession {
    snapshot: Snapshot,
    buffer: EventBuffer,
    speculative: Option<SpeculativeAction>,
    filter: BearerFilter,
}

impl ViewSession {
    pub fn new(snapshot: Snapshot, filter: BearerFilter) -> Self {
        Self {
            snapshot,
            buffer: EventBuffer::new(),
            speculative: None,
            filter,
        }
    }

    /// Record a delivered room event.
    ///
    /// Returns true once the buffer has reached the refresh threshold and
    /// the owner should fetch a fresh snapshot.
    pub fn observe(&mut self, event: ChangeEvent) -> bool {
        self.buffer.append(event);
        self.buffer.needs_refresh()
    }

    pub fn needs_refresh(&self) -> bool {
        self.buffer.needs_refresh()
    }

    /// Adopt a fresh snapshot and discard every buffered event it
    /// supersedes.
    pub fn adopt_snapshot(&mut self, snapshot: Snapshot) {
        self.buffer.prune_before(snapshot.as_of);
        log::debug!(
            "Adopted snapshot as of {} ({} items, {} events kept)",
            snapshot.as_of,
            snapshot.items.len(),
            self.buffer.len()
        );
        self.snapshot = snapshot;
    }

    /// Begin a mutation round trip. A second begin replaces the first —
    /// at most one action is speculative at a time.
    pub fn begin(&mut self, action: SpeculativeAction) {
        self.speculative = Some(action);
    }

    /// Settle the in-flight mutation, success or failure alike.
    ///
    /// The speculative entry is dropped unconditionally, even if its
    /// confirmed echo has not arrived yet; the next snapshot or event
    /// re-derives whatever the view should show.
    pub fn settle(&mut self) -> Option<SpeculativeAction> {
        self.speculative.take()
    }

    pub fn set_filter(&mut self, filter: BearerFilter) {
        self.filter = filter;
    }

    pub fn filter(&self) -> &BearerFilter {
        &self.filter
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn bearers(&self) -> &[Bearer] {
        &self.snapshot.bearers
    }

    pub fn buffer(&self) -> &EventBuffer {
        &self.buffer
    }

    /// Compute the currently displayed view.
    pub fn view(&self) -> ReconciledView {
        reconcile(
            &self.snapshot,
            self.buffer.events(),
            self.speculative.as_ref(),
            &self.filter,
        )
    }
}
