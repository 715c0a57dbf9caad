//! Stores: named bundles of state plus the operations that mutate it.
//!
//! Each store owns its state exclusively and reaches the backend only
//! through the shared [`ApiClient`](crate::http::ApiClient). Reads return
//! snapshots; locks are never held across a network call.

pub mod content;
pub mod history;
pub mod session;

pub use content::{ContentFilters, ContentState, ContentStore, FilterPatch, Pagination};
pub use history::{HistoryState, HistoryStore};
pub use session::{SessionState, SessionStore};

use std::sync::{
    Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard,
    atomic::{AtomicU64, AtomicUsize, Ordering},
};

pub(crate) const GENERIC_ERROR: &str = "An error occurred";

/// Hands out monotonically increasing tickets for one slot of state. Only
/// the holder of the latest ticket may write the slot.
#[derive(Debug, Default)]
pub(crate) struct Sequencer {
    latest: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Ticket(u64);

impl Sequencer {
    pub fn issue(&self) -> Ticket {
        Ticket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.0
    }
}

/// Counts requests in flight; the store reports `loading` while non-zero.
#[derive(Debug, Clone, Default)]
pub(crate) struct InFlight(Arc<AtomicUsize>);

impl InFlight {
    pub fn begin(&self) -> InFlightGuard {
        self.0.fetch_add(1, Ordering::SeqCst);
        InFlightGuard(self.0.clone())
    }

    pub fn is_active(&self) -> bool {
        self.0.load(Ordering::SeqCst) > 0
    }
}

#[must_use]
pub(crate) struct InFlightGuard(Arc<AtomicUsize>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

pub(crate) fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_latest_ticket_is_current() {
        let seq = Sequencer::default();
        let first = seq.issue();
        assert!(seq.is_current(first));
        let second = seq.issue();
        assert!(!seq.is_current(first));
        assert!(seq.is_current(second));
    }

    #[test]
    fn in_flight_clears_when_every_guard_drops() {
        let in_flight = InFlight::default();
        let a = in_flight.begin();
        let b = in_flight.begin();
        drop(a);
        assert!(in_flight.is_active());
        drop(b);
        assert!(!in_flight.is_active());
    }
}
