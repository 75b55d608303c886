//! Live subscription adapters.
//!
//! - [`CollectionSubscription`] - a live, typed list of records for a query
//! - [`DocumentSubscription`] - a live, typed record for one document
//!
//! Both expose the same three-part [`LiveState`] and hold at most one backend
//! listener at a time. Changing the input unregisters the previous listener
//! before the next one is created; dropping the adapter releases it.
//!
//! # Cancellation
//!
//! Every listener registration is stamped with a generation number. Teardown
//! advances the generation, and a callback whose stamp no longer matches is
//! discarded, so a late delivery from a replaced listener cannot reach state.
//!
//! # Observing state
//!
//! [`state`](CollectionSubscription::state) returns a clone of the latest
//! state. [`watch`](CollectionSubscription::watch) returns a
//! [`tokio::sync::watch::Receiver`] for awaiting changes.

mod collection;
mod document;

pub use collection::CollectionSubscription;
pub use document::DocumentSubscription;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;

use crate::error::StoreError;
use crate::events::{PermissionErrorBus, PermissionErrorEvent};

/// The observable state of a subscription.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveState<T> {
    /// Latest delivered data, or `None` before the first snapshot, with no
    /// input, or for a missing document.
    pub data: Option<T>,

    /// `true` from an input change until the first snapshot or error.
    pub loading: bool,

    /// The listener's delivery error, if any.
    pub error: Option<StoreError>,

    /// `true` if the current query was rewritten into the tenant namespace and
    /// issued without its filter/sort/limit constraints.
    pub constraints_dropped: bool,
}

impl<T> LiveState<T> {
    /// State with no input: not loading, no data.
    pub fn idle() -> Self {
        Self {
            data: None,
            loading: false,
            error: None,
            constraints_dropped: false,
        }
    }

    /// State right after an input change.
    pub fn pending(constraints_dropped: bool) -> Self {
        Self {
            data: None,
            loading: true,
            error: None,
            constraints_dropped,
        }
    }
}

impl<T> Default for LiveState<T> {
    fn default() -> Self {
        Self::idle()
    }
}

/// Shared between an adapter and the callbacks it registers.
struct SubscriptionCell<T> {
    generation: AtomicU64,
    state: watch::Sender<LiveState<T>>,
    bus: Arc<PermissionErrorBus>,
}

impl<T> SubscriptionCell<T> {
    fn new(bus: Arc<PermissionErrorBus>) -> Arc<Self> {
        let (state, _) = watch::channel(LiveState::idle());
        Arc::new(Self {
            generation: AtomicU64::new(0),
            state,
            bus,
        })
    }

    /// Invalidates callbacks of the current generation.
    fn invalidate(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::Acquire) == generation
    }

    fn replace(&self, state: LiveState<T>) {
        self.state.send_replace(state);
    }

    /// Applies delivered data if `generation` is still current.
    fn apply_data(&self, generation: u64, data: Option<T>) -> bool {
        self.state.send_if_modified(|state| {
            if !self.is_current(generation) {
                return false;
            }
            state.data = data;
            state.loading = false;
            state.error = None;
            true
        })
    }

    /// Records a delivery error if `generation` is still current, then
    /// publishes `event`. Existing data is kept.
    fn apply_error(&self, generation: u64, error: StoreError, event: PermissionErrorEvent) -> bool {
        let applied = self.state.send_if_modified(|state| {
            if !self.is_current(generation) {
                return false;
            }
            state.error = Some(error);
            state.loading = false;
            true
        });

        // Emitted outside the state lock so listeners may read the state.
        if applied {
            self.bus.emit(&event);
        }
        applied
    }
}

impl<T: Clone> SubscriptionCell<T> {
    fn snapshot(&self) -> LiveState<T> {
        self.state.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Operation;

    #[test]
    fn test_stale_generation_is_ignored() {
        let cell: Arc<SubscriptionCell<u32>> =
            SubscriptionCell::new(Arc::new(PermissionErrorBus::new()));
        let first = cell.invalidate();
        cell.replace(LiveState::pending(false));
        let second = cell.invalidate();

        assert!(!cell.apply_data(first, Some(1)));
        assert_eq!(cell.snapshot().data, None);

        assert!(cell.apply_data(second, Some(2)));
        assert_eq!(cell.snapshot().data, Some(2));
        assert!(!cell.snapshot().loading);
    }

    #[test]
    fn test_error_keeps_data_and_emits_once() {
        let bus = Arc::new(PermissionErrorBus::new());
        let count = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&count);
        bus.on(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let cell: Arc<SubscriptionCell<u32>> = SubscriptionCell::new(bus);
        let current = cell.invalidate();
        cell.apply_data(current, Some(7));

        let event = PermissionErrorEvent::new("a/b", Operation::List);
        assert!(cell.apply_error(current, StoreError::permission_denied("no"), event.clone()));
        assert!(!cell.apply_error(current - 1, StoreError::permission_denied("old"), event));

        let state = cell.snapshot();
        assert_eq!(state.data, Some(7));
        assert!(state.error.is_some());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_default_state_is_idle() {
        let state: LiveState<()> = LiveState::default();
        assert_eq!(state, LiveState::idle());
        assert!(LiveState::<()>::pending(true).constraints_dropped);
    }
}
