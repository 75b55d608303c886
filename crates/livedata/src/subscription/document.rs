//! Live single-document reads.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, warn};

use super::{LiveState, SubscriptionCell};
use crate::backend::{DocumentCallback, ListenerRegistration};
use crate::context::DataContext;
use crate::events::{Operation, PermissionErrorEvent};
use crate::query::DocumentRef;
use crate::record::Record;

/// A live, typed record for an optional document reference.
///
/// A document that does not exist is a normal outcome: `data` is `None`,
/// `loading` is `false` and `error` stays `None`. Delivery errors are
/// reported with [`Operation::Get`].
pub struct DocumentSubscription {
    ctx: Arc<DataContext>,
    cell: Arc<SubscriptionCell<Record>>,
    reference: Option<DocumentRef>,
    registration: Option<ListenerRegistration>,
}

impl DocumentSubscription {
    /// Creates an idle adapter.
    pub fn new(ctx: Arc<DataContext>) -> Self {
        let cell = SubscriptionCell::new(Arc::clone(ctx.bus()));
        Self {
            ctx,
            cell,
            reference: None,
            registration: None,
        }
    }

    /// Creates an adapter and subscribes to `reference` immediately.
    pub fn with_reference(ctx: Arc<DataContext>, reference: Option<DocumentRef>) -> Self {
        let mut subscription = Self::new(ctx);
        subscription.set_reference(reference);
        subscription
    }

    /// Returns the current input reference.
    pub fn reference(&self) -> Option<&DocumentRef> {
        self.reference.as_ref()
    }

    /// Returns a clone of the latest state.
    pub fn state(&self) -> LiveState<Record> {
        self.cell.snapshot()
    }

    /// Returns a receiver that observes every state change.
    pub fn watch(&self) -> watch::Receiver<LiveState<Record>> {
        self.cell.state.subscribe()
    }

    /// Returns `true` while a backend listener is held.
    pub fn is_listening(&self) -> bool {
        self.registration.is_some()
    }

    /// Replaces the input reference.
    ///
    /// Same contract as
    /// [`CollectionSubscription::set_query`](super::CollectionSubscription::set_query).
    pub fn set_reference(&mut self, reference: Option<DocumentRef>) {
        if reference == self.reference && (reference.is_none() || self.registration.is_some()) {
            return;
        }

        self.teardown();
        self.reference = reference.clone();

        let Some(reference) = reference else {
            self.cell.replace(LiveState::idle());
            return;
        };

        let path = self
            .ctx
            .physical_document_path(&reference.collection, &reference.id);
        let generation = self.cell.invalidate();
        self.cell.replace(LiveState::pending(false));

        let label = path.to_string();
        debug!(logical = %reference, physical = %label, generation, "Subscribing to document");

        let cell = Arc::clone(&self.cell);
        let callback: DocumentCallback = Arc::new(move |delivery| match delivery {
            Ok(snapshot) => {
                cell.apply_data(generation, Record::from_snapshot(&snapshot));
            }
            Err(error) => {
                warn!(path = %label, code = %error.code, "Document listener failed");
                let event = PermissionErrorEvent::new(label.clone(), Operation::Get);
                cell.apply_error(generation, error, event);
            }
        });

        self.registration = Some(self.ctx.source().listen_document(&path, callback));
    }

    fn teardown(&mut self) {
        self.cell.invalidate();
        if let Some(registration) = self.registration.take() {
            let reference = self.reference.as_ref().map(ToString::to_string);
            debug!(reference = ?reference, "Releasing document listener");
            registration.unsubscribe();
        }
    }
}

impl Drop for DocumentSubscription {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl std::fmt::Debug for DocumentSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentSubscription")
            .field("reference", &self.reference)
            .field("listening", &self.registration.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBackend;
    use serde_json::json;

    fn context(backend: &Arc<MemoryBackend>) -> Arc<DataContext> {
        DataContext::builder()
            .source(backend.clone())
            .tenant("proj1")
            .build()
            .unwrap()
    }

    #[test]
    fn test_existing_document() {
        let backend = Arc::new(MemoryBackend::new());
        backend.put("artifacts/proj1/public/data/settings", "site", json!({"theme": "dark"}));

        let subscription = DocumentSubscription::with_reference(
            context(&backend),
            Some(DocumentRef::new("settings", "site")),
        );

        let state = subscription.state();
        let record = state.data.unwrap();
        assert_eq!(record.id, "site");
        assert_eq!(record.get("theme"), Some(&json!("dark")));
        assert!(!state.loading);
        assert!(!state.constraints_dropped);
    }

    #[test]
    fn test_missing_document_is_not_an_error() {
        let backend = Arc::new(MemoryBackend::new());
        let subscription = DocumentSubscription::with_reference(
            context(&backend),
            Some(DocumentRef::new("settings", "absent")),
        );

        assert_eq!(subscription.state(), LiveState::idle());
        assert!(subscription.is_listening());
    }

    #[test]
    fn test_clearing_reference_releases_listener() {
        let backend = Arc::new(MemoryBackend::new());
        let mut subscription = DocumentSubscription::with_reference(
            context(&backend),
            Some(DocumentRef::new("settings", "site")),
        );
        assert_eq!(backend.active_listeners(), 1);

        subscription.set_reference(None);
        assert_eq!(backend.active_listeners(), 0);
        assert_eq!(subscription.state(), LiveState::idle());
    }
}
