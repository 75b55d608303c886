//! A listener source that holds callbacks until the test fires them.
//!
//! Unlike the in-memory backend it keeps a callback after its registration
//! is released, so a test can play the part of a delivery that was already
//! in flight when the adapter tore the listener down.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use averzo_livedata::backend::{
    DocumentCallback, ListenerRegistration, QueryCallback, QueryTarget, SnapshotSource,
};
use averzo_livedata::path::PhysicalPath;
use parking_lot::Mutex;

/// Records every `listen_*` call and never delivers on its own.
#[derive(Default)]
pub struct DeferredSource {
    queries: Mutex<Vec<(QueryTarget, QueryCallback)>>,
    documents: Mutex<Vec<(PhysicalPath, DocumentCallback)>>,
    released: Arc<AtomicUsize>,
}

impl DeferredSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// The callback of the `index`-th query registration.
    pub fn query_callback(&self, index: usize) -> QueryCallback {
        Arc::clone(&self.queries.lock()[index].1)
    }

    /// The target of the `index`-th query registration.
    pub fn query_target(&self, index: usize) -> QueryTarget {
        self.queries.lock()[index].0.clone()
    }

    /// The callback of the `index`-th document registration.
    pub fn document_callback(&self, index: usize) -> DocumentCallback {
        Arc::clone(&self.documents.lock()[index].1)
    }

    /// The path of the `index`-th document registration.
    pub fn document_path(&self, index: usize) -> PhysicalPath {
        self.documents.lock()[index].0.clone()
    }

    /// Number of registrations released so far.
    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    fn registration(&self) -> ListenerRegistration {
        let released = Arc::clone(&self.released);
        ListenerRegistration::new(move || {
            released.fetch_add(1, Ordering::SeqCst);
        })
    }
}

impl SnapshotSource for DeferredSource {
    fn backend_name(&self) -> &'static str {
        "deferred"
    }

    fn listen_query(&self, target: &QueryTarget, callback: QueryCallback) -> ListenerRegistration {
        self.queries.lock().push((target.clone(), callback));
        self.registration()
    }

    fn listen_document(
        &self,
        path: &PhysicalPath,
        callback: DocumentCallback,
    ) -> ListenerRegistration {
        self.documents.lock().push((path.clone(), callback));
        self.registration()
    }
}
