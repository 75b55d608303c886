//! Tenant-scoped document writes.
//!
//! [`DocumentWriter`] takes logical addresses, normalizes them through the
//! context, and forwards the write to the attached
//! [`DocumentStore`](crate::backend::DocumentStore). A failed write publishes a
//! [`PermissionErrorEvent`] carrying the request payload before the error is
//! returned, so the same reporting surface sees read and write denials.
//!
//! The `*_non_blocking` variants spawn the write on the current tokio runtime
//! and never surface the error to the caller; the bus is the only signal.

use std::future::Future;
use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::backend::DocumentStore;
use crate::context::DataContext;
use crate::error::{ConfigError, LiveDataError, LiveDataResult, PermissionDeniedError, StoreError};
use crate::events::{Operation, PermissionErrorEvent};
use crate::path::{LogicalPath, PhysicalPath};
use crate::query::DocumentRef;

/// Writes documents addressed by logical paths.
#[derive(Clone, Debug)]
pub struct DocumentWriter {
    ctx: Arc<DataContext>,
}

impl DocumentWriter {
    /// Creates a writer over `ctx`.
    pub fn new(ctx: Arc<DataContext>) -> Self {
        Self { ctx }
    }

    /// Creates or overwrites a document. With `merge`, fields are merged into
    /// an existing document.
    pub async fn set(
        &self,
        reference: &DocumentRef,
        data: Map<String, Value>,
        merge: bool,
    ) -> LiveDataResult<()> {
        let store = self.store()?;
        let path = self.document_path(reference);
        debug!(path = %path, merge, "Setting document");

        let payload = Value::Object(data.clone());
        store
            .set(&path, data, merge)
            .await
            .map_err(|error| self.report(&path, Operation::Create, Some(payload), error))
    }

    /// Adds a document with a generated id to `collection` and returns the id.
    pub async fn add(
        &self,
        collection: &LogicalPath,
        data: Map<String, Value>,
    ) -> LiveDataResult<String> {
        let store = self.store()?;
        let path = self.ctx.physical_path(collection);
        debug!(collection = %path, "Adding document");

        let payload = Value::Object(data.clone());
        store
            .add(&path, data)
            .await
            .map_err(|error| self.report(&path, Operation::Create, Some(payload), error))
    }

    /// Updates fields of an existing document.
    pub async fn update(
        &self,
        reference: &DocumentRef,
        data: Map<String, Value>,
    ) -> LiveDataResult<()> {
        let store = self.store()?;
        let path = self.document_path(reference);
        debug!(path = %path, "Updating document");

        let payload = Value::Object(data.clone());
        store
            .update(&path, data)
            .await
            .map_err(|error| self.report(&path, Operation::Update, Some(payload), error))
    }

    /// Deletes a document.
    pub async fn delete(&self, reference: &DocumentRef) -> LiveDataResult<()> {
        let store = self.store()?;
        let path = self.document_path(reference);
        debug!(path = %path, "Deleting document");

        store
            .delete(&path)
            .await
            .map_err(|error| self.report(&path, Operation::Delete, None, error))
    }

    /// Spawns [`set`](Self::set) without waiting for it.
    ///
    /// Returns `None` when called outside a tokio runtime.
    pub fn set_non_blocking(
        &self,
        reference: DocumentRef,
        data: Map<String, Value>,
        merge: bool,
    ) -> Option<JoinHandle<()>> {
        let writer = self.clone();
        spawn_detached("set", async move { writer.set(&reference, data, merge).await })
    }

    /// Spawns [`add`](Self::add) without waiting for it.
    pub fn add_non_blocking(
        &self,
        collection: LogicalPath,
        data: Map<String, Value>,
    ) -> Option<JoinHandle<()>> {
        let writer = self.clone();
        spawn_detached("add", async move {
            writer.add(&collection, data).await.map(|_| ())
        })
    }

    /// Spawns [`update`](Self::update) without waiting for it.
    pub fn update_non_blocking(
        &self,
        reference: DocumentRef,
        data: Map<String, Value>,
    ) -> Option<JoinHandle<()>> {
        let writer = self.clone();
        spawn_detached("update", async move { writer.update(&reference, data).await })
    }

    /// Spawns [`delete`](Self::delete) without waiting for it.
    pub fn delete_non_blocking(&self, reference: DocumentRef) -> Option<JoinHandle<()>> {
        let writer = self.clone();
        spawn_detached("delete", async move { writer.delete(&reference).await })
    }

    fn store(&self) -> LiveDataResult<&Arc<dyn DocumentStore>> {
        self.ctx
            .store()
            .ok_or_else(|| ConfigError::StoreNotConfigured.into())
    }

    fn document_path(&self, reference: &DocumentRef) -> PhysicalPath {
        self.ctx
            .physical_document_path(&reference.collection, &reference.id)
    }

    /// Publishes the failure and converts it for the caller.
    fn report(
        &self,
        path: &PhysicalPath,
        operation: Operation,
        payload: Option<Value>,
        error: StoreError,
    ) -> LiveDataError {
        warn!(path = %path, operation = %operation, code = %error.code, "Write rejected");

        let mut event = PermissionErrorEvent::new(path.to_string(), operation);
        if let Some(payload) = payload {
            event = event.with_request_data(payload);
        }
        self.ctx.bus().emit(&event);

        if error.code.is_access_denied() {
            PermissionDeniedError::new(event).into()
        } else {
            error.into()
        }
    }
}

fn spawn_detached<F>(operation: &'static str, write: F) -> Option<JoinHandle<()>>
where
    F: Future<Output = LiveDataResult<()>> + Send + 'static,
{
    let Ok(handle) = Handle::try_current() else {
        warn!(operation, "No tokio runtime; write not started");
        return None;
    };

    Some(handle.spawn(async move {
        // Failures were already published on the bus.
        if let Err(error) = write.await {
            debug!(operation, %error, "Non-blocking write failed");
        }
    }))
}
