//! The seam to the hosted document store.
//!
//! The store itself is an external collaborator. This module defines the two
//! traits the live-data layer needs from it:
//!
//! - [`SnapshotSource`] - push-based listeners over a collection query or a
//!   single document, each returning a [`ListenerRegistration`]
//! - [`DocumentStore`] - asynchronous writes used by
//!   [`DocumentWriter`](crate::writes::DocumentWriter)
//!
//! Both work on [`PhysicalPath`]s only; path normalization happens before the
//! backend is reached.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::StoreError;
use crate::path::PhysicalPath;
use crate::query::QueryConstraint;

/// A point-in-time view of one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSnapshot {
    /// The document id (last path segment).
    pub id: String,
    /// The document's fields, or `None` if it does not exist.
    pub data: Option<Map<String, Value>>,
}

impl DocumentSnapshot {
    /// Snapshot of an existing document.
    pub fn existing(id: impl Into<String>, data: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            data: Some(data),
        }
    }

    /// Snapshot of a missing document.
    pub fn missing(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            data: None,
        }
    }

    /// Returns `true` if the document exists.
    pub fn exists(&self) -> bool {
        self.data.is_some()
    }
}

/// A point-in-time view of a query's result set, in result order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QuerySnapshot {
    /// The matching documents.
    pub documents: Vec<DocumentSnapshot>,
}

impl QuerySnapshot {
    /// Creates a snapshot from documents in result order.
    pub fn new(documents: Vec<DocumentSnapshot>) -> Self {
        Self { documents }
    }

    /// Returns the number of documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Returns `true` if the result set is empty.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// What a query listener is attached to.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryTarget {
    /// The physical collection path. Empty for collection-group queries.
    pub path: PhysicalPath,
    /// Constraints the backend should apply.
    pub constraints: Vec<QueryConstraint>,
    /// Collection id for collection-group queries.
    pub collection_group: Option<String>,
}

impl QueryTarget {
    /// Returns the best available label for logs and permission events.
    ///
    /// Prefers the concrete path, then the collection-group id.
    pub fn label(&self) -> Option<String> {
        if !self.path.is_empty() {
            Some(self.path.to_string())
        } else {
            self.collection_group.clone()
        }
    }
}

/// Callback receiving query snapshots or the listener's terminal error.
pub type QueryCallback = Arc<dyn Fn(Result<QuerySnapshot, StoreError>) + Send + Sync>;

/// Callback receiving document snapshots or the listener's terminal error.
pub type DocumentCallback = Arc<dyn Fn(Result<DocumentSnapshot, StoreError>) + Send + Sync>;

/// Handle to one registered backend listener.
///
/// Calling [`unsubscribe`](Self::unsubscribe) or dropping the handle releases
/// the listener. Release runs at most once.
pub struct ListenerRegistration {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl ListenerRegistration {
    /// Creates a registration that runs `release` on unsubscribe.
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// Creates a registration with nothing to release.
    pub fn inert() -> Self {
        Self { release: None }
    }

    /// Releases the listener now.
    pub fn unsubscribe(mut self) {
        self.release_now();
    }

    fn release_now(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for ListenerRegistration {
    fn drop(&mut self) {
        self.release_now();
    }
}

impl fmt::Debug for ListenerRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistration")
            .field("active", &self.release.is_some())
            .finish()
    }
}

/// Push-based read access to the document store.
///
/// Implementations may deliver the first snapshot synchronously from inside
/// `listen_*`; callers must not hold locks the callback needs while calling
/// these methods. Callbacks for one registration are delivered in backend
/// order. After an error no further callbacks are delivered.
pub trait SnapshotSource: Send + Sync {
    /// Returns a human-readable name for this backend.
    fn backend_name(&self) -> &'static str;

    /// Registers a listener for a collection or collection-group query.
    fn listen_query(&self, target: &QueryTarget, callback: QueryCallback) -> ListenerRegistration;

    /// Registers a listener for one document.
    fn listen_document(
        &self,
        path: &PhysicalPath,
        callback: DocumentCallback,
    ) -> ListenerRegistration;
}

/// Asynchronous write access to the document store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Creates or overwrites a document. With `merge`, top-level fields are
    /// merged into an existing document instead of replacing it.
    async fn set(
        &self,
        path: &PhysicalPath,
        data: Map<String, Value>,
        merge: bool,
    ) -> Result<(), StoreError>;

    /// Adds a document with a generated id and returns that id.
    async fn add(
        &self,
        collection: &PhysicalPath,
        data: Map<String, Value>,
    ) -> Result<String, StoreError>;

    /// Updates fields of an existing document; fails with `not-found` if it
    /// does not exist.
    async fn update(&self, path: &PhysicalPath, data: Map<String, Value>) -> Result<(), StoreError>;

    /// Deletes a document. Deleting a missing document succeeds.
    async fn delete(&self, path: &PhysicalPath) -> Result<(), StoreError>;
}
