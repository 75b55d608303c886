//! Permission error reporting.
//!
//! When a live listener or a write is rejected by the backend, the adapter
//! that owns it publishes a [`PermissionErrorEvent`] on the
//! [`PermissionErrorBus`]. Surfaces far away from the call site (a global toast,
//! an audit log) register a listener once instead of every call site threading
//! its own error callback.
//!
//! The bus is an ordinary value: construct one per application (or per test)
//! and share it through [`DataContext`](crate::context::DataContext).
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use averzo_livedata::events::{Operation, PermissionErrorBus, PermissionErrorEvent};
//!
//! let bus = PermissionErrorBus::new();
//! let seen = Arc::new(AtomicUsize::new(0));
//! let counter = Arc::clone(&seen);
//! let id = bus.on(move |event| {
//!     assert_eq!(event.operation, Operation::List);
//!     counter.fetch_add(1, Ordering::SeqCst);
//! });
//!
//! bus.emit(&PermissionErrorEvent::new("artifacts/proj1/public/data/products", Operation::List));
//! assert_eq!(seen.load(Ordering::SeqCst), 1);
//! assert!(bus.off(id));
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, trace};

/// Name of the event channel, for surfaces that key channels by name.
pub const PERMISSION_ERROR_EVENT: &str = "permission-error";

/// Operations that can be rejected by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Read a collection query.
    List,
    /// Read one document.
    Get,
    /// Create a document.
    Create,
    /// Update a document.
    Update,
    /// Delete a document.
    Delete,
}

impl Operation {
    /// Returns `true` for list and get.
    pub fn is_read(&self) -> bool {
        matches!(self, Operation::List | Operation::Get)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::List => write!(f, "list"),
            Operation::Get => write!(f, "get"),
            Operation::Create => write!(f, "create"),
            Operation::Update => write!(f, "update"),
            Operation::Delete => write!(f, "delete"),
        }
    }
}

/// A rejected backend operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionErrorEvent {
    /// Best-effort physical path of the rejected request.
    pub path: String,

    /// The rejected operation.
    pub operation: Operation,

    /// The payload of a rejected write.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_resource_data: Option<Value>,
}

impl PermissionErrorEvent {
    /// Creates an event without a request payload.
    pub fn new(path: impl Into<String>, operation: Operation) -> Self {
        Self {
            path: path.into(),
            operation,
            request_resource_data: None,
        }
    }

    /// Attaches the payload of a rejected write.
    pub fn with_request_data(mut self, data: Value) -> Self {
        self.request_resource_data = Some(data);
        self
    }
}

/// Identifies a registered listener for [`PermissionErrorBus::off`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Arc<dyn Fn(&PermissionErrorEvent) + Send + Sync>;

/// Synchronous publish/subscribe channel for [`PermissionErrorEvent`]s.
///
/// `emit` delivers to a snapshot of the listeners taken when it starts, in
/// registration order. Listeners may register or unregister (themselves
/// included) while a delivery is running; the change applies from the next
/// `emit`. Emitting with no listeners does nothing.
pub struct PermissionErrorBus {
    listeners: Mutex<Vec<(ListenerId, Listener)>>,
    next_id: AtomicU64,
}

impl PermissionErrorBus {
    /// Creates an empty bus.
    pub fn new() -> Self {
        Self {
            listeners: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Registers a listener and returns its id.
    pub fn on<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&PermissionErrorEvent) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().push((id, Arc::new(listener)));
        trace!(listener = id.0, "Registered permission error listener");
        id
    }

    /// Unregisters a listener. Returns `false` if it was not registered.
    pub fn off(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        before != listeners.len()
    }

    /// Delivers `event` to every listener registered when the call starts.
    pub fn emit(&self, event: &PermissionErrorEvent) {
        let snapshot: Vec<Listener> = self
            .listeners
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        debug!(
            path = %event.path,
            operation = %event.operation,
            listeners = snapshot.len(),
            "Emitting permission error"
        );

        for listener in snapshot {
            listener(event);
        }
    }

    /// Returns the number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }
}

impl Default for PermissionErrorBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PermissionErrorBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PermissionErrorBus")
            .field("listeners", &self.listener_count())
            .finish()
    }
}
