//! In-memory document store.
//!
//! [`MemoryBackend`] implements both [`SnapshotSource`] and [`DocumentStore`]
//! over physical paths. It re-delivers snapshots to matching listeners after
//! every write, evaluates filters, sorts and limits, and can be told to
//! reject operations under a path prefix to simulate security-rule denials.
//! Tests and the path inspector use it in place of the hosted backend.
//!
//! Like the hosted store, it delivers the first snapshot from inside
//! `listen_*`, and a listener that has received an error receives nothing
//! further. Deliveries are serialized, so each listener sees snapshots in
//! the order the writes were applied.
//!
//! # Example
//!
//! ```
//! use averzo_livedata::events::Operation;
//! use averzo_livedata::memory::MemoryBackend;
//! use serde_json::json;
//!
//! let backend = MemoryBackend::new();
//! backend.put("artifacts/proj1/public/data/products", "p1", json!({"name": "Lamp"}));
//! backend.deny("artifacts/proj1/users", &[Operation::List, Operation::Get]);
//!
//! assert!(backend.document("artifacts/proj1/public/data/products", "p1").is_some());
//! ```

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{Mutex, ReentrantMutex};
use serde_json::{Map, Value};
use tracing::{debug, trace};
use uuid::Uuid;

use crate::backend::{
    DocumentCallback, DocumentSnapshot, DocumentStore, ListenerRegistration, QueryCallback,
    QuerySnapshot, QueryTarget, SnapshotSource,
};
use crate::error::StoreError;
use crate::events::Operation;
use crate::path::PhysicalPath;
use crate::query::{FilterOp, QueryConstraint, SortDirection};

const DENIED_MESSAGE: &str = "Missing or insufficient permissions.";

enum Watcher {
    Query {
        target: QueryTarget,
        callback: QueryCallback,
    },
    Document {
        path: PhysicalPath,
        callback: DocumentCallback,
    },
}

enum Delivery {
    Query(QueryCallback, Result<QuerySnapshot, StoreError>),
    Document(DocumentCallback, Result<DocumentSnapshot, StoreError>),
}

impl Delivery {
    fn deliver(self) {
        match self {
            Delivery::Query(callback, result) => callback(result),
            Delivery::Document(callback, result) => callback(result),
        }
    }
}

struct DenyRule {
    prefix: PhysicalPath,
    operations: Vec<Operation>,
}

#[derive(Default)]
struct MemoryState {
    /// Collection path -> document id -> fields.
    collections: BTreeMap<PhysicalPath, BTreeMap<String, Map<String, Value>>>,
    watchers: HashMap<u64, Watcher>,
    deny_rules: Vec<DenyRule>,
    next_listener_id: u64,
    registrations: usize,
    released: usize,
    last_query_target: Option<QueryTarget>,
}

impl MemoryState {
    fn is_denied(&self, path: &PhysicalPath, operation: Operation) -> bool {
        self.deny_rules
            .iter()
            .any(|rule| path.starts_with(&rule.prefix) && rule.operations.contains(&operation))
    }

    fn document_snapshot(&self, path: &PhysicalPath) -> DocumentSnapshot {
        let id = path.last().unwrap_or_default().to_string();
        let data = path
            .parent()
            .and_then(|collection| self.collections.get(&collection))
            .and_then(|docs| docs.get(&id))
            .cloned();
        DocumentSnapshot { id, data }
    }

    fn query_snapshot(&self, target: &QueryTarget) -> QuerySnapshot {
        let mut documents: Vec<DocumentSnapshot> = self
            .collections
            .iter()
            .filter(|(collection, _)| matches_target(target, collection))
            .flat_map(|(_, docs)| {
                docs.iter()
                    .map(|(id, data)| DocumentSnapshot::existing(id.clone(), data.clone()))
            })
            .collect();

        for constraint in &target.constraints {
            if let QueryConstraint::Where { field, op, value } = constraint {
                documents.retain(|doc| {
                    doc.data
                        .as_ref()
                        .is_some_and(|data| matches_filter(data, field, *op, value))
                });
            }
        }

        let sorts: Vec<(&String, SortDirection)> = target
            .constraints
            .iter()
            .filter_map(|constraint| match constraint {
                QueryConstraint::OrderBy { field, direction } => Some((field, *direction)),
                _ => None,
            })
            .collect();
        if !sorts.is_empty() {
            documents.retain(|doc| {
                sorts
                    .iter()
                    .all(|(field, _)| doc.data.as_ref().and_then(|d| lookup(d, field)).is_some())
            });
            documents.sort_by(|a, b| {
                for (field, direction) in &sorts {
                    let left = a.data.as_ref().and_then(|d| lookup(d, field));
                    let right = b.data.as_ref().and_then(|d| lookup(d, field));
                    let ordering = match (left, right) {
                        (Some(l), Some(r)) => compare_values(l, r).unwrap_or(Ordering::Equal),
                        _ => Ordering::Equal,
                    };
                    let ordering = match direction {
                        SortDirection::Ascending => ordering,
                        SortDirection::Descending => ordering.reverse(),
                    };
                    if ordering != Ordering::Equal {
                        return ordering;
                    }
                }
                Ordering::Equal
            });
        }

        let limit = target.constraints.iter().find_map(|constraint| match constraint {
            QueryConstraint::Limit { count } => Some(*count as usize),
            _ => None,
        });
        if let Some(limit) = limit {
            documents.truncate(limit);
        }

        QuerySnapshot::new(documents)
    }

    fn insert_watcher(&mut self, watcher: Watcher) -> u64 {
        let id = self.next_listener_id;
        self.next_listener_id += 1;
        self.watchers.insert(id, watcher);
        id
    }

    /// Collects fresh snapshots for every listener affected by a change to
    /// the document at `path`.
    fn pending_deliveries(&self, path: &PhysicalPath) -> Vec<Delivery> {
        let Some(collection) = path.parent() else {
            return Vec::new();
        };

        let mut ids: Vec<&u64> = self.watchers.keys().collect();
        ids.sort();

        ids.into_iter()
            .filter_map(|id| match &self.watchers[id] {
                Watcher::Query { target, callback } if matches_target(target, &collection) => Some(
                    Delivery::Query(Arc::clone(callback), Ok(self.query_snapshot(target))),
                ),
                Watcher::Document {
                    path: watched,
                    callback,
                } if watched == path => Some(Delivery::Document(
                    Arc::clone(callback),
                    Ok(self.document_snapshot(watched)),
                )),
                _ => None,
            })
            .collect()
    }
}

/// A thread-safe, in-process document store with live listeners.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    state: Arc<Mutex<MemoryState>>,
    /// Held from snapshot to delivery. Reentrant so callbacks may write.
    delivery: Arc<ReentrantMutex<()>>,
}

impl MemoryBackend {
    /// Creates an empty store with no deny rules.
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes a document without access checks and notifies listeners.
    ///
    /// Non-object values are stored as an empty field map.
    pub fn put(&self, collection: &str, id: &str, data: Value) {
        let path = PhysicalPath::from_segments([collection, id]);
        let fields = match data {
            Value::Object(fields) => fields,
            _ => Map::new(),
        };
        self.write(&path, |docs, id| {
            docs.insert(id.to_string(), fields);
        });
    }

    /// Removes a document without access checks and notifies listeners.
    pub fn remove(&self, collection: &str, id: &str) {
        let path = PhysicalPath::from_segments([collection, id]);
        self.write(&path, |docs, id| {
            docs.remove(id);
        });
    }

    /// Returns a stored document's fields.
    pub fn document(&self, collection: &str, id: &str) -> Option<Value> {
        let collection = PhysicalPath::from_segments([collection]);
        self.state
            .lock()
            .collections
            .get(&collection)
            .and_then(|docs| docs.get(id))
            .map(|fields| Value::Object(fields.clone()))
    }

    /// Returns the number of documents in a collection.
    pub fn count(&self, collection: &str) -> usize {
        let collection = PhysicalPath::from_segments([collection]);
        self.state
            .lock()
            .collections
            .get(&collection)
            .map_or(0, BTreeMap::len)
    }

    /// Rejects `operations` on every path at or beneath `prefix`.
    ///
    /// An empty prefix matches every path.
    pub fn deny(&self, prefix: &str, operations: &[Operation]) {
        self.state.lock().deny_rules.push(DenyRule {
            prefix: PhysicalPath::from_segments([prefix]),
            operations: operations.to_vec(),
        });
    }

    /// Removes all deny rules.
    pub fn allow_all(&self) {
        self.state.lock().deny_rules.clear();
    }

    /// Delivers `error` to every live listener at or beneath `prefix` and
    /// terminates them, as the hosted store does when access is revoked.
    ///
    /// Returns the number of listeners that were failed.
    pub fn fail_listeners(&self, prefix: &str, error: StoreError) -> usize {
        let prefix = PhysicalPath::from_segments([prefix]);
        let _delivering = self.delivery.lock();
        let failed: Vec<Watcher> = {
            let mut state = self.state.lock();
            let mut ids: Vec<u64> = state
                .watchers
                .iter()
                .filter(|(_, watcher)| match watcher {
                    Watcher::Query { target, .. } => target.path.starts_with(&prefix),
                    Watcher::Document { path, .. } => path.starts_with(&prefix),
                })
                .map(|(id, _)| *id)
                .collect();
            ids.sort_unstable();
            ids.into_iter()
                .filter_map(|id| state.watchers.remove(&id))
                .collect()
        };

        let count = failed.len();
        debug!(prefix = %prefix, count, "Failing memory listeners");
        for watcher in failed {
            match watcher {
                Watcher::Query { callback, .. } => callback(Err(error.clone())),
                Watcher::Document { callback, .. } => callback(Err(error.clone())),
            }
        }
        count
    }

    /// Number of listeners currently live.
    pub fn active_listeners(&self) -> usize {
        self.state.lock().watchers.len()
    }

    /// Number of `listen_*` calls ever made.
    pub fn total_registrations(&self) -> usize {
        self.state.lock().registrations
    }

    /// Number of registrations released by their owner.
    pub fn released_listeners(&self) -> usize {
        self.state.lock().released
    }

    /// The target of the most recent `listen_query` call.
    pub fn last_query_target(&self) -> Option<QueryTarget> {
        self.state.lock().last_query_target.clone()
    }

    fn write<F>(&self, path: &PhysicalPath, mutate: F)
    where
        F: FnOnce(&mut BTreeMap<String, Map<String, Value>>, &str),
    {
        let _delivering = self.delivery.lock();
        let deliveries = {
            let mut state = self.state.lock();
            let (Some(collection), Some(id)) = (path.parent(), path.last()) else {
                return;
            };
            let docs = state.collections.entry(collection.clone()).or_default();
            mutate(docs, id);
            if docs.is_empty() {
                state.collections.remove(&collection);
            }
            state.pending_deliveries(path)
        };

        trace!(path = %path, listeners = deliveries.len(), "Memory write");
        for delivery in deliveries {
            delivery.deliver();
        }
    }

    fn check(&self, path: &PhysicalPath, operation: Operation) -> Result<(), StoreError> {
        if self.state.lock().is_denied(path, operation) {
            debug!(path = %path, operation = %operation, "Memory backend denied request");
            return Err(StoreError::permission_denied(DENIED_MESSAGE));
        }
        Ok(())
    }

    fn release_handle(&self, id: Option<u64>) -> ListenerRegistration {
        let state = Arc::clone(&self.state);
        ListenerRegistration::new(move || {
            let mut state = state.lock();
            state.released += 1;
            if let Some(id) = id {
                state.watchers.remove(&id);
            }
        })
    }
}

impl SnapshotSource for MemoryBackend {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    fn listen_query(&self, target: &QueryTarget, callback: QueryCallback) -> ListenerRegistration {
        let _delivering = self.delivery.lock();
        let (id, initial) = {
            let mut state = self.state.lock();
            state.registrations += 1;
            state.last_query_target = Some(target.clone());
            if state.is_denied(&target.path, Operation::List) {
                let denied = StoreError::permission_denied(DENIED_MESSAGE);
                (None, Delivery::Query(callback, Err(denied)))
            } else {
                let snapshot = state.query_snapshot(target);
                let id = state.insert_watcher(Watcher::Query {
                    target: target.clone(),
                    callback: Arc::clone(&callback),
                });
                (Some(id), Delivery::Query(callback, Ok(snapshot)))
            }
        };

        initial.deliver();
        self.release_handle(id)
    }

    fn listen_document(
        &self,
        path: &PhysicalPath,
        callback: DocumentCallback,
    ) -> ListenerRegistration {
        let _delivering = self.delivery.lock();
        let (id, initial) = {
            let mut state = self.state.lock();
            state.registrations += 1;
            if state.is_denied(path, Operation::Get) {
                let denied = StoreError::permission_denied(DENIED_MESSAGE);
                (None, Delivery::Document(callback, Err(denied)))
            } else {
                let snapshot = state.document_snapshot(path);
                let id = state.insert_watcher(Watcher::Document {
                    path: path.clone(),
                    callback: Arc::clone(&callback),
                });
                (Some(id), Delivery::Document(callback, Ok(snapshot)))
            }
        };

        initial.deliver();
        self.release_handle(id)
    }
}

#[async_trait]
impl DocumentStore for MemoryBackend {
    async fn set(
        &self,
        path: &PhysicalPath,
        data: Map<String, Value>,
        merge: bool,
    ) -> Result<(), StoreError> {
        self.check(path, Operation::Create)?;
        self.write(path, |docs, id| {
            if merge {
                if let Some(existing) = docs.get_mut(id) {
                    existing.extend(data);
                    return;
                }
            }
            docs.insert(id.to_string(), data);
        });
        Ok(())
    }

    async fn add(
        &self,
        collection: &PhysicalPath,
        data: Map<String, Value>,
    ) -> Result<String, StoreError> {
        let id = Uuid::new_v4().simple().to_string();
        let path = collection.child(&id);
        self.check(&path, Operation::Create)?;
        self.write(&path, |docs, id| {
            docs.insert(id.to_string(), data);
        });
        Ok(id)
    }

    async fn update(
        &self,
        path: &PhysicalPath,
        data: Map<String, Value>,
    ) -> Result<(), StoreError> {
        self.check(path, Operation::Update)?;
        let exists = self.state.lock().document_snapshot(path).exists();
        if !exists {
            return Err(StoreError::not_found(format!("No document to update: {}", path)));
        }
        self.write(path, |docs, id| {
            if let Some(existing) = docs.get_mut(id) {
                existing.extend(data);
            }
        });
        Ok(())
    }

    async fn delete(&self, path: &PhysicalPath) -> Result<(), StoreError> {
        self.check(path, Operation::Delete)?;
        self.write(path, |docs, id| {
            docs.remove(id);
        });
        Ok(())
    }
}

impl std::fmt::Debug for MemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("MemoryBackend")
            .field("collections", &state.collections.len())
            .field("listeners", &state.watchers.len())
            .finish()
    }
}

fn matches_target(target: &QueryTarget, collection: &PhysicalPath) -> bool {
    if !target.path.is_empty() {
        return &target.path == collection;
    }
    match &target.collection_group {
        Some(group) => collection.last() == Some(group.as_str()),
        None => false,
    }
}

fn lookup<'a>(data: &'a Map<String, Value>, field: &str) -> Option<&'a Value> {
    let mut parts = field.split('.');
    let mut current = data.get(parts.next()?)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

fn compare_values(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => l.as_f64()?.partial_cmp(&r.as_f64()?),
        (Value::String(l), Value::String(r)) => Some(l.cmp(r)),
        (Value::Bool(l), Value::Bool(r)) => Some(l.cmp(r)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

fn values_equal(left: &Value, right: &Value) -> bool {
    compare_values(left, right).map_or_else(|| left == right, |o| o == Ordering::Equal)
}

fn matches_filter(data: &Map<String, Value>, field: &str, op: FilterOp, value: &Value) -> bool {
    let Some(actual) = lookup(data, field) else {
        return false;
    };
    match op {
        FilterOp::Equal => values_equal(actual, value),
        FilterOp::NotEqual => !values_equal(actual, value),
        FilterOp::LessThan => compare_values(actual, value) == Some(Ordering::Less),
        FilterOp::LessThanOrEqual => matches!(
            compare_values(actual, value),
            Some(Ordering::Less | Ordering::Equal)
        ),
        FilterOp::GreaterThan => compare_values(actual, value) == Some(Ordering::Greater),
        FilterOp::GreaterThanOrEqual => matches!(
            compare_values(actual, value),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        FilterOp::ArrayContains => actual
            .as_array()
            .is_some_and(|items| items.iter().any(|item| values_equal(item, value))),
        FilterOp::In => value
            .as_array()
            .is_some_and(|options| options.iter().any(|option| values_equal(actual, option))),
    }
}
