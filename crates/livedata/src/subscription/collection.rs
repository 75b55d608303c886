//! Live collection queries.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, warn};

use super::{LiveState, SubscriptionCell};
use crate::backend::{ListenerRegistration, QueryCallback, QueryTarget};
use crate::config::ConstraintPolicy;
use crate::context::DataContext;
use crate::events::{Operation, PermissionErrorEvent};
use crate::query::QueryDescriptor;
use crate::record::Record;

/// A live, typed list of records for an optional query.
///
/// With no query the state is idle and no backend listener is held. With a
/// query, exactly one listener is held on the query's physical path until
/// the query changes or the adapter is dropped.
///
/// # Constraint handling
///
/// When the query path is rewritten into the tenant namespace, the configured
/// [`ConstraintPolicy`] decides whether the filters, sorts and limits survive.
/// Under [`ConstraintPolicy::DropOnRewrite`] the rewritten query fetches the
/// whole collection and [`LiveState::constraints_dropped`] is set.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use averzo_livedata::context::DataContext;
/// use averzo_livedata::memory::MemoryBackend;
/// use averzo_livedata::query::QueryDescriptor;
/// use averzo_livedata::subscription::CollectionSubscription;
/// use serde_json::json;
///
/// let backend = Arc::new(MemoryBackend::new());
/// backend.put("artifacts/proj1/public/data/products", "p1", json!({"name": "Lamp"}));
///
/// let ctx = DataContext::builder()
///     .source(backend.clone())
///     .tenant("proj1")
///     .build()
///     .unwrap();
///
/// let mut products = CollectionSubscription::new(ctx);
/// products.set_query(Some(QueryDescriptor::collection("products")));
///
/// let state = products.state();
/// assert!(!state.loading);
/// assert_eq!(state.data.unwrap()[0].id, "p1");
/// ```
pub struct CollectionSubscription {
    ctx: Arc<DataContext>,
    cell: Arc<SubscriptionCell<Vec<Record>>>,
    query: Option<QueryDescriptor>,
    registration: Option<ListenerRegistration>,
}

impl CollectionSubscription {
    /// Creates an idle adapter.
    pub fn new(ctx: Arc<DataContext>) -> Self {
        let cell = SubscriptionCell::new(Arc::clone(ctx.bus()));
        Self {
            ctx,
            cell,
            query: None,
            registration: None,
        }
    }

    /// Creates an adapter and subscribes to `query` immediately.
    pub fn with_query(ctx: Arc<DataContext>, query: Option<QueryDescriptor>) -> Self {
        let mut subscription = Self::new(ctx);
        subscription.set_query(query);
        subscription
    }

    /// Returns the current input query.
    pub fn query(&self) -> Option<&QueryDescriptor> {
        self.query.as_ref()
    }

    /// Returns a clone of the latest state.
    pub fn state(&self) -> LiveState<Vec<Record>> {
        self.cell.snapshot()
    }

    /// Returns a receiver that observes every state change.
    pub fn watch(&self) -> watch::Receiver<LiveState<Vec<Record>>> {
        self.cell.state.subscribe()
    }

    /// Returns `true` while a backend listener is held.
    pub fn is_listening(&self) -> bool {
        self.registration.is_some()
    }

    /// Replaces the input query.
    ///
    /// An input equal to the current one is ignored. Otherwise the previous
    /// listener is released, the state resets synchronously, and a new
    /// listener is registered if `query` is `Some`.
    pub fn set_query(&mut self, query: Option<QueryDescriptor>) {
        if query == self.query && (query.is_none() || self.registration.is_some()) {
            return;
        }

        self.teardown();
        self.query = query.clone();

        let Some(query) = query else {
            self.cell.replace(LiveState::idle());
            return;
        };

        let (target, constraints_dropped) = self.resolve(&query);
        let generation = self.cell.invalidate();
        self.cell.replace(LiveState::pending(constraints_dropped));

        let label = target
            .label()
            .unwrap_or_else(|| self.ctx.config().unknown_path_label.clone());
        debug!(
            logical = %query.path,
            physical = %label,
            generation,
            constraints_dropped,
            "Subscribing to collection"
        );

        let cell = Arc::clone(&self.cell);
        let callback: QueryCallback = Arc::new(move |delivery| match delivery {
            Ok(snapshot) => {
                let records = snapshot
                    .documents
                    .iter()
                    .filter_map(Record::from_snapshot)
                    .collect();
                cell.apply_data(generation, Some(records));
            }
            Err(error) => {
                warn!(path = %label, code = %error.code, "Collection listener failed");
                let event = PermissionErrorEvent::new(label.clone(), Operation::List);
                cell.apply_error(generation, error, event);
            }
        });

        self.registration = Some(self.ctx.source().listen_query(&target, callback));
    }

    /// Releases the listener, if any, and invalidates its callbacks.
    fn teardown(&mut self) {
        self.cell.invalidate();
        if let Some(registration) = self.registration.take() {
            let query = self.query.as_ref().map(|q| q.path.to_string());
            debug!(query = ?query, "Releasing collection listener");
            registration.unsubscribe();
        }
    }

    fn resolve(&self, query: &QueryDescriptor) -> (QueryTarget, bool) {
        let tenant = self.ctx.tenant();
        let normalizer = self.ctx.normalizer();
        let scope = normalizer.classify(&query.path, tenant.as_ref());
        let path = normalizer.normalize(&query.path, tenant.as_ref());

        let drop_constraints = scope.rewrites()
            && query.is_constrained()
            && self.ctx.config().constraint_policy == ConstraintPolicy::DropOnRewrite;

        if drop_constraints {
            warn!(
                logical = %query.path,
                physical = %path,
                dropped = query.constraints.len(),
                "Rewritten query issued without its constraints"
            );
        }

        let constraints = if drop_constraints {
            Vec::new()
        } else {
            query.constraints.clone()
        };

        (
            QueryTarget {
                path,
                constraints,
                collection_group: query.collection_group.clone(),
            },
            drop_constraints,
        )
    }
}

impl Drop for CollectionSubscription {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl std::fmt::Debug for CollectionSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectionSubscription")
            .field("query", &self.query)
            .field("listening", &self.registration.is_some())
            .finish()
    }
}
