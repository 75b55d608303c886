//! Test infrastructure for the live-data layer.
//!
//! Every test builds its own [`TestContext`]: a fresh in-memory backend, a
//! context scoped to tenant `proj1`, and a recorder attached to the context's
//! error bus.

#![allow(dead_code)]

pub mod deferred;
pub mod fixtures;

pub use deferred::*;
pub use fixtures::*;

use std::sync::Arc;

use averzo_livedata::config::LiveDataConfig;
use averzo_livedata::context::DataContext;
use averzo_livedata::events::PermissionErrorEvent;
use averzo_livedata::memory::MemoryBackend;
use averzo_livedata::record::Record;
use parking_lot::Mutex;

/// Tenant used by every test context.
pub const TENANT: &str = "proj1";

/// An isolated backend, context and event recorder.
pub struct TestContext {
    pub backend: Arc<MemoryBackend>,
    pub ctx: Arc<DataContext>,
    pub events: Arc<Mutex<Vec<PermissionErrorEvent>>>,
}

impl TestContext {
    /// Creates a context with the default configuration.
    pub fn new() -> Self {
        Self::with_config(LiveDataConfig::default())
    }

    /// Creates a context with a custom configuration.
    pub fn with_config(config: LiveDataConfig) -> Self {
        let backend = Arc::new(MemoryBackend::new());
        let ctx = DataContext::builder()
            .source(backend.clone())
            .store(backend.clone())
            .tenant(TENANT)
            .config(config)
            .build()
            .expect("test context");

        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        ctx.bus().on(move |event| sink.lock().push(event.clone()));

        Self { backend, ctx, events }
    }

    /// Returns a copy of every event emitted so far.
    pub fn recorded_events(&self) -> Vec<PermissionErrorEvent> {
        self.events.lock().clone()
    }
}

/// A context over a [`DeferredSource`], with an event recorder.
pub struct DeferredContext {
    pub source: Arc<DeferredSource>,
    pub ctx: Arc<DataContext>,
    pub events: Arc<Mutex<Vec<PermissionErrorEvent>>>,
}

impl DeferredContext {
    pub fn new() -> Self {
        let source = Arc::new(DeferredSource::new());
        let ctx = DataContext::builder()
            .source(source.clone())
            .tenant(TENANT)
            .build()
            .expect("deferred context");

        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        ctx.bus().on(move |event| sink.lock().push(event.clone()));

        Self { source, ctx, events }
    }

    /// Returns a copy of every event emitted so far.
    pub fn recorded_events(&self) -> Vec<PermissionErrorEvent> {
        self.events.lock().clone()
    }
}

/// Returns the ids of `records` in order.
pub fn ids(records: &[Record]) -> Vec<String> {
    records.iter().map(|record| record.id.clone()).collect()
}
