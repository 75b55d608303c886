//! Shared data-access context.
//!
//! [`DataContext`] is the dependency-injection root handed to every adapter:
//! the backend listener source, the optional write store, the current tenant,
//! the [`PermissionErrorBus`] and the configuration. Tests build an isolated
//! context per case instead of relying on process-wide state.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

use crate::backend::{DocumentStore, SnapshotSource};
use crate::config::LiveDataConfig;
use crate::error::{ConfigError, LiveDataResult};
use crate::events::PermissionErrorBus;
use crate::path::{LogicalPath, PathNormalizer, PhysicalPath};
use crate::tenant::TenantId;

/// Everything an adapter needs to reach the backend.
///
/// The tenant may change at runtime (sign-in, sign-out). Adapters read it when
/// they register a listener; a change applies to the next input they receive.
pub struct DataContext {
    source: Arc<dyn SnapshotSource>,
    store: Option<Arc<dyn DocumentStore>>,
    tenant: RwLock<Option<TenantId>>,
    bus: Arc<PermissionErrorBus>,
    normalizer: PathNormalizer,
    config: LiveDataConfig,
}

impl DataContext {
    /// Creates a builder.
    pub fn builder() -> DataContextBuilder {
        DataContextBuilder::new()
    }

    /// Returns the listener source.
    pub fn source(&self) -> &Arc<dyn SnapshotSource> {
        &self.source
    }

    /// Returns the write store, if one is attached.
    pub fn store(&self) -> Option<&Arc<dyn DocumentStore>> {
        self.store.as_ref()
    }

    /// Returns the permission error bus.
    pub fn bus(&self) -> &Arc<PermissionErrorBus> {
        &self.bus
    }

    /// Returns the path normalizer.
    pub fn normalizer(&self) -> &PathNormalizer {
        &self.normalizer
    }

    /// Returns the configuration.
    pub fn config(&self) -> &LiveDataConfig {
        &self.config
    }

    /// Returns the current tenant.
    pub fn tenant(&self) -> Option<TenantId> {
        self.tenant.read().clone()
    }

    /// Replaces the current tenant.
    ///
    /// A tenant id containing `/` is rejected and the current tenant is kept.
    /// A blank id is accepted and behaves like no tenant.
    pub fn set_tenant(&self, tenant: Option<TenantId>) -> LiveDataResult<()> {
        validate_tenant(tenant.as_ref())?;
        info!(tenant = ?tenant, "Tenant changed");
        *self.tenant.write() = tenant;
        Ok(())
    }

    /// Normalizes a logical collection path for the current tenant.
    pub fn physical_path(&self, path: &LogicalPath) -> PhysicalPath {
        self.normalizer.normalize(path, self.tenant().as_ref())
    }

    /// Normalizes a logical document address for the current tenant.
    pub fn physical_document_path(&self, collection: &LogicalPath, id: &str) -> PhysicalPath {
        self.normalizer
            .normalize_document(collection, id, self.tenant().as_ref())
    }
}

impl std::fmt::Debug for DataContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataContext")
            .field("backend", &self.source.backend_name())
            .field("has_store", &self.store.is_some())
            .field("tenant", &self.tenant())
            .field("config", &self.config)
            .finish()
    }
}

/// Builder for [`DataContext`].
pub struct DataContextBuilder {
    source: Option<Arc<dyn SnapshotSource>>,
    store: Option<Arc<dyn DocumentStore>>,
    tenant: Option<TenantId>,
    bus: Option<Arc<PermissionErrorBus>>,
    config: LiveDataConfig,
}

impl DataContextBuilder {
    /// Creates a new builder with default configuration.
    pub fn new() -> Self {
        Self {
            source: None,
            store: None,
            tenant: None,
            bus: None,
            config: LiveDataConfig::default(),
        }
    }

    /// Sets the listener source (required).
    pub fn source(mut self, source: Arc<dyn SnapshotSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Sets the write store.
    pub fn store(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Sets the initial tenant.
    pub fn tenant(mut self, tenant: impl Into<TenantId>) -> Self {
        self.tenant = Some(tenant.into());
        self
    }

    /// Shares an existing bus instead of creating a new one.
    pub fn bus(mut self, bus: Arc<PermissionErrorBus>) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Sets the configuration.
    pub fn config(mut self, config: LiveDataConfig) -> Self {
        self.config = config;
        self
    }

    /// Validates the configuration and builds the context.
    pub fn build(self) -> LiveDataResult<Arc<DataContext>> {
        self.config.validate()?;
        validate_tenant(self.tenant.as_ref())?;
        let source = self.source.ok_or_else(|| ConfigError::MissingRequiredField {
            field: "source".to_string(),
        })?;

        Ok(Arc::new(DataContext {
            source,
            store: self.store,
            tenant: RwLock::new(self.tenant),
            bus: self.bus.unwrap_or_default(),
            normalizer: PathNormalizer::new(&self.config),
            config: self.config,
        }))
    }
}

fn validate_tenant(tenant: Option<&TenantId>) -> Result<(), ConfigError> {
    match tenant {
        Some(tenant) if !tenant.is_blank() && !tenant.is_valid_segment() => {
            Err(ConfigError::InvalidSegment {
                field: "tenant".to_string(),
                value: tenant.to_string(),
            })
        }
        _ => Ok(()),
    }
}

impl Default for DataContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}
