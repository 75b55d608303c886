//! # averzo-livedata
//!
//! Tenant-scoped live data access for the AVERzO storefront.
//!
//! Application code names collections with short logical paths (`products`,
//! `users/u123/paymentMethods`). Every deployment stores its data under its
//! own namespace in a shared document store, so this crate sits between the
//! two:
//!
//! - [`path`] rewrites logical paths into tenant-scoped physical paths
//! - [`subscription`] keeps live, typed views of a collection query or a
//!   single document, releasing backend listeners when the input changes
//! - [`events`] publishes every rejected request on a [`PermissionErrorBus`]
//!   so one surface can report access-control failures
//! - [`writes`] sends tenant-scoped writes and reports their failures the
//!   same way
//!
//! The document store itself is a collaborator behind the traits in
//! [`backend`]. [`memory::MemoryBackend`] implements them in-process.
//!
//! ## Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use averzo_livedata::{CollectionSubscription, DataContext, QueryDescriptor};
//! use averzo_livedata::memory::MemoryBackend;
//! use serde_json::json;
//!
//! let backend = Arc::new(MemoryBackend::new());
//! backend.put("artifacts/proj1/public/data/products", "p1", json!({"name": "Lamp"}));
//!
//! let ctx = DataContext::builder()
//!     .source(backend.clone())
//!     .store(backend.clone())
//!     .tenant("proj1")
//!     .build()
//!     .unwrap();
//!
//! ctx.bus().on(|event| eprintln!("denied: {} {}", event.operation, event.path));
//!
//! let products = CollectionSubscription::with_query(
//!     ctx,
//!     Some(QueryDescriptor::collection("products")),
//! );
//! assert_eq!(products.state().data.map(|records| records.len()), Some(1));
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` - builds the `livedata-paths` inspector and [`observability`]

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod backend;
pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod memory;
#[cfg(feature = "cli")]
pub mod observability;
pub mod path;
pub mod query;
pub mod record;
pub mod subscription;
pub mod tenant;
pub mod writes;

// Re-export commonly used types at crate root
pub use config::{ConstraintPolicy, LiveDataConfig};
pub use context::{DataContext, DataContextBuilder};
pub use error::{ConfigError, ErrorCode, LiveDataError, LiveDataResult, StoreError};
pub use events::{Operation, PermissionErrorBus, PermissionErrorEvent};
pub use path::{LogicalPath, PathNormalizer, PathScope, PhysicalPath};
pub use query::{DocumentRef, QueryDescriptor};
pub use record::Record;
pub use subscription::{CollectionSubscription, DocumentSubscription, LiveState};
pub use tenant::TenantId;
pub use writes::DocumentWriter;

// Re-export backend traits
pub use backend::{DocumentStore, ListenerRegistration, SnapshotSource};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
