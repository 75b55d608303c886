//! Logical-to-physical path normalization.
//!
//! Application code addresses collections with tenant-agnostic logical paths
//! such as `products` or `users/u123/paymentMethods`. The backend stores every
//! deployment's data under its own namespace, so before subscribing the path
//! is rewritten:
//!
//! | Logical path | Physical path |
//! |---|---|
//! | `users/<uid>/...` (2+ segments) | `artifacts/<tenant>/users/<uid>/...` |
//! | anything else | `artifacts/<tenant>/public/data/...` |
//! | `artifacts/...` | unchanged |
//!
//! With no tenant known yet (signed-out or offline start-up), or with a tenant
//! id that is not a single segment, paths are left untouched. The
//! classification is a static rule on the first segment: a new top-level
//! user-private collection has to be added here explicitly.
//!
//! # Example
//!
//! ```
//! use averzo_livedata::path::{LogicalPath, PathNormalizer, PathScope};
//! use averzo_livedata::tenant::TenantId;
//!
//! let normalizer = PathNormalizer::default();
//! let tenant = TenantId::new("proj1");
//!
//! let products = LogicalPath::parse("products");
//! assert_eq!(
//!     normalizer.normalize(&products, Some(&tenant)).to_string(),
//!     "artifacts/proj1/public/data/products"
//! );
//!
//! let cards = LogicalPath::new(["users", "u123", "paymentMethods"]);
//! assert_eq!(normalizer.classify(&cards, Some(&tenant)), PathScope::UserPrivate);
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::LiveDataConfig;
use crate::tenant::TenantId;

/// A tenant-agnostic path as used by application call sites.
///
/// Segments never contain `/`: input strings are split on the separator and
/// empty pieces are dropped.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogicalPath(Vec<String>);

impl LogicalPath {
    /// Builds a path from segments, splitting any that contain `/`.
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(split_segments(segments))
    }

    /// Parses a `/`-separated path string.
    pub fn parse(path: &str) -> Self {
        Self::new([path])
    }

    /// Returns the path segments.
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Returns the first segment, if any.
    pub fn first(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    /// Returns the last segment, if any.
    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// Returns the number of segments.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the path has no segments.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns a new path with the given segment(s) appended.
    pub fn child(&self, segment: &str) -> Self {
        let mut segments = self.0.clone();
        segments.extend(split_segments([segment]));
        Self(segments)
    }
}

impl fmt::Display for LogicalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("/"))
    }
}

impl From<&str> for LogicalPath {
    fn from(s: &str) -> Self {
        LogicalPath::parse(s)
    }
}

/// A storage path after tenant scoping, as handed to the backend.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhysicalPath(Vec<String>);

impl PhysicalPath {
    /// Builds a physical path from raw segments, splitting any that contain `/`.
    ///
    /// Use this only for paths that are already tenant-scoped; logical paths go
    /// through [`PathNormalizer::normalize`].
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(split_segments(segments))
    }

    /// Returns the path segments.
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Returns the number of segments.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the path has no segments.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the last segment, if any.
    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// Returns the path without its last segment.
    pub fn parent(&self) -> Option<PhysicalPath> {
        match self.0.split_last() {
            Some((_, rest)) if !rest.is_empty() => Some(PhysicalPath(rest.to_vec())),
            _ => None,
        }
    }

    /// Returns a new path with the given segment(s) appended.
    pub fn child(&self, segment: &str) -> Self {
        let mut segments = self.0.clone();
        segments.extend(split_segments([segment]));
        Self(segments)
    }

    /// Returns `true` if `self` equals `prefix` or lies beneath it.
    pub fn starts_with(&self, prefix: &PhysicalPath) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl fmt::Display for PhysicalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("/"))
    }
}

/// Which rewrite rule applies to a logical path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathScope {
    /// No tenant is known or the path is empty; left unchanged.
    Unscoped,
    /// Already under the namespace marker; left unchanged.
    AlreadyPhysical,
    /// A specific user's data, kept under the literal user hierarchy.
    UserPrivate,
    /// Shared data, nested under the public prefix.
    Public,
}

impl PathScope {
    /// Returns `true` if normalization changes the path.
    pub fn rewrites(&self) -> bool {
        matches!(self, PathScope::UserPrivate | PathScope::Public)
    }
}

impl fmt::Display for PathScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathScope::Unscoped => write!(f, "unscoped"),
            PathScope::AlreadyPhysical => write!(f, "already-physical"),
            PathScope::UserPrivate => write!(f, "user-private"),
            PathScope::Public => write!(f, "public"),
        }
    }
}

/// Rewrites logical paths into tenant-scoped physical paths.
///
/// Pure: the result depends only on the input path, the tenant and the
/// configured markers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathNormalizer {
    namespace: String,
    user_scope: String,
    public_prefix: Vec<String>,
}

impl PathNormalizer {
    /// Creates a normalizer using the markers from `config`.
    pub fn new(config: &LiveDataConfig) -> Self {
        Self {
            namespace: config.namespace.clone(),
            user_scope: config.user_scope.clone(),
            public_prefix: config.public_prefix.clone(),
        }
    }

    /// Returns the reserved namespace segment.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Decides which rewrite rule applies to `path`.
    pub fn classify(&self, path: &LogicalPath, tenant: Option<&TenantId>) -> PathScope {
        let tenant_known = tenant.is_some_and(TenantId::is_valid_segment);
        match path.first() {
            None => PathScope::Unscoped,
            Some(_) if !tenant_known => PathScope::Unscoped,
            Some(first) if first == self.namespace => PathScope::AlreadyPhysical,
            Some(first) if first == self.user_scope && path.len() >= 2 => PathScope::UserPrivate,
            Some(_) => PathScope::Public,
        }
    }

    /// Rewrites a logical path into its physical form.
    pub fn normalize(&self, path: &LogicalPath, tenant: Option<&TenantId>) -> PhysicalPath {
        let scope = self.classify(path, tenant);
        let tenant = match (scope.rewrites(), tenant) {
            (true, Some(tenant)) => tenant,
            _ => return PhysicalPath(path.segments().to_vec()),
        };

        let mut segments = Vec::with_capacity(path.len() + 2 + self.public_prefix.len());
        segments.push(self.namespace.clone());
        segments.push(tenant.as_str().to_string());
        if scope == PathScope::Public {
            segments.extend(self.public_prefix.iter().cloned());
        }
        segments.extend(path.segments().iter().cloned());
        PhysicalPath(segments)
    }

    /// Rewrites a document address: the parent collection is classified and
    /// rewritten, then the document id is appended.
    pub fn normalize_document(
        &self,
        collection: &LogicalPath,
        id: &str,
        tenant: Option<&TenantId>,
    ) -> PhysicalPath {
        self.normalize(collection, tenant).child(id)
    }
}

impl Default for PathNormalizer {
    fn default() -> Self {
        Self::new(&LiveDataConfig::default())
    }
}

fn split_segments<I, S>(segments: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    segments
        .into_iter()
        .flat_map(|s| {
            s.as_ref()
                .split('/')
                .filter(|part| !part.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect()
}
