//! Tenant identifier type.
//!
//! This module defines [`TenantId`], the opaque identifier of one storefront
//! deployment inside the shared document store. Every physical path produced
//! by the [`PathNormalizer`](crate::path::PathNormalizer) is nested under the
//! tenant's namespace segment.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// An opaque tenant (deployment/project) identifier.
///
/// The identifier becomes a single path segment of every physical path, so it
/// must not contain `/`. A blank identifier is treated the same as an absent
/// one: the normalizer leaves paths untouched until a real tenant is known.
///
/// # Examples
///
/// ```
/// use averzo_livedata::tenant::TenantId;
///
/// let tenant = TenantId::new("proj1");
/// assert_eq!(tenant.as_str(), "proj1");
/// assert!(tenant.is_valid_segment());
/// assert!(!TenantId::new("a/b").is_valid_segment());
/// ```
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(String);

impl TenantId {
    /// Creates a new tenant ID from the given string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the tenant ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the identifier is empty or whitespace only.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Returns `true` if the identifier can be used as one path segment.
    pub fn is_valid_segment(&self) -> bool {
        !self.is_blank() && !self.0.contains('/')
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TenantId({})", self.0)
    }
}

impl FromStr for TenantId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(TenantId::new(s))
    }
}

impl From<&str> for TenantId {
    fn from(s: &str) -> Self {
        TenantId::new(s)
    }
}

impl From<String> for TenantId {
    fn from(s: String) -> Self {
        TenantId::new(s)
    }
}

impl AsRef<str> for TenantId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
