//! Configuration for the live-data layer.
//!
//! [`LiveDataConfig`] carries the reserved path markers used by the
//! [`PathNormalizer`](crate::path::PathNormalizer) and the policy applied when
//! a rewritten query would lose its constraints. Defaults match the storefront
//! deployment; a JSON document with any subset of the fields overrides them.
//!
//! # Example
//!
//! ```
//! use averzo_livedata::config::{ConstraintPolicy, LiveDataConfig};
//!
//! let config = LiveDataConfig::from_json_str(r#"{"constraint_policy": "preserve"}"#).unwrap();
//! assert_eq!(config.namespace, "artifacts");
//! assert_eq!(config.constraint_policy, ConstraintPolicy::Preserve);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default reserved namespace segment.
pub const DEFAULT_NAMESPACE: &str = "artifacts";

/// Default segment marking user-private collections.
pub const DEFAULT_USER_SCOPE: &str = "users";

/// Default label reported when a failing query has no resolvable path.
pub const DEFAULT_UNKNOWN_PATH_LABEL: &str = "unknown collection";

/// What to do with filter/sort/limit constraints when a query's path is
/// rewritten into the tenant namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintPolicy {
    /// Issue the rewritten query bare, over-fetching the whole collection.
    ///
    /// The adapter reports this through
    /// [`LiveState::constraints_dropped`](crate::subscription::LiveState).
    #[default]
    DropOnRewrite,

    /// Re-apply the original constraints against the rewritten path.
    Preserve,
}

/// Live-data layer configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveDataConfig {
    /// Reserved first segment of every physical path.
    pub namespace: String,

    /// First segment that marks a user-private logical path.
    pub user_scope: String,

    /// Segments inserted between the tenant and a shared logical path.
    pub public_prefix: Vec<String>,

    /// Constraint handling for rewritten queries.
    pub constraint_policy: ConstraintPolicy,

    /// Path reported in permission events when nothing better is known.
    pub unknown_path_label: String,
}

impl Default for LiveDataConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            user_scope: DEFAULT_USER_SCOPE.to_string(),
            public_prefix: vec!["public".to_string(), "data".to_string()],
            constraint_policy: ConstraintPolicy::default(),
            unknown_path_label: DEFAULT_UNKNOWN_PATH_LABEL.to_string(),
        }
    }
}

impl LiveDataConfig {
    /// Parses a JSON configuration document and validates it.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validates configuration invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_segment("namespace", &self.namespace)?;
        validate_segment("user_scope", &self.user_scope)?;

        if self.public_prefix.is_empty() {
            return Err(ConfigError::EmptyMarker {
                field: "public_prefix".to_string(),
            });
        }
        for segment in &self.public_prefix {
            validate_segment("public_prefix", segment)?;
        }

        if self.namespace == self.user_scope {
            return Err(ConfigError::MarkerCollision {
                first: "namespace".to_string(),
                second: "user_scope".to_string(),
                value: self.namespace.clone(),
            });
        }

        if self.unknown_path_label.trim().is_empty() {
            return Err(ConfigError::EmptyMarker {
                field: "unknown_path_label".to_string(),
            });
        }

        Ok(())
    }
}

fn validate_segment(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::EmptyMarker {
            field: field.to_string(),
        });
    }
    if value.contains('/') {
        return Err(ConfigError::InvalidSegment {
            field: field.to_string(),
            value: value.to_string(),
        });
    }
    Ok(())
}
