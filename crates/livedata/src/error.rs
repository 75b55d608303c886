//! Error types for the live-data layer.
//!
//! Backend delivery failures are never thrown at a subscriber; they are turned
//! into [`LiveState::error`](crate::subscription::LiveState) plus a
//! [`PermissionErrorEvent`]. The types here cover that failure value, the
//! human-readable permission error rendered from an event, and configuration
//! problems detected up front.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::events::PermissionErrorEvent;

/// The primary error type for fallible live-data operations.
#[derive(Error, Debug)]
pub enum LiveDataError {
    /// Configuration errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Failures reported by the document store
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Access denied, rendered for display
    #[error(transparent)]
    Permission(#[from] PermissionDeniedError),
}

/// Result type alias for live-data operations.
pub type LiveDataResult<T> = Result<T, LiveDataError>;

/// Errors detected while validating configuration or building a context.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A path marker was empty.
    #[error("{field} must not be empty")]
    EmptyMarker { field: String },

    /// A path marker contained a separator.
    #[error("{field} must be a single path segment, got '{value}'")]
    InvalidSegment { field: String, value: String },

    /// Two markers that must differ were equal.
    #[error("{first} and {second} must differ (both are '{value}')")]
    MarkerCollision {
        first: String,
        second: String,
        value: String,
    },

    /// A required builder field was not provided.
    #[error("missing required field: {field}")]
    MissingRequiredField { field: String },

    /// No document store is attached, so writes cannot run.
    #[error("no document store configured")]
    StoreNotConfigured,

    /// The configuration document could not be parsed.
    #[error("failed to parse configuration: {message}")]
    Parse { message: String },
}

/// Error codes reported by the hosted document store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorCode {
    /// The security rules rejected the request.
    PermissionDenied,
    /// The caller is not signed in.
    Unauthenticated,
    /// The addressed document does not exist (writes only).
    NotFound,
    /// The backend could not be reached.
    Unavailable,
    /// The request was malformed.
    InvalidArgument,
    /// Anything else.
    Internal,
}

impl ErrorCode {
    /// Returns `true` for authorization failures.
    pub fn is_access_denied(&self) -> bool {
        matches!(self, ErrorCode::PermissionDenied | ErrorCode::Unauthenticated)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCode::PermissionDenied => write!(f, "permission-denied"),
            ErrorCode::Unauthenticated => write!(f, "unauthenticated"),
            ErrorCode::NotFound => write!(f, "not-found"),
            ErrorCode::Unavailable => write!(f, "unavailable"),
            ErrorCode::InvalidArgument => write!(f, "invalid-argument"),
            ErrorCode::Internal => write!(f, "internal"),
        }
    }
}

/// A failure delivered by the document store, either to a live listener or
/// as the result of a write.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct StoreError {
    pub code: ErrorCode,
    pub message: String,
}

impl StoreError {
    /// Creates a store error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Shorthand for a `permission-denied` failure.
    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::PermissionDenied, message)
    }

    /// Shorthand for a `not-found` failure.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }
}

/// The user-facing error a toast/alert surface renders for a denied request.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{}", denied_message(.event))]
pub struct PermissionDeniedError {
    pub event: PermissionErrorEvent,
}

impl PermissionDeniedError {
    /// Wraps an event for display.
    pub fn new(event: PermissionErrorEvent) -> Self {
        Self { event }
    }
}

impl From<PermissionErrorEvent> for PermissionDeniedError {
    fn from(event: PermissionErrorEvent) -> Self {
        Self::new(event)
    }
}

fn denied_message(event: &PermissionErrorEvent) -> String {
    let request = serde_json::to_string_pretty(event).unwrap_or_else(|_| format!("{:?}", event));
    format!(
        "Missing or insufficient permissions: \
         The following request was denied by security rules:\n{}",
        request
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Operation;

    #[test]
    fn test_store_error_display() {
        let err = StoreError::permission_denied("rules rejected list");
        assert_eq!(err.to_string(), "permission-denied: rules rejected list");
        assert!(err.code.is_access_denied());
    }

    #[test]
    fn test_error_code_serde() {
        let json = serde_json::to_string(&ErrorCode::PermissionDenied).unwrap();
        assert_eq!(json, "\"permission-denied\"");
        assert!(!ErrorCode::Unavailable.is_access_denied());
    }

    #[test]
    fn test_permission_denied_message_includes_request() {
        let event =
            PermissionErrorEvent::new("artifacts/proj1/public/data/products", Operation::List);
        let err = PermissionDeniedError::new(event);
        let message = err.to_string();

        assert!(message.starts_with("Missing or insufficient permissions"));
        assert!(message.contains("\"path\": \"artifacts/proj1/public/data/products\""));
        assert!(message.contains("\"operation\": \"list\""));
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::InvalidSegment {
            field: "namespace".to_string(),
            value: "a/b".to_string(),
        };
        assert!(err.to_string().contains("namespace"));
        assert!(err.to_string().contains("a/b"));
    }

    #[test]
    fn test_live_data_error_from() {
        let err: LiveDataError = ConfigError::StoreNotConfigured.into();
        assert!(matches!(err, LiveDataError::Config(_)));

        let err: LiveDataError = StoreError::not_found("gone").into();
        assert!(matches!(err, LiveDataError::Store(_)));
    }
}
