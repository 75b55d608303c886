//! Query descriptors and document references.
//!
//! Callers always describe what they want in logical terms. A
//! [`QueryDescriptor`] carries its [`LogicalPath`] explicitly next to its
//! constraints, so the adapters never have to dig a path back out of a
//! backend-specific query object.
//!
//! # Example
//!
//! ```
//! use averzo_livedata::query::{QueryDescriptor, SortDirection};
//! use serde_json::json;
//!
//! let query = QueryDescriptor::collection("orders")
//!     .where_eq("status", json!("pending"))
//!     .order_by("createdAt", SortDirection::Descending)
//!     .limit(20);
//!
//! assert_eq!(query.path.to_string(), "orders");
//! assert_eq!(query.constraints.len(), 3);
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::path::LogicalPath;

/// Comparison operators for field filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilterOp {
    /// `==`
    Equal,
    /// `!=`
    NotEqual,
    /// `<`
    LessThan,
    /// `<=`
    LessThanOrEqual,
    /// `>`
    GreaterThan,
    /// `>=`
    GreaterThanOrEqual,
    /// Field is an array containing the value.
    ArrayContains,
    /// Field equals one of the values in an array.
    In,
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterOp::Equal => write!(f, "=="),
            FilterOp::NotEqual => write!(f, "!="),
            FilterOp::LessThan => write!(f, "<"),
            FilterOp::LessThanOrEqual => write!(f, "<="),
            FilterOp::GreaterThan => write!(f, ">"),
            FilterOp::GreaterThanOrEqual => write!(f, ">="),
            FilterOp::ArrayContains => write!(f, "array-contains"),
            FilterOp::In => write!(f, "in"),
        }
    }
}

/// Sort direction for `order_by`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Ascending order.
    #[default]
    Ascending,
    /// Descending order.
    Descending,
}

/// One filter, sort or limit applied to a collection query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueryConstraint {
    /// Field filter.
    Where {
        /// Field name (dotted for nested fields).
        field: String,
        /// Comparison operator.
        op: FilterOp,
        /// Comparison value.
        value: Value,
    },

    /// Sort by a field.
    OrderBy {
        /// Field name.
        field: String,
        /// Sort direction.
        direction: SortDirection,
    },

    /// Maximum number of documents.
    Limit {
        /// The limit.
        count: u32,
    },
}

/// A live query over one logical collection (or a collection group).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QueryDescriptor {
    /// The logical collection path. Empty for collection-group queries.
    pub path: LogicalPath,

    /// Filters, sorts and limits in application order.
    pub constraints: Vec<QueryConstraint>,

    /// Collection id queried across all parents, if this is a group query.
    pub collection_group: Option<String>,
}

impl QueryDescriptor {
    /// Creates an unconstrained query over a logical collection.
    pub fn collection(path: impl Into<LogicalPath>) -> Self {
        Self {
            path: path.into(),
            constraints: Vec::new(),
            collection_group: None,
        }
    }

    /// Creates a query over every collection with the given id.
    pub fn collection_group(collection_id: impl Into<String>) -> Self {
        Self {
            path: LogicalPath::default(),
            constraints: Vec::new(),
            collection_group: Some(collection_id.into()),
        }
    }

    /// Adds a field filter.
    pub fn where_field(mut self, field: impl Into<String>, op: FilterOp, value: Value) -> Self {
        self.constraints.push(QueryConstraint::Where {
            field: field.into(),
            op,
            value,
        });
        self
    }

    /// Adds an equality filter.
    pub fn where_eq(self, field: impl Into<String>, value: Value) -> Self {
        self.where_field(field, FilterOp::Equal, value)
    }

    /// Adds a sort.
    pub fn order_by(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.constraints.push(QueryConstraint::OrderBy {
            field: field.into(),
            direction,
        });
        self
    }

    /// Adds a limit.
    pub fn limit(mut self, count: u32) -> Self {
        self.constraints.push(QueryConstraint::Limit { count });
        self
    }

    /// Returns `true` if any filter, sort or limit is present.
    pub fn is_constrained(&self) -> bool {
        !self.constraints.is_empty()
    }
}

/// A reference to one logical document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentRef {
    /// The parent collection's logical path.
    pub collection: LogicalPath,
    /// The document id.
    pub id: String,
}

impl DocumentRef {
    /// Creates a reference to `id` inside `collection`.
    pub fn new(collection: impl Into<LogicalPath>, id: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
        }
    }

    /// Returns the full logical document path.
    pub fn path(&self) -> LogicalPath {
        self.collection.child(&self.id)
    }
}

impl fmt::Display for DocumentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path())
    }
}
