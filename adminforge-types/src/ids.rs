//! Primary-key shapes used by the storage backends.
//!
//! Each backend produces and consumes exactly one shape; callers holding a
//! raw scalar convert it explicitly through the owning store's `wrap_key`
//! before use. There is no implicit coercion between shapes.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifies one entity instance in backend-native form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimaryKey {
    /// Auto-increment relational id, usable directly in equality predicates.
    Raw(i64),
    /// Database-generated id bound to the table that issued it.
    Bound { table: String, value: i64 },
    /// Document-store object id (UUID v7 text).
    Document(String),
}

impl PrimaryKey {
    /// Creates a raw relational key.
    #[must_use]
    pub const fn raw(value: i64) -> Self {
        Self::Raw(value)
    }

    /// Creates a key bound to the table that generated it.
    #[must_use]
    pub fn bound(table: impl Into<String>, value: i64) -> Self {
        Self::Bound {
            table: table.into(),
            value,
        }
    }

    /// Creates a document key from an existing id string.
    #[must_use]
    pub fn document(id: impl Into<String>) -> Self {
        Self::Document(id.into())
    }

    /// Creates a fresh document key. Uses UUID v7 so ids sort by creation
    /// time in backend-native listings.
    #[must_use]
    pub fn new_document() -> Self {
        Self::Document(Uuid::now_v7().to_string())
    }

    /// Parses and validates a document key from its text form.
    pub fn parse_document(s: &str) -> crate::Result<Self> {
        let uuid = Uuid::parse_str(s)?;
        Ok(Self::Document(uuid.to_string()))
    }

    /// Returns the numeric value for `Raw` and `Bound` keys.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Raw(v) | Self::Bound { value: v, .. } => Some(*v),
            Self::Document(_) => None,
        }
    }

    /// Returns the id string for `Document` keys.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Document(id) => Some(id),
            _ => None,
        }
    }

    /// Returns the table a `Bound` key belongs to.
    #[must_use]
    pub fn table(&self) -> Option<&str> {
        match self {
            Self::Bound { table, .. } => Some(table),
            _ => None,
        }
    }

    /// Short name of the key shape, used in shape-mismatch errors.
    #[must_use]
    pub const fn shape(&self) -> &'static str {
        match self {
            Self::Raw(_) => "raw",
            Self::Bound { .. } => "bound",
            Self::Document(_) => "document",
        }
    }
}

impl fmt::Display for PrimaryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Raw(v) => write!(f, "{v}"),
            Self::Bound { table, value } => write!(f, "{table}#{value}"),
            Self::Document(id) => write!(f, "{id}"),
        }
    }
}
