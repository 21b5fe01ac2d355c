//! Error types for the storage layer.

use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur in storage operations.
///
/// Backend SDK failures are propagated unchanged; the storage layer never
/// retries and never recovers silently.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The registered entity type declares no primary-key field.
    /// Misconfiguration, surfaced on first operation.
    #[error("entity '{0}' has no primary-key field")]
    MissingPrimaryKey(String),

    /// `find` was called on an entity whose descriptor declares no unique
    /// lookup field.
    #[error("entity '{0}' has no lookup field")]
    NoLookupField(String),

    /// A supplied field value cannot be coerced to the target field's type.
    #[error("invalid value for field '{field}': {detail}")]
    InvalidValue { field: String, detail: String },

    /// An enum-typed field was given a label outside its constant set.
    #[error("field '{field}' has no enum label '{label}'")]
    UnknownEnumLabel { field: String, label: String },

    /// `update` was called without a usable "id" entry.
    #[error("field map has no usable 'id' entry")]
    MissingId,

    /// A key of the wrong shape was passed to a backend.
    #[error("key shape mismatch: backend expects {expected}, got {got}")]
    KeyShape {
        expected: &'static str,
        got: String,
    },

    /// An update, delete or post-write re-read addressed a key with no
    /// matching entity. Distinct from the `None` result of a lookup that
    /// may legitimately miss.
    #[error("entity not found: {0}")]
    NotFound(String),

    /// Database error from SQLite.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Database error from DuckDB.
    #[error("duckdb error: {0}")]
    Duck(#[from] duckdb::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
