//! Core type definitions for the adminforge data-access layer.
//!
//! This crate defines the backend-agnostic types the rest of the panel
//! depends on:
//! - [`PrimaryKey`] — the three identifier shapes the supported backends use
//! - [`FieldValue`] / [`FieldMap`] — the loosely-typed form-input container
//!   used for create and update operations
//!
//! Backend-specific concerns (SQL generation, document encoding, key
//! wrapping) belong in `adminforge-storage`, not here.

mod ids;
mod value;

pub use ids::PrimaryKey;
pub use value::{FieldMap, FieldValue};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid document id: {0}")]
    InvalidDocumentId(#[from] uuid::Error),
}
