use adminforge_types::PrimaryKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A generic entity returned by every storage backend.
///
/// Holds the backend-native key plus the non-key fields as JSON scalars
/// keyed by native name. The template layer renders these directly; nothing
/// downstream depends on the entity's concrete shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub key: PrimaryKey,
    pub fields: BTreeMap<String, serde_json::Value>,
}

impl Record {
    /// Creates a record with no fields set.
    #[must_use]
    pub fn new(key: PrimaryKey) -> Self {
        Self {
            key,
            fields: BTreeMap::new(),
        }
    }

    /// Sets a field value.
    pub fn set(&mut self, native_name: impl Into<String>, value: serde_json::Value) {
        self.fields.insert(native_name.into(), value);
    }

    /// Extracts a string field by native name.
    #[must_use]
    pub fn get_str(&self, native_name: &str) -> Option<&str> {
        self.fields.get(native_name).and_then(|v| v.as_str())
    }

    /// Extracts an integer field by native name.
    #[must_use]
    pub fn get_i64(&self, native_name: &str) -> Option<i64> {
        self.fields.get(native_name).and_then(|v| v.as_i64())
    }

    /// Extracts a float field by native name.
    #[must_use]
    pub fn get_f64(&self, native_name: &str) -> Option<f64> {
        self.fields.get(native_name).and_then(|v| v.as_f64())
    }

    /// Extracts a boolean field by native name.
    #[must_use]
    pub fn get_bool(&self, native_name: &str) -> Option<bool> {
        self.fields.get(native_name).and_then(|v| v.as_bool())
    }

    /// True when the field is absent or JSON null.
    #[must_use]
    pub fn is_unset(&self, native_name: &str) -> bool {
        self.fields
            .get(native_name)
            .is_none_or(serde_json::Value::is_null)
    }
}
