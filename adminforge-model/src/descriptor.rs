use crate::naming::{to_camel_case, to_snake_case};
use serde::{Deserialize, Serialize};

/// Describes one administrable entity type to the storage layer.
///
/// Built once when the entity is registered with the panel; every backend
/// closes over a descriptor instead of re-deriving metadata per call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDescriptor {
    /// Table / collection name, also used as the panel's entity name.
    pub name: String,
    pub fields: Vec<FieldDescriptor>,
    /// Native name of the unique human-readable column used by the
    /// authentication lookup (`find`), e.g. `username`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lookup_field: Option<String>,
}

impl EntityDescriptor {
    /// Creates a descriptor for a named entity type.
    #[must_use]
    pub fn new(name: impl Into<String>, fields: Vec<FieldDescriptor>) -> Self {
        Self {
            name: name.into(),
            fields,
            lookup_field: None,
        }
    }

    /// Declares the unique lookup column used by `find`.
    #[must_use]
    pub fn with_lookup(mut self, native_name: &str) -> Self {
        self.lookup_field = Some(native_name.to_string());
        self
    }

    /// Returns the primary-key field, if the descriptor declares one.
    #[must_use]
    pub fn primary_key(&self) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.is_primary_key)
    }

    /// Returns the non-key fields in declaration order.
    pub fn data_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| !f.is_primary_key)
    }

    /// Resolves an externally supplied field name against the descriptor.
    ///
    /// Accepts either the external camelCase form or the native snake_case
    /// form; returns `None` for names the entity does not have.
    #[must_use]
    pub fn resolve(&self, external: &str) -> Option<&FieldDescriptor> {
        let native = to_snake_case(external);
        self.fields
            .iter()
            .find(|f| f.native_name == native || f.external_name == external)
    }

    /// Looks up a field by its exact native name.
    #[must_use]
    pub fn field(&self, native_name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.native_name == native_name)
    }
}

/// One column or document field of an entity type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// External (form) name, camelCase.
    pub external_name: String,
    /// Native (column / document) name, snake_case.
    pub native_name: String,
    pub kind: FieldKind,
    pub is_primary_key: bool,
    /// Allowed labels. Only meaningful when kind is Enum.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enum_labels: Option<Vec<String>>,
}

impl FieldDescriptor {
    fn simple(native_name: &str, kind: FieldKind) -> Self {
        Self {
            external_name: to_camel_case(native_name),
            native_name: native_name.to_string(),
            kind,
            is_primary_key: false,
            enum_labels: None,
        }
    }

    /// Shorthand for the integer primary-key field.
    #[must_use]
    pub fn primary_key(native_name: &str) -> Self {
        Self {
            is_primary_key: true,
            ..Self::simple(native_name, FieldKind::Integer)
        }
    }

    /// Shorthand for an integer field.
    #[must_use]
    pub fn integer(native_name: &str) -> Self {
        Self::simple(native_name, FieldKind::Integer)
    }

    /// Shorthand for a text field.
    #[must_use]
    pub fn text(native_name: &str) -> Self {
        Self::simple(native_name, FieldKind::Text)
    }

    /// Shorthand for a boolean field.
    #[must_use]
    pub fn bool(native_name: &str) -> Self {
        Self::simple(native_name, FieldKind::Bool)
    }

    /// Shorthand for a floating-point field.
    #[must_use]
    pub fn float(native_name: &str) -> Self {
        Self::simple(native_name, FieldKind::Float)
    }

    /// Shorthand for a timestamp field (stored as text in all backends).
    #[must_use]
    pub fn timestamp(native_name: &str) -> Self {
        Self::simple(native_name, FieldKind::Timestamp)
    }

    /// Shorthand for an enum field with a fixed label set.
    #[must_use]
    pub fn enumeration(native_name: &str, labels: &[&str]) -> Self {
        Self {
            enum_labels: Some(labels.iter().map(|l| l.to_string()).collect()),
            ..Self::simple(native_name, FieldKind::Enum)
        }
    }
}

/// The data type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Integer,
    Text,
    Bool,
    Float,
    Timestamp,
    Enum,
}
