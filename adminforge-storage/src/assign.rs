//! Shared field-assignment pass for the create and update paths.
//!
//! Every backend funnels its field map through [`assign_fields`] before
//! touching the database, so name resolution, the empty-string skip rule and
//! enum coercion behave identically everywhere. The only per-backend part is
//! the [`FieldSink`] the coerced values land in (insert builder, update
//! builder or document object).

use crate::error::{StorageError, StorageResult};
use adminforge_model::{EntityDescriptor, FieldDescriptor, FieldKind};
use adminforge_types::{FieldMap, FieldValue};

/// Destination for coerced field assignments.
pub trait FieldSink {
    fn assign(&mut self, field: &FieldDescriptor, value: FieldValue);
}

/// Resolves, filters and coerces a field map against a descriptor.
///
/// Per entry: resolve the external name against the descriptor (unknown
/// names are skipped — forms may post unrelated inputs), skip primary-key
/// fields (keys are never client-assigned), skip empty-string values
/// (meaning "not provided"), coerce to the field's kind, and hand the result
/// to the sink. Enum labels are matched exactly and case-sensitively.
pub fn assign_fields(
    descriptor: &EntityDescriptor,
    fields: &FieldMap,
    sink: &mut dyn FieldSink,
) -> StorageResult<()> {
    for (name, value) in fields.iter() {
        let Some(field) = descriptor.resolve(name) else {
            tracing::debug!(entity = %descriptor.name, field = name, "skipping unknown field");
            continue;
        };
        if field.is_primary_key || value.is_empty_text() {
            continue;
        }
        let coerced = coerce(field, value)?;
        sink.assign(field, coerced);
    }
    Ok(())
}

fn coerce(field: &FieldDescriptor, value: &FieldValue) -> StorageResult<FieldValue> {
    match field.kind {
        FieldKind::Integer => match value {
            FieldValue::Integer(i) => Ok(FieldValue::Integer(*i)),
            FieldValue::Text(s) => s.trim().parse().map(FieldValue::Integer).map_err(|_| {
                invalid(field, format!("'{s}' is not an integer"))
            }),
            other => Err(invalid(field, format!("{other:?} is not an integer"))),
        },
        FieldKind::Float => match value {
            FieldValue::Float(f) => Ok(FieldValue::Float(*f)),
            FieldValue::Integer(i) => Ok(FieldValue::Float(*i as f64)),
            FieldValue::Text(s) => s.trim().parse().map(FieldValue::Float).map_err(|_| {
                invalid(field, format!("'{s}' is not a number"))
            }),
            other => Err(invalid(field, format!("{other:?} is not a number"))),
        },
        FieldKind::Bool => match value {
            FieldValue::Bool(b) => Ok(FieldValue::Bool(*b)),
            FieldValue::Integer(0) => Ok(FieldValue::Bool(false)),
            FieldValue::Integer(1) => Ok(FieldValue::Bool(true)),
            FieldValue::Text(s) => match s.as_str() {
                "true" | "1" => Ok(FieldValue::Bool(true)),
                "false" | "0" => Ok(FieldValue::Bool(false)),
                _ => Err(invalid(field, format!("'{s}' is not a boolean"))),
            },
            other => Err(invalid(field, format!("{other:?} is not a boolean"))),
        },
        FieldKind::Text => Ok(match value {
            FieldValue::Text(s) => FieldValue::Text(s.clone()),
            FieldValue::Integer(i) => FieldValue::Text(i.to_string()),
            FieldValue::Float(f) => FieldValue::Text(f.to_string()),
            FieldValue::Bool(b) => FieldValue::Text(b.to_string()),
        }),
        FieldKind::Timestamp => match value {
            FieldValue::Text(s) => Ok(FieldValue::Text(s.clone())),
            other => Err(invalid(field, format!("{other:?} is not a timestamp"))),
        },
        FieldKind::Enum => match value {
            FieldValue::Text(label) => {
                let known = field
                    .enum_labels
                    .as_ref()
                    .is_some_and(|labels| labels.iter().any(|l| l == label));
                if known {
                    Ok(FieldValue::Text(label.clone()))
                } else {
                    Err(StorageError::UnknownEnumLabel {
                        field: field.native_name.clone(),
                        label: label.clone(),
                    })
                }
            }
            other => Err(invalid(field, format!("{other:?} is not an enum label"))),
        },
    }
}

fn invalid(field: &FieldDescriptor, detail: String) -> StorageError {
    StorageError::InvalidValue {
        field: field.native_name.clone(),
        detail,
    }
}
