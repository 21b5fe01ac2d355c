//! Entity metadata model for adminforge.
//!
//! Defines the types that describe an administrable entity to the storage
//! layer:
//! - [`EntityDescriptor`] — an entity type's table name, fields and primary
//!   key, built once at registration time (there is no per-call reflection)
//! - [`FieldDescriptor`] / [`FieldKind`] — one column or document field,
//!   including enum label sets for enum-typed fields
//! - [`Record`] — the generic entity returned by every backend
//! - naming transforms between external (form) and native (column) names
//!
//! These types are consumed by every storage backend and, indirectly via
//! JSON, by the template layer. They carry no connection state.

mod admin;
mod descriptor;
mod naming;
mod record;

pub use admin::admin_users_descriptor;
pub use descriptor::{EntityDescriptor, FieldDescriptor, FieldKind};
pub use naming::{to_camel_case, to_snake_case};
pub use record::Record;
