use crate::descriptor::{EntityDescriptor, FieldDescriptor};

/// Descriptor for the panel's own authentication-credentials store.
///
/// Provisioned lazily via `create_table` on first panel start when
/// authentication is enabled; never created otherwise. Passwords arrive
/// already hashed — this layer treats them as opaque text.
#[must_use]
pub fn admin_users_descriptor() -> EntityDescriptor {
    EntityDescriptor::new(
        "admin_users",
        vec![
            FieldDescriptor::primary_key("id"),
            FieldDescriptor::text("username"),
            FieldDescriptor::text("password"),
            FieldDescriptor::enumeration("role", &["admin", "editor", "viewer"]),
            FieldDescriptor::timestamp("created_at"),
            FieldDescriptor::timestamp("modified_at"),
        ],
    )
    .with_lookup("username")
}
