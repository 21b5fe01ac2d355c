//! Storage backends for adminforge.
//!
//! One [`DataAccess`] implementation per engine:
//! - [`SqliteStore`] — relational, auto-increment integer keys
//! - [`DuckStore`] — relational, sequence-generated keys bound to their table
//! - [`DocStore`] — JSON documents keyed by UUID v7 text ids
//!
//! All three close over one [`EntityDescriptor`](adminforge_model::EntityDescriptor)
//! and one connection handle, own no entity state, and run every multi-step
//! operation inside a single backend transaction. Create/update input is the
//! untyped [`FieldMap`](adminforge_types::FieldMap); typing happens in the
//! shared [`assign_fields`] pass.

mod assign;
mod doc_store;
mod duck_store;
mod error;
mod sqlite_store;

pub use assign::{assign_fields, FieldSink};
pub use doc_store::DocStore;
pub use duck_store::DuckStore;
pub use error::{StorageError, StorageResult};
pub use sqlite_store::SqliteStore;

use adminforge_model::Record;
use adminforge_types::{FieldMap, PrimaryKey};

/// The capability contract every backend implements.
///
/// The routing layer depends only on this trait; the concrete backend is
/// chosen once at configuration time and never switched at runtime. All
/// operations are safe to call concurrently from many request tasks.
pub trait DataAccess: Send + Sync {
    /// Creates the backing table/collection for the managed entity type.
    /// Idempotent: a no-op when it already exists.
    fn create_table(&self) -> StorageResult<()>;

    /// Produces the backend's native key shape from a raw scalar.
    ///
    /// Callers holding a plain id convert it here before `find_by_id` or
    /// `delete`; there is no implicit shape coercion.
    fn wrap_key(&self, raw: i64) -> StorageResult<PrimaryKey>;

    /// Looks up one entity by primary key. `None` is a normal miss, not an
    /// error. Fails with [`StorageError::KeyShape`] for a foreign key shape
    /// and [`StorageError::MissingPrimaryKey`] for a key-less descriptor.
    fn find_by_id(&self, key: &PrimaryKey) -> StorageResult<Option<Record>>;

    /// Returns all entities of the managed type in backend-native order.
    /// Malformed rows surface as `None` entries rather than failing the
    /// whole listing.
    fn find_all(&self) -> StorageResult<Vec<Option<Record>>>;

    /// Looks up one entity by the descriptor's unique lookup field (the
    /// authentication path, e.g. username). Distinct from `find_by_id`:
    /// the lookup key is not the primary key.
    fn find(&self, lookup: &str) -> StorageResult<Option<Record>>;

    /// Inserts a new entity from a field map and returns it re-read by its
    /// generated key. Primary keys are never client-supplied; any "id"
    /// entry in the map is ignored.
    fn save(&self, fields: &FieldMap) -> StorageResult<Record>;

    /// Applies a partial update identified by the map's "id" entry and
    /// returns the re-read entity. Fails with [`StorageError::MissingId`]
    /// without a usable id and [`StorageError::NotFound`] when no row
    /// matched.
    fn update(&self, fields: &FieldMap) -> StorageResult<Record>;

    /// Removes the entity identified by `key` and returns it. At most one
    /// row/document is affected; fails with [`StorageError::NotFound`] when
    /// nothing matched.
    fn delete(&self, key: &PrimaryKey) -> StorageResult<Record>;
}
