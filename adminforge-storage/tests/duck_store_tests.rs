use adminforge_model::{admin_users_descriptor, EntityDescriptor, FieldDescriptor};
use adminforge_storage::{DataAccess, DuckStore, StorageError};
use adminforge_types::{FieldMap, PrimaryKey};
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

fn tickets() -> EntityDescriptor {
    EntityDescriptor::new(
        "tickets",
        vec![
            FieldDescriptor::primary_key("id"),
            FieldDescriptor::text("subject"),
            FieldDescriptor::integer("priority"),
            FieldDescriptor::enumeration("state", &["open", "closed"]),
            FieldDescriptor::timestamp("created_at"),
        ],
    )
}

fn store() -> DuckStore {
    let store = DuckStore::open_in_memory(tickets()).unwrap();
    store.create_table().unwrap();
    store
}

fn ticket(subject: &str) -> FieldMap {
    let mut map = FieldMap::new();
    map.insert("subject", subject)
        .insert("priority", 2i64)
        .insert("state", "open");
    map
}

// ── Provisioning ─────────────────────────────────────────────────

#[test]
fn create_table_is_idempotent() {
    let store = store();
    store.create_table().unwrap();
    store.create_table().unwrap();
}

#[test]
fn missing_primary_key_is_configuration_fault() {
    let bare = EntityDescriptor::new("notes", vec![FieldDescriptor::text("body")]);
    let store = DuckStore::open_in_memory(bare).unwrap();
    assert!(matches!(
        store.find_all(),
        Err(StorageError::MissingPrimaryKey(_))
    ));
}

// ── Keys are database-generated and table-bound ──────────────────

#[test]
fn save_produces_bound_keys_in_sequence() {
    let store = store();
    let a = store.save(&ticket("first")).unwrap();
    let b = store.save(&ticket("second")).unwrap();
    assert_eq!(a.key, PrimaryKey::bound("tickets", 1));
    assert_eq!(b.key, PrimaryKey::bound("tickets", 2));
}

#[test]
fn wrap_key_binds_to_managed_table() {
    let store = store();
    assert_eq!(store.wrap_key(5).unwrap(), PrimaryKey::bound("tickets", 5));
}

#[test]
fn raw_key_shape_is_rejected() {
    let store = store();
    assert!(matches!(
        store.find_by_id(&PrimaryKey::raw(1)),
        Err(StorageError::KeyShape { expected: "bound", .. })
    ));
}

#[test]
fn key_bound_to_other_table_is_rejected() {
    let store = store();
    store.save(&ticket("x")).unwrap();
    assert!(matches!(
        store.find_by_id(&PrimaryKey::bound("posts", 1)),
        Err(StorageError::KeyShape { .. })
    ));
}

// ── CRUD ─────────────────────────────────────────────────────────

#[test]
fn save_then_find_by_id_roundtrip() {
    let store = store();
    let saved = store.save(&ticket("printer on fire")).unwrap();
    let found = store.find_by_id(&saved.key).unwrap().unwrap();
    assert_eq!(found.get_str("subject"), Some("printer on fire"));
    assert_eq!(found.get_i64("priority"), Some(2));
    assert_eq!(found, saved);
}

#[test]
fn save_fills_missing_timestamps() {
    let store = store();
    let saved = store.save(&ticket("x")).unwrap();
    assert!(saved.get_str("created_at").is_some());
}

#[test]
fn save_keeps_caller_supplied_timestamp() {
    let store = store();
    let mut map = ticket("x");
    map.insert("createdAt", "2024-01-01T00:00:00Z");
    let saved = store.save(&map).unwrap();
    assert_eq!(saved.get_str("created_at"), Some("2024-01-01T00:00:00Z"));
}

#[test]
fn empty_string_on_update_preserves_prior_value() {
    let store = store();
    let saved = store.save(&ticket("original")).unwrap();
    let mut map = FieldMap::new();
    map.insert("id", saved.key.as_i64().unwrap())
        .insert("subject", "");
    let updated = store.update(&map).unwrap();
    assert_eq!(updated.get_str("subject"), Some("original"));
}

#[test]
fn unknown_enum_label_fails_without_partial_write() {
    let store = store();
    let mut map = ticket("x");
    map.insert("state", "reopened");
    assert!(matches!(
        store.save(&map),
        Err(StorageError::UnknownEnumLabel { .. })
    ));
    assert!(store.find_all().unwrap().is_empty());
}

#[test]
fn update_without_id_fails() {
    let store = store();
    let mut map = FieldMap::new();
    map.insert("subject", "x");
    assert!(matches!(store.update(&map), Err(StorageError::MissingId)));
}

#[test]
fn update_unknown_id_is_not_found() {
    let store = store();
    let mut map = FieldMap::new();
    map.insert("id", 40i64).insert("subject", "x");
    assert!(matches!(store.update(&map), Err(StorageError::NotFound(_))));
}

#[test]
fn update_is_partial() {
    let store = store();
    let saved = store.save(&ticket("before")).unwrap();
    let mut map = FieldMap::new();
    map.insert("id", saved.key.as_i64().unwrap())
        .insert("state", "closed");
    let updated = store.update(&map).unwrap();
    assert_eq!(updated.get_str("state"), Some("closed"));
    assert_eq!(updated.get_str("subject"), Some("before"));
}

#[test]
fn delete_then_find_is_none() {
    let store = store();
    let saved = store.save(&ticket("doomed")).unwrap();
    let removed = store.delete(&saved.key).unwrap();
    assert_eq!(removed.get_str("subject"), Some("doomed"));
    assert!(store.find_by_id(&saved.key).unwrap().is_none());
}

#[test]
fn delete_unknown_id_is_not_found() {
    let store = store();
    assert!(matches!(
        store.delete(&PrimaryKey::bound("tickets", 12)),
        Err(StorageError::NotFound(_))
    ));
}

#[test]
fn find_all_in_backend_order() {
    let store = store();
    for s in ["a", "b", "c"] {
        store.save(&ticket(s)).unwrap();
    }
    let subjects: Vec<String> = store
        .find_all()
        .unwrap()
        .into_iter()
        .map(|r| r.unwrap().get_str("subject").unwrap().to_string())
        .collect();
    assert_eq!(subjects, vec!["a", "b", "c"]);
}

// ── Concurrency ──────────────────────────────────────────────────

#[test]
fn concurrent_saves_get_distinct_keys() {
    let store = Arc::new(store());
    let mut handles = Vec::new();
    for i in 0..8 {
        let store = Arc::clone(&store);
        handles.push(thread::spawn(move || {
            store.save(&ticket(&format!("ticket-{i}"))).unwrap().key
        }));
    }
    let keys: HashSet<i64> = handles
        .into_iter()
        .map(|h| {
            let key = h.join().unwrap();
            assert_eq!(key.table(), Some("tickets"));
            key.as_i64().unwrap()
        })
        .collect();
    assert_eq!(keys.len(), 8);
}

// ── find (lookup field) ──────────────────────────────────────────

#[test]
fn find_by_lookup_field() {
    let store = DuckStore::open_in_memory(admin_users_descriptor()).unwrap();
    store.create_table().unwrap();
    let mut map = FieldMap::new();
    map.insert("username", "bob")
        .insert("password", "$argon2$opaque")
        .insert("role", "viewer");
    store.save(&map).unwrap();

    let found = store.find("bob").unwrap().unwrap();
    assert_eq!(found.get_str("role"), Some("viewer"));
    assert!(found.key.table().is_some());
    assert!(store.find("eve").unwrap().is_none());
}

#[test]
fn find_without_lookup_field_is_configuration_fault() {
    let store = store();
    assert!(matches!(
        store.find("anything"),
        Err(StorageError::NoLookupField(_))
    ));
}
