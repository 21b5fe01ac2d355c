use adminforge_model::{admin_users_descriptor, EntityDescriptor, FieldDescriptor};
use adminforge_storage::{DataAccess, DocStore, StorageError};
use adminforge_types::{FieldMap, PrimaryKey};
use std::sync::{Arc, Mutex};

fn bookmarks() -> EntityDescriptor {
    EntityDescriptor::new(
        "bookmarks",
        vec![
            FieldDescriptor::primary_key("id"),
            FieldDescriptor::text("title"),
            FieldDescriptor::text("url"),
            FieldDescriptor::enumeration("visibility", &["private", "shared"]),
            FieldDescriptor::timestamp("created_at"),
        ],
    )
}

fn store() -> DocStore {
    let store = DocStore::open_in_memory(bookmarks()).unwrap();
    store.create_table().unwrap();
    store
}

fn bookmark(title: &str) -> FieldMap {
    let mut map = FieldMap::new();
    map.insert("title", title)
        .insert("url", "https://example.com")
        .insert("visibility", "private");
    map
}

// ── Keys ─────────────────────────────────────────────────────────

#[test]
fn save_produces_document_keys() {
    let store = store();
    let a = store.save(&bookmark("a")).unwrap();
    let b = store.save(&bookmark("b")).unwrap();
    assert_eq!(a.key.shape(), "document");
    assert_ne!(a.key, b.key);
    // ids are valid UUIDs
    PrimaryKey::parse_document(a.key.as_str().unwrap()).unwrap();
}

#[test]
fn wrap_key_has_no_numeric_form() {
    let store = store();
    assert!(matches!(
        store.wrap_key(3),
        Err(StorageError::KeyShape { expected: "document", .. })
    ));
}

#[test]
fn relational_key_shapes_are_rejected() {
    let store = store();
    assert!(matches!(
        store.find_by_id(&PrimaryKey::raw(1)),
        Err(StorageError::KeyShape { .. })
    ));
    assert!(matches!(
        store.delete(&PrimaryKey::bound("bookmarks", 1)),
        Err(StorageError::KeyShape { .. })
    ));
}

// ── CRUD ─────────────────────────────────────────────────────────

#[test]
fn save_then_find_by_id_roundtrip() {
    let store = store();
    let saved = store.save(&bookmark("docs")).unwrap();
    let found = store.find_by_id(&saved.key).unwrap().unwrap();
    assert_eq!(found.get_str("title"), Some("docs"));
    assert_eq!(found.get_str("url"), Some("https://example.com"));
    assert_eq!(found, saved);
}

#[test]
fn save_fills_missing_timestamps() {
    let store = store();
    let saved = store.save(&bookmark("x")).unwrap();
    assert!(saved.get_str("created_at").is_some());
}

#[test]
fn empty_string_is_not_stored() {
    let store = store();
    let mut map = bookmark("x");
    map.insert("url", "");
    let saved = store.save(&map).unwrap();
    assert!(saved.is_unset("url"));
}

#[test]
fn unknown_enum_label_fails_without_partial_write() {
    let store = store();
    let mut map = bookmark("x");
    map.insert("visibility", "public");
    assert!(matches!(
        store.save(&map),
        Err(StorageError::UnknownEnumLabel { .. })
    ));
    assert!(store.find_all().unwrap().is_empty());
}

#[test]
fn find_by_id_miss_is_none() {
    let store = store();
    assert!(store
        .find_by_id(&PrimaryKey::new_document())
        .unwrap()
        .is_none());
}

// ── update ───────────────────────────────────────────────────────

#[test]
fn update_merges_into_document() {
    let store = store();
    let saved = store.save(&bookmark("before")).unwrap();
    let mut map = FieldMap::new();
    map.insert("id", saved.key.as_str().unwrap())
        .insert("title", "after");
    let updated = store.update(&map).unwrap();
    assert_eq!(updated.get_str("title"), Some("after"));
    assert_eq!(updated.get_str("url"), Some("https://example.com"));
    assert_eq!(updated.key, saved.key);
}

#[test]
fn update_empty_string_preserves_prior_value() {
    let store = store();
    let saved = store.save(&bookmark("original")).unwrap();
    let mut map = FieldMap::new();
    map.insert("id", saved.key.as_str().unwrap())
        .insert("title", "");
    let updated = store.update(&map).unwrap();
    assert_eq!(updated.get_str("title"), Some("original"));
}

#[test]
fn update_without_id_fails() {
    let store = store();
    let mut map = FieldMap::new();
    map.insert("title", "x");
    assert!(matches!(store.update(&map), Err(StorageError::MissingId)));
}

#[test]
fn update_with_malformed_id_fails() {
    let store = store();
    let mut map = FieldMap::new();
    map.insert("id", "not-a-uuid").insert("title", "x");
    assert!(matches!(
        store.update(&map),
        Err(StorageError::InvalidValue { .. })
    ));
}

#[test]
fn update_unknown_id_is_not_found() {
    let store = store();
    let mut map = FieldMap::new();
    map.insert("id", PrimaryKey::new_document().as_str().unwrap())
        .insert("title", "x");
    assert!(matches!(store.update(&map), Err(StorageError::NotFound(_))));
}

// ── delete ───────────────────────────────────────────────────────

#[test]
fn delete_then_find_is_none() {
    let store = store();
    let saved = store.save(&bookmark("doomed")).unwrap();
    let removed = store.delete(&saved.key).unwrap();
    assert_eq!(removed.get_str("title"), Some("doomed"));
    assert!(store.find_by_id(&saved.key).unwrap().is_none());
}

#[test]
fn delete_unknown_id_is_not_found() {
    let store = store();
    assert!(matches!(
        store.delete(&PrimaryKey::new_document()),
        Err(StorageError::NotFound(_))
    ));
}

// ── find_all and malformed rows ──────────────────────────────────

#[test]
fn find_all_lists_documents() {
    let store = store();
    store.save(&bookmark("a")).unwrap();
    store.save(&bookmark("b")).unwrap();
    let all = store.find_all().unwrap();
    assert_eq!(all.len(), 2);
    assert!(all.iter().all(Option::is_some));
}

#[test]
fn malformed_document_lists_as_absent_entry() {
    let conn = Arc::new(Mutex::new(
        rusqlite::Connection::open_in_memory().unwrap(),
    ));
    let store = DocStore::from_connection(Arc::clone(&conn), bookmarks());
    store.create_table().unwrap();
    store.save(&bookmark("good")).unwrap();
    conn.lock()
        .unwrap()
        .execute(
            "INSERT INTO bookmarks (id, doc) VALUES (?, ?)",
            ["broken-row", "{not json"],
        )
        .unwrap();

    let all = store.find_all().unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all.iter().filter(|r| r.is_none()).count(), 1);
    assert_eq!(all.iter().filter(|r| r.is_some()).count(), 1);
}

// ── find (lookup field) ──────────────────────────────────────────

#[test]
fn find_by_lookup_field() {
    let store = DocStore::open_in_memory(admin_users_descriptor()).unwrap();
    store.create_table().unwrap();
    let mut map = FieldMap::new();
    map.insert("username", "carol")
        .insert("password", "$argon2$opaque")
        .insert("role", "editor");
    store.save(&map).unwrap();

    let found = store.find("carol").unwrap().unwrap();
    assert_eq!(found.get_str("role"), Some("editor"));
    assert!(store.find("trent").unwrap().is_none());
}

#[test]
fn find_without_lookup_field_is_configuration_fault() {
    let store = store();
    assert!(matches!(
        store.find("anything"),
        Err(StorageError::NoLookupField(_))
    ));
}
