use adminforge_types::PrimaryKey;
use std::collections::HashSet;

// ── Constructors and accessors ───────────────────────────────────

#[test]
fn raw_key_carries_value() {
    let key = PrimaryKey::raw(42);
    assert_eq!(key.as_i64(), Some(42));
    assert_eq!(key.as_str(), None);
    assert_eq!(key.table(), None);
    assert_eq!(key.shape(), "raw");
}

#[test]
fn bound_key_carries_table_and_value() {
    let key = PrimaryKey::bound("admin_users", 7);
    assert_eq!(key.as_i64(), Some(7));
    assert_eq!(key.table(), Some("admin_users"));
    assert_eq!(key.shape(), "bound");
}

#[test]
fn document_key_carries_id() {
    let key = PrimaryKey::document("abc");
    assert_eq!(key.as_str(), Some("abc"));
    assert_eq!(key.as_i64(), None);
    assert_eq!(key.shape(), "document");
}

#[test]
fn new_document_is_unique() {
    let a = PrimaryKey::new_document();
    let b = PrimaryKey::new_document();
    assert_ne!(a, b);
}

#[test]
fn new_document_keys_do_not_collide() {
    let ids: HashSet<String> = (0..100)
        .map(|_| PrimaryKey::new_document().to_string())
        .collect();
    assert_eq!(ids.len(), 100);
}

// ── Parsing ──────────────────────────────────────────────────────

#[test]
fn parse_document_roundtrip() {
    let key = PrimaryKey::new_document();
    let parsed = PrimaryKey::parse_document(key.as_str().unwrap()).unwrap();
    assert_eq!(key, parsed);
}

#[test]
fn parse_document_rejects_garbage() {
    assert!(PrimaryKey::parse_document("not-a-uuid").is_err());
}

// ── Display ──────────────────────────────────────────────────────

#[test]
fn display_raw() {
    assert_eq!(PrimaryKey::raw(5).to_string(), "5");
}

#[test]
fn display_bound_includes_table() {
    assert_eq!(PrimaryKey::bound("posts", 5).to_string(), "posts#5");
}

#[test]
fn display_document_is_id() {
    assert_eq!(PrimaryKey::document("deadbeef").to_string(), "deadbeef");
}

// ── Serde ────────────────────────────────────────────────────────

#[test]
fn serde_roundtrip_all_shapes() {
    for key in [
        PrimaryKey::raw(1),
        PrimaryKey::bound("t", 2),
        PrimaryKey::new_document(),
    ] {
        let json = serde_json::to_string(&key).unwrap();
        let back: PrimaryKey = serde_json::from_str(&json).unwrap();
        assert_eq!(key, back);
    }
}
