//! Document backend: entities as JSON blobs.
//!
//! Each entity is one JSON object keyed by a UUID v7 text id
//! ([`PrimaryKey::Document`]). Field extraction for lookups uses SQLite's
//! `json_extract` over the stored blob. A stored blob that no longer parses
//! as a JSON object is treated as a malformed row: listings return a `None`
//! entry for it and point reads miss.

use crate::assign::{assign_fields, FieldSink};
use crate::error::{StorageError, StorageResult};
use crate::DataAccess;
use adminforge_model::{EntityDescriptor, FieldDescriptor, FieldKind, Record};
use adminforge_types::{FieldMap, FieldValue, PrimaryKey};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Document-store [`DataAccess`] implementation.
pub struct DocStore {
    conn: Arc<Mutex<Connection>>,
    descriptor: EntityDescriptor,
}

impl DocStore {
    /// Opens (or creates) a database file and manages one collection in it.
    pub fn open(path: &Path, descriptor: EntityDescriptor) -> StorageResult<Self> {
        let conn = Connection::open(path)?;
        Ok(Self::from_connection(Arc::new(Mutex::new(conn)), descriptor))
    }

    /// Opens an in-memory collection (for testing).
    pub fn open_in_memory(descriptor: EntityDescriptor) -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self::from_connection(Arc::new(Mutex::new(conn)), descriptor))
    }

    /// Wraps an externally owned connection.
    #[must_use]
    pub fn from_connection(conn: Arc<Mutex<Connection>>, descriptor: EntityDescriptor) -> Self {
        Self { conn, descriptor }
    }

    fn require_primary_key(&self) -> StorageResult<()> {
        if self.descriptor.primary_key().is_none() {
            return Err(StorageError::MissingPrimaryKey(self.descriptor.name.clone()));
        }
        Ok(())
    }

    fn document_id<'k>(&self, key: &'k PrimaryKey) -> StorageResult<&'k str> {
        match key {
            PrimaryKey::Document(id) => Ok(id),
            other => Err(StorageError::KeyShape {
                expected: "document",
                got: other.shape().to_string(),
            }),
        }
    }

    /// Decodes a stored blob. `None` means malformed (unparseable or not an
    /// object), which callers surface as an absent entry.
    fn parse_doc(entity: &str, id: String, doc: &str) -> Option<Record> {
        match serde_json::from_str::<serde_json::Value>(doc) {
            Ok(serde_json::Value::Object(map)) => {
                let mut rec = Record::new(PrimaryKey::document(id));
                for (name, value) in map {
                    rec.set(name, value);
                }
                Some(rec)
            }
            Ok(_) | Err(_) => {
                tracing::warn!(entity, id = %id, "malformed document payload");
                None
            }
        }
    }

    fn read_by_id(
        conn: &Connection,
        descriptor: &EntityDescriptor,
        id: &str,
    ) -> StorageResult<Option<Record>> {
        let sql = format!("SELECT doc FROM {} WHERE id = ?", descriptor.name);
        let doc: Option<String> = conn
            .query_row(&sql, [id], |row| row.get(0))
            .optional()?;
        Ok(doc.and_then(|doc| Self::parse_doc(&descriptor.name, id.to_string(), &doc)))
    }
}

#[derive(Default)]
struct JsonSink {
    map: serde_json::Map<String, serde_json::Value>,
}

impl JsonSink {
    fn fill_missing_timestamps(&mut self, descriptor: &EntityDescriptor) {
        let now = Utc::now().to_rfc3339();
        for field in descriptor.data_fields() {
            if field.kind == FieldKind::Timestamp && !self.map.contains_key(&field.native_name) {
                self.map
                    .insert(field.native_name.clone(), serde_json::Value::String(now.clone()));
            }
        }
    }
}

impl FieldSink for JsonSink {
    fn assign(&mut self, field: &FieldDescriptor, value: FieldValue) {
        self.map.insert(field.native_name.clone(), value.to_json());
    }
}

impl DataAccess for DocStore {
    fn create_table(&self) -> StorageResult<()> {
        self.require_primary_key()?;
        let mut ddl = format!(
            "CREATE TABLE IF NOT EXISTS {} (id TEXT PRIMARY KEY, doc TEXT NOT NULL);",
            self.descriptor.name
        );
        if let Some(lookup) = self.descriptor.lookup_field.as_deref() {
            ddl.push_str(&format!(
                "\nCREATE UNIQUE INDEX IF NOT EXISTS {table}_{lookup}_idx \
                 ON {table} (json_extract(doc, '$.{lookup}'));",
                table = self.descriptor.name,
            ));
        }
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(&ddl)?;
        tracing::debug!(entity = %self.descriptor.name, "document collection provisioned");
        Ok(())
    }

    fn wrap_key(&self, _raw: i64) -> StorageResult<PrimaryKey> {
        // Document ids are opaque text; a numeric scalar has no wrapped form.
        Err(StorageError::KeyShape {
            expected: "document",
            got: "raw".to_string(),
        })
    }

    fn find_by_id(&self, key: &PrimaryKey) -> StorageResult<Option<Record>> {
        self.require_primary_key()?;
        let id = self.document_id(key)?;
        let conn = self.conn.lock().unwrap();
        Self::read_by_id(&conn, &self.descriptor, id)
    }

    fn find_all(&self) -> StorageResult<Vec<Option<Record>>> {
        self.require_primary_key()?;
        let conn = self.conn.lock().unwrap();
        let sql = format!("SELECT id, doc FROM {}", self.descriptor.name);
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (id, doc) = row?;
            out.push(Self::parse_doc(&self.descriptor.name, id, &doc));
        }
        Ok(out)
    }

    fn find(&self, lookup: &str) -> StorageResult<Option<Record>> {
        self.require_primary_key()?;
        let field = self
            .descriptor
            .lookup_field
            .as_deref()
            .ok_or_else(|| StorageError::NoLookupField(self.descriptor.name.clone()))?;
        let sql = format!(
            "SELECT id, doc FROM {} WHERE json_extract(doc, '$.{}') = ?",
            self.descriptor.name, field
        );
        let conn = self.conn.lock().unwrap();
        let row: Option<(String, String)> = conn
            .query_row(&sql, [lookup], |row| Ok((row.get(0)?, row.get(1)?)))
            .optional()?;
        Ok(row.and_then(|(id, doc)| Self::parse_doc(&self.descriptor.name, id, &doc)))
    }

    fn save(&self, fields: &FieldMap) -> StorageResult<Record> {
        self.require_primary_key()?;
        let mut sink = JsonSink::default();
        assign_fields(&self.descriptor, fields, &mut sink)?;
        sink.fill_missing_timestamps(&self.descriptor);

        let id = PrimaryKey::new_document().to_string();
        let doc = serde_json::to_string(&serde_json::Value::Object(sink.map))?;

        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let sql = format!("INSERT INTO {} (id, doc) VALUES (?, ?)", self.descriptor.name);
        tx.execute(&sql, [id.as_str(), doc.as_str()])?;
        let rec = Self::read_by_id(&tx, &self.descriptor, &id)?.ok_or_else(|| {
            StorageError::NotFound(format!(
                "{} id {id} missing after insert",
                self.descriptor.name
            ))
        })?;
        tx.commit()?;
        tracing::debug!(entity = %self.descriptor.name, id, "saved");
        Ok(rec)
    }

    fn update(&self, fields: &FieldMap) -> StorageResult<Record> {
        self.require_primary_key()?;
        let id = fields.id_text().ok_or(StorageError::MissingId)?;
        PrimaryKey::parse_document(id).map_err(|_| StorageError::InvalidValue {
            field: "id".to_string(),
            detail: format!("'{id}' is not a document id"),
        })?;
        let mut sink = JsonSink::default();
        assign_fields(&self.descriptor, fields, &mut sink)?;

        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let sql = format!("SELECT doc FROM {} WHERE id = ?", self.descriptor.name);
        let stored: Option<String> = tx.query_row(&sql, [id], |row| row.get(0)).optional()?;
        let stored = stored.ok_or_else(|| {
            StorageError::NotFound(format!("{} id {id}", self.descriptor.name))
        })?;
        let mut object = match serde_json::from_str::<serde_json::Value>(&stored) {
            Ok(serde_json::Value::Object(map)) => map,
            // Malformed stored payloads read as absent, so they cannot be
            // updated either.
            _ => {
                return Err(StorageError::NotFound(format!(
                    "{} id {id}",
                    self.descriptor.name
                )));
            }
        };
        for (name, value) in sink.map {
            object.insert(name, value);
        }
        let doc = serde_json::to_string(&serde_json::Value::Object(object))?;
        let update_sql = format!("UPDATE {} SET doc = ? WHERE id = ?", self.descriptor.name);
        let affected = tx.execute(&update_sql, [doc.as_str(), id])?;
        if affected == 0 {
            return Err(StorageError::NotFound(format!(
                "{} id {id}",
                self.descriptor.name
            )));
        }
        let rec = Self::read_by_id(&tx, &self.descriptor, id)?.ok_or_else(|| {
            StorageError::NotFound(format!("{} id {id}", self.descriptor.name))
        })?;
        tx.commit()?;
        Ok(rec)
    }

    fn delete(&self, key: &PrimaryKey) -> StorageResult<Record> {
        self.require_primary_key()?;
        let id = self.document_id(key)?;
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let rec = Self::read_by_id(&tx, &self.descriptor, id)?.ok_or_else(|| {
            StorageError::NotFound(format!("{} id {id}", self.descriptor.name))
        })?;
        let sql = format!("DELETE FROM {} WHERE id = ?", self.descriptor.name);
        tx.execute(&sql, [id])?;
        tx.commit()?;
        tracing::debug!(entity = %self.descriptor.name, id, "deleted");
        Ok(rec)
    }
}
