//! Relational backend on SQLite.
//!
//! One table per entity type, columns typed from the descriptor, keys from
//! `INTEGER PRIMARY KEY AUTOINCREMENT`. This backend produces and consumes
//! [`PrimaryKey::Raw`] only.

use crate::assign::{assign_fields, FieldSink};
use crate::error::{StorageError, StorageResult};
use crate::DataAccess;
use adminforge_model::{EntityDescriptor, FieldDescriptor, FieldKind, Record};
use adminforge_types::{FieldMap, FieldValue, PrimaryKey};
use rusqlite::{params_from_iter, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// SQLite-backed [`DataAccess`] implementation.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    descriptor: EntityDescriptor,
}

impl SqliteStore {
    /// Opens (or creates) a database file and manages one entity type in it.
    pub fn open(path: &Path, descriptor: EntityDescriptor) -> StorageResult<Self> {
        let conn = Connection::open(path)?;
        Ok(Self::from_connection(Arc::new(Mutex::new(conn)), descriptor))
    }

    /// Opens an in-memory database (for testing).
    pub fn open_in_memory(descriptor: EntityDescriptor) -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self::from_connection(Arc::new(Mutex::new(conn)), descriptor))
    }

    /// Wraps an externally owned connection. Stores for different entity
    /// types share one handle this way.
    #[must_use]
    pub fn from_connection(conn: Arc<Mutex<Connection>>, descriptor: EntityDescriptor) -> Self {
        Self { conn, descriptor }
    }

    fn primary_key_field(&self) -> StorageResult<&FieldDescriptor> {
        self.descriptor
            .primary_key()
            .ok_or_else(|| StorageError::MissingPrimaryKey(self.descriptor.name.clone()))
    }

    fn column_type(&self, field: &FieldDescriptor) -> String {
        let base = match field.kind {
            FieldKind::Integer | FieldKind::Bool => "INTEGER",
            FieldKind::Float => "REAL",
            FieldKind::Text | FieldKind::Enum => "TEXT",
            FieldKind::Timestamp => "TEXT DEFAULT CURRENT_TIMESTAMP",
        };
        if self.descriptor.lookup_field.as_deref() == Some(field.native_name.as_str()) {
            format!("{base} UNIQUE")
        } else {
            base.to_string()
        }
    }

    fn select_sql(&self, pk: &FieldDescriptor) -> String {
        let mut cols = vec![pk.native_name.clone()];
        cols.extend(self.descriptor.data_fields().map(|f| f.native_name.clone()));
        format!("SELECT {} FROM {}", cols.join(", "), self.descriptor.name)
    }

    fn row_to_record(descriptor: &EntityDescriptor, row: &Row<'_>) -> rusqlite::Result<Record> {
        let id: i64 = row.get(0)?;
        let mut rec = Record::new(PrimaryKey::raw(id));
        for (i, field) in descriptor.data_fields().enumerate() {
            let idx = i + 1;
            let value = match field.kind {
                FieldKind::Integer => row
                    .get::<_, Option<i64>>(idx)?
                    .map_or(serde_json::Value::Null, serde_json::Value::from),
                FieldKind::Float => row
                    .get::<_, Option<f64>>(idx)?
                    .map_or(serde_json::Value::Null, serde_json::Value::from),
                FieldKind::Bool => row
                    .get::<_, Option<bool>>(idx)?
                    .map_or(serde_json::Value::Null, serde_json::Value::from),
                FieldKind::Text | FieldKind::Enum | FieldKind::Timestamp => row
                    .get::<_, Option<String>>(idx)?
                    .map_or(serde_json::Value::Null, serde_json::Value::from),
            };
            rec.set(&field.native_name, value);
        }
        Ok(rec)
    }

    fn read_by_id(
        conn: &Connection,
        descriptor: &EntityDescriptor,
        pk: &FieldDescriptor,
        id: i64,
    ) -> StorageResult<Option<Record>> {
        let mut cols = vec![pk.native_name.clone()];
        cols.extend(descriptor.data_fields().map(|f| f.native_name.clone()));
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = ?",
            cols.join(", "),
            descriptor.name,
            pk.native_name
        );
        conn.query_row(&sql, [id], |row| Self::row_to_record(descriptor, row))
            .optional()
            .map_err(Into::into)
    }

    fn raw_id(&self, key: &PrimaryKey) -> StorageResult<i64> {
        match key {
            PrimaryKey::Raw(id) => Ok(*id),
            other => Err(StorageError::KeyShape {
                expected: "raw",
                got: other.shape().to_string(),
            }),
        }
    }
}

#[derive(Default)]
struct SqlSink {
    columns: Vec<String>,
    values: Vec<rusqlite::types::Value>,
}

impl FieldSink for SqlSink {
    fn assign(&mut self, field: &FieldDescriptor, value: FieldValue) {
        self.columns.push(field.native_name.clone());
        self.values.push(match value {
            FieldValue::Text(s) => rusqlite::types::Value::Text(s),
            FieldValue::Integer(i) => rusqlite::types::Value::Integer(i),
            FieldValue::Float(f) => rusqlite::types::Value::Real(f),
            FieldValue::Bool(b) => rusqlite::types::Value::Integer(i64::from(b)),
        });
    }
}

impl DataAccess for SqliteStore {
    fn create_table(&self) -> StorageResult<()> {
        let pk = self.primary_key_field()?;
        let mut cols = vec![format!(
            "{} INTEGER PRIMARY KEY AUTOINCREMENT",
            pk.native_name
        )];
        for field in self.descriptor.data_fields() {
            cols.push(format!("{} {}", field.native_name, self.column_type(field)));
        }
        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            self.descriptor.name,
            cols.join(", ")
        );
        let conn = self.conn.lock().unwrap();
        conn.execute(&ddl, [])?;
        tracing::debug!(entity = %self.descriptor.name, "sqlite table provisioned");
        Ok(())
    }

    fn wrap_key(&self, raw: i64) -> StorageResult<PrimaryKey> {
        Ok(PrimaryKey::raw(raw))
    }

    fn find_by_id(&self, key: &PrimaryKey) -> StorageResult<Option<Record>> {
        let pk = self.primary_key_field()?;
        let id = self.raw_id(key)?;
        let conn = self.conn.lock().unwrap();
        Self::read_by_id(&conn, &self.descriptor, pk, id)
    }

    fn find_all(&self) -> StorageResult<Vec<Option<Record>>> {
        let pk = self.primary_key_field()?;
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&self.select_sql(pk))?;
        let rows = stmt.query_map([], |row| Self::row_to_record(&self.descriptor, row))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(Some(row?));
        }
        Ok(out)
    }

    fn find(&self, lookup: &str) -> StorageResult<Option<Record>> {
        let pk = self.primary_key_field()?;
        let field = self
            .descriptor
            .lookup_field
            .as_deref()
            .ok_or_else(|| StorageError::NoLookupField(self.descriptor.name.clone()))?;
        let sql = format!("{} WHERE {} = ?", self.select_sql(pk), field);
        let conn = self.conn.lock().unwrap();
        conn.query_row(&sql, [lookup], |row| {
            Self::row_to_record(&self.descriptor, row)
        })
        .optional()
        .map_err(Into::into)
    }

    fn save(&self, fields: &FieldMap) -> StorageResult<Record> {
        let pk = self.primary_key_field()?;
        let mut sink = SqlSink::default();
        assign_fields(&self.descriptor, fields, &mut sink)?;

        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let sql = if sink.columns.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES", self.descriptor.name)
        } else {
            let placeholders = vec!["?"; sink.columns.len()].join(", ");
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                self.descriptor.name,
                sink.columns.join(", "),
                placeholders
            )
        };
        tx.execute(&sql, params_from_iter(sink.values.iter()))?;
        let id = tx.last_insert_rowid();
        let rec = Self::read_by_id(&tx, &self.descriptor, pk, id)?.ok_or_else(|| {
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
        let pk = self.primary_key_field()?;
        let id = fields.id().ok_or(StorageError::MissingId)?;
        let mut sink = SqlSink::default();
        assign_fields(&self.descriptor, fields, &mut sink)?;

        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        if !sink.columns.is_empty() {
            let sets = sink
                .columns
                .iter()
                .map(|c| format!("{c} = ?"))
                .collect::<Vec<_>>()
                .join(", ");
            let sql = format!(
                "UPDATE {} SET {} WHERE {} = ?",
                self.descriptor.name, sets, pk.native_name
            );
            let mut values = sink.values;
            values.push(rusqlite::types::Value::Integer(id));
            let affected = tx.execute(&sql, params_from_iter(values.iter()))?;
            if affected == 0 {
                return Err(StorageError::NotFound(format!(
                    "{} id {id}",
                    self.descriptor.name
                )));
            }
        }
        let rec = Self::read_by_id(&tx, &self.descriptor, pk, id)?.ok_or_else(|| {
            StorageError::NotFound(format!("{} id {id}", self.descriptor.name))
        })?;
        tx.commit()?;
        Ok(rec)
    }

    fn delete(&self, key: &PrimaryKey) -> StorageResult<Record> {
        let pk = self.primary_key_field()?;
        let id = self.raw_id(key)?;
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let rec = Self::read_by_id(&tx, &self.descriptor, pk, id)?.ok_or_else(|| {
            StorageError::NotFound(format!("{} id {id}", self.descriptor.name))
        })?;
        let sql = format!(
            "DELETE FROM {} WHERE {} = ?",
            self.descriptor.name, pk.native_name
        );
        tx.execute(&sql, [id])?;
        tx.commit()?;
        tracing::debug!(entity = %self.descriptor.name, id, "deleted");
        Ok(rec)
    }
}
