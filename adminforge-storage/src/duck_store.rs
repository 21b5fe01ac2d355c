//! Relational backend on DuckDB.
//!
//! Ids come from a per-table sequence, so the database (not the caller)
//! generates them; every key this backend produces or consumes is a
//! [`PrimaryKey::Bound`] carrying the owning table name. A bound key from a
//! different table is a caller error, not a lookup miss.

use crate::assign::{assign_fields, FieldSink};
use crate::error::{StorageError, StorageResult};
use crate::DataAccess;
use adminforge_model::{EntityDescriptor, FieldDescriptor, FieldKind, Record};
use adminforge_types::{FieldMap, FieldValue, PrimaryKey};
use chrono::Utc;
use duckdb::{params_from_iter, Connection, OptionalExt, Row};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// DuckDB-backed [`DataAccess`] implementation.
pub struct DuckStore {
    conn: Arc<Mutex<Connection>>,
    descriptor: EntityDescriptor,
}

impl DuckStore {
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

    /// Wraps an externally owned connection.
    #[must_use]
    pub fn from_connection(conn: Arc<Mutex<Connection>>, descriptor: EntityDescriptor) -> Self {
        Self { conn, descriptor }
    }

    fn primary_key_field(&self) -> StorageResult<&FieldDescriptor> {
        self.descriptor
            .primary_key()
            .ok_or_else(|| StorageError::MissingPrimaryKey(self.descriptor.name.clone()))
    }

    fn sequence_name(&self) -> String {
        format!("{}_id_seq", self.descriptor.name)
    }

    fn column_type(&self, field: &FieldDescriptor) -> String {
        let base = match field.kind {
            FieldKind::Integer => "BIGINT",
            FieldKind::Float => "DOUBLE",
            FieldKind::Bool => "BOOLEAN",
            FieldKind::Text | FieldKind::Enum | FieldKind::Timestamp => "VARCHAR",
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

    fn row_to_record(descriptor: &EntityDescriptor, row: &Row<'_>) -> duckdb::Result<Record> {
        let id: i64 = row.get(0)?;
        let mut rec = Record::new(PrimaryKey::bound(descriptor.name.clone(), id));
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

    fn bound_id(&self, key: &PrimaryKey) -> StorageResult<i64> {
        match key {
            PrimaryKey::Bound { table, value } if *table == self.descriptor.name => Ok(*value),
            PrimaryKey::Bound { table, .. } => Err(StorageError::KeyShape {
                expected: "bound",
                got: format!("bound to table '{table}'"),
            }),
            other => Err(StorageError::KeyShape {
                expected: "bound",
                got: other.shape().to_string(),
            }),
        }
    }
}

#[derive(Default)]
struct DuckSink {
    columns: Vec<String>,
    values: Vec<duckdb::types::Value>,
}

impl DuckSink {
    /// Timestamp columns have no database-side default here (they are
    /// VARCHAR), so creation fills the ones the caller did not supply.
    fn fill_missing_timestamps(&mut self, descriptor: &EntityDescriptor) {
        let now = Utc::now().to_rfc3339();
        for field in descriptor.data_fields() {
            if field.kind == FieldKind::Timestamp
                && !self.columns.contains(&field.native_name)
            {
                self.columns.push(field.native_name.clone());
                self.values.push(duckdb::types::Value::Text(now.clone()));
            }
        }
    }
}

impl FieldSink for DuckSink {
    fn assign(&mut self, field: &FieldDescriptor, value: FieldValue) {
        self.columns.push(field.native_name.clone());
        self.values.push(match value {
            FieldValue::Text(s) => duckdb::types::Value::Text(s),
            FieldValue::Integer(i) => duckdb::types::Value::BigInt(i),
            FieldValue::Float(f) => duckdb::types::Value::Double(f),
            FieldValue::Bool(b) => duckdb::types::Value::Boolean(b),
        });
    }
}

impl DataAccess for DuckStore {
    fn create_table(&self) -> StorageResult<()> {
        let pk = self.primary_key_field()?;
        let mut cols = vec![format!("{} BIGINT PRIMARY KEY", pk.native_name)];
        for field in self.descriptor.data_fields() {
            cols.push(format!("{} {}", field.native_name, self.column_type(field)));
        }
        let ddl = format!(
            "CREATE SEQUENCE IF NOT EXISTS {} START 1;\n\
             CREATE TABLE IF NOT EXISTS {} ({});",
            self.sequence_name(),
            self.descriptor.name,
            cols.join(", ")
        );
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(&ddl)?;
        tracing::debug!(entity = %self.descriptor.name, "duckdb table provisioned");
        Ok(())
    }

    fn wrap_key(&self, raw: i64) -> StorageResult<PrimaryKey> {
        Ok(PrimaryKey::bound(self.descriptor.name.clone(), raw))
    }

    fn find_by_id(&self, key: &PrimaryKey) -> StorageResult<Option<Record>> {
        let pk = self.primary_key_field()?;
        let id = self.bound_id(key)?;
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
        let mut sink = DuckSink::default();
        assign_fields(&self.descriptor, fields, &mut sink)?;
        sink.fill_missing_timestamps(&self.descriptor);

        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let id: i64 = tx.query_row(
            &format!("SELECT nextval('{}')", self.sequence_name()),
            [],
            |row| row.get(0),
        )?;
        let mut columns = vec![pk.native_name.clone()];
        columns.extend(sink.columns);
        let mut values = vec![duckdb::types::Value::BigInt(id)];
        values.extend(sink.values);
        let placeholders = vec!["?"; columns.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.descriptor.name,
            columns.join(", "),
            placeholders
        );
        tx.execute(&sql, params_from_iter(values.iter()))?;
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
        let mut sink = DuckSink::default();
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
            values.push(duckdb::types::Value::BigInt(id));
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
        let id = self.bound_id(key)?;
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
