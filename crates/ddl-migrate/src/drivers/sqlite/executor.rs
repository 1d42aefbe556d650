//! Embedded SQLite executor.

use std::path::Path;

use rusqlite::types::{Value, ValueRef};
use rusqlite::{params_from_iter, Connection};
use tracing::debug;

use crate::core::connection::ConnectionString;
use crate::core::traits::Executor;
use crate::core::value::SqlValue;
use crate::error::{Result, SchemaError};

/// [`Executor`] over a `rusqlite` connection.
///
/// Foreign-key enforcement is switched on when the connection is wrapped.
pub struct SqliteExecutor {
    conn: Connection,
}

impl SqliteExecutor {
    /// Wrap an open connection.
    pub fn new(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self { conn })
    }

    /// Open (or create) a database file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::new(Connection::open(path)?)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        Self::new(Connection::open_in_memory()?)
    }

    /// Open the database a SQLite connection string points at.
    pub fn from_connection_string(connection_string: &str) -> Result<Self> {
        let conn = ConnectionString::parse(connection_string);
        match conn.database() {
            Some(db) if db == ":memory:" => Self::open_in_memory(),
            Some(db) => Self::open(db),
            None => conn
                .get(&["data source", "datasource", "filename"])
                .map(|path| Self::open(path))
                .unwrap_or_else(|| {
                    Err(SchemaError::Config(format!(
                        "Not a SQLite connection string: {}",
                        connection_string
                    )))
                }),
        }
    }

    /// The underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Unwrap the underlying connection.
    pub fn into_inner(self) -> Connection {
        self.conn
    }
}

fn to_sqlite(value: &SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Bool(v) => Value::Integer(*v as i64),
        SqlValue::Int(v) => Value::Integer(*v),
        SqlValue::Float(v) => Value::Real(*v),
        SqlValue::Decimal(v) => Value::Text(v.to_string()),
        SqlValue::Text(v) => Value::Text(v.clone()),
        SqlValue::Bytes(v) => Value::Blob(v.clone()),
        SqlValue::Uuid(v) => Value::Text(v.to_string()),
        SqlValue::Date(v) => Value::Text(v.format("%Y-%m-%d").to_string()),
        SqlValue::Time(v) => Value::Text(v.format("%H:%M:%S%.f").to_string()),
        SqlValue::DateTime(v) => Value::Text(v.format("%Y-%m-%d %H:%M:%S%.f").to_string()),
        SqlValue::DateTimeOffset(v) => Value::Text(v.to_rfc3339()),
    }
}

fn from_sqlite(value: ValueRef<'_>) -> SqlValue {
    match value {
        ValueRef::Null => SqlValue::Null,
        ValueRef::Integer(v) => SqlValue::Int(v),
        ValueRef::Real(v) => SqlValue::Float(v),
        ValueRef::Text(v) => SqlValue::Text(String::from_utf8_lossy(v).into_owned()),
        ValueRef::Blob(v) => SqlValue::Bytes(v.to_vec()),
    }
}

impl Executor for SqliteExecutor {
    fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<u64> {
        debug!("sqlite execute: {}", sql);
        let values: Vec<Value> = params.iter().map(to_sqlite).collect();
        let affected = self.conn.execute(sql, params_from_iter(values.iter()))?;
        Ok(affected as u64)
    }

    fn query(&mut self, sql: &str, params: &[SqlValue]) -> Result<Vec<Vec<SqlValue>>> {
        debug!("sqlite query: {}", sql);
        let values: Vec<Value> = params.iter().map(to_sqlite).collect();
        let mut stmt = self.conn.prepare(sql)?;
        let width = stmt.column_count();

        let mut rows = stmt.query(params_from_iter(values.iter()))?;
        let mut result = Vec::new();
        while let Some(row) = rows.next()? {
            let mut out = Vec::with_capacity(width);
            for i in 0..width {
                out.push(from_sqlite(row.get_ref(i)?));
            }
            result.push(out);
        }
        Ok(result)
    }
}
