//! PostgreSQL SQL dialect (Strategy pattern).

use crate::core::connection::ConnectionString;
use crate::core::identifier::{quote_double, quote_literal};
use crate::core::schema::{ColumnDef, TableDef};
use crate::core::traits::{insert_lists, require_pk, Dialect};
use crate::core::types::{AbstractType, DefaultValue};
use crate::drivers::require_database;
use crate::error::{Result, SchemaError};

/// Whether a connection string points at PostgreSQL.
pub(crate) fn connection_matches(conn: &ConnectionString) -> bool {
    if let Some(scheme) = conn.scheme() {
        return matches!(scheme, "postgres" | "postgresql");
    }
    conn.has(&["host", "dbname"]) || conn.get(&["port"]) == Some("5432")
}

/// PostgreSQL dialect implementation.
///
/// Tables are created in the connection's current schema.
#[derive(Debug, Clone, Default)]
pub struct PostgresDialect {
    database: Option<String>,
}

impl PostgresDialect {
    /// Create a dialect bound to the given database.
    pub fn new(database: Option<String>) -> Self {
        Self { database }
    }
}

impl Dialect for PostgresDialect {
    fn name(&self) -> &str {
        "postgres"
    }

    fn quote_ident(&self, name: &str) -> String {
        quote_double(name)
    }

    fn param_placeholder(&self, index: usize) -> String {
        // PostgreSQL uses $1, $2, etc. (1-based)
        format!("${}", index)
    }

    fn map_type(&self, data_type: AbstractType, size: u32, scale: u32) -> Result<String> {
        let native = match data_type {
            AbstractType::SByte | AbstractType::Byte | AbstractType::Int16 => "SMALLINT".into(),
            AbstractType::UInt16 | AbstractType::Int32 => "INTEGER".into(),
            AbstractType::UInt32 | AbstractType::Int64 => "BIGINT".into(),
            AbstractType::UInt64 => "NUMERIC(20,0)".into(),
            AbstractType::Decimal | AbstractType::VarNumeric if size > 0 => {
                format!("NUMERIC({},{})", size, scale)
            }
            AbstractType::Decimal | AbstractType::VarNumeric => "NUMERIC".into(),
            AbstractType::Currency => "NUMERIC(19,4)".into(),
            AbstractType::Single => "REAL".into(),
            AbstractType::Double => "DOUBLE PRECISION".into(),
            AbstractType::Boolean => "BOOLEAN".into(),
            AbstractType::String | AbstractType::AnsiString if size > 0 => {
                format!("VARCHAR({})", size)
            }
            AbstractType::String | AbstractType::AnsiString => "TEXT".into(),
            AbstractType::StringFixedLength | AbstractType::AnsiStringFixedLength => {
                format!("CHAR({})", size.max(1))
            }
            AbstractType::Binary => "BYTEA".into(),
            AbstractType::Date => "DATE".into(),
            AbstractType::DateTime | AbstractType::DateTime2 => "TIMESTAMP".into(),
            AbstractType::DateTimeOffset => "TIMESTAMPTZ".into(),
            AbstractType::Time => "TIME".into(),
            AbstractType::Guid => "UUID".into(),
            AbstractType::Xml => "XML".into(),
            other => return Err(SchemaError::unsupported_type(self.name(), other)),
        };
        Ok(native)
    }

    fn bool_literal(&self, value: bool) -> String {
        if value { "TRUE" } else { "FALSE" }.to_string()
    }

    fn default_expression(&self, marker: &DefaultValue) -> Result<String> {
        match marker {
            DefaultValue::CurrentDateTime => Ok("LOCALTIMESTAMP".into()),
            DefaultValue::CurrentUtcDateTime => Ok("(NOW() AT TIME ZONE 'utc')".into()),
            DefaultValue::CurrentDate => Ok("CURRENT_DATE".into()),
            DefaultValue::NewGuid => Ok("gen_random_uuid()".into()),
            literal => self.format_default(literal),
        }
    }

    fn table_exists_statement(&self, table: &str) -> String {
        format!(
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = current_schema() AND table_name = {}",
            quote_literal(table)
        )
    }

    fn database_exists_statement(&self) -> Result<String> {
        let db = require_database(self.name(), &self.database)?;
        Ok(format!(
            "SELECT COUNT(*) FROM pg_database WHERE datname = {}",
            quote_literal(db)
        ))
    }

    fn can_create_database(&self) -> bool {
        true
    }

    fn create_database_statement(&self) -> Result<String> {
        let db = require_database(self.name(), &self.database)?;
        Ok(format!("CREATE DATABASE {}", self.quote_ident(db)))
    }

    fn column_names_statement(&self, table: &str) -> String {
        format!(
            "SELECT column_name, is_nullable, character_maximum_length FROM information_schema.columns WHERE table_schema = current_schema() AND table_name = {} ORDER BY ordinal_position",
            quote_literal(table)
        )
    }

    fn index_names_statement(&self, table: &str) -> String {
        format!(
            "SELECT indexname FROM pg_indexes WHERE schemaname = current_schema() AND tablename = {}",
            quote_literal(table)
        )
    }

    fn storage_clause(&self, space: &str) -> Option<String> {
        Some(format!("TABLESPACE {}", self.quote_ident(space)))
    }

    fn alter_column_statement(&self, table: &TableDef, column: &ColumnDef) -> Result<Option<String>> {
        let col = self.quote_ident(&column.name);
        Ok(Some(format!(
            "ALTER TABLE {} ALTER COLUMN {} TYPE {}, ALTER COLUMN {} {} NOT NULL",
            self.quote_ident(table.name()),
            col,
            self.map_type(column.data_type, column.size, column.scale)?,
            col,
            if column.allow_null { "DROP" } else { "SET" }
        )))
    }

    fn upsert_statement(&self, table: &TableDef) -> Result<String> {
        // PostgreSQL uses INSERT ... ON CONFLICT for upsert operations
        let pk = require_pk(table)?;
        let (cols, params) = insert_lists(self, table);

        let mut sql = format!(
            "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT ({}) DO",
            self.quote_ident(table.name()),
            cols,
            params,
            self.quote_ident(&pk.name)
        );

        let update_set = table
            .columns()
            .iter()
            .filter(|c| !c.is_primary_key())
            .map(|c| format!("{} = EXCLUDED.{}", self.quote_ident(&c.name), self.quote_ident(&c.name)))
            .collect::<Vec<_>>();

        if update_set.is_empty() {
            // No non-PK columns to update - just ignore duplicates
            sql.push_str(" NOTHING");
        } else {
            sql.push_str(&format!(" UPDATE SET {}", update_set.join(", ")));
        }
        Ok(sql)
    }
}
