//! SQLite SQL dialect (Strategy pattern).

use tracing::warn;

use crate::core::connection::ConnectionString;
use crate::core::identifier::{quote_double, quote_literal};
use crate::core::schema::{ColumnDef, TableDef};
use crate::core::traits::{insert_lists, require_pk, Dialect};
use crate::core::types::{AbstractType, DefaultValue};
use crate::error::{Result, SchemaError};

const FILE_EXTENSIONS: [&str; 4] = [".db", ".db3", ".sqlite", ".sqlite3"];

/// Whether a connection string points at a SQLite database.
pub(crate) fn connection_matches(conn: &ConnectionString) -> bool {
    if let Some(scheme) = conn.scheme() {
        return matches!(scheme, "sqlite" | "sqlite3" | "file");
    }
    conn.get(&["data source", "datasource", "filename"])
        .map(|v| {
            let v = v.to_ascii_lowercase();
            v == ":memory:" || FILE_EXTENSIONS.iter().any(|ext| v.ends_with(ext))
        })
        .unwrap_or(false)
}

/// SQLite dialect implementation.
///
/// SQLite cannot alter a column in place, so renames are never followed by
/// an alteration, and added columns are relaxed to what `ADD COLUMN` accepts.
#[derive(Debug, Clone, Default)]
pub struct SqliteDialect {
    database: Option<String>,
}

impl SqliteDialect {
    /// Create a dialect for the given database file.
    pub fn new(database: Option<String>) -> Self {
        Self { database }
    }

    /// Database file path, if known.
    pub fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }
}

impl Dialect for SqliteDialect {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn quote_ident(&self, name: &str) -> String {
        quote_double(name)
    }

    fn param_placeholder(&self, index: usize) -> String {
        format!("?{}", index)
    }

    fn map_type(&self, data_type: AbstractType, size: u32, scale: u32) -> Result<String> {
        let native = match data_type {
            t if t.is_integer() => "INTEGER".to_string(),
            AbstractType::Decimal | AbstractType::VarNumeric if size > 0 => {
                format!("NUMERIC({},{})", size, scale)
            }
            AbstractType::Decimal | AbstractType::VarNumeric => "NUMERIC".to_string(),
            AbstractType::Currency => "NUMERIC(19,4)".to_string(),
            AbstractType::Single | AbstractType::Double => "REAL".to_string(),
            AbstractType::Boolean => "BOOLEAN".to_string(),
            AbstractType::String | AbstractType::AnsiString if size > 0 => {
                format!("VARCHAR({})", size)
            }
            AbstractType::String | AbstractType::AnsiString => "TEXT".to_string(),
            AbstractType::StringFixedLength | AbstractType::AnsiStringFixedLength => {
                format!("CHAR({})", size.max(1))
            }
            AbstractType::Binary => "BLOB".to_string(),
            AbstractType::Date => "DATE".to_string(),
            AbstractType::DateTime | AbstractType::DateTime2 => "DATETIME".to_string(),
            AbstractType::DateTimeOffset => "TEXT".to_string(),
            AbstractType::Time => "TIME".to_string(),
            AbstractType::Guid | AbstractType::Xml => "TEXT".to_string(),
            other => return Err(SchemaError::unsupported_type(self.name(), other)),
        };
        Ok(native)
    }

    fn default_expression(&self, marker: &DefaultValue) -> Result<String> {
        match marker {
            DefaultValue::CurrentDateTime => Ok("(datetime('now','localtime'))".to_string()),
            DefaultValue::CurrentUtcDateTime => Ok("CURRENT_TIMESTAMP".to_string()),
            DefaultValue::CurrentDate => Ok("(date('now','localtime'))".to_string()),
            DefaultValue::NewGuid => Ok("(lower(hex(randomblob(16))))".to_string()),
            literal => self.format_default(literal),
        }
    }

    fn table_exists_statement(&self, table: &str) -> String {
        format!(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = {} COLLATE NOCASE",
            quote_literal(table)
        )
    }

    fn database_exists_statement(&self) -> Result<String> {
        // An open connection always has its main database.
        Ok("SELECT COUNT(*) FROM pragma_database_list WHERE name = 'main'".to_string())
    }

    fn can_create_database(&self) -> bool {
        true
    }

    fn create_database_statement(&self) -> Result<String> {
        // Opening the connection creates the file; writing the header makes it durable.
        Ok("PRAGMA user_version = 0".to_string())
    }

    fn column_names_statement(&self, table: &str) -> String {
        format!(
            "SELECT name, \"notnull\" = 0, NULL FROM pragma_table_info({})",
            quote_literal(table)
        )
    }

    fn index_names_statement(&self, table: &str) -> String {
        format!("SELECT name FROM pragma_index_list({})", quote_literal(table))
    }

    fn add_column_statement(&self, table: &TableDef, column: &ColumnDef) -> Result<String> {
        let mut relaxed = column.clone();
        if relaxed.default_value.as_ref().is_some_and(DefaultValue::is_reserved) {
            warn!(
                "SQLite cannot add column {}.{} with a non-constant default; adding it without one",
                table.name(),
                column.name
            );
            relaxed.default_value = None;
        }
        if !relaxed.allow_null && relaxed.default_value.is_none() {
            warn!(
                "SQLite cannot add NOT NULL column {}.{} without a default; adding it as NULL",
                table.name(),
                column.name
            );
            relaxed.allow_null = true;
        }
        if relaxed.is_unique {
            warn!(
                "SQLite cannot add UNIQUE column {}.{}; uniqueness is not enforced",
                table.name(),
                column.name
            );
            relaxed.is_unique = false;
        }

        let mut sql = format!(
            "ALTER TABLE {} ADD COLUMN {}",
            self.quote_ident(table.name()),
            self.column_definition(&relaxed)?
        );
        if let Some(r) = &column.reference {
            sql.push_str(&format!(
                " REFERENCES {} ({})",
                self.quote_ident(&r.table),
                self.quote_ident(&r.column)
            ));
        }
        Ok(sql)
    }

    fn alter_column_statement(&self, table: &TableDef, column: &ColumnDef) -> Result<Option<String>> {
        warn!(
            "SQLite cannot alter column {}.{} in place; keeping the existing definition",
            table.name(),
            column.name
        );
        Ok(None)
    }

    fn upsert_statement(&self, table: &TableDef) -> Result<String> {
        let pk = require_pk(table)?;
        let (cols, params) = insert_lists(self, table);

        let mut sql = format!(
            "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT ({}) DO",
            self.quote_ident(table.name()),
            cols,
            params,
            self.quote_ident(&pk.name)
        );
        let updates: Vec<String> = table
            .columns()
            .iter()
            .filter(|c| !c.is_primary_key())
            .map(|c| {
                let q = self.quote_ident(&c.name);
                format!("{} = excluded.{}", q, q)
            })
            .collect();
        if updates.is_empty() {
            sql.push_str(" NOTHING");
        } else {
            sql.push_str(" UPDATE SET ");
            sql.push_str(&updates.join(", "));
        }
        Ok(sql)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::builder::TableBuilder;

    fn dialect() -> SqliteDialect {
        SqliteDialect::new(Some(":memory:".into()))
    }

    #[test]
    fn test_connection_matches() {
        assert!(connection_matches(&ConnectionString::parse("sqlite::memory:")));
        assert!(connection_matches(&ConnectionString::parse("Data Source=/tmp/app.DB;Cache=Shared")));
        assert!(!connection_matches(&ConnectionString::parse("Data Source=db01:1521/ORCL")));
        assert!(!connection_matches(&ConnectionString::parse("postgres://h/db")));
    }

    #[test]
    fn test_map_type() {
        let d = dialect();
        assert_eq!(d.map_type(AbstractType::UInt64, 0, 0).unwrap(), "INTEGER");
        assert_eq!(d.map_type(AbstractType::Decimal, 18, 4).unwrap(), "NUMERIC(18,4)");
        assert_eq!(d.map_type(AbstractType::String, 50, 0).unwrap(), "VARCHAR(50)");
        assert_eq!(d.map_type(AbstractType::String, 0, 0).unwrap(), "TEXT");
        assert_eq!(d.map_type(AbstractType::AnsiStringFixedLength, 3, 0).unwrap(), "CHAR(3)");
        assert_eq!(d.map_type(AbstractType::Binary, 0, 0).unwrap(), "BLOB");
        assert_eq!(d.map_type(AbstractType::DateTime2, 0, 0).unwrap(), "DATETIME");
        assert!(matches!(
            d.map_type(AbstractType::Object, 0, 0),
            Err(SchemaError::UnsupportedType { .. })
        ));
    }

    #[test]
    fn test_reserved_defaults() {
        let d = dialect();
        assert_eq!(
            d.format_default(&DefaultValue::CurrentDateTime).unwrap(),
            "(datetime('now','localtime'))"
        );
        assert_eq!(
            d.format_default(&DefaultValue::CurrentUtcDateTime).unwrap(),
            "CURRENT_TIMESTAMP"
        );
    }

    #[test]
    fn test_add_not_null_column_is_relaxed() {
        let table = TableBuilder::new("t")
            .pk_column("id", AbstractType::Int32)
            .column(ColumnDef::new("code", AbstractType::String).size(10).not_null().unique())
            .build()
            .unwrap();
        let sql = dialect()
            .add_column_statement(&table, table.column("code").unwrap())
            .unwrap();
        assert_eq!(sql, "ALTER TABLE \"t\" ADD COLUMN \"code\" VARCHAR(10) NULL");
    }

    #[test]
    fn test_add_column_drops_non_constant_default() {
        let table = TableBuilder::new("t")
            .pk_column("id", AbstractType::Int32)
            .column(
                ColumnDef::new("stamp", AbstractType::DateTime)
                    .not_null()
                    .default_value(DefaultValue::CurrentDateTime),
            )
            .column(
                ColumnDef::new("flag", AbstractType::Boolean)
                    .not_null()
                    .default_value(false),
            )
            .build()
            .unwrap();
        let d = dialect();
        assert_eq!(
            d.add_column_statement(&table, table.column("stamp").unwrap()).unwrap(),
            "ALTER TABLE \"t\" ADD COLUMN \"stamp\" DATETIME NULL"
        );
        assert_eq!(
            d.add_column_statement(&table, table.column("flag").unwrap()).unwrap(),
            "ALTER TABLE \"t\" ADD COLUMN \"flag\" BOOLEAN DEFAULT 0 NOT NULL"
        );
    }

    #[test]
    fn test_upsert_statement() {
        let table = TableBuilder::new("im_user")
            .pk_column("id", AbstractType::Int32)
            .add_column("name", AbstractType::String)
            .build()
            .unwrap();
        assert_eq!(
            dialect().upsert_statement(&table).unwrap(),
            "INSERT INTO \"im_user\" (\"id\", \"name\") VALUES (?1, ?2) ON CONFLICT (\"id\") DO UPDATE SET \"name\" = excluded.\"name\""
        );

        let keys_only = TableBuilder::new("k")
            .pk_column("id", AbstractType::Int32)
            .build()
            .unwrap();
        assert!(dialect().upsert_statement(&keys_only).unwrap().ends_with("DO NOTHING"));
    }

    #[test]
    fn test_probes_escape_names() {
        let d = dialect();
        assert_eq!(
            d.table_exists_statement("o'brien"),
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'o''brien' COLLATE NOCASE"
        );
        assert_eq!(
            d.column_names_statement("im_user"),
            "SELECT name, \"notnull\" = 0, NULL FROM pragma_table_info('im_user')"
        );
    }
}
