//! MySQL SQL dialect (Strategy pattern).

use crate::core::connection::ConnectionString;
use crate::core::identifier::{constraint_name, quote_backtick, quote_literal};
use crate::core::schema::{ColumnDef, TableDef};
use crate::core::traits::{insert_lists, require_pk, Dialect};
use crate::core::types::{AbstractType, DefaultValue};
use crate::drivers::require_database;
use crate::error::{Result, SchemaError};

/// Longest VARCHAR that fits a utf8mb4 row.
const MAX_VARCHAR: u32 = 16383;

/// Whether a connection string points at MySQL or MariaDB.
pub(crate) fn connection_matches(conn: &ConnectionString) -> bool {
    if let Some(scheme) = conn.scheme() {
        return matches!(scheme, "mysql" | "mariadb");
    }
    if conn.get(&["port"]) == Some("3306") {
        return true;
    }
    // Connector/NET style; ODBC and Windows-auth strings belong to SQL Server.
    conn.has(&["server"])
        && conn.has(&["uid"])
        && !conn.has(&["driver", "trusted_connection", "integrated security"])
}

fn is_lob(native: &str) -> bool {
    native.ends_with("TEXT") || native.ends_with("BLOB")
}

/// MySQL dialect implementation.
#[derive(Debug, Clone, Default)]
pub struct MysqlDialect {
    database: Option<String>,
}

impl MysqlDialect {
    /// Create a dialect bound to the given database.
    pub fn new(database: Option<String>) -> Self {
        Self { database }
    }
}

impl Dialect for MysqlDialect {
    fn name(&self) -> &str {
        "mysql"
    }

    fn quote_ident(&self, name: &str) -> String {
        quote_backtick(name)
    }

    fn param_placeholder(&self, _index: usize) -> String {
        // MySQL uses positional ? placeholders
        "?".to_string()
    }

    fn map_type(&self, data_type: AbstractType, size: u32, scale: u32) -> Result<String> {
        let native = match data_type {
            AbstractType::SByte => "TINYINT".into(),
            AbstractType::Byte => "TINYINT UNSIGNED".into(),
            AbstractType::Int16 => "SMALLINT".into(),
            AbstractType::UInt16 => "SMALLINT UNSIGNED".into(),
            AbstractType::Int32 => "INT".into(),
            AbstractType::UInt32 => "INT UNSIGNED".into(),
            AbstractType::Int64 => "BIGINT".into(),
            AbstractType::UInt64 => "BIGINT UNSIGNED".into(),
            AbstractType::Decimal | AbstractType::VarNumeric if size > 0 => {
                format!("DECIMAL({},{})", size, scale)
            }
            AbstractType::Decimal | AbstractType::VarNumeric => "DECIMAL".into(),
            AbstractType::Currency => "DECIMAL(19,4)".into(),
            AbstractType::Single => "FLOAT".into(),
            AbstractType::Double => "DOUBLE".into(),
            AbstractType::Boolean => "TINYINT(1)".into(),
            AbstractType::String | AbstractType::AnsiString
                if size == 0 || size > MAX_VARCHAR =>
            {
                "LONGTEXT".into()
            }
            AbstractType::String | AbstractType::AnsiString => format!("VARCHAR({})", size),
            AbstractType::StringFixedLength | AbstractType::AnsiStringFixedLength => {
                format!("CHAR({})", size.clamp(1, 255))
            }
            AbstractType::Binary if size == 0 || size > 65535 => "LONGBLOB".into(),
            AbstractType::Binary => format!("VARBINARY({})", size),
            AbstractType::Date => "DATE".into(),
            AbstractType::DateTime => "DATETIME".into(),
            AbstractType::DateTime2 => "DATETIME(6)".into(),
            AbstractType::DateTimeOffset => "TIMESTAMP(6)".into(),
            AbstractType::Time => "TIME".into(),
            AbstractType::Guid => "CHAR(36)".into(),
            AbstractType::Xml => "LONGTEXT".into(),
            other => return Err(SchemaError::unsupported_type(self.name(), other)),
        };
        Ok(native)
    }

    fn default_expression(&self, marker: &DefaultValue) -> Result<String> {
        match marker {
            DefaultValue::CurrentDateTime => Ok("CURRENT_TIMESTAMP".into()),
            DefaultValue::CurrentUtcDateTime => Ok("(UTC_TIMESTAMP())".into()),
            DefaultValue::CurrentDate => Ok("(CURRENT_DATE)".into()),
            DefaultValue::NewGuid => Ok("(UUID())".into()),
            literal => self.format_default(literal),
        }
    }

    fn column_definition(&self, column: &ColumnDef) -> Result<String> {
        let native = self.map_type(column.data_type, column.size, column.scale)?;
        let mut def = format!("{} {}", self.quote_ident(&column.name), native);
        if let Some(default) = &column.default_value {
            let value = self.format_default(default)?;
            // TEXT and BLOB columns only accept expression defaults.
            if is_lob(&native) && !default.is_reserved() {
                def.push_str(&format!(" DEFAULT ({})", value));
            } else {
                def.push_str(&format!(" DEFAULT {}", value));
            }
        }
        def.push_str(if column.allow_null { " NULL" } else { " NOT NULL" });
        if column.is_unique && !column.is_primary_key() {
            def.push_str(" UNIQUE");
        }
        Ok(def)
    }

    fn table_exists_statement(&self, table: &str) -> String {
        format!(
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = DATABASE() AND table_name = {}",
            quote_literal(table)
        )
    }

    fn database_exists_statement(&self) -> Result<String> {
        let db = require_database(self.name(), &self.database)?;
        Ok(format!(
            "SELECT COUNT(*) FROM information_schema.schemata WHERE schema_name = {}",
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
            "SELECT column_name, is_nullable, character_maximum_length FROM information_schema.columns WHERE table_schema = DATABASE() AND table_name = {} ORDER BY ordinal_position",
            quote_literal(table)
        )
    }

    fn index_names_statement(&self, table: &str) -> String {
        format!(
            "SELECT DISTINCT index_name FROM information_schema.statistics WHERE table_schema = DATABASE() AND table_name = {}",
            quote_literal(table)
        )
    }

    fn add_column_statement(&self, table: &TableDef, column: &ColumnDef) -> Result<String> {
        // MySQL parses but ignores inline REFERENCES; add a table constraint instead.
        let mut sql = format!(
            "ALTER TABLE {} ADD COLUMN {}",
            self.quote_ident(table.name()),
            self.column_definition(column)?
        );
        if let Some(r) = &column.reference {
            sql.push_str(&format!(
                ", ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
                self.quote_ident(&constraint_name("FK", table.name(), &[column.name.as_str()])),
                self.quote_ident(&column.name),
                self.quote_ident(&r.table),
                self.quote_ident(&r.column)
            ));
        }
        Ok(sql)
    }

    fn alter_column_statement(&self, table: &TableDef, column: &ColumnDef) -> Result<Option<String>> {
        Ok(Some(format!(
            "ALTER TABLE {} MODIFY COLUMN {}",
            self.quote_ident(table.name()),
            self.column_definition(column)?
        )))
    }

    fn upsert_statement(&self, table: &TableDef) -> Result<String> {
        // MySQL uses INSERT ... ON DUPLICATE KEY UPDATE, keyed by the PRIMARY KEY
        require_pk(table)?;
        let (cols, params) = insert_lists(self, table);

        let update_set = table
            .columns()
            .iter()
            .filter(|c| !c.is_primary_key())
            .map(|c| {
                format!(
                    "{} = VALUES({})",
                    self.quote_ident(&c.name),
                    self.quote_ident(&c.name)
                )
            })
            .collect::<Vec<_>>();

        if update_set.is_empty() {
            // If only PK columns, use INSERT IGNORE to skip duplicates
            return Ok(format!(
                "INSERT IGNORE INTO {} ({}) VALUES ({})",
                self.quote_ident(table.name()),
                cols,
                params
            ));
        }
        Ok(format!(
            "INSERT INTO {} ({}) VALUES ({}) ON DUPLICATE KEY UPDATE {}",
            self.quote_ident(table.name()),
            cols,
            params,
            update_set.join(", ")
        ))
    }
}
