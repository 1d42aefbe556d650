//! Oracle SQL dialect (Strategy pattern).

use crate::core::connection::ConnectionString;
use crate::core::identifier::{quote_double, quote_literal};
use crate::core::schema::{ColumnDef, TableDef};
use crate::core::traits::{require_pk, Dialect};
use crate::core::types::{AbstractType, DefaultValue};
use crate::error::{Result, SchemaError};

/// Whether a connection string points at Oracle.
pub(crate) fn connection_matches(conn: &ConnectionString) -> bool {
    if let Some(scheme) = conn.scheme() {
        return scheme == "oracle";
    }
    if conn.has(&["dba privilege"]) {
        return true;
    }
    // TNS descriptor or EZConnect (host:port/service); a backslash means a
    // SQL Server named instance.
    conn.get(&["data source"])
        .map(|ds| {
            ds.to_ascii_lowercase().contains("(description")
                || (ds.contains('/') && !ds.contains('\\'))
        })
        .unwrap_or(false)
}

/// Oracle dialect implementation.
///
/// Objects are created in the connected user's schema.
#[derive(Debug, Clone, Default)]
pub struct OracleDialect {
    database: Option<String>,
}

impl OracleDialect {
    /// Create a dialect bound to the given service.
    pub fn new(database: Option<String>) -> Self {
        Self { database }
    }

    /// Service name from the connection string, if known.
    pub fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }
}

impl Dialect for OracleDialect {
    fn name(&self) -> &str {
        "oracle"
    }

    fn quote_ident(&self, name: &str) -> String {
        quote_double(name)
    }

    fn param_placeholder(&self, index: usize) -> String {
        format!(":{}", index)
    }

    fn map_type(&self, data_type: AbstractType, size: u32, scale: u32) -> Result<String> {
        let native = match data_type {
            AbstractType::SByte | AbstractType::Byte => "NUMBER(3)".into(),
            AbstractType::Int16 | AbstractType::UInt16 => "NUMBER(5)".into(),
            AbstractType::Int32 | AbstractType::UInt32 => "NUMBER(10)".into(),
            AbstractType::Int64 => "NUMBER(19)".into(),
            AbstractType::UInt64 => "NUMBER(20)".into(),
            AbstractType::Decimal | AbstractType::VarNumeric if size > 0 => {
                format!("NUMBER({},{})", size, scale)
            }
            AbstractType::Decimal | AbstractType::VarNumeric => "NUMBER".into(),
            AbstractType::Currency => "NUMBER(19,4)".into(),
            AbstractType::Single => "BINARY_FLOAT".into(),
            AbstractType::Double => "BINARY_DOUBLE".into(),
            AbstractType::Boolean => "NUMBER(1)".into(),
            AbstractType::String if size == 0 || size > 2000 => "NCLOB".into(),
            AbstractType::String => format!("NVARCHAR2({})", size),
            AbstractType::AnsiString if size == 0 || size > 4000 => "CLOB".into(),
            AbstractType::AnsiString => format!("VARCHAR2({})", size),
            AbstractType::StringFixedLength => format!("NCHAR({})", size.clamp(1, 1000)),
            AbstractType::AnsiStringFixedLength => format!("CHAR({})", size.clamp(1, 2000)),
            AbstractType::Binary if size == 0 || size > 2000 => "BLOB".into(),
            AbstractType::Binary => format!("RAW({})", size),
            AbstractType::Date => "DATE".into(),
            AbstractType::DateTime | AbstractType::DateTime2 => "TIMESTAMP".into(),
            AbstractType::DateTimeOffset => "TIMESTAMP WITH TIME ZONE".into(),
            AbstractType::Time => "INTERVAL DAY TO SECOND".into(),
            AbstractType::Guid => "RAW(16)".into(),
            AbstractType::Xml => "XMLTYPE".into(),
            other => return Err(SchemaError::unsupported_type(self.name(), other)),
        };
        Ok(native)
    }

    fn default_expression(&self, marker: &DefaultValue) -> Result<String> {
        match marker {
            DefaultValue::CurrentDateTime => Ok("LOCALTIMESTAMP".into()),
            DefaultValue::CurrentUtcDateTime => Ok("SYS_EXTRACT_UTC(SYSTIMESTAMP)".into()),
            DefaultValue::CurrentDate => Ok("TRUNC(SYSDATE)".into()),
            DefaultValue::NewGuid => Ok("SYS_GUID()".into()),
            literal => self.format_default(literal),
        }
    }

    fn table_exists_statement(&self, table: &str) -> String {
        format!(
            "SELECT COUNT(*) FROM user_tables WHERE table_name = {}",
            quote_literal(table)
        )
    }

    fn database_exists_statement(&self) -> Result<String> {
        // A successful connection implies the database exists.
        Ok("SELECT COUNT(*) FROM dual".into())
    }

    fn can_create_database(&self) -> bool {
        false
    }

    fn create_database_statement(&self) -> Result<String> {
        Err(SchemaError::not_supported(self.name(), "CREATE DATABASE"))
    }

    fn column_names_statement(&self, table: &str) -> String {
        format!(
            "SELECT column_name, nullable, char_length FROM user_tab_columns WHERE table_name = {} ORDER BY column_id",
            quote_literal(table)
        )
    }

    fn index_names_statement(&self, table: &str) -> String {
        format!(
            "SELECT index_name FROM user_indexes WHERE table_name = {}",
            quote_literal(table)
        )
    }

    fn storage_clause(&self, space: &str) -> Option<String> {
        Some(format!("TABLESPACE {}", self.quote_ident(space)))
    }

    fn add_column_keyword(&self) -> &str {
        "ADD"
    }

    fn alter_column_statement(&self, table: &TableDef, column: &ColumnDef) -> Result<Option<String>> {
        Ok(Some(format!(
            "ALTER TABLE {} MODIFY ({} {} {})",
            self.quote_ident(table.name()),
            self.quote_ident(&column.name),
            self.map_type(column.data_type, column.size, column.scale)?,
            if column.allow_null { "NULL" } else { "NOT NULL" }
        )))
    }

    fn upsert_statement(&self, table: &TableDef) -> Result<String> {
        let pk = require_pk(table)?;
        let q = |name: &str| self.quote_ident(name);

        let source_cols = table
            .columns()
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{} AS {}", self.param_placeholder(i + 1), q(&c.name)))
            .collect::<Vec<_>>()
            .join(", ");
        let update_set = table
            .columns()
            .iter()
            .filter(|c| !c.is_primary_key())
            .map(|c| format!("t.{} = s.{}", q(&c.name), q(&c.name)))
            .collect::<Vec<_>>();
        let insert_cols = table
            .columns()
            .iter()
            .map(|c| q(&c.name))
            .collect::<Vec<_>>()
            .join(", ");
        let insert_vals = table
            .columns()
            .iter()
            .map(|c| format!("s.{}", q(&c.name)))
            .collect::<Vec<_>>()
            .join(", ");

        let mut sql = format!(
            "MERGE INTO {} t USING (SELECT {} FROM dual) s ON (t.{} = s.{})",
            q(table.name()),
            source_cols,
            q(&pk.name),
            q(&pk.name)
        );
        if !update_set.is_empty() {
            sql.push_str(&format!(" WHEN MATCHED THEN UPDATE SET {}", update_set.join(", ")));
        }
        sql.push_str(&format!(
            " WHEN NOT MATCHED THEN INSERT ({}) VALUES ({})",
            insert_cols, insert_vals
        ));
        Ok(sql)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::builder::TableBuilder;

    fn dialect() -> OracleDialect {
        OracleDialect::new(None)
    }

    fn accounts() -> TableDef {
        TableBuilder::new("ACCOUNTS")
            .pk_column("ID", AbstractType::Int64)
            .column(ColumnDef::new("NAME", AbstractType::String).size(100).not_null())
            .column(ColumnDef::new("NOTES", AbstractType::String))
            .column(ColumnDef::new("TOKEN", AbstractType::Guid).default_value(DefaultValue::NewGuid))
            .data_space("USERS")
            .build()
            .unwrap()
    }

    #[test]
    fn test_connection_matches() {
        let m = |s: &str| connection_matches(&ConnectionString::parse(s));
        assert!(m("Data Source=db01:1521/ORCLPDB;User Id=app;Password=x"));
        assert!(m("Data Source=(DESCRIPTION=(ADDRESS=(HOST=db01)));User Id=app"));
        assert!(m("oracle://app:x@db01:1521/ORCLPDB"));
        assert!(!m("Data Source=db01\\SQLEXPRESS;Initial Catalog=app"));
        assert!(!m("Server=db01;Database=app"));
    }

    #[test]
    fn test_map_type() {
        let d = dialect();
        assert_eq!(d.map_type(AbstractType::Int32, 0, 0).unwrap(), "NUMBER(10)");
        assert_eq!(d.map_type(AbstractType::String, 100, 0).unwrap(), "NVARCHAR2(100)");
        assert_eq!(d.map_type(AbstractType::String, 0, 0).unwrap(), "NCLOB");
        assert_eq!(d.map_type(AbstractType::AnsiString, 4000, 0).unwrap(), "VARCHAR2(4000)");
        assert_eq!(d.map_type(AbstractType::Boolean, 0, 0).unwrap(), "NUMBER(1)");
        assert_eq!(d.map_type(AbstractType::Guid, 0, 0).unwrap(), "RAW(16)");
    }

    #[test]
    fn test_create_table_statement() {
        let sql = dialect().create_table_statement(&accounts()).unwrap();
        assert!(sql.contains("\"ID\" NUMBER(19) NOT NULL"));
        assert!(sql.contains("\"NOTES\" NCLOB NULL"));
        assert!(sql.contains("\"TOKEN\" RAW(16) DEFAULT SYS_GUID() NULL"));
        assert!(sql.ends_with(") TABLESPACE \"USERS\""));
    }

    #[test]
    fn test_create_database_not_supported() {
        let d = dialect();
        assert!(!d.can_create_database());
        assert!(matches!(
            d.create_database_statement(),
            Err(SchemaError::NotSupported { .. })
        ));
        assert_eq!(d.database_exists_statement().unwrap(), "SELECT COUNT(*) FROM dual");
    }

    #[test]
    fn test_alter_and_upsert() {
        let table = accounts();
        let d = dialect();
        assert_eq!(
            d.alter_column_statement(&table, table.column("NAME").unwrap())
                .unwrap()
                .unwrap(),
            "ALTER TABLE \"ACCOUNTS\" MODIFY (\"NAME\" NVARCHAR2(100) NOT NULL)"
        );

        let sql = d.upsert_statement(&table).unwrap();
        assert!(sql.starts_with("MERGE INTO \"ACCOUNTS\" t USING (SELECT :1 AS \"ID\", :2 AS \"NAME\""));
        assert!(sql.contains("FROM dual) s ON (t.\"ID\" = s.\"ID\")"));
        assert!(sql.contains("WHEN MATCHED THEN UPDATE SET t.\"NAME\" = s.\"NAME\""));
        assert!(sql.ends_with("VALUES (s.\"ID\", s.\"NAME\", s.\"NOTES\", s.\"TOKEN\")"));
    }
}
