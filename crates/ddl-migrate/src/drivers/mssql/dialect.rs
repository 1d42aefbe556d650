//! Microsoft SQL Server SQL dialect (Strategy pattern).

use crate::core::connection::ConnectionString;
use crate::core::identifier::{quote_brackets, quote_literal};
use crate::core::schema::{ColumnDef, TableDef};
use crate::core::traits::{require_pk, Dialect};
use crate::core::types::{AbstractType, DefaultValue};
use crate::drivers::require_database;
use crate::error::{Result, SchemaError};

/// Whether a connection string points at SQL Server.
///
/// SQL Server is sniffed last, so any ADO-style string naming a server or
/// catalog that no other engine claimed is taken to be SQL Server.
pub(crate) fn connection_matches(conn: &ConnectionString) -> bool {
    if let Some(scheme) = conn.scheme() {
        return matches!(scheme, "mssql" | "sqlserver");
    }
    conn.has(&[
        "server",
        "data source",
        "initial catalog",
        "integrated security",
        "trusted_connection",
        "addr",
        "address",
    ])
}

/// Microsoft SQL Server dialect implementation.
#[derive(Debug, Clone, Default)]
pub struct MssqlDialect {
    database: Option<String>,
}

impl MssqlDialect {
    /// Create a dialect bound to the given database (initial catalog).
    pub fn new(database: Option<String>) -> Self {
        Self { database }
    }
}

impl Dialect for MssqlDialect {
    fn name(&self) -> &str {
        "mssql"
    }

    fn quote_ident(&self, name: &str) -> String {
        quote_brackets(name)
    }

    fn param_placeholder(&self, index: usize) -> String {
        // MSSQL uses @P1, @P2, etc. (1-based)
        format!("@P{}", index)
    }

    fn map_type(&self, data_type: AbstractType, size: u32, scale: u32) -> Result<String> {
        let native = match data_type {
            AbstractType::Byte => "TINYINT".into(),
            AbstractType::SByte | AbstractType::Int16 => "SMALLINT".into(),
            AbstractType::UInt16 | AbstractType::Int32 => "INT".into(),
            AbstractType::UInt32 | AbstractType::Int64 => "BIGINT".into(),
            AbstractType::UInt64 => "DECIMAL(20,0)".into(),
            AbstractType::Decimal | AbstractType::VarNumeric if size > 0 => {
                format!("DECIMAL({},{})", size, scale)
            }
            AbstractType::Decimal | AbstractType::VarNumeric => "DECIMAL".into(),
            AbstractType::Currency => "MONEY".into(),
            AbstractType::Single => "REAL".into(),
            AbstractType::Double => "FLOAT".into(),
            AbstractType::Boolean => "BIT".into(),
            AbstractType::String => sized("NVARCHAR", size, 4000),
            AbstractType::AnsiString => sized("VARCHAR", size, 8000),
            AbstractType::StringFixedLength => format!("NCHAR({})", size.clamp(1, 4000)),
            AbstractType::AnsiStringFixedLength => format!("CHAR({})", size.clamp(1, 8000)),
            AbstractType::Binary => sized("VARBINARY", size, 8000),
            AbstractType::Date => "DATE".into(),
            AbstractType::DateTime => "DATETIME".into(),
            AbstractType::DateTime2 => "DATETIME2".into(),
            AbstractType::DateTimeOffset => "DATETIMEOFFSET".into(),
            AbstractType::Time => "TIME".into(),
            AbstractType::Guid => "UNIQUEIDENTIFIER".into(),
            AbstractType::Xml => "XML".into(),
            other => return Err(SchemaError::unsupported_type(self.name(), other)),
        };
        Ok(native)
    }

    fn string_literal(&self, value: &str) -> String {
        format!("N{}", quote_literal(value))
    }

    fn default_expression(&self, marker: &DefaultValue) -> Result<String> {
        match marker {
            DefaultValue::CurrentDateTime => Ok("GETDATE()".into()),
            DefaultValue::CurrentUtcDateTime => Ok("GETUTCDATE()".into()),
            DefaultValue::CurrentDate => Ok("CAST(GETDATE() AS DATE)".into()),
            DefaultValue::NewGuid => Ok("NEWID()".into()),
            literal => self.format_default(literal),
        }
    }

    fn table_exists_statement(&self, table: &str) -> String {
        format!(
            "SELECT COUNT(*) FROM INFORMATION_SCHEMA.TABLES WHERE TABLE_TYPE = 'BASE TABLE' AND TABLE_NAME = {}",
            quote_literal(table)
        )
    }

    fn database_exists_statement(&self) -> Result<String> {
        let db = require_database(self.name(), &self.database)?;
        Ok(format!(
            "SELECT COUNT(*) FROM sys.databases WHERE name = {}",
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
            "SELECT COLUMN_NAME, IS_NULLABLE, CHARACTER_MAXIMUM_LENGTH FROM INFORMATION_SCHEMA.COLUMNS WHERE TABLE_NAME = {} ORDER BY ORDINAL_POSITION",
            quote_literal(table)
        )
    }

    fn index_names_statement(&self, table: &str) -> String {
        format!(
            "SELECT name FROM sys.indexes WHERE object_id = OBJECT_ID({}) AND name IS NOT NULL",
            quote_literal(&self.quote_ident(table))
        )
    }

    fn storage_clause(&self, space: &str) -> Option<String> {
        Some(format!("ON {}", self.quote_ident(space)))
    }

    fn add_column_keyword(&self) -> &str {
        "ADD"
    }

    fn rename_column_statement(&self, table: &TableDef, old: &str, new: &str) -> Result<String> {
        let target = format!("{}.{}", self.quote_ident(table.name()), self.quote_ident(old));
        Ok(format!(
            "EXEC sp_rename {}, {}, 'COLUMN'",
            quote_literal(&target),
            quote_literal(new)
        ))
    }

    fn alter_column_statement(&self, table: &TableDef, column: &ColumnDef) -> Result<Option<String>> {
        Ok(Some(format!(
            "ALTER TABLE {} ALTER COLUMN {} {} {}",
            self.quote_ident(table.name()),
            self.quote_ident(&column.name),
            self.map_type(column.data_type, column.size, column.scale)?,
            if column.allow_null { "NULL" } else { "NOT NULL" }
        )))
    }

    fn upsert_statement(&self, table: &TableDef) -> Result<String> {
        // MSSQL uses MERGE for upsert operations
        let pk = require_pk(table)?;
        let target_alias = "t";
        let source_alias = "s";

        let source_cols = table
            .columns()
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{} AS {}", self.param_placeholder(i + 1), self.quote_ident(&c.name)))
            .collect::<Vec<_>>()
            .join(", ");

        let join_condition = format!(
            "{}.{} = {}.{}",
            target_alias,
            self.quote_ident(&pk.name),
            source_alias,
            self.quote_ident(&pk.name)
        );

        let update_set = table
            .columns()
            .iter()
            .filter(|c| !c.is_primary_key())
            .map(|c| {
                format!(
                    "{}.{} = {}.{}",
                    target_alias,
                    self.quote_ident(&c.name),
                    source_alias,
                    self.quote_ident(&c.name)
                )
            })
            .collect::<Vec<_>>();

        let insert_cols = table
            .columns()
            .iter()
            .map(|c| self.quote_ident(&c.name))
            .collect::<Vec<_>>()
            .join(", ");
        let insert_vals = table
            .columns()
            .iter()
            .map(|c| format!("{}.{}", source_alias, self.quote_ident(&c.name)))
            .collect::<Vec<_>>()
            .join(", ");

        let mut sql = format!(
            "MERGE {} AS {} USING (SELECT {}) AS {} ON {}",
            self.quote_ident(table.name()),
            target_alias,
            source_cols,
            source_alias,
            join_condition
        );

        // WHEN MATCHED - UPDATE (only if there are non-PK columns)
        if !update_set.is_empty() {
            sql.push_str(&format!(" WHEN MATCHED THEN UPDATE SET {}", update_set.join(", ")));
        }

        sql.push_str(&format!(
            " WHEN NOT MATCHED THEN INSERT ({}) VALUES ({})",
            insert_cols, insert_vals
        ));

        // MSSQL MERGE requires semicolon terminator
        sql.push(';');
        Ok(sql)
    }
}

/// `TYPE(n)`, or `TYPE(MAX)` when unsized or beyond the in-row limit.
fn sized(base: &str, size: u32, limit: u32) -> String {
    if size == 0 || size > limit {
        format!("{}(MAX)", base)
    } else {
        format!("{}({})", base, size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::builder::TableBuilder;

    fn dialect() -> MssqlDialect {
        MssqlDialect::new(Some("app".into()))
    }

    fn users() -> TableDef {
        TableBuilder::new("Users")
            .pk_column("Id", AbstractType::Int32)
            .column(ColumnDef::new("Name", AbstractType::String).size(100).not_null())
            .column(ColumnDef::new("Email", AbstractType::AnsiString).default_value("none"))
            .audit_columns()
            .data_space("PRIMARY")
            .build()
            .unwrap()
    }

    #[test]
    fn test_quote_ident() {
        let d = dialect();
        assert_eq!(d.quote_ident("Users"), "[Users]");
        assert_eq!(d.quote_ident("odd]name"), "[odd]]name]");
    }

    #[test]
    fn test_param_placeholder() {
        assert_eq!(dialect().param_placeholder(1), "@P1");
        assert_eq!(dialect().param_placeholder(10), "@P10");
    }

    #[test]
    fn test_map_type() {
        let d = dialect();
        assert_eq!(d.map_type(AbstractType::String, 50, 0).unwrap(), "NVARCHAR(50)");
        assert_eq!(d.map_type(AbstractType::String, 0, 0).unwrap(), "NVARCHAR(MAX)");
        assert_eq!(d.map_type(AbstractType::String, 5000, 0).unwrap(), "NVARCHAR(MAX)");
        assert_eq!(d.map_type(AbstractType::AnsiString, 5000, 0).unwrap(), "VARCHAR(5000)");
        assert_eq!(d.map_type(AbstractType::Decimal, 18, 2).unwrap(), "DECIMAL(18,2)");
        assert_eq!(d.map_type(AbstractType::Guid, 0, 0).unwrap(), "UNIQUEIDENTIFIER");
        assert_eq!(d.map_type(AbstractType::Boolean, 0, 0).unwrap(), "BIT");
        assert!(d.map_type(AbstractType::Object, 0, 0).is_err());
    }

    #[test]
    fn test_create_table_statement() {
        let sql = dialect().create_table_statement(&users()).unwrap();
        assert!(sql.starts_with("CREATE TABLE [Users] (\n    [Id] INT NOT NULL,\n"));
        assert!(sql.contains("[Email] VARCHAR(MAX) DEFAULT N'none' NULL"));
        assert!(sql.contains("[created_on] DATETIME DEFAULT GETDATE() NOT NULL"));
        assert!(sql.contains("CONSTRAINT [PK_Users] PRIMARY KEY ([Id])"));
        assert!(sql.ends_with(") ON [PRIMARY]"));
    }

    #[test]
    fn test_add_and_rename_column() {
        let table = users();
        let d = dialect();
        assert_eq!(
            d.add_column_statement(&table, table.column("Name").unwrap()).unwrap(),
            "ALTER TABLE [Users] ADD [Name] NVARCHAR(100) NOT NULL"
        );
        assert_eq!(
            d.rename_column_statement(&table, "FullName", "Name").unwrap(),
            "EXEC sp_rename '[Users].[FullName]', 'Name', 'COLUMN'"
        );
        assert_eq!(
            d.alter_column_statement(&table, table.column("Name").unwrap())
                .unwrap()
                .unwrap(),
            "ALTER TABLE [Users] ALTER COLUMN [Name] NVARCHAR(100) NOT NULL"
        );
    }

    #[test]
    fn test_upsert_statement() {
        let sql = dialect().upsert_statement(&users()).unwrap();
        assert!(sql.starts_with("MERGE [Users] AS t USING (SELECT @P1 AS [Id], @P2 AS [Name]"));
        assert!(sql.contains("ON t.[Id] = s.[Id]"));
        assert!(sql.contains("WHEN MATCHED THEN UPDATE SET t.[Name] = s.[Name]"));
        assert!(sql.contains("WHEN NOT MATCHED THEN INSERT ([Id], [Name], [Email]"));
        assert!(sql.ends_with(';'));
    }

    #[test]
    fn test_upsert_pk_only() {
        let table = TableBuilder::new("IdTable")
            .pk_column("Id", AbstractType::Int32)
            .build()
            .unwrap();
        let sql = dialect().upsert_statement(&table).unwrap();
        assert!(!sql.contains("WHEN MATCHED"));
        assert!(sql.contains("WHEN NOT MATCHED THEN INSERT ([Id]) VALUES (s.[Id])"));
    }

    #[test]
    fn test_probes() {
        let d = dialect();
        assert_eq!(
            d.database_exists_statement().unwrap(),
            "SELECT COUNT(*) FROM sys.databases WHERE name = 'app'"
        );
        assert_eq!(
            d.index_names_statement("Users"),
            "SELECT name FROM sys.indexes WHERE object_id = OBJECT_ID('[Users]') AND name IS NOT NULL"
        );
    }
}
