//! Core traits for SQL generation and statement execution.
//!
//! - [`Dialect`]: DDL, probe and seed statement generation for one engine family
//! - [`Executor`]: runs generated statements against a live connection
//!
//! # Design Patterns
//!
//! - **Strategy**: each dialect is an interchangeable implementation of [`Dialect`]
//! - **Template Method**: statement assembly (`create_table_statement`,
//!   `column_definition`, ...) is written once as default methods in terms of
//!   the small per-engine primitives (`quote_ident`, `map_type`, ...)

use crate::error::{Result, SchemaError};

use super::identifier::{constraint_name, quote_literal};
use super::schema::{ColumnDef, IndexDef, Reference, TableDef};
use super::types::{format_float, AbstractType, DefaultValue};
use super::value::SqlValue;

/// SQL generation strategy for one database engine family.
///
/// A dialect instance is bound to one resolved connection (it knows the
/// database name for database-level probes) and is otherwise stateless: every
/// method is a pure function of its arguments.
pub trait Dialect: Send + Sync {
    /// Get the dialect identifier (e.g., "mssql", "postgres").
    fn name(&self) -> &str;

    /// Quote an identifier (table name, column name, etc.).
    fn quote_ident(&self, name: &str) -> String;

    /// Get a parameter placeholder for the given 1-based index.
    fn param_placeholder(&self, index: usize) -> String;

    /// Map an abstract type to the native type string.
    ///
    /// Fails with `UnsupportedType` when the engine has no mapping.
    fn map_type(&self, data_type: AbstractType, size: u32, scale: u32) -> Result<String>;

    /// Server-side expression for a reserved default marker.
    fn default_expression(&self, marker: &DefaultValue) -> Result<String>;

    /// Render a string literal.
    fn string_literal(&self, value: &str) -> String {
        quote_literal(value)
    }

    /// Render a boolean literal.
    fn bool_literal(&self, value: bool) -> String {
        if value { "1" } else { "0" }.to_string()
    }

    /// Render a default value for a DEFAULT clause.
    fn format_default(&self, value: &DefaultValue) -> Result<String> {
        match value {
            DefaultValue::Text(s) => Ok(self.string_literal(s)),
            DefaultValue::Integer(v) => Ok(v.to_string()),
            DefaultValue::Decimal(v) => Ok(v.to_string()),
            DefaultValue::Float(v) => Ok(format_float(*v)),
            DefaultValue::Boolean(v) => Ok(self.bool_literal(*v)),
            marker => self.default_expression(marker),
        }
    }

    // ===== Probes =====

    /// COUNT(*) probe for a table in the connected database.
    fn table_exists_statement(&self, table: &str) -> String;

    /// COUNT(*) probe for the connected database itself.
    fn database_exists_statement(&self) -> Result<String>;

    /// Whether the engine can create the target database over a connection.
    fn can_create_database(&self) -> bool;

    /// Statement creating the target database.
    fn create_database_statement(&self) -> Result<String>;

    /// Query listing the live columns of a table, one row each:
    /// name, nullability (`YES`/`Y` or a truthy number) and character length
    /// (NULL when not a character column, -1 for unbounded).
    fn column_names_statement(&self, table: &str) -> String;

    /// Query listing live index names of a table (one per row, first column).
    fn index_names_statement(&self, table: &str) -> String;

    // ===== DDL =====

    /// Storage clause for a tablespace / filegroup hint, if the engine has one.
    fn storage_clause(&self, _space: &str) -> Option<String> {
        None
    }

    /// Keyword used by `ALTER TABLE` to add a column.
    fn add_column_keyword(&self) -> &str {
        "ADD COLUMN"
    }

    /// Column definition: `name type [DEFAULT x] NULL|NOT NULL [UNIQUE]`.
    fn column_definition(&self, column: &ColumnDef) -> Result<String> {
        let mut def = format!(
            "{} {}",
            self.quote_ident(&column.name),
            self.map_type(column.data_type, column.size, column.scale)?
        );
        if let Some(default) = &column.default_value {
            def.push_str(" DEFAULT ");
            def.push_str(&self.format_default(default)?);
        }
        def.push_str(if column.allow_null { " NULL" } else { " NOT NULL" });
        if column.is_unique && !column.is_primary_key() {
            def.push_str(" UNIQUE");
        }
        Ok(def)
    }

    /// Named foreign-key table constraint.
    fn foreign_key_constraint(
        &self,
        table: &TableDef,
        column: &ColumnDef,
        reference: &Reference,
    ) -> String {
        format!(
            "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
            self.quote_ident(&constraint_name("FK", table.name(), &[column.name.as_str()])),
            self.quote_ident(&column.name),
            self.quote_ident(&reference.table),
            self.quote_ident(&reference.column)
        )
    }

    /// CREATE TABLE with columns in table order, the primary key constraint
    /// and foreign-key constraints at the end.
    fn create_table_statement(&self, table: &TableDef) -> Result<String> {
        let mut parts = Vec::with_capacity(table.columns().len() + 2);
        for col in table.columns() {
            parts.push(format!("    {}", self.column_definition(col)?));
        }
        if let Some(pk) = table.primary_key() {
            parts.push(format!(
                "    CONSTRAINT {} PRIMARY KEY ({})",
                self.quote_ident(&constraint_name("PK", table.name(), &[])),
                self.quote_ident(&pk.name)
            ));
        }
        for (col, reference) in table.foreign_keys() {
            parts.push(format!(
                "    {}",
                self.foreign_key_constraint(table, col, reference)
            ));
        }

        let mut sql = format!(
            "CREATE TABLE {} (\n{}\n)",
            self.quote_ident(table.name()),
            parts.join(",\n")
        );
        if let Some(clause) = table.data_space().and_then(|s| self.storage_clause(s)) {
            sql.push(' ');
            sql.push_str(&clause);
        }
        Ok(sql)
    }

    /// ALTER TABLE ... ADD a column, with an inline REFERENCES when it is a
    /// foreign key.
    fn add_column_statement(&self, table: &TableDef, column: &ColumnDef) -> Result<String> {
        let mut sql = format!(
            "ALTER TABLE {} {} {}",
            self.quote_ident(table.name()),
            self.add_column_keyword(),
            self.column_definition(column)?
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

    /// Rename a column in place.
    fn rename_column_statement(&self, table: &TableDef, old: &str, new: &str) -> Result<String> {
        Ok(format!(
            "ALTER TABLE {} RENAME COLUMN {} TO {}",
            self.quote_ident(table.name()),
            self.quote_ident(old),
            self.quote_ident(new)
        ))
    }

    /// Bring a renamed column's type and nullability in line with its
    /// declaration. `None` when the engine cannot alter columns in place.
    fn alter_column_statement(&self, table: &TableDef, column: &ColumnDef)
        -> Result<Option<String>>;

    /// CREATE [UNIQUE] INDEX.
    fn create_index_statement(&self, table: &TableDef, index: &IndexDef) -> Result<String> {
        let cols = index
            .columns
            .iter()
            .map(|c| self.quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ");
        let mut sql = format!(
            "CREATE {}INDEX {} ON {} ({})",
            if index.is_unique { "UNIQUE " } else { "" },
            self.quote_ident(&index.name),
            self.quote_ident(table.name()),
            cols
        );
        if let Some(clause) = table.index_space().and_then(|s| self.storage_clause(s)) {
            sql.push(' ');
            sql.push_str(&clause);
        }
        Ok(sql)
    }

    // ===== Seed data =====

    /// Insert-or-update keyed by the primary key, one placeholder per column
    /// in table order.
    fn upsert_statement(&self, table: &TableDef) -> Result<String>;
}

/// Quoted column list and placeholder list shared by the upsert builders.
pub(crate) fn insert_lists<D: Dialect + ?Sized>(dialect: &D, table: &TableDef) -> (String, String) {
    let cols = table
        .columns()
        .iter()
        .map(|c| dialect.quote_ident(&c.name))
        .collect::<Vec<_>>()
        .join(", ");
    let params = (1..=table.columns().len())
        .map(|i| dialect.param_placeholder(i))
        .collect::<Vec<_>>()
        .join(", ");
    (cols, params)
}

/// The primary key, or `MissingPrimaryKey`.
pub(crate) fn require_pk(table: &TableDef) -> Result<&ColumnDef> {
    table
        .primary_key()
        .ok_or_else(|| SchemaError::MissingPrimaryKey(table.name().to_string()))
}

/// Runs generated statements.
///
/// Implemented by callers over their driver of choice. A driver failure is
/// an `Err`; "no rows" is an empty result.
pub trait Executor {
    /// Execute a statement, returning the affected row count.
    fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<u64>;

    /// Run a query and return all rows.
    fn query(&mut self, sql: &str, params: &[SqlValue]) -> Result<Vec<Vec<SqlValue>>>;

    /// Run a query and return the first column of the first row.
    fn scalar(&mut self, sql: &str, params: &[SqlValue]) -> Result<Option<SqlValue>> {
        Ok(self
            .query(sql, params)?
            .into_iter()
            .next()
            .and_then(|row| row.into_iter().next()))
    }
}

impl<E: Executor + ?Sized> Executor for &mut E {
    fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<u64> {
        (**self).execute(sql, params)
    }

    fn query(&mut self, sql: &str, params: &[SqlValue]) -> Result<Vec<Vec<SqlValue>>> {
        (**self).query(sql, params)
    }

    fn scalar(&mut self, sql: &str, params: &[SqlValue]) -> Result<Option<SqlValue>> {
        (**self).scalar(sql, params)
    }
}
