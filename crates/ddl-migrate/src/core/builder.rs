//! Fluent table declaration.
//!
//! Each call consumes and returns the builder so a table reads as a single
//! chained expression. The first rule violation is remembered and returned by
//! [`TableBuilder::build`]; later calls are still accepted but ignored for
//! error reporting.
//!
//! ```rust
//! use ddl_migrate::{row, AbstractType, ColumnDef, TableBuilder};
//!
//! let table = TableBuilder::new("im_user")
//!     .pk_column("id", AbstractType::Int32)
//!     .column(ColumnDef::new("name", AbstractType::String).size(50).not_null())
//!     .data_version(1)
//!     .data(row![1, "admin"])
//!     .build()
//!     .unwrap();
//! assert_eq!(table.columns().len(), 2);
//! ```

use super::identifier::{constraint_name, validate_identifier};
use super::schema::{ColumnDef, IndexDef, TableDef, AUDIT_COLUMNS};
use super::types::{AbstractType, DefaultValue};
use super::value::SqlValue;
use crate::error::{Result, SchemaError};

/// Builder for [`TableDef`].
#[derive(Debug)]
pub struct TableBuilder {
    table: TableDef,
    error: Option<SchemaError>,
}

impl TableBuilder {
    /// Start a table with the given physical name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            table: TableDef {
                name: name.into(),
                category: None,
                description: None,
                data_space: None,
                index_space: None,
                version: 1,
                module: None,
                columns: Vec::new(),
                indexes: Vec::new(),
                seed_rows: Vec::new(),
                data_version: 0,
            },
            error: None,
        }
    }

    fn fail(&mut self, err: SchemaError) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.table.category = Some(category.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.table.description = Some(description.into());
        self
    }

    pub fn data_space(mut self, space: impl Into<String>) -> Self {
        self.table.data_space = Some(space.into());
        self
    }

    pub fn index_space(mut self, space: impl Into<String>) -> Self {
        self.table.index_space = Some(space.into());
        self
    }

    pub fn version(mut self, version: u32) -> Self {
        self.table.version = version;
        self
    }

    pub fn module(mut self, module: impl Into<String>) -> Self {
        self.table.module = Some(module.into());
        self
    }

    /// Declare the primary key column. Allowed once; always placed first.
    pub fn pk_column(self, name: impl Into<String>, data_type: AbstractType) -> Self {
        self.primary_key(ColumnDef::new(name, data_type))
    }

    /// Declare a fully specified primary key column (e.g. a sized string key).
    pub fn primary_key(mut self, mut column: ColumnDef) -> Self {
        if self.table.primary_key().is_some() {
            let table = self.table.name.clone();
            self.fail(SchemaError::DuplicatePrimaryKey { table });
            return self;
        }
        if self.has_column(&column.name) {
            let (table, column) = (self.table.name.clone(), column.name);
            self.fail(SchemaError::DuplicateColumn { table, column });
            return self;
        }
        column.is_primary_key = true;
        column.allow_null = false;
        self.table.columns.insert(0, column);
        self
    }

    /// Append a column.
    pub fn column(mut self, mut column: ColumnDef) -> Self {
        if self.has_column(&column.name) {
            let (table, column) = (self.table.name.clone(), column.name);
            self.fail(SchemaError::DuplicateColumn { table, column });
            return self;
        }
        column.is_primary_key = false;
        self.table.columns.push(column);
        self
    }

    /// Append a nullable column with default settings.
    pub fn add_column(self, name: impl Into<String>, data_type: AbstractType) -> Self {
        self.column(ColumnDef::new(name, data_type))
    }

    /// Append `created_by`, `created_on`, `updated_by` and `updated_on`.
    ///
    /// Audit columns already declared by hand are kept as they are; only the
    /// missing ones are appended.
    pub fn audit_columns(self) -> Self {
        let block = [
            ColumnDef::new(AUDIT_COLUMNS[0], AbstractType::String).size(50).not_null(),
            ColumnDef::new(AUDIT_COLUMNS[1], AbstractType::DateTime)
                .not_null()
                .default_value(DefaultValue::CurrentDateTime),
            ColumnDef::new(AUDIT_COLUMNS[2], AbstractType::String).size(50),
            ColumnDef::new(AUDIT_COLUMNS[3], AbstractType::DateTime),
        ];
        block.into_iter().fold(self, |builder, column| {
            if builder.has_column(&column.name) {
                builder
            } else {
                builder.column(column)
            }
        })
    }

    /// Declare a composite index. An empty `name` generates `IX_<table>_<cols>`.
    pub fn index(self, columns: &[&str], name: &str) -> Self {
        self.add_index(columns, name, false)
    }

    /// Declare a composite unique index.
    pub fn unique_index(self, columns: &[&str], name: &str) -> Self {
        self.add_index(columns, name, true)
    }

    fn add_index(mut self, columns: &[&str], name: &str, is_unique: bool) -> Self {
        let index_name = if name.is_empty() {
            constraint_name("IX", &self.table.name, columns)
        } else {
            name.to_string()
        };

        if columns.is_empty() {
            self.fail(SchemaError::Config(format!(
                "Table {}: index '{}' has no columns",
                self.table.name, index_name
            )));
            return self;
        }

        let mut resolved = Vec::with_capacity(columns.len());
        for col in columns {
            match self.table.column(col) {
                Some(c) => resolved.push(c.name.clone()),
                None => {
                    let err = SchemaError::UnknownColumn {
                        table: self.table.name.clone(),
                        index: index_name,
                        column: col.to_string(),
                    };
                    self.fail(err);
                    return self;
                }
            }
        }

        if self
            .table
            .indexes
            .iter()
            .any(|i| i.name.eq_ignore_ascii_case(&index_name))
        {
            self.fail(SchemaError::Config(format!(
                "Table {}: index '{}' is declared twice",
                self.table.name, index_name
            )));
            return self;
        }

        self.table.indexes.push(IndexDef {
            name: index_name,
            columns: resolved,
            is_unique,
        });
        self
    }

    /// Append one seed row, positionally aligned with the final column list.
    pub fn data(mut self, row: Vec<SqlValue>) -> Self {
        self.table.seed_rows.push(row);
        self
    }

    /// Version of the seed row set; rows are re-applied when it increases.
    pub fn data_version(mut self, version: u32) -> Self {
        self.table.data_version = version;
        self
    }

    fn has_column(&self, name: &str) -> bool {
        self.table.column(name).is_some()
    }

    /// Validate and return the immutable table.
    pub fn build(self) -> Result<TableDef> {
        if let Some(err) = self.error {
            return Err(err);
        }
        let mut table = self.table;

        validate_identifier(&table.name)?;
        if table.columns.is_empty() {
            return Err(SchemaError::Config(format!(
                "Table {} declares no columns",
                table.name
            )));
        }

        for col in &table.columns {
            validate_identifier(&col.name)?;
            for old in &col.old_names {
                validate_identifier(old)?;
                if table.column(old).is_some() {
                    return Err(SchemaError::Config(format!(
                        "Table {}: old name '{}' of column '{}' is still a declared column",
                        table.name, old, col.name
                    )));
                }
            }
            if let Some(r) = &col.reference {
                if r.table.is_empty() || r.column.is_empty() {
                    return Err(SchemaError::Config(format!(
                        "Table {}: column '{}' reference '{}' must be table:column",
                        table.name, col.name, r
                    )));
                }
                validate_identifier(&r.table)?;
                validate_identifier(&r.column)?;
            }
        }
        for idx in &table.indexes {
            validate_identifier(&idx.name)?;
        }

        if !table.seed_rows.is_empty() && table.primary_key().is_none() {
            return Err(SchemaError::MissingPrimaryKey(table.name));
        }
        let expected = table.columns.len();
        for (i, row) in table.seed_rows.iter().enumerate() {
            if row.len() != expected {
                return Err(SchemaError::ArityMismatch {
                    table: table.name.clone(),
                    row: i,
                    expected,
                    actual: row.len(),
                });
            }
        }

        // Rows declared without a data version are still applied once.
        if !table.seed_rows.is_empty() && table.data_version == 0 {
            table.data_version = 1;
        }

        Ok(table)
    }
}
