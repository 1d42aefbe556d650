//! Column, index and table definitions.
//!
//! A [`TableDef`] is produced once by [`TableBuilder`](super::builder::TableBuilder)
//! and never changes afterwards; it has read accessors only. [`ColumnDef`] is
//! a plain value with chainable setters so declarations read top to bottom.

use serde::Serialize;

use super::identifier::constraint_name;
use super::types::{AbstractType, DefaultValue};
use super::value::SqlValue;

/// Names of the standard audit columns, in the order they are appended.
pub const AUDIT_COLUMNS: [&str; 4] = ["created_by", "created_on", "updated_by", "updated_on"];

/// Foreign-key target parsed from a `table:column` descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Reference {
    /// Referenced table.
    pub table: String,
    /// Referenced column (must be that table's primary key).
    pub column: String,
}

impl Reference {
    /// Parse a `table:column` descriptor.
    ///
    /// Parsing never fails; an empty part is rejected when the table is built.
    pub fn parse(descriptor: &str) -> Self {
        match descriptor.split_once(':') {
            Some((table, column)) => Self {
                table: table.trim().to_string(),
                column: column.trim().to_string(),
            },
            None => Self {
                table: descriptor.trim().to_string(),
                column: String::new(),
            },
        }
    }
}

impl std::fmt::Display for Reference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.table, self.column)
    }
}

/// One column declaration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnDef {
    /// Column name (unique within its table, case-insensitive).
    pub name: String,

    /// Engine-independent type.
    pub data_type: AbstractType,

    /// Character length or numeric precision; 0 means unbounded / engine default.
    pub size: u32,

    /// Digits after the decimal point.
    pub scale: u32,

    /// Whether NULL is allowed.
    pub allow_null: bool,

    /// Default value.
    pub default_value: Option<DefaultValue>,

    /// Inline UNIQUE constraint.
    pub is_unique: bool,

    /// Single-column index created alongside the table.
    pub is_index: bool,

    /// Column definition version.
    pub version: u32,

    /// Previous names, newest first.
    pub old_names: Vec<String>,

    /// Foreign-key target.
    pub reference: Option<Reference>,

    /// Free-form documentation.
    pub comments: Option<String>,

    pub(crate) is_primary_key: bool,
}

impl ColumnDef {
    /// A nullable column of the given type, version 1.
    pub fn new(name: impl Into<String>, data_type: AbstractType) -> Self {
        Self {
            name: name.into(),
            data_type,
            size: 0,
            scale: 0,
            allow_null: true,
            default_value: None,
            is_unique: false,
            is_index: false,
            version: 1,
            old_names: Vec::new(),
            reference: None,
            comments: None,
            is_primary_key: false,
        }
    }

    pub fn size(mut self, size: u32) -> Self {
        self.size = size;
        self
    }

    /// Set precision and scale for exact numerics.
    pub fn precision(mut self, precision: u32, scale: u32) -> Self {
        self.size = precision;
        self.scale = scale;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.allow_null = false;
        self
    }

    pub fn nullable(mut self, allow_null: bool) -> Self {
        self.allow_null = allow_null;
        self
    }

    pub fn default_value(mut self, value: impl Into<DefaultValue>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn unique(mut self) -> Self {
        self.is_unique = true;
        self
    }

    pub fn indexed(mut self) -> Self {
        self.is_index = true;
        self
    }

    pub fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Record previous names, newest first.
    pub fn old_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.old_names = names.into_iter().map(Into::into).collect();
        self
    }

    /// Reference another table's primary key with a `table:column` descriptor.
    pub fn references(mut self, descriptor: &str) -> Self {
        self.reference = Some(Reference::parse(descriptor));
        self
    }

    pub fn comments(mut self, comments: impl Into<String>) -> Self {
        self.comments = Some(comments.into());
        self
    }

    /// Whether this is the table's primary key.
    pub fn is_primary_key(&self) -> bool {
        self.is_primary_key
    }

    /// Case-insensitive name comparison.
    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

/// Named index over one or more columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexDef {
    /// Index name.
    pub name: String,
    /// Indexed columns, in key order.
    pub columns: Vec<String>,
    /// Whether the index enforces uniqueness.
    pub is_unique: bool,
}

/// A table definition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableDef {
    pub(crate) name: String,
    pub(crate) category: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) data_space: Option<String>,
    pub(crate) index_space: Option<String>,
    pub(crate) version: u32,
    pub(crate) module: Option<String>,
    pub(crate) columns: Vec<ColumnDef>,
    pub(crate) indexes: Vec<IndexDef>,
    pub(crate) seed_rows: Vec<Vec<SqlValue>>,
    pub(crate) data_version: u32,
}

impl TableDef {
    /// Physical table name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Logical grouping.
    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Tablespace / filegroup for table data.
    pub fn data_space(&self) -> Option<&str> {
        self.data_space.as_deref()
    }

    /// Tablespace / filegroup for indexes.
    pub fn index_space(&self) -> Option<&str> {
        self.index_space.as_deref()
    }

    /// Table definition version.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Business module, for reporting.
    pub fn module(&self) -> Option<&str> {
        self.module.as_deref()
    }

    /// Columns in declaration order (primary key first).
    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    /// Explicitly declared composite indexes.
    pub fn indexes(&self) -> &[IndexDef] {
        &self.indexes
    }

    /// Seed rows, positionally aligned with [`columns`](Self::columns).
    pub fn seed_rows(&self) -> &[Vec<SqlValue>] {
        &self.seed_rows
    }

    /// Version of the seed row set.
    pub fn data_version(&self) -> u32 {
        self.data_version
    }

    /// Look up a column by case-insensitive name.
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.is_named(name))
    }

    /// The primary key column, always at position 0 when present.
    pub fn primary_key(&self) -> Option<&ColumnDef> {
        self.columns.first().filter(|c| c.is_primary_key)
    }

    /// Columns carrying a foreign-key reference.
    pub fn foreign_keys(&self) -> impl Iterator<Item = (&ColumnDef, &Reference)> {
        self.columns
            .iter()
            .filter_map(|c| c.reference.as_ref().map(|r| (c, r)))
    }

    /// The standard audit columns present on this table.
    pub fn audit_columns(&self) -> Vec<&ColumnDef> {
        AUDIT_COLUMNS
            .iter()
            .filter_map(|name| self.column(name))
            .collect()
    }

    /// Composite indexes followed by one generated index per `is_index` column.
    pub fn indexes_to_create(&self) -> Vec<IndexDef> {
        let mut result = self.indexes.clone();
        for col in self.columns.iter().filter(|c| c.is_index) {
            let name = constraint_name("IX", &self.name, &[col.name.as_str()]);
            if result.iter().any(|i| i.name.eq_ignore_ascii_case(&name)) {
                continue;
            }
            result.push(IndexDef {
                name,
                columns: vec![col.name.clone()],
                is_unique: false,
            });
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::builder::TableBuilder;

    #[test]
    fn test_reference_parse() {
        let r = Reference::parse("im_user:id");
        assert_eq!(r.table, "im_user");
        assert_eq!(r.column, "id");
        assert_eq!(r.to_string(), "im_user:id");

        let r = Reference::parse("im_user");
        assert_eq!(r.table, "im_user");
        assert!(r.column.is_empty());
    }

    #[test]
    fn test_column_def_setters() {
        let col = ColumnDef::new("price", AbstractType::Decimal)
            .precision(18, 4)
            .not_null()
            .default_value(0)
            .version(3)
            .old_names(["cost", "amount"]);

        assert_eq!(col.size, 18);
        assert_eq!(col.scale, 4);
        assert!(!col.allow_null);
        assert_eq!(col.default_value, Some(DefaultValue::Integer(0)));
        assert_eq!(col.version, 3);
        assert_eq!(col.old_names, vec!["cost", "amount"]);
        assert!(!col.is_primary_key());
        assert!(col.is_named("PRICE"));
    }

    #[test]
    fn test_derived_properties() {
        let table = TableBuilder::new("im_user_pref")
            .pk_column("id", AbstractType::Int32)
            .column(ColumnDef::new("user_id", AbstractType::Int32).references("im_user:id"))
            .column(ColumnDef::new("pref_key", AbstractType::String).size(50).indexed())
            .audit_columns()
            .build()
            .unwrap();

        assert_eq!(table.primary_key().map(|c| c.name.as_str()), Some("id"));
        let fks: Vec<_> = table
            .foreign_keys()
            .map(|(c, r)| (c.name.clone(), r.table.clone()))
            .collect();
        assert_eq!(fks, vec![("user_id".to_string(), "im_user".to_string())]);
        assert_eq!(table.audit_columns().len(), 4);
        assert!(table.column("PREF_KEY").is_some());

        let indexes = table.indexes_to_create();
        assert_eq!(indexes.len(), 1);
        assert_eq!(indexes[0].name, "IX_im_user_pref_pref_key");
    }
}
