//! Schema version bookkeeping.
//!
//! The orchestrator records, per table and per column, the version it last
//! provisioned and (for tables) the seed-data version it last applied. These
//! records decide whether a rename is followed by an alteration and whether
//! seed rows are re-applied.
//!
//! # Design Pattern
//!
//! Strategy: the orchestrator works with `&mut dyn VersionStore`.
//!
//! - [`DbVersionStore`]: a bookkeeping table inside the target database
//! - [`InMemoryVersionStore`]: process-local, for tests and dry runs

mod db;
mod memory;

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::schema::TableDef;
use crate::core::traits::{Dialect, Executor};
use crate::error::{Result, SchemaError};

pub use db::{DbVersionStore, DEFAULT_VERSION_TABLE};
pub use memory::InMemoryVersionStore;

/// Kind of object a version record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectType {
    Table,
    Column,
}

impl ObjectType {
    /// Stored name.
    pub fn as_str(self) -> &'static str {
        match self {
            ObjectType::Table => "table",
            ObjectType::Column => "column",
        }
    }

    /// Parse a stored name.
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "table" => Ok(ObjectType::Table),
            "column" => Ok(ObjectType::Column),
            other => Err(SchemaError::Config(format!(
                "Unknown version record type '{}'",
                other
            ))),
        }
    }
}

/// One bookkeeping row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionRecord {
    /// `table` or `table.column`.
    pub object_name: String,

    pub object_type: ObjectType,

    /// Provisioned table or column version.
    pub version: u32,

    /// Applied seed-data version (tables only, 0 when none applied).
    pub data_version: u32,

    /// When the record last changed, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_on: Option<DateTime<Utc>>,
}

impl VersionRecord {
    /// Record for a table.
    pub fn table(name: &str, version: u32, data_version: u32) -> Self {
        Self {
            object_name: name.to_string(),
            object_type: ObjectType::Table,
            version,
            data_version,
            updated_on: None,
        }
    }

    /// Record for a column of a table.
    pub fn column(table: &str, column: &str, version: u32) -> Self {
        Self {
            object_name: column_key(table, column),
            object_type: ObjectType::Column,
            version,
            data_version: 0,
            updated_on: None,
        }
    }

    /// Whether two records carry the same versions.
    pub fn same_versions(&self, other: &VersionRecord) -> bool {
        self.object_type == other.object_type
            && self.version == other.version
            && self.data_version == other.data_version
    }
}

/// Object name of a column record.
pub fn column_key(table: &str, column: &str) -> String {
    format!("{}.{}", table, column)
}

/// Loaded records, keyed by lower-cased object name.
#[derive(Debug, Clone, Default)]
pub struct VersionMap {
    records: HashMap<String, VersionRecord>,
}

impl VersionMap {
    /// Build a map from records; later duplicates win.
    pub fn from_records(records: impl IntoIterator<Item = VersionRecord>) -> Self {
        let records = records
            .into_iter()
            .map(|r| (r.object_name.to_lowercase(), r))
            .collect();
        Self { records }
    }

    /// Look up a record by object name (case-insensitive).
    pub fn get(&self, object_name: &str) -> Option<&VersionRecord> {
        self.records.get(&object_name.to_lowercase())
    }

    /// Record of a table.
    pub fn table(&self, table: &str) -> Option<&VersionRecord> {
        self.get(table)
    }

    /// Record of a column.
    pub fn column(&self, table: &str, column: &str) -> Option<&VersionRecord> {
        self.get(&column_key(table, column))
    }

    /// Insert or replace a record.
    pub fn insert(&mut self, record: VersionRecord) {
        self.records.insert(record.object_name.to_lowercase(), record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records, in no particular order.
    pub fn records(&self) -> impl Iterator<Item = &VersionRecord> {
        self.records.values()
    }
}

/// Persistence for version records.
///
/// Stores take the run's executor and dialect on every call so a store can
/// live inside the database it describes.
pub trait VersionStore {
    /// Bookkeeping table the orchestrator must provision before `load`,
    /// or `None` for stores that keep records elsewhere.
    fn table(&self) -> Option<&TableDef>;

    /// Load all records.
    fn load(&mut self, exec: &mut dyn Executor, dialect: &dyn Dialect) -> Result<VersionMap>;

    /// Insert or update one record.
    fn save(
        &mut self,
        exec: &mut dyn Executor,
        dialect: &dyn Dialect,
        record: &VersionRecord,
    ) -> Result<()>;
}

impl<S: VersionStore + ?Sized> VersionStore for &mut S {
    fn table(&self) -> Option<&TableDef> {
        (**self).table()
    }

    fn load(&mut self, exec: &mut dyn Executor, dialect: &dyn Dialect) -> Result<VersionMap> {
        (**self).load(exec, dialect)
    }

    fn save(
        &mut self,
        exec: &mut dyn Executor,
        dialect: &dyn Dialect,
        record: &VersionRecord,
    ) -> Result<()> {
        (**self).save(exec, dialect, record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_type_parse() {
        assert_eq!(ObjectType::parse("TABLE").unwrap(), ObjectType::Table);
        assert_eq!(ObjectType::parse("column").unwrap(), ObjectType::Column);
        assert!(ObjectType::parse("index").is_err());
    }

    #[test]
    fn test_version_map_is_case_insensitive() {
        let map = VersionMap::from_records(vec![
            VersionRecord::table("IM_User", 2, 1),
            VersionRecord::column("IM_User", "Name", 3),
        ]);
        assert_eq!(map.len(), 2);
        assert_eq!(map.table("im_user").unwrap().version, 2);
        assert_eq!(map.column("im_user", "NAME").unwrap().version, 3);
        assert!(map.column("im_user", "id").is_none());
    }

    #[test]
    fn test_same_versions_ignores_timestamp() {
        let mut a = VersionRecord::table("t", 1, 1);
        let b = VersionRecord::table("t", 1, 1);
        a.updated_on = Some(Utc::now());
        assert!(a.same_versions(&b));
        assert!(!a.same_versions(&VersionRecord::table("t", 1, 2)));
    }
}
