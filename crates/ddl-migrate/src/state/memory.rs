//! Process-local version store.

use chrono::Utc;

use super::{VersionMap, VersionRecord, VersionStore};
use crate::core::schema::TableDef;
use crate::core::traits::{Dialect, Executor};
use crate::error::Result;

/// Version store kept in memory.
///
/// Nothing is written to the target database, so every run against a fresh
/// store treats existing tables as never recorded.
#[derive(Debug, Clone, Default)]
pub struct InMemoryVersionStore {
    records: VersionMap,
    writes: usize,
}

impl InMemoryVersionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate a record.
    pub fn with_record(mut self, record: VersionRecord) -> Self {
        self.records.insert(record);
        self
    }

    /// Current records.
    pub fn records(&self) -> &VersionMap {
        &self.records
    }

    /// Number of `save` calls so far.
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl VersionStore for InMemoryVersionStore {
    fn table(&self) -> Option<&TableDef> {
        None
    }

    fn load(&mut self, _exec: &mut dyn Executor, _dialect: &dyn Dialect) -> Result<VersionMap> {
        Ok(self.records.clone())
    }

    fn save(
        &mut self,
        _exec: &mut dyn Executor,
        _dialect: &dyn Dialect,
        record: &VersionRecord,
    ) -> Result<()> {
        let mut record = record.clone();
        record.updated_on = Some(Utc::now());
        self.records.insert(record);
        self.writes += 1;
        Ok(())
    }
}
