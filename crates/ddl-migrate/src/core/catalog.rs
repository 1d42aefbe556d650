//! The set of tables provisioned together.
//!
//! A [`TableCatalog`] owns immutable, shared table definitions and derives the
//! foreign-key dependency order the orchestrator provisions them in.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::error::{Result, SchemaError};

use super::schema::TableDef;

/// Ordered collection of table definitions.
#[derive(Debug, Clone, Default)]
pub struct TableCatalog {
    tables: Vec<Arc<TableDef>>,
}

impl TableCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table. Table names are unique (case-insensitive).
    pub fn add(&mut self, table: TableDef) -> Result<()> {
        if self.get(table.name()).is_some() {
            return Err(SchemaError::Config(format!(
                "Table {} is declared twice",
                table.name()
            )));
        }
        self.tables.push(Arc::new(table));
        Ok(())
    }

    /// Builder-style [`add`](Self::add).
    pub fn with(mut self, table: TableDef) -> Result<Self> {
        self.add(table)?;
        Ok(self)
    }

    /// Tables in declaration order.
    pub fn tables(&self) -> &[Arc<TableDef>] {
        &self.tables
    }

    /// Look up a table by case-insensitive name.
    pub fn get(&self, name: &str) -> Option<&Arc<TableDef>> {
        self.tables
            .iter()
            .find(|t| t.name().eq_ignore_ascii_case(name))
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Check that every foreign key targets the primary key of a catalog table.
    pub fn validate_references(&self) -> Result<()> {
        for table in &self.tables {
            for (col, reference) in table.foreign_keys() {
                let dangling = |reason: &str| SchemaError::DanglingReference {
                    table: table.name().to_string(),
                    column: col.name.clone(),
                    target: reference.to_string(),
                    reason: reason.to_string(),
                };

                let target = self
                    .get(&reference.table)
                    .ok_or_else(|| dangling("is not a table in the catalog"))?;
                match target.primary_key() {
                    Some(pk) if pk.is_named(&reference.column) => {}
                    Some(_) => return Err(dangling("is not the primary key of that table")),
                    None => return Err(dangling("names a table without a primary key")),
                }
            }
        }
        Ok(())
    }

    /// Tables ordered so that every referenced table precedes the tables
    /// referencing it.
    ///
    /// Self-references add no edge. Among tables with no constraint between
    /// them, declaration order is kept. Fails with `DanglingReference` or
    /// `SchemaCycle` before anything is executed.
    pub fn dependency_order(&self) -> Result<Vec<Arc<TableDef>>> {
        self.validate_references()?;

        let index: HashMap<String, usize> = self
            .tables
            .iter()
            .enumerate()
            .map(|(i, t)| (t.name().to_ascii_lowercase(), i))
            .collect();

        // dependents[i] = tables referencing table i; pending[i] = unmet references
        let n = self.tables.len();
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut pending = vec![0usize; n];
        for (i, table) in self.tables.iter().enumerate() {
            let mut seen = Vec::new();
            for (_, reference) in table.foreign_keys() {
                let Some(&target) = index.get(&reference.table.to_ascii_lowercase()) else {
                    continue;
                };
                if target == i || seen.contains(&target) {
                    continue;
                }
                seen.push(target);
                dependents[target].push(i);
                pending[i] += 1;
            }
        }

        // Kahn's algorithm, always taking the lowest declaration index ready
        let mut ready: BTreeSet<usize> = (0..n).filter(|&i| pending[i] == 0).collect();
        let mut order = Vec::with_capacity(n);
        while let Some(next) = ready.pop_first() {
            order.push(next);
            for &dep in &dependents[next] {
                pending[dep] -= 1;
                if pending[dep] == 0 {
                    ready.insert(dep);
                }
            }
        }

        if order.len() < n {
            // Stuck tables include those that only depend on a cycle.
            let tables = (0..n)
                .filter(|&i| pending[i] > 0 && on_cycle(&dependents, i))
                .map(|i| self.tables[i].name().to_string())
                .collect();
            return Err(SchemaError::SchemaCycle { tables });
        }

        Ok(order.into_iter().map(|i| self.tables[i].clone()).collect())
    }

    /// SHA-256 of the serialized catalog, hex encoded.
    pub fn fingerprint(&self) -> Result<String> {
        let tables: Vec<&TableDef> = self.tables.iter().map(Arc::as_ref).collect();
        let json = serde_json::to_vec(&tables)?;
        Ok(hex::encode(Sha256::digest(&json)))
    }
}

/// Whether `start` can reach itself through referencing tables.
fn on_cycle(dependents: &[Vec<usize>], start: usize) -> bool {
    let mut visited = vec![false; dependents.len()];
    let mut stack = dependents[start].clone();
    while let Some(i) = stack.pop() {
        if i == start {
            return true;
        }
        if !std::mem::replace(&mut visited[i], true) {
            stack.extend(&dependents[i]);
        }
    }
    false
}
