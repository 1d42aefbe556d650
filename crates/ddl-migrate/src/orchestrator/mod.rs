//! Schema orchestrator - provisioning and upgrade workflow coordinator.
//!
//! A run walks the catalog in foreign-key dependency order and, per table,
//! either creates it or diffs it against the live database, then applies
//! seed data and records versions.
//!
//! Configuration, reference and type-mapping errors are raised before any
//! statement is sent. A failing statement aborts the rest of the run;
//! tables provisioned earlier in the run are not rolled back.

pub mod diff;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::core::catalog::TableCatalog;
use crate::core::connection::ConnectionResolver;
use crate::core::provider::DialectProvider;
use crate::core::schema::TableDef;
use crate::core::traits::{Dialect, Executor};
use crate::core::value::SqlValue;
use crate::error::{Result, SchemaError};
use crate::state::{DbVersionStore, VersionMap, VersionRecord, VersionStore, DEFAULT_VERSION_TABLE};

use diff::{plan_upgrade, ColumnChange, LiveColumn};

/// Run switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunOptions {
    /// Probe the target database and create it when absent.
    pub ensure_database: bool,
    /// Apply seed rows whose data version is newer than the recorded one.
    pub apply_seed_data: bool,
    /// Run probes but only record DDL and seed statements.
    pub dry_run: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            ensure_database: false,
            apply_seed_data: true,
            dry_run: false,
        }
    }
}

/// What a run did to one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TableOutcome {
    Created,
    Upgraded,
    Unchanged,
}

/// Per-table result.
#[derive(Debug, Clone, Serialize)]
pub struct TableReport {
    pub table: String,
    pub outcome: TableOutcome,
    /// DDL and seed statements, in emission order.
    pub statements: Vec<String>,
    /// Seed rows upserted (or, in a dry run, that would have been).
    pub seed_rows_applied: usize,
}

impl TableReport {
    fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            outcome: TableOutcome::Unchanged,
            statements: Vec::new(),
            seed_rows_applied: 0,
        }
    }
}

/// Result of a schema run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Unique run identifier.
    pub run_id: String,

    /// Dialect the run generated SQL for.
    pub dialect: String,

    /// SHA-256 fingerprint of the catalog.
    pub fingerprint: String,

    pub dry_run: bool,

    /// Whether the target database was created.
    pub database_created: bool,

    /// Bookkeeping table provisioning, when the store keeps one.
    pub version_table: Option<TableReport>,

    /// Application tables, in provisioning order.
    pub tables: Vec<TableReport>,

    /// Version records written.
    pub version_writes: usize,

    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl RunReport {
    /// Report for a table (case-insensitive).
    pub fn table(&self, name: &str) -> Option<&TableReport> {
        self.tables
            .iter()
            .find(|t| t.table.eq_ignore_ascii_case(name))
    }

    /// Every DDL and seed statement of the run, in order.
    pub fn statements(&self) -> impl Iterator<Item = &str> {
        self.version_table
            .iter()
            .chain(self.tables.iter())
            .flat_map(|t| t.statements.iter().map(String::as_str))
    }

    /// Tables with the given outcome.
    pub fn count(&self, outcome: TableOutcome) -> usize {
        self.tables.iter().filter(|t| t.outcome == outcome).count()
    }

    /// Convert to JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Schema orchestrator.
pub struct SchemaOrchestrator {
    catalog: TableCatalog,
    dialect: Arc<dyn Dialect>,
    options: RunOptions,
    version_table: String,
    cancel: Arc<AtomicBool>,
}

impl SchemaOrchestrator {
    /// Create an orchestrator for a catalog and a resolved dialect.
    pub fn new(catalog: TableCatalog, dialect: Arc<dyn Dialect>) -> Self {
        Self {
            catalog,
            dialect,
            options: RunOptions::default(),
            version_table: DEFAULT_VERSION_TABLE.to_string(),
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Build from configuration: catalog, options and the dialect of the
    /// default connection (or the named database).
    pub fn from_config(
        config: &Config,
        provider: &DialectProvider,
        database: Option<&str>,
    ) -> Result<Self> {
        let info = config.resolver().resolve(database)?;
        let dialect = provider.resolve_info(&info)?;
        Ok(Self::new(config.catalog()?, dialect)
            .with_options(config.run_options())
            .with_version_table(&config.schema.version_table))
    }

    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    /// Name of the bookkeeping table used by [`run`](Self::run).
    pub fn with_version_table(mut self, name: &str) -> Self {
        self.version_table = name.to_string();
        self
    }

    pub fn options(&self) -> RunOptions {
        self.options
    }

    pub fn catalog(&self) -> &TableCatalog {
        &self.catalog
    }

    pub fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    /// Flag that stops the run before the next table when set.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }

    /// Run with versions recorded in the bookkeeping table.
    pub fn run(&self, exec: &mut dyn Executor) -> Result<RunReport> {
        let mut store = DbVersionStore::new(&self.version_table)?;
        self.run_with_store(exec, &mut store)
    }

    /// Run with an explicit version store.
    pub fn run_with_store(
        &self,
        exec: &mut dyn Executor,
        store: &mut dyn VersionStore,
    ) -> Result<RunReport> {
        let started_at = Utc::now();
        let run_id = Uuid::new_v4().to_string();
        let dialect = self.dialect.as_ref();
        info!(
            "Starting schema run {} ({} tables, dialect {}{})",
            run_id,
            self.catalog.len(),
            dialect.name(),
            if self.options.dry_run { ", dry run" } else { "" }
        );

        // Everything that can fail without a database fails here.
        let order = self.catalog.dependency_order()?;
        let fingerprint = self.catalog.fingerprint()?;
        for table in order.iter().map(Arc::as_ref).chain(store.table()) {
            self.precheck(table)?;
        }

        let mut report = RunReport {
            run_id,
            dialect: dialect.name().to_string(),
            fingerprint,
            dry_run: self.options.dry_run,
            database_created: false,
            version_table: None,
            tables: Vec::with_capacity(order.len()),
            version_writes: 0,
            started_at,
            completed_at: started_at,
        };

        if self.options.ensure_database {
            report.database_created = self.ensure_database(exec)?;
        }

        let versions = match store.table() {
            Some(table) => {
                let table_report = self.provision(exec, table)?;
                let created = table_report.outcome == TableOutcome::Created;
                report.version_table = Some(table_report);
                if created && self.options.dry_run {
                    VersionMap::default()
                } else {
                    store.load(&mut *exec, dialect)?
                }
            }
            None => store.load(&mut *exec, dialect)?,
        };

        for table in &order {
            if self.cancel.load(Ordering::SeqCst) {
                info!("Cancellation requested, stopping before {}", table.name());
                return Err(SchemaError::Cancelled);
            }

            let mut table_report = self.provision(exec, table)?;
            let data_version = self.apply_seed_data(exec, table, &versions, &mut table_report)?;
            if table_report.outcome != TableOutcome::Unchanged || table_report.seed_rows_applied > 0 {
                info!(
                    "{}: {:?} ({} statements, {} seed rows)",
                    table.name(),
                    table_report.outcome,
                    table_report.statements.len(),
                    table_report.seed_rows_applied
                );
            } else {
                debug!("{}: unchanged", table.name());
            }

            if !self.options.dry_run {
                report.version_writes +=
                    self.record_versions(exec, store, table, &versions, data_version)?;
            }
            report.tables.push(table_report);
        }

        report.completed_at = Utc::now();
        info!(
            "Schema run {} complete: {} created, {} upgraded, {} unchanged",
            report.run_id,
            report.count(TableOutcome::Created),
            report.count(TableOutcome::Upgraded),
            report.count(TableOutcome::Unchanged)
        );
        Ok(report)
    }

    /// Generate everything that depends only on the declaration.
    fn precheck(&self, table: &TableDef) -> Result<()> {
        for column in table.columns() {
            self.dialect.column_definition(column)?;
        }
        if !table.seed_rows().is_empty() {
            self.dialect.upsert_statement(table)?;
        }
        Ok(())
    }

    /// Probe for the target database; create it when absent.
    fn ensure_database(&self, exec: &mut dyn Executor) -> Result<bool> {
        let dialect = self.dialect.as_ref();
        let probe = dialect.database_exists_statement()?;
        let exists = exec
            .scalar(&probe, &[])
            .map_err(|e| SchemaError::execution("<database>", probe.as_str(), e))?
            .map(|v| v.is_truthy())
            .unwrap_or(false);
        if exists {
            debug!("Target database exists");
            return Ok(false);
        }
        if !dialect.can_create_database() {
            return Err(SchemaError::not_supported(dialect.name(), "CREATE DATABASE"));
        }

        let sql = dialect.create_database_statement()?;
        info!("Creating target database");
        if !self.options.dry_run {
            exec.execute(&sql, &[])
                .map_err(|e| SchemaError::execution("<database>", sql.as_str(), e))?;
        }
        Ok(true)
    }

    /// Create the table, or bring an existing one up to its declaration.
    fn provision(&self, exec: &mut dyn Executor, table: &TableDef) -> Result<TableReport> {
        let dialect = self.dialect.as_ref();
        let mut report = TableReport::new(table.name());

        let probe = dialect.table_exists_statement(table.name());
        let exists = self
            .query(exec, table, &probe)?
            .first()
            .and_then(|row| row.first())
            .map(SqlValue::is_truthy)
            .unwrap_or(false);

        if !exists {
            self.emit(exec, table, dialect.create_table_statement(table)?, &mut report)?;
            for index in table.indexes_to_create() {
                self.emit(exec, table, dialect.create_index_statement(table, &index)?, &mut report)?;
            }
            report.outcome = TableOutcome::Created;
            return Ok(report);
        }

        let live_columns: Vec<LiveColumn> = self
            .query(exec, table, &dialect.column_names_statement(table.name()))?
            .iter()
            .filter_map(|row| LiveColumn::from_row(row))
            .collect();
        let live_indexes = self.names(exec, table, &dialect.index_names_statement(table.name()))?;
        let plan = plan_upgrade(table, &live_columns, &live_indexes);

        for change in &plan.columns {
            match change {
                ColumnChange::Rename { column, from, alter } => {
                    let sql = dialect.rename_column_statement(table, from, &column.name)?;
                    self.emit(exec, table, sql, &mut report)?;
                    if let Some(target) = alter {
                        if let Some(sql) = dialect.alter_column_statement(table, target)? {
                            self.emit(exec, table, sql, &mut report)?;
                        }
                    }
                }
                ColumnChange::Add(column) => {
                    let sql = dialect.add_column_statement(table, column)?;
                    self.emit(exec, table, sql, &mut report)?;
                }
            }
        }
        for index in &plan.indexes {
            self.emit(exec, table, dialect.create_index_statement(table, index)?, &mut report)?;
        }

        if !report.statements.is_empty() {
            report.outcome = TableOutcome::Upgraded;
        }
        Ok(report)
    }

    /// Upsert seed rows when the declared data version is newer than the
    /// recorded one. Returns the data version now in effect.
    fn apply_seed_data(
        &self,
        exec: &mut dyn Executor,
        table: &TableDef,
        versions: &VersionMap,
        report: &mut TableReport,
    ) -> Result<u32> {
        let recorded = versions.table(table.name()).map(|r| r.data_version).unwrap_or(0);
        if table.seed_rows().is_empty() || table.data_version() <= recorded {
            return Ok(recorded);
        }
        if !self.options.apply_seed_data {
            warn!(
                "{}: seed data v{} pending (recorded v{}), seeding disabled",
                table.name(),
                table.data_version(),
                recorded
            );
            return Ok(recorded);
        }

        let sql = self.dialect.upsert_statement(table)?;
        debug!("{}: {}", table.name(), sql);
        for row in table.seed_rows() {
            if !self.options.dry_run {
                exec.execute(&sql, row)
                    .map_err(|e| SchemaError::execution(table.name(), sql.as_str(), e))?;
            }
            report.seed_rows_applied += 1;
        }
        report.statements.push(sql);
        Ok(table.data_version())
    }

    /// Write table and column records whose versions changed.
    fn record_versions(
        &self,
        exec: &mut dyn Executor,
        store: &mut dyn VersionStore,
        table: &TableDef,
        versions: &VersionMap,
        data_version: u32,
    ) -> Result<usize> {
        let dialect = self.dialect.as_ref();
        let desired = std::iter::once(VersionRecord::table(table.name(), table.version(), data_version))
            .chain(
                table
                    .columns()
                    .iter()
                    .map(|c| VersionRecord::column(table.name(), &c.name, c.version)),
            );

        let mut writes = 0;
        for record in desired {
            let unchanged = versions
                .get(&record.object_name)
                .map(|r| r.same_versions(&record))
                .unwrap_or(false);
            if !unchanged {
                store.save(&mut *exec, dialect, &record)?;
                writes += 1;
            }
        }
        Ok(writes)
    }

    /// Record a DDL statement and execute it unless this is a dry run.
    fn emit(
        &self,
        exec: &mut dyn Executor,
        table: &TableDef,
        sql: String,
        report: &mut TableReport,
    ) -> Result<()> {
        debug!("{}: {}", table.name(), sql);
        if !self.options.dry_run {
            exec.execute(&sql, &[])
                .map_err(|e| SchemaError::execution(table.name(), sql.as_str(), e))?;
        }
        report.statements.push(sql);
        Ok(())
    }

    fn query(
        &self,
        exec: &mut dyn Executor,
        table: &TableDef,
        sql: &str,
    ) -> Result<Vec<Vec<SqlValue>>> {
        exec.query(sql, &[])
            .map_err(|e| SchemaError::execution(table.name(), sql, e))
    }

    /// First column of every row, as text.
    fn names(&self, exec: &mut dyn Executor, table: &TableDef, sql: &str) -> Result<Vec<String>> {
        Ok(self
            .query(exec, table, sql)?
            .into_iter()
            .filter_map(|row| row.into_iter().next())
            .filter_map(|v| match v {
                SqlValue::Text(s) => Some(s),
                _ => None,
            })
            .collect())
    }
}
