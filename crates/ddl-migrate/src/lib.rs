//! # ddl-migrate
//!
//! Database-agnostic schema definition and incremental schema migration.
//!
//! Tables are declared once against abstract column types, in code with
//! [`TableBuilder`] or in YAML through [`Config`]. A [`Dialect`] turns the
//! declarations into engine-specific DDL, and the [`SchemaOrchestrator`]
//! brings a live database up to date:
//!
//! - **Dependency order** from foreign keys, with cycle detection
//! - **Create or upgrade** per table: renames from old names, added columns,
//!   missing indexes; nothing is ever dropped
//! - **Seed data** upserted by primary key, gated by a data version
//! - **Version bookkeeping** in a table inside the target database
//!
//! Built-in dialects: SQL Server, PostgreSQL, MySQL/MariaDB, Oracle and
//! SQLite. Statements are executed through the [`Executor`] trait; an
//! embedded SQLite executor ships behind the `sqlite` feature.
//!
//! ## Example
//!
//! ```rust
//! # #[cfg(feature = "sqlite")]
//! # fn main() -> ddl_migrate::Result<()> {
//! use std::sync::Arc;
//! use ddl_migrate::{
//!     row, AbstractType, ColumnDef, SchemaOrchestrator, SqliteDialect, SqliteExecutor,
//!     TableBuilder, TableCatalog, TableOutcome,
//! };
//!
//! let users = TableBuilder::new("im_user")
//!     .pk_column("id", AbstractType::Int32)
//!     .column(ColumnDef::new("name", AbstractType::String).size(50).not_null())
//!     .data(row![1, "admin"])
//!     .build()?;
//!
//! let catalog = TableCatalog::new().with(users)?;
//! let orchestrator = SchemaOrchestrator::new(catalog, Arc::new(SqliteDialect::new(None)));
//!
//! let mut exec = SqliteExecutor::open_in_memory()?;
//! let report = orchestrator.run(&mut exec)?;
//! assert_eq!(report.table("im_user").unwrap().outcome, TableOutcome::Created);
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "sqlite"))]
//! # fn main() {}
//! ```

pub mod config;
pub mod core;
pub mod drivers;
pub mod error;
pub mod orchestrator;
pub mod state;

// Re-exports for convenient access
pub use crate::config::Config;
pub use crate::core::{
    AbstractType, ColumnDef, ConnectionInfo, ConnectionResolver, ConnectionString,
    DefaultValue, Dialect, DialectFactory, DialectProvider, Executor, IndexDef, Reference,
    SqlValue, StaticConnectionResolver, TableBuilder, TableCatalog, TableDef,
};
pub use crate::drivers::{
    DialectKind, MssqlDialect, MysqlDialect, OracleDialect, PostgresDialect, SqliteDialect,
};
#[cfg(feature = "sqlite")]
pub use crate::drivers::SqliteExecutor;
pub use crate::error::{ErrorKind, Result, SchemaError};
pub use crate::orchestrator::{RunOptions, RunReport, SchemaOrchestrator, TableOutcome, TableReport};
pub use crate::state::{DbVersionStore, InMemoryVersionStore, VersionRecord, VersionStore};
