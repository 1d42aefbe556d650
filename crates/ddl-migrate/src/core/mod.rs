//! Core abstractions for database-agnostic schema definition.
//!
//! - [`types`]: abstract column types and default markers
//! - [`schema`] / [`builder`]: column, index and table definitions
//! - [`catalog`]: the table set and its foreign-key dependency order
//! - [`traits`]: the `Dialect` strategy and the `Executor` seam
//! - [`connection`] / [`provider`]: connection strings and dialect resolution
//! - [`value`]: typed parameter values
//!
//! Driver modules (`drivers/sqlite`, `drivers/postgres`, ...) implement
//! `Dialect`; nothing in `core` knows about a specific engine except
//! [`DialectProvider::with_builtins`].

pub mod builder;
pub mod catalog;
pub mod connection;
pub mod identifier;
pub mod provider;
pub mod schema;
pub mod traits;
pub mod types;
pub mod value;

pub use builder::TableBuilder;
pub use catalog::TableCatalog;
pub use connection::{ConnectionInfo, ConnectionResolver, ConnectionString, StaticConnectionResolver};
pub use provider::{DialectFactory, DialectProvider};
pub use schema::{ColumnDef, IndexDef, Reference, TableDef, AUDIT_COLUMNS};
pub use traits::{Dialect, Executor};
pub use types::{AbstractType, DefaultValue};
pub use value::SqlValue;
