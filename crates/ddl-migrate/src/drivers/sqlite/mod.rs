//! SQLite driver.
//!
//! - [`SqliteDialect`]: SQL generation for SQLite 3.25+ (RENAME COLUMN, upsert)
//! - [`SqliteExecutor`]: embedded [`Executor`](crate::core::Executor) over
//!   `rusqlite`, available with the `sqlite` feature (on by default)
//!
//! # Connection String
//!
//! ```text
//! sqlite:/path/to/app.db
//! sqlite::memory:
//! Data Source=app.db
//! ```

mod dialect;
#[cfg(feature = "sqlite")]
mod executor;

pub use dialect::SqliteDialect;
pub(crate) use dialect::connection_matches;
#[cfg(feature = "sqlite")]
pub use executor::SqliteExecutor;
