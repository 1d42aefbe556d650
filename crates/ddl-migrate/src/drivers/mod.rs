//! Database dialect implementations.
//!
//! - [`sqlite`]: SQLite 3.25+ (plus the embedded [`SqliteExecutor`] behind the `sqlite` feature)
//! - [`oracle`]: Oracle 12.2+
//! - [`mysql`]: MySQL 8.0+ / MariaDB 10.5+
//! - [`postgres`]: PostgreSQL 11+
//! - [`mssql`]: Microsoft SQL Server 2016+
//!
//! # Adding New Databases
//!
//! 1. Create a new module under `drivers/` with a `Dialect` implementation
//! 2. Add a `connection_matches` sniffing function for its connection strings
//! 3. Add a [`DialectKind`] variant (name, provider tokens, factory)
//! 4. Place it in [`DialectKind::ALL`]; that order is the sniffing order

pub mod mssql;
pub mod mysql;
pub mod oracle;
pub mod postgres;
pub mod sqlite;

use std::sync::Arc;

pub use mssql::MssqlDialect;
pub use mysql::MysqlDialect;
pub use oracle::OracleDialect;
pub use postgres::PostgresDialect;
pub use sqlite::SqliteDialect;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteExecutor;

use crate::core::connection::ConnectionString;
use crate::core::provider::DialectFactory;
use crate::core::traits::Dialect;
use crate::error::{Result, SchemaError};

/// Built-in engine families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DialectKind {
    Sqlite,
    Oracle,
    Mysql,
    Postgres,
    Mssql,
}

impl DialectKind {
    /// Every built-in kind, in sniffing order.
    ///
    /// File-based SQLite strings are recognised first; SQL Server goes last
    /// because `Server=` / `Data Source=` keys are shared with other engines.
    pub const ALL: [DialectKind; 5] = [
        DialectKind::Sqlite,
        DialectKind::Oracle,
        DialectKind::Mysql,
        DialectKind::Postgres,
        DialectKind::Mssql,
    ];

    /// Canonical identifier.
    pub fn as_str(self) -> &'static str {
        match self {
            DialectKind::Sqlite => "sqlite",
            DialectKind::Oracle => "oracle",
            DialectKind::Mysql => "mysql",
            DialectKind::Postgres => "postgres",
            DialectKind::Mssql => "mssql",
        }
    }

    /// Normalize a database type name or alias.
    pub fn from_name(name: &str) -> Result<Self> {
        match name.trim().to_lowercase().as_str() {
            "sqlite" | "sqlite3" => Ok(DialectKind::Sqlite),
            "oracle" | "ora" => Ok(DialectKind::Oracle),
            "mysql" | "mariadb" => Ok(DialectKind::Mysql),
            "postgres" | "postgresql" | "pg" => Ok(DialectKind::Postgres),
            "mssql" | "sqlserver" | "sql_server" => Ok(DialectKind::Mssql),
            other => Err(SchemaError::Config(format!(
                "Unknown database type: '{}'. Supported types: sqlite, oracle, mysql, postgres, mssql",
                other
            ))),
        }
    }
}

impl std::fmt::Display for DialectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl DialectFactory for DialectKind {
    fn name(&self) -> &str {
        self.as_str()
    }

    fn provider_names(&self) -> &[&str] {
        match self {
            DialectKind::Sqlite => &["Microsoft.Data.Sqlite", "System.Data.SQLite", "sqlite3"],
            DialectKind::Oracle => &[
                "Oracle.ManagedDataAccess.Client",
                "Oracle.DataAccess.Client",
                "System.Data.OracleClient",
            ],
            DialectKind::Mysql => &["MySql.Data.MySqlClient", "MySqlConnector", "mariadb"],
            DialectKind::Postgres => &["Npgsql", "postgresql", "pg"],
            DialectKind::Mssql => &[
                "System.Data.SqlClient",
                "Microsoft.Data.SqlClient",
                "sqlserver",
            ],
        }
    }

    fn matches(&self, conn: &ConnectionString) -> bool {
        match self {
            DialectKind::Sqlite => sqlite::connection_matches(conn),
            DialectKind::Oracle => oracle::connection_matches(conn),
            DialectKind::Mysql => mysql::connection_matches(conn),
            DialectKind::Postgres => postgres::connection_matches(conn),
            DialectKind::Mssql => mssql::connection_matches(conn),
        }
    }

    fn create(&self, conn: &ConnectionString) -> Arc<dyn Dialect> {
        let database = conn.database();
        match self {
            DialectKind::Sqlite => Arc::new(SqliteDialect::new(database)),
            DialectKind::Oracle => Arc::new(OracleDialect::new(database)),
            DialectKind::Mysql => Arc::new(MysqlDialect::new(database)),
            DialectKind::Postgres => Arc::new(PostgresDialect::new(database)),
            DialectKind::Mssql => Arc::new(MssqlDialect::new(database)),
        }
    }
}

/// Database name a database-level statement needs, or a configuration error.
pub(crate) fn require_database<'a>(dialect: &str, database: &'a Option<String>) -> Result<&'a str> {
    database.as_deref().ok_or_else(|| {
        SchemaError::Config(format!(
            "{} connection string does not name a database",
            dialect
        ))
    })
}
