//! Dialect resolution for connection strings.
//!
//! [`DialectProvider`] is an explicitly constructed registry of dialect
//! factories. It is populated once (usually with
//! [`with_builtins`](DialectProvider::with_builtins)) and then only read.
//! Resolved dialects are cached per connection string.
//!
//! Resolution order:
//!
//! 1. An explicit provider name is matched case-insensitively against each
//!    factory's provider tokens.
//! 2. Otherwise each factory inspects the parsed connection string in
//!    registration order and the first claim wins.
//! 3. Otherwise `DialectNotFound`, naming the provider hint.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::debug;

use crate::error::{Result, SchemaError};

use super::connection::{ConnectionInfo, ConnectionString};
use super::traits::Dialect;

/// Creates dialect instances for one engine family.
pub trait DialectFactory: Send + Sync {
    /// Engine family identifier (e.g. "postgres").
    fn name(&self) -> &str;

    /// Provider tokens that select this factory explicitly.
    fn provider_names(&self) -> &[&str];

    /// Whether the connection string structurally belongs to this engine.
    fn matches(&self, conn: &ConnectionString) -> bool;

    /// Create a dialect bound to the connection.
    fn create(&self, conn: &ConnectionString) -> Arc<dyn Dialect>;
}

/// Registry of dialect factories with a per-connection-string cache.
#[derive(Default)]
pub struct DialectProvider {
    factories: Vec<Arc<dyn DialectFactory>>,
    cache: RwLock<HashMap<String, Arc<dyn Dialect>>>,
}

impl DialectProvider {
    /// Create an empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a provider with every built-in dialect registered, in sniffing
    /// order: SQLite, Oracle, MySQL, PostgreSQL, SQL Server.
    pub fn with_builtins() -> Self {
        let mut provider = Self::new();
        for kind in crate::drivers::DialectKind::ALL {
            provider.register(kind);
        }
        provider
    }

    /// Register a factory. Registration order is sniffing order.
    pub fn register(&mut self, factory: impl DialectFactory + 'static) {
        self.factories.push(Arc::new(factory));
    }

    /// Names of registered factories, in order.
    pub fn dialect_names(&self) -> Vec<&str> {
        self.factories.iter().map(|f| f.name()).collect()
    }

    /// Resolve the dialect for a connection string and optional provider name.
    pub fn resolve(&self, connection_string: &str, provider: Option<&str>) -> Result<Arc<dyn Dialect>> {
        let key = match provider {
            Some(p) => format!("{}|{}", p.to_ascii_lowercase(), connection_string),
            None => connection_string.to_string(),
        };

        if let Ok(cache) = self.cache.read() {
            if let Some(dialect) = cache.get(&key) {
                return Ok(dialect.clone());
            }
        }

        let conn = ConnectionString::parse(connection_string);
        let factory = self.find_factory(&conn, provider)?;
        let dialect = factory.create(&conn);
        debug!(
            "Resolved dialect {} for provider {:?}",
            dialect.name(),
            provider
        );

        if let Ok(mut cache) = self.cache.write() {
            cache.insert(key, dialect.clone());
        }
        Ok(dialect)
    }

    /// Resolve the dialect for a logical connection.
    pub fn resolve_info(&self, info: &ConnectionInfo) -> Result<Arc<dyn Dialect>> {
        self.resolve(&info.connection_string, info.provider.as_deref())
    }

    fn find_factory(
        &self,
        conn: &ConnectionString,
        provider: Option<&str>,
    ) -> Result<&Arc<dyn DialectFactory>> {
        let provider = provider.map(str::trim).filter(|p| !p.is_empty());
        if let Some(p) = provider {
            let claimed = self.factories.iter().find(|f| {
                f.name().eq_ignore_ascii_case(p)
                    || f.provider_names().iter().any(|n| n.eq_ignore_ascii_case(p))
            });
            if let Some(factory) = claimed {
                return Ok(factory);
            }
            debug!("No dialect claims provider {}, sniffing the connection string", p);
        }

        self.factories
            .iter()
            .find(|f| f.matches(conn))
            .ok_or_else(|| SchemaError::DialectNotFound {
                hint: provider
                    .map(str::to_string)
                    .or_else(|| conn.scheme().map(str::to_string))
                    .unwrap_or_else(|| "<none>".to_string()),
            })
    }

    /// Number of cached dialect instances.
    pub fn cached(&self) -> usize {
        self.cache.read().map(|c| c.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve_name(provider: &DialectProvider, cs: &str, token: Option<&str>) -> String {
        provider.resolve(cs, token).unwrap().name().to_string()
    }

    #[test]
    fn test_explicit_provider_tokens() {
        let provider = DialectProvider::with_builtins();
        assert_eq!(resolve_name(&provider, "Host=x;Database=y", Some("Npgsql")), "postgres");
        assert_eq!(
            resolve_name(&provider, "Server=x;Database=y", Some("System.Data.SqlClient")),
            "mssql"
        );
        assert_eq!(
            resolve_name(&provider, "Data Source=a.db", Some("microsoft.data.sqlite")),
            "sqlite"
        );
        assert_eq!(
            resolve_name(&provider, "Data Source=h:1521/ORCL", Some("Oracle.ManagedDataAccess.Client")),
            "oracle"
        );
        assert_eq!(resolve_name(&provider, "Server=x", Some("MySql.Data.MySqlClient")), "mysql");
    }

    #[test]
    fn test_unknown_provider_falls_back_to_sniffing() {
        let provider = DialectProvider::with_builtins();
        assert_eq!(
            resolve_name(&provider, "postgres://u@h/db", Some("Acme.Unknown")),
            "postgres"
        );

        match provider.resolve("just some text", Some("Acme.Db")) {
            Err(SchemaError::DialectNotFound { hint }) => assert_eq!(hint, "Acme.Db"),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(d) => panic!("unexpected dialect {}", d.name()),
        }
    }

    #[test]
    fn test_sniffing() {
        let provider = DialectProvider::with_builtins();
        assert_eq!(resolve_name(&provider, "sqlite::memory:", None), "sqlite");
        assert_eq!(resolve_name(&provider, "Data Source=app.sqlite3", None), "sqlite");
        assert_eq!(resolve_name(&provider, "postgres://u@h/db", None), "postgres");
        assert_eq!(resolve_name(&provider, "host=h dbname=db user=u", None), "postgres");
        assert_eq!(resolve_name(&provider, "mysql://u@h:3306/db", None), "mysql");
        assert_eq!(
            resolve_name(&provider, "User Id=scott;Password=tiger;Data Source=db01:1521/ORCLPDB", None),
            "oracle"
        );
        assert_eq!(
            resolve_name(&provider, "Server=db01\\SQLEXPRESS;Initial Catalog=Inv;Trusted_Connection=True", None),
            "mssql"
        );
    }

    #[test]
    fn test_unrecognized_connection_fails() {
        let provider = DialectProvider::with_builtins();
        assert!(matches!(
            provider.resolve("just some text", None),
            Err(SchemaError::DialectNotFound { .. })
        ));
        assert!(matches!(
            DialectProvider::new().resolve("sqlite::memory:", None),
            Err(SchemaError::DialectNotFound { .. })
        ));
    }

    #[test]
    fn test_cache_returns_same_instance() {
        let provider = DialectProvider::with_builtins();
        let a = provider.resolve("sqlite::memory:", None).unwrap();
        let b = provider.resolve("sqlite::memory:", None).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(provider.cached(), 1);
    }
}
