//! Connection string parsing and logical connection resolution.
//!
//! Three shapes are understood:
//!
//! - ADO.NET style `Key=Value;Key=Value` (SQL Server, Npgsql, MySQL, Oracle)
//! - libpq style `key=value key='quoted value'`
//! - URLs: `postgres://host/db`, `mysql://...`, `sqlite:path`, `file:path`
//!
//! Keys are case-insensitive. Nothing here opens a connection.

use std::collections::HashMap;

use crate::error::{Result, SchemaError};

/// Parsed connection string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionString {
    raw: String,
    scheme: Option<String>,
    pairs: Vec<(String, String)>,
    path: Option<String>,
}

impl ConnectionString {
    /// Parse a connection string. Never fails: unknown shapes yield no pairs.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if let Some((scheme, rest)) = split_scheme(trimmed) {
            return Self::parse_url(trimmed, scheme, rest);
        }

        // libpq keys never contain spaces: `Data Source=app.db` is ADO.
        let ado = trimmed.contains(';')
            || trimmed
                .split_once('=')
                .is_some_and(|(k, _)| k.trim().contains(char::is_whitespace));
        let pairs = if ado {
            trimmed
                .split(';')
                .filter_map(|part| {
                    let (k, v) = part.split_once('=')?;
                    Some((normalize_key(k), unquote(v.trim())))
                })
                .collect()
        } else {
            parse_libpq(trimmed)
        };

        Self {
            raw: raw.to_string(),
            scheme: None,
            pairs,
            path: None,
        }
    }

    fn parse_url(raw: &str, scheme: String, rest: &str) -> Self {
        let (body, query) = match rest.split_once('?') {
            Some((b, q)) => (b, Some(q)),
            None => (rest, None),
        };

        let mut pairs = Vec::new();
        if let Some(q) = query {
            for part in q.split('&') {
                if let Some((k, v)) = part.split_once('=') {
                    pairs.push((normalize_key(k), v.to_string()));
                }
            }
        }

        let path = if let Some(authority_and_path) = body.strip_prefix("//") {
            match authority_and_path.split_once('/') {
                Some((authority, path)) => {
                    let host = authority.rsplit('@').next().unwrap_or(authority);
                    let (host, port) = match host.rsplit_once(':') {
                        Some((h, p)) if p.chars().all(|c| c.is_ascii_digit()) => (h, Some(p)),
                        _ => (host, None),
                    };
                    if !host.is_empty() {
                        pairs.push(("host".to_string(), host.to_string()));
                    }
                    if let Some(p) = port {
                        pairs.push(("port".to_string(), p.to_string()));
                    }
                    // sqlite:///abs/path.db keeps its leading slash
                    if authority.is_empty() && matches!(scheme.as_str(), "sqlite" | "file") {
                        Some(format!("/{}", path))
                    } else {
                        Some(path.to_string())
                    }
                }
                None => Some(authority_and_path.to_string()).filter(|p| !p.is_empty()),
            }
        } else {
            Some(body.to_string()).filter(|p| !p.is_empty())
        };

        Self {
            raw: raw.to_string(),
            scheme: Some(scheme),
            pairs,
            path,
        }
    }

    /// The original text.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Lower-cased URL scheme, for URL-form strings.
    pub fn scheme(&self) -> Option<&str> {
        self.scheme.as_deref()
    }

    /// URL path (after the authority), for URL-form strings.
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Value of the first key matching any of `keys` (case-insensitive).
    pub fn get(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|key| {
            let key = normalize_key(key);
            self.pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.as_str())
        })
    }

    /// Whether any of `keys` is present.
    pub fn has(&self, keys: &[&str]) -> bool {
        self.get(keys).is_some()
    }

    /// Target database name.
    ///
    /// For file-backed engines this is the file path.
    pub fn database(&self) -> Option<String> {
        if self.scheme.is_some() {
            return self
                .get(&["database", "dbname"])
                .map(str::to_string)
                .or_else(|| self.path.clone());
        }
        self.get(&["database", "initial catalog", "dbname", "db"])
            .map(str::to_string)
    }
}

fn split_scheme(s: &str) -> Option<(String, &str)> {
    let (scheme, rest) = s.split_once(':')?;
    let valid = !scheme.is_empty()
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.');
    // `Data Source=C:\x.db` has a colon after a key containing '=' or spaces
    if !valid || scheme.len() == 1 {
        return None;
    }
    Some((scheme.to_ascii_lowercase(), rest))
}

fn normalize_key(key: &str) -> String {
    key.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_lowercase()
}

fn unquote(value: &str) -> String {
    for q in ['\'', '"'] {
        if value.len() >= 2 && value.starts_with(q) && value.ends_with(q) {
            return value[1..value.len() - 1].to_string();
        }
    }
    value.to_string()
}

fn parse_libpq(s: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    let mut chars = s.chars().peekable();

    loop {
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        let mut key = String::new();
        while let Some(&c) = chars.peek() {
            if c == '=' || c.is_whitespace() {
                break;
            }
            key.push(c);
            chars.next();
        }
        if key.is_empty() {
            break;
        }
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        if chars.next_if_eq(&'=').is_none() {
            break;
        }
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }

        let mut value = String::new();
        if chars.next_if_eq(&'\'').is_some() {
            while let Some(c) = chars.next() {
                match c {
                    '\\' => {
                        if let Some(escaped) = chars.next() {
                            value.push(escaped);
                        }
                    }
                    '\'' => break,
                    other => value.push(other),
                }
            }
        } else {
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() {
                    break;
                }
                value.push(c);
                chars.next();
            }
        }
        pairs.push((key.to_ascii_lowercase(), value));
    }

    pairs
}

/// A logical connection: connection string plus optional provider token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    /// Raw connection string.
    pub connection_string: String,
    /// Provider name (e.g. `Npgsql`), when known.
    pub provider: Option<String>,
}

impl ConnectionInfo {
    pub fn new(connection_string: impl Into<String>, provider: Option<String>) -> Self {
        Self {
            connection_string: connection_string.into(),
            provider,
        }
    }

    /// Parse the connection string.
    pub fn parsed(&self) -> ConnectionString {
        ConnectionString::parse(&self.connection_string)
    }

    /// Target database name.
    pub fn database(&self) -> Option<String> {
        self.parsed().database()
    }
}

/// Maps a logical database name to a connection.
pub trait ConnectionResolver: Send + Sync {
    /// Resolve a name; `None` selects the default connection.
    fn resolve(&self, name: Option<&str>) -> Result<ConnectionInfo>;
}

/// Resolver over a fixed set of connections.
#[derive(Debug, Clone, Default)]
pub struct StaticConnectionResolver {
    default: Option<ConnectionInfo>,
    named: HashMap<String, ConnectionInfo>,
}

impl StaticConnectionResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default(mut self, info: ConnectionInfo) -> Self {
        self.default = Some(info);
        self
    }

    pub fn with_named(mut self, name: impl Into<String>, info: ConnectionInfo) -> Self {
        self.named.insert(name.into(), info);
        self
    }
}

impl ConnectionResolver for StaticConnectionResolver {
    fn resolve(&self, name: Option<&str>) -> Result<ConnectionInfo> {
        match name {
            None => self
                .default
                .clone()
                .ok_or_else(|| SchemaError::Config("No default connection configured".into())),
            Some(n) => self
                .named
                .get(n)
                .cloned()
                .ok_or_else(|| SchemaError::Config(format!("Unknown database '{}'", n))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ado_style() {
        let cs = ConnectionString::parse(
            "Server=db01\\SQLEXPRESS;Initial Catalog=Inventory;Integrated  Security=true;",
        );
        assert_eq!(cs.scheme(), None);
        assert_eq!(cs.get(&["server"]), Some("db01\\SQLEXPRESS"));
        assert_eq!(cs.get(&["integrated security"]), Some("true"));
        assert_eq!(cs.database().as_deref(), Some("Inventory"));
    }

    #[test]
    fn test_parse_windows_path_is_not_a_url() {
        let cs = ConnectionString::parse("Data Source=C:\\data\\app.db");
        assert_eq!(cs.scheme(), None);
        assert_eq!(cs.get(&["data source"]), Some("C:\\data\\app.db"));
    }

    #[test]
    fn test_parse_single_ado_pair() {
        let cs = ConnectionString::parse("Data Source=app.db");
        assert_eq!(cs.get(&["data source"]), Some("app.db"));

        let cs = ConnectionString::parse("Server=db01");
        assert_eq!(cs.get(&["server"]), Some("db01"));
    }

    #[test]
    fn test_parse_libpq_style() {
        let cs = ConnectionString::parse("host=localhost port=5432 dbname=app password='a b\\'c'");
        assert_eq!(cs.get(&["host"]), Some("localhost"));
        assert_eq!(cs.get(&["password"]), Some("a b'c"));
        assert_eq!(cs.database().as_deref(), Some("app"));
    }

    #[test]
    fn test_parse_urls() {
        let cs = ConnectionString::parse("postgres://user:pw@db.example.com:5433/orders?sslmode=require");
        assert_eq!(cs.scheme(), Some("postgres"));
        assert_eq!(cs.get(&["host"]), Some("db.example.com"));
        assert_eq!(cs.get(&["port"]), Some("5433"));
        assert_eq!(cs.get(&["sslmode"]), Some("require"));
        assert_eq!(cs.database().as_deref(), Some("orders"));

        let cs = ConnectionString::parse("sqlite:/var/lib/app.db");
        assert_eq!(cs.scheme(), Some("sqlite"));
        assert_eq!(cs.database().as_deref(), Some("/var/lib/app.db"));

        let cs = ConnectionString::parse("sqlite:///var/lib/app.db");
        assert_eq!(cs.database().as_deref(), Some("/var/lib/app.db"));

        let cs = ConnectionString::parse("sqlite::memory:");
        assert_eq!(cs.database().as_deref(), Some(":memory:"));
    }

    #[test]
    fn test_static_resolver() {
        let resolver = StaticConnectionResolver::new()
            .with_default(ConnectionInfo::new("sqlite::memory:", None))
            .with_named(
                "reporting",
                ConnectionInfo::new("Host=pg;Database=rpt", Some("Npgsql".into())),
            );

        assert_eq!(
            resolver.resolve(None).unwrap().connection_string,
            "sqlite::memory:"
        );
        let info = resolver.resolve(Some("reporting")).unwrap();
        assert_eq!(info.provider.as_deref(), Some("Npgsql"));
        assert_eq!(info.database().as_deref(), Some("rpt"));
        assert!(resolver.resolve(Some("missing")).is_err());
    }
}
