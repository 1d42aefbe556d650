//! Configuration type definitions.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::types::AbstractType;
use crate::state::DEFAULT_VERSION_TABLE;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Default target connection.
    pub connection: ConnectionConfig,

    /// Additional named connections.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub databases: BTreeMap<String, ConnectionConfig>,

    /// Run behavior.
    #[serde(default)]
    pub schema: SchemaConfig,

    /// Declarative table catalog.
    #[serde(default)]
    pub tables: Vec<TableConfig>,
}

/// Connection string plus optional provider token.
#[derive(Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub connection_string: String,

    /// Provider name (e.g. `Npgsql`); sniffed from the string when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

/// Custom Debug implementation that redacts passwords.
impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("connection_string", &redact_password(&self.connection_string))
            .field("provider", &self.provider)
            .finish()
    }
}

/// Replace password values in ADO, libpq and URL connection strings.
pub(crate) fn redact_password(connection_string: &str) -> String {
    if let Some((scheme, rest)) = connection_string.split_once("://") {
        if let Some((userinfo, host)) = rest.split_once('@') {
            if let Some((user, _)) = userinfo.split_once(':') {
                return format!("{}://{}:[REDACTED]@{}", scheme, user, host);
            }
        }
        return connection_string.to_string();
    }

    let separator = if connection_string.contains(';') { ';' } else { ' ' };
    connection_string
        .split(separator)
        .map(|part| match part.split_once('=') {
            Some((key, _))
                if matches!(key.trim().to_ascii_lowercase().as_str(), "password" | "pwd") =>
            {
                format!("{}=[REDACTED]", key)
            }
            _ => part.to_string(),
        })
        .collect::<Vec<_>>()
        .join(&separator.to_string())
}

/// Run behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaConfig {
    /// Create the target database when absent (default: false).
    #[serde(default)]
    pub ensure_database: bool,

    /// Apply seed data (default: true).
    #[serde(default = "default_true")]
    pub apply_seed_data: bool,

    /// Record statements without executing DDL or seed data (default: false).
    #[serde(default)]
    pub dry_run: bool,

    /// Bookkeeping table name (default: "ddl_schema_version").
    #[serde(default = "default_version_table")]
    pub version_table: String,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            ensure_database: false,
            apply_seed_data: true,
            dry_run: false,
            version_table: default_version_table(),
        }
    }
}

/// One declared table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableConfig {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Tablespace / filegroup for table data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_space: Option<String>,

    /// Tablespace / filegroup for indexes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_space: Option<String>,

    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,

    /// Append the standard audit columns.
    #[serde(default)]
    pub audit_columns: bool,

    pub columns: Vec<ColumnConfig>,

    #[serde(default)]
    pub indexes: Vec<IndexConfig>,

    #[serde(default)]
    pub data_version: u32,

    /// Seed rows, positionally aligned with the final column list.
    #[serde(default)]
    pub data: Vec<Vec<serde_yaml::Value>>,
}

/// One declared column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnConfig {
    pub name: String,

    #[serde(rename = "type")]
    pub data_type: AbstractType,

    /// Length or precision; 0 means unbounded / engine default.
    #[serde(default)]
    pub size: u32,

    #[serde(default)]
    pub scale: u32,

    #[serde(default)]
    pub primary_key: bool,

    /// Nullability (default: true; primary keys are never null).
    #[serde(default = "default_true")]
    pub nullable: bool,

    /// Literal, or one of `current_date_time`, `current_utc_date_time`,
    /// `current_date`, `new_guid`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_yaml::Value>,

    #[serde(default)]
    pub unique: bool,

    #[serde(default)]
    pub index: bool,

    #[serde(default = "default_version")]
    pub version: u32,

    /// Previous names, newest first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub old_names: Vec<String>,

    /// Foreign key target, `table:column`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
}

/// One declared composite index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    pub columns: Vec<String>,

    /// Generated as `IX_<table>_<cols>` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default)]
    pub unique: bool,
}

fn default_true() -> bool {
    true
}

fn default_version() -> u32 {
    1
}

fn default_version_table() -> String {
    DEFAULT_VERSION_TABLE.to_string()
}
