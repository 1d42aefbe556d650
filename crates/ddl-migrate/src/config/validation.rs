//! Configuration validation.
//!
//! Structural checks only; table-level rules (duplicate columns, unknown
//! index columns, seed arity) are enforced by the builder when the catalog
//! is built.

use std::collections::HashSet;

use super::Config;
use crate::core::identifier::validate_identifier;
use crate::error::{Result, SchemaError};

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    if config.connection.connection_string.trim().is_empty() {
        return Err(SchemaError::Config(
            "connection.connection_string is required".into(),
        ));
    }
    for (name, conn) in &config.databases {
        if conn.connection_string.trim().is_empty() {
            return Err(SchemaError::Config(format!(
                "databases.{}.connection_string is required",
                name
            )));
        }
    }

    validate_identifier(&config.schema.version_table)
        .map_err(|e| SchemaError::Config(format!("schema.version_table: {}", e)))?;

    let mut seen = HashSet::new();
    for table in &config.tables {
        if !seen.insert(table.name.to_lowercase()) {
            return Err(SchemaError::Config(format!(
                "Table {} is declared twice",
                table.name
            )));
        }
        if table.name.eq_ignore_ascii_case(&config.schema.version_table) {
            return Err(SchemaError::Config(format!(
                "Table {} collides with the version table",
                table.name
            )));
        }
        if table.columns.is_empty() {
            return Err(SchemaError::Config(format!(
                "tables.{}.columns must not be empty",
                table.name
            )));
        }
        if table.columns.iter().filter(|c| c.primary_key).count() > 1 {
            return Err(SchemaError::DuplicatePrimaryKey {
                table: table.name.clone(),
            });
        }
        for index in &table.indexes {
            if index.columns.is_empty() {
                return Err(SchemaError::Config(format!(
                    "tables.{}.indexes entries must name at least one column",
                    table.name
                )));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        serde_yaml::from_str(
            r#"
connection:
  connection_string: "Data Source=app.db"
tables:
  - name: im_user
    columns:
      - { name: id, type: int32, primary_key: true }
      - { name: name, type: string, size: 50 }
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_valid_config() {
        assert!(validate(&valid_config()).is_ok());
    }

    #[test]
    fn test_missing_connection_string() {
        let mut config = valid_config();
        config.connection.connection_string = " ".into();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_duplicate_table() {
        let mut config = valid_config();
        let mut dup = config.tables[0].clone();
        dup.name = "IM_USER".into();
        config.tables.push(dup);
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_two_primary_keys() {
        let mut config = valid_config();
        config.tables[0].columns[1].primary_key = true;
        assert!(matches!(
            validate(&config),
            Err(SchemaError::DuplicatePrimaryKey { .. })
        ));
    }

    #[test]
    fn test_version_table_name_checked() {
        let mut config = valid_config();
        config.schema.version_table = String::new();
        assert!(validate(&config).is_err());

        let mut config = valid_config();
        config.schema.version_table = "im_user".into();
        assert!(validate(&config).is_err());
    }
}
