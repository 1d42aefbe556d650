//! Configuration loading and validation.
//!
//! A YAML file names the target connections, the run switches and, when the
//! catalog is not declared in code, the tables themselves.

mod types;
mod validation;

pub use types::*;

use std::path::Path;

use rust_decimal::Decimal;
use sha2::{Digest, Sha256};

use crate::core::builder::TableBuilder;
use crate::core::catalog::TableCatalog;
use crate::core::connection::{ConnectionInfo, StaticConnectionResolver};
use crate::core::schema::{ColumnDef, TableDef};
use crate::core::types::DefaultValue;
use crate::core::value::SqlValue;
use crate::error::{Result, SchemaError};
use crate::orchestrator::RunOptions;

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }

    /// Hash of the effective configuration, for change detection.
    pub fn hash(&self) -> String {
        let serialized = serde_yaml::to_string(self).unwrap_or_default();
        hex::encode(Sha256::digest(serialized.as_bytes()))
    }

    /// Connections keyed by logical database name.
    pub fn resolver(&self) -> StaticConnectionResolver {
        let info = |c: &ConnectionConfig| {
            ConnectionInfo::new(c.connection_string.clone(), c.provider.clone())
        };
        self.databases.iter().fold(
            StaticConnectionResolver::new().with_default(info(&self.connection)),
            |resolver, (name, conn)| resolver.with_named(name.clone(), info(conn)),
        )
    }

    /// Build the declared tables into a catalog.
    pub fn catalog(&self) -> Result<TableCatalog> {
        let mut catalog = TableCatalog::new();
        for table in &self.tables {
            catalog.add(table.build()?)?;
        }
        Ok(catalog)
    }

    /// Run switches from the `schema` section.
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            ensure_database: self.schema.ensure_database,
            apply_seed_data: self.schema.apply_seed_data,
            dry_run: self.schema.dry_run,
        }
    }
}

impl TableConfig {
    /// Build the table through the same rules as code-declared tables.
    pub fn build(&self) -> Result<TableDef> {
        let mut builder = TableBuilder::new(&self.name)
            .version(self.version)
            .data_version(self.data_version);
        if let Some(category) = &self.category {
            builder = builder.category(category);
        }
        if let Some(description) = &self.description {
            builder = builder.description(description);
        }
        if let Some(space) = &self.data_space {
            builder = builder.data_space(space);
        }
        if let Some(space) = &self.index_space {
            builder = builder.index_space(space);
        }
        if let Some(module) = &self.module {
            builder = builder.module(module);
        }

        for column in &self.columns {
            let def = column.to_column_def(&self.name)?;
            builder = if column.primary_key {
                builder.primary_key(def)
            } else {
                builder.column(def)
            };
        }
        if self.audit_columns {
            builder = builder.audit_columns();
        }

        for index in &self.indexes {
            let columns: Vec<&str> = index.columns.iter().map(String::as_str).collect();
            let name = index.name.as_deref().unwrap_or("");
            builder = if index.unique {
                builder.unique_index(&columns, name)
            } else {
                builder.index(&columns, name)
            };
        }

        for row in &self.data {
            let values = row
                .iter()
                .map(SqlValue::from_yaml)
                .collect::<Result<Vec<_>>>()?;
            builder = builder.data(values);
        }

        builder.build()
    }
}

impl ColumnConfig {
    fn to_column_def(&self, table: &str) -> Result<ColumnDef> {
        let mut def = ColumnDef::new(&self.name, self.data_type)
            .nullable(self.nullable)
            .version(self.version)
            .old_names(self.old_names.iter().cloned());
        def.size = self.size;
        def.scale = self.scale;
        def.is_unique = self.unique;
        def.is_index = self.index;
        if let Some(value) = &self.default {
            def = def.default_value(parse_default(table, &self.name, value)?);
        }
        if let Some(target) = &self.references {
            def = def.references(target);
        }
        if let Some(comments) = &self.comments {
            def = def.comments(comments);
        }
        Ok(def)
    }
}

fn parse_default(table: &str, column: &str, value: &serde_yaml::Value) -> Result<DefaultValue> {
    match value {
        serde_yaml::Value::Bool(b) => Ok(DefaultValue::Boolean(*b)),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(DefaultValue::Integer(i))
            } else if let Some(f) = n.as_f64() {
                // Keep literals like 0.05 exact.
                Ok(n.to_string()
                    .parse::<Decimal>()
                    .map(DefaultValue::Decimal)
                    .unwrap_or(DefaultValue::Float(f)))
            } else {
                Err(invalid_default(table, column, value))
            }
        }
        serde_yaml::Value::String(s) => Ok(match s.as_str() {
            "current_date_time" => DefaultValue::CurrentDateTime,
            "current_utc_date_time" => DefaultValue::CurrentUtcDateTime,
            "current_date" => DefaultValue::CurrentDate,
            "new_guid" => DefaultValue::NewGuid,
            _ => DefaultValue::Text(s.clone()),
        }),
        other => Err(invalid_default(table, column, other)),
    }
}

fn invalid_default(table: &str, column: &str, value: &serde_yaml::Value) -> SchemaError {
    SchemaError::Config(format!(
        "Table {}: column '{}' has an unsupported default {:?}",
        table, column, value
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::connection::ConnectionResolver;
    use crate::core::types::AbstractType;

    const SAMPLE: &str = r#"
connection:
  connection_string: "Server=db;Database=app;User Id=sa;Password=secret"
  provider: SqlClient
databases:
  reporting:
    connection_string: "postgres://report:hunter2@pg/reports"
schema:
  ensure_database: true
tables:
  - name: im_user
    category: security
    audit_columns: true
    data_version: 1
    columns:
      - { name: id, type: int32, primary_key: true }
      - { name: login, type: string, size: 50, nullable: false, unique: true }
      - { name: active, type: boolean, default: true }
      - { name: rate, type: decimal, size: 9, scale: 4, default: 0.05 }
      - { name: token, type: guid, default: new_guid }
    indexes:
      - { columns: [login, active] }
    data:
      - [1, admin, true, 0.1, null, system, "2024-01-01 00:00:00", null, null]
  - name: im_user_pref
    columns:
      - { name: id, type: int32, primary_key: true }
      - { name: user_id, type: int32, nullable: false, references: "im_user:id" }
      - { name: theme, type: string, size: 20, old_names: [skin] }
"#;

    #[test]
    fn test_from_yaml_defaults() {
        let config = Config::from_yaml(SAMPLE).unwrap();
        assert!(config.schema.ensure_database);
        assert!(config.schema.apply_seed_data);
        assert!(!config.schema.dry_run);
        assert_eq!(config.schema.version_table, "ddl_schema_version");
        assert_eq!(config.tables[0].version, 1);
        assert_eq!(config.tables[1].columns[2].old_names, vec!["skin"]);
    }

    #[test]
    fn test_catalog_from_yaml() {
        let catalog = Config::from_yaml(SAMPLE).unwrap().catalog().unwrap();
        assert_eq!(catalog.len(), 2);

        let user = catalog.get("im_user").unwrap();
        assert_eq!(user.category(), Some("security"));
        assert_eq!(user.columns().len(), 9);
        assert_eq!(user.primary_key().unwrap().name, "id");
        assert_eq!(user.seed_rows().len(), 1);
        assert_eq!(user.indexes()[0].name, "IX_im_user_login_active");

        let login = user.column("login").unwrap();
        assert!(!login.allow_null);
        assert!(login.is_unique);
        assert_eq!(login.size, 50);

        assert_eq!(
            user.column("active").unwrap().default_value,
            Some(DefaultValue::Boolean(true))
        );
        assert_eq!(
            user.column("rate").unwrap().default_value,
            Some(DefaultValue::Decimal(Decimal::new(5, 2)))
        );
        assert_eq!(
            user.column("token").unwrap().default_value,
            Some(DefaultValue::NewGuid)
        );
        assert_eq!(user.column("token").unwrap().data_type, AbstractType::Guid);

        let pref = catalog.get("im_user_pref").unwrap();
        let (_, reference) = pref.foreign_keys().next().unwrap();
        assert_eq!(reference.table, "im_user");
        assert_eq!(reference.column, "id");
    }

    #[test]
    fn test_seed_arity_checked_at_build() {
        let yaml = r#"
connection:
  connection_string: "Data Source=app.db"
tables:
  - name: lookup
    columns:
      - { name: id, type: int32, primary_key: true }
      - { name: label, type: string, size: 20 }
    data:
      - [1]
"#;
        let err = Config::from_yaml(yaml).unwrap().catalog().unwrap_err();
        assert!(matches!(err, SchemaError::ArityMismatch { .. }));
    }

    #[test]
    fn test_resolver_and_run_options() {
        let config = Config::from_yaml(SAMPLE).unwrap();
        let resolver = config.resolver();

        let default = resolver.resolve(None).unwrap();
        assert_eq!(default.provider.as_deref(), Some("SqlClient"));
        assert_eq!(default.database().as_deref(), Some("app"));

        let reporting = resolver.resolve(Some("reporting")).unwrap();
        assert_eq!(reporting.database().as_deref(), Some("reports"));
        assert!(resolver.resolve(Some("missing")).is_err());

        let options = config.run_options();
        assert!(options.ensure_database);
        assert!(options.apply_seed_data);
        assert!(!options.dry_run);
    }

    #[test]
    fn test_unknown_type_rejected() {
        let yaml = r#"
connection:
  connection_string: "Data Source=app.db"
tables:
  - name: t
    columns:
      - { name: id, type: bignumber }
"#;
        assert!(matches!(Config::from_yaml(yaml), Err(SchemaError::Yaml(_))));
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = Config::from_yaml(SAMPLE).unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("secret"));
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("Password=[REDACTED]"));
        assert!(debug.contains("report:[REDACTED]@pg/reports"));
    }

    #[test]
    fn test_redact_libpq_style() {
        assert_eq!(
            redact_password("host=pg dbname=app password=x user=u"),
            "host=pg dbname=app password=[REDACTED] user=u"
        );
    }

    #[test]
    fn test_hash_is_stable() {
        let a = Config::from_yaml(SAMPLE).unwrap();
        let b = Config::from_yaml(SAMPLE).unwrap();
        assert_eq!(a.hash(), b.hash());
        assert_eq!(a.hash().len(), 64);

        let mut c = Config::from_yaml(SAMPLE).unwrap();
        c.schema.dry_run = true;
        assert_ne!(a.hash(), c.hash());
    }
}
