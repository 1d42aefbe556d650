//! Database-backed version store.
//!
//! Records live in a bookkeeping table inside the target database, declared
//! with the same builder as application tables and provisioned by the
//! orchestrator through the run's dialect:
//!
//! | column         | type        |
//! |----------------|-------------|
//! | `object_name`  | string PK   |
//! | `object_type`  | string      |
//! | `version`      | int32       |
//! | `data_version` | int32       |
//! | `updated_on`   | date-time   |

use chrono::Utc;
use tracing::debug;

use super::{ObjectType, VersionMap, VersionRecord, VersionStore};
use crate::core::builder::TableBuilder;
use crate::core::schema::{ColumnDef, TableDef};
use crate::core::traits::{Dialect, Executor};
use crate::core::types::AbstractType;
use crate::core::value::SqlValue;
use crate::error::{Result, SchemaError};

/// Default bookkeeping table name.
pub const DEFAULT_VERSION_TABLE: &str = "ddl_schema_version";

/// Version store backed by a table in the target database.
#[derive(Debug, Clone)]
pub struct DbVersionStore {
    table: TableDef,
}

impl DbVersionStore {
    /// Create a store using the given bookkeeping table name.
    pub fn new(table_name: &str) -> Result<Self> {
        let table = TableBuilder::new(table_name)
            .category("system")
            .description("Provisioned schema and seed-data versions")
            .primary_key(ColumnDef::new("object_name", AbstractType::String).size(300))
            .column(
                ColumnDef::new("object_type", AbstractType::String)
                    .size(16)
                    .not_null(),
            )
            .column(
                ColumnDef::new("version", AbstractType::Int32)
                    .not_null()
                    .default_value(0),
            )
            .column(
                ColumnDef::new("data_version", AbstractType::Int32)
                    .not_null()
                    .default_value(0),
            )
            .column(ColumnDef::new("updated_on", AbstractType::DateTime))
            .build()?;
        Ok(Self { table })
    }

    /// Bookkeeping table name.
    pub fn table_name(&self) -> &str {
        self.table.name()
    }

    fn select_statement(&self, dialect: &dyn Dialect) -> String {
        let cols = ["object_name", "object_type", "version", "data_version"]
            .iter()
            .map(|c| dialect.quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ");
        format!("SELECT {} FROM {}", cols, dialect.quote_ident(self.table.name()))
    }
}

fn malformed(row: &[SqlValue]) -> SchemaError {
    SchemaError::Driver(format!("Malformed version record: {:?}", row))
}

fn text_at(row: &[SqlValue], i: usize) -> Result<&str> {
    row.get(i).and_then(SqlValue::as_str).ok_or_else(|| malformed(row))
}

fn number_at(row: &[SqlValue], i: usize) -> Result<u32> {
    row.get(i)
        .and_then(SqlValue::as_i64)
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| malformed(row))
}

fn parse_record(row: &[SqlValue]) -> Result<VersionRecord> {
    Ok(VersionRecord {
        object_name: text_at(row, 0)?.to_string(),
        object_type: ObjectType::parse(text_at(row, 1)?)?,
        version: number_at(row, 2)?,
        data_version: number_at(row, 3)?,
        updated_on: None,
    })
}

impl VersionStore for DbVersionStore {
    fn table(&self) -> Option<&TableDef> {
        Some(&self.table)
    }

    fn load(&mut self, exec: &mut dyn Executor, dialect: &dyn Dialect) -> Result<VersionMap> {
        let sql = self.select_statement(dialect);
        let rows = exec
            .query(&sql, &[])
            .map_err(|e| SchemaError::execution(self.table.name(), sql.as_str(), e))?;
        let records = rows
            .iter()
            .map(|row| parse_record(row))
            .collect::<Result<Vec<_>>>()?;
        debug!("Loaded {} version records from {}", records.len(), self.table.name());
        Ok(VersionMap::from_records(records))
    }

    fn save(
        &mut self,
        exec: &mut dyn Executor,
        dialect: &dyn Dialect,
        record: &VersionRecord,
    ) -> Result<()> {
        let sql = dialect.upsert_statement(&self.table)?;
        let params = [
            SqlValue::Text(record.object_name.clone()),
            SqlValue::Text(record.object_type.as_str().to_string()),
            SqlValue::Int(record.version as i64),
            SqlValue::Int(record.data_version as i64),
            SqlValue::DateTime(Utc::now().naive_utc()),
        ];
        debug!(
            "Recording {} {} v{} data v{}",
            record.object_type.as_str(),
            record.object_name,
            record.version,
            record.data_version
        );
        exec.execute(&sql, &params)
            .map_err(|e| SchemaError::execution(self.table.name(), sql, e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bookkeeping_table_definition() {
        let store = DbVersionStore::new(DEFAULT_VERSION_TABLE).unwrap();
        let table = store.table().unwrap();
        assert_eq!(table.name(), "ddl_schema_version");
        assert_eq!(table.primary_key().unwrap().name, "object_name");
        assert_eq!(table.columns().len(), 5);
        assert!(DbVersionStore::new("").is_err());
    }

    #[test]
    fn test_parse_record_accepts_driver_numbers() {
        let rec = parse_record(&[
            SqlValue::Text("im_user.name".into()),
            SqlValue::Text("column".into()),
            SqlValue::Decimal(rust_decimal::Decimal::from(3)),
            SqlValue::Text("0".into()),
        ])
        .unwrap();
        assert_eq!(rec.object_type, ObjectType::Column);
        assert_eq!(rec.version, 3);

        assert!(parse_record(&[SqlValue::Null]).is_err());
        assert!(parse_record(&[
            SqlValue::Text("t".into()),
            SqlValue::Text("table".into()),
            SqlValue::Int(-1),
            SqlValue::Int(0),
        ])
        .is_err());
    }

    /// Executor whose connection is gone.
    struct Disconnected;

    impl Executor for Disconnected {
        fn execute(&mut self, _sql: &str, _params: &[SqlValue]) -> Result<u64> {
            Err(SchemaError::Driver("connection reset".into()))
        }

        fn query(&mut self, _sql: &str, _params: &[SqlValue]) -> Result<Vec<Vec<SqlValue>>> {
            Err(SchemaError::Driver("connection reset".into()))
        }
    }

    #[test]
    fn test_load_failure_names_table_and_statement() {
        use crate::drivers::PostgresDialect;

        let mut store = DbVersionStore::new(DEFAULT_VERSION_TABLE).unwrap();
        let err = store
            .load(&mut Disconnected, &PostgresDialect::default())
            .unwrap_err();
        match err {
            SchemaError::Execution { table, statement, source } => {
                assert_eq!(table, "ddl_schema_version");
                assert!(statement.starts_with("SELECT"));
                assert!(statement.contains("\"ddl_schema_version\""));
                assert!(matches!(*source, SchemaError::Driver(_)));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[cfg(feature = "sqlite")]
    #[test]
    fn test_roundtrip_through_sqlite() {
        use crate::drivers::{SqliteDialect, SqliteExecutor};

        let dialect = SqliteDialect::new(None);
        let mut exec = SqliteExecutor::open_in_memory().unwrap();
        let mut store = DbVersionStore::new(DEFAULT_VERSION_TABLE).unwrap();
        let create = dialect.create_table_statement(store.table().unwrap()).unwrap();
        exec.execute(&create, &[]).unwrap();

        store
            .save(&mut exec, &dialect, &VersionRecord::table("im_user", 1, 0))
            .unwrap();
        store
            .save(&mut exec, &dialect, &VersionRecord::table("im_user", 1, 2))
            .unwrap();
        store
            .save(&mut exec, &dialect, &VersionRecord::column("im_user", "name", 1))
            .unwrap();

        let map = store.load(&mut exec, &dialect).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map.table("im_user").unwrap().data_version, 2);
        assert_eq!(
            map.column("im_user", "name").unwrap().object_type,
            ObjectType::Column
        );
    }
}
