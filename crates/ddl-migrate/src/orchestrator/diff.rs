//! Upgrade planning for an existing table.
//!
//! Compares a declared table against the live columns and index names and
//! decides, per column, whether it is unchanged, renamed or new. Nothing is
//! ever dropped or narrowed. Planning is pure; the orchestrator turns the
//! plan into dialect statements.

use tracing::warn;

use crate::core::schema::{ColumnDef, IndexDef, TableDef};
use crate::core::value::SqlValue;

/// A column as introspected from the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveColumn {
    pub name: String,
    pub nullable: bool,
    /// Character length; `Some(0)` is unbounded, `None` unknown.
    pub size: Option<u32>,
}

impl LiveColumn {
    pub fn new(name: impl Into<String>, nullable: bool, size: Option<u32>) -> Self {
        Self {
            name: name.into(),
            nullable,
            size,
        }
    }

    /// Parse a `column_names_statement` row. Rows without a text name are
    /// skipped; missing attributes read as nullable with unknown length.
    pub fn from_row(row: &[SqlValue]) -> Option<Self> {
        let name = row.first()?.as_str()?.to_string();
        let nullable = match row.get(1) {
            None | Some(SqlValue::Null) => true,
            Some(SqlValue::Text(s)) => {
                s.eq_ignore_ascii_case("yes") || s.eq_ignore_ascii_case("y")
            }
            Some(other) => other.is_truthy(),
        };
        let size = match row.get(2).and_then(SqlValue::as_i64) {
            Some(-1) => Some(0),
            Some(n) if n > 0 => u32::try_from(n).ok(),
            _ => None,
        };
        Some(Self {
            name,
            nullable,
            size,
        })
    }
}

/// What happens to one declared column.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnChange<'a> {
    /// Live column `from` is renamed to the declared name, then altered to
    /// `alter` when the live attributes fall short of the declaration.
    Rename {
        column: &'a ColumnDef,
        from: String,
        alter: Option<ColumnDef>,
    },
    /// Column is missing and is added.
    Add(&'a ColumnDef),
}

/// Changes needed to bring an existing table up to its declaration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpgradePlan<'a> {
    pub columns: Vec<ColumnChange<'a>>,
    pub indexes: Vec<IndexDef>,
}

impl UpgradePlan<'_> {
    /// Whether the table is already up to date.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() && self.indexes.is_empty()
    }
}

/// Plan the upgrade of `table` given its live columns and index names.
///
/// Names compare case-insensitively. A rename picks the first `old_names`
/// entry present live; the renamed column is then live under its new name
/// for the rest of the plan.
pub fn plan_upgrade<'a>(
    table: &'a TableDef,
    live_columns: &[LiveColumn],
    live_indexes: &[String],
) -> UpgradePlan<'a> {
    let mut live: Vec<String> = live_columns.iter().map(|c| c.name.clone()).collect();
    let is_live = |live: &[String], name: &str| live.iter().any(|l| l.eq_ignore_ascii_case(name));

    let mut plan = UpgradePlan::default();
    for column in table.columns() {
        if is_live(&live, &column.name) {
            continue;
        }

        let renamed_from = column.old_names.iter().find_map(|old| {
            live.iter().position(|l| l.eq_ignore_ascii_case(old))
        });

        match renamed_from {
            Some(pos) => {
                let alter = live_columns
                    .iter()
                    .find(|c| c.name.eq_ignore_ascii_case(&live[pos]))
                    .and_then(|attrs| widened(table, column, attrs));
                let from = std::mem::replace(&mut live[pos], column.name.clone());
                plan.columns.push(ColumnChange::Rename { column, from, alter });
            }
            None => {
                live.push(column.name.clone());
                plan.columns.push(ColumnChange::Add(column));
            }
        }
    }

    plan.indexes = table
        .indexes_to_create()
        .into_iter()
        .filter(|idx| !live_indexes.iter().any(|l| l.eq_ignore_ascii_case(&idx.name)))
        .collect();

    plan
}

/// The declared column widened to at least the live length and relaxed to
/// at least the live nullability, or `None` when live already satisfies it.
fn widened(table: &TableDef, column: &ColumnDef, live: &LiveColumn) -> Option<ColumnDef> {
    let mut target = column.clone();
    target.allow_null = column.allow_null || live.nullable;
    let relax = target.allow_null && !live.nullable;

    let mut widen = false;
    if column.data_type.is_string() {
        match live.size {
            Some(0) => target.size = 0,
            Some(n) => {
                if target.size != 0 {
                    target.size = target.size.max(n);
                }
                widen = target.size != n;
            }
            None if relax && target.size != 0 => {
                warn!(
                    "{}: length of {} is unknown, not altering it after the rename",
                    table.name(),
                    live.name
                );
                return None;
            }
            None => {}
        }
    }

    (widen || relax).then_some(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::builder::TableBuilder;
    use crate::core::types::AbstractType;

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    /// Live columns matching `t_table` attributes: nullable, 20 characters.
    fn live(v: &[&str]) -> Vec<LiveColumn> {
        v.iter().map(|n| LiveColumn::new(*n, true, Some(20))).collect()
    }

    fn t_table() -> TableDef {
        TableBuilder::new("T")
            .pk_column("id", AbstractType::Int32)
            .column(
                ColumnDef::new("T2", AbstractType::String)
                    .size(20)
                    .version(2)
                    .old_names(["T21", "T22"]),
            )
            .column(ColumnDef::new("T3", AbstractType::Int32).indexed())
            .build()
            .unwrap()
    }

    #[test]
    fn test_unchanged_table_plans_nothing() {
        let table = t_table();
        let plan = plan_upgrade(&table, &live(&["ID", "t2", "T3"]), &names(&["ix_t_t3"]));
        assert!(plan.is_empty());
    }

    #[test]
    fn test_rename_from_later_old_name() {
        let table = t_table();
        let plan = plan_upgrade(&table, &live(&["id", "T22", "T3"]), &names(&["IX_T_T3"]));
        assert_eq!(plan.columns.len(), 1);
        match &plan.columns[0] {
            ColumnChange::Rename { column, from, alter } => {
                assert_eq!(column.name, "T2");
                assert_eq!(from, "T22");
                assert_eq!(*alter, None);
            }
            other => panic!("expected rename, got {:?}", other),
        }
        assert!(plan.indexes.is_empty());
    }

    #[test]
    fn test_first_old_name_wins() {
        let table = t_table();
        let plan = plan_upgrade(&table, &live(&["id", "T22", "T21", "T3"]), &[]);
        assert!(matches!(
            &plan.columns[0],
            ColumnChange::Rename { from, .. } if from == "T21"
        ));
    }

    #[test]
    fn test_rename_widens_short_live_column() {
        let table = t_table();
        let columns = vec![
            LiveColumn::new("id", false, None),
            LiveColumn::new("T22", true, Some(10)),
            LiveColumn::new("T3", true, None),
        ];
        let plan = plan_upgrade(&table, &columns, &[]);
        match &plan.columns[0] {
            ColumnChange::Rename { alter: Some(target), .. } => {
                assert_eq!(target.name, "T2");
                assert_eq!(target.size, 20);
                assert!(target.allow_null);
            }
            other => panic!("expected widening rename, got {:?}", other),
        }
    }

    #[test]
    fn test_rename_never_narrows_or_tightens() {
        let table = TableBuilder::new("T")
            .pk_column("id", AbstractType::Int32)
            .column(
                ColumnDef::new("code", AbstractType::String)
                    .size(10)
                    .not_null()
                    .old_names(["legacy_code"]),
            )
            .build()
            .unwrap();

        // Longer and nullable live: the declaration would narrow and tighten.
        let wider = vec![LiveColumn::new("legacy_code", true, Some(40))];
        let plan = plan_upgrade(&table, &wider, &[]);
        assert!(matches!(&plan.columns[1], ColumnChange::Rename { alter: None, .. }));

        // Live NOT NULL under a nullable declaration is relaxed.
        let table = TableBuilder::new("T")
            .pk_column("id", AbstractType::Int32)
            .column(ColumnDef::new("qty", AbstractType::Int32).old_names(["amount"]))
            .build()
            .unwrap();
        let strict = vec![LiveColumn::new("amount", false, None)];
        let plan = plan_upgrade(&table, &strict, &[]);
        match &plan.columns[1] {
            ColumnChange::Rename { alter: Some(target), .. } => assert!(target.allow_null),
            other => panic!("expected relaxing rename, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_live_length_skips_alter() {
        let table = t_table();
        let columns = vec![LiveColumn::new("T21", false, None)];
        let plan = plan_upgrade(&table, &columns, &[]);
        assert!(matches!(&plan.columns[1], ColumnChange::Rename { alter: None, .. }));
    }

    #[test]
    fn test_live_column_from_row() {
        let row = vec![SqlValue::from("Name"), "NO".into(), SqlValue::Int(-1)];
        assert_eq!(
            LiveColumn::from_row(&row),
            Some(LiveColumn::new("Name", false, Some(0)))
        );

        let row = vec![
            SqlValue::from("code"),
            "Y".into(),
            SqlValue::Decimal(rust_decimal::Decimal::new(40, 0)),
        ];
        assert_eq!(
            LiveColumn::from_row(&row),
            Some(LiveColumn::new("code", true, Some(40)))
        );

        let row = vec![SqlValue::from("id"), SqlValue::Int(0), SqlValue::Null];
        assert_eq!(LiveColumn::from_row(&row), Some(LiveColumn::new("id", false, None)));

        assert_eq!(
            LiveColumn::from_row(&[SqlValue::from("bare")]),
            Some(LiveColumn::new("bare", true, None))
        );
        assert_eq!(LiveColumn::from_row(&[SqlValue::Int(1)]), None);
    }

    #[test]
    fn test_missing_columns_and_indexes_are_added() {
        let table = t_table();
        let plan = plan_upgrade(&table, &live(&["id"]), &[]);
        assert_eq!(plan.columns.len(), 2);
        assert!(matches!(plan.columns[0], ColumnChange::Add(c) if c.name == "T2"));
        assert!(matches!(plan.columns[1], ColumnChange::Add(c) if c.name == "T3"));
        assert_eq!(plan.indexes.len(), 1);
        assert_eq!(plan.indexes[0].name, "IX_T_T3");
    }

    #[test]
    fn test_live_extra_columns_are_left_alone() {
        let table = t_table();
        let plan = plan_upgrade(
            &table,
            &live(&["id", "T2", "T3", "legacy"]),
            &names(&["IX_T_T3", "IX_T_legacy"]),
        );
        assert!(plan.is_empty());
    }
}
