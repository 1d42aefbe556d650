//! Typed parameter values for seed rows and probe results.
//!
//! Seed data is never spliced into SQL text: rows are handed to the
//! [`Executor`](crate::core::Executor) as a list of `SqlValue` parameters
//! next to a statement with positional placeholders. Probe and introspection
//! results come back as the same type.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::error::{Result, SchemaError};

/// SQL value enum for type-safe parameter handling.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SqlValue {
    /// NULL.
    Null,

    /// Boolean value.
    Bool(bool),

    /// Any integer width.
    Int(i64),

    /// Floating point.
    Float(f64),

    /// Exact decimal.
    Decimal(Decimal),

    /// Text.
    Text(String),

    /// Binary data.
    Bytes(Vec<u8>),

    /// UUID/GUID.
    Uuid(Uuid),

    /// Date without time.
    Date(NaiveDate),

    /// Time without date.
    Time(NaiveTime),

    /// Date and time without timezone.
    DateTime(NaiveDateTime),

    /// Date and time with offset.
    DateTimeOffset(DateTime<FixedOffset>),
}

impl SqlValue {
    /// Check if this value is NULL.
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Interpret the value as an integer, accepting numeric text and floats
    /// with no fractional part (drivers differ in how COUNT(*) comes back).
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Int(v) => Some(*v),
            SqlValue::Bool(v) => Some(*v as i64),
            SqlValue::Float(v) if v.fract() == 0.0 => Some(*v as i64),
            SqlValue::Decimal(v) if v.fract().is_zero() => v.to_i64(),
            SqlValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Interpret the value as text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Interpret an existence-probe result: any positive count is true.
    pub fn is_truthy(&self) -> bool {
        match self {
            SqlValue::Null => false,
            SqlValue::Bool(v) => *v,
            other => other.as_i64().map(|v| v > 0).unwrap_or(false),
        }
    }

    /// Convert a YAML scalar from a declarative catalog into a value.
    ///
    /// Strings stay text; typed conversion (dates, GUIDs) is the database's
    /// job when the parameter is bound against the column.
    pub fn from_yaml(value: &serde_yaml::Value) -> Result<Self> {
        match value {
            serde_yaml::Value::Null => Ok(SqlValue::Null),
            serde_yaml::Value::Bool(b) => Ok(SqlValue::Bool(*b)),
            serde_yaml::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(SqlValue::Int(i))
                } else if let Some(f) = n.as_f64() {
                    Ok(SqlValue::Float(f))
                } else {
                    Err(SchemaError::Config(format!(
                        "Seed value out of range: {:?}",
                        n
                    )))
                }
            }
            serde_yaml::Value::String(s) => Ok(SqlValue::Text(s.clone())),
            other => Err(SchemaError::Config(format!(
                "Seed values must be scalars, got {:?}",
                other
            ))),
        }
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<i16> for SqlValue {
    fn from(v: i16) -> Self {
        SqlValue::Int(v as i64)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::Int(v as i64)
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Int(v)
    }
}

impl From<u32> for SqlValue {
    fn from(v: u32) -> Self {
        SqlValue::Int(v as i64)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Float(v)
    }
}

impl From<Decimal> for SqlValue {
    fn from(v: Decimal) -> Self {
        SqlValue::Decimal(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(v: Vec<u8>) -> Self {
        SqlValue::Bytes(v)
    }
}

impl From<Uuid> for SqlValue {
    fn from(v: Uuid) -> Self {
        SqlValue::Uuid(v)
    }
}

impl From<NaiveDate> for SqlValue {
    fn from(v: NaiveDate) -> Self {
        SqlValue::Date(v)
    }
}

impl From<NaiveTime> for SqlValue {
    fn from(v: NaiveTime) -> Self {
        SqlValue::Time(v)
    }
}

impl From<NaiveDateTime> for SqlValue {
    fn from(v: NaiveDateTime) -> Self {
        SqlValue::DateTime(v)
    }
}

impl From<DateTime<FixedOffset>> for SqlValue {
    fn from(v: DateTime<FixedOffset>) -> Self {
        SqlValue::DateTimeOffset(v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(SqlValue::Null)
    }
}

/// Build a seed row from heterogeneous values.
///
/// ```rust
/// use ddl_migrate::{row, SqlValue};
///
/// let r = row![1, "admin", None::<i32>];
/// assert_eq!(r[1], SqlValue::Text("admin".into()));
/// assert!(r[2].is_null());
/// ```
#[macro_export]
macro_rules! row {
    ($($value:expr),* $(,)?) => {
        vec![$($crate::SqlValue::from($value)),*]
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_values_truthiness() {
        assert!(SqlValue::Int(1).is_truthy());
        assert!(SqlValue::Int(3).is_truthy());
        assert!(!SqlValue::Int(0).is_truthy());
        assert!(SqlValue::Text("1".into()).is_truthy());
        assert!(SqlValue::Decimal(Decimal::ONE).is_truthy());
        assert!(SqlValue::Float(2.0).is_truthy());
        assert!(!SqlValue::Null.is_truthy());
        assert!(!SqlValue::Text("abc".into()).is_truthy());
    }

    #[test]
    fn test_option_conversion() {
        assert_eq!(SqlValue::from(Some(5)), SqlValue::Int(5));
        assert_eq!(SqlValue::from(None::<&str>), SqlValue::Null);
    }

    #[test]
    fn test_from_yaml_scalars() {
        let v: serde_yaml::Value = serde_yaml::from_str("[1, 2.5, 'x', true, null]").unwrap();
        let seq = v.as_sequence().unwrap();
        let values: Vec<SqlValue> = seq.iter().map(|v| SqlValue::from_yaml(v).unwrap()).collect();
        assert_eq!(
            values,
            vec![
                SqlValue::Int(1),
                SqlValue::Float(2.5),
                SqlValue::Text("x".into()),
                SqlValue::Bool(true),
                SqlValue::Null,
            ]
        );

        let nested: serde_yaml::Value = serde_yaml::from_str("[1, 2]").unwrap();
        assert!(SqlValue::from_yaml(&nested).is_err());
    }

    #[test]
    fn test_row_macro() {
        let r = row![1, "a", 2.5, None::<i64>];
        assert_eq!(r.len(), 4);
        assert_eq!(r[0], SqlValue::Int(1));
        assert!(r[3].is_null());
    }
}
