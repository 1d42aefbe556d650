//! Abstract column types and default-value markers.
//!
//! Columns are declared against [`AbstractType`], a fixed enumeration that is
//! independent of any database engine. Each dialect owns the table that maps
//! an abstract type (plus size and scale) to its native type string.
//!
//! The serialized names are stable: existing YAML catalogs refer to them.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Database-agnostic column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbstractType {
    // ===== Integer Types =====
    /// 8-bit signed integer.
    #[serde(rename = "sbyte", alias = "int8")]
    SByte,
    /// 8-bit unsigned integer.
    #[serde(alias = "uint8")]
    Byte,
    /// 16-bit signed integer.
    Int16,
    /// 16-bit unsigned integer.
    #[serde(rename = "uint16")]
    UInt16,
    /// 32-bit signed integer.
    #[serde(alias = "int")]
    Int32,
    /// 32-bit unsigned integer.
    #[serde(rename = "uint32")]
    UInt32,
    /// 64-bit signed integer.
    #[serde(alias = "long")]
    Int64,
    /// 64-bit unsigned integer.
    #[serde(rename = "uint64")]
    UInt64,

    // ===== Decimal / Floating Point =====
    /// Exact decimal; `size` is precision, `scale` digits after the point.
    Decimal,
    /// Exact numeric with engine-chosen precision when `size` is 0.
    #[serde(alias = "numeric")]
    VarNumeric,
    /// Currency amount (fixed 19,4 where the engine has no money type).
    Currency,
    /// 32-bit floating point.
    #[serde(alias = "float")]
    Single,
    /// 64-bit floating point.
    Double,

    // ===== Boolean =====
    /// Boolean/bit.
    #[serde(alias = "bool")]
    Boolean,

    // ===== String Types =====
    /// Variable-length Unicode string; `size` 0 means unbounded.
    String,
    /// Variable-length non-Unicode string.
    AnsiString,
    /// Fixed-length Unicode string.
    StringFixedLength,
    /// Fixed-length non-Unicode string.
    AnsiStringFixedLength,

    // ===== Binary =====
    /// Variable-length binary; `size` 0 means unbounded.
    Binary,

    // ===== Date/Time Types =====
    /// Date only.
    Date,
    /// Date and time.
    #[serde(alias = "datetime")]
    DateTime,
    /// Date and time with extended range and precision.
    #[serde(alias = "datetime2")]
    DateTime2,
    /// Date and time with a UTC offset.
    #[serde(alias = "datetimeoffset")]
    DateTimeOffset,
    /// Time of day.
    Time,

    // ===== Special Types =====
    /// 128-bit identifier.
    #[serde(alias = "uuid")]
    Guid,
    /// XML document.
    Xml,
    /// Opaque object. No built-in dialect maps it.
    Object,
}

impl AbstractType {
    /// Whether `size` is a character length for this type.
    pub fn is_string(self) -> bool {
        matches!(
            self,
            AbstractType::String
                | AbstractType::AnsiString
                | AbstractType::StringFixedLength
                | AbstractType::AnsiStringFixedLength
        )
    }

    /// Whether the type stores Unicode text.
    pub fn is_unicode(self) -> bool {
        matches!(
            self,
            AbstractType::String | AbstractType::StringFixedLength | AbstractType::Xml
        )
    }

    /// Whether the type is an integer of any width.
    pub fn is_integer(self) -> bool {
        matches!(
            self,
            AbstractType::SByte
                | AbstractType::Byte
                | AbstractType::Int16
                | AbstractType::UInt16
                | AbstractType::Int32
                | AbstractType::UInt32
                | AbstractType::Int64
                | AbstractType::UInt64
        )
    }

    /// Whether the type is a date and/or time.
    pub fn is_temporal(self) -> bool {
        matches!(
            self,
            AbstractType::Date
                | AbstractType::DateTime
                | AbstractType::DateTime2
                | AbstractType::DateTimeOffset
                | AbstractType::Time
        )
    }
}

impl std::fmt::Display for AbstractType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AbstractType::SByte => "SByte",
            AbstractType::Byte => "Byte",
            AbstractType::Int16 => "Int16",
            AbstractType::UInt16 => "UInt16",
            AbstractType::Int32 => "Int32",
            AbstractType::UInt32 => "UInt32",
            AbstractType::Int64 => "Int64",
            AbstractType::UInt64 => "UInt64",
            AbstractType::Decimal => "Decimal",
            AbstractType::VarNumeric => "VarNumeric",
            AbstractType::Currency => "Currency",
            AbstractType::Single => "Single",
            AbstractType::Double => "Double",
            AbstractType::Boolean => "Boolean",
            AbstractType::String => "String",
            AbstractType::AnsiString => "AnsiString",
            AbstractType::StringFixedLength => "StringFixedLength",
            AbstractType::AnsiStringFixedLength => "AnsiStringFixedLength",
            AbstractType::Binary => "Binary",
            AbstractType::Date => "Date",
            AbstractType::DateTime => "DateTime",
            AbstractType::DateTime2 => "DateTime2",
            AbstractType::DateTimeOffset => "DateTimeOffset",
            AbstractType::Time => "Time",
            AbstractType::Guid => "Guid",
            AbstractType::Xml => "Xml",
            AbstractType::Object => "Object",
        };
        f.write_str(name)
    }
}

/// Column default value.
///
/// Literals are rendered by the dialect with its own quoting rules. The
/// reserved markers are always rendered as server-side expressions so the
/// value is computed when the row is written, never when SQL is generated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultValue {
    /// Text literal.
    Text(String),
    /// Integer literal.
    Integer(i64),
    /// Exact decimal literal.
    Decimal(Decimal),
    /// Floating point literal.
    Float(f64),
    /// Boolean literal.
    Boolean(bool),
    /// Server-local current date and time.
    CurrentDateTime,
    /// Current UTC date and time.
    CurrentUtcDateTime,
    /// Current date.
    CurrentDate,
    /// Server-generated GUID.
    NewGuid,
}

impl DefaultValue {
    /// Whether this is a reserved server-side marker rather than a literal.
    pub fn is_reserved(&self) -> bool {
        matches!(
            self,
            DefaultValue::CurrentDateTime
                | DefaultValue::CurrentUtcDateTime
                | DefaultValue::CurrentDate
                | DefaultValue::NewGuid
        )
    }
}

impl From<&str> for DefaultValue {
    fn from(v: &str) -> Self {
        DefaultValue::Text(v.to_string())
    }
}

impl From<String> for DefaultValue {
    fn from(v: String) -> Self {
        DefaultValue::Text(v)
    }
}

impl From<i64> for DefaultValue {
    fn from(v: i64) -> Self {
        DefaultValue::Integer(v)
    }
}

impl From<i32> for DefaultValue {
    fn from(v: i32) -> Self {
        DefaultValue::Integer(v as i64)
    }
}

impl From<bool> for DefaultValue {
    fn from(v: bool) -> Self {
        DefaultValue::Boolean(v)
    }
}

impl From<Decimal> for DefaultValue {
    fn from(v: Decimal) -> Self {
        DefaultValue::Decimal(v)
    }
}

impl From<f64> for DefaultValue {
    fn from(v: f64) -> Self {
        DefaultValue::Float(v)
    }
}

/// Render a float so it reads back exactly and never uses exponent or
/// locale-dependent separators.
pub(crate) fn format_float(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{:.1}", v)
    } else {
        format!("{}", v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_abstract_type_serde_names() {
        let t: AbstractType = serde_yaml::from_str("date_time_offset").unwrap();
        assert_eq!(t, AbstractType::DateTimeOffset);

        let t: AbstractType = serde_yaml::from_str("ansi_string_fixed_length").unwrap();
        assert_eq!(t, AbstractType::AnsiStringFixedLength);

        // Aliases
        let t: AbstractType = serde_yaml::from_str("uuid").unwrap();
        assert_eq!(t, AbstractType::Guid);
        let t: AbstractType = serde_yaml::from_str("int").unwrap();
        assert_eq!(t, AbstractType::Int32);

        assert_eq!(
            serde_yaml::to_string(&AbstractType::UInt64).unwrap().trim(),
            "uint64"
        );
    }

    #[test]
    fn test_abstract_type_classification() {
        assert!(AbstractType::AnsiString.is_string());
        assert!(!AbstractType::AnsiString.is_unicode());
        assert!(AbstractType::StringFixedLength.is_unicode());
        assert!(AbstractType::UInt16.is_integer());
        assert!(!AbstractType::Decimal.is_integer());
        assert!(AbstractType::Time.is_temporal());
        assert_eq!(AbstractType::DateTime2.to_string(), "DateTime2");
    }

    #[test]
    fn test_default_value_markers() {
        assert!(DefaultValue::CurrentDateTime.is_reserved());
        assert!(DefaultValue::NewGuid.is_reserved());
        assert!(!DefaultValue::from("now").is_reserved());
        assert_eq!(
            DefaultValue::from(Decimal::from_str("1.50").unwrap()),
            DefaultValue::Decimal(Decimal::from_str("1.50").unwrap())
        );
    }

    #[test]
    fn test_format_float_is_invariant() {
        assert_eq!(format_float(1.0), "1.0");
        assert_eq!(format_float(0.25), "0.25");
        assert_eq!(format_float(-3.5), "-3.5");
    }
}
