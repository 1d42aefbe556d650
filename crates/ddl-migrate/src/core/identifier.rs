//! Identifier validation, quoting and literal escaping.
//!
//! Table, column and index names are spliced into DDL text because identifiers
//! cannot be bound as parameters. Every name that reaches a dialect has been
//! through [`validate_identifier`] when the table was built, and each dialect
//! quotes it with one of the helpers below.

use crate::error::{Result, SchemaError};

/// Maximum identifier length (conservative limit across databases).
/// - PostgreSQL: 63 bytes
/// - SQL Server: 128 characters
/// - Oracle (12.2+): 128 bytes
pub const MAX_IDENTIFIER_LENGTH: usize = 128;

/// Validate an identifier.
///
/// Rejects empty names, names containing a NUL byte and names longer than
/// [`MAX_IDENTIFIER_LENGTH`] bytes.
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(SchemaError::Config(
            "Identifier cannot be empty".to_string(),
        ));
    }

    if name.contains('\0') {
        return Err(SchemaError::Config(format!(
            "Identifier contains null byte: {:?}",
            name
        )));
    }

    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(SchemaError::Config(format!(
            "Identifier exceeds maximum length of {} bytes (got {} bytes): {:?}",
            MAX_IDENTIFIER_LENGTH,
            name.len(),
            name
        )));
    }

    Ok(())
}

/// Wrap in double quotes, doubling embedded quotes (PostgreSQL, SQLite, Oracle).
pub fn quote_double(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Wrap in brackets, doubling closing brackets (SQL Server).
pub fn quote_brackets(name: &str) -> String {
    format!("[{}]", name.replace(']', "]]"))
}

/// Wrap in backticks, doubling embedded backticks (MySQL).
pub fn quote_backtick(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Render a string literal with doubled single quotes.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Build a constraint or index name from a prefix, the table and its columns,
/// e.g. `IX_im_user_name`.
pub fn constraint_name(prefix: &str, table: &str, columns: &[&str]) -> String {
    let mut name = format!("{}_{}", prefix, table);
    for col in columns {
        name.push('_');
        name.push_str(col);
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_identifier_normal() {
        assert!(validate_identifier("users").is_ok());
        assert!(validate_identifier("im_user_pref").is_ok());
        assert!(validate_identifier("column with spaces").is_ok());
        assert!(validate_identifier("日本語").is_ok());
    }

    #[test]
    fn test_validate_identifier_rejects_empty() {
        let result = validate_identifier("");
        assert!(result.unwrap_err().to_string().contains("empty"));
    }

    #[test]
    fn test_validate_identifier_rejects_null_byte() {
        let result = validate_identifier("table\0name");
        assert!(result.unwrap_err().to_string().contains("null byte"));
    }

    #[test]
    fn test_validate_identifier_length_limit() {
        let max_name = "a".repeat(MAX_IDENTIFIER_LENGTH);
        assert!(validate_identifier(&max_name).is_ok());

        let long_name = "a".repeat(MAX_IDENTIFIER_LENGTH + 1);
        let result = validate_identifier(&long_name);
        assert!(result.unwrap_err().to_string().contains("maximum length"));
    }

    #[test]
    fn test_quoting_escapes_delimiters() {
        assert_eq!(quote_double("table\"name"), "\"table\"\"name\"");
        assert_eq!(quote_brackets("table]name"), "[table]]name]");
        assert_eq!(quote_backtick("table`name"), "`table``name`");
        assert_eq!(
            quote_double("Robert'); DROP TABLE Students;--"),
            "\"Robert'); DROP TABLE Students;--\""
        );
    }

    #[test]
    fn test_quote_literal() {
        assert_eq!(quote_literal("it's"), "'it''s'");
        assert_eq!(quote_literal(""), "''");
    }

    #[test]
    fn test_constraint_name() {
        assert_eq!(constraint_name("PK", "im_user", &[]), "PK_im_user");
        assert_eq!(
            constraint_name("IX", "im_user_pref", &["user_id", "key"]),
            "IX_im_user_pref_user_id_key"
        );
    }
}
