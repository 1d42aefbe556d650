//! Error types for schema definition and migration.

use thiserror::Error;

/// Broad error classes.
///
/// Configuration, reference and resolution errors are always raised before
/// any statement is sent to the database; execution errors abort the rest of
/// the current run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid declaration or unmapped type.
    Configuration,
    /// Dangling or cyclic foreign key.
    Reference,
    /// No dialect for a connection, or an operation the dialect cannot do.
    DialectResolution,
    /// Driver-level failure running a generated statement.
    Execution,
    /// Everything else (I/O, parsing, cancellation).
    Other,
}

/// Main error type for schema operations.
#[derive(Error, Debug)]
pub enum SchemaError {
    /// Generic configuration error (invalid YAML values, bad identifiers, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Column declared twice in the same table (names compare case-insensitively)
    #[error("Table {table}: column '{column}' is already declared")]
    DuplicateColumn { table: String, column: String },

    /// Primary key column declared more than once
    #[error("Table {table}: primary key column is already declared")]
    DuplicatePrimaryKey { table: String },

    /// Index names a column the table does not declare
    #[error("Table {table}: index '{index}' references unknown column '{column}'")]
    UnknownColumn {
        table: String,
        index: String,
        column: String,
    },

    /// Seed row value count does not match the column count
    #[error("Table {table}: seed row {row} has {actual} values, expected {expected}")]
    ArityMismatch {
        table: String,
        row: usize,
        expected: usize,
        actual: usize,
    },

    /// Operation needs a primary key (seed data upsert)
    #[error("Table {0} has no primary key - seed data requires a primary key")]
    MissingPrimaryKey(String),

    /// Abstract type has no native mapping in the dialect
    #[error("Dialect {dialect} has no native type for {data_type}")]
    UnsupportedType { dialect: String, data_type: String },

    /// Foreign key points at a missing table or at a non-primary-key column
    #[error("Table {table}: column '{column}' references {target}, which {reason}")]
    DanglingReference {
        table: String,
        column: String,
        target: String,
        reason: String,
    },

    /// Foreign keys form a cycle
    #[error("Foreign key cycle between tables: {}", tables.join(", "))]
    SchemaCycle { tables: Vec<String> },

    /// No registered dialect claims the connection
    #[error("No dialect registered for provider '{hint}'")]
    DialectNotFound { hint: String },

    /// Dialect cannot perform the requested operation
    #[error("Dialect {dialect} does not support {operation}")]
    NotSupported { dialect: String, operation: String },

    /// Generated statement failed
    #[error("Statement failed for table {table}: {source}\n  Statement: {statement}")]
    Execution {
        table: String,
        statement: String,
        #[source]
        source: Box<SchemaError>,
    },

    /// Driver-reported failure from an external executor
    #[error("Driver error: {0}")]
    Driver(String),

    /// Embedded SQLite error
    #[cfg(feature = "sqlite")]
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Run was cancelled by the caller
    #[error("Schema run cancelled")]
    Cancelled,
}

impl SchemaError {
    /// Create an Execution error wrapping the driver failure.
    pub fn execution(
        table: impl Into<String>,
        statement: impl Into<String>,
        source: SchemaError,
    ) -> Self {
        SchemaError::Execution {
            table: table.into(),
            statement: statement.into(),
            source: Box::new(source),
        }
    }

    /// Create an UnsupportedType error.
    pub fn unsupported_type(dialect: impl Into<String>, data_type: impl ToString) -> Self {
        SchemaError::UnsupportedType {
            dialect: dialect.into(),
            data_type: data_type.to_string(),
        }
    }

    /// Create a NotSupported error.
    pub fn not_supported(dialect: impl Into<String>, operation: impl Into<String>) -> Self {
        SchemaError::NotSupported {
            dialect: dialect.into(),
            operation: operation.into(),
        }
    }

    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SchemaError::Config(_)
            | SchemaError::DuplicateColumn { .. }
            | SchemaError::DuplicatePrimaryKey { .. }
            | SchemaError::UnknownColumn { .. }
            | SchemaError::ArityMismatch { .. }
            | SchemaError::MissingPrimaryKey(_)
            | SchemaError::UnsupportedType { .. } => ErrorKind::Configuration,
            SchemaError::DanglingReference { .. } | SchemaError::SchemaCycle { .. } => {
                ErrorKind::Reference
            }
            SchemaError::DialectNotFound { .. } | SchemaError::NotSupported { .. } => {
                ErrorKind::DialectResolution
            }
            SchemaError::Execution { .. } | SchemaError::Driver(_) => ErrorKind::Execution,
            #[cfg(feature = "sqlite")]
            SchemaError::Sqlite(_) => ErrorKind::Execution,
            SchemaError::Io(_)
            | SchemaError::Yaml(_)
            | SchemaError::Json(_)
            | SchemaError::Cancelled => ErrorKind::Other,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for schema operations.
pub type Result<T> = std::result::Result<T, SchemaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        let err = SchemaError::DuplicateColumn {
            table: "t".into(),
            column: "c".into(),
        };
        assert_eq!(err.kind(), ErrorKind::Configuration);

        let err = SchemaError::SchemaCycle {
            tables: vec!["a".into(), "b".into()],
        };
        assert_eq!(err.kind(), ErrorKind::Reference);
        assert!(err.to_string().contains("a, b"));

        let err = SchemaError::not_supported("oracle", "CREATE DATABASE");
        assert_eq!(err.kind(), ErrorKind::DialectResolution);
    }

    #[test]
    fn test_execution_error_keeps_context() {
        let err = SchemaError::execution(
            "im_user",
            "CREATE TABLE \"im_user\" ()",
            SchemaError::Driver("syntax error".into()),
        );
        assert_eq!(err.kind(), ErrorKind::Execution);

        let detailed = err.format_detailed();
        assert!(detailed.contains("im_user"));
        assert!(detailed.contains("CREATE TABLE"));
        assert!(detailed.contains("Caused by"));
        assert!(detailed.contains("syntax error"));
    }
}
