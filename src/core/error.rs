/// liteorm Error Module
///
/// This module defines the error type shared by every layer of the mapper.
/// Engine errors are passed through unwrapped in `OrmError::Database`; the
/// remaining variants describe failures the mapper detects itself.
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Matches SQLite's message for a statement against a table that does not exist.
static MISSING_TABLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^no such table: (\S+)").expect("valid missing-table pattern"));

/// Error type for all mapper operations.
///
/// The variants cover:
/// - Unknown logical database names
/// - Use of a released connection
/// - Schema requirements (primary key for update/delete)
/// - Entity registration and column mapping problems
/// - Values that cannot be coerced into a field's type
/// - Configuration loading
/// - SQLite and file system failures
#[derive(Error, Debug)]
pub enum OrmError {
    /// Database-related errors from SQLite operations
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The logical database name is not registered
    #[error("Database not found: {0}")]
    NotFound(String),

    /// An operation was attempted on a released connection
    #[error("Connection error: {0}")]
    Connection(String),

    /// The table layout does not support the requested operation
    #[error("Schema error: {0}")]
    Schema(String),

    /// Invalid entity registration or nothing left to map
    #[error("Mapping error: {0}")]
    Mapping(String),

    /// A stored value cannot be converted to the field's type
    #[error("Conversion error: cannot convert {value} ({source_type}) to {target_type}")]
    Conversion {
        value: String,
        source_type: &'static str,
        target_type: &'static str,
    },

    /// Configuration loading and validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File system and I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl OrmError {
    /// Returns the table name if this error is SQLite reporting a missing table.
    pub fn missing_table(&self) -> Option<&str> {
        let message = match self {
            OrmError::Database(rusqlite::Error::SqliteFailure(_, Some(message))) => message,
            _ => return None,
        };
        MISSING_TABLE
            .captures(message)
            .and_then(|captures| captures.get(1))
            .map(|table| table.as_str())
    }

    /// Checks whether this error is SQLite reporting a missing table.
    pub fn is_missing_table(&self) -> bool {
        self.missing_table().is_some()
    }
}

/// Type alias for Result to use OrmError as the error type.
pub type Result<T> = std::result::Result<T, OrmError>;
