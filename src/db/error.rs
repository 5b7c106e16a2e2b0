//! Database error definitions.

use thiserror::Error;

/// Errors that can occur while talking to the database.
#[derive(Debug, Error)]
pub enum DbError {
    /// The database could not be opened at startup.
    #[error("failed to connect to database {dsn}: {source}")]
    Connect {
        dsn: String,
        #[source]
        source: rusqlite::Error,
    },

    /// Statement preparation or execution failed.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A table or column name failed the identifier check.
    #[error("invalid SQL identifier: {0:?}")]
    InvalidIdentifier(String),

    /// A named parameter does not appear in the statement.
    #[error("statement has no parameter named {0}")]
    UnknownParameter(String),

    /// INSERT/UPDATE called without any columns.
    #[error("no fields given for table {0}")]
    EmptyFields(String),
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;
