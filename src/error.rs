use thiserror::Error;

use crate::config::ConfigError;

/// Error type for pgsqldb operations
#[derive(Debug, Error)]
pub enum PgSqlError {
    #[error("Invalid precondition: {0}")]
    InvalidPrecondition(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("{what} {index} is out of range (expected < {len})")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Not connected to a PostgreSQL server")]
    NotConnected,

    #[error("Result shape changed between executions: {0}")]
    ShapeMismatch(String),

    #[error("Cannot encode parameter: {0}")]
    Encode(String),

    #[error("Cannot decode column {column}: {reason}")]
    Decode { column: usize, reason: String },

    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("Runtime error: {0}")]
    Runtime(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl PgSqlError {
    /// Returns true for failures reported by the native client library.
    pub fn is_driver_error(&self) -> bool {
        matches!(
            self,
            PgSqlError::ConnectionFailed(_) | PgSqlError::QueryFailed(_)
        )
    }

    pub(crate) fn out_of_range(what: &'static str, index: usize, len: usize) -> Self {
        PgSqlError::IndexOutOfRange { what, index, len }
    }
}

/// Result type alias for pgsqldb operations
pub type Result<T> = std::result::Result<T, PgSqlError>;
