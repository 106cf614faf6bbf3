//! Error types for pgchain

use crate::query::StatementKind;
use thiserror::Error;

/// Result type alias for pgchain operations
pub type SqlResult<T> = Result<T, SqlError>;

/// Errors raised while compiling or executing a statement.
///
/// The first group is detected at compile time, before any I/O. The second group
/// only originates from the executor boundary.
#[derive(Debug, Error)]
pub enum SqlError {
    /// The method log implies two mutually exclusive statement kinds
    #[error("Conflicting statement kind: {first} and {second} cannot be combined")]
    ConflictingStatementKind {
        first: StatementKind,
        second: StatementKind,
    },

    /// Insert column/value call counts or per-row value counts disagree
    #[error("Arity mismatch: {0}")]
    ArityMismatch(String),

    /// A statement kind that requires a target has none
    #[error("Empty statement: {0} requires a target table")]
    EmptyStatement(StatementKind),

    /// A condition input is neither a mapping, a raw fragment nor a nested condition
    #[error("Malformed condition: {0}")]
    MalformedCondition(String),

    /// Identifier or input validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Query execution error
    #[error("Query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// Row not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Unique constraint violation
    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    /// Foreign key constraint violation
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// Check constraint violation
    #[error("Check constraint violation: {0}")]
    CheckViolation(String),

    /// Row decode error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },
}

impl SqlError {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a malformed condition error
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedCondition(message.into())
    }

    /// Create an arity mismatch error
    pub fn arity(message: impl Into<String>) -> Self {
        Self::ArityMismatch(message.into())
    }

    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if this error was raised while compiling, before any I/O.
    pub fn is_compile_error(&self) -> bool {
        matches!(
            self,
            Self::ConflictingStatementKind { .. }
                | Self::ArityMismatch(_)
                | Self::EmptyStatement(_)
                | Self::MalformedCondition(_)
                | Self::Validation(_)
        )
    }

    /// Parse a tokio_postgres error into a more specific SqlError
    pub fn from_db_error(err: tokio_postgres::Error) -> Self {
        if let Some(db_err) = err.as_db_error() {
            let constraint = db_err.constraint().unwrap_or("unknown");
            let message = db_err.message();

            match db_err.code().code() {
                "23505" => return Self::UniqueViolation(format!("{}: {}", constraint, message)),
                "23503" => {
                    return Self::ForeignKeyViolation(format!("{}: {}", constraint, message));
                }
                "23514" => return Self::CheckViolation(format!("{}: {}", constraint, message)),
                _ => {}
            }
        }
        Self::Query(err)
    }
}
