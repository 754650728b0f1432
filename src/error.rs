//! Error Types
//!
//! Every failure the transfer engine can report is a [`DbmsError`].
//!
//! # Error Classification
//!
//! - **Configuration**: the map, filter set, actions or parameters are wrong.
//!   Raised immediately; the caller has to fix its configuration.
//! - **Data**: a value could not be turned into XML or an order value.
//!   Aborts the current document.
//! - **Database**: reported by a [`DataHandler`](crate::handler::DataHandler)
//!   and propagated unchanged.

use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, DbmsError>;

/// Category of a failure reported by a data handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseErrorKind {
    /// A foreign key, unique or check constraint rejected the statement
    ConstraintViolation,
    /// The connection to the database failed
    Connection,
    /// The statement itself was rejected (syntax, unknown column, ...)
    Statement,
    /// Anything else
    Other,
}

/// Error raised by a data handler or cursor
#[derive(Debug, Clone, Error)]
#[error("{kind:?}: {message}")]
pub struct DatabaseError {
    pub kind: DatabaseErrorKind,
    pub message: String,
}

impl DatabaseError {
    pub fn new(kind: DatabaseErrorKind, message: impl Into<String>) -> Self {
        DatabaseError {
            kind,
            message: message.into(),
        }
    }

    pub fn constraint_violation(message: impl Into<String>) -> Self {
        Self::new(DatabaseErrorKind::ConstraintViolation, message)
    }

    pub fn statement(message: impl Into<String>) -> Self {
        Self::new(DatabaseErrorKind::Statement, message)
    }

    /// Whether a soft delete may swallow this error
    pub fn is_constraint_violation(&self) -> bool {
        self.kind == DatabaseErrorKind::ConstraintViolation
    }
}

/// Primary error type for the crate
#[derive(Debug, Error)]
pub enum DbmsError {
    // ── Configuration errors ─────────────────────────────────────────────
    /// No action is configured for an element type and there is no default.
    #[error("no action configured for element type {0} and no default action")]
    NoAction(String),

    /// A commit mode string did not name a known mode.
    #[error("invalid commit mode: {0}")]
    InvalidCommitMode(String),

    /// A filter references a table that is not mapped as a class table.
    #[error("table {0} is not mapped as a class table")]
    TableNotMapped(String),

    /// A result-set filter names a result set the caller did not supply.
    #[error("no result set supplied for name {0}")]
    MissingResultSet(String),

    /// The operation does not accept this kind of filter.
    #[error("unsupported filter: {0}")]
    UnsupportedFilter(String),

    /// No data handler is registered for a database.
    #[error("no data handler registered for database {0}")]
    MissingHandler(String),

    /// A condition uses a parameter that has no value.
    #[error("no value bound for parameter {0}")]
    MissingParameter(String),

    /// A parameter value cannot be used where it appears.
    #[error("invalid value for parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    /// A parameter placeholder is not compared against a column of the table.
    #[error("parameter {param} in condition \"{condition}\" is not bound to a column")]
    UnboundParameter { param: String, condition: String },

    /// A qualified name uses a prefix with no namespace declaration.
    #[error("undeclared namespace prefix: {0}")]
    UnknownPrefix(String),

    // ── Data errors ──────────────────────────────────────────────────────
    /// A column flagged as containing XML holds malformed markup.
    #[error("column {column} does not contain well-formed XML: {message}")]
    MalformedXml { column: String, message: String },

    /// A value could not be converted without loss.
    #[error("conversion error: {0}")]
    Conversion(String),

    // ── Database errors ──────────────────────────────────────────────────
    /// Error reported by a data handler.
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),
}

impl DbmsError {
    /// Whether the caller has to fix its map, filter, actions or parameters
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            DbmsError::NoAction(_)
                | DbmsError::InvalidCommitMode(_)
                | DbmsError::TableNotMapped(_)
                | DbmsError::MissingResultSet(_)
                | DbmsError::UnsupportedFilter(_)
                | DbmsError::MissingHandler(_)
                | DbmsError::MissingParameter(_)
                | DbmsError::InvalidParameter { .. }
                | DbmsError::UnboundParameter { .. }
                | DbmsError::UnknownPrefix(_)
        )
    }

    /// Whether the error was caused by the data being transferred
    pub fn is_data(&self) -> bool {
        matches!(self, DbmsError::MalformedXml { .. } | DbmsError::Conversion(_))
    }

    /// The underlying database error, if any
    pub fn as_database(&self) -> Option<&DatabaseError> {
        match self {
            DbmsError::Database(e) => Some(e),
            _ => None,
        }
    }
}
