//! Common error types for the café back office

use thiserror::Error;

/// Common result type for café operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the service and its repositories
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Write rejected because other rows still depend on the target
    #[error("Conflict: {0}")]
    Conflict(String),

    /// An order needs more of an ingredient than is on hand
    #[error("Stock insuficiente de {item}. Necesario: {needed}, Disponible: {available}")]
    InsufficientStock {
        item: String,
        needed: f64,
        available: f64,
    },

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Classify a failed write.
    ///
    /// Foreign-key violations become [`Error::Conflict`] carrying `context`;
    /// everything else stays a database error.
    pub fn from_write(err: sqlx::Error, context: &str) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.kind() == sqlx::error::ErrorKind::ForeignKeyViolation {
                return Error::Conflict(context.to_string());
            }
        }
        Error::Database(err)
    }
}
