// src/error.rs
use axum::http::StatusCode;
use thiserror::Error;

/// Every failure an operation can report to its caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PollError {
    #[error("{}", .0.join(", "))]
    Validation(Vec<String>),

    #[error("Not authenticated")]
    Authentication,

    #[error("{0}")]
    Authorization(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Storage(String),

    #[error("Session unavailable: {0}")]
    Session(String),
}

impl PollError {
    pub fn validation(message: impl Into<String>) -> Self {
        PollError::Validation(vec![message.into()])
    }

    /// Stable taxonomy name, independent of the message.
    pub fn kind(&self) -> &'static str {
        match self {
            PollError::Validation(_) => "ValidationError",
            PollError::Authentication => "AuthenticationError",
            PollError::Authorization(_) => "AuthorizationError",
            PollError::NotFound(_) => "NotFoundError",
            PollError::Conflict(_) => "ConflictError",
            PollError::Storage(_) => "StorageError",
            PollError::Session(_) => "SessionError",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            PollError::Validation(_) => StatusCode::BAD_REQUEST,
            PollError::Authentication => StatusCode::UNAUTHORIZED,
            PollError::Authorization(_) => StatusCode::FORBIDDEN,
            PollError::NotFound(_) => StatusCode::NOT_FOUND,
            PollError::Conflict(_) => StatusCode::CONFLICT,
            PollError::Storage(_) | PollError::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Rejection raised by a storage backend. The message is surfaced verbatim.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct StorageError {
    pub message: String,
}

impl StorageError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<sqlx::Error> for StorageError {
    fn from(e: sqlx::Error) -> Self {
        StorageError::new(e.to_string())
    }
}

impl From<StorageError> for PollError {
    fn from(e: StorageError) -> Self {
        PollError::Storage(e.message)
    }
}

/// The session context could not be read at all. "No session" is not an error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct SessionError(pub String);

impl From<SessionError> for PollError {
    fn from(e: SessionError) -> Self {
        PollError::Session(e.0)
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid {key} value: {message}")]
    Invalid { key: String, message: String },
}

#[derive(Error, Debug)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Database connection failed: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Invalid bind address: {0}")]
    Address(#[from] std::net::AddrParseError),

    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),
}
