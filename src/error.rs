use thiserror::Error;

/// Main error type for the match ledger
#[derive(Error, Debug)]
pub enum MatchbookError {
    // Rejections surfaced to the initiating actor
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Not authorized: {0}")]
    Authorization(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    // Storage errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Storage error: {0}")]
    Storage(String),

    // Messaging platform errors
    #[error("External I/O error: {0}")]
    ExternalIo(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // State machine errors
    #[error("Invalid state transition: from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias for MatchbookError
pub type Result<T> = std::result::Result<T, MatchbookError>;

/// Coarse error classes used when reporting a failure back to a user or client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Authorization,
    NotFound,
    Conflict,
    Storage,
    ExternalIo,
    Internal,
}

impl MatchbookError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Authorization(_) => ErrorKind::Authorization,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Database(_) | Self::Migration(_) | Self::Storage(_) => ErrorKind::Storage,
            Self::ExternalIo(_) | Self::Http(_) => ErrorKind::ExternalIo,
            _ => ErrorKind::Internal,
        }
    }

    /// Rejections are caused by the request itself and never leave partial state behind
    pub fn is_rejection(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Validation
                | ErrorKind::Authorization
                | ErrorKind::NotFound
                | ErrorKind::Conflict
        )
    }
}
