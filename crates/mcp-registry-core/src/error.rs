//! Error types for the registry core.
//!
//! Storage backends raise the domain kinds (`NotFound`, `AlreadyExists`,
//! `InvalidVersion`, `InvalidInput`) directly. The service layer passes them
//! through untouched and only adds `Timeout`. Everything else is internal.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Main error type for the registry core.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Server with ID {id} not found")]
    NotFound { id: String },

    #[error("Server {name} version {version} already exists")]
    AlreadyExists { name: String, version: String },

    #[error("Cannot publish older version {version} after newer version {latest}")]
    InvalidVersion { version: String, latest: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Database operation {operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    // Storage errors
    #[error("Database error: {message}")]
    Database {
        message: String,
        #[source]
        source: Option<rusqlite::Error>,
    },

    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    #[error("{0}")]
    Other(String),
}

/// Result type alias for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Stable error taxonomy exposed to adapters.
///
/// Adapters (the HTTP layer) map these to their own status codes; they should
/// never need to match on individual [`RegistryError`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    InvalidVersion,
    InvalidInput,
    OperationTimedOut,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::AlreadyExists => "already_exists",
            ErrorKind::InvalidVersion => "invalid_version",
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::OperationTimedOut => "operation_timed_out",
            ErrorKind::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<std::io::Error> for RegistryError {
    fn from(err: std::io::Error) -> Self {
        RegistryError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for RegistryError {
    fn from(err: serde_json::Error) -> Self {
        RegistryError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<rusqlite::Error> for RegistryError {
    fn from(err: rusqlite::Error) -> Self {
        RegistryError::Database {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl RegistryError {
    /// Shorthand for an [`RegistryError::InvalidInput`].
    pub fn invalid_input(message: impl Into<String>) -> Self {
        RegistryError::InvalidInput {
            message: message.into(),
        }
    }

    /// Collapse this error into the stable taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            RegistryError::NotFound { .. } => ErrorKind::NotFound,
            RegistryError::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            RegistryError::InvalidVersion { .. } => ErrorKind::InvalidVersion,
            RegistryError::InvalidInput { .. } => ErrorKind::InvalidInput,
            RegistryError::Timeout { .. } => ErrorKind::OperationTimedOut,
            RegistryError::Database { .. }
            | RegistryError::Io { .. }
            | RegistryError::Json { .. }
            | RegistryError::Other(_) => ErrorKind::Internal,
        }
    }

    /// True for the kinds a client can fix by changing its request.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::NotFound
                | ErrorKind::AlreadyExists
                | ErrorKind::InvalidVersion
                | ErrorKind::InvalidInput
        )
    }
}
