//! Error types
//!
//! Defines the error taxonomy shared by every workspace operation and the
//! startup errors of the server itself.

use std::io;

use thiserror::Error;

/// Message returned to callers for every internal failure.
pub const GENERIC_INTERNAL_MESSAGE: &str = "Internal server error";

/// Workspace operation errors.
///
/// `Validation`, `NotFound` and `Conflict` are terminal client-facing
/// outcomes. `Io` and `Internal` are server faults: their detail is logged,
/// never echoed.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("Invalid input: {reason}")]
    Validation { reason: String },

    #[error("Not found: {path}")]
    NotFound { path: String },

    #[error("Already exists: {existing_path}")]
    Conflict { existing_path: String },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Internal error: {cause}")]
    Internal { cause: String },
}

impl WorkspaceError {
    pub fn validation(reason: impl Into<String>) -> Self {
        WorkspaceError::Validation {
            reason: reason.into(),
        }
    }

    pub fn not_found(path: impl Into<String>) -> Self {
        WorkspaceError::NotFound { path: path.into() }
    }

    pub fn conflict(existing_path: impl Into<String>) -> Self {
        WorkspaceError::Conflict {
            existing_path: existing_path.into(),
        }
    }

    pub fn internal(cause: impl Into<String>) -> Self {
        WorkspaceError::Internal {
            cause: cause.into(),
        }
    }

    /// Machine-checkable category string.
    pub fn category(&self) -> &'static str {
        match self {
            WorkspaceError::Validation { .. } => "validation_error",
            WorkspaceError::NotFound { .. } => "not_found",
            WorkspaceError::Conflict { .. } => "conflict",
            WorkspaceError::Io(_) | WorkspaceError::Internal { .. } => "internal_error",
        }
    }

    /// Whether this is a server-side fault rather than a client mistake.
    pub fn is_internal(&self) -> bool {
        matches!(self, WorkspaceError::Io(_) | WorkspaceError::Internal { .. })
    }

    /// Human-readable message that is safe to send to the caller.
    pub fn public_message(&self) -> String {
        if self.is_internal() {
            GENERIC_INTERNAL_MESSAGE.to_string()
        } else {
            self.to_string()
        }
    }
}

/// Startup errors of the server process.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Workspace error: {0}")]
    Workspace(#[from] WorkspaceError),
}
