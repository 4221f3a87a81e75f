//! Error handlers
//!
//! Logs workspace errors at the right level and maps them to HTTP status codes.

use axum::http::StatusCode;
use log::{error, warn};

use crate::error::types::WorkspaceError;

/// Log a workspace error. Internal faults get the full detail, client
/// mistakes a single warning line.
pub fn handle_error(operation: &str, err: &WorkspaceError) {
    if err.is_internal() {
        error!("{} failed: {}", operation, err);
    } else {
        warn!("{} rejected: {}", operation, err);
    }
}

/// Convert error to HTTP status code
pub fn error_to_status(err: &WorkspaceError) -> StatusCode {
    match err {
        WorkspaceError::Validation { .. } => StatusCode::BAD_REQUEST,
        WorkspaceError::NotFound { .. } => StatusCode::NOT_FOUND,
        WorkspaceError::Conflict { .. } => StatusCode::CONFLICT,
        WorkspaceError::Io(_) | WorkspaceError::Internal { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
