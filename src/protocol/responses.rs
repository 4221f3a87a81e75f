//! Response shapes
//!
//! Success bodies of the file operations and the uniform failure body.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::io;

use crate::error::{WorkspaceError, error_to_status, handle_error};
use crate::storage::{MkdirResult, MoveResult, RenameResult};
use crate::transfer::{UploadFailure, UploadReport, UploadedFile};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MkdirResponse {
    pub success: bool,
    pub message: String,
    pub path: String,
    pub full_path: String,
}

impl From<MkdirResult> for MkdirResponse {
    fn from(result: MkdirResult) -> Self {
        Self {
            success: true,
            message: format!("Directory {} created", result.path),
            path: result.path.to_string(),
            full_path: result.full_path.display().to_string(),
        }
    }
}

/// Body shared by rename and move.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryChangedResponse {
    pub success: bool,
    pub message: String,
    pub old_path: String,
    pub new_path: String,
    pub filename: String,
}

impl From<RenameResult> for EntryChangedResponse {
    fn from(result: RenameResult) -> Self {
        Self {
            success: true,
            message: format!("Renamed {} to {}", result.old_path, result.name),
            old_path: result.old_path.to_string(),
            new_path: result.new_path.to_string(),
            filename: result.name,
        }
    }
}

impl From<MoveResult> for EntryChangedResponse {
    fn from(result: MoveResult) -> Self {
        Self {
            success: true,
            message: format!("Moved {} to {}", result.old_path, result.new_path),
            old_path: result.old_path.to_string(),
            new_path: result.new_path.to_string(),
            filename: result.name,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFileResponse {
    pub original_name: String,
    pub filename: String,
    pub path: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub content_type: String,
}

impl From<UploadedFile> for UploadedFileResponse {
    fn from(file: UploadedFile) -> Self {
        Self {
            original_name: file.original_name,
            filename: file.stored_name,
            path: file.path.to_string(),
            size: file.size,
            content_type: file.content_type,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UploadFailureResponse {
    pub filename: String,
    pub error: String,
}

impl From<UploadFailure> for UploadFailureResponse {
    fn from(failure: UploadFailure) -> Self {
        Self {
            filename: failure.original_name,
            error: failure.reason,
        }
    }
}

/// `success` is true when at least one file was stored or nothing failed.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    pub uploaded: usize,
    pub results: Vec<UploadedFileResponse>,
    pub errors: Vec<UploadFailureResponse>,
    pub target_path: String,
}

impl From<UploadReport> for UploadResponse {
    fn from(report: UploadReport) -> Self {
        let uploaded = report.uploaded();
        Self {
            success: uploaded > 0 || report.errors.is_empty(),
            uploaded,
            target_path: report.target.to_string(),
            results: report.results.into_iter().map(Into::into).collect(),
            errors: report.errors.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub category: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub existing_path: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, category: &'static str) -> Self {
        Self {
            success: false,
            error: error.into(),
            category,
            existing_path: None,
        }
    }
}

/// Failure returned by a handler.
#[derive(Debug)]
pub struct ApiError(pub WorkspaceError);

impl ApiError {
    /// Wraps an I/O failure raised by the HTTP layer itself and logs it.
    pub fn io(operation: &str, error: io::Error) -> Self {
        let error = WorkspaceError::from(error);
        handle_error(operation, &error);
        ApiError(error)
    }
}

impl From<WorkspaceError> for ApiError {
    fn from(error: WorkspaceError) -> Self {
        ApiError(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status: StatusCode = error_to_status(&self.0);
        let mut body = ErrorResponse::new(self.0.public_message(), self.0.category());
        if let WorkspaceError::Conflict { existing_path } = &self.0 {
            body.existing_path = Some(existing_path.clone());
        }
        (status, Json(body)).into_response()
    }
}
