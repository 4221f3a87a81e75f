//! Request handlers for the file operations.
//!
//! Each handler turns its request into plain arguments, hands them to the
//! workspace service and renders the outcome. No path handling happens here.

use axum::Json;
use axum::extract::multipart::{Field, MultipartRejection};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, State};
use axum::http::header;
use log::info;
use serde_json::{Value, json};
use std::fs::File;
use std::io::{Seek, SeekFrom};
use tokio::io::AsyncWriteExt;

use crate::error::{WorkspaceError, handle_error};
use crate::protocol::requests::{MkdirRequest, MoveRequest, RenameRequest, required, required_non_blank};
use crate::protocol::responses::{ApiError, EntryChangedResponse, MkdirResponse, UploadResponse};
use crate::protocol::routes::AppState;
use crate::transfer::IncomingFile;

const FILE_FIELDS: [&str; 3] = ["files", "files[]", "file"];
const PATH_FIELD: &str = "path";
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Input rejected before it reaches the service, which logs its own errors.
fn rejected(operation: &str, err: WorkspaceError) -> ApiError {
    handle_error(operation, &err);
    ApiError(err)
}

fn json_body<T>(operation: &str, payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload.map(|Json(body)| body).map_err(|rejection| {
        rejected(
            operation,
            WorkspaceError::validation(format!("malformed request body: {}", rejection.body_text())),
        )
    })
}

/// `GET /health`
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// `POST /files/mkdir`
pub async fn mkdir(
    State(state): State<AppState>,
    payload: Result<Json<MkdirRequest>, JsonRejection>,
) -> Result<Json<MkdirResponse>, ApiError> {
    let request = json_body("mkdir", payload)?;
    let target_path = request.target_path.unwrap_or_default();
    let directory_name =
        required(request.directory_name, "directoryName").map_err(|e| rejected("mkdir", e))?;

    let result = state.service.mkdir(target_path, directory_name).await?;
    Ok(Json(result.into()))
}

/// `POST /files/rename`
pub async fn rename(
    State(state): State<AppState>,
    payload: Result<Json<RenameRequest>, JsonRejection>,
) -> Result<Json<EntryChangedResponse>, ApiError> {
    let request = json_body("rename", payload)?;
    let current_path = required_non_blank(request.current_path, "currentPath")
        .map_err(|e| rejected("rename", e))?;
    let new_name = required(request.new_name, "newName").map_err(|e| rejected("rename", e))?;

    let result = state
        .service
        .rename(request.workspace_root, current_path, new_name)
        .await?;
    Ok(Json(result.into()))
}

/// `POST /files/move`
pub async fn move_entry(
    State(state): State<AppState>,
    payload: Result<Json<MoveRequest>, JsonRejection>,
) -> Result<Json<EntryChangedResponse>, ApiError> {
    let request = json_body("move", payload)?;
    let source_path = required_non_blank(request.source_path, "sourcePath")
        .map_err(|e| rejected("move", e))?;
    let destination_path = required(request.destination_path, "destinationPath")
        .map_err(|e| rejected("move", e))?;

    let result = state
        .service
        .move_entry(request.workspace_root, source_path, destination_path)
        .await?;
    Ok(Json(result.into()))
}

/// `POST /files/upload` (multipart form with `files` parts and a `path` field)
pub async fn upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut multipart = multipart.map_err(|rejection| {
        rejected(
            "upload",
            WorkspaceError::validation(format!("invalid multipart request: {}", rejection.body_text())),
        )
    })?;

    let limit = state.service.max_file_size();
    let mut target_path: Option<String> = None;
    let mut files = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        rejected(
            "upload",
            WorkspaceError::validation(format!("invalid multipart request: {}", e.body_text())),
        )
    })? {
        let name = field.name().unwrap_or_default().to_string();
        if name == PATH_FIELD {
            let value = field.text().await.map_err(|e| {
                rejected(
                    "upload",
                    WorkspaceError::validation(format!("invalid path field: {}", e.body_text())),
                )
            })?;
            target_path = Some(value);
        } else if FILE_FIELDS.contains(&name.as_str()) {
            files.push(spool_field(field, limit).await?);
        }
    }

    if files.is_empty() {
        return Err(rejected("upload", WorkspaceError::validation("no files provided")));
    }

    info!(
        "Received {} file(s) for upload to {}",
        files.len(),
        target_path.as_deref().unwrap_or("/")
    );

    let report = state
        .service
        .upload(target_path.unwrap_or_default(), files)
        .await?;
    Ok(Json(report.into()))
}

/// Streams one multipart part into an anonymous temporary file.
///
/// Reading stops once the part exceeds `limit`; the observed size is then
/// reported as the declared size so the ingestor rejects the file without
/// reading the truncated spool.
async fn spool_field(mut field: Field<'_>, limit: u64) -> Result<IncomingFile<File>, ApiError> {
    let name = field.file_name().unwrap_or_default().to_string();
    let content_type = field
        .content_type()
        .unwrap_or(DEFAULT_CONTENT_TYPE)
        .to_string();
    let declared = field
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok());

    let spool = tempfile::tempfile().map_err(|e| ApiError::io("upload", e))?;
    let mut spool = tokio::fs::File::from_std(spool);
    let mut received: u64 = 0;

    if declared.is_none_or(|size| size <= limit) {
        while let Some(chunk) = field.chunk().await.map_err(|e| {
            rejected(
                "upload",
                WorkspaceError::validation(format!("failed to read {}: {}", name, e.body_text())),
            )
        })? {
            received += chunk.len() as u64;
            if received > limit {
                break;
            }
            spool
                .write_all(&chunk)
                .await
                .map_err(|e| ApiError::io("upload", e))?;
        }
    }

    spool.flush().await.map_err(|e| ApiError::io("upload", e))?;
    let mut reader = spool.into_std().await;
    reader
        .seek(SeekFrom::Start(0))
        .map_err(|e| ApiError::io("upload", e))?;

    let declared_size = if received > limit {
        Some(received)
    } else {
        declared
    };

    Ok(IncomingFile {
        name,
        content_type,
        declared_size,
        reader,
    })
}
