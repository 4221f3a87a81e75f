//! Request bodies
//!
//! JSON request shapes of the file operations. Every field is optional at
//! the serde level so that a missing field is reported as a validation
//! error in the uniform failure shape rather than as a framework rejection.

use serde::Deserialize;

use crate::error::WorkspaceError;

/// `POST /files/mkdir`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MkdirRequest {
    pub target_path: Option<String>,
    pub directory_name: Option<String>,
}

/// `POST /files/rename`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RenameRequest {
    pub current_path: Option<String>,
    pub new_name: Option<String>,
    pub workspace_root: Option<String>,
}

/// `POST /files/move`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MoveRequest {
    pub source_path: Option<String>,
    pub destination_path: Option<String>,
    pub workspace_root: Option<String>,
}

/// Returns the field value or a validation error naming the field.
pub fn required(value: Option<String>, field: &str) -> Result<String, WorkspaceError> {
    value.ok_or_else(|| WorkspaceError::validation(format!("{} is required", field)))
}

/// Like [`required`], but also rejects blank values.
pub fn required_non_blank(value: Option<String>, field: &str) -> Result<String, WorkspaceError> {
    let value = required(value, field)?;
    if value.trim().is_empty() {
        return Err(WorkspaceError::validation(format!("{} is required", field)));
    }
    Ok(value)
}
