//! Storage result types
//!
//! Defines result structures returned by storage operations.

use std::path::PathBuf;

use crate::storage::filesystem::MoveMethod;
use crate::storage::validation::RelativePath;

/// Result of a directory creation
#[derive(Debug, Clone)]
pub struct MkdirResult {
    pub path: RelativePath,
    pub full_path: PathBuf,
}

/// Result of a rename
#[derive(Debug, Clone)]
pub struct RenameResult {
    pub old_path: RelativePath,
    pub new_path: RelativePath,
    pub name: String,
}

/// Result of a move into another directory
#[derive(Debug, Clone)]
pub struct MoveResult {
    pub old_path: RelativePath,
    pub new_path: RelativePath,
    pub name: String,
    pub method: MoveMethod,
}
