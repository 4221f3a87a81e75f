//! Conflict policy
//!
//! Decides whether an operation may proceed given the current state of a
//! resolved path. A symlink is classified by its target, which resolution
//! has already confined to the workspace. A dangling link counts as an
//! occupied file name.

use std::fs;
use std::io;

use crate::error::WorkspaceError;
use crate::storage::validation::ResolvedPath;

/// What currently occupies a resolved path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    File,
}

/// Inspect what occupies a path.
pub fn entry_kind(path: &ResolvedPath) -> Result<Option<EntryKind>, WorkspaceError> {
    match fs::symlink_metadata(path.absolute()) {
        Ok(metadata) if metadata.is_dir() => Ok(Some(EntryKind::Directory)),
        Ok(metadata) if metadata.file_type().is_symlink() => {
            match fs::metadata(path.absolute()) {
                Ok(target) if target.is_dir() => Ok(Some(EntryKind::Directory)),
                _ => Ok(Some(EntryKind::File)),
            }
        }
        Ok(_) => Ok(Some(EntryKind::File)),
        Err(e) if matches!(e.kind(), io::ErrorKind::NotFound | io::ErrorKind::NotADirectory) => {
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// The path must denote an existing entry.
pub fn require_exists(path: &ResolvedPath) -> Result<EntryKind, WorkspaceError> {
    entry_kind(path)?.ok_or_else(|| WorkspaceError::not_found(path.relative().to_string()))
}

/// The path must be free.
pub fn require_vacant(path: &ResolvedPath) -> Result<(), WorkspaceError> {
    match entry_kind(path)? {
        Some(_) => Err(WorkspaceError::conflict(path.relative().to_string())),
        None => Ok(()),
    }
}

/// The path must be an existing directory.
pub fn require_directory(path: &ResolvedPath) -> Result<(), WorkspaceError> {
    match require_exists(path)? {
        EntryKind::Directory => Ok(()),
        EntryKind::File => Err(WorkspaceError::validation(format!(
            "{} is not a directory",
            path.relative()
        ))),
    }
}
