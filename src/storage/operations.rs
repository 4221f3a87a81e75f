//! Storage operations
//!
//! Directory creation, rename and move inside a workspace root. Every path
//! goes through the resolver first and every mutation is preceded by the
//! conflict checks, so the filesystem is only touched once the request is
//! known to be well formed.
//!
//! Existence checks and mutations are separate steps. Two concurrent
//! requests targeting the same destination can both pass the check; the
//! loser then either fails in the kernel (`mkdir`) or, for rename and move,
//! may replace the winner's entry. Only `mkdir` uses an atomic
//! create-if-absent primitive.
//!
//! Every operation checks its [`CancellationToken`] immediately before it
//! mutates anything, so work abandoned by a timed-out caller stops short of
//! the filesystem.

use log::info;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::WorkspaceError;
use crate::lifecycle::CancellationToken;
use crate::storage::conflict::{EntryKind, entry_kind, require_directory, require_exists, require_vacant};
use crate::storage::filesystem::{self, MoveMethod};
use crate::storage::results::{MkdirResult, MoveResult, RenameResult};
use crate::storage::validation::{EntryName, ResolvedPath, WorkspaceRoot};

/// Creates `directory_name` inside the existing directory `target_path`.
pub fn create_directory(
    root: &WorkspaceRoot,
    target_path: &str,
    directory_name: &str,
    cancel: &CancellationToken,
) -> Result<MkdirResult, WorkspaceError> {
    let name = EntryName::parse(directory_name)?;
    let parent = root.resolve(target_path)?;

    // Explicit parents are never created implicitly.
    require_directory(&parent)?;

    let target = root.resolve_relative(parent.relative().join(&name))?;
    require_vacant(&target)?;

    cancel.check()?;
    match filesystem::create_directory_exclusive(target.absolute()) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            return Err(WorkspaceError::conflict(target.relative().to_string()));
        }
        Err(e) => return Err(e.into()),
    }

    info!(
        "Created directory {} (real: {})",
        target.relative(),
        target.absolute().display()
    );

    Ok(MkdirResult {
        path: target.relative().clone(),
        full_path: target.absolute().to_path_buf(),
    })
}

/// Renames the final segment of `current_path` to `new_name`.
pub fn rename_entry(
    root: &WorkspaceRoot,
    current_path: &str,
    new_name: &str,
    cancel: &CancellationToken,
) -> Result<RenameResult, WorkspaceError> {
    let source = root.resolve(current_path)?;
    let name = EntryName::parse(new_name)?;

    let parent = source
        .relative()
        .parent()
        .ok_or_else(|| WorkspaceError::validation("cannot rename the workspace root"))?;
    let destination = root.resolve_relative(parent.join(&name))?;

    require_exists(&source)?;
    require_vacant(&destination)?;

    cancel.check()?;
    filesystem::rename_with_retry(source.absolute(), destination.absolute())?;

    info!(
        "Renamed {} to {} (real: {})",
        source.relative(),
        destination.relative(),
        destination.absolute().display()
    );

    Ok(RenameResult {
        old_path: source.relative().clone(),
        new_path: destination.relative().clone(),
        name: name.to_string(),
    })
}

/// Moves `source_path` into the directory `destination_path`, keeping its
/// name. The destination directory is created when missing.
pub fn move_entry(
    root: &WorkspaceRoot,
    source_path: &str,
    destination_path: &str,
    cancel: &CancellationToken,
) -> Result<MoveResult, WorkspaceError> {
    let source = root.resolve(source_path)?;
    let destination = root.resolve(destination_path)?;

    if source.relative() == destination.relative() {
        return Err(WorkspaceError::validation(
            "source and destination are the same path",
        ));
    }

    let base_name = source
        .relative()
        .file_name()
        .ok_or_else(|| WorkspaceError::validation("cannot move the workspace root"))?;
    let name = EntryName::parse(base_name)?;

    require_exists(&source)?;

    let final_path = root.resolve_relative(destination.relative().join(&name))?;
    require_vacant(&final_path)?;

    if final_path.relative().starts_with(source.relative())
        || enters_itself(&source, &destination)
    {
        return Err(WorkspaceError::validation(
            "cannot move a directory into itself",
        ));
    }

    cancel.check()?;
    ensure_target_directory(&destination)?;

    let method = filesystem::move_path(source.absolute(), final_path.absolute(), cancel)?;

    info!(
        "Moved {} to {} ({:?}, real: {})",
        source.relative(),
        final_path.relative(),
        method,
        final_path.absolute().display()
    );

    Ok(MoveResult {
        old_path: source.relative().clone(),
        new_path: final_path.relative().clone(),
        name: name.to_string(),
        method,
    })
}

/// Whether `destination` physically lies inside `source`, through symlinks.
/// The source itself is not followed, since a link moves as a link.
fn enters_itself(source: &ResolvedPath, destination: &ResolvedPath) -> bool {
    let source = source
        .absolute()
        .parent()
        .zip(source.absolute().file_name())
        .and_then(|(parent, name)| physical_path(parent).map(|p| p.join(name)));
    match (source, physical_path(destination.absolute())) {
        (Some(source), Some(destination)) => destination.starts_with(source),
        _ => false,
    }
}

/// Canonical form of the deepest existing ancestor plus the missing rest.
fn physical_path(path: &Path) -> Option<PathBuf> {
    let mut existing = path;
    let mut missing = Vec::new();
    loop {
        match existing.canonicalize() {
            Ok(canonical) => {
                return Some(missing.iter().rev().fold(canonical, |acc, part| acc.join(part)));
            }
            Err(_) => {
                missing.push(existing.file_name()?);
                existing = existing.parent()?;
            }
        }
    }
}

/// Makes sure `target` is a directory, creating it and any missing
/// ancestors. A file anywhere along the way is a client error.
pub fn ensure_target_directory(target: &ResolvedPath) -> Result<(), WorkspaceError> {
    match entry_kind(target)? {
        Some(EntryKind::Directory) => Ok(()),
        Some(EntryKind::File) => Err(WorkspaceError::validation(format!(
            "{} is not a directory",
            target.relative()
        ))),
        None => match filesystem::ensure_directory(target.absolute()) {
            Ok(()) => {
                info!("Created directory {}", target.relative());
                Ok(())
            }
            Err(e) if matches!(e.kind(), io::ErrorKind::NotADirectory | io::ErrorKind::AlreadyExists) => {
                Err(WorkspaceError::validation(format!(
                    "{} cannot be created as a directory",
                    target.relative()
                )))
            }
            Err(e) => Err(e.into()),
        },
    }
}
