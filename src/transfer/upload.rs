//! Module `upload`
//!
//! Stores batches of uploaded files inside a workspace directory. Each file
//! is written to a hidden temporary sibling first and renamed into place on
//! success, so a failed or oversized upload never leaves a partial file
//! behind. Files succeed or fail independently of each other, except on
//! cancellation: then the partial file is dropped and the files already
//! stored by the batch are removed again.

use log::{error, info, warn};
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::Path;

use uuid::Uuid;

use crate::error::WorkspaceError;
use crate::lifecycle::CancellationToken;
use crate::storage::operations::ensure_target_directory;
use crate::storage::validation::{EntryName, MAX_NAME_LENGTH, RESERVED_CHARS, ResolvedPath, WorkspaceRoot};
use crate::transfer::results::{UploadFailure, UploadReport, UploadedFile};

const MIB: u64 = 1024 * 1024;

/// 100 MiB per file.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 100 * MIB;

const BUFFER_SIZE: usize = 8192;
const TEMP_PREFIX: &str = ".";
const TEMP_SUFFIX: &str = ".part";
const MAX_EXTENSION_LENGTH: usize = 32;
const FALLBACK_STEM: &str = "file";

/// One named byte stream of an upload batch.
pub struct IncomingFile<R> {
    pub name: String,
    pub content_type: String,
    /// Size announced by the client, if any. Checked before reading.
    pub declared_size: Option<u64>,
    pub reader: R,
}

enum StoreError {
    TooLarge,
    Cancelled,
    Invalid(String),
    Io(io::Error),
}

enum Rejection {
    Cancelled,
    Reason(String),
}

impl From<io::Error> for StoreError {
    fn from(e: io::Error) -> Self {
        StoreError::Io(e)
    }
}

/// Writes upload batches into a workspace.
#[derive(Debug, Clone)]
pub struct UploadIngestor {
    max_file_size: u64,
}

impl Default for UploadIngestor {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FILE_SIZE)
    }
}

impl UploadIngestor {
    pub fn new(max_file_size: u64) -> Self {
        Self { max_file_size }
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    /// Stores every file of the batch under `target_path`, creating the
    /// directory when missing.
    ///
    /// Only an unusable target or cancellation fails the whole call.
    /// Per-file problems are collected into the report.
    pub fn ingest<R: Read>(
        &self,
        root: &WorkspaceRoot,
        target_path: &str,
        files: Vec<IncomingFile<R>>,
        cancel: &CancellationToken,
    ) -> Result<UploadReport, WorkspaceError> {
        let target = root.resolve(target_path)?;
        cancel.check()?;
        ensure_target_directory(&target)?;

        let mut report = UploadReport::new(target.relative().clone());
        for file in files {
            let original_name = file.name.clone();
            let outcome = match cancel.check() {
                Ok(()) => self.store(root, &target, file, cancel),
                Err(_) => Err(Rejection::Cancelled),
            };
            match outcome {
                Ok(uploaded) => report.results.push(uploaded),
                Err(Rejection::Reason(reason)) => {
                    warn!("Upload of {} rejected: {}", original_name, reason);
                    report.errors.push(UploadFailure {
                        original_name,
                        reason,
                    });
                }
                Err(Rejection::Cancelled) => {
                    discard_stored(root, &report);
                    return Err(WorkspaceError::internal(format!(
                        "upload to {} cancelled",
                        report.target
                    )));
                }
            }
        }

        info!(
            "Upload to {}: {} stored, {} failed",
            report.target,
            report.uploaded(),
            report.errors.len()
        );

        Ok(report)
    }

    fn store<R: Read>(
        &self,
        root: &WorkspaceRoot,
        target: &ResolvedPath,
        file: IncomingFile<R>,
        cancel: &CancellationToken,
    ) -> Result<UploadedFile, Rejection> {
        let IncomingFile {
            name,
            content_type,
            declared_size,
            reader,
        } = file;

        if declared_size.is_some_and(|size| size > self.max_file_size) {
            return Err(Rejection::Reason(self.too_large_reason()));
        }

        let stored_name = generate_stored_name(&name);
        let result = EntryName::parse(&stored_name)
            .and_then(|entry| root.resolve_relative(target.relative().join(&entry)))
            .map_err(|e| StoreError::Invalid(e.public_message()))
            .and_then(|destination| {
                let temp = target
                    .absolute()
                    .join(format!("{}{}{}", TEMP_PREFIX, stored_name, TEMP_SUFFIX));
                let size = self.write_atomically(reader, &temp, destination.absolute(), cancel)?;
                Ok((destination, size))
            });

        match result {
            Ok((destination, size)) => {
                info!(
                    "Stored upload {} as {} ({} bytes, real: {})",
                    name,
                    destination.relative(),
                    size,
                    destination.absolute().display()
                );
                Ok(UploadedFile {
                    original_name: name,
                    stored_name,
                    path: destination.relative().clone(),
                    size,
                    content_type,
                })
            }
            Err(StoreError::TooLarge) => Err(Rejection::Reason(self.too_large_reason())),
            Err(StoreError::Cancelled) => {
                warn!("Upload of {} to {} cancelled", name, target.relative());
                Err(Rejection::Cancelled)
            }
            Err(StoreError::Invalid(reason)) => Err(Rejection::Reason(reason)),
            Err(StoreError::Io(e)) => {
                error!("Failed to store upload {} in {}: {}", name, target.relative(), e);
                Err(Rejection::Reason("failed to store file".to_string()))
            }
        }
    }

    fn write_atomically<R: Read>(
        &self,
        reader: R,
        temp: &Path,
        destination: &Path,
        cancel: &CancellationToken,
    ) -> Result<u64, StoreError> {
        let written = self
            .write_capped(reader, temp, cancel)
            .and_then(|size| {
                if cancel.is_cancelled() {
                    return Err(StoreError::Cancelled);
                }
                fs::rename(temp, destination)?;
                Ok(size)
            });

        if written.is_err() {
            if let Err(e) = fs::remove_file(temp) {
                if e.kind() != io::ErrorKind::NotFound {
                    warn!("Failed to remove partial upload {}: {}", temp.display(), e);
                }
            }
        }
        written
    }

    fn write_capped<R: Read>(
        &self,
        mut reader: R,
        temp: &Path,
        cancel: &CancellationToken,
    ) -> Result<u64, StoreError> {
        let mut file = File::create_new(temp)?;
        let mut buffer = [0u8; BUFFER_SIZE];
        let mut total: u64 = 0;

        loop {
            let n = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };

            if cancel.is_cancelled() {
                return Err(StoreError::Cancelled);
            }

            // Fail fast, before writing the chunk that crosses the limit.
            total += n as u64;
            if total > self.max_file_size {
                return Err(StoreError::TooLarge);
            }

            file.write_all(&buffer[..n])?;
        }

        file.flush()?;
        file.sync_all()?;
        Ok(total)
    }

    fn too_large_reason(&self) -> String {
        format!(
            "file exceeds the maximum size of {}",
            format_size(self.max_file_size)
        )
    }
}

/// Removes the files a cancelled batch had already stored.
fn discard_stored(root: &WorkspaceRoot, report: &UploadReport) {
    for uploaded in &report.results {
        let removed = root
            .resolve_relative(uploaded.path.clone())
            .map_err(|e| e.to_string())
            .and_then(|stored| fs::remove_file(stored.absolute()).map_err(|e| e.to_string()));
        match removed {
            Ok(()) => info!("Discarded {} from cancelled upload", uploaded.path),
            Err(e) => warn!("Failed to discard {} from cancelled upload: {}", uploaded.path, e),
        }
    }
}

fn format_size(bytes: u64) -> String {
    if bytes >= MIB && bytes % MIB == 0 {
        format!("{} MiB", bytes / MIB)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Builds `<basename>-<uuid><ext>` from a client-supplied file name.
///
/// Only the final path component is used. Reserved and control characters
/// become `_`, leading dots are dropped so stored files are never hidden, and
/// the result (plus the temporary-file affixes) fits in one path component.
pub fn generate_stored_name(original: &str) -> String {
    let base = original.rsplit(['/', '\\']).next().unwrap_or_default();

    let (stem, extension) = match base.rfind('.') {
        Some(idx) if idx > 0 && base.len() - idx <= MAX_EXTENSION_LENGTH => {
            (&base[..idx], &base[idx..])
        }
        _ => (base, ""),
    };

    let extension = sanitize(extension);
    let mut stem = sanitize(stem).trim_start_matches('.').trim().to_string();
    if stem.is_empty() {
        stem = FALLBACK_STEM.to_string();
    }

    let id = Uuid::new_v4();
    let budget = MAX_NAME_LENGTH
        - TEMP_PREFIX.len()
        - TEMP_SUFFIX.len()
        - 1
        - uuid::fmt::Hyphenated::LENGTH
        - extension.len();
    truncate_at_char_boundary(&mut stem, budget);

    format!("{}-{}{}", stem, id, extension)
}

fn sanitize(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if RESERVED_CHARS.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect()
}

fn truncate_at_char_boundary(value: &mut String, max_len: usize) {
    if value.len() <= max_len {
        return;
    }
    let mut cut = max_len;
    while !value.is_char_boundary(cut) {
        cut -= 1;
    }
    value.truncate(cut);
}
