//! Transfer result types
//!
//! Defines the per-file and per-batch outcomes of an upload.

use crate::storage::validation::RelativePath;

/// A file that was stored successfully.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub original_name: String,
    pub stored_name: String,
    pub path: RelativePath,
    pub size: u64,
    pub content_type: String,
}

/// A file that was rejected or failed to store.
#[derive(Debug, Clone)]
pub struct UploadFailure {
    pub original_name: String,
    pub reason: String,
}

/// Outcome of a whole batch. Never fails as a unit.
#[derive(Debug, Clone, Default)]
pub struct UploadReport {
    pub target: RelativePath,
    pub results: Vec<UploadedFile>,
    pub errors: Vec<UploadFailure>,
}

impl UploadReport {
    pub fn new(target: RelativePath) -> Self {
        Self {
            target,
            results: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn uploaded(&self) -> usize {
        self.results.len()
    }
}
