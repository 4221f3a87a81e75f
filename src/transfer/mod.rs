//! Transfer module
//!
//! Handles multi-file uploads into the workspace with per-file size limits
//! and independent success or failure for every file of a batch.

pub mod results;
pub mod upload;

// Re-export key types and functions
pub use results::{UploadFailure, UploadReport, UploadedFile};
pub use upload::{DEFAULT_MAX_FILE_SIZE, IncomingFile, UploadIngestor, generate_stored_name};
