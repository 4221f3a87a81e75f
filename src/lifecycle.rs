//! Cancellation of in-flight workspace operations
//!
//! The service holds a [`CancellationSource`] for every operation it hands
//! to the blocking pool and trips it when the deadline passes. The matching
//! [`CancellationToken`] travels into the filesystem code, which checks it
//! before every mutation and while streaming bytes.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::WorkspaceError;

/// Triggers cancellation for all tokens created from it.
#[derive(Debug, Clone, Default)]
pub struct CancellationSource {
    cancelled: Arc<AtomicBool>,
}

impl CancellationSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token(&self) -> CancellationToken {
        CancellationToken {
            cancelled: Arc::clone(&self.cancelled),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

/// Cloneable handle checked by cancellable work.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// A token that is never cancelled.
    pub fn none() -> Self {
        CancellationSource::new().token()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Fails with an internal error once cancellation was requested.
    pub fn check(&self) -> Result<(), WorkspaceError> {
        if self.is_cancelled() {
            Err(WorkspaceError::internal("operation cancelled"))
        } else {
            Ok(())
        }
    }
}
