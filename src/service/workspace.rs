//! Module `workspace`
//!
//! Dispatches the four workspace operations. Each call runs its synchronous
//! filesystem work on the blocking pool so slow disks never stall other
//! requests, and is bounded by the configured operation timeout. A timeout
//! cancels the work it abandons. Failures are logged here, once, before
//! they are handed back to the caller.

use log::info;
use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

use crate::config::ServerConfig;
use crate::error::{ServerError, WorkspaceError, handle_error};
use crate::lifecycle::{CancellationSource, CancellationToken};
use crate::storage::{self, MkdirResult, MoveResult, RenameResult, WorkspaceRoot};
use crate::transfer::{IncomingFile, UploadIngestor, UploadReport};

/// Outcome of one workspace operation.
pub type OperationResult<T> = Result<T, WorkspaceError>;

#[derive(Debug, Clone)]
pub struct WorkspaceService {
    root: Arc<WorkspaceRoot>,
    ingestor: UploadIngestor,
    timeout: Duration,
}

impl WorkspaceService {
    pub fn new(root: WorkspaceRoot, ingestor: UploadIngestor, timeout: Duration) -> Self {
        Self {
            root: Arc::new(root),
            ingestor,
            timeout,
        }
    }

    /// Creates the configured root when missing and opens it.
    pub fn from_config(config: &ServerConfig) -> Result<Self, ServerError> {
        let root_path = config.workspace_root_path();
        std::fs::create_dir_all(&root_path)?;
        let root = WorkspaceRoot::new(&root_path)?;

        info!("Workspace root: {}", root.path().display());

        Ok(Self::new(
            root,
            UploadIngestor::new(config.max_file_size_bytes()),
            config.operation_timeout(),
        ))
    }

    pub fn root(&self) -> &WorkspaceRoot {
        &self.root
    }

    pub fn max_file_size(&self) -> u64 {
        self.ingestor.max_file_size()
    }

    pub async fn mkdir(
        &self,
        target_path: String,
        directory_name: String,
    ) -> OperationResult<MkdirResult> {
        self.run_blocking("mkdir", move |root, cancel| {
            storage::create_directory(root, &target_path, &directory_name, cancel)
        })
        .await
    }

    /// `scope` optionally narrows the sandbox to a sub-directory of the root.
    pub async fn rename(
        &self,
        scope: Option<String>,
        current_path: String,
        new_name: String,
    ) -> OperationResult<RenameResult> {
        self.run_blocking("rename", move |root, cancel| {
            let scoped = root.scoped(scope.as_deref())?;
            storage::rename_entry(&scoped, &current_path, &new_name, cancel)
        })
        .await
    }

    pub async fn move_entry(
        &self,
        scope: Option<String>,
        source_path: String,
        destination_path: String,
    ) -> OperationResult<MoveResult> {
        self.run_blocking("move", move |root, cancel| {
            let scoped = root.scoped(scope.as_deref())?;
            storage::move_entry(&scoped, &source_path, &destination_path, cancel)
        })
        .await
    }

    pub async fn upload<R>(
        &self,
        target_path: String,
        files: Vec<IncomingFile<R>>,
    ) -> OperationResult<UploadReport>
    where
        R: Read + Send + 'static,
    {
        let ingestor = self.ingestor.clone();
        self.run_blocking("upload", move |root, cancel| {
            ingestor.ingest(root, &target_path, files, cancel)
        })
        .await
    }

    /// On timeout the caller gets an error right away and the work is
    /// cancelled. It stops before its next mutation and rolls back what it
    /// can.
    async fn run_blocking<T, F>(&self, operation: &'static str, work: F) -> OperationResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&WorkspaceRoot, &CancellationToken) -> OperationResult<T> + Send + 'static,
    {
        let root = Arc::clone(&self.root);
        let source = CancellationSource::new();
        let token = source.token();
        let task = tokio::task::spawn_blocking(move || work(&root, &token));

        let result = match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Err(WorkspaceError::internal(format!(
                "{} task failed: {}",
                operation, join_error
            ))),
            Err(_) => {
                source.cancel();
                Err(WorkspaceError::internal(format!(
                    "{} timed out after {:?}",
                    operation, self.timeout
                )))
            }
        };

        if let Err(err) = &result {
            handle_error(operation, err);
        }
        result
    }
}
