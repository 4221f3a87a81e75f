//! Workspace service
//!
//! The single entry point the HTTP layer talks to.

pub mod workspace;

pub use workspace::{OperationResult, WorkspaceService};
