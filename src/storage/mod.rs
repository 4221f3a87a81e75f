//! Workspace storage
//!
//! Path sandboxing, conflict checks and the directory, rename and move
//! operations built on top of them.

pub mod conflict;
pub mod filesystem;
pub mod operations;
pub mod results;
pub mod validation;

pub use operations::{create_directory, move_entry, rename_entry};
pub use results::{MkdirResult, MoveResult, RenameResult};
pub use validation::{EntryName, RelativePath, ResolvedPath, WorkspaceRoot, normalize};
