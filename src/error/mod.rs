//! Error handling
//!
//! Defines error types and handling for the workspace server.

pub mod handlers;
pub mod types;

pub use handlers::{error_to_status, handle_error};
pub use types::*;
