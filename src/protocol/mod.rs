//! HTTP protocol
//!
//! Request parsing, response rendering and routing of the file operations.

pub mod handlers;
pub mod requests;
pub mod responses;
pub mod routes;

pub use responses::{ApiError, ErrorResponse};
pub use routes::{AppState, router};
