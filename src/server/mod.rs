//! Server core functionality
//!
//! Binds the HTTP listener and runs the router until shutdown.

pub mod core;

pub use self::core::Server;
