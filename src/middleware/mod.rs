//! Server middleware
//!
//! Provides request logging and the authorization gate.

pub mod auth;
pub mod logging;

pub use auth::{AccessGate, BearerTokenGate, OpenGate, gate_from_config};
