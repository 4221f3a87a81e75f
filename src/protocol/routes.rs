//! HTTP routing
//!
//! Builds the axum router: the gated `/files/*` operations plus an ungated
//! health probe, all wrapped in request logging.

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use std::sync::Arc;

use crate::middleware::auth::{AccessGate, require_authorization};
use crate::middleware::logging::log_request;
use crate::protocol::handlers;
use crate::service::WorkspaceService;

/// Shared handler state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub service: WorkspaceService,
}

pub fn router(service: WorkspaceService, gate: Arc<dyn AccessGate>) -> Router {
    // Uploads are limited per file while streaming, not per request.
    let files = Router::new()
        .route("/files/mkdir", post(handlers::mkdir))
        .route("/files/rename", post(handlers::rename))
        .route("/files/move", post(handlers::move_entry))
        .route(
            "/files/upload",
            post(handlers::upload).layer(DefaultBodyLimit::disable()),
        )
        .route_layer(middleware::from_fn_with_state(gate, require_authorization));

    Router::new()
        .route("/health", get(handlers::health))
        .merge(files)
        .layer(middleware::from_fn(log_request))
        .with_state(AppState { service })
}
