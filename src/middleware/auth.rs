//! Authorization middleware
//!
//! Session handling lives outside this server. Requests only have to pass an
//! [`AccessGate`] before reaching a file operation.

use axum::Json;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use log::warn;
use std::fmt;
use std::sync::Arc;
use subtle::ConstantTimeEq;

use crate::config::ServerConfig;
use crate::protocol::responses::ErrorResponse;

/// Decides whether a request may reach the file operations.
pub trait AccessGate: Send + Sync + fmt::Debug {
    fn authorize(&self, headers: &HeaderMap) -> bool;
}

/// Admits every request.
#[derive(Debug, Default)]
pub struct OpenGate;

impl AccessGate for OpenGate {
    fn authorize(&self, _headers: &HeaderMap) -> bool {
        true
    }
}

/// Requires `Authorization: Bearer <token>`.
pub struct BearerTokenGate {
    token: String,
}

impl BearerTokenGate {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl fmt::Debug for BearerTokenGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerTokenGate").finish_non_exhaustive()
    }
}

impl AccessGate for BearerTokenGate {
    fn authorize(&self, headers: &HeaderMap) -> bool {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .is_some_and(|presented| {
                bool::from(presented.trim().as_bytes().ct_eq(self.token.as_bytes()))
            })
    }
}

/// Picks the gate matching the configuration.
pub fn gate_from_config(config: &ServerConfig) -> Arc<dyn AccessGate> {
    match &config.api_token {
        Some(token) => Arc::new(BearerTokenGate::new(token.clone())),
        None => Arc::new(OpenGate),
    }
}

pub async fn require_authorization(
    State(gate): State<Arc<dyn AccessGate>>,
    request: Request,
    next: Next,
) -> Response {
    if gate.authorize(request.headers()) {
        return next.run(request).await;
    }

    warn!(
        "Unauthorized {} {}",
        request.method(),
        request.uri().path()
    );
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse::new("Unauthorized", "unauthorized")),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn bearer_gate_checks_token() {
        let gate = BearerTokenGate::new("s3cret");
        assert!(gate.authorize(&headers_with("Bearer s3cret")));
        assert!(!gate.authorize(&headers_with("Bearer wrong")));
        assert!(!gate.authorize(&headers_with("Bearer s3cret-and-more")));
        assert!(!gate.authorize(&headers_with("Bearer s3cre")));
        assert!(!gate.authorize(&headers_with("Bearer ")));
        assert!(!gate.authorize(&headers_with("Basic s3cret")));
        assert!(!gate.authorize(&HeaderMap::new()));
    }

    #[test]
    fn config_selects_gate() {
        let mut config = ServerConfig::default();
        assert!(gate_from_config(&config).authorize(&HeaderMap::new()));

        config.api_token = Some("t".into());
        assert!(!gate_from_config(&config).authorize(&HeaderMap::new()));
    }
}
