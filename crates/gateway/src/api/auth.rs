//! API authentication.
//!
//! Reads the env var named by `config.server.api_token_env` (default
//! `RESO_API_TOKEN`) **once at startup** and caches the SHA-256 digest in
//! `AppState`.
//! - If the env var is set and non-empty, every protected request must
//!   carry `Authorization: Bearer <token>`.
//! - If the env var is unset or empty, unauthenticated access is allowed
//!   (dev mode).
//!
//! Caller identity is separate: the login flow in front of the gateway
//! forwards the user id in the header named by `server.user_header`.

use axum::async_trait;
use axum::body::Body;
use axum::extract::{FromRequestParts, State};
use axum::http::request::Parts;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::state::AppState;

use super::api_error;

/// Axum middleware that enforces bearer-token authentication on protected
/// routes. Attach via `axum::middleware::from_fn_with_state`.
pub async fn require_api_token(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let expected_hash = match &state.api_token_hash {
        Some(h) => h,
        None => return next.run(req).await,
    };

    let provided = req
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or("");

    // Compare fixed-length digests in constant time.
    let provided_hash = Sha256::digest(provided.as_bytes());

    if !bool::from(provided_hash.ct_eq(expected_hash.as_slice())) {
        return api_error(StatusCode::UNAUTHORIZED, "invalid or missing API token");
    }

    next.run(req).await
}

/// The calling user's id, taken from the configured identity header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerId(pub String);

#[async_trait]
impl FromRequestParts<AppState> for CallerId {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = state.config.server.user_header.as_str();
        match parts
            .headers
            .get(header)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
        {
            Some(id) => Ok(Self(id.to_owned())),
            None => Err(api_error(StatusCode::UNAUTHORIZED, "not authenticated").into_response()),
        }
    }
}
