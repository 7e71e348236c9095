pub mod auth;
pub mod captcha;
pub mod feedback;
pub mod generate;
pub mod health;
pub mod profile;
pub mod tracks;

use axum::http::StatusCode;
use axum::middleware;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;

use reso_domain::error::{Error, ErrorKind};

use crate::state::AppState;

/// Build the full API router.
///
/// Routes are split into **public** (no auth required) and **protected**
/// (gated behind the bearer-token middleware when a token is configured).
pub fn router(state: AppState) -> Router<AppState> {
    let public = Router::new().route("/health", get(health::health));

    let protected = Router::new()
        .route("/api/generate", post(generate::generate))
        .route("/api/captcha/solve", post(captcha::solve))
        .route("/api/profile/analyze", get(profile::analyze))
        .route("/api/feedback", post(feedback::submit))
        .route("/api/tracks", get(tracks::list))
        .route_layer(middleware::from_fn_with_state(
            state,
            auth::require_api_token,
        ));

    public.merge(protected)
}

/// Build a standardized JSON error response: `{ "error": "<message>" }`.
pub fn api_error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({ "error": message.into() }))).into_response()
}

/// HTTP status for an upstream failure surfaced by a request handler.
pub fn error_status(err: &Error) -> StatusCode {
    match err.kind() {
        ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::Unreachable
        | ErrorKind::BadStatus
        | ErrorKind::Malformed
        | ErrorKind::BackendRejected => StatusCode::BAD_GATEWAY,
        ErrorKind::Other => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn upstream_error(err: Error) -> Response {
    api_error(error_status(&err), err.to_string())
}
