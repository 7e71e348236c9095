//! `GET /api/profile/analyze`: the caller's taste profile.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};

use crate::state::AppState;

use super::auth::CallerId;
use super::{api_error, upstream_error};

pub async fn analyze(State(state): State<AppState>, CallerId(user_id): CallerId) -> Response {
    match state.store.user(&user_id).await {
        Ok(Some(_)) => {}
        Ok(None) => return api_error(StatusCode::NOT_FOUND, "user not found"),
        Err(e) => return upstream_error(e),
    }
    match state.orchestrator.analyze_profile(&user_id).await {
        Ok(profile) => Json(profile).into_response(),
        Err(e) => {
            tracing::warn!(user_id = %user_id, error = %e, "profile analysis failed");
            upstream_error(e)
        }
    }
}
