//! `GET /api/tracks`: the caller's generated tracks, newest first.

use axum::extract::{Query, State};
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;

use crate::state::AppState;

use super::auth::CallerId;
use super::upstream_error;

#[derive(Debug, Deserialize)]
pub struct TracksQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    50
}

pub async fn list(
    State(state): State<AppState>,
    CallerId(user_id): CallerId,
    Query(q): Query<TracksQuery>,
) -> Response {
    match state.store.tracks_for_user(&user_id, q.limit.min(500)).await {
        Ok(tracks) => Json(serde_json::json!({ "tracks": tracks })).into_response(),
        Err(e) => upstream_error(e),
    }
}
