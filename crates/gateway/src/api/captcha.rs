//! `POST /api/captcha/solve`: forward an operator's clicks to the backend.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;

use reso_domain::event::Coordinate;

use crate::state::AppState;

use super::{api_error, upstream_error};

#[derive(Debug, Deserialize)]
pub struct SolveBody {
    pub coordinates: Vec<Coordinate>,
}

pub async fn solve(State(state): State<AppState>, Json(body): Json<SolveBody>) -> Response {
    if body.coordinates.is_empty() {
        return api_error(StatusCode::BAD_REQUEST, "coordinates must be a non-empty array of {x, y}");
    }
    match state.orchestrator.solve_captcha(&body.coordinates).await {
        Ok(ok) => Json(serde_json::json!({ "ok": ok })).into_response(),
        Err(e) => upstream_error(e),
    }
}
