//! `POST /api/feedback`: rate one of the caller's tracks.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;

use crate::state::AppState;

use super::auth::CallerId;
use super::{api_error, upstream_error};

#[derive(Debug, Deserialize)]
pub struct FeedbackBody {
    pub track_id: String,
    pub rating: i64,
}

pub async fn submit(
    State(state): State<AppState>,
    CallerId(user_id): CallerId,
    Json(body): Json<FeedbackBody>,
) -> Response {
    let track = match state.store.track(&body.track_id).await {
        Ok(Some(t)) => t,
        Ok(None) => return api_error(StatusCode::NOT_FOUND, "track not found"),
        Err(e) => return upstream_error(e),
    };
    if track.user_id != user_id {
        return api_error(StatusCode::FORBIDDEN, "not your track");
    }
    let rating = match u8::try_from(body.rating) {
        Ok(r @ 1..=5) => r,
        _ => return api_error(StatusCode::BAD_REQUEST, "rating must be 1-5"),
    };

    match state.store.set_rating(&body.track_id, rating).await {
        Ok(Some(_)) => Json(serde_json::json!({
            "status": "ok",
            "track_id": body.track_id,
            "rating": rating,
        }))
        .into_response(),
        Ok(None) => api_error(StatusCode::NOT_FOUND, "track not found"),
        Err(e) => upstream_error(e),
    }
}
