//! `POST /api/generate`: start a run and stream its progress as SSE.
//!
//! Each progress event becomes one SSE event named after its type, with
//! the event fields as JSON `data`. Keepalive frames become SSE comments.

use std::convert::Infallible;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Json, Response};
use futures_util::StreamExt;
use serde::Deserialize;

use crate::runtime::{Frame, GenerationRequest};
use crate::state::AppState;

use super::auth::CallerId;
use super::{api_error, upstream_error};

#[derive(Debug, Deserialize)]
pub struct GenerateBody {
    #[serde(default = "default_platform")]
    pub platform: String,
    #[serde(default)]
    pub custom_prompt_override: Option<String>,
    #[serde(default)]
    pub novelty_level: Option<f32>,
}

fn default_platform() -> String {
    "suno".into()
}

pub async fn generate(
    State(state): State<AppState>,
    CallerId(user_id): CallerId,
    Json(body): Json<GenerateBody>,
) -> Response {
    if let Some(n) = body.novelty_level {
        if !(0.0..=1.0).contains(&n) {
            return api_error(StatusCode::BAD_REQUEST, "novelty_level must be between 0 and 1");
        }
    }
    match state.store.user(&user_id).await {
        Ok(Some(_)) => {}
        Ok(None) => return api_error(StatusCode::NOT_FOUND, "user not found"),
        Err(e) => return upstream_error(e),
    }

    let request = GenerationRequest {
        user_id,
        profile: None,
        novelty: body.novelty_level,
        platform: body.platform,
        custom_prompt: body.custom_prompt_override,
    };
    let progress = state.orchestrator.run(request);

    let events = progress
        .into_stream()
        .map(|frame| Ok::<_, Infallible>(sse_event(&frame)));
    Sse::new(events)
        .keep_alive(KeepAlive::default())
        .into_response()
}

/// SSE rendering of one progress frame.
pub fn sse_event(frame: &Frame) -> Event {
    match frame {
        Frame::Event(event) => Event::default()
            .event(event.name())
            .data(event.payload().to_string()),
        Frame::Keepalive => Event::default().comment("keepalive"),
    }
}
