use serde::Serialize;

use crate::event::Stage;

/// Structured diagnostic events emitted across all Reso crates.
///
/// These travel on the tracing side channel and never reach the client's
/// progress stream.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    RunStarted {
        run_id: String,
        user_id: String,
        platform: String,
        novelty: f32,
    },
    StageEntered {
        run_id: String,
        stage: Stage,
    },
    CaptchaRaised {
        run_id: String,
        poll: u32,
    },
    CaptchaCleared {
        run_id: String,
        poll: u32,
    },
    CaptchaPollFailed {
        run_id: String,
        poll: u32,
        error: String,
    },
    CompletionPoll {
        run_id: String,
        job_id: String,
        poll: u32,
        elapsed_secs: u64,
        status: String,
        consecutive_errors: u32,
    },
    UpstreamCall {
        service: String,
        endpoint: String,
        status: u16,
        duration_ms: u64,
    },
    RateLimited {
        service: String,
        endpoint: String,
        attempt: u32,
        delay_ms: u64,
    },
    TokenRefreshed {
        user_id: String,
        rotated: bool,
    },
    GenreLookup {
        artist: String,
        genres: usize,
        cache_hit: bool,
    },
    RunFinished {
        run_id: String,
        outcome: String,
        duration_ms: u64,
        error: Option<String>,
    },
}

impl TraceEvent {
    fn is_failure(&self) -> bool {
        match self {
            Self::CaptchaPollFailed { .. } | Self::RateLimited { .. } => true,
            Self::RunFinished { error, .. } => error.is_some(),
            _ => false,
        }
    }

    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        if self.is_failure() {
            tracing::warn!(trace_event = %json, "reso_event");
        } else {
            tracing::info!(trace_event = %json, "reso_event");
        }
    }
}
