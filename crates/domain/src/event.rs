use serde::{Deserialize, Serialize};

use crate::prompt::{PromptBundle, TempoFeel};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Stages
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Lifecycle stage of a generation run.
///
/// `Idle → BuildingProfile → PromptSynthesis → Submitting →
/// AwaitingCompletion → Complete | Failed`. A pending captcha is an event
/// overlay on `Submitting`, never a stage of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Idle,
    BuildingProfile,
    PromptSynthesis,
    Submitting,
    AwaitingCompletion,
    Complete,
    Failed,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::BuildingProfile => "building_profile",
            Self::PromptSynthesis => "prompt_synthesis",
            Self::Submitting => "submitting",
            Self::AwaitingCompletion => "awaiting_completion",
            Self::Complete => "complete",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }

    /// Whether `next` is a legal successor of `self`.
    pub fn can_advance_to(self, next: Stage) -> bool {
        use Stage::*;
        match (self, next) {
            (Idle, BuildingProfile)
            | (BuildingProfile, PromptSynthesis)
            | (PromptSynthesis, Submitting)
            | (Submitting, AwaitingCompletion)
            | (AwaitingCompletion, Complete) => true,
            (from, Failed) => !from.is_terminal(),
            _ => false,
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Captcha
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A human-verification challenge raised by the generation backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptchaChallenge {
    /// Base64-encoded image.
    pub image: String,
    /// Instruction text shown to the operator.
    pub prompt: String,
}

/// One click on the challenge image, in image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub x: f64,
    pub y: f64,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Results
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Terminal payload of the completion poll loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub audio_url: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

/// Fields of the `complete` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedTrack {
    pub audio_url: String,
    /// Empty when the backend supplied no cover art.
    pub image_url: String,
    /// Id of the persisted track record.
    pub track_id: String,
    pub title: String,
    /// Public page of the backend job.
    pub suno_url: String,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Progress events
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Fields of the `prompt_ready` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptReady {
    pub suno_prompt: String,
    pub lyria_prompt: String,
    pub song_concept: String,
    pub mood: String,
    pub tempo_feel: TempoFeel,
    pub energy_estimate: f32,
    pub valence_estimate: f32,
}

impl From<&PromptBundle> for PromptReady {
    fn from(b: &PromptBundle) -> Self {
        Self {
            suno_prompt: b.suno_prompt.clone(),
            lyria_prompt: b.lyria_prompt.clone(),
            song_concept: b.song_concept.clone(),
            mood: b.mood.clone(),
            tempo_feel: b.tempo_feel,
            energy_estimate: b.energy_estimate,
            valence_estimate: b.valence_estimate,
        }
    }
}

/// Client-facing progress of one run. Ordered; exactly one of
/// `Complete` / `Error` ends the stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    Status { stage: Stage, message: String },
    PromptReady(PromptReady),
    CaptchaRequired(CaptchaChallenge),
    Complete(CompletedTrack),
    Error { message: String },
}

impl ProgressEvent {
    pub fn status(stage: Stage, message: impl Into<String>) -> Self {
        Self::Status {
            stage,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Event name used on the wire (SSE `event:` field).
    pub fn name(&self) -> &'static str {
        match self {
            Self::Status { .. } => "status",
            Self::PromptReady(_) => "prompt_ready",
            Self::CaptchaRequired(_) => "captcha_required",
            Self::Complete(_) => "complete",
            Self::Error { .. } => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete(_) | Self::Error { .. })
    }

    /// The event body without the `type` tag, as sent in SSE `data:`.
    pub fn payload(&self) -> serde_json::Value {
        match self {
            Self::Status { stage, message } => {
                serde_json::json!({ "stage": stage, "message": message })
            }
            Self::PromptReady(p) => serde_json::to_value(p).unwrap_or_default(),
            Self::CaptchaRequired(c) => serde_json::to_value(c).unwrap_or_default(),
            Self::Complete(t) => serde_json::to_value(t).unwrap_or_default(),
            Self::Error { message } => serde_json::json!({ "message": message }),
        }
    }
}
