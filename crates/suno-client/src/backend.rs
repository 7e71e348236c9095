//! The generation backend as seen by the orchestrator.

use async_trait::async_trait;
use reso_domain::error::Result;
use reso_domain::event::{CaptchaChallenge, Coordinate, GenerationResult};

/// One poll of a submitted job.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClipStatus {
    pub status: String,
    pub audio_url: Option<String>,
    pub image_url: Option<String>,
    pub title: Option<String>,
}

impl ClipStatus {
    pub fn is_complete(&self) -> bool {
        self.status == "complete"
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status.as_str(), "error" | "failed")
    }

    /// The result of a complete clip. Empty strings count as absent.
    pub fn into_result(self) -> GenerationResult {
        GenerationResult {
            audio_url: self.audio_url.unwrap_or_default(),
            image_url: self.image_url.filter(|s| !s.is_empty()),
            title: self.title.filter(|s| !s.is_empty()),
        }
    }
}

#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Submit a custom generation. Blocks until the backend has assigned a
    /// job id, which can include the time a captcha stays unsolved.
    async fn submit(&self, prompt: &str, tags: &str) -> Result<String>;

    /// The challenge currently waiting for a human, if any.
    async fn captcha_status(&self) -> Result<Option<CaptchaChallenge>>;

    /// Forward clicks for the pending challenge. `false` when nothing was
    /// pending.
    async fn captcha_solve(&self, coordinates: &[Coordinate]) -> Result<bool>;

    /// Current status of a submitted job.
    ///
    /// `Unauthorized` means the backend session is gone; `Unreachable`
    /// covers transport faults and 5xx; `Malformed` an unreadable payload.
    async fn completion_status(&self, job_id: &str) -> Result<ClipStatus>;
}
