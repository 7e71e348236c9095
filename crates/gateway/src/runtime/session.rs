//! Mutable state of one generation run.

use std::time::Duration;

use reso_domain::event::{CaptchaChallenge, Stage};
use reso_domain::trace::TraceEvent;

/// What the captcha watch should do with one status observation.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptchaTransition {
    /// A new challenge; tell the client.
    Raised(CaptchaChallenge),
    /// The pending challenge went away; the next one notifies again.
    Cleared,
    Unchanged,
}

/// Owned by exactly one run and dropped when it ends.
#[derive(Debug)]
pub struct GenerationSession {
    pub run_id: String,
    stage: Stage,
    pub job_id: Option<String>,
    captcha_sent: bool,
    pub elapsed: Duration,
    pub consecutive_errors: u32,
    pub poll_count: u32,
    pub captcha_polls: u32,
}

impl GenerationSession {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            stage: Stage::Idle,
            job_id: None,
            captcha_sent: false,
            elapsed: Duration::ZERO,
            consecutive_errors: 0,
            poll_count: 0,
            captcha_polls: 0,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Move to `next`. Illegal transitions are logged and ignored.
    pub fn advance(&mut self, next: Stage) -> bool {
        if !self.stage.can_advance_to(next) {
            tracing::warn!(
                run_id = %self.run_id,
                from = %self.stage,
                to = %next,
                "illegal stage transition ignored"
            );
            return false;
        }
        self.stage = next;
        TraceEvent::StageEntered {
            run_id: self.run_id.clone(),
            stage: next,
        }
        .emit();
        true
    }

    pub fn captcha_sent(&self) -> bool {
        self.captcha_sent
    }

    /// Edge-triggered captcha notification: a challenge is reported once
    /// until it disappears.
    pub fn observe_captcha(&mut self, pending: Option<CaptchaChallenge>) -> CaptchaTransition {
        match (pending, self.captcha_sent) {
            (Some(challenge), false) => {
                self.captcha_sent = true;
                CaptchaTransition::Raised(challenge)
            }
            (None, true) => {
                self.captcha_sent = false;
                CaptchaTransition::Cleared
            }
            _ => CaptchaTransition::Unchanged,
        }
    }
}
