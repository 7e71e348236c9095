//! Captcha watch: runs alongside an outstanding submission.
//!
//! Every tick polls the backend's pending-challenge slot and forwards a new
//! challenge to the client once. Poll failures are logged and skipped; the
//! only way out is the submission finishing, whatever its outcome. Solving
//! happens elsewhere, through [`super::Orchestrator::solve_captcha`].

use std::future::Future;
use std::time::Duration;

use futures_util::FutureExt;

use reso_domain::config::GenerationConfig;
use reso_domain::event::ProgressEvent;
use reso_domain::trace::TraceEvent;
use reso_suno::GenerationBackend;

use super::emitter::ProgressEmitter;
use super::session::{CaptchaTransition, GenerationSession};

#[derive(Debug, Clone)]
pub struct CaptchaWatch {
    pub interval: Duration,
    pub keepalive_every: u32,
}

impl CaptchaWatch {
    pub fn from_config(cfg: &GenerationConfig) -> Self {
        Self {
            interval: cfg.captcha_poll_interval(),
            keepalive_every: cfg.keepalive_every.max(1),
        }
    }
}

impl Default for CaptchaWatch {
    fn default() -> Self {
        Self::from_config(&GenerationConfig::default())
    }
}

/// Watch for challenges until `submission` resolves, then return its
/// output.
pub async fn watch_captcha<F>(
    backend: &dyn GenerationBackend,
    submission: F,
    watch: &CaptchaWatch,
    session: &mut GenerationSession,
    emitter: &mut ProgressEmitter,
) -> F::Output
where
    F: Future,
{
    tokio::pin!(submission);

    loop {
        if let Some(out) = (&mut submission).now_or_never() {
            return out;
        }

        session.captcha_polls += 1;
        let poll = session.captcha_polls;
        match backend.captcha_status().await {
            Ok(pending) => match session.observe_captcha(pending) {
                CaptchaTransition::Raised(challenge) => {
                    TraceEvent::CaptchaRaised {
                        run_id: session.run_id.clone(),
                        poll,
                    }
                    .emit();
                    emitter.emit(ProgressEvent::CaptchaRequired(challenge));
                }
                CaptchaTransition::Cleared => {
                    TraceEvent::CaptchaCleared {
                        run_id: session.run_id.clone(),
                        poll,
                    }
                    .emit();
                }
                CaptchaTransition::Unchanged => {}
            },
            Err(e) => {
                TraceEvent::CaptchaPollFailed {
                    run_id: session.run_id.clone(),
                    poll,
                    error: e.to_string(),
                }
                .emit();
            }
        }

        if poll % watch.keepalive_every == 0 {
            emitter.keepalive();
        }

        tokio::select! {
            biased;
            out = &mut submission => return out,
            _ = tokio::time::sleep(watch.interval) => {}
        }
    }
}
