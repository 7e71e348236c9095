//! Completion poll loop.
//!
//! Sleeps first, then polls: every `interval` until `late_threshold` of
//! elapsed time, every `late_interval` after that, until `timeout`.
//! Transport faults count towards a consecutive-error limit; any readable
//! non-terminal reply resets it. Rate limits are retried by the backend
//! client, so one that reaches this loop is fatal.

use std::time::Duration;

use reso_domain::config::GenerationConfig;
use reso_domain::error::{Error, ErrorKind, Result};
use reso_domain::event::GenerationResult;
use reso_domain::trace::TraceEvent;
use reso_suno::GenerationBackend;

use super::emitter::ProgressEmitter;
use super::session::GenerationSession;

#[derive(Debug, Clone)]
pub struct PollPolicy {
    pub interval: Duration,
    pub late_interval: Duration,
    pub late_threshold: Duration,
    pub timeout: Duration,
    pub max_consecutive_errors: u32,
    pub keepalive_every: u32,
}

impl PollPolicy {
    pub fn from_config(cfg: &GenerationConfig) -> Self {
        Self {
            interval: Duration::from_secs(cfg.poll_interval_secs),
            late_interval: Duration::from_secs(cfg.late_poll_interval_secs),
            late_threshold: Duration::from_secs(cfg.late_threshold_secs),
            timeout: Duration::from_secs(cfg.timeout_secs),
            max_consecutive_errors: cfg.max_consecutive_errors.max(1),
            keepalive_every: cfg.keepalive_every.max(1),
        }
    }

    /// Interval to sleep before the next poll, given time already spent.
    pub fn interval_at(&self, elapsed: Duration) -> Duration {
        if elapsed < self.late_threshold {
            self.interval
        } else {
            self.late_interval
        }
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::from_config(&GenerationConfig::default())
    }
}

pub async fn poll_completion(
    backend: &dyn GenerationBackend,
    job_id: &str,
    policy: &PollPolicy,
    session: &mut GenerationSession,
    emitter: &mut ProgressEmitter,
) -> Result<GenerationResult> {
    while session.elapsed < policy.timeout {
        let interval = policy.interval_at(session.elapsed);
        tokio::time::sleep(interval).await;
        session.elapsed += interval;
        session.poll_count += 1;
        if session.poll_count % policy.keepalive_every == 0 {
            emitter.keepalive();
        }

        let outcome = backend.completion_status(job_id).await;
        let status_label = match &outcome {
            Ok(s) => s.status.clone(),
            Err(e) => format!("error: {e}"),
        };

        match outcome {
            Ok(status) if status.is_complete() => {
                session.consecutive_errors = 0;
                trace_poll(session, job_id, status_label);
                return Ok(status.into_result());
            }
            Ok(status) if status.is_failed() => {
                trace_poll(session, job_id, status_label);
                return Err(Error::BackendRejected(format!(
                    "backend reported status '{}'",
                    status.status
                )));
            }
            Ok(_) => session.consecutive_errors = 0,
            Err(e) => match e.kind() {
                ErrorKind::Unauthorized => {
                    trace_poll(session, job_id, status_label);
                    return Err(e);
                }
                ErrorKind::Malformed => {
                    tracing::debug!(job_id, error = %e, "unreadable status reply, polling on");
                    session.consecutive_errors = 0;
                }
                ErrorKind::Unreachable => {
                    session.consecutive_errors += 1;
                    if session.consecutive_errors >= policy.max_consecutive_errors {
                        trace_poll(session, job_id, status_label);
                        return Err(Error::unreachable(
                            "suno",
                            format!(
                                "{} consecutive status polls failed, last: {e}",
                                session.consecutive_errors
                            ),
                        ));
                    }
                }
                _ => {
                    trace_poll(session, job_id, status_label);
                    return Err(e);
                }
            },
        }
        trace_poll(session, job_id, status_label);
    }

    Err(Error::Timeout(format!(
        "generation did not finish within {} seconds",
        policy.timeout.as_secs()
    )))
}

fn trace_poll(session: &GenerationSession, job_id: &str, status: String) {
    TraceEvent::CompletionPoll {
        run_id: session.run_id.clone(),
        job_id: job_id.to_owned(),
        poll: session.poll_count,
        elapsed_secs: session.elapsed.as_secs(),
        status,
        consecutive_errors: session.consecutive_errors,
    }
    .emit();
}
