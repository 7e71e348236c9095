//! Completion polling schedule and error accounting.

mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;

use reso_domain::error::ErrorKind;
use reso_gateway::runtime::emitter::{self, Frame};
use reso_gateway::runtime::{poll_completion, GenerationSession, PollPolicy};

use common::{ScriptedBackend, StatusStep};

fn queued(n: usize) -> Vec<StatusStep> {
    vec![StatusStep::Status("queued"); n]
}

fn failures(kind: ErrorKind, n: usize) -> Vec<StatusStep> {
    vec![StatusStep::Fail(kind); n]
}

async fn poll(backend: &ScriptedBackend) -> (reso_domain::error::Result<reso_domain::event::GenerationResult>, GenerationSession) {
    let (mut tx, _rx) = emitter::channel();
    let mut session = GenerationSession::new("run-1");
    let out = poll_completion(backend, "abc123", &PollPolicy::default(), &mut session, &mut tx).await;
    (out, session)
}

#[tokio::test(start_paused = true)]
async fn completes_on_third_poll() {
    let mut steps = queued(2);
    steps.push(StatusStep::Complete);
    let backend = ScriptedBackend::new().status_steps(steps);

    let (out, session) = poll(&backend).await;
    let result = out.unwrap();
    assert_eq!(result.audio_url, "https://cdn.example/abc123.mp3");
    assert_eq!(result.title.as_deref(), Some("Dawn Drive"));
    assert_eq!(session.poll_count, 3);
    assert_eq!(session.elapsed, Duration::from_secs(15));
}

#[tokio::test(start_paused = true)]
async fn interval_widens_after_first_minute() {
    let mut steps = queued(12);
    steps.push(StatusStep::Complete);
    let backend = ScriptedBackend::new().status_steps(steps);

    let start = tokio::time::Instant::now();
    let (out, session) = poll(&backend).await;
    assert!(out.is_ok());
    // Twelve 5s polls reach 60s; the thirteenth waits 10s.
    assert_eq!(session.poll_count, 13);
    assert_eq!(session.elapsed, Duration::from_secs(70));
    assert_eq!(start.elapsed(), Duration::from_secs(70));
}

#[tokio::test(start_paused = true)]
async fn gives_up_after_timeout() {
    let backend = ScriptedBackend::new().status_steps(queued(1));

    let (out, session) = poll(&backend).await;
    assert_eq!(out.unwrap_err().kind(), ErrorKind::Timeout);
    assert_eq!(session.poll_count, 24);
    assert_eq!(session.elapsed, Duration::from_secs(180));
}

#[tokio::test(start_paused = true)]
async fn five_consecutive_failures_abort() {
    let backend = ScriptedBackend::new().status_steps(failures(ErrorKind::Unreachable, 1));

    let (out, session) = poll(&backend).await;
    assert_eq!(out.unwrap_err().kind(), ErrorKind::Unreachable);
    assert_eq!(session.poll_count, 5);
    assert_eq!(backend.status_calls.load(Ordering::SeqCst), 5);
}

#[tokio::test(start_paused = true)]
async fn readable_reply_resets_failure_count() {
    let mut steps = failures(ErrorKind::Unreachable, 4);
    steps.extend(queued(1));
    steps.extend(failures(ErrorKind::Unreachable, 4));
    steps.push(StatusStep::Fail(ErrorKind::Malformed));
    steps.extend(failures(ErrorKind::Unreachable, 4));
    steps.push(StatusStep::Complete);
    let backend = ScriptedBackend::new().status_steps(steps);

    let (out, session) = poll(&backend).await;
    assert!(out.is_ok());
    assert_eq!(session.poll_count, 15);
    assert_eq!(session.consecutive_errors, 0);
}

#[tokio::test(start_paused = true)]
async fn exhausted_rate_limit_is_fatal() {
    let backend = ScriptedBackend::new().status_steps(failures(ErrorKind::RateLimited, 1));

    let (out, session) = poll(&backend).await;
    assert_eq!(out.unwrap_err().kind(), ErrorKind::RateLimited);
    assert_eq!(session.poll_count, 1);
}

#[tokio::test(start_paused = true)]
async fn expired_session_stops_immediately() {
    let mut steps = queued(1);
    steps.push(StatusStep::Fail(ErrorKind::Unauthorized));
    let backend = ScriptedBackend::new().status_steps(steps);

    let (out, session) = poll(&backend).await;
    assert_eq!(out.unwrap_err().kind(), ErrorKind::Unauthorized);
    assert_eq!(session.poll_count, 2);
}

#[tokio::test(start_paused = true)]
async fn expired_session_ignores_pending_failure_count() {
    let mut steps = failures(ErrorKind::Unreachable, 3);
    steps.push(StatusStep::Fail(ErrorKind::Unauthorized));
    let backend = ScriptedBackend::new().status_steps(steps);

    let (out, session) = poll(&backend).await;
    let err = out.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
    assert!(!err.to_string().contains("consecutive"), "{err}");
    assert_eq!(session.poll_count, 4);
    assert_eq!(session.consecutive_errors, 3);
}

#[tokio::test(start_paused = true)]
async fn unexpected_status_code_is_fatal() {
    let backend = ScriptedBackend::new().status_steps(failures(ErrorKind::BadStatus, 1));

    let (out, session) = poll(&backend).await;
    assert_eq!(out.unwrap_err().kind(), ErrorKind::BadStatus);
    assert_eq!(session.poll_count, 1);
}

#[tokio::test(start_paused = true)]
async fn backend_failure_status_is_rejected() {
    let mut steps = queued(1);
    steps.push(StatusStep::Status("failed"));
    let backend = ScriptedBackend::new().status_steps(steps);

    let (out, _) = poll(&backend).await;
    let err = out.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BackendRejected);
    assert!(err.to_string().contains("failed"));
}

#[tokio::test(start_paused = true)]
async fn keepalive_every_fifth_poll() {
    let mut steps = queued(10);
    steps.push(StatusStep::Complete);
    let backend = ScriptedBackend::new().status_steps(steps);
    let (mut tx, mut rx) = emitter::channel();
    let mut session = GenerationSession::new("run-1");

    poll_completion(&backend, "abc123", &PollPolicy::default(), &mut session, &mut tx)
        .await
        .unwrap();
    drop(tx);

    let mut keepalives = 0;
    while let Some(frame) = rx.next().await {
        assert_eq!(frame, Frame::Keepalive);
        keepalives += 1;
    }
    // Polls 5 and 10; poll 11 completes.
    assert_eq!(keepalives, 2);
}
