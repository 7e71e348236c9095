//! The captcha watch running beside a slow submission.

mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;

use reso_domain::event::ProgressEvent;
use reso_gateway::runtime::emitter::{self, Frame, ProgressStream};
use reso_gateway::runtime::{watch_captcha, CaptchaWatch, GenerationSession};

use common::{CaptchaStep, ScriptedBackend};

async fn slow_submission(secs: u64) -> u32 {
    tokio::time::sleep(Duration::from_secs(secs)).await;
    42
}

async fn drain(mut stream: ProgressStream) -> Vec<Frame> {
    let mut out = Vec::new();
    while let Some(frame) = stream.next().await {
        out.push(frame);
    }
    out
}

fn captcha_events(frames: &[Frame]) -> usize {
    frames
        .iter()
        .filter(|f| matches!(f.event(), Some(ProgressEvent::CaptchaRequired(_))))
        .count()
}

#[tokio::test(start_paused = true)]
async fn each_new_challenge_is_sent_once() {
    let backend = ScriptedBackend::new().captcha_steps(vec![
        CaptchaStep::Pending,
        CaptchaStep::Pending,
        CaptchaStep::Absent,
        CaptchaStep::Pending,
    ]);
    let (mut tx, rx) = emitter::channel();
    let mut session = GenerationSession::new("run-1");

    let out = watch_captcha(
        &backend,
        slow_submission(7),
        &CaptchaWatch::default(),
        &mut session,
        &mut tx,
    )
    .await;
    drop(tx);

    assert_eq!(out, 42);
    assert_eq!(session.captcha_polls, 4);
    assert_eq!(backend.captcha_calls.load(Ordering::SeqCst), 4);
    assert_eq!(captcha_events(&drain(rx).await), 2);
}

#[tokio::test(start_paused = true)]
async fn poll_failures_do_not_stop_the_watch() {
    let backend = ScriptedBackend::new().captcha_steps(vec![
        CaptchaStep::Fail,
        CaptchaStep::Fail,
        CaptchaStep::Pending,
    ]);
    let (mut tx, rx) = emitter::channel();
    let mut session = GenerationSession::new("run-1");

    let out = watch_captcha(
        &backend,
        slow_submission(5),
        &CaptchaWatch::default(),
        &mut session,
        &mut tx,
    )
    .await;
    drop(tx);

    assert_eq!(out, 42);
    assert_eq!(session.captcha_polls, 3);
    let frames = drain(rx).await;
    assert_eq!(captcha_events(&frames), 1);
    assert!(frames.iter().all(|f| !matches!(f.event(), Some(ProgressEvent::Error { .. }))));
}

#[tokio::test(start_paused = true)]
async fn finished_submission_skips_polling() {
    let backend = ScriptedBackend::new();
    let (mut tx, _rx) = emitter::channel();
    let mut session = GenerationSession::new("run-1");

    let out = watch_captcha(
        &backend,
        std::future::ready("done"),
        &CaptchaWatch::default(),
        &mut session,
        &mut tx,
    )
    .await;

    assert_eq!(out, "done");
    assert_eq!(backend.captcha_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn long_submission_gets_keepalives() {
    let backend = ScriptedBackend::new();
    let (mut tx, rx) = emitter::channel();
    let mut session = GenerationSession::new("run-1");
    let watch = CaptchaWatch {
        interval: Duration::from_secs(2),
        keepalive_every: 5,
    };

    // Polls at t=0,2,...,18.
    watch_captcha(&backend, slow_submission(19), &watch, &mut session, &mut tx).await;
    drop(tx);

    assert_eq!(session.captcha_polls, 10);
    let keepalives = drain(rx)
        .await
        .into_iter()
        .filter(|f| *f == Frame::Keepalive)
        .count();
    assert_eq!(keepalives, 2);
}
