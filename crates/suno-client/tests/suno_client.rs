//! `SunoClient` against an in-process fake of the suno-api bridge.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use script::Script;
use serde_json::{json, Value};

use reso_domain::config::SunoConfig;
use reso_domain::error::ErrorKind;
use reso_domain::event::Coordinate;
use reso_suno::{GenerationBackend, SunoClient};

/// Scripted replies popped in order, last one repeated.
mod script {
    use std::sync::Mutex;

    pub struct Script(Mutex<Vec<(u16, String)>>);

    impl Script {
        pub fn new(replies: &[(u16, &str)]) -> Self {
            Self(Mutex::new(
                replies
                    .iter()
                    .rev()
                    .map(|(s, b)| (*s, (*b).to_owned()))
                    .collect(),
            ))
        }

        pub fn next(&self) -> (u16, String) {
            let mut q = self.0.lock().unwrap();
            if q.len() > 1 {
                q.pop().unwrap()
            } else {
                q[0].clone()
            }
        }
    }
}

#[derive(Clone)]
struct Fake {
    script: Arc<Script>,
    calls: Arc<AtomicUsize>,
    last_body: Arc<std::sync::Mutex<Value>>,
}

fn reply(status: u16, body: String) -> Response {
    // Rate limits ask for an immediate retry so tests stay fast.
    let retry_after = if status == 429 { "0" } else { "" };
    (
        StatusCode::from_u16(status).unwrap(),
        [("content-type", "application/json"), ("retry-after", retry_after)],
        body,
    )
        .into_response()
}

async fn generate(State(f): State<Fake>, Json(body): Json<Value>) -> Response {
    f.calls.fetch_add(1, Ordering::SeqCst);
    *f.last_body.lock().unwrap() = body;
    let (s, b) = f.script.next();
    reply(s, b)
}

async fn pending(State(f): State<Fake>) -> Response {
    f.calls.fetch_add(1, Ordering::SeqCst);
    let (s, b) = f.script.next();
    reply(s, b)
}

async fn solve(State(f): State<Fake>, Json(body): Json<Value>) -> Response {
    f.calls.fetch_add(1, Ordering::SeqCst);
    *f.last_body.lock().unwrap() = body;
    let (s, b) = f.script.next();
    reply(s, b)
}

async fn status(
    State(f): State<Fake>,
    Query(q): Query<std::collections::HashMap<String, String>>,
) -> Response {
    f.calls.fetch_add(1, Ordering::SeqCst);
    *f.last_body.lock().unwrap() = json!({ "ids": q.get("ids") });
    let (s, b) = f.script.next();
    reply(s, b)
}

async fn spawn(replies: &[(u16, &str)]) -> (SunoClient, Fake) {
    let fake = Fake {
        script: Arc::new(Script::new(replies)),
        calls: Arc::new(AtomicUsize::new(0)),
        last_body: Arc::new(std::sync::Mutex::new(Value::Null)),
    };
    let app = Router::new()
        .route("/api/custom_generate", post(generate))
        .route("/api/captcha/pending", get(pending))
        .route("/api/captcha/solve", post(solve))
        .route("/api/get", get(status))
        .with_state(fake.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    let cfg = SunoConfig {
        base_url: format!("http://{addr}/"),
        ..SunoConfig::default()
    };
    (SunoClient::new(&cfg).unwrap(), fake)
}

// ── submit ──────────────────────────────────────────────────────────

#[tokio::test]
async fn submit_returns_first_clip_id() {
    let (client, fake) = spawn(&[(200, r#"[{"id":"abc123","status":"submitted"},{"id":"def456"}]"#)]).await;
    let id = client.submit("dreamy shoegaze", "shoegaze, dream pop").await.unwrap();
    assert_eq!(id, "abc123");

    let body = fake.last_body.lock().unwrap().clone();
    assert_eq!(body["prompt"], "dreamy shoegaze");
    assert_eq!(body["tags"], "shoegaze, dream pop");
    assert_eq!(body["title"], "My Reso Track");
    assert_eq!(body["make_instrumental"], false);
    assert_eq!(body["model"], "chirp-v4");
}

#[tokio::test]
async fn submit_401_is_unauthorized() {
    let (client, _) = spawn(&[(401, r#"{"error":"unauthorized"}"#)]).await;
    let err = client.submit("p", "t").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
    assert!(err.to_string().contains("SUNO_COOKIE"));
}

#[tokio::test]
async fn submit_empty_list_is_malformed() {
    let (client, _) = spawn(&[(200, "[]")]).await;
    let err = client.submit("p", "t").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Malformed);
}

#[tokio::test]
async fn submit_retries_rate_limit_transparently() {
    let (client, fake) = spawn(&[
        (429, r#"{"error":"slow down"}"#),
        (200, r#"[{"id":"abc123"}]"#),
    ])
    .await;
    let id = client.submit("p", "t").await.unwrap();
    assert_eq!(id, "abc123");
    assert_eq!(fake.calls.load(Ordering::SeqCst), 2);
    // The retried request carries the same body.
    assert_eq!(fake.last_body.lock().unwrap()["prompt"], "p");
}

#[tokio::test]
async fn persistent_rate_limit_surfaces_after_retries() {
    let (client, fake) = spawn(&[(429, r#"{"error":"slow down"}"#)]).await;
    let err = client.submit("p", "t").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RateLimited);
    // One attempt plus the default three retries.
    assert_eq!(fake.calls.load(Ordering::SeqCst), 4);
}

// ── captcha ─────────────────────────────────────────────────────────

#[tokio::test]
async fn captcha_status_maps_pending_and_absent() {
    let (client, _) = spawn(&[
        (200, r#"{"pending":true,"image":"iVBORw0KGgo=","prompt":"Click the bicycles"}"#),
        (200, r#"{"pending":false}"#),
    ])
    .await;

    let challenge = client.captcha_status().await.unwrap().unwrap();
    assert_eq!(challenge.image, "iVBORw0KGgo=");
    assert_eq!(challenge.prompt, "Click the bicycles");
    assert!(client.captcha_status().await.unwrap().is_none());
}

#[tokio::test]
async fn captcha_status_500_is_unreachable() {
    let (client, _) = spawn(&[(500, r#"{"error":"browser crashed"}"#)]).await;
    let err = client.captcha_status().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unreachable);
}

#[tokio::test]
async fn captcha_solve_forwards_coordinates() {
    let (client, fake) = spawn(&[(200, r#"{"ok":true}"#), (404, r#"{"error":"No CAPTCHA pending"}"#)]).await;
    let coords = [Coordinate { x: 12.0, y: 34.0 }, Coordinate { x: 56.5, y: 78.0 }];

    assert!(client.captcha_solve(&coords).await.unwrap());
    let body = fake.last_body.lock().unwrap().clone();
    assert_eq!(body["coordinates"][1]["x"], 56.5);

    // Nothing pending any more.
    assert!(!client.captcha_solve(&coords).await.unwrap());
}

// ── completion status ───────────────────────────────────────────────

#[tokio::test]
async fn completion_status_reads_clip() {
    let (client, fake) = spawn(&[(
        200,
        r#"[{"id":"abc123","status":"complete","audio_url":"https://x/a.mp3","image_url":"https://x/a.jpg","title":"Night Drive"}]"#,
    )])
    .await;
    let status = client.completion_status("abc123").await.unwrap();
    assert!(status.is_complete());
    assert_eq!(status.audio_url.as_deref(), Some("https://x/a.mp3"));
    assert_eq!(status.title.as_deref(), Some("Night Drive"));
    assert_eq!(fake.last_body.lock().unwrap()["ids"], "abc123");
}

#[tokio::test]
async fn completion_status_retries_rate_limit() {
    let (client, fake) = spawn(&[
        (429, "{}"),
        (429, "{}"),
        (200, r#"[{"id":"abc123","status":"streaming"}]"#),
    ])
    .await;
    let status = client.completion_status("abc123").await.unwrap();
    assert_eq!(status.status, "streaming");
    assert_eq!(fake.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn completion_status_error_mapping() {
    let (client, fake) = spawn(&[
        (401, "{}"),
        (503, "down"),
        (404, "gone"),
        (200, "<html>"),
        (200, "[]"),
    ])
    .await;

    let kinds: Vec<ErrorKind> = {
        let mut out = Vec::new();
        for _ in 0..5 {
            out.push(client.completion_status("abc123").await.unwrap_err().kind());
        }
        out
    };
    assert_eq!(
        kinds,
        vec![
            ErrorKind::Unauthorized,
            ErrorKind::Unreachable,
            ErrorKind::BadStatus,
            ErrorKind::Malformed,
            ErrorKind::Malformed,
        ]
    );
    assert_eq!(fake.calls.load(Ordering::SeqCst), 5);
}
