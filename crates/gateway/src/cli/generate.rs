//! `reso generate`: one run from the terminal.

use std::sync::Arc;

use reso_domain::config::Config;
use reso_domain::event::ProgressEvent;

use crate::bootstrap;
use crate::runtime::{Frame, GenerationRequest};

pub struct GenerateArgs {
    pub user: String,
    pub novelty: Option<f32>,
    pub platform: String,
    pub prompt: Option<String>,
    pub json: bool,
}

/// Drive a run to its terminal event. Returns `true` on completion.
pub async fn run(config: Arc<Config>, args: GenerateArgs) -> anyhow::Result<bool> {
    if let Some(n) = args.novelty {
        anyhow::ensure!((0.0..=1.0).contains(&n), "--novelty must be between 0 and 1");
    }
    let state = bootstrap::build_app_state(config)?;
    if state.store.user(&args.user).await?.is_none() {
        anyhow::bail!("user '{}' not found", args.user);
    }

    let request = GenerationRequest {
        user_id: args.user,
        profile: None,
        novelty: args.novelty,
        platform: args.platform,
        custom_prompt: args.prompt,
    };
    let mut progress = state.orchestrator.run(request);

    let mut succeeded = false;
    while let Some(frame) = progress.next().await {
        let Frame::Event(event) = frame else { continue };
        if args.json {
            let line = serde_json::json!({ "event": event.name(), "data": event.payload() });
            println!("{line}");
        } else {
            println!("{}", render(&event));
        }
        succeeded = matches!(event, ProgressEvent::Complete(_));
    }
    Ok(succeeded)
}

fn render(event: &ProgressEvent) -> String {
    match event {
        ProgressEvent::Status { message, .. } => format!("... {message}"),
        ProgressEvent::PromptReady(p) => {
            format!("prompt: {}\nconcept: {}", p.suno_prompt, p.song_concept)
        }
        ProgressEvent::CaptchaRequired(c) => format!(
            "CAPTCHA pending: {}\n  solve with `reso captcha solve x,y ...`",
            c.prompt
        ),
        ProgressEvent::Complete(t) => format!("done: {}\n  audio: {}\n  {}", t.title, t.audio_url, t.suno_url),
        ProgressEvent::Error { message } => format!("error: {message}"),
    }
}
