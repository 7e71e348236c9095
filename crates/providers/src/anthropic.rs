//! Anthropic Messages API adapter for prompt synthesis.
//!
//! Sends the system prompt plus one user turn and parses the first text
//! block of the reply. A 429 is retried after the server's `Retry-After`
//! with jittered backoff; other failures surface immediately.

use std::time::{Duration, Instant};

use serde_json::Value;

use reso_domain::backoff;
use reso_domain::config::PromptsConfig;
use reso_domain::error::{Error, Result};
use reso_domain::profile::TasteProfile;
use reso_domain::prompt::PromptBundle;
use reso_domain::trace::TraceEvent;

use crate::parse::parse_bundle;
use crate::prompts::{user_message, SYSTEM_PROMPT};
use crate::traits::PromptSynthesizer;
use crate::util::{from_reqwest, resolve_api_key, SERVICE};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Constants
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

const ANTHROPIC_VERSION: &str = "2023-06-01";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Adapter struct
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct AnthropicSynthesizer {
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    max_rate_limit_retries: u32,
    client: reqwest::Client,
}

impl AnthropicSynthesizer {
    /// Create a synthesizer from the `[prompts]` config section.
    pub fn from_config(cfg: &PromptsConfig) -> Result<Self> {
        let api_key = resolve_api_key(&cfg.auth)?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .build()
            .map_err(from_reqwest)?;

        Ok(Self {
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: cfg.model.clone(),
            max_tokens: cfg.max_tokens,
            max_rate_limit_retries: cfg.max_rate_limit_retries,
            client,
        })
    }

    // ── Internal helpers ───────────────────────────────────────────

    fn authed_post(&self, url: &str) -> reqwest::RequestBuilder {
        self.client
            .post(url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
    }

    fn build_messages_body(&self, profile: &TasteProfile, novelty: f32) -> Value {
        serde_json::json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "system": SYSTEM_PROMPT,
            "messages": [
                { "role": "user", "content": user_message(profile, novelty) }
            ],
        })
    }

    /// POST the request, retrying 429s. Returns the response body text.
    async fn send(&self, body: &Value) -> Result<String> {
        let url = format!("{}/v1/messages", self.base_url);
        let mut attempt: u32 = 0;

        loop {
            tracing::debug!(url = %url, model = %self.model, attempt, "anthropic prompt request");
            let start = Instant::now();
            let resp = self
                .authed_post(&url)
                .json(body)
                .send()
                .await
                .map_err(from_reqwest)?;
            let status = resp.status().as_u16();
            TraceEvent::UpstreamCall {
                service: SERVICE.into(),
                endpoint: "POST /v1/messages".into(),
                status,
                duration_ms: start.elapsed().as_millis() as u64,
            }
            .emit();

            let retry_after = backoff::parse_retry_after(
                resp.headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok()),
            );
            let text = resp.text().await.map_err(from_reqwest)?;

            if status == 429 && attempt < self.max_rate_limit_retries {
                let delay = backoff::rate_limit_delay(retry_after, attempt);
                TraceEvent::RateLimited {
                    service: SERVICE.into(),
                    endpoint: "POST /v1/messages".into(),
                    attempt,
                    delay_ms: delay.as_millis() as u64,
                }
                .emit();
                tokio::time::sleep(delay).await;
                attempt += 1;
                continue;
            }
            if !(200..300).contains(&status) {
                return Err(Error::from_status(SERVICE, status, text, retry_after));
            }
            return Ok(text);
        }
    }
}

/// Concatenated text blocks of a Messages API response.
fn response_text(resp: &Value) -> Result<String> {
    let blocks = resp
        .get("content")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::malformed(SERVICE, "response has no content array"))?;
    let text: String = blocks
        .iter()
        .filter(|b| b.get("type").and_then(Value::as_str) == Some("text"))
        .filter_map(|b| b.get("text").and_then(Value::as_str))
        .collect();
    if text.trim().is_empty() {
        return Err(Error::malformed(SERVICE, "response contains no text"));
    }
    Ok(text)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Trait implementation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait::async_trait]
impl PromptSynthesizer for AnthropicSynthesizer {
    async fn synthesize(&self, profile: &TasteProfile, novelty: f32) -> Result<PromptBundle> {
        let body = self.build_messages_body(profile, novelty.clamp(0.0, 1.0));
        let resp_text = self.send(&body).await?;
        let resp_json: Value = serde_json::from_str(&resp_text)
            .map_err(|e| Error::malformed(SERVICE, format!("response is not JSON: {e}")))?;
        parse_bundle(&response_text(&resp_json)?)
    }

    fn provider_id(&self) -> &str {
        SERVICE
    }
}
