//! REST implementation of [`GenerationBackend`] over the suno-api bridge.
//!
//! Each endpoint has its own timeout: submission waits for a job id (and
//! therefore for any captcha to be solved), the rest are short polls.
//! A 429 is retried inside the client after the bridge's `Retry-After`,
//! with growing jittered delays, up to `max_rate_limit_retries` times.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;

use reso_domain::backoff;
use reso_domain::config::SunoConfig;
use reso_domain::error::{Error, Result};
use reso_domain::event::{CaptchaChallenge, Coordinate};
use reso_domain::trace::TraceEvent;

use crate::backend::{ClipStatus, GenerationBackend};
use crate::types::{CaptchaPending, Clip, CustomGenerateRequest, SolveRequest, SolveResponse};

const SERVICE: &str = "suno";

const SESSION_EXPIRED: &str =
    "session expired; update SUNO_COOKIE for the suno-api bridge and restart it";

/// Shared by every run; clones share the connection pool.
#[derive(Clone)]
pub struct SunoClient {
    http: Client,
    base_url: String,
    title: String,
    model: String,
    submit_timeout: Duration,
    captcha_timeout: Duration,
    solve_timeout: Duration,
    status_timeout: Duration,
    max_rate_limit_retries: u32,
}

/// Raw outcome of one bridge call, after the trace event is out.
struct Reply {
    status: u16,
    body: String,
}

impl SunoClient {
    pub fn new(cfg: &SunoConfig) -> Result<Self> {
        let http = Client::builder()
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;

        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_owned(),
            title: cfg.title.clone(),
            model: cfg.model.clone(),
            submit_timeout: Duration::from_millis(cfg.submit_timeout_ms),
            captcha_timeout: Duration::from_millis(cfg.captcha_timeout_ms),
            solve_timeout: Duration::from_millis(cfg.solve_timeout_ms),
            status_timeout: Duration::from_millis(cfg.status_timeout_ms),
            max_rate_limit_retries: cfg.max_rate_limit_retries,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send the request built by `build`, retrying 429s. Any other status
    /// is handed back to the caller.
    async fn call<F>(&self, endpoint: &str, build: F) -> Result<Reply>
    where
        F: Fn() -> RequestBuilder + Send + Sync,
    {
        let mut attempt: u32 = 0;

        loop {
            let start = Instant::now();
            let resp = build().send().await.map_err(from_reqwest)?;
            let status = resp.status();
            TraceEvent::UpstreamCall {
                service: SERVICE.into(),
                endpoint: endpoint.into(),
                status: status.as_u16(),
                duration_ms: start.elapsed().as_millis() as u64,
            }
            .emit();

            if status == StatusCode::TOO_MANY_REQUESTS {
                let retry_after = backoff::parse_retry_after(
                    resp.headers()
                        .get(reqwest::header::RETRY_AFTER)
                        .and_then(|v| v.to_str().ok()),
                );
                if attempt >= self.max_rate_limit_retries {
                    return Err(Error::RateLimited {
                        service: SERVICE.into(),
                        retry_after_secs: retry_after,
                    });
                }
                let delay = backoff::rate_limit_delay(retry_after, attempt);
                TraceEvent::RateLimited {
                    service: SERVICE.into(),
                    endpoint: endpoint.into(),
                    attempt,
                    delay_ms: delay.as_millis() as u64,
                }
                .emit();
                tokio::time::sleep(delay).await;
                attempt += 1;
                continue;
            }

            let body = resp.text().await.map_err(from_reqwest)?;
            return Ok(Reply {
                status: status.as_u16(),
                body,
            });
        }
    }
}

impl Reply {
    fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Map a non-2xx reply; 401 carries the session hint.
    fn into_error(self) -> Error {
        if self.status == 401 {
            return Error::unauthorized(SERVICE, SESSION_EXPIRED);
        }
        Error::from_status(SERVICE, self.status, self.body, None)
    }

    fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.body)
            .map_err(|e| Error::malformed(SERVICE, format!("unreadable payload: {e}")))
    }
}

#[async_trait]
impl GenerationBackend for SunoClient {
    async fn submit(&self, prompt: &str, tags: &str) -> Result<String> {
        let body = CustomGenerateRequest {
            prompt,
            title: &self.title,
            tags,
            make_instrumental: false,
            model: &self.model,
        };
        tracing::debug!(tags, prompt_len = prompt.len(), "submitting custom generation");
        let reply = self
            .call("POST /api/custom_generate", || {
                self.http
                    .post(self.url("/api/custom_generate"))
                    .timeout(self.submit_timeout)
                    .json(&body)
            })
            .await?;
        if !reply.is_success() {
            return Err(reply.into_error());
        }
        let clips: Vec<Clip> = reply.json()?;
        clips
            .into_iter()
            .next()
            .map(|c| c.id)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| Error::malformed(SERVICE, "submission returned no clip"))
    }

    async fn captcha_status(&self) -> Result<Option<CaptchaChallenge>> {
        let reply = self
            .call("GET /api/captcha/pending", || {
                self.http
                    .get(self.url("/api/captcha/pending"))
                    .timeout(self.captcha_timeout)
            })
            .await?;
        if !reply.is_success() {
            return Err(reply.into_error());
        }
        let pending: CaptchaPending = reply.json()?;
        if !pending.pending {
            return Ok(None);
        }
        match (pending.image, pending.prompt) {
            (Some(image), prompt) => Ok(Some(CaptchaChallenge {
                image,
                prompt: prompt.unwrap_or_default(),
            })),
            (None, _) => Err(Error::malformed(SERVICE, "pending captcha without image")),
        }
    }

    async fn captcha_solve(&self, coordinates: &[Coordinate]) -> Result<bool> {
        let reply = self
            .call("POST /api/captcha/solve", || {
                self.http
                    .post(self.url("/api/captcha/solve"))
                    .timeout(self.solve_timeout)
                    .json(&SolveRequest { coordinates })
            })
            .await?;
        // The bridge answers 404 when no challenge is waiting.
        if reply.status == 404 {
            return Ok(false);
        }
        if !reply.is_success() {
            return Err(reply.into_error());
        }
        Ok(reply.json::<SolveResponse>()?.ok)
    }

    async fn completion_status(&self, job_id: &str) -> Result<ClipStatus> {
        let reply = self
            .call("GET /api/get", || {
                self.http
                    .get(self.url("/api/get"))
                    .query(&[("ids", job_id)])
                    .timeout(self.status_timeout)
            })
            .await?;
        if !reply.is_success() {
            return Err(reply.into_error());
        }
        let mut clips: Vec<Clip> = reply.json()?;
        if clips.is_empty() {
            return Err(Error::malformed(SERVICE, "status reply contains no clip"));
        }
        let idx = clips.iter().position(|c| c.id == job_id).unwrap_or(0);
        let clip = clips.swap_remove(idx);
        Ok(ClipStatus {
            status: clip.status,
            audio_url: clip.audio_url,
            image_url: clip.image_url,
            title: clip.title,
        })
    }
}

pub fn from_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() || e.is_connect() {
        Error::unreachable(SERVICE, e.to_string())
    } else {
        Error::Http(e.to_string())
    }
}
