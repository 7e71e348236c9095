use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Generation backend (suno-api bridge)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SunoConfig {
    #[serde(default = "d_base_url")]
    pub base_url: String,
    /// Submission blocks until the bridge has a job id, which may include
    /// the time an operator spends on a captcha.
    #[serde(default = "d_300000")]
    pub submit_timeout_ms: u64,
    #[serde(default = "d_5000")]
    pub captcha_timeout_ms: u64,
    #[serde(default = "d_10000")]
    pub solve_timeout_ms: u64,
    #[serde(default = "d_15000")]
    pub status_timeout_ms: u64,
    /// 429 retries per request before `RateLimited` surfaces.
    #[serde(default = "d_3")]
    pub max_rate_limit_retries: u32,
    /// Title sent with each submission.
    #[serde(default = "d_title")]
    pub title: String,
    #[serde(default = "d_model")]
    pub model: String,
    /// Public song page prefix; the job id is appended.
    #[serde(default = "d_song_url_base")]
    pub song_url_base: String,
}

impl Default for SunoConfig {
    fn default() -> Self {
        Self {
            base_url: d_base_url(),
            submit_timeout_ms: 300_000,
            captcha_timeout_ms: 5_000,
            solve_timeout_ms: 10_000,
            status_timeout_ms: 15_000,
            max_rate_limit_retries: 3,
            title: d_title(),
            model: d_model(),
            song_url_base: d_song_url_base(),
        }
    }
}

impl SunoConfig {
    pub fn song_url(&self, job_id: &str) -> String {
        format!("{}/{}", self.song_url_base.trim_end_matches('/'), job_id)
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_base_url() -> String {
    "http://localhost:3000".into()
}
fn d_300000() -> u64 {
    300_000
}
fn d_5000() -> u64 {
    5_000
}
fn d_10000() -> u64 {
    10_000
}
fn d_15000() -> u64 {
    15_000
}
fn d_3() -> u32 {
    3
}
fn d_title() -> String {
    "My Reso Track".into()
}
fn d_model() -> String {
    "chirp-v4".into()
}
fn d_song_url_base() -> String {
    "https://suno.com/song".into()
}
