use std::time::Duration;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Generation run policy
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Timing and fault-tolerance knobs for a generation run.
///
/// The completion schedule polls every `poll_interval_secs` until
/// `late_threshold_secs` of elapsed time, every `late_poll_interval_secs`
/// after that, and gives up at `timeout_secs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "d_2000")]
    pub captcha_poll_interval_ms: u64,
    #[serde(default = "d_5")]
    pub poll_interval_secs: u64,
    #[serde(default = "d_10")]
    pub late_poll_interval_secs: u64,
    #[serde(default = "d_60")]
    pub late_threshold_secs: u64,
    #[serde(default = "d_180")]
    pub timeout_secs: u64,
    /// Consecutive failed status polls that end the run.
    #[serde(default = "d_5u32")]
    pub max_consecutive_errors: u32,
    /// A keepalive frame goes out every N ticks of either poll loop.
    #[serde(default = "d_5u32")]
    pub keepalive_every: u32,
    #[serde(default = "d_novelty")]
    pub default_novelty: f32,
    /// A cached profile younger than this is reused instead of refetched.
    #[serde(default = "d_3600")]
    pub profile_cache_ttl_secs: u64,
    /// Title reported when the backend supplies none.
    #[serde(default = "d_default_title")]
    pub default_title: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            captcha_poll_interval_ms: 2_000,
            poll_interval_secs: 5,
            late_poll_interval_secs: 10,
            late_threshold_secs: 60,
            timeout_secs: 180,
            max_consecutive_errors: 5,
            keepalive_every: 5,
            default_novelty: d_novelty(),
            profile_cache_ttl_secs: 3600,
            default_title: d_default_title(),
        }
    }
}

impl GenerationConfig {
    pub fn captcha_poll_interval(&self) -> Duration {
        Duration::from_millis(self.captcha_poll_interval_ms)
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_2000() -> u64 {
    2_000
}
fn d_5() -> u64 {
    5
}
fn d_10() -> u64 {
    10
}
fn d_60() -> u64 {
    60
}
fn d_180() -> u64 {
    180
}
fn d_5u32() -> u32 {
    5
}
fn d_novelty() -> f32 {
    0.2
}
fn d_3600() -> u64 {
    3600
}
fn d_default_title() -> String {
    "Your Reso Track".into()
}
