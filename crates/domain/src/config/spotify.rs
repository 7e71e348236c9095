use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Spotify (listening history + OAuth refresh)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyConfig {
    #[serde(default = "d_api_base")]
    pub api_base: String,
    #[serde(default = "d_token_url")]
    pub token_url: String,
    /// Env var holding the OAuth client id used for refresh grants.
    #[serde(default = "d_client_id_env")]
    pub client_id_env: String,
    #[serde(default = "d_client_secret_env")]
    pub client_secret_env: String,
    #[serde(default = "d_15000")]
    pub timeout_ms: u64,
    /// 429 retries per request before `RateLimited` surfaces.
    #[serde(default = "d_5")]
    pub max_rate_limit_retries: u32,
    /// Ids per `/artists` request. The API rejects more than 50.
    #[serde(default = "d_50")]
    pub batch_size: usize,
    /// `limit` for paged listening-history endpoints.
    #[serde(default = "d_50")]
    pub page_limit: usize,
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            api_base: d_api_base(),
            token_url: d_token_url(),
            client_id_env: d_client_id_env(),
            client_secret_env: d_client_secret_env(),
            timeout_ms: 15_000,
            max_rate_limit_retries: 5,
            batch_size: 50,
            page_limit: 50,
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_api_base() -> String {
    "https://api.spotify.com/v1".into()
}
fn d_token_url() -> String {
    "https://accounts.spotify.com/api/token".into()
}
fn d_client_id_env() -> String {
    "SPOTIFY_CLIENT_ID".into()
}
fn d_client_secret_env() -> String {
    "SPOTIFY_CLIENT_SECRET".into()
}
fn d_15000() -> u64 {
    15_000
}
fn d_5() -> u32 {
    5
}
fn d_50() -> usize {
    50
}
