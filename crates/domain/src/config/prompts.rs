use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Prompt synthesis (Anthropic Messages API)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptsConfig {
    #[serde(default = "d_base_url")]
    pub base_url: String,
    #[serde(default = "d_model")]
    pub model: String,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default = "d_600")]
    pub max_tokens: u32,
    #[serde(default = "d_60000")]
    pub timeout_ms: u64,
    #[serde(default = "d_3")]
    pub max_rate_limit_retries: u32,
}

impl Default for PromptsConfig {
    fn default() -> Self {
        Self {
            base_url: d_base_url(),
            model: d_model(),
            auth: AuthConfig::default(),
            max_tokens: 600,
            timeout_ms: 60_000,
            max_rate_limit_retries: 3,
        }
    }
}

/// Where the API key comes from. A literal `key` wins over `env`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Env var containing the key.
    #[serde(default = "d_key_env")]
    pub env: Option<String>,
    /// Direct key (for config-only setups; prefer env).
    #[serde(default)]
    pub key: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            env: d_key_env(),
            key: None,
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_base_url() -> String {
    "https://api.anthropic.com".into()
}
fn d_model() -> String {
    "claude-sonnet-4-6".into()
}
fn d_key_env() -> Option<String> {
    Some("ANTHROPIC_API_KEY".into())
}
fn d_600() -> u32 {
    600
}
fn d_60000() -> u64 {
    60_000
}
fn d_3() -> u32 {
    3
}
