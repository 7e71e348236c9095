mod generation;
mod musicbrainz;
mod observability;
mod prompts;
mod server;
mod spotify;
mod storage;
mod suno;

pub use generation::*;
pub use musicbrainz::*;
pub use observability::*;
pub use prompts::*;
pub use server::*;
pub use spotify::*;
pub use storage::*;
pub use suno::*;

use serde::{Deserialize, Serialize};
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
    #[serde(default)]
    pub spotify: SpotifyConfig,
    #[serde(default)]
    pub musicbrainz: MusicBrainzConfig,
    #[serde(default)]
    pub prompts: PromptsConfig,
    #[serde(default)]
    pub suno: SunoConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl ConfigError {
    fn error(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: ConfigSeverity::Error,
            field: field.into(),
            message: message.into(),
        }
    }

    fn warning(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: ConfigSeverity::Warning,
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return a list of issues.
    ///
    /// Returns an empty vec when everything looks good.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.server.port == 0 {
            errors.push(ConfigError::error("server.port", "port must be greater than 0"));
        }
        if self.server.host.is_empty() {
            errors.push(ConfigError::error("server.host", "host must not be empty"));
        }
        if self.server.cors.allowed_origins.len() == 1
            && self.server.cors.allowed_origins[0] == "*"
        {
            errors.push(ConfigError::warning(
                "server.cors.allowed_origins",
                "wildcard \"*\" allows all origins (not recommended for production)",
            ));
        }

        for (field, url) in [
            ("spotify.api_base", &self.spotify.api_base),
            ("spotify.token_url", &self.spotify.token_url),
            ("prompts.base_url", &self.prompts.base_url),
            ("suno.base_url", &self.suno.base_url),
        ] {
            if url.is_empty() {
                errors.push(ConfigError::error(field, "must not be empty"));
            } else if !url.starts_with("http://") && !url.starts_with("https://") {
                errors.push(ConfigError::error(field, format!("not an http(s) URL: {url}")));
            }
        }
        if self.musicbrainz.enabled && self.musicbrainz.base_url.is_empty() {
            errors.push(ConfigError::error(
                "musicbrainz.base_url",
                "must not be empty when musicbrainz is enabled",
            ));
        }

        if self.spotify.batch_size == 0 || self.spotify.batch_size > 50 {
            errors.push(ConfigError::error(
                "spotify.batch_size",
                "must be between 1 and 50",
            ));
        }

        if self.prompts.auth.key.is_none() && self.prompts.auth.env.is_none() {
            errors.push(ConfigError::warning(
                "prompts.auth",
                "no API key or env var configured; prompt synthesis will fail",
            ));
        }

        let g = &self.generation;
        if g.poll_interval_secs == 0 || g.late_poll_interval_secs == 0 {
            errors.push(ConfigError::error(
                "generation.poll_interval_secs",
                "poll intervals must be greater than 0",
            ));
        }
        if g.captcha_poll_interval_ms == 0 {
            errors.push(ConfigError::error(
                "generation.captcha_poll_interval_ms",
                "must be greater than 0",
            ));
        }
        if g.timeout_secs <= g.late_threshold_secs {
            errors.push(ConfigError::warning(
                "generation.timeout_secs",
                "timeout is not after late_threshold; the late interval is never used",
            ));
        }
        if g.max_consecutive_errors == 0 {
            errors.push(ConfigError::error(
                "generation.max_consecutive_errors",
                "must be at least 1",
            ));
        }
        if g.keepalive_every == 0 {
            errors.push(ConfigError::error(
                "generation.keepalive_every",
                "must be at least 1",
            ));
        }
        if !(0.0..=1.0).contains(&g.default_novelty) {
            errors.push(ConfigError::error(
                "generation.default_novelty",
                "must be within 0.0..=1.0",
            ));
        }

        if !(0.0..=1.0).contains(&self.observability.sample_rate) {
            errors.push(ConfigError::error(
                "observability.sample_rate",
                "must be within 0.0..=1.0",
            ));
        }

        errors
    }

    /// True when `validate()` reported at least one `Error`.
    pub fn has_errors(issues: &[ConfigError]) -> bool {
        issues.iter().any(|e| e.severity == ConfigSeverity::Error)
    }
}
