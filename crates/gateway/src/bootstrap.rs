//! AppState construction shared by `serve` and the one-shot CLI commands.

use std::sync::Arc;

use anyhow::Context;
use sha2::{Digest, Sha256};

use reso_domain::config::{Config, ConfigSeverity};
use reso_providers::AnthropicSynthesizer;
use reso_suno::SunoClient;

use crate::runtime::{Orchestrator, RunSettings};
use crate::state::AppState;
use crate::store::FileStore;

/// Validate config, build every adapter and return a fully-wired
/// [`AppState`].
pub fn build_app_state(config: Arc<Config>) -> anyhow::Result<AppState> {
    // ── Config validation ────────────────────────────────────────────
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    if Config::has_errors(&issues) {
        anyhow::bail!(
            "config validation failed with {} error(s)",
            issues
                .iter()
                .filter(|i| i.severity == ConfigSeverity::Error)
                .count()
        );
    }

    // ── Records ──────────────────────────────────────────────────────
    let store = Arc::new(FileStore::open(&config.storage).with_context(|| {
        format!("opening state directory {}", config.storage.state_path.display())
    })?);
    tracing::info!(path = %config.storage.state_path.display(), "record store ready");

    // ── Adapters ─────────────────────────────────────────────────────
    let profiles = reso_spotify::create_profile_source(&config.spotify, &config.musicbrainz)
        .context("creating Spotify client")?;
    tracing::info!(
        api_base = %config.spotify.api_base,
        musicbrainz = config.musicbrainz.enabled,
        "profile source ready"
    );

    let synthesizer = Arc::new(
        AnthropicSynthesizer::from_config(&config.prompts)
            .context("creating prompt synthesizer")?,
    );
    tracing::info!(model = %config.prompts.model, "prompt synthesizer ready");

    let backend = Arc::new(SunoClient::new(&config.suno).context("creating suno client")?);
    tracing::info!(base_url = %config.suno.base_url, "generation backend ready");

    let orchestrator = Orchestrator::new(
        profiles,
        synthesizer,
        backend,
        store,
        RunSettings::from_config(&config),
    );

    // ── API token (read once, stored as hash) ────────────────────────
    let api_token_hash = api_token_hash(&config.server.api_token_env);
    if api_token_hash.is_none() {
        tracing::warn!(
            env = %config.server.api_token_env,
            "no API token configured; API endpoints are unauthenticated (dev mode)"
        );
    }

    Ok(AppState::new(config, orchestrator, api_token_hash))
}

/// SHA-256 of the token in `env_name`, or `None` when unset or empty.
pub fn api_token_hash(env_name: &str) -> Option<Vec<u8>> {
    std::env::var(env_name)
        .ok()
        .filter(|t| !t.is_empty())
        .map(|t| Sha256::digest(t.as_bytes()).to_vec())
}
