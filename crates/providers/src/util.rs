//! Shared utility functions for provider adapters.

use reso_domain::config::AuthConfig;
use reso_domain::error::{Error, Result};

pub(crate) const SERVICE: &str = "anthropic";

/// Convert a [`reqwest::Error`] into the domain [`Error`] type.
///
/// Timeouts and connection failures map to `Unreachable`; everything else
/// maps to [`Error::Http`].
pub(crate) fn from_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() || e.is_connect() {
        Error::unreachable(SERVICE, e.to_string())
    } else {
        Error::Http(e.to_string())
    }
}

/// Resolve the API key from an [`AuthConfig`].
///
/// Precedence:
/// 1. `key` field (plaintext, warns)
/// 2. `env` field (reads environment variable)
/// 3. Error
pub fn resolve_api_key(auth: &AuthConfig) -> Result<String> {
    if let Some(ref key) = auth.key {
        tracing::warn!(
            "API key loaded from plaintext config field 'key'; prefer 'env' instead"
        );
        return Ok(key.clone());
    }

    if let Some(ref env_var) = auth.env {
        return match std::env::var(env_var) {
            Ok(v) if !v.trim().is_empty() => Ok(v),
            _ => Err(Error::Config(format!(
                "environment variable '{env_var}' not set or empty"
            ))),
        };
    }

    Err(Error::Config(
        "no API key configured: set 'key' or 'env' in [prompts.auth]".into(),
    ))
}
