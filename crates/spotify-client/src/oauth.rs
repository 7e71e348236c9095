//! Refresh-token grant against the Spotify accounts service.
//!
//! The authorization-code exchange (login) happens outside Reso; this only
//! keeps an existing credential alive.

use std::time::Instant;

use chrono::Utc;
use reqwest::Client;

use reso_domain::credential::Credential;
use reso_domain::error::{Error, Result};
use reso_domain::trace::TraceEvent;

use crate::rest::from_reqwest;
use crate::types::TokenResponse;

const SERVICE: &str = "spotify-accounts";

/// OAuth client credentials used for the refresh grant.
#[derive(Clone)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl std::fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .finish()
    }
}

impl ClientCredentials {
    /// Read both values from the named environment variables. Missing
    /// variables become empty strings and fail at refresh time.
    pub fn from_env(client_id_env: &str, client_secret_env: &str) -> Self {
        Self {
            client_id: std::env::var(client_id_env).unwrap_or_default(),
            client_secret: std::env::var(client_secret_env).unwrap_or_default(),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }
}

/// POST `grant_type=refresh_token` and fold the response into a new
/// credential.
pub async fn refresh_credential(
    http: &Client,
    token_url: &str,
    client: &ClientCredentials,
    credential: &Credential,
) -> Result<Credential> {
    if !client.is_configured() {
        return Err(Error::Config(
            "spotify client id/secret not set; cannot refresh access token".into(),
        ));
    }

    let form = [
        ("grant_type", "refresh_token"),
        ("refresh_token", credential.refresh_token.as_str()),
        ("client_id", client.client_id.as_str()),
        ("client_secret", client.client_secret.as_str()),
    ];

    let start = Instant::now();
    let resp = http
        .post(token_url)
        .form(&form)
        .send()
        .await
        .map_err(from_reqwest)?;
    let status = resp.status().as_u16();
    TraceEvent::UpstreamCall {
        service: SERVICE.into(),
        endpoint: "POST /api/token".into(),
        status,
        duration_ms: start.elapsed().as_millis() as u64,
    }
    .emit();

    if !resp.status().is_success() {
        let body = resp.text().await.unwrap_or_default();
        // The accounts service answers a revoked refresh token with 400
        // `invalid_grant`; treat it like any other auth failure.
        if status == 400 && body.contains("invalid_grant") {
            return Err(Error::unauthorized(SERVICE, body));
        }
        return Err(Error::from_status(SERVICE, status, body, None));
    }

    let body = resp.text().await.map_err(from_reqwest)?;
    let token: TokenResponse = serde_json::from_str(&body)
        .map_err(|e| Error::malformed(SERVICE, format!("token response: {e}")))?;

    Ok(credential.refreshed(
        token.access_token,
        token.refresh_token,
        token.expires_in,
        Utc::now(),
    ))
}
