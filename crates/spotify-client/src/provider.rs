//! The `ProfileSource` trait is the orchestrator's view of the listening
//! history provider (Spotify in production, scripted fakes in tests).

use async_trait::async_trait;
use reso_domain::credential::Credential;
use reso_domain::error::Result;
use reso_domain::profile::TasteProfile;

#[async_trait]
pub trait ProfileSource: Send + Sync {
    /// Exchange the refresh token for a fresh access token.
    async fn refresh_credential(&self, credential: &Credential) -> Result<Credential>;

    /// Fetch listening history and aggregate it into a profile.
    ///
    /// Fails with `Unauthorized` when the access token is rejected and
    /// `Unreachable` when the provider cannot be reached.
    async fn fetch_profile(&self, credential: &Credential) -> Result<TasteProfile>;
}
