use reso_domain::error::Result;
use reso_domain::profile::TasteProfile;
use reso_domain::prompt::PromptBundle;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Core synthesizer trait
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Turns a taste profile into generation prompts.
///
/// `novelty` runs from 0.0 (stay in the listener's comfort zone) to 1.0
/// (maximum exploration). Implementations fail with `Malformed` when the
/// model's reply lacks a required field and `Unreachable` when the service
/// cannot be reached.
#[async_trait::async_trait]
pub trait PromptSynthesizer: Send + Sync {
    async fn synthesize(&self, profile: &TasteProfile, novelty: f32) -> Result<PromptBundle>;

    /// Stable identifier for logs.
    fn provider_id(&self) -> &str;
}
