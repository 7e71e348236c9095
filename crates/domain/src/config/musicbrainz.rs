use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// MusicBrainz genre fallback
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Genre lookup for artists the listening-history provider returns
/// without genres.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MusicBrainzConfig {
    #[serde(default = "d_true")]
    pub enabled: bool,
    #[serde(default = "d_base_url")]
    pub base_url: String,
    /// MusicBrainz rejects anonymous clients; identify ourselves.
    #[serde(default = "d_user_agent")]
    pub user_agent: String,
    /// Minimum spacing between lookups (service limit is 1 req/s).
    #[serde(default = "d_1100")]
    pub min_interval_ms: u64,
    /// Capacity of the artist → genres cache. Full cache stops admitting.
    #[serde(default = "d_256")]
    pub cache_capacity: usize,
    /// Uncached lookups allowed while building one profile.
    #[serde(default = "d_25")]
    pub max_lookups_per_profile: usize,
    #[serde(default = "d_10000")]
    pub timeout_ms: u64,
    /// Retries on transport failure, 2s apart.
    #[serde(default = "d_2")]
    pub retries: u32,
}

impl Default for MusicBrainzConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: d_base_url(),
            user_agent: d_user_agent(),
            min_interval_ms: 1100,
            cache_capacity: 256,
            max_lookups_per_profile: 25,
            timeout_ms: 10_000,
            retries: 2,
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_true() -> bool {
    true
}
fn d_base_url() -> String {
    "https://musicbrainz.org/ws/2".into()
}
fn d_user_agent() -> String {
    concat!("Reso/", env!("CARGO_PKG_VERSION"), " (https://github.com/reso-app/reso)").into()
}
fn d_1100() -> u64 {
    1100
}
fn d_256() -> usize {
    256
}
fn d_25() -> usize {
    25
}
fn d_10000() -> u64 {
    10_000
}
fn d_2() -> u32 {
    2
}
