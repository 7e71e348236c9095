//! `reso-spotify`: listening-history adapter for Reso.
//!
//! Provides the [`ProfileSource`] trait the orchestrator depends on, a
//! production implementation over the Spotify Web API ([`SpotifyClient`]),
//! the refresh-token grant, the weighted taste-profile aggregation
//! ([`build_taste_profile`]), and an optional MusicBrainz genre fallback
//! with an injected bounded cache.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use reso_domain::config::{MusicBrainzConfig, SpotifyConfig};
//! use reso_spotify::{GenreCache, MusicBrainzClient, SpotifyClient};
//!
//! # fn example() -> reso_domain::error::Result<()> {
//! let mb_cfg = MusicBrainzConfig::default();
//! let cache = Arc::new(GenreCache::new(mb_cfg.cache_capacity));
//! let mb = Arc::new(MusicBrainzClient::new(&mb_cfg, cache)?);
//! let client = SpotifyClient::new(&SpotifyConfig::default())?
//!     .with_genre_lookup(mb, mb_cfg.max_lookups_per_profile);
//! # let _ = client;
//! # Ok(())
//! # }
//! ```

pub mod analyzer;
pub mod genres;
pub mod oauth;
pub mod provider;
pub mod rest;
pub mod types;

pub use analyzer::build_taste_profile;
pub use genres::{GenreCache, GenreLookup, MusicBrainzClient, NoGenreLookup};
pub use oauth::ClientCredentials;
pub use provider::ProfileSource;
pub use rest::{from_reqwest, SpotifyClient};
pub use types::{ArtistMeta, ListeningData, TrackMeta};

use std::sync::Arc;

use reso_domain::config::{MusicBrainzConfig, SpotifyConfig};
use reso_domain::error::Result;

/// Build the production profile source from config, wiring in the
/// MusicBrainz fallback when enabled.
pub fn create_profile_source(
    spotify: &SpotifyConfig,
    musicbrainz: &MusicBrainzConfig,
) -> Result<Arc<dyn ProfileSource>> {
    let client = SpotifyClient::new(spotify)?;
    if !musicbrainz.enabled {
        tracing::info!("musicbrainz genre fallback disabled");
        return Ok(Arc::new(client));
    }
    let cache = Arc::new(GenreCache::new(musicbrainz.cache_capacity));
    let lookup = Arc::new(MusicBrainzClient::new(musicbrainz, cache)?);
    Ok(Arc::new(
        client.with_genre_lookup(lookup, musicbrainz.max_lookups_per_profile),
    ))
}
