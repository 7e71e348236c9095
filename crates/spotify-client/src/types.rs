//! Spotify Web API DTOs and the flattened listening data the analyzer
//! consumes.
//!
//! Only fields Reso reads are modelled; unknown fields are ignored.

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Wire types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Deserialize)]
pub struct Paging<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArtistRef {
    /// `None` for local files.
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Album {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Track {
    pub name: String,
    #[serde(default)]
    pub artists: Vec<ArtistRef>,
    #[serde(default)]
    pub album: Album,
    #[serde(default)]
    pub popularity: Option<u32>,
    #[serde(default)]
    pub explicit: bool,
}

/// Item of `/me/player/recently-played` and `/me/tracks`.
#[derive(Debug, Clone, Deserialize)]
pub struct TrackItem {
    pub track: Track,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Artist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub popularity: Option<u32>,
}

/// `/artists?ids=` returns `null` for unknown ids.
#[derive(Debug, Clone, Deserialize)]
pub struct ArtistsResponse {
    #[serde(default)]
    pub artists: Vec<Option<Artist>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

/// Time windows of the `/me/top/*` endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeRange {
    Short,
    Medium,
    Long,
}

impl TimeRange {
    pub fn as_param(self) -> &'static str {
        match self {
            Self::Short => "short_term",
            Self::Medium => "medium_term",
            Self::Long => "long_term",
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Aggregation input
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A track with its artists' genres attached.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackMeta {
    pub name: String,
    pub artists: Vec<String>,
    pub release_date: String,
    pub popularity: Option<u32>,
    pub explicit: bool,
    pub genres: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArtistMeta {
    pub name: String,
    pub genres: Vec<String>,
}

/// Everything `build_taste_profile` needs, grouped by source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListeningData {
    pub top_short: Vec<TrackMeta>,
    pub top_medium: Vec<TrackMeta>,
    pub top_long: Vec<TrackMeta>,
    pub recently_played: Vec<TrackMeta>,
    pub saved_tracks: Vec<TrackMeta>,
    pub top_artists_short: Vec<ArtistMeta>,
    pub top_artists_medium: Vec<ArtistMeta>,
}
