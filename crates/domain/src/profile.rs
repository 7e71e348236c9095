use serde::{Deserialize, Serialize};

pub const MAX_TOP_GENRES: usize = 8;
pub const MAX_GENRE_CLUSTERS: usize = 5;
pub const MAX_SAMPLE_TRACKS: usize = 10;
pub const MAX_SAMPLE_ARTISTS: usize = 10;
/// Number of top genres sent to the generation backend as style tags.
pub const MAX_STYLE_TAGS: usize = 5;

/// Sample-count thresholds for [`Confidence`].
pub const MEDIUM_CONFIDENCE_TRACKS: usize = 30;
pub const HIGH_CONFIDENCE_TRACKS: usize = 80;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Confidence
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// How much listening data backs a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    pub fn from_track_count(track_count: usize) -> Self {
        if track_count >= HIGH_CONFIDENCE_TRACKS {
            Self::High
        } else if track_count >= MEDIUM_CONFIDENCE_TRACKS {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Taste profile
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A summary of a listener's taste, built once from listening history and
/// then passed by value into a generation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TasteProfile {
    /// Most-weighted first.
    pub top_genres: Vec<String>,
    pub genre_clusters: Vec<String>,
    /// Decade span such as `"1990s-2020s"`.
    pub era_range: String,
    pub era_center: i32,
    pub sample_top_tracks: Vec<String>,
    pub sample_top_artists: Vec<String>,
    /// 0-100.
    pub popularity_avg: f64,
    /// 0-1.
    pub explicit_ratio: f64,
    pub track_count: usize,
    pub confidence: Confidence,
}

impl TasteProfile {
    /// Comma-separated style tags for the generation backend.
    pub fn style_tags(&self) -> String {
        self.top_genres
            .iter()
            .take(MAX_STYLE_TAGS)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}
