//! Turns raw listening data into a [`TasteProfile`].
//!
//! Genres are counted across five track sources with different weights
//! (saved tracks count most, long-term top tracks least), then folded into
//! broad clusters by substring match. Release years give the era span.

use std::collections::{HashMap, HashSet};

use reso_domain::profile::{
    Confidence, TasteProfile, MAX_GENRE_CLUSTERS, MAX_SAMPLE_ARTISTS, MAX_SAMPLE_TRACKS,
    MAX_TOP_GENRES,
};

use crate::types::{ListeningData, TrackMeta};

const DEFAULT_ERA_RANGE: &str = "2010s-2020s";
const DEFAULT_ERA_CENTER: i32 = 2018;
const DEFAULT_POPULARITY: f64 = 50.0;
const MIN_YEAR: i32 = 1950;
const MAX_YEAR: i32 = 2030;

/// First matching substring wins, so more specific keys come first.
const GENRE_CLUSTERS: &[(&str, &str)] = &[
    ("indie", "indie"),
    ("alt", "alternative"),
    ("rock", "rock"),
    ("pop", "pop"),
    ("hip hop", "hip hop"),
    ("rap", "hip hop"),
    ("trap", "hip hop"),
    ("r&b", "r&b"),
    ("soul", "r&b/soul"),
    ("electronic", "electronic"),
    ("edm", "electronic"),
    ("house", "electronic"),
    ("techno", "electronic"),
    ("ambient", "electronic"),
    ("metal", "metal"),
    ("punk", "punk"),
    ("jazz", "jazz"),
    ("classical", "classical"),
    ("country", "country"),
    ("folk", "folk"),
    ("latin", "latin"),
    ("reggaeton", "latin"),
    ("k-pop", "k-pop"),
    ("j-pop", "j-pop"),
];

pub fn cluster_for(genre: &str) -> Option<&'static str> {
    let lower = genre.to_lowercase();
    GENRE_CLUSTERS
        .iter()
        .find(|(key, _)| lower.contains(key))
        .map(|(_, cluster)| *cluster)
}

/// Leading four-digit year of a Spotify release date (`2019`, `2019-05`,
/// `2019-05-17`).
pub fn extract_year(release_date: &str) -> Option<i32> {
    let digits = release_date.get(..4)?;
    if digits.bytes().all(|b| b.is_ascii_digit()) {
        digits.parse().ok()
    } else {
        None
    }
}

/// Weighted counter that remembers first-insertion order, so equal weights
/// rank in the order they were first seen.
#[derive(Default)]
struct WeightedCounter {
    index: HashMap<String, usize>,
    entries: Vec<(String, f64)>,
}

impl WeightedCounter {
    fn add(&mut self, key: &str, weight: f64) {
        match self.index.get(key) {
            Some(&i) => self.entries[i].1 += weight,
            None => {
                self.index.insert(key.to_owned(), self.entries.len());
                self.entries.push((key.to_owned(), weight));
            }
        }
    }

    fn most_common(&self, n: usize) -> Vec<String> {
        let mut ranked: Vec<&(String, f64)> = self.entries.iter().collect();
        // Stable sort keeps insertion order among ties.
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked.into_iter().take(n).map(|(k, _)| k.clone()).collect()
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

pub fn build_taste_profile(data: &ListeningData) -> TasteProfile {
    let sources: [(&[TrackMeta], f64); 5] = [
        (&data.saved_tracks, 3.0),
        (&data.top_short, 2.5),
        (&data.recently_played, 2.0),
        (&data.top_medium, 1.5),
        (&data.top_long, 1.0),
    ];

    let mut genres = WeightedCounter::default();
    let mut years: Vec<i32> = Vec::new();
    let mut popularity_sum = 0.0;
    let mut explicit_count = 0usize;
    let mut total_tracks = 0usize;

    for (tracks, weight) in sources {
        for track in tracks {
            total_tracks += 1;
            for genre in &track.genres {
                genres.add(genre, weight);
            }
            if let Some(year) = extract_year(&track.release_date) {
                if (MIN_YEAR..=MAX_YEAR).contains(&year) {
                    years.push(year);
                }
            }
            popularity_sum += track
                .popularity
                .map(f64::from)
                .unwrap_or(DEFAULT_POPULARITY);
            if track.explicit {
                explicit_count += 1;
            }
        }
    }

    let top_genres = genres.most_common(MAX_TOP_GENRES);

    let mut clusters = WeightedCounter::default();
    for (genre, weight) in &genres.entries {
        if let Some(cluster) = cluster_for(genre) {
            clusters.add(cluster, *weight);
        }
    }
    let genre_clusters = clusters.most_common(MAX_GENRE_CLUSTERS);

    let (era_range, era_center) = era_of(&mut years);

    let sample_top_tracks = data
        .top_short
        .iter()
        .take(MAX_SAMPLE_TRACKS)
        .map(|t| format!("{} — {}", t.name, t.artists.join(", ")))
        .collect();

    let mut seen = HashSet::new();
    let sample_top_artists = data
        .top_artists_short
        .iter()
        .chain(&data.top_artists_medium)
        .filter(|a| seen.insert(a.name.clone()))
        .take(MAX_SAMPLE_ARTISTS)
        .map(|a| a.name.clone())
        .collect();

    let (popularity_avg, explicit_ratio) = if total_tracks == 0 {
        (DEFAULT_POPULARITY, 0.0)
    } else {
        (
            popularity_sum / total_tracks as f64,
            explicit_count as f64 / total_tracks as f64,
        )
    };

    TasteProfile {
        top_genres,
        genre_clusters,
        era_range,
        era_center,
        sample_top_tracks,
        sample_top_artists,
        popularity_avg: round_to(popularity_avg, 1),
        explicit_ratio: round_to(explicit_ratio, 2),
        track_count: total_tracks,
        confidence: Confidence::from_track_count(total_tracks),
    }
}

/// Era span from the 10th percentile (when there are more than ten years)
/// to the newest year, both floored to decades, and the median year.
fn era_of(years: &mut [i32]) -> (String, i32) {
    if years.is_empty() {
        return (DEFAULT_ERA_RANGE.to_owned(), DEFAULT_ERA_CENTER);
    }
    years.sort_unstable();
    let n = years.len();
    let low = if n > 10 { years[n / 10] } else { years[0] };
    let high = years[n - 1];
    let center = if n % 2 == 1 {
        years[n / 2]
    } else {
        (years[n / 2 - 1] + years[n / 2]) / 2
    };
    (
        format!("{}s-{}s", low / 10 * 10, high / 10 * 10),
        center,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ArtistMeta;

    fn track(genres: &[&str], date: &str) -> TrackMeta {
        TrackMeta {
            name: "Song".into(),
            artists: vec!["Artist".into()],
            release_date: date.into(),
            popularity: Some(60),
            explicit: false,
            genres: genres.iter().map(|g| g.to_string()).collect(),
        }
    }

    #[test]
    fn empty_history_uses_defaults() {
        let p = build_taste_profile(&ListeningData::default());
        assert!(p.top_genres.is_empty());
        assert_eq!(p.era_range, "2010s-2020s");
        assert_eq!(p.era_center, 2018);
        assert_eq!(p.popularity_avg, 50.0);
        assert_eq!(p.explicit_ratio, 0.0);
        assert_eq!(p.track_count, 0);
        assert_eq!(p.confidence, Confidence::Low);
    }

    #[test]
    fn saved_tracks_outweigh_long_term() {
        let data = ListeningData {
            saved_tracks: vec![track(&["shoegaze"], "1991")],
            top_long: vec![track(&["grunge"], "1992"), track(&["grunge"], "1993")],
            ..Default::default()
        };
        // 3.0 for one saved track beats 2 x 1.0.
        let p = build_taste_profile(&data);
        assert_eq!(p.top_genres, vec!["shoegaze", "grunge"]);
    }

    #[test]
    fn ninety_five_tracks_is_high_confidence() {
        let data = ListeningData {
            top_short: vec![track(&["indie rock"], "2015"); 50],
            top_medium: vec![track(&["indie rock"], "2012"); 45],
            ..Default::default()
        };
        let p = build_taste_profile(&data);
        assert_eq!(p.track_count, 95);
        assert_eq!(p.confidence, Confidence::High);
        assert_eq!(p.sample_top_tracks.len(), 10);
        assert_eq!(p.sample_top_tracks[0], "Song — Artist");
    }

    #[test]
    fn clusters_fold_by_substring() {
        let data = ListeningData {
            top_short: vec![
                track(&["uk hip hop", "trap"], "2020"),
                track(&["indie pop"], "2020"),
            ],
            ..Default::default()
        };
        let p = build_taste_profile(&data);
        // "indie pop" hits "indie" before "pop".
        assert_eq!(p.genre_clusters, vec!["hip hop", "indie"]);
        assert_eq!(cluster_for("Alt-Country"), Some("alternative"));
        assert_eq!(cluster_for("vaporwave"), None);
    }

    #[test]
    fn era_uses_tenth_percentile_and_median() {
        let mut tracks: Vec<TrackMeta> = (0..11).map(|i| track(&[], &format!("{}", 2000 + i))).collect();
        tracks.push(track(&[], "1975-06-01"));
        tracks.push(track(&[], "1800")); // out of range
        tracks.push(track(&[], "")); // no date
        let data = ListeningData {
            top_medium: tracks,
            ..Default::default()
        };
        let p = build_taste_profile(&data);
        // 12 valid years: sorted[1] = 2000, max 2010.
        assert_eq!(p.era_range, "2000s-2010s");
        // median of 1975, 2000..=2010 -> (2004 + 2005) / 2
        assert_eq!(p.era_center, 2004);
    }

    #[test]
    fn small_samples_use_the_oldest_year() {
        let data = ListeningData {
            top_short: vec![track(&[], "1987"), track(&[], "2021")],
            ..Default::default()
        };
        let p = build_taste_profile(&data);
        assert_eq!(p.era_range, "1980s-2020s");
    }

    #[test]
    fn popularity_and_explicit_are_rounded() {
        let mut a = track(&[], "2020");
        a.popularity = None; // counts as 50
        a.explicit = true;
        let mut b = track(&[], "2020");
        b.popularity = Some(71);
        let c = track(&[], "2020");
        let data = ListeningData {
            top_short: vec![a, b, c],
            ..Default::default()
        };
        let p = build_taste_profile(&data);
        assert_eq!(p.popularity_avg, 60.3);
        assert_eq!(p.explicit_ratio, 0.33);
    }

    #[test]
    fn sample_artists_dedupe_across_ranges() {
        let artist = |n: &str| ArtistMeta {
            name: n.into(),
            genres: vec![],
        };
        let data = ListeningData {
            top_artists_short: vec![artist("A"), artist("B")],
            top_artists_medium: vec![artist("B"), artist("C")],
            ..Default::default()
        };
        let p = build_taste_profile(&data);
        assert_eq!(p.sample_top_artists, vec!["A", "B", "C"]);
    }

    #[test]
    fn year_extraction() {
        assert_eq!(extract_year("2019-05-17"), Some(2019));
        assert_eq!(extract_year("1999"), Some(1999));
        assert_eq!(extract_year("19"), None);
        assert_eq!(extract_year("abcd"), None);
    }
}
