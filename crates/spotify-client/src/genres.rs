//! Genre fallback for artists the listening-history provider returns
//! without genres.
//!
//! Lookups go to MusicBrainz, are paced to its one-request-per-second
//! limit, and land in a [`GenreCache`] owned by whoever constructs the
//! client. The cache is bounded and never evicts: once full it stops
//! admitting new artists, and lookups for them simply go to the network.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Client;
use serde::Deserialize;

use reso_domain::config::MusicBrainzConfig;
use reso_domain::error::{Error, Result};
use reso_domain::trace::TraceEvent;

use crate::rest::from_reqwest;

const SERVICE: &str = "musicbrainz";
/// Tags kept per artist.
const MAX_TAGS: usize = 6;
const RETRY_DELAY: Duration = Duration::from_secs(2);

const TAG_REMAP: &[(&str, &str)] = &[
    ("hip-hop", "hip hop"),
    ("rhythm and blues", "r&b"),
    ("electronic music", "electronic"),
    ("synthpop", "synth-pop"),
];

pub fn clean_tag(tag: &str) -> String {
    let t = tag.trim().to_lowercase();
    TAG_REMAP
        .iter()
        .find(|(from, _)| *from == t)
        .map(|(_, to)| (*to).to_owned())
        .unwrap_or(t)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Cache
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Bounded, eviction-free artist → genres cache.
pub struct GenreCache {
    capacity: usize,
    entries: Mutex<HashMap<String, Vec<String>>>,
}

impl GenreCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn key(artist: &str) -> String {
        artist.trim().to_lowercase()
    }

    pub fn get(&self, artist: &str) -> Option<Vec<String>> {
        self.entries.lock().get(&Self::key(artist)).cloned()
    }

    /// Returns `false` when the cache is full and `artist` is not already
    /// present.
    pub fn insert(&self, artist: &str, genres: Vec<String>) -> bool {
        let mut entries = self.entries.lock();
        let key = Self::key(artist);
        if !entries.contains_key(&key) && entries.len() >= self.capacity {
            return false;
        }
        entries.insert(key, genres);
        true
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Lookup trait
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait]
pub trait GenreLookup: Send + Sync {
    /// Genres for an artist name. Failures yield an empty list.
    async fn artist_genres(&self, artist: &str) -> Vec<String>;
}

/// Used when the fallback is disabled.
pub struct NoGenreLookup;

#[async_trait]
impl GenreLookup for NoGenreLookup {
    async fn artist_genres(&self, _artist: &str) -> Vec<String> {
        Vec::new()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// MusicBrainz client
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
struct ArtistSearch {
    #[serde(default)]
    artists: Vec<ArtistHit>,
}

#[derive(Debug, Deserialize)]
struct ArtistHit {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ArtistDetail {
    #[serde(default)]
    tags: Vec<Tag>,
}

#[derive(Debug, Deserialize)]
struct Tag {
    name: String,
    #[serde(default)]
    count: i64,
}

pub struct MusicBrainzClient {
    http: Client,
    base_url: String,
    min_interval: Duration,
    retries: u32,
    cache: Arc<GenreCache>,
    last_call: tokio::sync::Mutex<Option<tokio::time::Instant>>,
}

impl MusicBrainzClient {
    pub fn new(cfg: &MusicBrainzConfig, cache: Arc<GenreCache>) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .user_agent(cfg.user_agent.clone())
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;
        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_owned(),
            min_interval: Duration::from_millis(cfg.min_interval_ms),
            retries: cfg.retries,
            cache,
            last_call: tokio::sync::Mutex::new(None),
        })
    }

    pub fn cache(&self) -> &Arc<GenreCache> {
        &self.cache
    }

    /// Wait until at least `min_interval` has passed since the previous
    /// request, across all callers.
    async fn pace(&self) {
        let mut last = self.last_call.lock().await;
        if let Some(prev) = *last {
            let since = prev.elapsed();
            if since < self.min_interval {
                tokio::time::sleep(self.min_interval - since).await;
            }
        }
        *last = Some(tokio::time::Instant::now());
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let mut attempt = 0;
        loop {
            self.pace().await;
            let start = Instant::now();
            let result = self
                .http
                .get(url)
                .query(query)
                .query(&[("fmt", "json")])
                .send()
                .await;
            let duration_ms = start.elapsed().as_millis() as u64;

            let resp = match result {
                Ok(resp) => resp,
                Err(e) if attempt < self.retries => {
                    tracing::debug!(endpoint, error = %e, attempt, "musicbrainz transport error, retrying");
                    attempt += 1;
                    tokio::time::sleep(RETRY_DELAY).await;
                    continue;
                }
                Err(e) => return Err(from_reqwest(e)),
            };

            let status = resp.status().as_u16();
            TraceEvent::UpstreamCall {
                service: SERVICE.into(),
                endpoint: endpoint.to_owned(),
                status,
                duration_ms,
            }
            .emit();

            if !resp.status().is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(Error::from_status(SERVICE, status, body, None));
            }
            let body = resp.text().await.map_err(from_reqwest)?;
            return serde_json::from_str(&body)
                .map_err(|e| Error::malformed(SERVICE, format!("{endpoint}: {e}")));
        }
    }

    async fn lookup(&self, artist: &str) -> Result<Vec<String>> {
        let query = format!("artist:\"{}\"", artist.replace('"', ""));
        let search: ArtistSearch = self
            .get_json(
                "GET /artist",
                &format!("{}/artist", self.base_url),
                &[("query", query.as_str()), ("limit", "1")],
            )
            .await?;
        let Some(hit) = search.artists.into_iter().next() else {
            return Ok(Vec::new());
        };

        let detail: ArtistDetail = self
            .get_json(
                "GET /artist/{id}",
                &format!("{}/artist/{}", self.base_url, hit.id),
                &[("inc", "tags")],
            )
            .await?;
        Ok(rank_tags(detail.tags))
    }
}

/// Highest-count tags first, zero-count tags dropped.
fn rank_tags(mut tags: Vec<Tag>) -> Vec<String> {
    tags.sort_by(|a, b| b.count.cmp(&a.count));
    tags.into_iter()
        .take(MAX_TAGS)
        .filter(|t| t.count >= 1)
        .map(|t| clean_tag(&t.name))
        .collect()
}

#[async_trait]
impl GenreLookup for MusicBrainzClient {
    async fn artist_genres(&self, artist: &str) -> Vec<String> {
        if let Some(hit) = self.cache.get(artist) {
            TraceEvent::GenreLookup {
                artist: artist.to_owned(),
                genres: hit.len(),
                cache_hit: true,
            }
            .emit();
            return hit;
        }

        let genres = match self.lookup(artist).await {
            Ok(genres) => genres,
            Err(e) => {
                tracing::warn!(artist, error = %e, "musicbrainz genre lookup failed");
                return Vec::new();
            }
        };
        TraceEvent::GenreLookup {
            artist: artist.to_owned(),
            genres: genres.len(),
            cache_hit: false,
        }
        .emit();
        if !self.cache.insert(artist, genres.clone()) {
            tracing::debug!(artist, "genre cache full, not caching");
        }
        genres
    }
}
