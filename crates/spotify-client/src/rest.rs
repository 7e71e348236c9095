//! REST implementation of [`ProfileSource`] against the Spotify Web API.
//!
//! `SpotifyClient` wraps a `reqwest::Client` and issues the handful of
//! listening-history calls the analyzer needs. A 429 is retried inside the
//! client after the server's `Retry-After`, with growing jittered delays,
//! up to `max_rate_limit_retries` times.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;

use reso_domain::backoff;
use reso_domain::config::SpotifyConfig;
use reso_domain::credential::Credential;
use reso_domain::error::{Error, ErrorKind, Result};
use reso_domain::profile::TasteProfile;
use reso_domain::trace::TraceEvent;

use crate::analyzer::build_taste_profile;
use crate::genres::{GenreLookup, NoGenreLookup};
use crate::oauth::{self, ClientCredentials};
use crate::provider::ProfileSource;
use crate::types::{
    Artist, ArtistMeta, ArtistsResponse, ListeningData, Paging, TimeRange, Track, TrackItem,
    TrackMeta,
};

const SERVICE: &str = "spotify";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Client
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Created once and shared by every run; the underlying
/// `reqwest::Client` keeps a connection pool.
#[derive(Clone)]
pub struct SpotifyClient {
    http: Client,
    api_base: String,
    token_url: String,
    client: ClientCredentials,
    max_rate_limit_retries: u32,
    batch_size: usize,
    page_limit: usize,
    genres: Arc<dyn GenreLookup>,
    max_genre_lookups: usize,
}

impl SpotifyClient {
    pub fn new(cfg: &SpotifyConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;

        Ok(Self {
            http,
            api_base: cfg.api_base.trim_end_matches('/').to_owned(),
            token_url: cfg.token_url.clone(),
            client: ClientCredentials::from_env(&cfg.client_id_env, &cfg.client_secret_env),
            max_rate_limit_retries: cfg.max_rate_limit_retries,
            batch_size: cfg.batch_size.clamp(1, 50),
            page_limit: cfg.page_limit,
            genres: Arc::new(NoGenreLookup),
            max_genre_lookups: 0,
        })
    }

    /// Attach a genre fallback used for artists Spotify returns without
    /// genres, capped at `max_lookups` uncached artists per profile.
    pub fn with_genre_lookup(mut self, lookup: Arc<dyn GenreLookup>, max_lookups: usize) -> Self {
        self.genres = lookup;
        self.max_genre_lookups = max_lookups;
        self
    }

    pub fn with_client_credentials(mut self, client: ClientCredentials) -> Self {
        self.client = client;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    // ── rate-limited GET ────────────────────────────────────────────

    async fn get_json<T: DeserializeOwned>(
        &self,
        token: &str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = self.url(path);
        let endpoint = format!("GET {path}");
        let mut attempt: u32 = 0;

        loop {
            let start = Instant::now();
            let resp = self
                .http
                .get(&url)
                .bearer_auth(token)
                .query(query)
                .send()
                .await
                .map_err(from_reqwest)?;
            let status = resp.status();
            TraceEvent::UpstreamCall {
                service: SERVICE.into(),
                endpoint: endpoint.clone(),
                status: status.as_u16(),
                duration_ms: start.elapsed().as_millis() as u64,
            }
            .emit();

            if status == StatusCode::TOO_MANY_REQUESTS {
                let retry_after = backoff::parse_retry_after(
                    resp.headers()
                        .get(reqwest::header::RETRY_AFTER)
                        .and_then(|v| v.to_str().ok()),
                );
                if attempt >= self.max_rate_limit_retries {
                    return Err(Error::RateLimited {
                        service: SERVICE.into(),
                        retry_after_secs: retry_after,
                    });
                }
                let delay = backoff::rate_limit_delay(retry_after, attempt);
                TraceEvent::RateLimited {
                    service: SERVICE.into(),
                    endpoint: endpoint.clone(),
                    attempt,
                    delay_ms: delay.as_millis() as u64,
                }
                .emit();
                tokio::time::sleep(delay).await;
                attempt += 1;
                continue;
            }

            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(Error::from_status(SERVICE, status.as_u16(), body, None));
            }

            let body = resp.text().await.map_err(from_reqwest)?;
            return serde_json::from_str(&body)
                .map_err(|e| Error::malformed(SERVICE, format!("{endpoint}: {e}")));
        }
    }

    // ── endpoints ───────────────────────────────────────────────────

    pub async fn top_tracks(&self, token: &str, range: TimeRange) -> Result<Vec<Track>> {
        let page: Paging<Track> = self
            .get_json(
                token,
                "/me/top/tracks",
                &[
                    ("time_range", range.as_param().to_owned()),
                    ("limit", self.page_limit.to_string()),
                ],
            )
            .await?;
        Ok(page.items)
    }

    pub async fn top_artists(&self, token: &str, range: TimeRange) -> Result<Vec<Artist>> {
        let page: Paging<Artist> = self
            .get_json(
                token,
                "/me/top/artists",
                &[
                    ("time_range", range.as_param().to_owned()),
                    ("limit", self.page_limit.to_string()),
                ],
            )
            .await?;
        Ok(page.items)
    }

    /// Missing scope or an empty history is not an error here.
    pub async fn recently_played(&self, token: &str) -> Result<Vec<Track>> {
        self.tolerant_items(token, "/me/player/recently-played").await
    }

    pub async fn saved_tracks(&self, token: &str) -> Result<Vec<Track>> {
        self.tolerant_items(token, "/me/tracks").await
    }

    async fn tolerant_items(&self, token: &str, path: &str) -> Result<Vec<Track>> {
        let result: Result<Paging<TrackItem>> = self
            .get_json(token, path, &[("limit", self.page_limit.to_string())])
            .await;
        match result {
            Ok(page) => Ok(page.items.into_iter().map(|i| i.track).collect()),
            // Bad HTTP statuses are tolerated; transport faults are not.
            Err(e) if matches!(e.kind(), ErrorKind::BadStatus | ErrorKind::RateLimited) => {
                tracing::warn!(path, error = %e, "optional listening source unavailable");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    /// Artist details in chunks of `batch_size`. A failed chunk is skipped.
    pub async fn artist_details(&self, token: &str, ids: &[String]) -> Result<Vec<Artist>> {
        let mut artists = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(self.batch_size) {
            let result: Result<ArtistsResponse> = self
                .get_json(token, "/artists", &[("ids", chunk.join(","))])
                .await;
            match result {
                Ok(resp) => artists.extend(resp.artists.into_iter().flatten()),
                Err(e) => {
                    tracing::warn!(chunk_len = chunk.len(), error = %e, "artist batch failed, skipping");
                }
            }
        }
        Ok(artists)
    }

    /// Pull every listening source and attach artist genres to each track.
    pub async fn fetch_listening_data(&self, token: &str) -> Result<ListeningData> {
        let top_short = self.top_tracks(token, TimeRange::Short).await?;
        let top_medium = self.top_tracks(token, TimeRange::Medium).await?;
        let top_long = self.top_tracks(token, TimeRange::Long).await?;
        let artists_short = self.top_artists(token, TimeRange::Short).await?;
        let artists_medium = self.top_artists(token, TimeRange::Medium).await?;
        let recently_played = self.recently_played(token).await?;
        let saved_tracks = self.saved_tracks(token).await?;

        // Every referenced artist id, in first-seen order.
        let mut seen = HashSet::new();
        let mut ids = Vec::new();
        let track_lists = [&top_short, &top_medium, &top_long, &recently_played, &saved_tracks];
        for track in track_lists.iter().flat_map(|l| l.iter()) {
            for artist in &track.artists {
                if let Some(id) = &artist.id {
                    if seen.insert(id.clone()) {
                        ids.push(id.clone());
                    }
                }
            }
        }
        for artist in artists_short.iter().chain(&artists_medium) {
            if seen.insert(artist.id.clone()) {
                ids.push(artist.id.clone());
            }
        }

        let details = self.artist_details(token, &ids).await?;
        let mut genres_by_id: HashMap<String, Vec<String>> = details
            .into_iter()
            .map(|a| (a.id, a.genres))
            .collect();
        self.fill_missing_genres(&ids, &mut genres_by_id, &track_lists, &artists_short, &artists_medium)
            .await;

        let enrich = |tracks: &[Track]| -> Vec<TrackMeta> {
            tracks.iter().map(|t| track_meta(t, &genres_by_id)).collect()
        };
        let artist_meta = |artists: &[Artist]| -> Vec<ArtistMeta> {
            artists
                .iter()
                .map(|a| ArtistMeta {
                    name: a.name.clone(),
                    genres: a.genres.clone(),
                })
                .collect()
        };

        Ok(ListeningData {
            top_short: enrich(&top_short),
            top_medium: enrich(&top_medium),
            top_long: enrich(&top_long),
            recently_played: enrich(&recently_played),
            saved_tracks: enrich(&saved_tracks),
            top_artists_short: artist_meta(&artists_short),
            top_artists_medium: artist_meta(&artists_medium),
        })
    }

    /// Look up genres for artists that came back with none (or whose
    /// detail chunk failed), up to the per-profile cap.
    async fn fill_missing_genres(
        &self,
        ids: &[String],
        genres_by_id: &mut HashMap<String, Vec<String>>,
        track_lists: &[&Vec<Track>],
        artists_short: &[Artist],
        artists_medium: &[Artist],
    ) {
        if self.max_genre_lookups == 0 {
            return;
        }

        let mut names: HashMap<&str, &str> = HashMap::new();
        for track in track_lists.iter().flat_map(|l| l.iter()) {
            for artist in &track.artists {
                if let Some(id) = &artist.id {
                    names.entry(id.as_str()).or_insert(artist.name.as_str());
                }
            }
        }
        for artist in artists_short.iter().chain(artists_medium) {
            names.entry(artist.id.as_str()).or_insert(artist.name.as_str());
        }

        let missing: Vec<(String, String)> = ids
            .iter()
            .filter(|id| genres_by_id.get(*id).map_or(true, |g| g.is_empty()))
            .filter_map(|id| names.get(id.as_str()).map(|n| (id.clone(), (*n).to_owned())))
            .take(self.max_genre_lookups)
            .collect();

        for (id, name) in missing {
            let genres = self.genres.artist_genres(&name).await;
            if !genres.is_empty() {
                genres_by_id.insert(id, genres);
            }
        }
    }
}

fn track_meta(track: &Track, genres_by_id: &HashMap<String, Vec<String>>) -> TrackMeta {
    let genres = track
        .artists
        .iter()
        .filter_map(|a| a.id.as_ref())
        .filter_map(|id| genres_by_id.get(id))
        .flatten()
        .cloned()
        .collect();
    TrackMeta {
        name: track.name.clone(),
        artists: track.artists.iter().map(|a| a.name.clone()).collect(),
        release_date: track.album.release_date.clone().unwrap_or_default(),
        popularity: track.popularity,
        explicit: track.explicit,
        genres,
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Trait implementation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait]
impl ProfileSource for SpotifyClient {
    async fn refresh_credential(&self, credential: &Credential) -> Result<Credential> {
        oauth::refresh_credential(&self.http, &self.token_url, &self.client, credential).await
    }

    async fn fetch_profile(&self, credential: &Credential) -> Result<TasteProfile> {
        let data = self.fetch_listening_data(&credential.access_token).await?;
        Ok(build_taste_profile(&data))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Error conversion helper
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Convert a `reqwest::Error` into a domain `Error`.
///
/// Timeouts and connection failures become `Unreachable`; everything else
/// becomes `Error::Http`.
pub fn from_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() || e.is_connect() {
        Error::unreachable(SERVICE, e.to_string())
    } else {
        Error::Http(e.to_string())
    }
}
