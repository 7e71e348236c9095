//! User and track records.
//!
//! Users are written by the login flow, which lives outside the gateway;
//! the gateway only rotates their credentials and caches their profiles.
//! Generated tracks are appended to a JSONL file that is never truncated;
//! only the in-memory ring (newest last) is bounded.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};

use reso_domain::config::StorageConfig;
use reso_domain::credential::Credential;
use reso_domain::error::{Error, Result};
use reso_domain::profile::TasteProfile;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Records
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    pub credential: Credential,
    #[serde(default)]
    pub cached_profile: Option<TasteProfile>,
    #[serde(default)]
    pub profile_cached_at: Option<DateTime<Utc>>,
}

impl UserRecord {
    /// The cached profile, if it is younger than `ttl` and has genres.
    pub fn fresh_profile(&self, ttl: Duration, now: DateTime<Utc>) -> Option<&TasteProfile> {
        let profile = self.cached_profile.as_ref()?;
        let cached_at = self.profile_cached_at?;
        if profile.top_genres.is_empty() || now - cached_at >= ttl {
            return None;
        }
        Some(profile)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedTrack {
    pub id: String,
    pub user_id: String,
    pub suno_track_id: String,
    pub audio_url: String,
    #[serde(default)]
    pub image_url: Option<String>,
    pub suno_prompt: String,
    pub lyria_prompt: String,
    pub song_concept: String,
    pub platform: String,
    /// 1-5, set through feedback.
    #[serde(default)]
    pub rating: Option<u8>,
    pub created_at: DateTime<Utc>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// RecordStore
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn user(&self, user_id: &str) -> Result<Option<UserRecord>>;

    /// Insert or replace a user.
    async fn put_user(&self, user: UserRecord) -> Result<()>;

    /// Persist a refreshed credential. Unknown users are ignored.
    async fn update_credential(&self, user_id: &str, credential: &Credential) -> Result<()>;

    async fn cache_profile(
        &self,
        user_id: &str,
        profile: &TasteProfile,
        at: DateTime<Utc>,
    ) -> Result<()>;

    async fn insert_track(&self, track: GeneratedTrack) -> Result<()>;

    async fn track(&self, track_id: &str) -> Result<Option<GeneratedTrack>>;

    /// Newest first.
    async fn tracks_for_user(&self, user_id: &str, limit: usize) -> Result<Vec<GeneratedTrack>>;

    /// Returns the updated track, or `None` if it does not exist.
    async fn set_rating(&self, track_id: &str, rating: u8) -> Result<Option<GeneratedTrack>>;
}

fn newest_for_user(
    tracks: &VecDeque<GeneratedTrack>,
    user_id: &str,
    limit: usize,
) -> Vec<GeneratedTrack> {
    tracks
        .iter()
        .rev()
        .filter(|t| t.user_id == user_id)
        .take(limit)
        .cloned()
        .collect()
}

fn push_bounded(tracks: &mut VecDeque<GeneratedTrack>, track: GeneratedTrack, max: usize) {
    tracks.push_back(track);
    while tracks.len() > max {
        tracks.pop_front();
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// In-memory store
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

const MEMORY_MAX_TRACKS: usize = 1000;

#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<String, UserRecord>>,
    tracks: RwLock<VecDeque<GeneratedTrack>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn user(&self, user_id: &str) -> Result<Option<UserRecord>> {
        Ok(self.users.read().await.get(user_id).cloned())
    }

    async fn put_user(&self, user: UserRecord) -> Result<()> {
        self.users.write().await.insert(user.id.clone(), user);
        Ok(())
    }

    async fn update_credential(&self, user_id: &str, credential: &Credential) -> Result<()> {
        if let Some(u) = self.users.write().await.get_mut(user_id) {
            u.credential = credential.clone();
        }
        Ok(())
    }

    async fn cache_profile(
        &self,
        user_id: &str,
        profile: &TasteProfile,
        at: DateTime<Utc>,
    ) -> Result<()> {
        if let Some(u) = self.users.write().await.get_mut(user_id) {
            u.cached_profile = Some(profile.clone());
            u.profile_cached_at = Some(at);
        }
        Ok(())
    }

    async fn insert_track(&self, track: GeneratedTrack) -> Result<()> {
        push_bounded(&mut *self.tracks.write().await, track, MEMORY_MAX_TRACKS);
        Ok(())
    }

    async fn track(&self, track_id: &str) -> Result<Option<GeneratedTrack>> {
        Ok(self
            .tracks
            .read()
            .await
            .iter()
            .find(|t| t.id == track_id)
            .cloned())
    }

    async fn tracks_for_user(&self, user_id: &str, limit: usize) -> Result<Vec<GeneratedTrack>> {
        Ok(newest_for_user(&*self.tracks.read().await, user_id, limit))
    }

    async fn set_rating(&self, track_id: &str, rating: u8) -> Result<Option<GeneratedTrack>> {
        let mut tracks = self.tracks.write().await;
        Ok(tracks.iter_mut().find(|t| t.id == track_id).map(|t| {
            t.rating = Some(rating);
            t.clone()
        }))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// File store
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// `users.json` (a JSON array, re-read on every lookup so records written
/// by the login flow show up without a restart) plus `tracks.jsonl`.
///
/// `tracks.jsonl` is append-only: a rating appends the updated record and
/// the last line for an id wins. Only the in-memory ring is bounded;
/// tracks that fell out of it are still found on disk.
pub struct FileStore {
    users_path: PathBuf,
    tracks_path: PathBuf,
    max_tracks: usize,
    users_lock: Mutex<()>,
    tracks: RwLock<VecDeque<GeneratedTrack>>,
}

impl FileStore {
    pub fn open(cfg: &StorageConfig) -> Result<Self> {
        std::fs::create_dir_all(&cfg.state_path)?;
        let tracks_path = cfg.tracks_file();
        let max_tracks = cfg.max_tracks_in_memory.max(1);
        let tracks = load_tracks(&tracks_path, max_tracks)?;
        if !tracks.is_empty() {
            tracing::info!(count = tracks.len(), "loaded tracks from disk");
        }
        Ok(Self {
            users_path: cfg.users_file(),
            tracks_path,
            max_tracks,
            users_lock: Mutex::new(()),
            tracks: RwLock::new(tracks),
        })
    }

    async fn read_users(&self) -> Result<Vec<UserRecord>> {
        let path = self.users_path.clone();
        blocking(move || read_users(&path)).await
    }

    async fn write_users(&self, users: &[UserRecord]) -> Result<()> {
        let json = serde_json::to_vec_pretty(users)?;
        let path = self.users_path.clone();
        blocking(move || write_atomic(&path, &json)).await
    }

    /// Read-modify-write of one user under the users lock.
    async fn modify_user(&self, user_id: &str, f: impl FnOnce(&mut UserRecord) + Send) -> Result<()> {
        let _guard = self.users_lock.lock().await;
        let mut users = self.read_users().await?;
        match users.iter_mut().find(|u| u.id == user_id) {
            Some(u) => f(u),
            None => {
                tracing::debug!(user_id, "update for unknown user ignored");
                return Ok(());
            }
        }
        self.write_users(&users).await
    }

    async fn append_track(&self, track: &GeneratedTrack) -> Result<()> {
        let mut line = serde_json::to_vec(track)?;
        line.push(b'\n');
        let path = self.tracks_path.clone();
        blocking(move || append_line(&path, &line)).await
    }

    /// Latest on-disk record for a track that is no longer in memory.
    async fn track_from_disk(&self, track_id: &str) -> Result<Option<GeneratedTrack>> {
        let path = self.tracks_path.clone();
        let id = track_id.to_owned();
        blocking(move || find_track(&path, &id)).await
    }
}

/// Run file work on the blocking pool.
async fn blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::Other(format!("spawn_blocking join: {e}")))?
}

fn read_users(path: &Path) -> Result<Vec<UserRecord>> {
    match std::fs::read_to_string(path) {
        Ok(raw) if raw.trim().is_empty() => Ok(Vec::new()),
        Ok(raw) => Ok(serde_json::from_str(&raw)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e.into()),
    }
}

/// Every readable line of `tracks.jsonl`, oldest first.
fn read_track_lines(path: &Path) -> Result<Vec<GeneratedTrack>> {
    let data = match std::fs::read_to_string(path) {
        Ok(d) => d,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let mut out = Vec::new();
    let mut skipped = 0usize;
    for line in data.lines().filter(|l| !l.trim().is_empty()) {
        match serde_json::from_str::<GeneratedTrack>(line) {
            Ok(t) => out.push(t),
            Err(_) => skipped += 1,
        }
    }
    if skipped > 0 {
        tracing::warn!(skipped, path = %path.display(), "skipped unreadable track lines");
    }
    Ok(out)
}

/// Collapse the log to one record per id (last line wins, first position
/// kept) and keep the newest `max` in memory.
fn load_tracks(path: &Path, max: usize) -> Result<VecDeque<GeneratedTrack>> {
    let mut order: Vec<String> = Vec::new();
    let mut latest: HashMap<String, GeneratedTrack> = HashMap::new();
    for t in read_track_lines(path)? {
        if latest.insert(t.id.clone(), t.clone()).is_none() {
            order.push(t.id);
        }
    }
    let mut tracks = VecDeque::new();
    for id in order {
        if let Some(t) = latest.remove(&id) {
            push_bounded(&mut tracks, t, max);
        }
    }
    Ok(tracks)
}

fn find_track(path: &Path, track_id: &str) -> Result<Option<GeneratedTrack>> {
    Ok(read_track_lines(path)?
        .into_iter()
        .rev()
        .find(|t| t.id == track_id))
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

fn append_line(path: &Path, line: &[u8]) -> Result<()> {
    use std::io::Write;

    let mut f = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    f.write_all(line)?;
    Ok(())
}

#[async_trait]
impl RecordStore for FileStore {
    async fn user(&self, user_id: &str) -> Result<Option<UserRecord>> {
        let _guard = self.users_lock.lock().await;
        Ok(self.read_users().await?.into_iter().find(|u| u.id == user_id))
    }

    async fn put_user(&self, user: UserRecord) -> Result<()> {
        let _guard = self.users_lock.lock().await;
        let mut users = self.read_users().await?;
        match users.iter_mut().find(|u| u.id == user.id) {
            Some(existing) => *existing = user,
            None => users.push(user),
        }
        self.write_users(&users).await
    }

    async fn update_credential(&self, user_id: &str, credential: &Credential) -> Result<()> {
        self.modify_user(user_id, |u| u.credential = credential.clone())
            .await
    }

    async fn cache_profile(
        &self,
        user_id: &str,
        profile: &TasteProfile,
        at: DateTime<Utc>,
    ) -> Result<()> {
        self.modify_user(user_id, |u| {
            u.cached_profile = Some(profile.clone());
            u.profile_cached_at = Some(at);
        })
        .await
    }

    async fn insert_track(&self, track: GeneratedTrack) -> Result<()> {
        let mut tracks = self.tracks.write().await;
        self.append_track(&track).await?;
        push_bounded(&mut tracks, track, self.max_tracks);
        Ok(())
    }

    async fn track(&self, track_id: &str) -> Result<Option<GeneratedTrack>> {
        let cached = self
            .tracks
            .read()
            .await
            .iter()
            .find(|t| t.id == track_id)
            .cloned();
        match cached {
            Some(t) => Ok(Some(t)),
            None => self.track_from_disk(track_id).await,
        }
    }

    async fn tracks_for_user(&self, user_id: &str, limit: usize) -> Result<Vec<GeneratedTrack>> {
        Ok(newest_for_user(&*self.tracks.read().await, user_id, limit))
    }

    async fn set_rating(&self, track_id: &str, rating: u8) -> Result<Option<GeneratedTrack>> {
        let mut tracks = self.tracks.write().await;
        let mut updated = match tracks.iter().find(|t| t.id == track_id) {
            Some(t) => t.clone(),
            None => match self.track_from_disk(track_id).await? {
                Some(t) => t,
                None => return Ok(None),
            },
        };
        updated.rating = Some(rating);
        self.append_track(&updated).await?;
        if let Some(t) = tracks.iter_mut().find(|t| t.id == track_id) {
            t.rating = Some(rating);
        }
        Ok(Some(updated))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reso_domain::profile::Confidence;

    fn user(id: &str) -> UserRecord {
        UserRecord {
            id: id.into(),
            display_name: Some("Listener".into()),
            credential: Credential {
                access_token: "a".into(),
                refresh_token: "r".into(),
                expires_at: Utc::now() + Duration::hours(1),
            },
            cached_profile: None,
            profile_cached_at: None,
        }
    }

    fn profile(genres: &[&str]) -> TasteProfile {
        TasteProfile {
            top_genres: genres.iter().map(|g| g.to_string()).collect(),
            genre_clusters: vec![],
            era_range: "2010s-2020s".into(),
            era_center: 2018,
            sample_top_tracks: vec![],
            sample_top_artists: vec![],
            popularity_avg: 50.0,
            explicit_ratio: 0.0,
            track_count: 10,
            confidence: Confidence::Low,
        }
    }

    fn track(id: &str, user_id: &str) -> GeneratedTrack {
        GeneratedTrack {
            id: id.into(),
            user_id: user_id.into(),
            suno_track_id: format!("suno-{id}"),
            audio_url: format!("https://x/{id}.mp3"),
            image_url: None,
            suno_prompt: "p".into(),
            lyria_prompt: "l".into(),
            song_concept: "c".into(),
            platform: "suno".into(),
            rating: None,
            created_at: Utc::now(),
        }
    }

    fn storage(dir: &Path, max: usize) -> StorageConfig {
        StorageConfig {
            state_path: dir.to_path_buf(),
            max_tracks_in_memory: max,
        }
    }

    #[test]
    fn fresh_profile_respects_ttl_and_genres() {
        let now = Utc::now();
        let mut u = user("u1");
        u.cached_profile = Some(profile(&["indie rock"]));
        u.profile_cached_at = Some(now - Duration::minutes(59));
        assert!(u.fresh_profile(Duration::hours(1), now).is_some());

        u.profile_cached_at = Some(now - Duration::minutes(61));
        assert!(u.fresh_profile(Duration::hours(1), now).is_none());

        u.cached_profile = Some(profile(&[]));
        u.profile_cached_at = Some(now);
        assert!(u.fresh_profile(Duration::hours(1), now).is_none());
    }

    #[tokio::test]
    async fn memory_store_tracks_newest_first() {
        let store = MemoryStore::new();
        store.insert_track(track("t1", "u1")).await.unwrap();
        store.insert_track(track("t2", "u2")).await.unwrap();
        store.insert_track(track("t3", "u1")).await.unwrap();

        let mine = store.tracks_for_user("u1", 10).await.unwrap();
        let ids: Vec<_> = mine.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["t3", "t1"]);

        let rated = store.set_rating("t1", 4).await.unwrap().unwrap();
        assert_eq!(rated.rating, Some(4));
        assert!(store.set_rating("missing", 4).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn file_store_user_updates_persist() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = storage(dir.path(), 100);
        let store = FileStore::open(&cfg).unwrap();

        assert!(store.user("u1").await.unwrap().is_none());
        store.put_user(user("u1")).await.unwrap();

        let rotated = Credential {
            access_token: "a2".into(),
            refresh_token: "r2".into(),
            expires_at: Utc::now() + Duration::hours(1),
        };
        store.update_credential("u1", &rotated).await.unwrap();
        store
            .cache_profile("u1", &profile(&["shoegaze"]), Utc::now())
            .await
            .unwrap();
        // Unknown users are ignored.
        store.update_credential("ghost", &rotated).await.unwrap();

        let reopened = FileStore::open(&cfg).unwrap();
        let u = reopened.user("u1").await.unwrap().unwrap();
        assert_eq!(u.credential.refresh_token, "r2");
        assert_eq!(u.cached_profile.unwrap().top_genres, ["shoegaze"]);
        assert!(reopened.user("ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn file_store_sees_users_written_externally() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = storage(dir.path(), 100);
        let store = FileStore::open(&cfg).unwrap();

        let json = serde_json::to_string(&vec![user("ext")]).unwrap();
        std::fs::write(cfg.users_file(), json).unwrap();
        assert!(store.user("ext").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn file_store_tracks_survive_reload_with_rating() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = storage(dir.path(), 100);
        {
            let store = FileStore::open(&cfg).unwrap();
            store.insert_track(track("t1", "u1")).await.unwrap();
            store.insert_track(track("t2", "u1")).await.unwrap();
            store.set_rating("t1", 5).await.unwrap();
        }
        let store = FileStore::open(&cfg).unwrap();
        let t1 = store.track("t1").await.unwrap().unwrap();
        assert_eq!(t1.rating, Some(5));
        assert_eq!(store.tracks_for_user("u1", 10).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn file_store_ring_is_bounded() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = storage(dir.path(), 3);
        let store = FileStore::open(&cfg).unwrap();
        for i in 0..5 {
            store.insert_track(track(&format!("t{i}"), "u1")).await.unwrap();
        }
        let ids: Vec<_> = store
            .tracks_for_user("u1", 10)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, ["t4", "t3", "t2"]);

        // Memory is bounded, the log is not.
        let on_disk: Vec<GeneratedTrack> = std::fs::read_to_string(cfg.tracks_file())
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        let disk_ids: Vec<_> = on_disk.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(disk_ids, ["t0", "t1", "t2", "t3", "t4"]);
    }

    #[tokio::test]
    async fn evicted_track_can_still_be_rated() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = storage(dir.path(), 2);
        let store = FileStore::open(&cfg).unwrap();
        for id in ["t1", "t2", "t3"] {
            store.insert_track(track(id, "u1")).await.unwrap();
        }

        let t1 = store.track("t1").await.unwrap().unwrap();
        assert_eq!(t1.user_id, "u1");
        let rated = store.set_rating("t1", 3).await.unwrap().unwrap();
        assert_eq!(rated.rating, Some(3));
        assert_eq!(store.track("t1").await.unwrap().unwrap().rating, Some(3));
        assert!(store.set_rating("missing", 3).await.unwrap().is_none());

        // Reload keeps one record per id with the latest rating, in
        // original order.
        let reopened = FileStore::open(&storage(dir.path(), 10)).unwrap();
        let ids: Vec<_> = reopened
            .tracks_for_user("u1", 10)
            .await
            .unwrap()
            .into_iter()
            .map(|t| (t.id, t.rating))
            .collect();
        assert_eq!(
            ids,
            [
                ("t3".to_owned(), None),
                ("t2".to_owned(), None),
                ("t1".to_owned(), Some(3)),
            ]
        );
    }
}
