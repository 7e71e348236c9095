//! Scripted collaborators shared by the gateway integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use reso_domain::credential::Credential;
use reso_domain::error::{Error, ErrorKind, Result};
use reso_domain::event::{CaptchaChallenge, Coordinate};
use reso_domain::profile::{Confidence, TasteProfile};
use reso_domain::prompt::{PromptBundle, TempoFeel};
use reso_gateway::runtime::{Orchestrator, RunSettings};
use reso_gateway::store::{MemoryStore, RecordStore, UserRecord};
use reso_providers::PromptSynthesizer;
use reso_spotify::ProfileSource;
use reso_suno::{ClipStatus, GenerationBackend};

pub fn taste_profile() -> TasteProfile {
    TasteProfile {
        top_genres: vec![
            "shoegaze".into(),
            "dream pop".into(),
            "indie rock".into(),
            "post-punk".into(),
            "synth-pop".into(),
            "trip hop".into(),
        ],
        genre_clusters: vec!["rock".into(), "pop".into()],
        era_range: "1990s-2020s".into(),
        era_center: 2009,
        sample_top_tracks: vec!["Alison — Slowdive".into()],
        sample_top_artists: vec!["Slowdive".into(), "Beach House".into()],
        popularity_avg: 52.0,
        explicit_ratio: 0.1,
        track_count: 95,
        confidence: Confidence::High,
    }
}

pub fn bundle() -> PromptBundle {
    PromptBundle {
        suno_prompt: "shoegaze, dream pop, hazy guitars, airy vocals".into(),
        lyria_prompt: "Reverb-soaked guitars drifting over a patient beat.".into(),
        song_concept: "Driving home at dawn.".into(),
        mood: "wistful".into(),
        tempo_feel: TempoFeel::Midtempo,
        energy_estimate: 0.5,
        valence_estimate: 0.4,
    }
}

pub fn credential(expires_in_secs: i64) -> Credential {
    Credential {
        access_token: "access-1".into(),
        refresh_token: "refresh-1".into(),
        expires_at: Utc::now() + chrono::Duration::seconds(expires_in_secs),
    }
}

pub fn user(id: &str) -> UserRecord {
    UserRecord {
        id: id.into(),
        display_name: Some("Listener".into()),
        credential: credential(3600),
        cached_profile: None,
        profile_cached_at: None,
    }
}

/// Build an error of the given kind, the way the adapters would.
pub fn error_of(kind: ErrorKind) -> Error {
    match kind {
        ErrorKind::Unauthorized => Error::unauthorized("suno", "session expired"),
        ErrorKind::RateLimited => Error::from_status("suno", 429, "slow down", None),
        ErrorKind::Unreachable => Error::unreachable("suno", "connection refused"),
        ErrorKind::BadStatus => Error::from_status("suno", 404, "not found", None),
        ErrorKind::Malformed => Error::malformed("suno", "expected array"),
        ErrorKind::BackendRejected => Error::BackendRejected("rejected".into()),
        ErrorKind::Timeout => Error::Timeout("slow".into()),
        ErrorKind::Other => Error::Other("boom".into()),
    }
}

// ── profile source ──────────────────────────────────────────────────

#[derive(Default)]
pub struct FakeProfiles {
    pub fetches: AtomicUsize,
    pub refreshes: AtomicUsize,
    /// Access token seen by the last fetch.
    pub last_token: Mutex<Option<String>>,
    pub fail_with: Mutex<Option<ErrorKind>>,
}

#[async_trait]
impl ProfileSource for FakeProfiles {
    async fn refresh_credential(&self, credential: &Credential) -> Result<Credential> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        Ok(Credential {
            access_token: "access-2".into(),
            refresh_token: credential.refresh_token.clone(),
            expires_at: Utc.with_ymd_and_hms(2099, 1, 1, 0, 0, 0).unwrap(),
        })
    }

    async fn fetch_profile(&self, credential: &Credential) -> Result<TasteProfile> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        *self.last_token.lock().unwrap() = Some(credential.access_token.clone());
        if let Some(kind) = *self.fail_with.lock().unwrap() {
            return Err(error_of(kind));
        }
        Ok(taste_profile())
    }
}

// ── synthesizer ─────────────────────────────────────────────────────

#[derive(Default)]
pub struct FakeSynth {
    pub calls: AtomicUsize,
    pub last_novelty: Mutex<Option<f32>>,
}

#[async_trait]
impl PromptSynthesizer for FakeSynth {
    async fn synthesize(&self, _profile: &TasteProfile, novelty: f32) -> Result<PromptBundle> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_novelty.lock().unwrap() = Some(novelty);
        Ok(bundle())
    }

    fn provider_id(&self) -> &str {
        "fake"
    }
}

// ── generation backend ──────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum CaptchaStep {
    Pending,
    Absent,
    Fail,
}

#[derive(Debug, Clone)]
pub enum StatusStep {
    Status(&'static str),
    Complete,
    Fail(ErrorKind),
}

#[derive(Debug, Clone)]
pub enum SubmitStep {
    Accept(&'static str),
    Fail(ErrorKind),
}

/// Pops one scripted reply per call; the last one repeats.
struct Script<T: Clone>(Mutex<VecDeque<T>>);

impl<T: Clone> Script<T> {
    fn new(steps: Vec<T>) -> Self {
        Self(Mutex::new(steps.into()))
    }

    fn next(&self) -> Option<T> {
        let mut q = self.0.lock().unwrap();
        if q.len() > 1 {
            q.pop_front()
        } else {
            q.front().cloned()
        }
    }
}

pub struct ScriptedBackend {
    submit: Script<SubmitStep>,
    submit_delay: Duration,
    captcha: Script<CaptchaStep>,
    status: Script<StatusStep>,
    pub submits: Mutex<Vec<(String, String)>>,
    pub captcha_calls: AtomicUsize,
    pub status_calls: AtomicUsize,
    pub solves: Mutex<Vec<Vec<Coordinate>>>,
    /// Submissions in flight right now, and the highest value seen.
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self {
            submit: Script::new(vec![SubmitStep::Accept("abc123")]),
            submit_delay: Duration::ZERO,
            captcha: Script::new(vec![CaptchaStep::Absent]),
            status: Script::new(vec![StatusStep::Complete]),
            submits: Mutex::new(Vec::new()),
            captcha_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
            solves: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn submit_steps(mut self, steps: Vec<SubmitStep>) -> Self {
        self.submit = Script::new(steps);
        self
    }

    pub fn submit_delay(mut self, delay: Duration) -> Self {
        self.submit_delay = delay;
        self
    }

    pub fn captcha_steps(mut self, steps: Vec<CaptchaStep>) -> Self {
        self.captcha = Script::new(steps);
        self
    }

    pub fn status_steps(mut self, steps: Vec<StatusStep>) -> Self {
        self.status = Script::new(steps);
        self
    }
}

#[async_trait]
impl GenerationBackend for ScriptedBackend {
    async fn submit(&self, prompt: &str, tags: &str) -> Result<String> {
        self.submits
            .lock()
            .unwrap()
            .push((prompt.to_owned(), tags.to_owned()));
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.submit_delay.is_zero() {
            tokio::time::sleep(self.submit_delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        match self.submit.next() {
            Some(SubmitStep::Accept(id)) => Ok(id.to_owned()),
            Some(SubmitStep::Fail(kind)) => Err(error_of(kind)),
            None => Err(Error::Other("no submit scripted".into())),
        }
    }

    async fn captcha_status(&self) -> Result<Option<CaptchaChallenge>> {
        self.captcha_calls.fetch_add(1, Ordering::SeqCst);
        match self.captcha.next() {
            Some(CaptchaStep::Pending) => Ok(Some(CaptchaChallenge {
                image: "iVBORw0KGgo=".into(),
                prompt: "Click the bicycles".into(),
            })),
            Some(CaptchaStep::Fail) => Err(error_of(ErrorKind::Unreachable)),
            Some(CaptchaStep::Absent) | None => Ok(None),
        }
    }

    async fn captcha_solve(&self, coordinates: &[Coordinate]) -> Result<bool> {
        self.solves.lock().unwrap().push(coordinates.to_vec());
        Ok(true)
    }

    async fn completion_status(&self, job_id: &str) -> Result<ClipStatus> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        match self.status.next() {
            Some(StatusStep::Complete) => Ok(ClipStatus {
                status: "complete".into(),
                audio_url: Some(format!("https://cdn.example/{job_id}.mp3")),
                image_url: Some(format!("https://cdn.example/{job_id}.jpg")),
                title: Some("Dawn Drive".into()),
            }),
            Some(StatusStep::Status(s)) => Ok(ClipStatus {
                status: s.into(),
                ..ClipStatus::default()
            }),
            Some(StatusStep::Fail(kind)) => Err(error_of(kind)),
            None => Err(Error::Other("no status scripted".into())),
        }
    }
}

// ── wiring ──────────────────────────────────────────────────────────

pub struct Harness {
    pub profiles: Arc<FakeProfiles>,
    pub synth: Arc<FakeSynth>,
    pub backend: Arc<ScriptedBackend>,
    pub store: Arc<MemoryStore>,
    pub orchestrator: Orchestrator,
}

pub async fn harness(backend: ScriptedBackend) -> Harness {
    harness_with(backend, RunSettings::default()).await
}

/// Run settings with millisecond intervals, for tests on real time.
pub fn fast_settings() -> RunSettings {
    let mut settings = RunSettings::default();
    settings.captcha.interval = Duration::from_millis(10);
    settings.poll.interval = Duration::from_millis(10);
    settings.poll.late_interval = Duration::from_millis(20);
    settings.poll.late_threshold = Duration::from_millis(200);
    settings.poll.timeout = Duration::from_secs(5);
    settings
}

pub async fn harness_with(backend: ScriptedBackend, settings: RunSettings) -> Harness {
    let profiles = Arc::new(FakeProfiles::default());
    let synth = Arc::new(FakeSynth::default());
    let backend = Arc::new(backend);
    let store = Arc::new(MemoryStore::new());
    store.put_user(user("u1")).await.unwrap();
    store.put_user(user("u2")).await.unwrap();

    let orchestrator = Orchestrator::new(
        profiles.clone(),
        synth.clone(),
        backend.clone(),
        store.clone(),
        settings,
    );
    Harness {
        profiles,
        synth,
        backend,
        store,
        orchestrator,
    }
}
