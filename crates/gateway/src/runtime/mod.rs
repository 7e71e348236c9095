//! Generation runtime: the orchestrator that takes one request from
//! profile to a stored track.
//!
//! Entry point: [`Orchestrator::run`] spawns the run and hands back a
//! [`ProgressStream`] suitable for SSE or for draining in the CLI.
//! [`Orchestrator::solve_captcha`] is independent of any run and may be
//! called at any time.

pub mod admission;
pub mod captcha_watch;
pub mod completion;
pub mod emitter;
pub mod session;

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::Instrument;

use reso_domain::config::Config;
use reso_domain::error::{Error, Result};
use reso_domain::event::{CompletedTrack, Coordinate, ProgressEvent, PromptReady, Stage};
use reso_domain::profile::TasteProfile;
use reso_domain::trace::TraceEvent;
use reso_providers::PromptSynthesizer;
use reso_spotify::ProfileSource;
use reso_suno::GenerationBackend;

use crate::store::{GeneratedTrack, RecordStore};

pub use admission::AdmissionGate;
pub use captcha_watch::{watch_captcha, CaptchaWatch};
pub use completion::{poll_completion, PollPolicy};
pub use emitter::{Frame, ProgressEmitter, ProgressStream};
pub use session::GenerationSession;

const MSG_BUILDING_PROFILE: &str = "Crafting your sound profile...";
const MSG_QUEUED: &str = "Waiting for the generator to free up...";
const MSG_SUBMITTING: &str = "Generating your track...";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Run parameters
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Input to a single run.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub user_id: String,
    /// A precomputed profile. `None` builds (or reuses a cached) profile
    /// from the user's listening history.
    pub profile: Option<TasteProfile>,
    /// 0.0-1.0; `None` uses the configured default.
    pub novelty: Option<f32>,
    pub platform: String,
    /// Replaces the synthesized backend prompt for submission only.
    pub custom_prompt: Option<String>,
}

impl GenerationRequest {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            profile: None,
            novelty: None,
            platform: "suno".into(),
            custom_prompt: None,
        }
    }
}

/// Knobs taken from config once at startup.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub captcha: CaptchaWatch,
    pub poll: PollPolicy,
    pub default_novelty: f32,
    pub default_title: String,
    pub song_url_base: String,
    pub profile_cache_ttl: chrono::Duration,
}

impl RunSettings {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            captcha: CaptchaWatch::from_config(&cfg.generation),
            poll: PollPolicy::from_config(&cfg.generation),
            default_novelty: cfg.generation.default_novelty,
            default_title: cfg.generation.default_title.clone(),
            song_url_base: cfg.suno.song_url_base.trim_end_matches('/').to_owned(),
            profile_cache_ttl: chrono::Duration::seconds(
                cfg.generation.profile_cache_ttl_secs as i64,
            ),
        }
    }

    fn song_url(&self, job_id: &str) -> String {
        format!("{}/{}", self.song_url_base, job_id)
    }
}

impl Default for RunSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Orchestrator
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Cheap to clone; every run gets its own copy of the handles.
#[derive(Clone)]
pub struct Orchestrator {
    profiles: Arc<dyn ProfileSource>,
    synthesizer: Arc<dyn PromptSynthesizer>,
    backend: Arc<dyn GenerationBackend>,
    store: Arc<dyn RecordStore>,
    gate: AdmissionGate,
    settings: Arc<RunSettings>,
}

impl Orchestrator {
    pub fn new(
        profiles: Arc<dyn ProfileSource>,
        synthesizer: Arc<dyn PromptSynthesizer>,
        backend: Arc<dyn GenerationBackend>,
        store: Arc<dyn RecordStore>,
        settings: RunSettings,
    ) -> Self {
        Self {
            profiles,
            synthesizer,
            backend,
            store,
            gate: AdmissionGate::new(),
            settings: Arc::new(settings),
        }
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    pub fn gate(&self) -> &AdmissionGate {
        &self.gate
    }

    /// Start a run in the background and return its progress stream.
    pub fn run(&self, request: GenerationRequest) -> ProgressStream {
        let (emitter, stream) = emitter::channel();
        let run_id = uuid::Uuid::new_v4().to_string();
        let span = tracing::info_span!(
            "generation_run",
            run_id = %run_id,
            user_id = %request.user_id,
        );
        let this = self.clone();
        tokio::spawn(async move { this.drive(run_id, request, emitter).await }.instrument(span));
        stream
    }

    /// Forward captcha clicks to the backend. `false` when nothing was
    /// pending.
    pub async fn solve_captcha(&self, coordinates: &[Coordinate]) -> Result<bool> {
        let ok = self.backend.captcha_solve(coordinates).await?;
        tracing::info!(clicks = coordinates.len(), accepted = ok, "captcha solution forwarded");
        Ok(ok)
    }

    /// The user's taste profile: the cached one while it is fresh,
    /// otherwise rebuilt from listening history (refreshing the credential
    /// first if it has expired) and cached.
    pub async fn analyze_profile(&self, user_id: &str) -> Result<TasteProfile> {
        let user = self
            .store
            .user(user_id)
            .await?
            .ok_or_else(|| Error::Other(format!("unknown user '{user_id}'")))?;

        let now = Utc::now();
        if let Some(profile) = user.fresh_profile(self.settings.profile_cache_ttl, now) {
            tracing::debug!(user_id, "using cached profile");
            return Ok(profile.clone());
        }

        let credential = if user.credential.is_expired_at(now) {
            let refreshed = self.profiles.refresh_credential(&user.credential).await?;
            self.store.update_credential(user_id, &refreshed).await?;
            TraceEvent::TokenRefreshed {
                user_id: user_id.to_owned(),
                rotated: refreshed.refresh_token != user.credential.refresh_token,
            }
            .emit();
            refreshed
        } else {
            user.credential
        };

        let profile = self.profiles.fetch_profile(&credential).await?;
        if let Err(e) = self.store.cache_profile(user_id, &profile, Utc::now()).await {
            tracing::warn!(user_id, error = %e, "failed to cache profile");
        }
        Ok(profile)
    }

    // ── run lifecycle ───────────────────────────────────────────────

    async fn drive(self, run_id: String, request: GenerationRequest, mut emitter: ProgressEmitter) {
        let started = Instant::now();
        let novelty = self.novelty(&request);
        TraceEvent::RunStarted {
            run_id: run_id.clone(),
            user_id: request.user_id.clone(),
            platform: request.platform.clone(),
            novelty,
        }
        .emit();

        let mut session = GenerationSession::new(run_id.clone());
        let outcome = self
            .execute(&request, novelty, &mut session, &mut emitter)
            .await;

        let error = match outcome {
            Ok(track) => {
                session.advance(Stage::Complete);
                emitter.emit(ProgressEvent::Complete(track));
                None
            }
            Err(e) => {
                let failed_in = session.stage();
                session.advance(Stage::Failed);
                tracing::warn!(stage = %failed_in, error = %e, "generation run failed");
                emitter.emit(ProgressEvent::error(e.to_string()));
                Some(e.to_string())
            }
        };

        TraceEvent::RunFinished {
            run_id,
            outcome: session.stage().as_str().to_owned(),
            duration_ms: started.elapsed().as_millis() as u64,
            error,
        }
        .emit();
    }

    fn novelty(&self, request: &GenerationRequest) -> f32 {
        request
            .novelty
            .unwrap_or(self.settings.default_novelty)
            .clamp(0.0, 1.0)
    }

    async fn execute(
        &self,
        request: &GenerationRequest,
        novelty: f32,
        session: &mut GenerationSession,
        emitter: &mut ProgressEmitter,
    ) -> Result<CompletedTrack> {
        // 1. Profile.
        session.advance(Stage::BuildingProfile);
        emitter.emit(ProgressEvent::status(Stage::BuildingProfile, MSG_BUILDING_PROFILE));
        let profile = match &request.profile {
            Some(p) => p.clone(),
            None => self.analyze_profile(&request.user_id).await?,
        };

        // 2. Prompts.
        session.advance(Stage::PromptSynthesis);
        let bundle = self.synthesizer.synthesize(&profile, novelty).await?;
        emitter.emit(ProgressEvent::PromptReady(PromptReady::from(&bundle)));

        // 3. Submission, with the captcha watch running until it resolves.
        session.advance(Stage::Submitting);
        let permit = match self.gate.try_admit() {
            Some(p) => p,
            None => {
                emitter.emit(ProgressEvent::status(Stage::Submitting, MSG_QUEUED));
                self.gate.admit().await?
            }
        };
        emitter.emit(ProgressEvent::status(Stage::Submitting, MSG_SUBMITTING));

        let prompt = request
            .custom_prompt
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .unwrap_or(&bundle.suno_prompt)
            .to_owned();
        let tags = profile.style_tags();
        let backend = self.backend.clone();
        let submission = tokio::spawn(async move { backend.submit(&prompt, &tags).await });

        let joined = watch_captcha(
            self.backend.as_ref(),
            submission,
            &self.settings.captcha,
            session,
            emitter,
        )
        .await;
        drop(permit);
        let job_id = joined.map_err(|e| Error::Other(format!("submission task failed: {e}")))??;
        tracing::info!(job_id = %job_id, "submission accepted");
        session.job_id = Some(job_id.clone());

        // 4. Completion.
        session.advance(Stage::AwaitingCompletion);
        let result = poll_completion(
            self.backend.as_ref(),
            &job_id,
            &self.settings.poll,
            session,
            emitter,
        )
        .await?;

        // 5. Persist.
        let record = GeneratedTrack {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: request.user_id.clone(),
            suno_track_id: job_id.clone(),
            audio_url: result.audio_url.clone(),
            image_url: result.image_url.clone(),
            suno_prompt: bundle.suno_prompt,
            lyria_prompt: bundle.lyria_prompt,
            song_concept: bundle.song_concept,
            platform: request.platform.clone(),
            rating: None,
            created_at: Utc::now(),
        };
        let track_id = record.id.clone();
        self.store.insert_track(record).await?;

        Ok(CompletedTrack {
            audio_url: result.audio_url,
            image_url: result.image_url.unwrap_or_default(),
            track_id,
            title: result
                .title
                .unwrap_or_else(|| self.settings.default_title.clone()),
            suno_url: self.settings.song_url(&job_id),
        })
    }
}
