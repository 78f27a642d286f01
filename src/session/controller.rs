//! # Playback Session Controller
//!
//! [`PlayerController`] is the single owner of a player's playback engine. Every engine
//! lifecycle operation (create, attach, seek, destroy) goes through it, so at most one
//! engine instance exists per player at any moment.
//!
//! ## States
//!
//! ```text
//! Idle -> Resolving -> Installing -> Playing <-> Buffering
//!                          ^            |
//!                          |            v
//!                          +-------- Error (failover re-enters Resolving)
//! ```
//!
//! Any state returns to `Idle` on [`unmount`](PlayerController::unmount).
//!
//! ## Superseding
//!
//! Each selection, quality or category switch advances the player's [`Generation`]. Work
//! belonging to an older generation finishes its network calls but never touches the engine
//! or the session.
//!
//! ## Resume
//!
//! The stored offset for the selected episode is applied once the engine reports first
//! playable data, and once more when the duration becomes known if it was unknown at that
//! point. While playing, [`spawn_progress_persister`](PlayerController::spawn_progress_persister)
//! writes the position to the [`ResumeStore`] on a fixed interval.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Weak};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use super::{
    bootstrap::{HttpBootstrapper, SessionBootstrapper},
    bridge::{BridgeAction, FAILOVER_NOTICE, FailoverDecision, PlayerEventBridge},
    engine::{EngineEvent, EngineFactory, PlaybackEngine},
    resume::ResumeStore,
    token::{Generation, RequestToken},
};
use crate::{
    Error, Result,
    config::{FailoverSettings, Settings},
    proxy::{PlayableUrl, ProxyStrategyBuilder},
    resolver::{Resolution, SourceOrchestrator},
    types::{CandidateSource, Category, MediaRequest, ProviderKind, normalize_quality_label},
};

/// Player lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayerState {
    #[default]
    Idle,
    Resolving,
    Installing,
    Playing,
    Buffering,
    /// Recoverable; a new selection or failover leaves it
    Error,
}

/// The live session of an open player
#[derive(Debug, Clone)]
pub struct PlaybackSession {
    pub request: MediaRequest,
    pub active_provider: ProviderKind,
    pub active_category: Category,
    pub active_quality: String,
    pub server: String,
    /// Ranked sources of the installed server
    pub current_source_set: Vec<CandidateSource>,
    pub playable: PlayableUrl,
    pub resume_offset_secs: f64,
    pub last_error: Option<String>,
    pub failover_hops: u32,
    /// Providers abandoned by failover during this selection
    pub excluded: Vec<ProviderKind>,
    pub notice: Option<String>,
}

#[derive(Debug, Clone, Copy)]
struct PendingSeek {
    offset: f64,
    attempted: bool,
}

#[derive(Default)]
struct Inner {
    state: PlayerState,
    engine: Option<Box<dyn PlaybackEngine>>,
    session: Option<PlaybackSession>,
    /// Winning resolution per category for the active provider
    resolutions: HashMap<Category, Resolution>,
    /// Landing pages loaded during this session
    bootstrapped: HashSet<String>,
    pending_seek: Option<PendingSeek>,
    last_error: Option<String>,
}

impl Inner {
    fn destroy_engine(&mut self) {
        if let Some(mut engine) = self.engine.take() {
            engine.destroy();
        }
    }

    /// Tear everything down and park in `Error`
    fn fail(&mut self, error: &Error) {
        self.destroy_engine();
        self.session = None;
        self.resolutions.clear();
        self.pending_seek = None;
        self.last_error = Some(error.to_string());
        self.state = PlayerState::Error;
    }

    fn apply_pending_seek(&mut self, duration_known: bool) {
        let Some(pending) = self.pending_seek.take() else {
            return;
        };
        let Some(engine) = self.engine.as_mut() else {
            return;
        };

        let seeked = match engine.seek(pending.offset) {
            Ok(()) => {
                tracing::debug!("Applied resume offset {:.1}s", pending.offset);
                true
            }
            Err(err) => {
                tracing::warn!("Resume seek to {:.1}s failed: {}", pending.offset, err);
                false
            }
        };

        if (!duration_known || !seeked) && !pending.attempted {
            self.pending_seek = Some(PendingSeek {
                attempted: true,
                ..pending
            });
        }
    }
}

/// What to install and how
struct InstallPlan {
    request: MediaRequest,
    resolution: Resolution,
    quality: Option<String>,
    /// `None` loads the stored offset
    resume_offset: Option<f64>,
    failover_hops: u32,
    excluded: Vec<ProviderKind>,
    notice: Option<String>,
    fresh_session: bool,
}

pub struct PlayerController {
    orchestrator: Arc<SourceOrchestrator>,
    proxy: ProxyStrategyBuilder,
    engines: Arc<dyn EngineFactory>,
    bootstrapper: Arc<dyn SessionBootstrapper>,
    resume: Arc<ResumeStore>,
    failover: FailoverSettings,
    generation: Generation,
    install_lock: Mutex<()>,
    inner: Mutex<Inner>,
}

impl PlayerController {
    pub fn new(
        orchestrator: Arc<SourceOrchestrator>,
        proxy: ProxyStrategyBuilder,
        engines: Arc<dyn EngineFactory>,
        bootstrapper: Arc<dyn SessionBootstrapper>,
        resume: Arc<ResumeStore>,
        failover: FailoverSettings,
    ) -> Self {
        Self {
            orchestrator,
            proxy,
            engines,
            bootstrapper,
            resume,
            failover,
            generation: Generation::new(),
            install_lock: Mutex::new(()),
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Controller wired to the configured providers, HTTP bootstrapper and file-backed resume store
    pub fn from_settings(settings: &Settings, engines: Arc<dyn EngineFactory>) -> Result<Self> {
        Ok(Self::new(
            Arc::new(SourceOrchestrator::from_settings(settings)?),
            ProxyStrategyBuilder::new(&settings.proxy)?,
            engines,
            Arc::new(HttpBootstrapper::new(settings)?),
            Arc::new(ResumeStore::open(
                settings.resume_store_path(),
                &settings.resume,
            )?),
            settings.failover.clone(),
        ))
    }

    pub async fn state(&self) -> PlayerState {
        self.inner.lock().await.state
    }

    pub async fn session_snapshot(&self) -> Option<PlaybackSession> {
        self.inner.lock().await.session.clone()
    }

    pub async fn last_error(&self) -> Option<String> {
        let inner = self.inner.lock().await;
        inner
            .session
            .as_ref()
            .and_then(|s| s.last_error.clone())
            .or_else(|| inner.last_error.clone())
    }

    /// Pending user notice, cleared once taken
    pub async fn take_notice(&self) -> Option<String> {
        self.inner
            .lock()
            .await
            .session
            .as_mut()
            .and_then(|s| s.notice.take())
    }

    /// Select a title/episode, superseding anything in flight
    pub async fn select(
        &self,
        request: MediaRequest,
        preferred_category: Option<Category>,
    ) -> Result<PlaybackSession> {
        let token = self.generation.advance();
        {
            let mut inner = self.inner.lock().await;
            self.persist_locked(&inner);
            inner.state = PlayerState::Resolving;
        }

        tracing::info!("Selecting {}", request.resume_key());
        let resolution = match self
            .orchestrator
            .obtain_sources(&request, preferred_category, &[], &token)
            .await
        {
            Ok(resolution) => resolution,
            Err(Error::Superseded) => {
                tracing::debug!("Selection of {} superseded", request.resume_key());
                return Err(Error::Superseded);
            }
            Err(err) => {
                let mut inner = self.inner.lock().await;
                token.check()?;
                inner.fail(&err);
                return Err(err);
            }
        };

        self.install(
            &token,
            InstallPlan {
                request,
                resolution,
                quality: None,
                resume_offset: None,
                failover_hops: 0,
                excluded: Vec::new(),
                notice: None,
                fresh_session: true,
            },
        )
        .await
    }

    /// Reinstall the current server's source with another quality, keeping the position
    pub async fn switch_quality(&self, label: &str) -> Result<PlaybackSession> {
        let label = normalize_quality_label(label);
        let plan = {
            let inner = self.inner.lock().await;
            let session = inner
                .session
                .as_ref()
                .ok_or_else(|| Error::invalid_request("no active playback session"))?;
            let resolution = inner
                .resolutions
                .get(&session.active_category)
                .cloned()
                .ok_or_else(|| Error::internal("active category has no resolution"))?;
            if resolution.quality(&label).is_none() {
                return Err(Error::invalid_request(format!(
                    "quality {} is not offered by {}/{}",
                    label, session.active_provider, session.server
                )));
            }

            InstallPlan {
                request: session.request.clone(),
                resolution,
                quality: Some(label),
                resume_offset: Some(current_position(&inner, session)),
                failover_hops: session.failover_hops,
                excluded: session.excluded.clone(),
                notice: None,
                fresh_session: false,
            }
        };

        let token = self.generation.advance();
        self.install(&token, plan).await
    }

    /// Switch sub/dub/raw; re-resolves when this category was not obtained yet
    ///
    /// On failure the current engine keeps playing.
    pub async fn switch_category(&self, category: Category) -> Result<PlaybackSession> {
        let token = self.generation.advance();
        let (session, cached, position, previous_state) = {
            let mut inner = self.inner.lock().await;
            let session = inner
                .session
                .clone()
                .ok_or_else(|| Error::invalid_request("no active playback session"))?;
            if session.active_category == category {
                return Ok(session);
            }
            let cached = inner.resolutions.get(&category).cloned();
            let position = current_position(&inner, &session);
            let previous_state = inner.state;
            if cached.is_none() {
                inner.state = PlayerState::Resolving;
            }
            (session, cached, position, previous_state)
        };

        let resolution = match cached {
            Some(resolution) => resolution,
            None => {
                let hinted = session
                    .request
                    .clone()
                    .with_provider_hint(session.active_provider);
                match self
                    .orchestrator
                    .obtain_category(&hinted, category, &token)
                    .await
                {
                    Ok(resolution) => resolution,
                    Err(Error::Superseded) => return Err(Error::Superseded),
                    Err(err) => {
                        let mut inner = self.inner.lock().await;
                        token.check()?;
                        tracing::warn!("Switching to {} failed: {}", category, err);
                        inner.state = previous_state;
                        return Err(err);
                    }
                }
            }
        };

        self.install(
            &token,
            InstallPlan {
                request: session.request,
                resolution,
                quality: None,
                resume_offset: Some(position),
                failover_hops: session.failover_hops,
                excluded: session.excluded,
                notice: None,
                fresh_session: false,
            },
        )
        .await
    }

    /// Feed one engine event through the bridge
    ///
    /// Returns `PlaybackFatal` when a fatal error could not be recovered by failover.
    pub async fn handle_engine_event(&self, event: EngineEvent) -> Result<()> {
        let action = PlayerEventBridge::classify(&event);
        if let BridgeAction::Failover(detail) = action {
            return self.fail_over(detail).await;
        }

        let mut inner = self.inner.lock().await;
        if inner.engine.is_none() {
            tracing::debug!("Dropping engine event without an engine: {:?}", event);
            return Ok(());
        }

        match action {
            BridgeAction::MarkPlaying { duration } => {
                if matches!(inner.state, PlayerState::Installing | PlayerState::Buffering) {
                    inner.state = PlayerState::Playing;
                }
                let duration_known = duration.is_some()
                    || inner.engine.as_ref().and_then(|e| e.duration()).is_some();
                inner.apply_pending_seek(duration_known);
            }
            BridgeAction::DurationKnown(duration) => {
                let retry = inner.pending_seek.is_some_and(|p| p.attempted)
                    && matches!(inner.state, PlayerState::Playing | PlayerState::Buffering);
                if retry {
                    tracing::debug!("Duration known ({:.1}s), re-applying resume offset", duration);
                    inner.apply_pending_seek(true);
                }
            }
            BridgeAction::Progress(position) => {
                tracing::trace!("Position {:.1}s", position);
            }
            BridgeAction::EnterBuffering => {
                if inner.state == PlayerState::Playing {
                    inner.state = PlayerState::Buffering;
                    tracing::debug!("Buffering");
                }
            }
            BridgeAction::LeaveBuffering => {
                if inner.state == PlayerState::Buffering {
                    inner.state = PlayerState::Playing;
                }
            }
            BridgeAction::Ignore(message) => tracing::debug!("{}", message),
            BridgeAction::Failover(_) => {}
        }
        Ok(())
    }

    /// Persist the current position when playing
    pub async fn persist_progress(&self) -> Result<bool> {
        let inner = self.inner.lock().await;
        self.save_position(&inner)
    }

    /// Persist progress every `resume.persist_interval_secs` until the controller is dropped
    pub fn spawn_progress_persister(self: &Arc<Self>) -> JoinHandle<()> {
        let interval = self.resume.persist_interval();
        let controller: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(controller) = controller.upgrade() else {
                    break;
                };
                if let Err(e) = controller.persist_progress().await {
                    tracing::warn!("Failed to persist playback progress: {}", e);
                }
            }
        })
    }

    /// Leave the player: destroy the engine and clear the session
    pub async fn unmount(&self) {
        self.generation.advance();
        let mut inner = self.inner.lock().await;
        self.persist_locked(&inner);
        inner.destroy_engine();
        inner.session = None;
        inner.resolutions.clear();
        inner.bootstrapped.clear();
        inner.pending_seek = None;
        inner.last_error = None;
        inner.state = PlayerState::Idle;
        tracing::debug!("Player unmounted");
    }

    fn save_position(&self, inner: &Inner) -> Result<bool> {
        if !matches!(inner.state, PlayerState::Playing | PlayerState::Buffering) {
            return Ok(false);
        }
        let (Some(engine), Some(session)) = (inner.engine.as_ref(), inner.session.as_ref()) else {
            return Ok(false);
        };
        self.resume.save(
            &session.request.resume_key(),
            engine.position(),
            engine.duration(),
        )
    }

    fn persist_locked(&self, inner: &Inner) {
        if let Err(e) = self.save_position(inner) {
            tracing::warn!("Failed to persist playback progress: {}", e);
        }
    }

    async fn fail_over(&self, detail: String) -> Result<()> {
        let (request, provider, category, hops, excluded, position) = {
            let mut guard = self.inner.lock().await;
            let inner = &mut *guard;
            let Some(session) = inner.session.as_mut() else {
                tracing::debug!("Fatal engine error without a session: {}", detail);
                return Ok(());
            };

            let position = inner
                .engine
                .as_ref()
                .map_or(session.resume_offset_secs, |e| e.position());
            if let Some(mut engine) = inner.engine.take() {
                engine.destroy();
            }
            inner.pending_seek = None;
            inner.state = PlayerState::Error;
            session.last_error = Some(detail.clone());

            let mut excluded = session.excluded.clone();
            if !excluded.contains(&session.active_provider) {
                excluded.push(session.active_provider);
            }
            (
                session.request.clone(),
                session.active_provider,
                session.active_category,
                session.failover_hops,
                excluded,
                position,
            )
        };
        tracing::warn!("Fatal playback error on {}: {}", provider, detail);

        let has_alternate = !self.orchestrator.try_order(None, &excluded).is_empty();
        if PlayerEventBridge::failover_decision(hops, self.failover.max_hops, has_alternate)
            == FailoverDecision::Surface
        {
            tracing::error!("No failover left after {} hops, surfacing error", hops);
            return Err(Error::playback_fatal(provider, detail));
        }

        let token = self.generation.advance();
        self.inner.lock().await.state = PlayerState::Resolving;

        let resolution = match self
            .orchestrator
            .obtain_sources(&request, Some(category), &excluded, &token)
            .await
        {
            Ok(resolution) => resolution,
            Err(Error::Superseded) => return Err(Error::Superseded),
            Err(err) => {
                tracing::warn!("Failover from {} found no alternate: {}", provider, err);
                let mut inner = self.inner.lock().await;
                token.check()?;
                inner.state = PlayerState::Error;
                return Err(Error::playback_fatal(provider, detail));
            }
        };

        tracing::info!("Failing over from {} to {}", provider, resolution.provider);
        self.install(
            &token,
            InstallPlan {
                request,
                resolution,
                quality: None,
                resume_offset: Some(position),
                failover_hops: hops + 1,
                excluded,
                notice: Some(FAILOVER_NOTICE.to_string()),
                fresh_session: false,
            },
        )
        .await
        .map(|_| ())
    }

    /// `Resolving -> Installing`: tear down the old engine, then attach the new source
    async fn install(&self, token: &RequestToken, plan: InstallPlan) -> Result<PlaybackSession> {
        let resolution = plan.resolution;
        let source = plan
            .quality
            .as_deref()
            .and_then(|label| resolution.quality(label))
            .or_else(|| resolution.best())
            .cloned()
            .ok_or_else(|| Error::internal("resolution carries no sources"))?;
        let playable = self.proxy.build_playable_url(&source);

        let bootstrap_url = playable.session_bootstrap_url.clone();
        if let Some(landing) = &bootstrap_url {
            let done =
                !plan.fresh_session && self.inner.lock().await.bootstrapped.contains(landing);
            if !done {
                if let Err(e) = self.bootstrapper.bootstrap(landing).await {
                    tracing::warn!("Session bootstrap failed, continuing: {}", e);
                }
                token.check()?;
            }
        }

        let offset = plan
            .resume_offset
            .unwrap_or_else(|| self.resume.restore(&plan.request.resume_key()));

        // Installs run one at a time; `inner` is released while the engine attaches so
        // engine events and progress saves are not blocked behind the network.
        let _install = self.install_lock.lock().await;
        let mut engine = {
            let mut inner = self.inner.lock().await;
            token.check()?;
            inner.state = PlayerState::Installing;
            inner.destroy_engine();
            self.engines.create()
        };
        engine.set_fragment_headers(&playable.fragment_headers);
        let attached = engine.attach(&playable.url, &source.quality_label).await;

        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;
        if !token.is_current() {
            engine.destroy();
            return Err(Error::Superseded);
        }
        if let Err(err) = attached {
            engine.destroy();
            tracing::error!("Engine rejected {}: {}", playable.url, err);
            inner.fail(&err);
            return Err(err);
        }

        let same_provider = inner
            .session
            .as_ref()
            .is_some_and(|s| s.active_provider == resolution.provider);
        if plan.fresh_session || !same_provider {
            inner.resolutions.clear();
        }
        if plan.fresh_session {
            inner.bootstrapped.clear();
        }
        if let Some(landing) = bootstrap_url {
            inner.bootstrapped.insert(landing);
        }

        let session = PlaybackSession {
            request: plan.request,
            active_provider: resolution.provider,
            active_category: resolution.category,
            active_quality: source.quality_label.clone(),
            server: resolution.server.clone(),
            current_source_set: resolution.sources.clone(),
            playable,
            resume_offset_secs: offset,
            last_error: None,
            failover_hops: plan.failover_hops,
            excluded: plan.excluded,
            notice: plan.notice,
        };

        tracing::info!(
            "Installed {} {} from {}/{}/{}",
            session.request.resume_key(),
            session.active_quality,
            session.active_provider,
            session.active_category,
            session.server
        );

        inner.resolutions.insert(resolution.category, resolution);
        inner.pending_seek = (offset > 0.0).then_some(PendingSeek {
            offset,
            attempted: false,
        });
        inner.engine = Some(engine);
        inner.session = Some(session.clone());
        inner.last_error = None;
        Ok(session)
    }
}

fn current_position(inner: &Inner, session: &PlaybackSession) -> f64 {
    inner
        .engine
        .as_ref()
        .map_or(session.resume_offset_secs, |e| e.position())
}
