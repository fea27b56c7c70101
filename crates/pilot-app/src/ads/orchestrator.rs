//! Ad orchestrator
//!
//! Decides whether and when each surface loads and shows, keeps every
//! enabled surface preloaded, enforces interstitial sampling and the
//! rewarded daily quota, and gates the app-open ad.
//!
//! SDK results are converted into [`AdEvent`]s and applied through
//! [`transition`]. The state lock is only held for those synchronous steps,
//! never across an SDK, backend or clock call.

use super::quota::RewardedQuota;
use super::state::{transition, AdCommand, AdEvent, AdUnitState, TransitionContext};
use crate::config_fetcher::ConfigFetcher;
use crate::session::SessionStore;
use futures::future::join_all;
use parking_lot::Mutex;
use pilot_core::effects::{AdBackendEffects, AdBackendKind, BackendEffects, PhysicalTimeEffects};
use pilot_core::{
    AdHandle, AdLoadRequest, AdPolicy, AdRequestOptions, AdSurface, CalendarDay, GeoLocation,
    PhysicalTime, PilotConfig, Platform, RewardedCompletion,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Settings the orchestrator takes from configuration
#[derive(Debug, Clone, PartialEq)]
pub struct AdSettings {
    /// Platform for test ids and config fetches
    pub platform: Platform,
    /// Serve sample units regardless of policy
    pub force_test_ads: bool,
    /// Fixed location attached to every request
    pub location: Option<GeoLocation>,
    /// Request non-personalised ads
    pub non_personalized: bool,
    /// Backoff after an app-open load failure, also used once interstitial
    /// and rewarded run out of immediate reloads
    pub app_open_retry_delay_ms: u64,
    /// Wait before the simulated backend grants a reward
    pub simulated_reward_delay_ms: u64,
    /// Daily cap used when the policy carries none
    pub default_max_rewarded_per_day: u32,
    /// UTC offset of the quota's calendar day
    pub quota_utc_offset_minutes: i32,
}

impl Default for AdSettings {
    fn default() -> Self {
        Self::from_config(&PilotConfig::default())
    }
}

impl AdSettings {
    /// Settings from the loaded configuration
    pub fn from_config(config: &PilotConfig) -> Self {
        Self {
            platform: config.platform,
            force_test_ads: config.force_test_ads,
            location: config.ad_location,
            non_personalized: false,
            app_open_retry_delay_ms: config.app_open_retry_delay_ms,
            simulated_reward_delay_ms: config.simulated_reward_delay_ms,
            default_max_rewarded_per_day: config.default_max_rewarded_per_day,
            quota_utc_offset_minutes: config.quota_utc_offset_minutes,
        }
    }
}

/// The two moments at which an app-open ad may be requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AppOpenMoment {
    /// Splash finished and a persisted session was restored
    AfterSplashAuthenticated,
    /// The user just signed in
    AfterSignIn,
}

/// Host application visibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AppState {
    /// In the foreground
    Active,
    /// In the background (or inactive)
    Background,
}

#[derive(Debug, Default)]
struct AppOpenGate {
    /// Shown (or on screen) during this activation
    shown: bool,
    /// Requested before it finished loading
    pending: bool,
}

#[derive(Debug)]
struct OrchestratorState {
    initialized: bool,
    foreground: bool,
    units: BTreeMap<AdSurface, AdUnitState>,
    quota: RewardedQuota,
    app_open: AppOpenGate,
}

impl Default for OrchestratorState {
    fn default() -> Self {
        Self {
            initialized: false,
            foreground: true,
            units: AdSurface::ALL
                .iter()
                .map(|surface| (*surface, AdUnitState::default()))
                .collect(),
            quota: RewardedQuota::default(),
            app_open: AppOpenGate::default(),
        }
    }
}

impl OrchestratorState {
    fn unit_mut(&mut self, surface: AdSurface) -> &mut AdUnitState {
        self.units.entry(surface).or_default()
    }
}

enum AppOpenDecision {
    Show(AdHandle),
    Load,
    Wait,
    Refuse,
}

/// Ad orchestrator for the four surfaces
pub struct AdOrchestrator {
    ads: Arc<dyn AdBackendEffects>,
    backend: Arc<dyn BackendEffects>,
    time: Arc<dyn PhysicalTimeEffects>,
    session: Arc<SessionStore>,
    config: Arc<ConfigFetcher>,
    settings: AdSettings,
    state: Mutex<OrchestratorState>,
}

impl AdOrchestrator {
    /// Orchestrator over the given handlers
    pub fn new(
        ads: Arc<dyn AdBackendEffects>,
        backend: Arc<dyn BackendEffects>,
        time: Arc<dyn PhysicalTimeEffects>,
        session: Arc<SessionStore>,
        config: Arc<ConfigFetcher>,
        settings: AdSettings,
    ) -> Self {
        Self {
            ads,
            backend,
            time,
            session,
            config,
            settings,
            state: Mutex::new(OrchestratorState::default()),
        }
    }

    /// The SDK-unavailable fallback is active
    pub fn is_simulated(&self) -> bool {
        self.ads.kind() == AdBackendKind::Simulated
    }

    /// [`initialize`](Self::initialize) has completed
    pub fn is_initialized(&self) -> bool {
        self.state.lock().initialized
    }

    /// Snapshot of one surface
    pub fn unit_state(&self, surface: AdSurface) -> AdUnitState {
        self.state.lock().unit_mut(surface).clone()
    }

    /// Current ad policy
    pub fn policy(&self) -> AdPolicy {
        self.config.current()
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Initialise the SDK, fetch the policy and preload enabled surfaces.
    ///
    /// No-op when already initialised or when the simulated backend is in
    /// use. SDK failures are logged and leave the orchestrator uninitialised
    /// so a later call can retry.
    pub async fn initialize(&self) {
        {
            let mut state = self.state.lock();
            if state.initialized {
                return;
            }
            state.initialized = true;
        }

        if self.is_simulated() {
            info!("ad SDK unavailable, using simulated ad backend");
            return;
        }

        if let Err(err) = self.ads.initialize().await {
            warn!(error = %err, "ad SDK initialisation failed");
            self.state.lock().initialized = false;
            return;
        }
        info!("ad SDK initialised");
        self.refresh_and_reload().await;
    }

    /// Host visibility changed. Returning to the foreground refetches the
    /// policy and reloads every enabled surface.
    pub async fn on_app_state_changed(&self, app_state: AppState) {
        let became_active = {
            let mut state = self.state.lock();
            let was_foreground = state.foreground;
            state.foreground = app_state == AppState::Active;
            if !state.foreground {
                // App-open is never shown on resume.
                state.app_open.pending = false;
            }
            !was_foreground && state.foreground && state.initialized
        };
        debug!(?app_state, "app state changed");
        if became_active && !self.is_simulated() {
            self.refresh_and_reload().await;
        }
    }

    async fn refresh_and_reload(&self) {
        let bearer = self.session.token();
        let policy = self.config.refresh(bearer.as_deref()).await;
        let ctx = self.transition_context().await;

        let to_load: Vec<AdSurface> = {
            let mut state = self.state.lock();
            AdSurface::ALL
                .iter()
                .copied()
                .filter(|surface| {
                    let unit = state.unit_mut(*surface);
                    if !policy.surface_enabled(*surface) {
                        let _ = transition(*surface, unit, AdEvent::Disabled, ctx);
                        return false;
                    }
                    // Banner views load themselves in the host.
                    *surface != AdSurface::Banner && unit.load_allowed(ctx.now_ms)
                })
                .collect()
        };

        join_all(to_load.into_iter().map(|surface| self.load_surface(surface))).await;
    }

    /// Run reloads whose deadline has passed. Returns how many were issued.
    pub async fn process_due_retries(&self) -> usize {
        let now = self.now().await;
        let policy = self.config.current();
        let due: Vec<AdSurface> = {
            let state = self.state.lock();
            state
                .units
                .iter()
                .filter(|(surface, unit)| {
                    unit.retry_due(now.ts_ms) && policy.surface_enabled(**surface)
                })
                .map(|(surface, _)| *surface)
                .collect()
        };
        let issued = due.len();
        join_all(due.into_iter().map(|surface| self.load_surface(surface))).await;
        issued
    }

    /// Execute due reloads every `interval_ms` until `shutdown` flips to true
    /// or its sender is dropped.
    pub async fn run_retry_loop(&self, interval_ms: u64, mut shutdown: watch::Receiver<bool>) {
        debug!(interval_ms, "ad retry loop started");
        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = self.time.sleep_ms(interval_ms) => {
                    let issued = self.process_due_retries().await;
                    if issued > 0 {
                        debug!(issued, "due ad reloads issued");
                    }
                }
            }
            tokio::task::yield_now().await;
        }
        debug!("ad retry loop stopped");
    }

    // ------------------------------------------------------------------
    // Loading
    // ------------------------------------------------------------------

    /// Load `surface`, reloading inline while the state machine asks for an
    /// immediate reload.
    async fn load_surface(&self, surface: AdSurface) {
        loop {
            let ctx = self.transition_context().await;
            if self.apply(surface, AdEvent::LoadRequested, ctx).is_err() {
                return;
            }

            let request = AdLoadRequest {
                surface,
                unit_id: self.ad_unit_id(surface),
                options: self.request_options(),
            };
            debug!(%surface, unit_id = %request.unit_id, "loading ad");

            let event = match self.ads.load(&request).await {
                Ok(handle) => AdEvent::Loaded(handle),
                Err(err) => {
                    debug!(%surface, error = %err, "ad load failed");
                    AdEvent::LoadFailed {
                        reason: err.to_string(),
                    }
                }
            };
            let loaded = matches!(event, AdEvent::Loaded(_));
            let ctx = self.transition_context().await;
            let Ok(command) = self.apply(surface, event, ctx) else {
                return;
            };

            if loaded && surface == AdSurface::AppOpen {
                self.show_pending_app_open(ctx).await;
            }

            match command {
                Some(AdCommand::ReloadNow) => {
                    debug!(%surface, "reloading ad");
                }
                Some(AdCommand::ReloadAt(at)) => {
                    debug!(%surface, retry_at_ms = at, "reload scheduled");
                    return;
                }
                None => return,
            }
        }
    }

    async fn show_pending_app_open(&self, ctx: TransitionContext) {
        let handle = {
            let mut state = self.state.lock();
            if state.app_open.pending && state.foreground && !state.app_open.shown {
                state.app_open.pending = false;
                self.begin_app_open_show(&mut state, ctx)
            } else {
                None
            }
        };
        if let Some(handle) = handle {
            debug!("showing pending app-open ad");
            self.present_app_open(handle).await;
        }
    }

    fn apply(
        &self,
        surface: AdSurface,
        event: AdEvent,
        ctx: TransitionContext,
    ) -> Result<Option<AdCommand>, ()> {
        let mut state = self.state.lock();
        transition(surface, state.unit_mut(surface), event, ctx).map_err(|err| {
            debug!(error = %err, "ad event ignored");
        })
    }

    /// Follow up a show. Only interstitial and rewarded shows end in
    /// `ReloadNow`; app-open shows go through [`Self::present_app_open`].
    async fn execute(&self, surface: AdSurface, command: Option<AdCommand>) {
        match command {
            Some(AdCommand::ReloadNow) => self.load_surface(surface).await,
            Some(AdCommand::ReloadAt(at)) => debug!(%surface, retry_at_ms = at, "reload scheduled"),
            None => {}
        }
    }

    fn request_options(&self) -> AdRequestOptions {
        AdRequestOptions {
            location: self.settings.location,
            non_personalized: self.settings.non_personalized,
        }
    }

    async fn now(&self) -> PhysicalTime {
        self.time.now_or_epoch().await
    }

    async fn transition_context(&self) -> TransitionContext {
        TransitionContext {
            now_ms: self.now().await.ts_ms,
            retry_delay_ms: self.settings.app_open_retry_delay_ms,
        }
    }

    // ------------------------------------------------------------------
    // Unit ids and banner
    // ------------------------------------------------------------------

    /// Unit id for `surface`, with test-id substitution applied
    pub fn ad_unit_id(&self, surface: AdSurface) -> String {
        self.config
            .current()
            .resolve_unit_id(surface, self.settings.platform, self.settings.force_test_ads)
    }

    /// Banner unit id
    pub fn banner_ad_id(&self) -> String {
        self.ad_unit_id(AdSurface::Banner)
    }

    /// Interstitial unit id
    pub fn interstitial_ad_id(&self) -> String {
        self.ad_unit_id(AdSurface::Interstitial)
    }

    /// Rewarded unit id
    pub fn rewarded_ad_id(&self) -> String {
        self.ad_unit_id(AdSurface::Rewarded)
    }

    /// App-open unit id
    pub fn app_open_ad_id(&self) -> String {
        self.ad_unit_id(AdSurface::AppOpen)
    }

    /// The host should render its banner view
    pub fn should_show_banner(&self) -> bool {
        !self.is_simulated()
            && self.is_initialized()
            && self.config.current().surface_enabled(AdSurface::Banner)
    }

    /// Feed a lifecycle event from the host banner view. Returns whether
    /// the event was valid in the banner's current phase.
    pub async fn record_banner_event(&self, event: AdEvent) -> bool {
        let ctx = self.transition_context().await;
        self.apply(AdSurface::Banner, event, ctx).is_ok()
    }

    // ------------------------------------------------------------------
    // Interstitial
    // ------------------------------------------------------------------

    /// Show an interstitial if one is loaded and this request is sampled.
    ///
    /// Returns `false` when no ad was shown; callers proceed either way.
    pub async fn show_interstitial(&self) -> bool {
        if self.is_simulated() {
            return false;
        }
        let policy = self.config.current();
        if !policy.surface_enabled(AdSurface::Interstitial) {
            return false;
        }
        let frequency = u64::from(policy.effective_interstitial_frequency());
        let ctx = self.transition_context().await;

        let handle = {
            let mut state = self.state.lock();
            let unit = state.unit_mut(AdSurface::Interstitial);
            if !unit.loaded() {
                return false;
            }
            unit.shown_count = unit.shown_count.saturating_add(1);
            if unit.shown_count % frequency != 0 {
                debug!(
                    shown_count = unit.shown_count,
                    frequency, "interstitial skipped by sampling"
                );
                return false;
            }
            let Some(handle) = unit.handle else {
                return false;
            };
            if transition(AdSurface::Interstitial, unit, AdEvent::ShowStarted, ctx).is_err() {
                return false;
            }
            handle
        };

        let (event, shown) = match self.ads.show(AdSurface::Interstitial, handle).await {
            Ok(_) => (AdEvent::Dismissed, true),
            Err(err) => {
                debug!(error = %err, "interstitial show failed");
                (
                    AdEvent::ShowFailed {
                        reason: err.to_string(),
                    },
                    false,
                )
            }
        };
        let ctx = self.transition_context().await;
        if let Ok(command) = self.apply(AdSurface::Interstitial, event, ctx) {
            self.execute(AdSurface::Interstitial, command).await;
        }
        shown
    }

    // ------------------------------------------------------------------
    // Rewarded
    // ------------------------------------------------------------------

    fn max_rewarded_per_day(&self, policy: &AdPolicy) -> u32 {
        if policy.max_rewarded_per_day > 0 {
            policy.max_rewarded_per_day
        } else {
            self.settings.default_max_rewarded_per_day
        }
    }

    fn today(&self, now: PhysicalTime) -> CalendarDay {
        now.calendar_day(self.settings.quota_utc_offset_minutes)
    }

    /// Rewarded ads still available today
    pub async fn rewarded_remaining_today(&self) -> u32 {
        let today = self.today(self.now().await);
        let max = self.max_rewarded_per_day(&self.config.current());
        let mut state = self.state.lock();
        state.quota.roll_over(today);
        max.saturating_sub(state.quota.watched_today)
    }

    /// Show a rewarded ad and grant the reward.
    ///
    /// `on_rewarded` runs only when the reward was earned. Returns `false`
    /// when the surface is disabled or unloaded, the daily quota is used up,
    /// or the user closed the ad early.
    pub async fn show_rewarded<F>(&self, on_rewarded: F) -> bool
    where
        F: FnOnce() + Send,
    {
        if self.is_simulated() {
            return self.show_rewarded_simulated(on_rewarded).await;
        }

        let policy = self.config.current();
        if !policy.surface_enabled(AdSurface::Rewarded) {
            return false;
        }
        let max = self.max_rewarded_per_day(&policy);
        let now = self.now().await;
        let today = self.today(now);
        let ctx = self.transition_context().await;

        let handle = {
            let mut state = self.state.lock();
            state.quota.roll_over(today);
            if !state.quota.has_remaining(today, max) {
                debug!(max, "rewarded quota exhausted");
                return false;
            }
            let unit = state.unit_mut(AdSurface::Rewarded);
            let Some(handle) = unit.handle.filter(|_| unit.loaded()) else {
                return false;
            };
            if transition(AdSurface::Rewarded, unit, AdEvent::ShowStarted, ctx).is_err() {
                return false;
            }
            handle
        };

        let (event, earned) = match self.ads.show(AdSurface::Rewarded, handle).await {
            Ok(outcome) => (AdEvent::Dismissed, outcome.reward_earned),
            Err(err) => {
                debug!(error = %err, "rewarded show failed");
                (
                    AdEvent::ShowFailed {
                        reason: err.to_string(),
                    },
                    false,
                )
            }
        };
        let ctx = self.transition_context().await;
        let command = self.apply(AdSurface::Rewarded, event, ctx).ok().flatten();

        if earned {
            self.state.lock().quota.record(today);
            self.report_rewarded_completion(false).await;
            on_rewarded();
            info!("rewarded ad completed");
        }

        self.execute(AdSurface::Rewarded, command).await;
        earned
    }

    async fn show_rewarded_simulated<F>(&self, on_rewarded: F) -> bool
    where
        F: FnOnce() + Send,
    {
        let max = self.max_rewarded_per_day(&self.config.current());
        let today = self.today(self.now().await);
        {
            let mut state = self.state.lock();
            state.quota.roll_over(today);
            if !state.quota.has_remaining(today, max) {
                debug!(max, "rewarded quota exhausted");
                return false;
            }
        }

        debug!(
            delay_ms = self.settings.simulated_reward_delay_ms,
            "simulating rewarded ad"
        );
        if let Err(err) = self
            .time
            .sleep_ms(self.settings.simulated_reward_delay_ms)
            .await
        {
            warn!(error = %err, "simulated rewarded delay interrupted");
        }

        // The day may have rolled, or another call consumed the last slot.
        let today = self.today(self.now().await);
        {
            let mut state = self.state.lock();
            if !state.quota.has_remaining(today, max) {
                return false;
            }
            state.quota.record(today);
        }

        self.report_rewarded_completion(true).await;
        on_rewarded();
        info!("simulated rewarded ad completed");
        true
    }

    async fn report_rewarded_completion(&self, simulated: bool) {
        let Some(bearer) = self.session.token() else {
            debug!("not signed in, skipping rewarded completion report");
            return;
        };
        let completion = RewardedCompletion {
            ad_unit_id: self.rewarded_ad_id(),
            platform: self.settings.platform,
            simulated,
        };
        let result = self
            .backend
            .report_rewarded_completion(&bearer, &completion)
            .await;
        if let Err(err) = self.session.intercept(result).await {
            warn!(error = %err, "rewarded completion report failed");
        }
    }

    // ------------------------------------------------------------------
    // App-open
    // ------------------------------------------------------------------

    /// Request the app-open ad at one of the allowed moments.
    pub async fn request_app_open_ad(&self, moment: AppOpenMoment) -> bool {
        debug!(?moment, "app-open ad requested");
        if self.is_simulated() || !self.config.current().surface_enabled(AdSurface::AppOpen) {
            return false;
        }
        self.try_show_app_open_ad().await
    }

    /// Show the app-open ad now if loaded, otherwise mark it pending so it
    /// shows as soon as it loads (while still in the foreground).
    ///
    /// Returns whether the ad was shown during this call.
    pub async fn try_show_app_open_ad(&self) -> bool {
        let ctx = self.transition_context().await;
        let decision = {
            let mut state = self.state.lock();
            if state.app_open.shown || !state.foreground {
                AppOpenDecision::Refuse
            } else if state.unit_mut(AdSurface::AppOpen).loaded() {
                match self.begin_app_open_show(&mut state, ctx) {
                    Some(handle) => AppOpenDecision::Show(handle),
                    None => AppOpenDecision::Refuse,
                }
            } else {
                state.app_open.pending = true;
                let unit = state.unit_mut(AdSurface::AppOpen);
                if unit.load_allowed(ctx.now_ms) {
                    AppOpenDecision::Load
                } else {
                    AppOpenDecision::Wait
                }
            }
        };

        match decision {
            AppOpenDecision::Show(handle) => self.present_app_open(handle).await,
            AppOpenDecision::Load => {
                self.load_surface(AdSurface::AppOpen).await;
                self.state.lock().app_open.shown
            }
            AppOpenDecision::Wait => {
                debug!("app-open ad pending until loaded");
                false
            }
            AppOpenDecision::Refuse => false,
        }
    }

    /// Whether the app-open ad was shown during this activation
    pub fn app_open_shown(&self) -> bool {
        self.state.lock().app_open.shown
    }

    fn begin_app_open_show(
        &self,
        state: &mut OrchestratorState,
        ctx: TransitionContext,
    ) -> Option<AdHandle> {
        let unit = state.unit_mut(AdSurface::AppOpen);
        let handle = unit.handle?;
        transition(AdSurface::AppOpen, unit, AdEvent::ShowStarted, ctx).ok()?;
        state.app_open.shown = true;
        state.app_open.pending = false;
        Some(handle)
    }

    async fn present_app_open(&self, handle: AdHandle) -> bool {
        let result = self.ads.show(AdSurface::AppOpen, handle).await;
        let shown = result.is_ok();
        let event = match result {
            Ok(_) => AdEvent::Dismissed,
            Err(err) => {
                debug!(error = %err, "app-open show failed");
                self.state.lock().app_open.shown = false;
                AdEvent::ShowFailed {
                    reason: err.to_string(),
                }
            }
        };
        let ctx = self.transition_context().await;
        // App-open is never reloaded inline after a show.
        if let Ok(Some(AdCommand::ReloadAt(at))) = self.apply(AdSurface::AppOpen, event, ctx) {
            debug!(retry_at_ms = at, "app-open reload scheduled");
        }
        shown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ads::state::{AdPhase, IMMEDIATE_RELOAD_LIMIT};
    use pilot_core::effects::{IdentityEffects, StorageEffects};
    use pilot_effects::{MemoryStorageHandler, SimulatedAdBackend};
    use pilot_testkit::{ControllableTime, MockBackend, MockIdentity, ScriptedAdSdk};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    const START_MS: u64 = 1_710_072_000_000; // 2024-03-10T12:00:00Z

    struct Fixture {
        orchestrator: AdOrchestrator,
        sdk: Arc<ScriptedAdSdk>,
        backend: Arc<MockBackend>,
        time: ControllableTime,
    }

    fn fixture_with(ads: Arc<dyn AdBackendEffects>, sdk: Arc<ScriptedAdSdk>, policy: AdPolicy) -> Fixture {
        let backend = Arc::new(MockBackend::new());
        backend.set_ad_policy(policy);
        let time = ControllableTime::new(START_MS);
        let storage: Arc<dyn StorageEffects> = Arc::new(MemoryStorageHandler::new());
        let identity: Arc<dyn IdentityEffects> = Arc::new(MockIdentity::new());
        let session = Arc::new(SessionStore::new(
            storage,
            backend.clone(),
            identity,
            Platform::Android,
            Duration::from_secs(30),
        ));
        let config = Arc::new(ConfigFetcher::new(backend.clone(), Platform::Android));
        let orchestrator = AdOrchestrator::new(
            ads,
            backend.clone(),
            Arc::new(time.clone()),
            session,
            config,
            AdSettings::default(),
        );
        Fixture {
            orchestrator,
            sdk,
            backend,
            time,
        }
    }

    fn fixture(policy: AdPolicy) -> Fixture {
        let sdk = Arc::new(ScriptedAdSdk::new());
        fixture_with(sdk.clone(), sdk, policy)
    }

    fn all_enabled() -> AdPolicy {
        AdPolicy {
            is_enabled: true,
            test_mode: false,
            show_banner: true,
            show_interstitial: true,
            show_rewarded: true,
            show_app_open: true,
            max_rewarded_per_day: 2,
            ..AdPolicy::default()
        }
    }

    #[tokio::test]
    async fn initialize_preloads_enabled_surfaces_only() {
        let f = fixture(AdPolicy {
            show_app_open: false,
            ..all_enabled()
        });
        f.orchestrator.initialize().await;
        f.orchestrator.initialize().await;

        assert_eq!(f.sdk.initialize_calls(), 1);
        assert!(f.orchestrator.unit_state(AdSurface::Interstitial).loaded());
        assert!(f.orchestrator.unit_state(AdSurface::Rewarded).loaded());
        assert!(!f.orchestrator.unit_state(AdSurface::AppOpen).loaded());
        // Banner loads in the host view.
        assert_eq!(f.sdk.load_count(AdSurface::Banner), 0);
        assert!(f.orchestrator.should_show_banner());
    }

    #[tokio::test]
    async fn simulated_initialize_is_a_no_op() {
        let sdk = Arc::new(ScriptedAdSdk::new());
        let f = fixture_with(Arc::new(SimulatedAdBackend::new()), sdk, all_enabled());
        f.orchestrator.initialize().await;
        assert!(f.orchestrator.is_initialized());
        assert_eq!(f.backend.calls().fetch_ad_policy, 0);
        assert!(!f.orchestrator.show_interstitial().await);
        assert!(!f.orchestrator.should_show_banner());
    }

    #[tokio::test]
    async fn rewarded_quota_blocks_third_view() {
        let f = fixture(all_enabled());
        f.orchestrator.initialize().await;
        let granted = Arc::new(AtomicU32::new(0));

        for _ in 0..3 {
            let counter = granted.clone();
            f.orchestrator
                .show_rewarded(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                })
                .await;
        }
        assert_eq!(granted.load(Ordering::SeqCst), 2);
        assert_eq!(f.backend.calls().report_rewarded_completion, 0);
        assert_eq!(f.orchestrator.rewarded_remaining_today().await, 0);

        f.time.advance_ms(24 * 60 * 60 * 1000);
        assert_eq!(f.orchestrator.rewarded_remaining_today().await, 2);
    }

    #[tokio::test]
    async fn rewarded_closed_early_grants_nothing() {
        let f = fixture(all_enabled());
        f.orchestrator.initialize().await;
        f.sdk.script_show(AdSurface::Rewarded, Ok(pilot_core::ShowOutcome { reward_earned: false }));

        let granted = Arc::new(AtomicU32::new(0));
        let counter = granted.clone();
        let shown = f
            .orchestrator
            .show_rewarded(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .await;
        assert!(!shown);
        assert_eq!(granted.load(Ordering::SeqCst), 0);
        assert_eq!(f.orchestrator.rewarded_remaining_today().await, 2);
        // Reloaded for the next attempt.
        assert!(f.orchestrator.unit_state(AdSurface::Rewarded).loaded());
    }

    #[tokio::test]
    async fn simulated_rewarded_waits_then_grants_within_quota() {
        let sdk = Arc::new(ScriptedAdSdk::new());
        let f = fixture_with(Arc::new(SimulatedAdBackend::new()), sdk, all_enabled());
        f.orchestrator.initialize().await;

        let granted = Arc::new(AtomicU32::new(0));
        let mut results = Vec::new();
        for _ in 0..(AdSettings::default().default_max_rewarded_per_day + 1) {
            let counter = granted.clone();
            results.push(
                f.orchestrator
                    .show_rewarded(move || {
                        counter.fetch_add(1, Ordering::SeqCst);
                    })
                    .await,
            );
        }
        let max = AdSettings::default().default_max_rewarded_per_day;
        assert_eq!(granted.load(Ordering::SeqCst), max);
        assert_eq!(results.last(), Some(&false));
        assert!(f.time.now_ms() >= START_MS + u64::from(max) * 3_000);
    }

    #[tokio::test]
    async fn interstitial_load_failure_reloads_immediately() {
        let f = fixture(all_enabled());
        f.sdk.fail_next_loads(AdSurface::Interstitial, 1);
        f.orchestrator.initialize().await;

        let state = f.orchestrator.unit_state(AdSurface::Interstitial);
        assert!(state.loaded());
        assert_eq!(state.retry_at_ms, None);
        assert_eq!(f.sdk.load_count(AdSurface::Interstitial), 2);
        assert_eq!(f.orchestrator.process_due_retries().await, 0);
    }

    #[tokio::test]
    async fn repeated_rewarded_failures_fall_back_to_deadline() {
        let f = fixture(all_enabled());
        f.sdk
            .fail_next_loads(AdSurface::Rewarded, IMMEDIATE_RELOAD_LIMIT + 1);
        f.orchestrator.initialize().await;

        let state = f.orchestrator.unit_state(AdSurface::Rewarded);
        assert_eq!(state.phase, AdPhase::Unloaded);
        assert_eq!(state.retry_at_ms, Some(START_MS + 10_000));
        assert_eq!(
            f.sdk.load_count(AdSurface::Rewarded),
            IMMEDIATE_RELOAD_LIMIT as usize + 1
        );

        f.time.advance_ms(10_000);
        assert_eq!(f.orchestrator.process_due_retries().await, 1);
        assert!(f.orchestrator.unit_state(AdSurface::Rewarded).loaded());
    }

    #[tokio::test]
    async fn app_open_failure_backs_off_ten_seconds() {
        let f = fixture(all_enabled());
        f.sdk.fail_next_loads(AdSurface::AppOpen, 1);
        f.orchestrator.initialize().await;
        assert_eq!(
            f.orchestrator.unit_state(AdSurface::AppOpen).retry_at_ms,
            Some(START_MS + 10_000)
        );

        f.time.advance_ms(9_999);
        assert_eq!(f.orchestrator.process_due_retries().await, 0);
        f.time.advance_ms(1);
        assert_eq!(f.orchestrator.process_due_retries().await, 1);
        assert!(f.orchestrator.unit_state(AdSurface::AppOpen).loaded());
    }

    #[tokio::test]
    async fn app_open_shows_once_per_activation() {
        let f = fixture(all_enabled());
        f.orchestrator.initialize().await;

        assert!(
            f.orchestrator
                .request_app_open_ad(AppOpenMoment::AfterSplashAuthenticated)
                .await
        );
        assert!(!f.orchestrator.request_app_open_ad(AppOpenMoment::AfterSignIn).await);
        assert_eq!(f.sdk.show_count(AdSurface::AppOpen), 1);
    }

    #[tokio::test]
    async fn pending_app_open_shows_when_load_completes() {
        let f = fixture(all_enabled());
        f.sdk.fail_next_loads(AdSurface::AppOpen, 1);
        f.orchestrator.initialize().await;

        assert!(!f.orchestrator.request_app_open_ad(AppOpenMoment::AfterSignIn).await);
        assert!(!f.orchestrator.app_open_shown());

        f.time.advance_ms(10_000);
        f.orchestrator.process_due_retries().await;
        assert!(f.orchestrator.app_open_shown());
        assert_eq!(f.sdk.show_count(AdSurface::AppOpen), 1);
    }

    #[tokio::test]
    async fn pending_app_open_is_dropped_in_background() {
        let f = fixture(all_enabled());
        f.sdk.fail_next_loads(AdSurface::AppOpen, 1);
        f.orchestrator.initialize().await;
        f.orchestrator.request_app_open_ad(AppOpenMoment::AfterSignIn).await;

        f.orchestrator.on_app_state_changed(AppState::Background).await;
        f.time.advance_ms(10_000);
        f.orchestrator.process_due_retries().await;
        assert!(!f.orchestrator.app_open_shown());
        assert_eq!(f.sdk.show_count(AdSurface::AppOpen), 0);
    }

    #[tokio::test]
    async fn foreground_refetches_policy_and_disables_surfaces() {
        let f = fixture(all_enabled());
        f.orchestrator.initialize().await;
        assert_eq!(f.backend.calls().fetch_ad_policy, 1);

        f.backend.set_ad_policy(AdPolicy {
            show_interstitial: false,
            ..all_enabled()
        });
        f.orchestrator.on_app_state_changed(AppState::Background).await;
        f.orchestrator.on_app_state_changed(AppState::Active).await;

        assert_eq!(f.backend.calls().fetch_ad_policy, 2);
        assert_eq!(
            f.orchestrator.unit_state(AdSurface::Interstitial).phase,
            AdPhase::Unloaded
        );
        assert!(!f.orchestrator.show_interstitial().await);
    }

    #[tokio::test]
    async fn foreground_waits_out_app_open_backoff() {
        let f = fixture(all_enabled());
        f.sdk.fail_next_loads(AdSurface::AppOpen, 1);
        f.orchestrator.initialize().await;

        f.time.advance_ms(1_000);
        f.orchestrator.on_app_state_changed(AppState::Background).await;
        f.orchestrator.on_app_state_changed(AppState::Active).await;
        assert_eq!(f.sdk.load_count(AdSurface::AppOpen), 1);

        f.time.advance_ms(9_000);
        f.orchestrator.on_app_state_changed(AppState::Background).await;
        f.orchestrator.on_app_state_changed(AppState::Active).await;
        assert_eq!(f.sdk.load_count(AdSurface::AppOpen), 2);
        assert!(f.orchestrator.unit_state(AdSurface::AppOpen).loaded());
    }

    #[tokio::test]
    async fn banner_events_follow_the_state_machine() {
        let f = fixture(all_enabled());
        f.orchestrator.initialize().await;
        assert!(f.orchestrator.record_banner_event(AdEvent::LoadRequested).await);
        assert!(!f.orchestrator.record_banner_event(AdEvent::LoadRequested).await);
        assert!(f.orchestrator.record_banner_event(AdEvent::Loaded(AdHandle(9))).await);
        assert!(f.orchestrator.unit_state(AdSurface::Banner).loaded());
    }

    #[tokio::test]
    async fn retry_loop_stops_on_shutdown() {
        let f = fixture(all_enabled());
        f.sdk
            .fail_next_loads(AdSurface::Rewarded, IMMEDIATE_RELOAD_LIMIT + 1);
        f.orchestrator.initialize().await;
        assert!(!f.orchestrator.unit_state(AdSurface::Rewarded).loaded());

        let (tx, rx) = watch::channel(false);
        let orchestrator = &f.orchestrator;
        let stopper = async {
            while !orchestrator.unit_state(AdSurface::Rewarded).loaded() {
                tokio::task::yield_now().await;
            }
            let _ = tx.send(true);
        };
        tokio::join!(orchestrator.run_retry_loop(1_000, rx), stopper);
        assert!(orchestrator.unit_state(AdSurface::Rewarded).loaded());
    }
}
