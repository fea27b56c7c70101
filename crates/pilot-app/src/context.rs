//! Application context
//!
//! [`PilotApp`] owns every component and the effect handlers they share.
//! Hosts build one per process and pass it (or its components) to their UI
//! layer; there is no global instance.

use crate::ads::{AdOrchestrator, AdSettings, AppOpenMoment, AppState};
use crate::config_fetcher::ConfigFetcher;
use crate::cooldown::CooldownCache;
use crate::game_stats::GameStatsStore;
use crate::preferences::Preferences;
use crate::session::{LogoutReport, SessionStore};
use pilot_core::effects::{
    AdBackendEffects, BackendEffects, IdentityEffects, PhysicalTimeEffects, StorageEffects,
};
use pilot_core::{PilotConfig, PilotError, Result, UserRecord};
use pilot_effects::{
    FilesystemStorageHandler, HttpBackendHandler, NoopIdentityHandler, RealTimeHandler,
    SimulatedAdBackend,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Builder for [`PilotApp`]
#[derive(Default)]
pub struct PilotAppBuilder {
    config: PilotConfig,
    storage: Option<Arc<dyn StorageEffects>>,
    time: Option<Arc<dyn PhysicalTimeEffects>>,
    backend: Option<Arc<dyn BackendEffects>>,
    ads: Option<Arc<dyn AdBackendEffects>>,
    identity: Option<Arc<dyn IdentityEffects>>,
}

impl PilotAppBuilder {
    /// Builder with default configuration and no handlers
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `config`
    pub fn with_config(mut self, config: PilotConfig) -> Self {
        self.config = config;
        self
    }

    /// Device storage handler
    pub fn with_storage(mut self, storage: Arc<dyn StorageEffects>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Clock handler
    pub fn with_time(mut self, time: Arc<dyn PhysicalTimeEffects>) -> Self {
        self.time = Some(time);
        self
    }

    /// Backend API handler
    pub fn with_backend(mut self, backend: Arc<dyn BackendEffects>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Ad SDK bridge (or the simulated backend)
    pub fn with_ads(mut self, ads: Arc<dyn AdBackendEffects>) -> Self {
        self.ads = Some(ads);
        self
    }

    /// Identity provider handler
    pub fn with_identity(mut self, identity: Arc<dyn IdentityEffects>) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Fill every handler not set explicitly with its production default:
    /// filesystem storage under `storage_dir`, the system clock, the HTTP
    /// backend, the simulated ad backend and the no-op identity provider.
    pub async fn with_production_defaults(mut self) -> Result<Self> {
        if self.storage.is_none() {
            let storage = FilesystemStorageHandler::open(&self.config.storage_dir).await?;
            self.storage = Some(Arc::new(storage));
        }
        if self.time.is_none() {
            self.time = Some(Arc::new(RealTimeHandler::new()));
        }
        if self.backend.is_none() {
            let backend = HttpBackendHandler::from_config(&self.config)
                .map_err(|e| PilotError::invalid(e.to_string()))?;
            self.backend = Some(Arc::new(backend));
        }
        if self.ads.is_none() {
            self.ads = Some(Arc::new(SimulatedAdBackend::new()));
        }
        if self.identity.is_none() {
            self.identity = Some(Arc::new(NoopIdentityHandler));
        }
        Ok(self)
    }

    /// Assemble the application context
    pub fn build(self) -> Result<PilotApp> {
        fn require<T: ?Sized>(handler: Option<Arc<T>>, name: &str) -> Result<Arc<T>> {
            handler.ok_or_else(|| PilotError::invalid(format!("missing {name} handler")))
        }

        let storage = require(self.storage, "storage")?;
        let time = require(self.time, "time")?;
        let backend = require(self.backend, "backend")?;
        let ads = require(self.ads, "ads")?;
        let identity = require(self.identity, "identity")?;
        let config = self.config;

        let session = Arc::new(SessionStore::new(
            storage.clone(),
            backend.clone(),
            identity,
            config.platform,
            Duration::from_secs(config.sign_in_timeout_secs),
        ));
        let config_fetcher = Arc::new(ConfigFetcher::new(backend.clone(), config.platform));
        let orchestrator = Arc::new(AdOrchestrator::new(
            ads,
            backend.clone(),
            time.clone(),
            session.clone(),
            config_fetcher.clone(),
            AdSettings::from_config(&config),
        ));
        let cooldowns = Arc::new(CooldownCache::new(
            backend,
            time.clone(),
            session.clone(),
            config.cooldown_fresh_window_secs,
        ));
        let game_stats = Arc::new(GameStatsStore::new(
            storage.clone(),
            time,
            cooldowns.clone(),
        ));
        let preferences = Arc::new(Preferences::new(storage));

        Ok(PilotApp {
            config,
            session,
            config_fetcher,
            ads: orchestrator,
            cooldowns,
            game_stats,
            preferences,
        })
    }
}

/// The client core: every component behind one explicit context
pub struct PilotApp {
    config: PilotConfig,
    session: Arc<SessionStore>,
    config_fetcher: Arc<ConfigFetcher>,
    ads: Arc<AdOrchestrator>,
    cooldowns: Arc<CooldownCache>,
    game_stats: Arc<GameStatsStore>,
    preferences: Arc<Preferences>,
}

impl PilotApp {
    /// Start building an application context
    pub fn builder() -> PilotAppBuilder {
        PilotAppBuilder::new()
    }

    /// Configuration in use
    pub fn config(&self) -> &PilotConfig {
        &self.config
    }

    /// Session/auth store
    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    /// Ad policy fetcher
    pub fn config_fetcher(&self) -> &Arc<ConfigFetcher> {
        &self.config_fetcher
    }

    /// Ad orchestrator
    pub fn ads(&self) -> &Arc<AdOrchestrator> {
        &self.ads
    }

    /// Game cooldown cache
    pub fn cooldowns(&self) -> &Arc<CooldownCache> {
        &self.cooldowns
    }

    /// Local game statistics
    pub fn game_stats(&self) -> &Arc<GameStatsStore> {
        &self.game_stats
    }

    /// User preferences
    pub fn preferences(&self) -> &Arc<Preferences> {
        &self.preferences
    }

    /// App start after the splash screen: restore the session, initialise
    /// ads and, for a restored session, request the app-open ad.
    ///
    /// Returns whether a session was restored.
    pub async fn start(&self) -> bool {
        let authenticated = self.session.bootstrap().await;
        self.ads.initialize().await;
        if authenticated {
            self.ads
                .request_app_open_ad(AppOpenMoment::AfterSplashAuthenticated)
                .await;
        }
        info!(authenticated, "client core started");
        authenticated
    }

    /// Email/password sign-in followed by the post-sign-in app-open ad
    pub async fn login(&self, email: &str, password: &str) -> Result<UserRecord> {
        let user = self.session.login(email, password).await?;
        self.ads
            .request_app_open_ad(AppOpenMoment::AfterSignIn)
            .await;
        Ok(user)
    }

    /// Google sign-in followed by the post-sign-in app-open ad
    pub async fn sign_in_with_google(&self, id_token: &str) -> Result<UserRecord> {
        let user = self.session.sign_in_with_google(id_token).await?;
        self.ads
            .request_app_open_ad(AppOpenMoment::AfterSignIn)
            .await;
        Ok(user)
    }

    /// Sign out and drop the signed-in user's local game statistics
    pub async fn logout(&self) -> LogoutReport {
        let report = self.session.logout().await;
        if let Err(err) = self.game_stats.clear().await {
            warn!(error = %err, "failed to clear local game stats");
        }
        report
    }

    /// Forward host visibility changes
    pub async fn on_app_state_changed(&self, state: AppState) {
        self.ads.on_app_state_changed(state).await;
    }
}
