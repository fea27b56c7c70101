//! `PilotApp` fixture over deterministic handlers

use crate::{ControllableTime, MockBackend, MockIdentity, ScriptedAdSdk};
use pilot_app::PilotApp;
use pilot_core::effects::AdBackendEffects;
use pilot_core::{AdPolicy, PilotConfig, Result};
use pilot_effects::{MemoryStorageHandler, SimulatedAdBackend};
use std::sync::Arc;

/// 2024-03-10T12:00:00Z
pub const FIXTURE_START_MS: u64 = 1_710_072_000_000;

/// Builder for [`TestApp`]
#[derive(Debug, Default)]
pub struct TestAppBuilder {
    config: PilotConfig,
    policy: Option<AdPolicy>,
    storage: Option<MemoryStorageHandler>,
    simulated_ads: bool,
}

impl TestAppBuilder {
    /// Default configuration, disabled ad policy, empty storage
    pub fn new() -> Self {
        Self::default()
    }

    /// Policy served by the mock backend
    pub fn with_policy(mut self, policy: AdPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Configuration handed to the app
    pub fn with_config(mut self, config: PilotConfig) -> Self {
        self.config = config;
        self
    }

    /// Back the ad surfaces with [`SimulatedAdBackend`] instead of the
    /// scripted SDK
    pub fn simulated_ads(mut self) -> Self {
        self.simulated_ads = true;
        self
    }

    /// Start from pre-populated storage
    pub fn with_storage(mut self, storage: MemoryStorageHandler) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Assemble the fakes and the app
    pub fn build(self) -> Result<TestApp> {
        let backend = Arc::new(MockBackend::new());
        if let Some(policy) = self.policy {
            backend.set_ad_policy(policy);
        }
        let parts = Parts {
            storage: self.storage.unwrap_or_default(),
            time: ControllableTime::new(FIXTURE_START_MS),
            backend,
            sdk: Arc::new(ScriptedAdSdk::new()),
            identity: Arc::new(MockIdentity::new()),
            config: self.config,
            simulated_ads: self.simulated_ads,
        };
        let app = parts.assemble()?;
        Ok(TestApp {
            app,
            storage: parts.storage,
            time: parts.time,
            backend: parts.backend,
            sdk: parts.sdk,
            identity: parts.identity,
            config: parts.config,
            simulated_ads: parts.simulated_ads,
        })
    }
}

/// A [`PilotApp`] plus handles to every fake it was built from
pub struct TestApp {
    /// The application under test
    pub app: PilotApp,
    /// Device storage (clones share contents)
    pub storage: MemoryStorageHandler,
    /// Clock, starting at [`FIXTURE_START_MS`]
    pub time: ControllableTime,
    /// Backend double
    pub backend: Arc<MockBackend>,
    /// Ad SDK double (unused with `simulated_ads`)
    pub sdk: Arc<ScriptedAdSdk>,
    /// Identity provider double
    pub identity: Arc<MockIdentity>,
    config: PilotConfig,
    simulated_ads: bool,
}

impl TestApp {
    /// Start building a fixture
    pub fn builder() -> TestAppBuilder {
        TestAppBuilder::new()
    }

    /// Simulate a process restart: a fresh `PilotApp` over the same storage,
    /// backend, SDK and clock.
    pub fn restart(&mut self) -> Result<()> {
        let parts = Parts {
            storage: self.storage.clone(),
            time: self.time.clone(),
            backend: self.backend.clone(),
            sdk: self.sdk.clone(),
            identity: self.identity.clone(),
            config: self.config.clone(),
            simulated_ads: self.simulated_ads,
        };
        self.app = parts.assemble()?;
        Ok(())
    }
}

struct Parts {
    storage: MemoryStorageHandler,
    time: ControllableTime,
    backend: Arc<MockBackend>,
    sdk: Arc<ScriptedAdSdk>,
    identity: Arc<MockIdentity>,
    config: PilotConfig,
    simulated_ads: bool,
}

impl Parts {
    fn assemble(&self) -> Result<PilotApp> {
        let ads: Arc<dyn AdBackendEffects> = if self.simulated_ads {
            Arc::new(SimulatedAdBackend::new())
        } else {
            self.sdk.clone()
        };
        PilotApp::builder()
            .with_config(self.config.clone())
            .with_storage(Arc::new(self.storage.clone()))
            .with_time(Arc::new(self.time.clone()))
            .with_backend(self.backend.clone())
            .with_ads(ads)
            .with_identity(self.identity.clone())
            .build()
    }
}
