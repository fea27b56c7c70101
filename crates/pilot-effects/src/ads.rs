//! Simulated ad backend
//!
//! Selected at startup when no native ad SDK is linked (desktop hosts,
//! development builds). It never loads or shows anything; the orchestrator
//! recognises [`AdBackendKind::Simulated`] and takes its explicit fallback
//! path (rewarded ads are granted after a delay, everything else is a no-op).

use async_trait::async_trait;
use pilot_core::effects::{AdBackendEffects, AdBackendKind, AdSdkError};
use pilot_core::{AdHandle, AdLoadRequest, AdSurface, ShowOutcome};
use tracing::debug;

/// Ad backend used when the native SDK is unavailable
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedAdBackend;

impl SimulatedAdBackend {
    /// Create the simulated backend
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AdBackendEffects for SimulatedAdBackend {
    fn kind(&self) -> AdBackendKind {
        AdBackendKind::Simulated
    }

    async fn initialize(&self) -> Result<(), AdSdkError> {
        debug!("simulated ad backend initialised");
        Ok(())
    }

    async fn load(&self, request: &AdLoadRequest) -> Result<AdHandle, AdSdkError> {
        debug!(surface = %request.surface, "simulated backend cannot load ads");
        Err(AdSdkError::Unavailable)
    }

    async fn show(&self, surface: AdSurface, _handle: AdHandle) -> Result<ShowOutcome, AdSdkError> {
        debug!(%surface, "simulated backend cannot show ads");
        Err(AdSdkError::Unavailable)
    }
}
