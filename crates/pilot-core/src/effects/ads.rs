//! Ad SDK effect.
//!
//! # Effect Classification
//!
//! - **Category**: Infrastructure Effect
//! - **Implementation**: host platform bridge (native SDK), `pilot-effects`
//!   (`SimulatedAdBackend`), `pilot-testkit` (`ScriptedAdSdk`)
//! - **Usage**: `AdOrchestrator` only
//!
//! The native SDK is callback driven. Bridges collapse the callbacks of one
//! load or one show into a single awaited result; the orchestrator turns
//! those results into typed events for its state machine.

use crate::types::{AdHandle, AdLoadRequest, AdSurface, ShowOutcome};
use async_trait::async_trait;

/// Which strategy backs the ad surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdBackendKind {
    /// A real ad network SDK is linked
    Native,
    /// No SDK available (development builds, tests); rewarded ads are
    /// granted after a simulated delay and no other ads are shown
    Simulated,
}

/// Ad SDK failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdSdkError {
    /// SDK is not linked in this build
    #[error("Ad SDK unavailable")]
    Unavailable,
    /// SDK initialisation failed
    #[error("Ad SDK initialisation failed: {reason}")]
    InitFailed {
        /// Underlying reason
        reason: String,
    },
    /// The network returned no fill or an error
    #[error("Load failed for {surface}: {reason}")]
    LoadFailed {
        /// Surface being loaded
        surface: AdSurface,
        /// Underlying reason
        reason: String,
    },
    /// The ad could not be presented
    #[error("Show failed for {surface}: {reason}")]
    ShowFailed {
        /// Surface being shown
        surface: AdSurface,
        /// Underlying reason
        reason: String,
    },
}

/// Injectable ad backend strategy.
#[async_trait]
pub trait AdBackendEffects: Send + Sync {
    /// Strategy implemented by this backend
    fn kind(&self) -> AdBackendKind;

    /// Initialise the SDK; called once
    async fn initialize(&self) -> Result<(), AdSdkError>;

    /// Load one ad; resolves when the SDK reports loaded or failed
    async fn load(&self, request: &AdLoadRequest) -> Result<AdHandle, AdSdkError>;

    /// Present a loaded ad; resolves when it is dismissed or fails
    async fn show(&self, surface: AdSurface, handle: AdHandle) -> Result<ShowOutcome, AdSdkError>;
}

/// Blanket implementation for Arc<T> where T: AdBackendEffects
#[async_trait]
impl<T: AdBackendEffects + ?Sized> AdBackendEffects for std::sync::Arc<T> {
    fn kind(&self) -> AdBackendKind {
        (**self).kind()
    }

    async fn initialize(&self) -> Result<(), AdSdkError> {
        (**self).initialize().await
    }

    async fn load(&self, request: &AdLoadRequest) -> Result<AdHandle, AdSdkError> {
        (**self).load(request).await
    }

    async fn show(&self, surface: AdSurface, handle: AdHandle) -> Result<ShowOutcome, AdSdkError> {
        (**self).show(surface, handle).await
    }
}
