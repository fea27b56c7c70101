//! Scripted ad SDK
//!
//! Loads succeed with fresh handles unless failures are queued with
//! [`ScriptedAdSdk::fail_next_loads`]. Shows succeed (rewarded shows earn the
//! reward) unless an outcome is queued with [`ScriptedAdSdk::script_show`].

use async_trait::async_trait;
use parking_lot::Mutex;
use pilot_core::effects::{AdBackendEffects, AdBackendKind, AdSdkError};
use pilot_core::{AdHandle, AdLoadRequest, AdSurface, ShowOutcome};
use std::collections::{BTreeMap, VecDeque};

#[derive(Debug, Default)]
struct SdkState {
    init_error: Option<AdSdkError>,
    initialize_calls: usize,
    next_handle: u64,
    pending_load_failures: BTreeMap<AdSurface, u32>,
    scripted_shows: BTreeMap<AdSurface, VecDeque<Result<ShowOutcome, AdSdkError>>>,
    loads: BTreeMap<AdSurface, usize>,
    shows: BTreeMap<AdSurface, usize>,
    load_requests: Vec<AdLoadRequest>,
}

/// Native-kind [`AdBackendEffects`] driven by a script
#[derive(Debug, Default)]
pub struct ScriptedAdSdk {
    state: Mutex<SdkState>,
}

impl ScriptedAdSdk {
    /// SDK where every load and show succeeds
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `initialize` fail with `err`
    pub fn fail_initialize(&self, err: AdSdkError) {
        self.state.lock().init_error = Some(err);
    }

    /// Fail the next `count` loads of `surface` with no fill
    pub fn fail_next_loads(&self, surface: AdSurface, count: u32) {
        *self
            .state
            .lock()
            .pending_load_failures
            .entry(surface)
            .or_default() += count;
    }

    /// Queue the outcome of the next show of `surface`
    pub fn script_show(&self, surface: AdSurface, outcome: Result<ShowOutcome, AdSdkError>) {
        self.state
            .lock()
            .scripted_shows
            .entry(surface)
            .or_default()
            .push_back(outcome);
    }

    /// Times `initialize` was called
    pub fn initialize_calls(&self) -> usize {
        self.state.lock().initialize_calls
    }

    /// Loads issued for `surface`, failed ones included
    pub fn load_count(&self, surface: AdSurface) -> usize {
        self.state.lock().loads.get(&surface).copied().unwrap_or(0)
    }

    /// Shows issued for `surface`, failed ones included
    pub fn show_count(&self, surface: AdSurface) -> usize {
        self.state.lock().shows.get(&surface).copied().unwrap_or(0)
    }

    /// Every load request in issue order
    pub fn load_requests(&self) -> Vec<AdLoadRequest> {
        self.state.lock().load_requests.clone()
    }
}

#[async_trait]
impl AdBackendEffects for ScriptedAdSdk {
    fn kind(&self) -> AdBackendKind {
        AdBackendKind::Native
    }

    async fn initialize(&self) -> Result<(), AdSdkError> {
        let mut state = self.state.lock();
        state.initialize_calls += 1;
        match state.init_error.clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn load(&self, request: &AdLoadRequest) -> Result<AdHandle, AdSdkError> {
        let mut state = self.state.lock();
        let surface = request.surface;
        *state.loads.entry(surface).or_default() += 1;
        state.load_requests.push(request.clone());

        if let Some(remaining) = state.pending_load_failures.get_mut(&surface) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(AdSdkError::LoadFailed {
                    surface,
                    reason: "no fill".to_string(),
                });
            }
        }

        state.next_handle += 1;
        Ok(AdHandle(state.next_handle))
    }

    async fn show(&self, surface: AdSurface, _handle: AdHandle) -> Result<ShowOutcome, AdSdkError> {
        let mut state = self.state.lock();
        *state.shows.entry(surface).or_default() += 1;
        state
            .scripted_shows
            .get_mut(&surface)
            .and_then(VecDeque::pop_front)
            .unwrap_or(Ok(ShowOutcome {
                reward_earned: surface == AdSurface::Rewarded,
            }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pilot_core::AdRequestOptions;

    fn request(surface: AdSurface) -> AdLoadRequest {
        AdLoadRequest {
            surface,
            unit_id: "ca-app-pub-3940256099942544/1033173712".to_string(),
            options: AdRequestOptions::default(),
        }
    }

    #[tokio::test]
    async fn queued_failures_are_consumed_per_surface() {
        let sdk = ScriptedAdSdk::new();
        sdk.fail_next_loads(AdSurface::Interstitial, 1);

        assert!(sdk.load(&request(AdSurface::Interstitial)).await.is_err());
        assert!(sdk.load(&request(AdSurface::Rewarded)).await.is_ok());
        let first = sdk.load(&request(AdSurface::Interstitial)).await.unwrap();
        let second = sdk.load(&request(AdSurface::Interstitial)).await.unwrap();
        assert_ne!(first, second);
        assert_eq!(sdk.load_count(AdSurface::Interstitial), 3);
    }

    #[tokio::test]
    async fn scripted_show_overrides_default_once() {
        let sdk = ScriptedAdSdk::new();
        sdk.script_show(
            AdSurface::Rewarded,
            Err(AdSdkError::ShowFailed {
                surface: AdSurface::Rewarded,
                reason: "activity gone".to_string(),
            }),
        );
        assert!(sdk.show(AdSurface::Rewarded, AdHandle(1)).await.is_err());
        let outcome = sdk.show(AdSurface::Rewarded, AdHandle(2)).await.unwrap();
        assert!(outcome.reward_earned);
        assert_eq!(sdk.show_count(AdSurface::Rewarded), 2);
    }
}
