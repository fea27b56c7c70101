//! Per-surface ad lifecycle state machine
//!
//! ```text
//! Unloaded ──LoadRequested──▶ Loading ──Loaded──▶ Loaded ──ShowStarted──▶ Showing
//!    ▲                          │                                          │
//!    └──────LoadFailed──────────┘◀──────────Dismissed / ShowFailed─────────┘
//! ```
//!
//! SDK callbacks arrive as [`AdEvent`]s and are applied by [`transition`],
//! the only function that mutates an [`AdUnitState`]. The returned
//! [`AdCommand`] tells the orchestrator when to load again.

use pilot_core::{AdHandle, AdSurface};

/// Lifecycle phase of one surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AdPhase {
    /// Nothing loaded, no load outstanding
    #[default]
    Unloaded,
    /// One load outstanding
    Loading,
    /// Ready to show
    Loaded,
    /// On screen
    Showing,
}

/// Load/show state of one surface.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AdUnitState {
    /// Current phase
    pub phase: AdPhase,
    /// SDK handle while loaded or showing
    pub handle: Option<AdHandle>,
    /// Number of show requests seen (interstitial sampling)
    pub shown_count: u64,
    /// Epoch ms at which a delayed reload becomes due
    pub retry_at_ms: Option<u64>,
    /// Load failures since the last successful load
    pub consecutive_failures: u32,
}

impl AdUnitState {
    /// An ad is ready to be shown
    pub fn loaded(&self) -> bool {
        self.phase == AdPhase::Loaded
    }

    /// A load may be issued now
    pub fn can_load(&self) -> bool {
        self.phase == AdPhase::Unloaded
    }

    /// A delayed reload is due at `now_ms`
    pub fn retry_due(&self, now_ms: u64) -> bool {
        self.phase == AdPhase::Unloaded && self.retry_at_ms.is_some_and(|at| at <= now_ms)
    }

    /// A load may be issued at `now_ms`: unloaded and not backing off
    pub fn load_allowed(&self, now_ms: u64) -> bool {
        self.can_load() && !matches!(self.retry_at_ms, Some(at) if at > now_ms)
    }
}

/// Typed SDK / lifecycle event for one surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdEvent {
    /// A load was issued
    LoadRequested,
    /// The SDK reported a loaded ad
    Loaded(AdHandle),
    /// The SDK reported a load failure
    LoadFailed {
        /// SDK reason
        reason: String,
    },
    /// The ad was presented
    ShowStarted,
    /// The ad was closed by the user
    Dismissed,
    /// Presentation failed
    ShowFailed {
        /// SDK reason
        reason: String,
    },
    /// The policy switched the surface off
    Disabled,
}

impl AdEvent {
    fn name(&self) -> &'static str {
        match self {
            Self::LoadRequested => "load_requested",
            Self::Loaded(_) => "loaded",
            Self::LoadFailed { .. } => "load_failed",
            Self::ShowStarted => "show_started",
            Self::Dismissed => "dismissed",
            Self::ShowFailed { .. } => "show_failed",
            Self::Disabled => "disabled",
        }
    }
}

/// Follow-up requested by a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdCommand {
    /// Issue a new load immediately
    ReloadNow,
    /// Issue a new load once the clock reaches this epoch ms
    ReloadAt(u64),
}

/// Inputs a transition needs besides the event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionContext {
    /// Current epoch ms
    pub now_ms: u64,
    /// Backoff applied to deadline reloads
    pub retry_delay_ms: u64,
}

/// Event not valid in the current phase
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{surface}: event '{event}' not valid in phase {phase:?}")]
pub struct TransitionError {
    /// Surface the event was for
    pub surface: AdSurface,
    /// Phase at the time
    pub phase: AdPhase,
    /// Event name
    pub event: &'static str,
}

/// Consecutive load failures of an interstitial or rewarded unit that are
/// reloaded at once before falling back to the retry deadline
pub const IMMEDIATE_RELOAD_LIMIT: u32 = 3;

fn reload_later(ctx: TransitionContext) -> Option<AdCommand> {
    Some(AdCommand::ReloadAt(ctx.now_ms.saturating_add(ctx.retry_delay_ms)))
}

fn reload_after_failure(
    surface: AdSurface,
    consecutive_failures: u32,
    ctx: TransitionContext,
) -> Option<AdCommand> {
    match surface {
        // The host banner view refreshes itself.
        AdSurface::Banner => None,
        AdSurface::AppOpen => reload_later(ctx),
        AdSurface::Interstitial | AdSurface::Rewarded
            if consecutive_failures <= IMMEDIATE_RELOAD_LIMIT =>
        {
            Some(AdCommand::ReloadNow)
        }
        AdSurface::Interstitial | AdSurface::Rewarded => reload_later(ctx),
    }
}

fn reload_after_show(surface: AdSurface, failed: bool, ctx: TransitionContext) -> Option<AdCommand> {
    match surface {
        AdSurface::Banner => None,
        // Shown at most once per activation; only a failed show is retried.
        AdSurface::AppOpen if failed => reload_later(ctx),
        AdSurface::AppOpen => None,
        AdSurface::Interstitial | AdSurface::Rewarded => Some(AdCommand::ReloadNow),
    }
}

/// Apply `event` to `state`.
///
/// Rejected events leave `state` untouched. A second `LoadRequested` while a
/// load is outstanding is rejected, so a surface never has two loads in
/// flight.
pub fn transition(
    surface: AdSurface,
    state: &mut AdUnitState,
    event: AdEvent,
    ctx: TransitionContext,
) -> Result<Option<AdCommand>, TransitionError> {
    let reject = |state: &AdUnitState, event: &AdEvent| TransitionError {
        surface,
        phase: state.phase,
        event: event.name(),
    };

    match (state.phase, &event) {
        (_, AdEvent::Disabled) => {
            *state = AdUnitState {
                shown_count: state.shown_count,
                ..AdUnitState::default()
            };
            Ok(None)
        }
        (AdPhase::Unloaded, AdEvent::LoadRequested) => {
            state.phase = AdPhase::Loading;
            state.retry_at_ms = None;
            Ok(None)
        }
        (AdPhase::Loading, AdEvent::Loaded(handle)) => {
            state.phase = AdPhase::Loaded;
            state.handle = Some(*handle);
            state.consecutive_failures = 0;
            Ok(None)
        }
        (AdPhase::Loading, AdEvent::LoadFailed { .. }) => {
            state.phase = AdPhase::Unloaded;
            state.handle = None;
            state.consecutive_failures = state.consecutive_failures.saturating_add(1);
            let command = reload_after_failure(surface, state.consecutive_failures, ctx);
            if let Some(AdCommand::ReloadAt(at)) = command {
                state.retry_at_ms = Some(at);
            }
            Ok(command)
        }
        (AdPhase::Loaded, AdEvent::ShowStarted) => {
            state.phase = AdPhase::Showing;
            Ok(None)
        }
        (AdPhase::Showing, AdEvent::Dismissed | AdEvent::ShowFailed { .. }) => {
            state.phase = AdPhase::Unloaded;
            state.handle = None;
            let failed = matches!(event, AdEvent::ShowFailed { .. });
            let command = reload_after_show(surface, failed, ctx);
            if let Some(AdCommand::ReloadAt(at)) = command {
                state.retry_at_ms = Some(at);
            }
            Ok(command)
        }
        _ => Err(reject(state, &event)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CTX: TransitionContext = TransitionContext {
        now_ms: 50_000,
        retry_delay_ms: 10_000,
    };

    fn loaded(surface: AdSurface) -> AdUnitState {
        let mut state = AdUnitState::default();
        transition(surface, &mut state, AdEvent::LoadRequested, CTX).unwrap();
        transition(surface, &mut state, AdEvent::Loaded(AdHandle(1)), CTX).unwrap();
        state
    }

    #[test]
    fn full_cycle_reloads_interstitial_immediately() {
        let mut state = loaded(AdSurface::Interstitial);
        assert!(state.loaded());
        transition(AdSurface::Interstitial, &mut state, AdEvent::ShowStarted, CTX).unwrap();
        let cmd = transition(AdSurface::Interstitial, &mut state, AdEvent::Dismissed, CTX).unwrap();
        assert_eq!(cmd, Some(AdCommand::ReloadNow));
        assert_eq!(state.phase, AdPhase::Unloaded);
        assert_eq!(state.handle, None);
    }

    #[test]
    fn second_load_is_rejected_while_loading() {
        let mut state = AdUnitState::default();
        transition(AdSurface::Rewarded, &mut state, AdEvent::LoadRequested, CTX).unwrap();
        let err = transition(AdSurface::Rewarded, &mut state, AdEvent::LoadRequested, CTX)
            .unwrap_err();
        assert_eq!(err.phase, AdPhase::Loading);
        assert_eq!(state.phase, AdPhase::Loading);
    }

    #[test]
    fn app_open_failure_backs_off() {
        let mut state = AdUnitState::default();
        transition(AdSurface::AppOpen, &mut state, AdEvent::LoadRequested, CTX).unwrap();
        let cmd = transition(
            AdSurface::AppOpen,
            &mut state,
            AdEvent::LoadFailed {
                reason: "no fill".to_string(),
            },
            CTX,
        )
        .unwrap();
        assert_eq!(cmd, Some(AdCommand::ReloadAt(60_000)));
        assert_eq!(state.retry_at_ms, Some(60_000));
        assert!(!state.retry_due(59_999));
        assert!(state.retry_due(60_000));
        assert_eq!(state.consecutive_failures, 1);
    }

    fn fail(surface: AdSurface, state: &mut AdUnitState) -> Option<AdCommand> {
        transition(surface, state, AdEvent::LoadRequested, CTX).unwrap();
        transition(
            surface,
            state,
            AdEvent::LoadFailed {
                reason: "timeout".to_string(),
            },
            CTX,
        )
        .unwrap()
    }

    #[test]
    fn rewarded_failure_reloads_at_once_then_backs_off() {
        let mut state = AdUnitState::default();
        for _ in 0..IMMEDIATE_RELOAD_LIMIT {
            assert_eq!(fail(AdSurface::Rewarded, &mut state), Some(AdCommand::ReloadNow));
            assert_eq!(state.retry_at_ms, None);
            assert!(state.load_allowed(CTX.now_ms));
        }

        assert_eq!(
            fail(AdSurface::Rewarded, &mut state),
            Some(AdCommand::ReloadAt(60_000))
        );
        assert!(!state.load_allowed(59_999));
        assert!(state.load_allowed(60_000));
    }

    #[test]
    fn successful_load_resets_the_immediate_budget() {
        let mut state = AdUnitState::default();
        for _ in 0..=IMMEDIATE_RELOAD_LIMIT {
            fail(AdSurface::Interstitial, &mut state);
        }
        transition(AdSurface::Interstitial, &mut state, AdEvent::LoadRequested, CTX).unwrap();
        transition(AdSurface::Interstitial, &mut state, AdEvent::Loaded(AdHandle(2)), CTX).unwrap();
        assert_eq!(state.consecutive_failures, 0);

        transition(AdSurface::Interstitial, &mut state, AdEvent::ShowStarted, CTX).unwrap();
        transition(AdSurface::Interstitial, &mut state, AdEvent::Dismissed, CTX).unwrap();
        assert_eq!(fail(AdSurface::Interstitial, &mut state), Some(AdCommand::ReloadNow));
    }

    #[test]
    fn app_open_is_not_reloaded_after_a_successful_show() {
        let mut state = loaded(AdSurface::AppOpen);
        transition(AdSurface::AppOpen, &mut state, AdEvent::ShowStarted, CTX).unwrap();
        let cmd = transition(AdSurface::AppOpen, &mut state, AdEvent::Dismissed, CTX).unwrap();
        assert_eq!(cmd, None);
        assert_eq!(state.retry_at_ms, None);
    }

    #[test]
    fn show_requires_loaded() {
        let mut state = AdUnitState::default();
        assert!(transition(AdSurface::Interstitial, &mut state, AdEvent::ShowStarted, CTX).is_err());
    }

    #[test]
    fn late_load_after_disable_is_rejected() {
        let mut state = AdUnitState::default();
        transition(AdSurface::Banner, &mut state, AdEvent::LoadRequested, CTX).unwrap();
        transition(AdSurface::Banner, &mut state, AdEvent::Disabled, CTX).unwrap();
        assert!(transition(AdSurface::Banner, &mut state, AdEvent::Loaded(AdHandle(3)), CTX).is_err());
        assert_eq!(state.phase, AdPhase::Unloaded);
    }
}
