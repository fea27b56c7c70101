//! Ad surfaces: lifecycle state machine, rewarded quota and the orchestrator

pub mod orchestrator;
pub mod quota;
pub mod state;

pub use orchestrator::{AdOrchestrator, AdSettings, AppOpenMoment, AppState};
pub use quota::RewardedQuota;
pub use state::{
    transition, AdCommand, AdEvent, AdPhase, AdUnitState, TransitionContext, TransitionError,
    IMMEDIATE_RELOAD_LIMIT,
};
