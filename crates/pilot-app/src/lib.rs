//! # Earn Pilot App - portable headless client core
//!
//! The stateful parts of the Earn Pilot mobile app that a UI shell binds to:
//!
//! - [`AdOrchestrator`]: load/show/retry state machine for the banner,
//!   interstitial, rewarded and app-open surfaces
//! - [`ConfigFetcher`]: ad policy retrieval, refetched on foreground
//! - [`CooldownCache`]: per-game cooldowns in front of the backend check
//! - [`SessionStore`]: bearer token and user record, persisted to the device
//!
//! Everything is reached through a [`PilotApp`] built from injected effect
//! handlers:
//!
//! ```rust,ignore
//! let app = PilotApp::builder()
//!     .with_config(config)
//!     .with_production_defaults()
//!     .await?
//!     .build()?;
//! let signed_in = app.start().await;
//! ```

#![forbid(unsafe_code)]

pub mod ads;
pub mod config_fetcher;
pub mod context;
pub mod cooldown;
pub mod errors;
pub mod game_stats;
pub mod preferences;
pub mod session;

pub use ads::{
    AdEvent, AdOrchestrator, AdPhase, AdSettings, AdUnitState, AppOpenMoment, AppState,
};
pub use config_fetcher::ConfigFetcher;
pub use context::{PilotApp, PilotAppBuilder};
pub use cooldown::CooldownCache;
pub use errors::{AppError, ErrorCategory, ToastLevel};
pub use game_stats::{GameStatsStore, PlayRecord};
pub use preferences::Preferences;
pub use session::{LogoutReport, LogoutStep, SessionStore};

pub use pilot_core;
