//! Earn Pilot Core - domain types and effect interfaces
//!
//! This crate holds everything the client core shares across layers and has
//! no runtime of its own:
//!
//! - **Types**: ad policy and surfaces, session/user records, game cooldowns
//! - **Effects**: pure async trait signatures for storage, time, backend,
//!   ad SDK and identity provider (handlers live in `pilot-effects`)
//! - **Errors**: per-effect errors and the unified [`PilotError`]
//! - **Config**: layered [`PilotConfig`]
//!
//! # Layering
//!
//! ```text
//! pilot-core      (types, effect traits)        Layer 1
//! pilot-effects   (production handlers)         Layer 3
//! pilot-app       (orchestrator, caches, store) Layer 5
//! pilot-testkit   (deterministic fakes)         Layer 8
//! ```

#![forbid(unsafe_code)]

/// Layered client configuration
pub mod config;

/// Pure effect interfaces (no implementations)
pub mod effects;

/// Unified error handling
pub mod errors;

/// Time values derived from the time effect
pub mod time;

/// Domain types
pub mod types;

pub use config::{ConfigError, LayeredConfig, PilotConfig};
pub use errors::{PilotError, Result};
pub use time::{CalendarDay, PhysicalTime};
pub use types::*;
