//! Effect trait definitions
//!
//! Pure trait definitions for every side effect the client core performs.
//! This module defines **what** effects exist; handlers in `pilot-effects`
//! (production) and `pilot-testkit` (deterministic fakes) define **how**.
//!
//! # Effect Classification
//!
//! ## Infrastructure Effects
//! - **Storage**: device key-value store
//! - **Time**: wall clock and sleeping
//! - **Ads**: the ad network SDK (or its simulated stand-in)
//!
//! ## Application Effects
//! - **Backend**: the Earn Pilot REST API
//! - **Identity**: third-party sign-in provider

pub mod ads;
pub mod backend;
pub mod identity;
pub mod storage;
pub mod time;

pub use ads::{AdBackendEffects, AdBackendKind, AdSdkError};
pub use backend::{ApiEnvelope, ApiError, BackendEffects};
pub use identity::{IdentityEffects, IdentityError};
pub use storage::{keys as storage_keys, StorageEffects, StorageError, StorageExt};
pub use time::{PhysicalTimeEffects, TimeError};
