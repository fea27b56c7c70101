//! # Earn Pilot Testkit
//!
//! Deterministic stand-ins for every effect the client core performs, plus
//! a fixture that assembles a [`pilot_app::PilotApp`] from them.
//!
//! - [`ControllableTime`]: manual clock; sleeping advances it instantly
//! - [`MockBackend`]: scripted REST responses, call counters, offline switch
//! - [`ScriptedAdSdk`]: fake native ad SDK with scripted load/show results
//! - [`MockIdentity`]: identity provider with an optional failing sign-out
//! - [`TestAppBuilder`]: wires the above into a `PilotApp`

#![forbid(unsafe_code)]

pub mod ads;
pub mod backend;
pub mod fixture;
pub mod identity;
pub mod time;

pub use ads::ScriptedAdSdk;
pub use backend::{BackendCalls, MockBackend};
pub use fixture::{TestApp, TestAppBuilder};
pub use identity::MockIdentity;
pub use time::ControllableTime;
