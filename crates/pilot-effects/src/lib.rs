//! Earn Pilot Effects - production effect handlers
//!
//! Stateless (or self-contained) implementations of the effect traits
//! declared in `pilot-core`. This is the only crate allowed to touch the OS
//! clock, the filesystem and the network directly.
//!
//! | Trait                 | Handler                                   |
//! |-----------------------|-------------------------------------------|
//! | `StorageEffects`      | `MemoryStorageHandler`, `FilesystemStorageHandler` |
//! | `PhysicalTimeEffects` | `RealTimeHandler`                         |
//! | `BackendEffects`      | `HttpBackendHandler`                      |
//! | `AdBackendEffects`    | `SimulatedAdBackend` (native SDKs are bridged by the host) |
//! | `IdentityEffects`     | `NoopIdentityHandler`                     |

#![forbid(unsafe_code)]

pub mod ads;
pub mod backend;
pub mod identity;
pub mod logging;
pub mod storage;
pub mod time;

pub use ads::SimulatedAdBackend;
pub use backend::{HttpBackendBuildError, HttpBackendHandler, HttpBackendHandlerBuilder};
pub use identity::NoopIdentityHandler;
pub use storage::{FilesystemStorageHandler, MemoryStorageHandler};
pub use time::RealTimeHandler;
