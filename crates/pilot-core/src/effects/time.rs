//! Wall-clock time effect.
//!
//! # Effect Classification
//!
//! - **Category**: Infrastructure Effect
//! - **Implementation**: `pilot-effects` (`RealTimeHandler`), `pilot-testkit`
//!   (`ControllableTime`)
//! - **Usage**: cooldown freshness, quota day rollover, retry deadlines,
//!   the simulated rewarded delay

use crate::time::PhysicalTime;
use async_trait::async_trait;

/// Error type for time operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimeError {
    /// The clock could not be read
    #[error("Clock unavailable: {reason}")]
    ClockUnavailable {
        /// Underlying reason
        reason: String,
    },
    /// Timer service stopped
    #[error("Time service unavailable")]
    ServiceUnavailable,
}

/// Wall-clock reads and cooperative sleeping.
#[async_trait]
pub trait PhysicalTimeEffects: Send + Sync {
    /// Current wall-clock time
    async fn physical_time(&self) -> Result<PhysicalTime, TimeError>;

    /// Suspend the caller for `ms` milliseconds
    async fn sleep_ms(&self, ms: u64) -> Result<(), TimeError>;

    /// Current time, or the epoch when the clock cannot be read.
    ///
    /// Callers that only use time for soft decisions (cache freshness) use
    /// this instead of propagating a clock error.
    async fn now_or_epoch(&self) -> PhysicalTime {
        self.physical_time()
            .await
            .unwrap_or(PhysicalTime::from_ms(0))
    }
}

/// Blanket implementation for Arc<T> where T: PhysicalTimeEffects
#[async_trait]
impl<T: PhysicalTimeEffects + ?Sized> PhysicalTimeEffects for std::sync::Arc<T> {
    async fn physical_time(&self) -> Result<PhysicalTime, TimeError> {
        (**self).physical_time().await
    }

    async fn sleep_ms(&self, ms: u64) -> Result<(), TimeError> {
        (**self).sleep_ms(ms).await
    }
}
