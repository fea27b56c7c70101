//! Controllable clock for deterministic tests

use async_trait::async_trait;
use parking_lot::Mutex;
use pilot_core::effects::{PhysicalTimeEffects, TimeError};
use pilot_core::PhysicalTime;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Manually driven clock. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ControllableTime {
    now_ms: Arc<Mutex<u64>>,
    frozen: Arc<AtomicBool>,
}

impl ControllableTime {
    /// Clock starting at `start_ms` (epoch milliseconds)
    pub fn new(start_ms: u64) -> Self {
        Self {
            now_ms: Arc::new(Mutex::new(start_ms)),
            frozen: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Current time in epoch ms
    pub fn now_ms(&self) -> u64 {
        *self.now_ms.lock()
    }

    /// Move the clock forward
    pub fn advance_ms(&self, ms: u64) {
        let mut now = self.now_ms.lock();
        *now = now.saturating_add(ms);
    }

    /// Set the absolute time
    pub fn set_ms(&self, ms: u64) {
        *self.now_ms.lock() = ms;
    }

    /// Stop `sleep_ms` from advancing the clock
    pub fn freeze(&self) {
        self.frozen.store(true, Ordering::SeqCst);
    }

    /// Let `sleep_ms` advance the clock again
    pub fn unfreeze(&self) {
        self.frozen.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl PhysicalTimeEffects for ControllableTime {
    async fn physical_time(&self) -> Result<PhysicalTime, TimeError> {
        Ok(PhysicalTime::from_ms(self.now_ms()))
    }

    async fn sleep_ms(&self, ms: u64) -> Result<(), TimeError> {
        // Sleeping advances the clock instead of waiting.
        if !self.frozen.load(Ordering::SeqCst) {
            self.advance_ms(ms);
        }
        Ok(())
    }
}
