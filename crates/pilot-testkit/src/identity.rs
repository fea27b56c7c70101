//! Identity provider double

use async_trait::async_trait;
use pilot_core::effects::{IdentityEffects, IdentityError};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Records sign-outs; can be switched to fail
#[derive(Debug, Default)]
pub struct MockIdentity {
    fail: AtomicBool,
    sign_outs: AtomicUsize,
}

impl MockIdentity {
    /// Provider whose sign-out succeeds
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sign-out fail (or succeed again)
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Number of sign-out attempts
    pub fn sign_out_calls(&self) -> usize {
        self.sign_outs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityEffects for MockIdentity {
    async fn sign_out(&self) -> Result<(), IdentityError> {
        self.sign_outs.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(IdentityError::Unavailable);
        }
        Ok(())
    }
}
