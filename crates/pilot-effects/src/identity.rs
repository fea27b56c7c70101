//! Identity provider handler for hosts without a provider SDK

use async_trait::async_trait;
use pilot_core::effects::{IdentityEffects, IdentityError};

/// Identity handler that has no provider session to end
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopIdentityHandler;

#[async_trait]
impl IdentityEffects for NoopIdentityHandler {
    async fn sign_out(&self) -> Result<(), IdentityError> {
        Ok(())
    }
}
