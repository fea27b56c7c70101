//! Third-party identity provider effect (Google / Firebase sign-out).

use async_trait::async_trait;

/// Identity provider failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    /// Provider SDK not linked
    #[error("Identity provider unavailable")]
    Unavailable,
    /// Provider call failed
    #[error("Identity provider error: {reason}")]
    Provider {
        /// Underlying reason
        reason: String,
    },
}

/// Identity provider operations the client core needs.
#[async_trait]
pub trait IdentityEffects: Send + Sync {
    /// Sign out of the provider session on this device
    async fn sign_out(&self) -> Result<(), IdentityError>;
}

/// Blanket implementation for Arc<T> where T: IdentityEffects
#[async_trait]
impl<T: IdentityEffects + ?Sized> IdentityEffects for std::sync::Arc<T> {
    async fn sign_out(&self) -> Result<(), IdentityError> {
        (**self).sign_out().await
    }
}
