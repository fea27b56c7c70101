//! Device-local user preferences

use pilot_core::effects::{storage_keys, StorageEffects, StorageExt};
use pilot_core::{Result, ThemePreference};
use std::sync::Arc;
use tracing::warn;

/// Reads and writes preferences in device storage
pub struct Preferences {
    storage: Arc<dyn StorageEffects>,
}

impl Preferences {
    /// Preferences over `storage`
    pub fn new(storage: Arc<dyn StorageEffects>) -> Self {
        Self { storage }
    }

    /// Stored theme; `None` when unset or unrecognised (follow the system)
    pub async fn theme(&self) -> Option<ThemePreference> {
        match self
            .storage
            .retrieve_str(storage_keys::THEME_PREFERENCE)
            .await
        {
            Ok(raw) => raw.as_deref().and_then(ThemePreference::parse),
            Err(err) => {
                warn!(error = %err, "failed to read theme preference");
                None
            }
        }
    }

    /// Store the theme, or clear it with `None`
    pub async fn set_theme(&self, theme: Option<ThemePreference>) -> Result<()> {
        match theme {
            Some(theme) => {
                self.storage
                    .store_str(storage_keys::THEME_PREFERENCE, theme.as_str())
                    .await?
            }
            None => {
                self.storage
                    .remove(storage_keys::THEME_PREFERENCE)
                    .await?;
            }
        }
        Ok(())
    }
}
