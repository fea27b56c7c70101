//! Device key-value storage effect.
//!
//! # Effect Classification
//!
//! - **Category**: Infrastructure Effect
//! - **Implementation**: `pilot-effects` (memory and filesystem handlers)
//! - **Usage**: session store, preferences, game stats
//!
//! Mirrors the platform key-value store (AsyncStorage / SharedPreferences /
//! NSUserDefaults): flat string keys, opaque byte values, no transactions.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Well-known storage keys.
pub mod keys {
    /// Bearer token
    pub const AUTH_TOKEN: &str = "auth_token";
    /// JSON user record
    pub const USER_DATA: &str = "user_data";
    /// JSON per-game statistics
    pub const GAME_STATS: &str = "gameStats";
    /// JSON last play time per game slug
    pub const LAST_GAME_TIMES: &str = "lastGameTimes";
    /// Per-user game statistics snapshot
    pub const USER_GAME_STATS: &str = "userGameStats";
    /// `"dark"` or `"light"`
    pub const THEME_PREFERENCE: &str = "theme_preference";
    /// Push notification token
    pub const FCM_TOKEN: &str = "fcm_token";
}

/// Storage operation error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    /// Reading a key failed
    #[error("Failed to read '{key}': {reason}")]
    ReadFailed {
        /// Key being read
        key: String,
        /// Underlying reason
        reason: String,
    },
    /// Writing a key failed
    #[error("Failed to write '{key}': {reason}")]
    WriteFailed {
        /// Key being written
        key: String,
        /// Underlying reason
        reason: String,
    },
    /// Deleting a key failed
    #[error("Failed to delete '{key}': {reason}")]
    DeleteFailed {
        /// Key being deleted
        key: String,
        /// Underlying reason
        reason: String,
    },
    /// Key contains characters the backend cannot store
    #[error("Invalid key '{key}'")]
    InvalidKey {
        /// Offending key
        key: String,
    },
    /// Stored value could not be (de)serialized
    #[error("Corrupt value for '{key}': {reason}")]
    Corrupt {
        /// Key holding the value
        key: String,
        /// Decoder message
        reason: String,
    },
    /// Handler misconfigured
    #[error("Storage configuration error: {reason}")]
    ConfigurationError {
        /// Description
        reason: String,
    },
}

/// Device key-value storage
#[async_trait]
pub trait StorageEffects: Send + Sync {
    /// Store `value` under `key`, replacing any previous value
    async fn store(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError>;

    /// Read the value under `key`
    async fn retrieve(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Delete `key`; returns whether it existed
    async fn remove(&self, key: &str) -> Result<bool, StorageError>;

    /// Whether `key` holds a value
    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.retrieve(key).await?.is_some())
    }

    /// All keys, optionally filtered by prefix
    async fn list_keys(&self, prefix: Option<&str>) -> Result<Vec<String>, StorageError>;
}

/// Blanket implementation for Arc<T> where T: StorageEffects
#[async_trait]
impl<T: StorageEffects + ?Sized> StorageEffects for std::sync::Arc<T> {
    async fn store(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
        (**self).store(key, value).await
    }

    async fn retrieve(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        (**self).retrieve(key).await
    }

    async fn remove(&self, key: &str) -> Result<bool, StorageError> {
        (**self).remove(key).await
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        (**self).exists(key).await
    }

    async fn list_keys(&self, prefix: Option<&str>) -> Result<Vec<String>, StorageError> {
        (**self).list_keys(prefix).await
    }
}

/// Typed helpers over [`StorageEffects`].
#[async_trait]
pub trait StorageExt: StorageEffects {
    /// Store a UTF-8 string
    async fn store_str(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.store(key, value.as_bytes().to_vec()).await
    }

    /// Read a UTF-8 string
    async fn retrieve_str(&self, key: &str) -> Result<Option<String>, StorageError> {
        match self.retrieve(key).await? {
            Some(bytes) => String::from_utf8(bytes)
                .map(Some)
                .map_err(|e| StorageError::Corrupt {
                    key: key.to_string(),
                    reason: e.to_string(),
                }),
            None => Ok(None),
        }
    }

    /// Store a value as JSON
    async fn store_json<T>(&self, key: &str, value: &T) -> Result<(), StorageError>
    where
        T: Serialize + Sync,
    {
        let bytes = serde_json::to_vec(value).map_err(|e| StorageError::Corrupt {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        self.store(key, bytes).await
    }

    /// Read a JSON value
    async fn retrieve_json<T>(&self, key: &str) -> Result<Option<T>, StorageError>
    where
        T: DeserializeOwned + Send,
    {
        match self.retrieve(key).await? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| StorageError::Corrupt {
                    key: key.to_string(),
                    reason: e.to_string(),
                }),
            None => Ok(None),
        }
    }
}

impl<T: StorageEffects + ?Sized> StorageExt for T {}
