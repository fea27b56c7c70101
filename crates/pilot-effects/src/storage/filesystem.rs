//! Filesystem storage handler
//!
//! One file per key under a base directory. Writes go to a temporary file
//! that is renamed over the target, so a crash mid-write leaves either the
//! old value or the new one, never a torn file.

use async_trait::async_trait;
use pilot_core::effects::{StorageEffects, StorageError};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

const VALUE_EXTENSION: &str = "val";
const TEMP_EXTENSION: &str = "tmp";

/// Filesystem-backed key-value storage
#[derive(Debug, Clone)]
pub struct FilesystemStorageHandler {
    base_path: PathBuf,
}

impl FilesystemStorageHandler {
    /// Create a handler rooted at `base_path`, creating the directory if needed
    pub async fn open(base_path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path)
            .await
            .map_err(|e| StorageError::ConfigurationError {
                reason: format!("cannot create {}: {e}", base_path.display()),
            })?;
        Ok(Self { base_path })
    }

    /// Root directory
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn validate_key(key: &str) -> Result<(), StorageError> {
        let valid = !key.is_empty()
            && key.len() <= 128
            && !key.starts_with('.')
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
        if valid {
            Ok(())
        } else {
            Err(StorageError::InvalidKey {
                key: key.to_string(),
            })
        }
    }

    fn value_path(&self, key: &str) -> PathBuf {
        self.base_path.join(format!("{key}.{VALUE_EXTENSION}"))
    }

    fn temp_path(&self, key: &str) -> PathBuf {
        self.base_path.join(format!("{key}.{TEMP_EXTENSION}"))
    }
}

#[async_trait]
impl StorageEffects for FilesystemStorageHandler {
    async fn store(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
        Self::validate_key(key)?;
        let write_err = |e: std::io::Error| StorageError::WriteFailed {
            key: key.to_string(),
            reason: e.to_string(),
        };

        let temp = self.temp_path(key);
        let mut file = fs::File::create(&temp).await.map_err(write_err)?;
        file.write_all(&value).await.map_err(write_err)?;
        file.sync_all().await.map_err(write_err)?;
        drop(file);
        fs::rename(&temp, self.value_path(key))
            .await
            .map_err(write_err)?;

        debug!(key, bytes = value.len(), "stored value");
        Ok(())
    }

    async fn retrieve(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Self::validate_key(key)?;
        match fs::read(self.value_path(key)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::ReadFailed {
                key: key.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    async fn remove(&self, key: &str) -> Result<bool, StorageError> {
        Self::validate_key(key)?;
        match fs::remove_file(self.value_path(key)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::DeleteFailed {
                key: key.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    async fn list_keys(&self, prefix: Option<&str>) -> Result<Vec<String>, StorageError> {
        let read_err = |e: std::io::Error| StorageError::ReadFailed {
            key: self.base_path.display().to_string(),
            reason: e.to_string(),
        };
        let mut entries = fs::read_dir(&self.base_path).await.map_err(read_err)?;
        let mut keys = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(read_err)? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(VALUE_EXTENSION) {
                continue;
            }
            let Some(key) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if prefix.map_or(true, |p| key.starts_with(p)) {
                keys.push(key.to_string());
            }
        }
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pilot_core::effects::StorageExt;

    #[tokio::test]
    async fn values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FilesystemStorageHandler::open(dir.path()).await.unwrap();
        storage.store_str("auth_token", "secret").await.unwrap();

        let reopened = FilesystemStorageHandler::open(dir.path()).await.unwrap();
        assert_eq!(
            reopened.retrieve_str("auth_token").await.unwrap().as_deref(),
            Some("secret")
        );
        assert_eq!(reopened.list_keys(None).await.unwrap(), vec!["auth_token"]);
    }

    #[tokio::test]
    async fn missing_key_is_none_and_remove_reports_absence() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FilesystemStorageHandler::open(dir.path()).await.unwrap();
        assert_eq!(storage.retrieve("user_data").await.unwrap(), None);
        assert!(!storage.remove("user_data").await.unwrap());
    }

    #[tokio::test]
    async fn path_like_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FilesystemStorageHandler::open(dir.path()).await.unwrap();
        let err = storage.store("../escape", vec![1]).await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidKey { .. }));
    }

    #[tokio::test]
    async fn overwrite_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FilesystemStorageHandler::open(dir.path()).await.unwrap();
        storage.store_str("theme_preference", "dark").await.unwrap();
        storage.store_str("theme_preference", "light").await.unwrap();
        assert_eq!(
            storage.retrieve_str("theme_preference").await.unwrap().as_deref(),
            Some("light")
        );
        let leftovers = std::fs::read_dir(dir.path())
            .unwrap()
            .filter(|e| {
                e.as_ref()
                    .map(|e| e.path().extension().and_then(|x| x.to_str()) == Some("tmp"))
                    .unwrap_or(false)
            })
            .count();
        assert_eq!(leftovers, 0);
    }
}
