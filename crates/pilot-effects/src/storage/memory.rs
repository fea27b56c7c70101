//! In-memory storage handler
//!
//! Used by headless hosts without persistent storage and as the default
//! storage in tests. Clones share the same map, so a clone can stand in for
//! "the same device" across a simulated restart.

use async_trait::async_trait;
use pilot_core::effects::{StorageEffects, StorageError};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory storage handler
#[derive(Debug, Clone, Default)]
pub struct MemoryStorageHandler {
    data: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryStorageHandler {
    /// Create a new, empty memory storage handler
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with initial data
    pub fn with_data(data: HashMap<String, Vec<u8>>) -> Self {
        Self {
            data: Arc::new(RwLock::new(data)),
        }
    }

    /// Snapshot of everything stored
    pub async fn snapshot(&self) -> HashMap<String, Vec<u8>> {
        self.data.read().await.clone()
    }
}

#[async_trait]
impl StorageEffects for MemoryStorageHandler {
    async fn store(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
        let mut data = self.data.write().await;
        data.insert(key.to_string(), value);
        Ok(())
    }

    async fn retrieve(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let data = self.data.read().await;
        Ok(data.get(key).cloned())
    }

    async fn remove(&self, key: &str) -> Result<bool, StorageError> {
        let mut data = self.data.write().await;
        Ok(data.remove(key).is_some())
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        let data = self.data.read().await;
        Ok(data.contains_key(key))
    }

    async fn list_keys(&self, prefix: Option<&str>) -> Result<Vec<String>, StorageError> {
        let data = self.data.read().await;
        let mut keys: Vec<String> = match prefix {
            Some(prefix) => data
                .keys()
                .filter(|k| k.starts_with(prefix))
                .cloned()
                .collect(),
            None => data.keys().cloned().collect(),
        };
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pilot_core::effects::StorageExt;

    #[tokio::test]
    async fn clones_share_state() {
        let storage = MemoryStorageHandler::new();
        let other = storage.clone();
        storage.store_str("auth_token", "abc").await.unwrap();
        assert_eq!(
            other.retrieve_str("auth_token").await.unwrap().as_deref(),
            Some("abc")
        );
        assert!(other.remove("auth_token").await.unwrap());
        assert!(!storage.exists("auth_token").await.unwrap());
    }

    #[tokio::test]
    async fn list_keys_filters_by_prefix() {
        let storage = MemoryStorageHandler::new();
        storage.store_str("gameStats", "{}").await.unwrap();
        storage.store_str("auth_token", "t").await.unwrap();
        storage.store_str("game_extra", "{}").await.unwrap();
        assert_eq!(
            storage.list_keys(Some("game")).await.unwrap(),
            vec!["gameStats".to_string(), "game_extra".to_string()]
        );
    }
}
