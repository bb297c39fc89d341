//! In-process storage
//!
//! Backs tests and ephemeral sessions. Values live only as long as the
//! process.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{VaultError, VaultResult};
use crate::source::traits::StorageBackend;

#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    data: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every stored key, sorted
    pub async fn keys(&self) -> Vec<String> {
        let data = self.data.read().await;
        let mut keys: Vec<String> = data.keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl StorageBackend for MemoryStorage {
    async fn get_value(&self, key: &str) -> VaultResult<String> {
        let data = self.data.read().await;
        data.get(key)
            .cloned()
            .ok_or_else(|| VaultError::storage(format!("No value stored under '{}'", key)))
    }

    async fn set_value(&self, key: &str, value: &str) -> VaultResult<()> {
        let mut data = self.data.write().await;
        data.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
