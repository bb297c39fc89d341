//! Keychain Storage
//!
//! Persists packets and the collection index in the OS keychain, one entry
//! per storage key, isolated per profile.

use async_trait::async_trait;
use keyring::Entry;
use tracing::instrument;

use crate::error::{VaultError, VaultResult};
use crate::source::traits::StorageBackend;

const SERVICE_PREFIX: &str = "sourcevault";

/// Storage backed by the platform credential store
#[derive(Debug, Clone)]
pub struct KeyringStorage {
    profile: String,
}

impl KeyringStorage {
    /// Creates a keyring storage with profile isolation
    pub fn new(profile: &str) -> Self {
        Self {
            profile: profile.to_string(),
        }
    }

    /// Gets the keyring service name for this profile
    fn service_name(&self) -> String {
        format!("{}_{}", SERVICE_PREFIX, self.profile)
    }

    fn entry(service: &str, key: &str) -> VaultResult<Entry> {
        Entry::new(service, key).map_err(|e| VaultError::storage(format!("Keyring error: {}", e)))
    }
}

#[async_trait]
impl StorageBackend for KeyringStorage {
    #[instrument(skip(self))]
    async fn get_value(&self, key: &str) -> VaultResult<String> {
        let service = self.service_name();
        let key = key.to_string();

        tokio::task::spawn_blocking(move || {
            let entry = Self::entry(&service, &key)?;
            match entry.get_password() {
                Ok(value) => Ok(value),
                Err(keyring::Error::NoEntry) => Err(VaultError::storage(format!(
                    "No value stored under '{}'",
                    key
                ))),
                Err(e) => Err(VaultError::storage(format!("Failed to read '{}': {}", key, e))),
            }
        })
        .await
        .map_err(|e| VaultError::internal(format!("Keyring task failed: {}", e)))?
    }

    #[instrument(skip(self, value))]
    async fn set_value(&self, key: &str, value: &str) -> VaultResult<()> {
        let service = self.service_name();
        let key = key.to_string();
        let value = value.to_string();

        tokio::task::spawn_blocking(move || {
            let entry = Self::entry(&service, &key)?;
            entry
                .set_password(&value)
                .map_err(|e| VaultError::storage(format!("Failed to write '{}': {}", key, e)))
        })
        .await
        .map_err(|e| VaultError::internal(format!("Keyring task failed: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_name_is_profile_scoped() {
        assert_eq!(KeyringStorage::new("work").service_name(), "sourcevault_work");
        assert_ne!(
            KeyringStorage::new("work").service_name(),
            KeyringStorage::new("home").service_name()
        );
    }
}
