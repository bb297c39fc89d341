// SourceVault - lock/unlock registry for credential sources
// Core library

pub mod config;
pub mod credentials;
pub mod error;
pub mod observability;
pub mod persistence;
pub mod source;
pub mod storage;

#[cfg(test)]
pub(crate) mod test_fixtures;

use std::sync::Arc;

pub use config::VaultConfig;
pub use credentials::{Credentials, KdfParams, SealingMarshaller};
pub use error::{VaultError, VaultResult};
pub use source::{
    CipherText, CredentialMarshaller, CredentialSpec, Secret, SourceEvent, SourceManager,
    SourceStatus, SourceSummary, StorageBackend,
};
pub use storage::{KeyringStorage, MemoryStorage};

/// Opens a manager over the OS keychain for `profile`
///
/// Loads the per-user config and installs file logging. The registry starts
/// empty; call [`SourceManager::rehydrate`] to load the stored sources.
///
/// Must be called from within a tokio runtime: the persistence worker is
/// spawned here.
pub fn open_keychain_vault(profile: &str) -> VaultResult<SourceManager> {
    let config = VaultConfig::load();
    observability::init_tracing(&config);

    let storage = Arc::new(KeyringStorage::new(profile));
    SourceManager::from_config(&config, storage)
}
