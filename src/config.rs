//! Vault configuration.
//!
//! Defaults are persisted to a per-user config file. Environment variables
//! override any stored values so managed deployments can pin the storage
//! layout and key derivation cost.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::credentials::KdfParams;
use crate::error::{VaultError, VaultResult};
use crate::persistence::keys::{KeyEncoder, DEFAULT_INDEX_KEY, DEFAULT_KEY_PREFIX};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// Prefix of every packet key
    pub key_prefix: String,
    /// Reserved key holding the collection index
    pub index_key: String,
    pub kdf: KdfParams,
    /// Tracing filter used when `RUST_LOG` is unset
    pub log_filter: String,
}

pub const DEFAULT_LOG_FILTER: &str = "sourcevault=info";

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            index_key: DEFAULT_INDEX_KEY.to_string(),
            kdf: KdfParams::default(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

fn env_string_opt(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_u32_opt(key: &str) -> Option<u32> {
    env_string_opt(key).and_then(|value| value.parse().ok())
}

/// Per-user directory holding the config file and logs
pub(crate) fn data_dir() -> PathBuf {
    if cfg!(windows) {
        let appdata = std::env::var_os("APPDATA")
            .unwrap_or_else(|| std::env::var_os("USERPROFILE").unwrap_or_default());
        PathBuf::from(appdata).join("SourceVault")
    } else {
        let home = std::env::var_os("HOME").unwrap_or_default();
        PathBuf::from(home).join(".sourcevault")
    }
}

fn config_path() -> PathBuf {
    data_dir().join("config.json")
}

fn load_from_file(path: &Path) -> Option<VaultConfig> {
    let raw = fs::read_to_string(path).ok()?;
    serde_json::from_str(&raw).ok()
}

impl VaultConfig {
    fn apply_env_overrides(&mut self) {
        if let Some(value) = env_string_opt("SOURCEVAULT_KEY_PREFIX") {
            self.key_prefix = value;
        }
        if let Some(value) = env_string_opt("SOURCEVAULT_INDEX_KEY") {
            self.index_key = value;
        }
        if let Some(value) = env_u32_opt("SOURCEVAULT_KDF_MEMORY_KIB") {
            self.kdf.memory_kib = value;
        }
        if let Some(value) = env_u32_opt("SOURCEVAULT_KDF_ITERATIONS") {
            self.kdf.iterations = value;
        }
        if let Some(value) = env_u32_opt("SOURCEVAULT_KDF_PARALLELISM") {
            self.kdf.parallelism = value;
        }
        if let Some(value) = env_string_opt("SOURCEVAULT_LOG_FILTER") {
            self.log_filter = value;
        }
    }

    /// Loads the per-user config file, falling back to defaults
    pub fn load() -> Self {
        Self::load_from(&config_path())
    }

    pub fn load_from(path: &Path) -> Self {
        let mut config = load_from_file(path).unwrap_or_default();
        config.apply_env_overrides();
        config
    }

    pub fn save_to_file(&self) -> VaultResult<()> {
        self.save_to(&config_path())
    }

    pub fn save_to(&self, path: &Path) -> VaultResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                VaultError::config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let payload = serde_json::to_string_pretty(self)
            .map_err(|e| VaultError::config(format!("Save failed: {}", e)))?;
        fs::write(path, payload).map_err(|e| VaultError::config(format!("Save failed: {}", e)))?;
        Ok(())
    }

    /// Builds the storage key encoder for this layout
    pub fn key_encoder(&self) -> VaultResult<KeyEncoder> {
        KeyEncoder::new(self.key_prefix.clone(), self.index_key.clone())
    }
}
