//! Storage key derivation
//!
//! Packet keys are `prefix + fnv1a(type + name)` as 8 hex digits. Collisions
//! are not detected: two sources hashing alike share one packet slot.

use crate::error::{VaultError, VaultResult};

pub const DEFAULT_KEY_PREFIX: &str = "sourcevault:source:";
pub const DEFAULT_INDEX_KEY: &str = "sourcevault:collection";

const FNV_OFFSET: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;
const HASH_HEX_LEN: usize = 8;

/// Derives packet keys and owns the reserved index key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEncoder {
    prefix: String,
    index_key: String,
}

impl KeyEncoder {
    /// Creates an encoder, rejecting an index key that a packet could also use
    pub fn new(prefix: impl Into<String>, index_key: impl Into<String>) -> VaultResult<Self> {
        let encoder = Self {
            prefix: prefix.into(),
            index_key: index_key.into(),
        };

        if encoder.prefix.contains(',') || encoder.index_key.contains(',') {
            return Err(VaultError::config("Storage keys must not contain ','"));
        }
        if encoder.index_key.is_empty() {
            return Err(VaultError::config("Index key must not be empty"));
        }
        if encoder.is_packet_key(&encoder.index_key) {
            return Err(VaultError::config(format!(
                "Index key '{}' collides with the packet key space",
                encoder.index_key
            )));
        }

        Ok(encoder)
    }

    /// Storage key of the packet for a source
    pub fn key(&self, source_type: &str, name: &str) -> String {
        let mut seed = String::with_capacity(source_type.len() + name.len());
        seed.push_str(source_type);
        seed.push_str(name);
        format!("{}{:08x}", self.prefix, hash(&seed))
    }

    pub fn index_key(&self) -> &str {
        &self.index_key
    }

    fn is_packet_key(&self, key: &str) -> bool {
        key.strip_prefix(self.prefix.as_str()).is_some_and(|rest| {
            rest.len() == HASH_HEX_LEN && rest.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
        })
    }
}

impl Default for KeyEncoder {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_KEY_PREFIX.to_string(),
            index_key: DEFAULT_INDEX_KEY.to_string(),
        }
    }
}

/// 32-bit FNV-1a
fn hash(input: &str) -> u32 {
    input.bytes().fold(FNV_OFFSET, |acc, byte| {
        (acc ^ u32::from(byte)).wrapping_mul(FNV_PRIME)
    })
}

/// Joins packet keys into a collection index value
pub fn join_index(keys: &[String]) -> String {
    keys.join(",")
}

/// Splits a collection index value, ignoring empty segments
pub fn split_index(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(str::to_string)
        .collect()
}
