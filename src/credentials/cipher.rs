//! Password sealing
//!
//! Sealed format (base64 of):
//! - magic: `SVC1` (4 bytes)
//! - argon2 memory KiB, iterations, parallelism (3 x u32 LE)
//! - salt: 16 bytes
//! - nonce: 24 bytes (XChaCha20-Poly1305)
//! - ciphertext: AEAD output (ciphertext + tag)
//!
//! Everything before the ciphertext is bound as AAD.

use argon2::{Algorithm, Argon2, Params, Version};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    XChaCha20Poly1305, XNonce,
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::error::{VaultError, VaultResult};

pub const SEAL_MAGIC: &[u8; 4] = b"SVC1";

const KEY_LEN: usize = 32;
const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 24;
const HEADER_LEN: usize = SEAL_MAGIC.len() + 12 + SALT_LEN + NONCE_LEN;

/// Sealed headers may ask for at most this multiple of the local cost
const MAX_COST_FACTOR: u32 = 4;

/// Argon2id cost parameters used when sealing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

impl KdfParams {
    fn to_argon2(self) -> VaultResult<Params> {
        Params::new(
            self.memory_kib,
            self.iterations,
            self.parallelism,
            Some(KEY_LEN),
        )
        .map_err(|e| VaultError::config(format!("Invalid key derivation parameters: {}", e)))
    }

    /// Checks that argon2 accepts these parameters
    pub fn validate(self) -> VaultResult<()> {
        self.to_argon2().map(|_| ())
    }

    /// Whether a sealed header's cost stays within reach of `self`
    fn admits(self, sealed: KdfParams) -> bool {
        let limit = |local: u32| local.saturating_mul(MAX_COST_FACTOR);
        sealed.memory_kib <= limit(self.memory_kib)
            && sealed.iterations <= limit(self.iterations)
            && sealed.parallelism <= limit(self.parallelism)
    }
}

fn derive_key(
    password: &str,
    salt: &[u8],
    params: KdfParams,
) -> VaultResult<Zeroizing<[u8; KEY_LEN]>> {
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params.to_argon2()?);
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    argon2
        .hash_password_into(password.as_bytes(), salt, &mut *key)
        .map_err(|e| VaultError::credential(format!("Key derivation failed: {}", e)))?;
    Ok(key)
}

/// Encrypts `plaintext` under a key derived from `password`
pub fn seal(plaintext: &[u8], password: &str, params: KdfParams) -> VaultResult<String> {
    let mut salt = [0u8; SALT_LEN];
    let mut nonce = [0u8; NONCE_LEN];
    rand::thread_rng().fill(&mut salt);
    rand::thread_rng().fill(&mut nonce);

    let mut header = Vec::with_capacity(HEADER_LEN);
    header.extend_from_slice(SEAL_MAGIC);
    header.extend_from_slice(&params.memory_kib.to_le_bytes());
    header.extend_from_slice(&params.iterations.to_le_bytes());
    header.extend_from_slice(&params.parallelism.to_le_bytes());
    header.extend_from_slice(&salt);
    header.extend_from_slice(&nonce);

    let key = derive_key(password, &salt, params)?;
    let cipher = XChaCha20Poly1305::new_from_slice(&key[..])
        .map_err(|e| VaultError::credential(format!("Invalid key: {}", e)))?;

    let ciphertext = cipher
        .encrypt(
            XNonce::from_slice(&nonce),
            Payload {
                msg: plaintext,
                aad: &header,
            },
        )
        .map_err(|e| VaultError::credential(format!("Encryption failed: {}", e)))?;

    let mut out = header;
    out.extend_from_slice(&ciphertext);
    Ok(BASE64.encode(out))
}

/// Decrypts a value produced by [`seal`]
///
/// The key derivation cost recorded in the header must not exceed
/// `MAX_COST_FACTOR` times `local` in any dimension.
pub fn open(sealed: &str, password: &str, local: KdfParams) -> VaultResult<Zeroizing<Vec<u8>>> {
    let raw = BASE64
        .decode(sealed.trim())
        .map_err(|e| VaultError::credential(format!("Invalid sealed encoding: {}", e)))?;

    if raw.len() <= HEADER_LEN {
        return Err(VaultError::credential("Sealed value is truncated"));
    }
    let (header, ciphertext) = raw.split_at(HEADER_LEN);
    if &header[..SEAL_MAGIC.len()] != SEAL_MAGIC {
        return Err(VaultError::credential("Invalid sealed magic"));
    }

    let word = |at: usize| {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&header[at..at + 4]);
        u32::from_le_bytes(bytes)
    };
    let params = KdfParams {
        memory_kib: word(4),
        iterations: word(8),
        parallelism: word(12),
    };
    if !local.admits(params) || params.validate().is_err() {
        return Err(VaultError::credential("Invalid sealed key parameters"));
    }
    let salt = &header[16..16 + SALT_LEN];
    let nonce = &header[16 + SALT_LEN..HEADER_LEN];

    let key = derive_key(password, salt, params)?;
    let cipher = XChaCha20Poly1305::new_from_slice(&key[..])
        .map_err(|e| VaultError::credential(format!("Invalid key: {}", e)))?;

    let plaintext = cipher
        .decrypt(
            XNonce::from_slice(nonce),
            Payload {
                msg: ciphertext,
                aad: header,
            },
        )
        .map_err(|_| VaultError::credential("Invalid password or corrupted credentials"))?;

    Ok(Zeroizing::new(plaintext))
}
