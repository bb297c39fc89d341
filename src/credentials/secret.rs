//! Reference credential object
//!
//! A typed bag of string values, optionally carrying the archive password.
//! Sealing serializes it to JSON and encrypts it with [`cipher::seal`].

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::credentials::cipher::{self, KdfParams};
use crate::error::{VaultError, VaultResult};
use crate::source::traits::Secret;
use crate::source::types::CipherText;

/// Plaintext shape inside a sealed value
#[derive(Serialize, Deserialize)]
struct CredentialsJson {
    kind: String,
    #[serde(default)]
    values: BTreeMap<String, String>,
    #[serde(default)]
    password: Option<String>,
}

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    kind: String,
    values: BTreeMap<String, String>,
    password: Option<String>,
    kdf: KdfParams,
}

impl Credentials {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            values: BTreeMap::new(),
            password: None,
            kdf: KdfParams::default(),
        }
    }

    /// Archive credentials: a "password" kind carrying the master password
    pub fn from_password(password: impl Into<String>) -> Self {
        Self::new("password").with_password(password)
    }

    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_kdf(mut self, kdf: KdfParams) -> Self {
        self.kdf = kdf;
        self
    }

    pub fn value(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Decrypts a sealed value back into credentials
    pub async fn from_secure_string(
        cipher_text: &CipherText,
        password: &str,
        kdf: KdfParams,
    ) -> VaultResult<Self> {
        let sealed = cipher_text.as_str().to_string();
        let password = password.to_string();

        tokio::task::spawn_blocking(move || {
            let plaintext = cipher::open(&sealed, &password, kdf)?;
            let parsed: CredentialsJson = serde_json::from_slice(&plaintext)
                .map_err(|e| VaultError::credential(format!("Invalid credentials payload: {}", e)))?;

            Ok(Self {
                kind: parsed.kind,
                values: parsed.values,
                password: parsed.password,
                kdf,
            })
        })
        .await
        .map_err(|e| VaultError::internal(format!("Decryption task failed: {}", e)))?
    }
}

impl Drop for Credentials {
    fn drop(&mut self) {
        for value in self.values.values_mut() {
            value.zeroize();
        }
        if let Some(password) = self.password.as_mut() {
            password.zeroize();
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("kind", &self.kind)
            .field("keys", &self.values.keys().collect::<Vec<_>>())
            .field("has_password", &self.password.is_some())
            .finish()
    }
}

#[async_trait]
impl Secret for Credentials {
    fn kind(&self) -> &str {
        &self.kind
    }

    fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    async fn to_secure_string(&self, password: &str) -> VaultResult<CipherText> {
        let mut plaintext = serde_json::to_vec(&CredentialsJson {
            kind: self.kind.clone(),
            values: self.values.clone(),
            password: self.password.clone(),
        })
        .map_err(|e| VaultError::internal(format!("Serialization error: {}", e)))?;

        let password = password.to_string();
        let kdf = self.kdf;

        let sealed = tokio::task::spawn_blocking(move || {
            let result = cipher::seal(&plaintext, &password, kdf);
            plaintext.zeroize();
            result
        })
        .await
        .map_err(|e| VaultError::internal(format!("Encryption task failed: {}", e)))??;

        Ok(CipherText::new(sealed))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
