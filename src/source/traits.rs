//! Collaborator traits
//!
//! The registry never touches cryptography or a concrete storage engine.
//! It talks to three capabilities instead: a [`Secret`] that can seal itself,
//! a [`CredentialMarshaller`] that turns raw specs into live sources, and a
//! [`StorageBackend`] that stores strings by key.

use std::any::Any;

use async_trait::async_trait;

use crate::error::VaultResult;
use crate::source::types::{CipherText, CredentialSpec, SourceDescriptor};

/// A live credential object
///
/// Implementations hold decrypted material and know how to encrypt it.
/// The inverse operation belongs to the marshaller, which receives the
/// ciphertext back through [`CredentialSpec::Sealed`].
#[async_trait]
pub trait Secret: Send + Sync {
    /// Kind tag of this credential (e.g. "webdav", "password")
    fn kind(&self) -> &str;

    /// Password protecting the archive, when this object carries one
    fn password(&self) -> Option<&str>;

    /// Encrypts this credential object with the given password
    async fn to_secure_string(&self, password: &str) -> VaultResult<CipherText>;

    /// Allows callers that know the concrete type to inspect it
    fn as_any(&self) -> &dyn Any;
}

/// Converts raw credential specs into source descriptors
#[async_trait]
pub trait CredentialMarshaller: Send + Sync {
    /// Produces one or more descriptors for the named source
    ///
    /// Sealed specs are decrypted with their password; a wrong password must
    /// fail with `VaultError::Credential`. `initialize` is forwarded untouched
    /// from `add_source` and signals that the archive is being created.
    async fn credentials_to_sources(
        &self,
        name: &str,
        source: CredentialSpec,
        archive: CredentialSpec,
        initialize: bool,
    ) -> VaultResult<Vec<SourceDescriptor>>;
}

/// Key-value storage for packets and the collection index
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Reads a value; a missing key is a `VaultError::Storage`
    async fn get_value(&self, key: &str) -> VaultResult<String>;

    async fn set_value(&self, key: &str, value: &str) -> VaultResult<()>;
}
