//! Sealing Marshaller
//!
//! [`CredentialMarshaller`] over [`Credentials`]: live specs pass through,
//! sealed specs are opened with their password. Always yields one descriptor
//! named after the requested source.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::credentials::cipher::KdfParams;
use crate::credentials::secret::Credentials;
use crate::error::{VaultError, VaultResult};
use crate::source::traits::{CredentialMarshaller, Secret};
use crate::source::types::{CredentialSpec, SourceDescriptor};

#[derive(Debug, Clone, Default)]
pub struct SealingMarshaller {
    kdf: KdfParams,
}

impl SealingMarshaller {
    pub fn new(kdf: KdfParams) -> Self {
        Self { kdf }
    }

    async fn resolve(&self, spec: CredentialSpec) -> VaultResult<Arc<dyn Secret>> {
        match spec {
            CredentialSpec::Live(secret) => Ok(secret),
            CredentialSpec::Sealed { cipher, password } => {
                let mut credentials =
                    Credentials::from_secure_string(&cipher, &password, self.kdf).await?;
                if credentials.password().is_none() && credentials.kind() == "password" {
                    credentials = credentials.with_password(password);
                }
                Ok(Arc::new(credentials))
            }
        }
    }
}

#[async_trait]
impl CredentialMarshaller for SealingMarshaller {
    #[instrument(skip(self, source, archive))]
    async fn credentials_to_sources(
        &self,
        name: &str,
        source: CredentialSpec,
        archive: CredentialSpec,
        initialize: bool,
    ) -> VaultResult<Vec<SourceDescriptor>> {
        let source = self.resolve(source).await?;
        let archive = self.resolve(archive).await?;

        if archive.password().is_none() {
            return Err(VaultError::credential(format!(
                "Archive credentials for '{}' carry no password",
                name
            )));
        }
        if initialize {
            debug!(source_type = %source.kind(), "initializing new archive");
        }

        Ok(vec![SourceDescriptor {
            name: name.to_string(),
            source_type: source.kind().to_string(),
            source_credentials: source,
            archive_credentials: archive,
        }])
    }
}
