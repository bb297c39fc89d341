//! Source data types
//!
//! Records held by the registry, the descriptors produced by a marshaller and
//! the packet shape written to storage.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::source::traits::Secret;

/// Lifecycle state of a credential source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceStatus {
    Unlocked,
    Locked,
    Processing,
}

impl fmt::Display for SourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SourceStatus::Unlocked => "unlocked",
            SourceStatus::Locked => "locked",
            SourceStatus::Processing => "processing",
        };
        f.write_str(label)
    }
}

/// Encrypted credential material, as produced by [`Secret::to_secure_string`]
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CipherText(String);

impl CipherText {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for CipherText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CipherText({} bytes)", self.0.len())
    }
}

/// The two credential objects of a source, live or sealed
#[derive(Clone)]
pub enum SourceCredentials {
    /// Decrypted objects held in memory
    Live {
        source: Arc<dyn Secret>,
        archive: Arc<dyn Secret>,
    },
    /// Encrypted strings only
    Sealed {
        source: CipherText,
        archive: CipherText,
    },
}

impl SourceCredentials {
    pub fn is_live(&self) -> bool {
        matches!(self, SourceCredentials::Live { .. })
    }
}

impl fmt::Debug for SourceCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceCredentials::Live { source, archive } => f
                .debug_struct("Live")
                .field("source", &source.kind())
                .field("archive", &archive.kind())
                .finish(),
            SourceCredentials::Sealed { source, archive } => f
                .debug_struct("Sealed")
                .field("source", source)
                .field("archive", archive)
                .finish(),
        }
    }
}

/// One named credential source in the registry
#[derive(Debug, Clone)]
pub struct SourceRecord {
    pub name: String,
    /// Opaque source kind tag (e.g. "webdav", "dropbox")
    pub source_type: String,
    pub status: SourceStatus,
    pub credentials: SourceCredentials,
    /// Set while a locked record is being unlocked
    pub unlocking: bool,
}

impl SourceRecord {
    /// Builds an unlocked record from a marshalled descriptor
    pub fn unlocked(descriptor: SourceDescriptor) -> Self {
        Self {
            name: descriptor.name,
            source_type: descriptor.source_type,
            status: SourceStatus::Unlocked,
            credentials: SourceCredentials::Live {
                source: descriptor.source_credentials,
                archive: descriptor.archive_credentials,
            },
            unlocking: false,
        }
    }

    /// Builds a locked record from a stored packet
    pub fn locked(packet: SourcePacket) -> Self {
        Self {
            name: packet.name,
            source_type: packet.source_type,
            status: SourceStatus::Locked,
            credentials: SourceCredentials::Sealed {
                source: packet.source_credentials,
                archive: packet.archive_credentials,
            },
            unlocking: false,
        }
    }

    pub fn summary(&self) -> SourceSummary {
        SourceSummary {
            name: self.name.clone(),
            source_type: self.source_type.clone(),
            status: self.status,
        }
    }
}

/// Read-only view of a record, safe to hand to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceSummary {
    pub name: String,
    #[serde(rename = "type")]
    pub source_type: String,
    pub status: SourceStatus,
}

/// A source produced by a [`CredentialMarshaller`](crate::source::traits::CredentialMarshaller)
#[derive(Clone)]
pub struct SourceDescriptor {
    pub name: String,
    pub source_type: String,
    pub source_credentials: Arc<dyn Secret>,
    pub archive_credentials: Arc<dyn Secret>,
}

impl fmt::Debug for SourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceDescriptor")
            .field("name", &self.name)
            .field("source_type", &self.source_type)
            .finish_non_exhaustive()
    }
}

/// Raw credential input handed to the marshaller
#[derive(Clone)]
pub enum CredentialSpec {
    /// An already decrypted credential object
    Live(Arc<dyn Secret>),
    /// Ciphertext plus the password expected to open it
    Sealed { cipher: CipherText, password: String },
}

impl fmt::Debug for CredentialSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSpec::Live(secret) => f.debug_tuple("Live").field(&secret.kind()).finish(),
            CredentialSpec::Sealed { cipher, .. } => f
                .debug_struct("Sealed")
                .field("cipher", cipher)
                .finish_non_exhaustive(),
        }
    }
}

/// Persisted representation of one source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourcePacket {
    pub name: String,
    pub source_credentials: CipherText,
    pub archive_credentials: CipherText,
    #[serde(rename = "type")]
    pub source_type: String,
}

/// Notification broadcast after the registry changes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceEvent {
    SourcesUpdated,
    SourceLocked { name: String },
    SourceUnlocked { name: String },
    SourceRemoved { name: String },
}
