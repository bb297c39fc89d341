//! Dehydration / Rehydration
//!
//! Dehydration seals every live source into a packet, writes the packets and
//! then overwrites the collection index with exactly the keys just written.
//! Rehydration reads the index back and parses each packet. It never decrypts.

use std::sync::Arc;

use futures::future::try_join_all;
use tracing::{debug, instrument};

use crate::error::{VaultError, VaultResult};
use crate::persistence::keys::{join_index, split_index, KeyEncoder};
use crate::source::traits::{Secret, StorageBackend};
use crate::source::types::SourcePacket;

/// Snapshot of a source whose credentials are live
#[derive(Clone)]
pub struct LiveSource {
    pub name: String,
    pub source_type: String,
    pub source: Arc<dyn Secret>,
    pub archive: Arc<dyn Secret>,
}

/// A packet together with the key it was written under
#[derive(Debug, Clone)]
pub struct WrittenPacket {
    pub key: String,
    pub packet: SourcePacket,
}

/// Encrypts both credential objects with the archive password
pub async fn seal(source: &LiveSource) -> VaultResult<SourcePacket> {
    let password = source.archive.password().ok_or_else(|| {
        VaultError::credential(format!(
            "Archive credentials of '{}' carry no password",
            source.name
        ))
    })?;

    let (source_credentials, archive_credentials) = tokio::try_join!(
        source.source.to_secure_string(password),
        source.archive.to_secure_string(password),
    )?;

    Ok(SourcePacket {
        name: source.name.clone(),
        source_credentials,
        archive_credentials,
        source_type: source.source_type.clone(),
    })
}

/// Writes one packet per live source, then the collection index
///
/// The index lists only the keys written by this call. Keys of sources that
/// are not live at this point are dropped from it.
#[instrument(skip_all, fields(sources = sources.len()))]
pub async fn dehydrate(
    storage: &dyn StorageBackend,
    keys: &KeyEncoder,
    sources: &[LiveSource],
) -> VaultResult<Vec<WrittenPacket>> {
    let packets = try_join_all(sources.iter().map(seal)).await?;

    let mut written = Vec::with_capacity(packets.len());
    for packet in packets {
        let key = keys.key(&packet.source_type, &packet.name);
        let value = serde_json::to_string(&packet)
            .map_err(|e| VaultError::internal(format!("Serialization error: {}", e)))?;

        storage.set_value(&key, &value).await?;
        debug!(source = %packet.name, key = %key, "packet written");
        written.push(WrittenPacket { key, packet });
    }

    let index: Vec<String> = written.iter().map(|w| w.key.clone()).collect();
    storage.set_value(keys.index_key(), &join_index(&index)).await?;
    debug!(keys = index.len(), "collection index written");

    Ok(written)
}

/// Reads the collection index and every packet it references
#[instrument(skip_all)]
pub async fn rehydrate(
    storage: &dyn StorageBackend,
    keys: &KeyEncoder,
) -> VaultResult<Vec<SourcePacket>> {
    let index = storage.get_value(keys.index_key()).await?;

    let mut packets = Vec::new();
    for key in split_index(&index) {
        let raw = storage.get_value(&key).await?;
        let packet: SourcePacket = serde_json::from_str(&raw)
            .map_err(|e| VaultError::parse(format!("Malformed packet at '{}': {}", key, e)))?;
        debug!(source = %packet.name, key = %key, "packet read");
        packets.push(packet);
    }

    Ok(packets)
}
