//! Source Manager
//!
//! Authoritative registry of credential sources and their lock state.
//! Every storage read/write goes through the persistence queue; status
//! check-and-set happens under the registry write lock.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, instrument, warn};

use crate::config::VaultConfig;
use crate::credentials::SealingMarshaller;
use crate::error::{VaultError, VaultResult};
use crate::persistence::protocol::{self, LiveSource, WrittenPacket};
use crate::persistence::{KeyEncoder, PersistenceQueue};
use crate::source::traits::{CredentialMarshaller, StorageBackend};
use crate::source::types::{
    CredentialSpec, SourceCredentials, SourceEvent, SourcePacket, SourceRecord, SourceStatus,
    SourceSummary,
};

type Registry = Arc<RwLock<HashMap<String, SourceRecord>>>;

/// Manages every registered credential source
pub struct SourceManager {
    records: Registry,
    storage: Arc<dyn StorageBackend>,
    marshaller: Arc<dyn CredentialMarshaller>,
    keys: KeyEncoder,
    queue: PersistenceQueue,
    events: broadcast::Sender<SourceEvent>,
}

impl SourceManager {
    const EVENT_CAPACITY: usize = 64;

    /// Creates a manager with the default storage key layout
    ///
    /// Must be called from within a tokio runtime: the persistence worker is
    /// spawned here.
    pub fn new(
        storage: Arc<dyn StorageBackend>,
        marshaller: Arc<dyn CredentialMarshaller>,
    ) -> Self {
        Self::with_keys(storage, marshaller, KeyEncoder::default())
    }

    pub fn with_keys(
        storage: Arc<dyn StorageBackend>,
        marshaller: Arc<dyn CredentialMarshaller>,
        keys: KeyEncoder,
    ) -> Self {
        let (events, _) = broadcast::channel(Self::EVENT_CAPACITY);
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
            storage,
            marshaller,
            keys,
            queue: PersistenceQueue::new(),
            events,
        }
    }

    /// Creates a manager using the reference marshaller and the configured keys
    pub fn from_config(config: &VaultConfig, storage: Arc<dyn StorageBackend>) -> VaultResult<Self> {
        config.kdf.validate()?;
        let keys = config.key_encoder()?;
        let marshaller = Arc::new(SealingMarshaller::new(config.kdf));
        Ok(Self::with_keys(storage, marshaller, keys))
    }

    /// Subscribes to registry change notifications
    pub fn subscribe(&self) -> broadcast::Receiver<SourceEvent> {
        self.events.subscribe()
    }

    pub fn keys(&self) -> &KeyEncoder {
        &self.keys
    }

    /// All registered sources, sorted by name
    pub async fn sources(&self) -> Vec<SourceSummary> {
        let records = self.records.read().await;
        let mut sources: Vec<SourceSummary> = records.values().map(SourceRecord::summary).collect();
        sources.sort_by(|a, b| a.name.cmp(&b.name));
        sources
    }

    /// Sources whose status is `Unlocked`, sorted by name
    pub async fn unlocked_sources(&self) -> Vec<SourceSummary> {
        self.sources()
            .await
            .into_iter()
            .filter(|s| s.status == SourceStatus::Unlocked)
            .collect()
    }

    /// Gets a full record, credentials included
    pub async fn source(&self, name: &str) -> Option<SourceRecord> {
        let records = self.records.read().await;
        records.get(name).cloned()
    }

    /// Registers one or more unlocked sources, then dehydrates
    ///
    /// A name already present fails the whole call, unless that record is
    /// being unlocked, in which case it is replaced.
    #[instrument(skip(self, source, archive), fields(source = %name))]
    pub async fn add_source(
        &self,
        name: &str,
        source: CredentialSpec,
        archive: CredentialSpec,
        initialize: bool,
    ) -> VaultResult<()> {
        let descriptors = self
            .marshaller
            .credentials_to_sources(name, source, archive, initialize)
            .await?;

        {
            let mut records = self.records.write().await;

            let duplicate = descriptors.iter().find(|descriptor| {
                records
                    .get(&descriptor.name)
                    .is_some_and(|existing| !existing.unlocking)
            });
            if let Some(descriptor) = duplicate {
                return Err(VaultError::duplicate_source(&descriptor.name));
            }

            for descriptor in descriptors {
                debug!(name = %descriptor.name, source_type = %descriptor.source_type, "source registered");
                records.insert(descriptor.name.clone(), SourceRecord::unlocked(descriptor));
            }
        }

        self.dehydrate().await?;
        self.notify(SourceEvent::SourcesUpdated);
        Ok(())
    }

    /// Locks an unlocked source
    ///
    /// Dehydrates every live source (this one included), then keeps only the
    /// sealed strings for this source. On failure the previous status is
    /// restored and the live credentials are kept.
    #[instrument(skip(self), fields(source = %name))]
    pub async fn lock(&self, name: &str) -> VaultResult<()> {
        let original = {
            let mut records = self.records.write().await;
            let record = records
                .get_mut(name)
                .ok_or_else(|| VaultError::not_found(name))?;

            if record.status != SourceStatus::Unlocked {
                return Err(VaultError::invalid_state(name, record.status));
            }

            let original = record.status;
            record.status = SourceStatus::Processing;
            original
        };

        match self.queue.enqueue(self.seal_task(name)).await {
            Ok(packet) => {
                {
                    let mut records = self.records.write().await;
                    match records.get_mut(name) {
                        Some(record) => *record = SourceRecord::locked(packet),
                        None => {
                            warn!("source vanished while locking");
                            return Err(VaultError::not_found(name));
                        }
                    }
                }

                info!("source locked");
                self.notify(SourceEvent::SourceLocked {
                    name: name.to_string(),
                });
                Ok(())
            }
            Err(err) => {
                let mut records = self.records.write().await;
                if let Some(record) = records.get_mut(name) {
                    record.status = original;
                }
                warn!(error = %err, "lock failed, status restored");
                Err(err)
            }
        }
    }

    /// Unlocks a locked source with its master password
    ///
    /// A failure leaves the source in `Processing` with its unlock marker
    /// set. Only `rehydrate` brings it back.
    #[instrument(skip(self, master_password), fields(source = %name))]
    pub async fn unlock(&self, name: &str, master_password: &str) -> VaultResult<()> {
        let (source, archive) = {
            let mut records = self.records.write().await;
            let record = records
                .get_mut(name)
                .ok_or_else(|| VaultError::not_found(name))?;

            if record.status != SourceStatus::Locked {
                return Err(VaultError::invalid_state(name, record.status));
            }

            let specs = match &record.credentials {
                SourceCredentials::Sealed { source, archive } => (
                    CredentialSpec::Sealed {
                        cipher: source.clone(),
                        password: master_password.to_string(),
                    },
                    CredentialSpec::Sealed {
                        cipher: archive.clone(),
                        password: master_password.to_string(),
                    },
                ),
                SourceCredentials::Live { .. } => {
                    return Err(VaultError::internal(format!(
                        "Locked source '{}' holds live credentials",
                        name
                    )))
                }
            };

            record.status = SourceStatus::Processing;
            record.unlocking = true;
            specs
        };

        if let Err(err) = self.add_source(name, source, archive, false).await {
            warn!(error = %err, "unlock failed, source left processing");
            return Err(err);
        }

        info!("source unlocked");
        self.notify(SourceEvent::SourceUnlocked {
            name: name.to_string(),
        });
        Ok(())
    }

    /// Removes a source that is not mid-transition, then dehydrates
    #[instrument(skip(self), fields(source = %name))]
    pub async fn remove_source(&self, name: &str) -> VaultResult<()> {
        {
            let mut records = self.records.write().await;
            let record = records.get(name).ok_or_else(|| VaultError::not_found(name))?;
            if record.status == SourceStatus::Processing {
                return Err(VaultError::invalid_state(name, record.status));
            }
            records.remove(name);
        }

        self.dehydrate().await?;
        info!("source removed");
        self.notify(SourceEvent::SourceRemoved {
            name: name.to_string(),
        });
        Ok(())
    }

    /// Replaces the registry with the locked sources found in storage
    #[instrument(skip(self))]
    pub async fn rehydrate(&self) -> VaultResult<()> {
        self.records.write().await.clear();

        let storage = Arc::clone(&self.storage);
        let keys = self.keys.clone();
        let packets = self
            .queue
            .enqueue(async move { protocol::rehydrate(storage.as_ref(), &keys).await })
            .await?;

        let count = packets.len();
        {
            let mut records = self.records.write().await;
            for packet in packets {
                records.insert(packet.name.clone(), SourceRecord::locked(packet));
            }
        }

        info!(sources = count, "sources rehydrated");
        self.notify(SourceEvent::SourcesUpdated);
        Ok(())
    }

    /// Writes every live source to storage and rewrites the collection index
    #[instrument(skip(self))]
    pub async fn dehydrate(&self) -> VaultResult<()> {
        let written = self.queue.enqueue(self.dehydrate_task()).await?;
        info!(packets = written.len(), "sources dehydrated");
        Ok(())
    }

    /// Storage task: snapshot live sources when the task runs, then persist them
    fn dehydrate_task(&self) -> impl Future<Output = VaultResult<Vec<WrittenPacket>>> + Send + 'static {
        let records = Arc::clone(&self.records);
        let storage = Arc::clone(&self.storage);
        let keys = self.keys.clone();

        async move {
            let live = {
                let records = records.read().await;
                live_sources(&records)
            };
            protocol::dehydrate(storage.as_ref(), &keys, &live).await
        }
    }

    /// Storage task for `lock`: full dehydration, returning this source's packet
    fn seal_task(&self, name: &str) -> impl Future<Output = VaultResult<SourcePacket>> + Send + 'static {
        let dehydrate = self.dehydrate_task();
        let name = name.to_string();

        async move {
            dehydrate
                .await?
                .into_iter()
                .find(|written| written.packet.name == name)
                .map(|written| written.packet)
                .ok_or_else(|| VaultError::not_found(name))
        }
    }

    fn notify(&self, event: SourceEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

/// Every record still holding live credentials, sorted by name
///
/// Includes a record being locked: its status is `Processing` but its
/// credentials are still live.
fn live_sources(records: &HashMap<String, SourceRecord>) -> Vec<LiveSource> {
    let mut live: Vec<LiveSource> = records
        .values()
        .filter_map(|record| match &record.credentials {
            SourceCredentials::Live { source, archive } => Some(LiveSource {
                name: record.name.clone(),
                source_type: record.source_type.clone(),
                source: Arc::clone(source),
                archive: Arc::clone(archive),
            }),
            SourceCredentials::Sealed { .. } => None,
        })
        .collect();
    live.sort_by(|a, b| a.name.cmp(&b.name));
    live
}
