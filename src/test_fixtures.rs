//! Test doubles for the collaborator traits.
//!
//! `FakeSecret` "encrypts" to a readable `sealed[<password>]<kind>|<value>`
//! string and `FakeMarshaller` reverses it, rejecting a mismatched password.
//! `RecordingStorage` logs every call and can fail, delay or park writes.

use std::any::Any;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{watch, Notify};

use crate::credentials::KdfParams;
use crate::error::{VaultError, VaultResult};
use crate::persistence::LiveSource;
use crate::source::traits::{CredentialMarshaller, Secret, StorageBackend};
use crate::source::types::{CipherText, CredentialSpec, SourceDescriptor};
use crate::storage::MemoryStorage;

/// Cheapest argon2 parameters, for tests only
pub const FAST_KDF: KdfParams = KdfParams {
    memory_kib: 8,
    iterations: 1,
    parallelism: 1,
};

#[derive(Debug, Clone)]
pub struct FakeSecret {
    kind: String,
    value: String,
    password: Option<String>,
}

impl FakeSecret {
    pub fn new(kind: &str, value: &str, password: Option<&str>) -> Self {
        Self {
            kind: kind.to_string(),
            value: value.to_string(),
            password: password.map(str::to_string),
        }
    }
}

#[async_trait]
impl Secret for FakeSecret {
    fn kind(&self) -> &str {
        &self.kind
    }

    fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    async fn to_secure_string(&self, password: &str) -> VaultResult<CipherText> {
        Ok(CipherText::new(format!(
            "sealed[{}]{}|{}",
            password, self.kind, self.value
        )))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn source_secret(source_type: &str, name: &str) -> FakeSecret {
    FakeSecret::new(source_type, &format!("source:{}", name), None)
}

fn archive_secret(name: &str, password: &str) -> FakeSecret {
    FakeSecret::new("password", &format!("archive:{}", name), Some(password))
}

pub fn live_source(name: &str, source_type: &str, password: &str) -> LiveSource {
    LiveSource {
        name: name.to_string(),
        source_type: source_type.to_string(),
        source: Arc::new(source_secret(source_type, name)),
        archive: Arc::new(archive_secret(name, password)),
    }
}

/// Live source and archive specs for `add_source`
pub fn fake_specs(source_type: &str, name: &str, password: &str) -> (CredentialSpec, CredentialSpec) {
    (
        CredentialSpec::Live(Arc::new(source_secret(source_type, name))),
        CredentialSpec::Live(Arc::new(archive_secret(name, password))),
    )
}

/// Marshaller over [`FakeSecret`]
///
/// `extra` names are emitted as additional descriptors sharing the same
/// credentials, to exercise multi-source specs.
#[derive(Debug, Clone, Default)]
pub struct FakeMarshaller {
    extra: Vec<String>,
}

impl FakeMarshaller {
    pub fn with_extra(extra: Vec<String>) -> Self {
        Self { extra }
    }

    fn open(spec: CredentialSpec) -> VaultResult<Arc<dyn Secret>> {
        match spec {
            CredentialSpec::Live(secret) => Ok(secret),
            CredentialSpec::Sealed { cipher, password } => {
                let rest = cipher
                    .as_str()
                    .strip_prefix(&format!("sealed[{}]", password))
                    .ok_or_else(|| VaultError::credential("Invalid password"))?;
                let (kind, value) = rest
                    .split_once('|')
                    .ok_or_else(|| VaultError::credential("Malformed fake ciphertext"))?;
                let password = (kind == "password").then_some(password.as_str());
                Ok(Arc::new(FakeSecret::new(kind, value, password)))
            }
        }
    }
}

#[async_trait]
impl CredentialMarshaller for FakeMarshaller {
    async fn credentials_to_sources(
        &self,
        name: &str,
        source: CredentialSpec,
        archive: CredentialSpec,
        _initialize: bool,
    ) -> VaultResult<Vec<SourceDescriptor>> {
        let source = Self::open(source)?;
        let archive = Self::open(archive)?;

        let names = std::iter::once(name.to_string()).chain(self.extra.iter().cloned());
        Ok(names
            .map(|name| SourceDescriptor {
                name,
                source_type: source.kind().to_string(),
                source_credentials: Arc::clone(&source),
                archive_credentials: Arc::clone(&archive),
            })
            .collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageOp {
    Get(String),
    Set(String),
}

/// Memory storage that records calls and can misbehave on demand
pub struct RecordingStorage {
    inner: MemoryStorage,
    ops: Mutex<Vec<StorageOp>>,
    fail_writes: AtomicBool,
    latency: Mutex<Duration>,
    hold: watch::Sender<bool>,
    held: Notify,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl RecordingStorage {
    pub fn new() -> Self {
        let (hold, _) = watch::channel(false);
        Self {
            inner: MemoryStorage::new(),
            ops: Mutex::new(Vec::new()),
            fail_writes: AtomicBool::new(false),
            latency: Mutex::new(Duration::ZERO),
            hold,
            held: Notify::new(),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn ops(&self) -> Vec<StorageOp> {
        self.ops.lock().expect("ops lock").clone()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().expect("latency lock") = latency;
    }

    /// Parks every write until called again with `false`
    pub fn hold_writes(&self, hold: bool) {
        self.hold.send_replace(hold);
    }

    /// Resolves once a write is parked
    pub async fn wait_for_held_write(&self) {
        self.held.notified().await;
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn enter(&self, op: StorageOp) {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        self.ops.lock().expect("ops lock").push(op);

        let latency = *self.latency.lock().expect("latency lock");
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }

    fn leave(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Default for RecordingStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageBackend for RecordingStorage {
    async fn get_value(&self, key: &str) -> VaultResult<String> {
        self.enter(StorageOp::Get(key.to_string())).await;
        let result = self.inner.get_value(key).await;
        self.leave();
        result
    }

    async fn set_value(&self, key: &str, value: &str) -> VaultResult<()> {
        self.enter(StorageOp::Set(key.to_string())).await;

        let parked = *self.hold.borrow();
        if parked {
            let mut released = self.hold.subscribe();
            self.held.notify_one();
            let _ = released.wait_for(|hold| !*hold).await;
        }

        let result = if self.fail_writes.load(Ordering::SeqCst) {
            Err(VaultError::storage(format!("Write to '{}' refused", key)))
        } else {
            self.inner.set_value(key, value).await
        };
        self.leave();
        result
    }
}
