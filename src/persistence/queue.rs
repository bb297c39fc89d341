//! Persistence Queue
//!
//! Single-worker FIFO that runs every storage task one at a time, in
//! submission order. Callers await the result of their own task through a
//! oneshot reply.

use std::future::Future;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, Instrument};

use crate::error::{VaultError, VaultResult};

type Job = BoxFuture<'static, ()>;

/// Handle to the persistence worker
///
/// Clones share the same worker. The worker stops once every handle is
/// dropped and the backlog is drained.
#[derive(Clone)]
pub struct PersistenceQueue {
    tx: mpsc::UnboundedSender<Job>,
}

impl PersistenceQueue {
    /// Spawns the worker on the current tokio runtime
    pub fn new() -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();

        tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                job.await;
            }
            debug!("persistence queue drained");
        });

        Self { tx }
    }

    /// Enqueues a task and returns a future resolving to its result
    ///
    /// The task is submitted before this returns, so submission order is call
    /// order. It does not start before every previously submitted task has
    /// finished.
    pub fn enqueue<F, T>(&self, task: F) -> impl Future<Output = VaultResult<T>> + Send + 'static
    where
        F: Future<Output = VaultResult<T>> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let span = tracing::Span::current();

        let job = async move {
            let result = task.await;
            let _ = reply_tx.send(result);
        }
        .instrument(span)
        .boxed();

        let submitted = self
            .tx
            .send(job)
            .map_err(|_| VaultError::internal("Persistence queue is closed"));

        async move {
            submitted?;
            reply_rx
                .await
                .map_err(|_| VaultError::internal("Persistence task dropped before completing"))?
        }
    }
}

impl Default for PersistenceQueue {
    fn default() -> Self {
        Self::new()
    }
}
