use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use ltm_core::traits::VectorProvider;

/// Background replication into secondary providers.
///
/// Tasks are tracked rather than abandoned: every spawn registers with
/// the tracker, and `shutdown` cancels outstanding work and waits for
/// it to drain, so replication can never outlive the process. Failures
/// are logged and dropped; a secondary falling behind must not surface
/// in the originating store call.
pub(crate) struct ReplicationSet {
    tracker: TaskTracker,
    cancel: CancellationToken,
    timeout: Duration,
}

impl ReplicationSet {
    pub fn new(timeout: Duration) -> Self {
        Self {
            tracker: TaskTracker::new(),
            cancel: CancellationToken::new(),
            timeout,
        }
    }

    pub fn replicate_store(
        &self,
        name: String,
        provider: Arc<dyn VectorProvider>,
        content: String,
        embedding: Vec<f32>,
        metadata: HashMap<String, Value>,
    ) {
        let cancel = self.cancel.clone();
        let timeout = self.timeout;
        self.tracker.spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!(provider = %name, "replication cancelled by shutdown");
                }
                result = tokio::time::timeout(timeout, provider.store(&content, &embedding, metadata)) => {
                    match result {
                        Ok(Ok(id)) => {
                            tracing::debug!(provider = %name, memory_id = %id, "replicated store");
                        }
                        Ok(Err(e)) => {
                            tracing::warn!(provider = %name, error = %e, "replication store failed");
                        }
                        Err(_) => {
                            tracing::warn!(provider = %name, "replication store timed out");
                        }
                    }
                }
            }
        });
    }

    pub fn replicate_delete(&self, name: String, provider: Arc<dyn VectorProvider>, id: String) {
        let cancel = self.cancel.clone();
        let timeout = self.timeout;
        self.tracker.spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!(provider = %name, "delete replication cancelled by shutdown");
                }
                result = tokio::time::timeout(timeout, provider.delete(&id)) => {
                    match result {
                        Ok(Ok(_)) => {}
                        Ok(Err(e)) => {
                            tracing::warn!(provider = %name, memory_id = %id, error = %e, "replication delete failed");
                        }
                        Err(_) => {
                            tracing::warn!(provider = %name, memory_id = %id, "replication delete timed out");
                        }
                    }
                }
            }
        });
    }

    /// Number of replication tasks not yet finished.
    pub fn outstanding(&self) -> usize {
        self.tracker.len()
    }

    /// Waits for in-flight replication to finish without cancelling it.
    pub async fn drain(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    /// Cancels outstanding replications and waits for every task to
    /// finish. Idempotent.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        self.tracker.close();
        self.tracker.wait().await;
    }
}
