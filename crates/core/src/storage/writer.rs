use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

use crate::errors::LedgerError;

use super::gateway::PersistenceGateway;

enum Job {
    Save { key: String, payload: String },
    Flush(oneshot::Sender<Option<LedgerError>>),
}

/// Single-writer persistence queue.
///
/// Mutations apply to the in-memory ledger synchronously and enqueue a full
/// snapshot here; a background task issues gateway saves strictly in
/// submission order, so two in-flight commands can never interleave their
/// writes. The in-memory state is authoritative the instant a mutation
/// returns — a failed save is logged and leaves memory ahead of the
/// persisted copy until the next successful snapshot catches up.
///
/// Must be spawned from within a Tokio runtime.
pub struct SnapshotWriter {
    tx: mpsc::UnboundedSender<Job>,
}

impl SnapshotWriter {
    /// Spawn the writer task over the given gateway.
    pub fn spawn(gateway: Arc<dyn PersistenceGateway>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            // Holds the most recent save failure until a flush reports it
            // or a later save succeeds.
            let mut last_error: Option<LedgerError> = None;

            while let Some(job) = rx.recv().await {
                match job {
                    Job::Save { key, payload } => {
                        match gateway.save(&key, &payload).await {
                            Ok(()) => last_error = None,
                            Err(e) => {
                                tracing::warn!(
                                    gateway = gateway.name(),
                                    error = %e,
                                    "snapshot save failed; in-memory ledger is ahead of the persisted copy"
                                );
                                last_error = Some(e);
                            }
                        }
                    }
                    Job::Flush(ack) => {
                        // Receiver may have given up; nothing to do then.
                        let _ = ack.send(last_error.take());
                    }
                }
            }
        });

        Self { tx }
    }

    /// Queue a snapshot for persistence. Non-blocking; never waits on the
    /// gateway.
    pub fn enqueue(&self, key: &str, payload: String) -> Result<(), LedgerError> {
        self.tx
            .send(Job::Save {
                key: key.to_string(),
                payload,
            })
            .map_err(|_| LedgerError::PersistenceFailure("snapshot writer task stopped".into()))
    }

    /// Wait until every snapshot enqueued so far has been written, and
    /// surface the most recent save failure, if any.
    pub async fn flush(&self) -> Result<(), LedgerError> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.tx
            .send(Job::Flush(ack_tx))
            .map_err(|_| LedgerError::PersistenceFailure("snapshot writer task stopped".into()))?;

        match ack_rx.await {
            Ok(Some(e)) => Err(e),
            Ok(None) => Ok(()),
            Err(_) => Err(LedgerError::PersistenceFailure(
                "snapshot writer task stopped".into(),
            )),
        }
    }
}
