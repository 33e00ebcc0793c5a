use std::sync::Arc;

use pulse_core::summary::StatusSummary;
use tokio::sync::mpsc;

use crate::client::ClientRegistry;

/// Fans a computed summary out to every registered client.
///
/// One client's failure never aborts delivery to the rest. A closed queue
/// means the connection is gone, so the client is pruned; a full queue
/// means a slow consumer, so only this frame is dropped for it (the next
/// publish carries the latest aggregate anyway).
#[derive(Clone)]
pub struct Broadcaster {
    registry: Arc<ClientRegistry>,
}

impl Broadcaster {
    pub fn new(registry: Arc<ClientRegistry>) -> Self {
        Self { registry }
    }

    /// Serialize `summary` once and deliver it to all current clients.
    /// Zero registered clients is a no-op.
    pub fn publish(&self, summary: &StatusSummary) {
        let clients = self.registry.snapshot();
        if clients.is_empty() {
            return;
        }

        let frame = match serde_json::to_string(summary) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize summary");
                return;
            }
        };

        let mut delivered = 0usize;
        let mut pruned = 0usize;
        for (client_id, tx) in clients {
            match tx.try_send(frame.clone()) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!(client_id = %client_id, "send queue full, dropping frame");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    self.registry.unregister(&client_id);
                    pruned += 1;
                    tracing::info!(client_id = %client_id, "pruned disconnected client");
                }
            }
        }

        tracing::debug!(delivered, pruned, "published status summary");
    }
}
