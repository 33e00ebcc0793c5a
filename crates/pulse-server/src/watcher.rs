use std::sync::Arc;

use pulse_core::events::ChangeNotice;
use pulse_store::RecordRepo;
use tokio::sync::broadcast;

use crate::broadcast::Broadcaster;

/// Drives the live pipeline: one change notice in, one recompute + publish
/// out.
///
/// A single task owns the feed receiver and awaits each cycle to
/// completion, so no two recomputations ever overlap. The payload of a
/// notice is ignored; any change invalidates the whole aggregate and the
/// counts are recomputed from the store.
pub struct ChangeWatcher {
    repo: Arc<RecordRepo>,
    broadcaster: Broadcaster,
}

impl ChangeWatcher {
    pub fn new(repo: Arc<RecordRepo>, broadcaster: Broadcaster) -> Self {
        Self { repo, broadcaster }
    }

    /// Consume the feed until it closes. If the feed terminates the task
    /// exits without touching open connections; they simply receive no
    /// further frames. There is no automatic resubscription.
    pub fn start(self, mut rx: broadcast::Receiver<ChangeNotice>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(notice) => {
                        tracing::debug!(
                            kind = ?notice.kind,
                            record_id = %notice.record_id,
                            "change notice received"
                        );
                        self.cycle();
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        // Coalesced: one recompute covers everything missed.
                        tracing::warn!(skipped = n, "change feed lagged");
                        self.cycle();
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        tracing::error!("change feed closed, live updates stopped");
                        break;
                    }
                }
            }
        })
    }

    fn cycle(&self) {
        match self.repo.status_counts() {
            Ok(summary) => self.broadcaster.publish(&summary),
            Err(e) => {
                tracing::warn!(error = %e, "store unavailable, skipping publish cycle");
            }
        }
    }
}
