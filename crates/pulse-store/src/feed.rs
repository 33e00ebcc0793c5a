use tokio::sync::broadcast;
use tracing::debug;

use pulse_core::events::{ChangeKind, ChangeNotice};
use pulse_core::ids::RecordId;

/// Push notification source for record-set changes.
///
/// Every successful insert/update/delete emits one notice. Delivery toward
/// subscribers is at-least-once in spirit: a lagged subscriber sees a
/// `Lagged` error and is expected to recompute once, which full-recompute
/// consumers tolerate.
#[derive(Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<ChangeNotice>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeNotice> {
        self.tx.subscribe()
    }

    /// Emit a change notice. A send error only means no subscriber is
    /// currently listening, which is not a failure of the mutation.
    pub fn emit(&self, kind: ChangeKind, record_id: RecordId) {
        let notice = ChangeNotice::new(kind, record_id);
        if self.tx.send(notice).is_err() {
            debug!("change notice emitted with no subscribers");
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(1024)
    }
}
