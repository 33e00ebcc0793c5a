use serde::{Deserialize, Serialize};

use crate::ids::RecordId;

/// What kind of mutation produced a change notice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
}

/// Notification that the record set changed.
///
/// Carried on the store's change feed. Consumers treat any notice as
/// invalidating the current aggregate and recompute from scratch; the
/// kind and record id exist for logging only.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChangeNotice {
    pub kind: ChangeKind,
    pub record_id: RecordId,
}

impl ChangeNotice {
    pub fn new(kind: ChangeKind, record_id: RecordId) -> Self {
        Self { kind, record_id }
    }
}
