use serde::{Deserialize, Serialize};

use crate::ids::{RecordId, UserId};

/// A status-bearing record as persisted by the store.
///
/// `status` is a free-form category string; the live pipeline never
/// interprets it beyond grouping.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub id: RecordId,
    pub name: String,
    pub age: Option<i64>,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

/// A user profile record. Plain CRUD surface; user mutations do not feed
/// the live aggregate pipeline, which watches status records only.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub age: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}
