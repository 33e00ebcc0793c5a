pub mod events;
pub mod ids;
pub mod records;
pub mod summary;

pub use events::{ChangeKind, ChangeNotice};
pub use ids::{RecordId, UserId};
pub use records::{StatusRecord, UserRecord};
pub use summary::StatusSummary;
