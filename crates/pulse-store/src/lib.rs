pub mod database;
pub mod error;
pub mod feed;
pub mod records;
pub mod schema;
pub mod users;

pub use database::Database;
pub use error::StoreError;
pub use feed::ChangeFeed;
pub use records::{RecordPatch, RecordRepo};
pub use users::{UserPatch, UserRepo};
