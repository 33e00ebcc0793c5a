#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl StoreError {
    /// True when the store itself could not complete the query, as opposed
    /// to a per-record condition like `NotFound`.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Database(_) | Self::Io(_))
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}
