use thiserror::Error;

/// Failure reported by the persistence layer
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("image not found: {0}")]
    ImageNotFound(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
