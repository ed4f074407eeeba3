use thiserror::Error;
use crate::repo::StoreError;

/// Failure of a scheduling or counting operation
///
/// "Nothing left to annotate" is not an error; operations report it as
/// `None` or an empty count.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("task not found: {0}")]
    TaskNotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("request cancelled")]
    Cancelled,

    #[error("request deadline exceeded")]
    DeadlineExceeded,
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;
