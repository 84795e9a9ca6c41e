use thiserror::Error;

/// Errors from the Redis-backed game store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Submission rejected before anything was written
    #[error("{0}")]
    InvalidSubmission(String),

    /// Another writer held the user's submission lock for too long
    #[error("{0}")]
    Busy(String),
}

pub type StoreResult<T> = Result<T, StoreError>;
