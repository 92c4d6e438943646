use thiserror::Error;

pub type IndexerResult<T> = std::result::Result<T, IndexerError>;

/// Failures at the store and contract-query boundaries of the projection.
#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("Store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("Contract call error: {0}")]
    Contract(String),

    #[error("Event decode error: {0}")]
    Decode(String),

    #[error("Invalid stored value: {0}")]
    InvalidValue(String),
}
