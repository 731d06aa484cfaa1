//! Engine error types

use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Error, Debug)]
pub enum EngineError {
    /// Work-history date that could not be parsed. Recovered inside the
    /// overlap estimator and never returned to callers.
    #[error("Malformed date input: {0:?}")]
    MalformedDateInput(String),

    /// Level with no entry in the tier table for its dimension family
    #[error("Level {level} is out of range for dimension '{dimension}'")]
    OutOfRangeLevel { dimension: String, level: i32 },

    #[error("Unknown dimension: {0}")]
    UnknownDimension(String),

    #[error("Invalid review: {0}")]
    InvalidReview(String),

    #[error("Reviewer and reviewee never worked at the same company at the same time")]
    NoSharedEmployment,

    #[error("Person not found: {0}")]
    PersonNotFound(String),

    /// Storage read or connection failure. Not retried here.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(#[from] sqlx::Error),

    /// Write failure inside a transaction. The transaction has been rolled
    /// back by the time this is returned.
    #[error("Transaction aborted and rolled back: {0}")]
    TransactionAborted(#[source] sqlx::Error),

    #[error("Taxonomy error: {0}")]
    Taxonomy(String),
}

impl EngineError {
    /// Re-tag a storage failure that happened after a transaction began.
    pub fn aborted(self) -> Self {
        match self {
            EngineError::StorageUnavailable(source) => EngineError::TransactionAborted(source),
            other => other,
        }
    }
}
