//! Error types for subscriber storage operations

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    /// A contract violation at the API boundary (list operation on a hot
    /// field, wrong value type, malformed enum value). Rejected before
    /// any mutation is attempted.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
