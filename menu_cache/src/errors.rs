//! Error types for cache operations
//!
//! This module defines all error types that can occur
//! during cache operations and remote fetches.

use thiserror::Error;

/// Errors raised by the injected remote fetch function.
///
/// These always propagate to the caller unmodified; the cache never
/// retries or swallows a failed fetch.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("remote provider unreachable: {0}")]
    Unreachable(String),

    #[error("malformed page in remote response: {0}")]
    MalformedPage(String),
}

/// Cache system errors
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("remote fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Redis connection error: {0}")]
    ConnectionError(#[from] redis::RedisError),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
