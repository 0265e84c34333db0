//! Error types for the bot core
//!
//! This module contains the error type returned by coordinator-level
//! operations; component errors are re-exported from their crates.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BotCoreError {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("database connection error: {0}")]
    DatabaseConnection(#[from] sqlx::Error),

    #[error("cache error: {0}")]
    Cache(#[from] menu_cache::CacheError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("operation requires the shared backend, but storage.backend is \"file\"")]
    NoDatabase,
}
