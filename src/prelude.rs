//! Convenience re-exports for common bot-core usage
//!
//! ```rust
//! use mensabot_core::prelude::*;
//! ```

pub use crate::core::BotCore;
pub use crate::errors::BotCoreError;

pub use config::{AppConfig, Backend, CacheConfig, DatabaseConfig, PushConfig, StorageConfig};

pub use menu_cache::prelude::*;
pub use push_scheduler::prelude::*;
pub use user_store::prelude::*;

// Common external dependencies
pub use async_trait::async_trait;
pub use sqlx::PgPool;
