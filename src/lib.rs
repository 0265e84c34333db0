//! # mensabot-core
//!
//! Core library for a canteen-menu notification bot. It keeps remote
//! menu data warm, keeps subscriber preferences durable and consistent,
//! and delivers the daily menu notification at most once per subscriber
//! per day, across process restarts and multiple running instances.
//!
//! Three components, each with pluggable persistence (exclusive files
//! for single-instance deployments, Postgres/Redis when instances share
//! state):
//!
//! - [`menu_cache::MenuCache`]: TTL-keyed cache over paginated fetches
//!   from the remote menu provider.
//! - [`user_store::UserStore`]: per-subscriber preferences with a hybrid
//!   hot-fields/settings-bag schema.
//! - [`push_scheduler::PushScheduler`]: background loop sweeping the due
//!   window against a durable dispatch marker.
//!
//! The command layer, localization, and the messaging transport are
//! external collaborators injected at the boundaries.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mensabot_core::prelude::*;
//! use std::sync::Arc;
//!
//! # struct Transport;
//! # #[async_trait::async_trait]
//! # impl MenuDelivery for Transport {
//! #     async fn deliver(&self, _: UserId, _: CanteenId, _: bool) -> Result<(), DeliveryError> { Ok(()) }
//! # }
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load()?;
//!     let core = BotCore::new(config).await?;
//!
//!     core.users().save_favorite(12345, 279).await?;
//!
//!     let scheduler = core.scheduler(Arc::new(Transport));
//!     scheduler.start().await?;
//!     // ... run the command layer ...
//!     scheduler.stop().await;
//!     Ok(())
//! }
//! ```

pub mod core;
pub mod errors;
pub mod migration;
pub mod prelude;

// Re-export the main public types for convenience
pub use crate::core::BotCore;
pub use crate::errors::BotCoreError;

// Re-export centralized config
pub use config::{AppConfig, Backend, CacheConfig, DatabaseConfig, PushConfig, StorageConfig};

// Re-export the component crates
pub use menu_cache;
pub use push_scheduler;
pub use user_store;

// Re-export external dependencies used in the public API
pub use async_trait;
pub use sqlx;
