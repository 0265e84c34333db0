//! Core bot coordinator
//!
//! [`BotCore`] wires the configuration to concrete persistence backends
//! and hands out the owned components. Everything is explicit dependency
//! injection; there are no process-wide singletons, so the cache, store
//! and scheduler stay independently constructible in tests.

use crate::errors::BotCoreError;
use config::{AppConfig, Backend};
use menu_cache::{CacheStore, FileCacheStore, MenuCache, SharedCacheStore};
use push_scheduler::{FilePushMarker, MarkerStore, MenuDelivery, PgPushMarker, PushScheduler};
use sqlx::PgPool;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use user_store::{FileUserBackend, PgUserBackend, UserBackend, UserStore};

/// File names inside `storage.data_dir` for the file-backed form.
const CACHE_FILE: &str = "mensacache.json";
const USERS_FILE: &str = "users.json";
const MARKER_FILE: &str = "lastpush.txt";

pub struct BotCore {
    config: AppConfig,
    pool: Option<PgPool>,
    menu_cache: Arc<MenuCache>,
    users: Arc<UserStore>,
    marker: Arc<dyn MarkerStore>,
}

impl BotCore {
    /// Build all components for the configured persistence form.
    pub async fn new(config: AppConfig) -> Result<Self, BotCoreError> {
        config.validate()?;

        let (pool, cache_store, user_backend, marker) = match config.storage.backend {
            Backend::File => {
                let data_dir = Path::new(&config.storage.data_dir);
                std::fs::create_dir_all(data_dir)?;

                let cache_store: Arc<dyn CacheStore> =
                    Arc::new(FileCacheStore::open(data_dir.join(CACHE_FILE)));
                let user_backend: Arc<dyn UserBackend> =
                    Arc::new(FileUserBackend::open(data_dir.join(USERS_FILE)));
                let marker: Arc<dyn MarkerStore> =
                    Arc::new(FilePushMarker::new(data_dir.join(MARKER_FILE)));
                (None, cache_store, user_backend, marker)
            }
            Backend::Shared => {
                let pool = Self::connect(&config).await?;

                let cache_store: Arc<dyn CacheStore> =
                    Arc::new(SharedCacheStore::new(&config.cache)?);
                let user_backend: Arc<dyn UserBackend> =
                    Arc::new(PgUserBackend::new(pool.clone()));
                let marker: Arc<dyn MarkerStore> = Arc::new(PgPushMarker::new(pool.clone()));
                (Some(pool), cache_store, user_backend, marker)
            }
        };

        let users = Arc::new(UserStore::new(
            user_backend,
            Duration::from_millis(config.storage.mirror_ttl_ms),
            config.push.silent_by_default,
        ));

        Ok(Self {
            pool,
            menu_cache: Arc::new(MenuCache::new(cache_store)),
            users,
            marker,
            config,
        })
    }

    async fn connect(config: &AppConfig) -> Result<PgPool, BotCoreError> {
        let mut pool_options = sqlx::postgres::PgPoolOptions::new()
            .max_connections(config.database.max_connections)
            .min_connections(config.database.min_connections)
            .idle_timeout(Duration::from_secs(config.database.idle_timeout_seconds));

        if config.database.max_lifetime_seconds > 0 {
            pool_options = pool_options
                .max_lifetime(Duration::from_secs(config.database.max_lifetime_seconds));
        }

        Ok(pool_options
            .connect(&config.database.connection_string())
            .await?)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Database pool, present only for the shared backend.
    pub fn pool(&self) -> Option<&PgPool> {
        self.pool.as_ref()
    }

    pub fn menu_cache(&self) -> &Arc<MenuCache> {
        &self.menu_cache
    }

    pub fn users(&self) -> &Arc<UserStore> {
        &self.users
    }

    /// Build the scheduler around the injected transport collaborator.
    pub fn scheduler(&self, delivery: Arc<dyn MenuDelivery>) -> Arc<PushScheduler> {
        Arc::new(PushScheduler::new(
            self.users.clone(),
            self.marker.clone(),
            delivery,
            Duration::from_secs(self.config.push.interval_seconds),
        ))
    }

    /// Check database connection health (a no-op for the file backend).
    pub async fn health_check(&self) -> Result<(), BotCoreError> {
        if let Some(pool) = &self.pool {
            sqlx::query("SELECT 1").fetch_one(pool).await?;
        }
        Ok(())
    }
}
