//! Shared Postgres subscriber backend
//!
//! One row per subscriber: hot fields as columns (efficiently queryable),
//! the settings bag as a JSONB document. Safe for multiple bot instances
//! sharing one database; writes are last-writer-wins per record.

use super::UserBackend;
use crate::errors::StoreError;
use crate::record::{UserId, UserRecord};
use crate::value::{Language, Value};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use std::collections::BTreeMap;
use tracing::warn;

pub struct PgUserBackend {
    pool: PgPool,
}

impl PgUserBackend {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn record_from_row(row: &sqlx::postgres::PgRow) -> Result<UserRecord, StoreError> {
        let id: i64 = row.try_get("id")?;
        let username: Option<String> = row.try_get("username")?;
        let first_contact: DateTime<Utc> = row.try_get("first_contact")?;
        let language_code: String = row.try_get("language")?;
        let settings: Json<BTreeMap<String, Value>> = row.try_get("settings")?;

        let language = Language::from_code(&language_code).unwrap_or_else(|| {
            warn!(user = id, code = %language_code, "unknown stored language code, using default");
            Language::default()
        });

        Ok(UserRecord {
            id,
            username,
            first_contact,
            language,
            settings: settings.0,
        })
    }
}

#[async_trait]
impl UserBackend for PgUserBackend {
    async fn fetch_user(&self, id: UserId) -> Result<Option<UserRecord>, StoreError> {
        let row = sqlx::query(
            "SELECT id, username, first_contact, language, settings FROM bot_users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::record_from_row).transpose()
    }

    async fn store_user(&self, record: &UserRecord) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO bot_users (id, username, first_contact, language, settings)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (id) DO UPDATE SET
                 username = EXCLUDED.username,
                 first_contact = EXCLUDED.first_contact,
                 language = EXCLUDED.language,
                 settings = EXCLUDED.settings",
        )
        .bind(record.id)
        .bind(record.username.as_deref())
        .bind(record.first_contact)
        .bind(record.language.code())
        .bind(Json(&record.settings))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn remove_user(&self, id: UserId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM bot_users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn all_users(&self) -> Result<Vec<UserRecord>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, username, first_contact, language, settings FROM bot_users
             ORDER BY first_contact",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::record_from_row).collect()
    }
}
