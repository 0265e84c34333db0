//! Typed subscriber API
//!
//! Convenience wrappers over the string-keyed store for every setting
//! the command layer works with. These are the operations the bot's
//! command handlers call; the generic `get`/`set` surface underneath
//! stays available for settings added later.

use crate::errors::StoreError;
use crate::fields;
use crate::record::{CanteenId, UserId};
use crate::store::UserStore;
use crate::value::{Language, PricesVisibility, Value};
use chrono::{DateTime, NaiveTime, Utc};

/// One row of the deployment statistics overview.
#[derive(Debug, Clone, PartialEq)]
pub struct UserStats {
    pub id: UserId,
    pub username: Option<String>,
    pub first_contact: DateTime<Utc>,
    pub feedback: Vec<String>,
}

impl UserStore {
    /// Register a first contact. Creates the record if the subscriber is
    /// unknown and fills in the username when it was never stored.
    pub async fn add_user(&self, id: UserId, username: Option<&str>) -> Result<(), StoreError> {
        let mut mirrors = self.mirrors.lock().await;
        let mirror = self.refreshed(&mut mirrors, id).await;
        let created = mirror.record.is_none();
        let record = mirror
            .record
            .get_or_insert_with(|| crate::record::UserRecord::new(id, Utc::now()));

        let mut changed = created;
        if record.username.is_none() {
            if let Some(name) = username {
                record.username = Some(name.to_string());
                changed = true;
            }
        }

        if changed {
            let snapshot = record.clone();
            self.persist(&snapshot).await;
        }
        Ok(())
    }

    pub async fn username(&self, id: UserId) -> Option<String> {
        match self.try_get(id, fields::USERNAME).await {
            Some(Value::Str(s)) => Some(s),
            _ => None,
        }
    }

    /// Save a favorite canteen; returns whether it was newly added
    /// ("newly saved" vs "already saved" feedback to the subscriber).
    pub async fn save_favorite(&self, id: UserId, canteen: CanteenId) -> Result<bool, StoreError> {
        self.append_if_absent(id, fields::FAVORITES, Value::Int(i64::from(canteen)))
            .await
    }

    pub async fn remove_favorite(&self, id: UserId, canteen: CanteenId) -> Result<(), StoreError> {
        self.remove(id, fields::FAVORITES, &Value::Int(i64::from(canteen)))
            .await
    }

    pub async fn favorites(&self, id: UserId) -> Vec<CanteenId> {
        self.get(id, fields::FAVORITES, Value::IntList(vec![]))
            .await
            .as_int_list()
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| CanteenId::try_from(*id).ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub async fn is_favorite(&self, id: UserId, canteen: CanteenId) -> bool {
        self.favorites(id).await.contains(&canteen)
    }

    /// Enable the daily push at the given time of day.
    pub async fn enable_push(&self, id: UserId, at: NaiveTime) -> Result<(), StoreError> {
        self.set(id, fields::PUSH, Value::Time(at)).await
    }

    pub async fn disable_push(&self, id: UserId) -> Result<(), StoreError> {
        self.delete(id, fields::PUSH).await
    }

    pub async fn push_time(&self, id: UserId) -> Option<NaiveTime> {
        self.try_get(id, fields::PUSH).await.and_then(|v| v.as_time())
    }

    pub async fn set_push_silent(&self, id: UserId, silent: bool) -> Result<(), StoreError> {
        self.set(id, fields::PUSH_SILENT, Value::Bool(silent)).await
    }

    /// Whether pushes go out without sound; falls back to the
    /// deployment-wide default when the subscriber never chose.
    pub async fn is_push_silent(&self, id: UserId) -> bool {
        self.get(id, fields::PUSH_SILENT, Value::Bool(self.silent_by_default))
            .await
            .as_bool()
            .unwrap_or(self.silent_by_default)
    }

    pub async fn set_emojis(&self, id: UserId, enabled: bool) -> Result<(), StoreError> {
        self.set(id, fields::EMOJIS, Value::Bool(enabled)).await
    }

    pub async fn show_emojis(&self, id: UserId) -> bool {
        self.get(id, fields::EMOJIS, Value::Bool(true))
            .await
            .as_bool()
            .unwrap_or(true)
    }

    pub async fn set_show_notes(&self, id: UserId, enabled: bool) -> Result<(), StoreError> {
        self.set(id, fields::NOTES, Value::Bool(enabled)).await
    }

    pub async fn show_notes(&self, id: UserId) -> bool {
        self.get(id, fields::NOTES, Value::Bool(true))
            .await
            .as_bool()
            .unwrap_or(true)
    }

    pub async fn set_prices(
        &self,
        id: UserId,
        visibility: PricesVisibility,
    ) -> Result<(), StoreError> {
        self.set(id, fields::PRICES, Value::Str(visibility.as_str().to_string()))
            .await
    }

    pub async fn prices(&self, id: UserId) -> PricesVisibility {
        self.get(
            id,
            fields::PRICES,
            Value::Str(PricesVisibility::default().as_str().to_string()),
        )
        .await
        .as_str()
        .and_then(PricesVisibility::parse)
        .unwrap_or_default()
    }

    pub async fn set_language(&self, id: UserId, language: Language) -> Result<(), StoreError> {
        self.set(id, fields::LANGUAGE, Value::Str(language.code().to_string()))
            .await
    }

    pub async fn language(&self, id: UserId) -> Language {
        self.get(
            id,
            fields::LANGUAGE,
            Value::Str(Language::default().code().to_string()),
        )
        .await
        .as_str()
        .and_then(Language::from_code)
        .unwrap_or_default()
    }

    pub async fn set_last_canteen(&self, id: UserId, canteen: CanteenId) -> Result<(), StoreError> {
        self.set(id, fields::LAST_CANTEEN, Value::Int(i64::from(canteen)))
            .await
    }

    pub async fn last_canteen(&self, id: UserId) -> Option<CanteenId> {
        self.try_get(id, fields::LAST_CANTEEN)
            .await
            .and_then(|v| v.as_int())
            .and_then(|id| CanteenId::try_from(id).ok())
    }

    pub async fn save_feedback(&self, id: UserId, text: &str) -> Result<(), StoreError> {
        self.append(id, fields::FEEDBACK, Value::Str(text.to_string()))
            .await
    }

    pub async fn feedback(&self, id: UserId) -> Vec<String> {
        self.get(id, fields::FEEDBACK, Value::StrList(vec![]))
            .await
            .as_str_list()
            .map(<[String]>::to_vec)
            .unwrap_or_default()
    }

    pub async fn mark_asked_feedback(&self, id: UserId) -> Result<(), StoreError> {
        self.set(id, fields::ASKED_FEEDBACK, Value::Bool(true)).await
    }

    pub async fn asked_for_feedback(&self, id: UserId) -> bool {
        self.get(id, fields::ASKED_FEEDBACK, Value::Bool(false))
            .await
            .as_bool()
            .unwrap_or(false)
    }

    /// Overview of every subscriber, ordered by first contact.
    pub async fn stats(&self) -> Result<Vec<UserStats>, StoreError> {
        let mut stats: Vec<UserStats> = self
            .list_all()
            .await?
            .into_iter()
            .map(|r| UserStats {
                id: r.id,
                username: r.username.clone(),
                first_contact: r.first_contact,
                feedback: r.feedback(),
            })
            .collect();
        stats.sort_by_key(|s| s.first_contact);
        Ok(stats)
    }
}
