//! String-keyed subscriber preference store
//!
//! All mutations on one store serialize through a single async mutex;
//! every read-modify-write happens inside one lock scope, so compound
//! operations never re-enter. A per-subscriber mirror amortizes repeated
//! reads within one request/response cycle while still picking up writes
//! made by other instances after a short validity window.

use crate::backend::UserBackend;
use crate::errors::StoreError;
use crate::fields;
use crate::record::{UserId, UserRecord};
use crate::value::Value;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::warn;

pub(crate) struct Mirror {
    pub(crate) record: Option<UserRecord>,
    refreshed_at: Instant,
}

pub struct UserStore {
    pub(crate) backend: Arc<dyn UserBackend>,
    mirror_ttl: Duration,
    pub(crate) silent_by_default: bool,
    pub(crate) mirrors: Mutex<HashMap<UserId, Mirror>>,
}

impl UserStore {
    /// `mirror_ttl` bounds how stale a per-subscriber read may be;
    /// `silent_by_default` is the push-sound default for subscribers who
    /// never chose (an explicit deployment decision, see `PushConfig`).
    pub fn new(backend: Arc<dyn UserBackend>, mirror_ttl: Duration, silent_by_default: bool) -> Self {
        Self {
            backend,
            mirror_ttl,
            silent_by_default,
            mirrors: Mutex::new(HashMap::new()),
        }
    }

    /// Refresh the mirror for `id` when absent or older than the
    /// validity window, then return it. A failing backend read is logged
    /// and the last known mirror state stays authoritative.
    pub(crate) async fn refreshed<'a>(
        &self,
        mirrors: &'a mut HashMap<UserId, Mirror>,
        id: UserId,
    ) -> &'a mut Mirror {
        let stale = mirrors
            .get(&id)
            .is_none_or(|m| m.refreshed_at.elapsed() >= self.mirror_ttl);

        if stale {
            match self.backend.fetch_user(id).await {
                Ok(record) => {
                    mirrors.insert(
                        id,
                        Mirror {
                            record,
                            refreshed_at: Instant::now(),
                        },
                    );
                }
                Err(e) => {
                    warn!(user = id, error = %e, "failed to refresh subscriber mirror, serving last known state");
                }
            }
        }

        mirrors.entry(id).or_insert_with(|| Mirror {
            record: None,
            refreshed_at: Instant::now(),
        })
    }

    /// Persist a record, absorbing backend failures: the mirror stays
    /// authoritative for this process and the next write catches up.
    pub(crate) async fn persist(&self, record: &UserRecord) {
        if let Err(e) = self.backend.store_user(record).await {
            warn!(user = record.id, error = %e, "failed to persist subscriber record, keeping in-memory state");
        }
    }

    /// Read one field, `None` when the subscriber or field is unknown.
    pub async fn try_get(&self, id: UserId, field: &str) -> Option<Value> {
        let mut mirrors = self.mirrors.lock().await;
        let mirror = self.refreshed(&mut mirrors, id).await;
        mirror.record.as_ref().and_then(|r| r.get_field(field))
    }

    /// Read one field, falling back when the subscriber or field is
    /// unknown.
    pub async fn get(&self, id: UserId, field: &str, fallback: Value) -> Value {
        self.try_get(id, field).await.unwrap_or(fallback)
    }

    /// Write one field. Creates the record on first contact. Issues a
    /// durable write only when the stored value actually changes.
    pub async fn set(&self, id: UserId, field: &str, value: Value) -> Result<(), StoreError> {
        UserRecord::validate_set(field, &value)?;

        let mut mirrors = self.mirrors.lock().await;
        let mirror = self.refreshed(&mut mirrors, id).await;
        let created = mirror.record.is_none();
        let record = mirror
            .record
            .get_or_insert_with(|| UserRecord::new(id, Utc::now()));

        let changed = record.set_field(field, value)?;
        if created || changed {
            let snapshot = record.clone();
            self.persist(&snapshot).await;
        }
        Ok(())
    }

    /// Remove one field. Unknown subscribers are a no-op.
    pub async fn delete(&self, id: UserId, field: &str) -> Result<(), StoreError> {
        let mut mirrors = self.mirrors.lock().await;
        let mirror = self.refreshed(&mut mirrors, id).await;
        let Some(record) = mirror.record.as_mut() else {
            return Ok(());
        };

        if record.delete_field(field)? {
            let snapshot = record.clone();
            self.persist(&snapshot).await;
        }
        Ok(())
    }

    /// Append to a list field in the settings bag. Duplicates are
    /// allowed; use [`UserStore::append_if_absent`] for set semantics.
    pub async fn append(&self, id: UserId, field: &str, value: Value) -> Result<(), StoreError> {
        self.append_inner(id, field, value, false).await.map(|_| ())
    }

    /// Append to a list field only when the value is not yet present.
    /// Returns whether the value was added, so callers can distinguish
    /// "newly saved" from "already saved".
    pub async fn append_if_absent(
        &self,
        id: UserId,
        field: &str,
        value: Value,
    ) -> Result<bool, StoreError> {
        self.append_inner(id, field, value, true).await
    }

    async fn append_inner(
        &self,
        id: UserId,
        field: &str,
        value: Value,
        only_if_absent: bool,
    ) -> Result<bool, StoreError> {
        if fields::is_hot(field) {
            return Err(StoreError::InvariantViolation(format!(
                "cannot append to hot field {}",
                field
            )));
        }
        if !matches!(value, Value::Int(_) | Value::Str(_)) {
            return Err(StoreError::InvariantViolation(format!(
                "cannot append a {} to a list field",
                value.kind()
            )));
        }

        let mut mirrors = self.mirrors.lock().await;
        let mirror = self.refreshed(&mut mirrors, id).await;
        let created = mirror.record.is_none();
        let record = mirror
            .record
            .get_or_insert_with(|| UserRecord::new(id, Utc::now()));

        let added = match (record.settings.get_mut(field), value) {
            (None, Value::Int(v)) => {
                record
                    .settings
                    .insert(field.to_string(), Value::IntList(vec![v]));
                true
            }
            (None, Value::Str(s)) => {
                record
                    .settings
                    .insert(field.to_string(), Value::StrList(vec![s]));
                true
            }
            (Some(Value::IntList(list)), Value::Int(v)) => {
                if only_if_absent && list.contains(&v) {
                    false
                } else {
                    list.push(v);
                    true
                }
            }
            (Some(Value::StrList(list)), Value::Str(s)) => {
                if only_if_absent && list.contains(&s) {
                    false
                } else {
                    list.push(s);
                    true
                }
            }
            (Some(existing), value) => {
                return Err(StoreError::InvariantViolation(format!(
                    "cannot append a {} to field {} holding a {}",
                    value.kind(),
                    field,
                    existing.kind()
                )));
            }
            // Unreachable: value shape was checked above
            (None, value) => {
                return Err(StoreError::InvariantViolation(format!(
                    "cannot append a {}",
                    value.kind()
                )));
            }
        };

        if created || added {
            let snapshot = record.clone();
            self.persist(&snapshot).await;
        }
        Ok(added)
    }

    /// Remove one element from a list field. Unknown subscribers,
    /// fields or elements are a no-op.
    pub async fn remove(&self, id: UserId, field: &str, value: &Value) -> Result<(), StoreError> {
        if fields::is_hot(field) {
            return Err(StoreError::InvariantViolation(format!(
                "cannot remove elements from hot field {}",
                field
            )));
        }

        let mut mirrors = self.mirrors.lock().await;
        let mirror = self.refreshed(&mut mirrors, id).await;
        let Some(record) = mirror.record.as_mut() else {
            return Ok(());
        };

        let removed = match (record.settings.get_mut(field), value) {
            (Some(Value::IntList(list)), Value::Int(v)) => {
                let before = list.len();
                list.retain(|x| x != v);
                list.len() != before
            }
            (Some(Value::StrList(list)), Value::Str(s)) => {
                let before = list.len();
                list.retain(|x| x != s);
                list.len() != before
            }
            _ => false,
        };

        if removed {
            let snapshot = record.clone();
            self.persist(&snapshot).await;
        }
        Ok(())
    }

    /// Erase the subscriber entirely, durable record and mirror both.
    /// Subsequent reads behave as though the subscriber never existed.
    pub async fn delete_user(&self, id: UserId) -> Result<(), StoreError> {
        let mut mirrors = self.mirrors.lock().await;
        self.backend.remove_user(id).await?;
        mirrors.remove(&id);
        Ok(())
    }

    /// Every subscriber record, straight from the backend (no mirror).
    pub async fn list_all(&self) -> Result<Vec<UserRecord>, StoreError> {
        self.backend.all_users().await
    }
}
