//! The subscriber record
//!
//! Hot fields are typed struct members; everything else lives in the
//! settings bag. The string-keyed accessors here route between the two
//! so callers see one uniform field namespace.

use crate::errors::StoreError;
use crate::fields;
use crate::value::{Language, Value};
use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Stable subscriber id supplied by the messaging channel.
pub type UserId = i64;
/// Id of a canteen in the remote provider's directory.
pub type CanteenId = u32;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    pub username: Option<String>,
    pub first_contact: DateTime<Utc>,
    pub language: Language,
    #[serde(default)]
    pub settings: BTreeMap<String, Value>,
}

impl UserRecord {
    pub fn new(id: UserId, first_contact: DateTime<Utc>) -> Self {
        Self {
            id,
            username: None,
            first_contact,
            language: Language::default(),
            settings: BTreeMap::new(),
        }
    }

    /// Check that `value` has the right shape for a hot field. Bag
    /// fields accept any value. Called before any record is created or
    /// mutated so violations leave no trace.
    pub fn validate_set(field: &str, value: &Value) -> Result<(), StoreError> {
        match field {
            fields::USERNAME => match value {
                Value::Str(_) => Ok(()),
                other => Err(StoreError::InvariantViolation(format!(
                    "username expects a string, got {}",
                    other.kind()
                ))),
            },
            fields::LANGUAGE => match value {
                Value::Str(code) if Language::from_code(code).is_some() => Ok(()),
                Value::Str(code) => Err(StoreError::InvariantViolation(format!(
                    "unknown language code: {}",
                    code
                ))),
                other => Err(StoreError::InvariantViolation(format!(
                    "language expects a string code, got {}",
                    other.kind()
                ))),
            },
            fields::FIRST_CONTACT => match value {
                Value::Int(ts) if DateTime::from_timestamp(*ts, 0).is_some() => Ok(()),
                Value::Int(ts) => Err(StoreError::InvariantViolation(format!(
                    "first_contact timestamp out of range: {}",
                    ts
                ))),
                other => Err(StoreError::InvariantViolation(format!(
                    "first_contact expects unix seconds, got {}",
                    other.kind()
                ))),
            },
            _ => Ok(()),
        }
    }

    /// Read a field through the hot/bag routing.
    pub fn get_field(&self, field: &str) -> Option<Value> {
        match field {
            fields::USERNAME => self.username.clone().map(Value::Str),
            fields::FIRST_CONTACT => Some(Value::Int(self.first_contact.timestamp())),
            fields::LANGUAGE => Some(Value::Str(self.language.code().to_string())),
            _ => self.settings.get(field).cloned(),
        }
    }

    /// Write a field through the hot/bag routing. Returns whether the
    /// stored value actually changed (value-equality short-circuit).
    pub fn set_field(&mut self, field: &str, value: Value) -> Result<bool, StoreError> {
        Self::validate_set(field, &value)?;
        match field {
            fields::USERNAME => {
                let name = value.as_str().map(str::to_string);
                let changed = self.username != name;
                self.username = name;
                Ok(changed)
            }
            fields::LANGUAGE => {
                // validate_set guarantees a known code
                let language = value
                    .as_str()
                    .and_then(Language::from_code)
                    .unwrap_or_default();
                let changed = self.language != language;
                self.language = language;
                Ok(changed)
            }
            fields::FIRST_CONTACT => {
                let at = value
                    .as_int()
                    .and_then(|ts| DateTime::from_timestamp(ts, 0))
                    .unwrap_or(self.first_contact);
                let changed = self.first_contact != at;
                self.first_contact = at;
                Ok(changed)
            }
            _ => {
                let changed = self.settings.get(field) != Some(&value);
                if changed {
                    self.settings.insert(field.to_string(), value);
                }
                Ok(changed)
            }
        }
    }

    /// Remove a field. Hot fields reset to their empty/default form;
    /// the first-contact timestamp is part of the record's identity and
    /// cannot be deleted.
    pub fn delete_field(&mut self, field: &str) -> Result<bool, StoreError> {
        match field {
            fields::USERNAME => Ok(self.username.take().is_some()),
            fields::LANGUAGE => {
                let changed = self.language != Language::default();
                self.language = Language::default();
                Ok(changed)
            }
            fields::FIRST_CONTACT => Err(StoreError::InvariantViolation(
                "first_contact cannot be deleted".to_string(),
            )),
            _ => Ok(self.settings.remove(field).is_some()),
        }
    }

    /// Favorite canteens in insertion order. Ids outside the canteen id
    /// range are skipped.
    pub fn favorites(&self) -> Vec<CanteenId> {
        self.settings
            .get(fields::FAVORITES)
            .and_then(Value::as_int_list)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| CanteenId::try_from(*id).ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Configured daily push time, if any.
    pub fn push_time(&self) -> Option<NaiveTime> {
        self.settings.get(fields::PUSH).and_then(Value::as_time)
    }

    /// Whether pushes should be delivered without sound.
    pub fn push_silent(&self, default: bool) -> bool {
        self.settings
            .get(fields::PUSH_SILENT)
            .and_then(Value::as_bool)
            .unwrap_or(default)
    }

    /// Feedback messages in submission order.
    pub fn feedback(&self) -> Vec<String> {
        self.settings
            .get(fields::FEEDBACK)
            .and_then(Value::as_str_list)
            .map(<[String]>::to_vec)
            .unwrap_or_default()
    }
}
