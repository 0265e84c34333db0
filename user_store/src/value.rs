//! Setting values and closed enums
//!
//! The settings bag maps string keys to [`Value`], a small closed sum
//! type. Stored data that does not match one of these shapes is rejected
//! on deserialization instead of being silently coerced.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

/// A single subscriber setting value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", content = "v", rename_all = "snake_case")]
pub enum Value {
    Bool(bool),
    Str(String),
    Int(i64),
    IntList(Vec<i64>),
    StrList(Vec<String>),
    Time(NaiveTime),
}

impl Value {
    /// Human-readable kind name for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Str(_) => "string",
            Value::Int(_) => "integer",
            Value::IntList(_) => "integer list",
            Value::StrList(_) => "string list",
            Value::Time(_) => "time-of-day",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_time(&self) -> Option<NaiveTime> {
        match self {
            Value::Time(t) => Some(*t),
            _ => None,
        }
    }

    pub fn as_int_list(&self) -> Option<&[i64]> {
        match self {
            Value::IntList(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_str_list(&self) -> Option<&[String]> {
        match self {
            Value::StrList(l) => Some(l),
            _ => None,
        }
    }
}

/// Subscriber locale. German is the default of the upstream provider's
/// menus; English is the alternative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    De,
    En,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::De => "de",
            Language::En => "en",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "de" => Some(Language::De),
            "en" => Some(Language::En),
            _ => None,
        }
    }
}

/// Which meal prices a menu rendering should include.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PricesVisibility {
    Off,
    #[default]
    All,
    /// Only the price group matching the subscriber's role
    Role,
}

impl PricesVisibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            PricesVisibility::Off => "off",
            PricesVisibility::All => "all",
            PricesVisibility::Role => "role",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "off" => Some(PricesVisibility::Off),
            "all" => Some(PricesVisibility::All),
            "role" => Some(PricesVisibility::Role),
            _ => None,
        }
    }
}
