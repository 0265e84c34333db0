//! Dispatch marker persistence
//!
//! The marker records when the due window was last swept. It is stored
//! independently of the subscriber store so scheduler correctness never
//! depends on the preference backend being reachable at the moment of
//! the advance. Storage failures are logged and absorbed; the scheduler
//! keeps its own in-process copy authoritative between writes.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{PgPool, Row};
use std::path::{Path, PathBuf};
use tracing::warn;

#[async_trait]
pub trait MarkerStore: Send + Sync {
    /// Last persisted sweep time, or `None` when absent or unreadable
    /// (an unreadable marker self-heals to absent).
    async fn load(&self) -> Option<DateTime<Utc>>;

    /// Durably advance the marker.
    async fn store(&self, at: DateTime<Utc>);
}

/// Marker in a single RFC 3339 text file.
pub struct FilePushMarker {
    path: PathBuf,
}

impl FilePushMarker {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl MarkerStore for FilePushMarker {
    async fn load(&self) -> Option<DateTime<Utc>> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "push marker unreadable");
                return None;
            }
        };

        match DateTime::parse_from_rfc3339(raw.trim()) {
            Ok(at) => Some(at.with_timezone(&Utc)),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "push marker corrupted, removing it");
                if let Err(e) = std::fs::remove_file(&self.path) {
                    warn!(path = %self.path.display(), error = %e, "failed to remove corrupted push marker");
                }
                None
            }
        }
    }

    async fn store(&self, at: DateTime<Utc>) {
        let raw = at.to_rfc3339_opts(SecondsFormat::Micros, true);
        if let Err(e) = std::fs::write(&self.path, raw) {
            warn!(path = %self.path.display(), error = %e, "failed to write push marker");
        }
    }
}

/// Marker in a single-row Postgres table, shared between instances.
pub struct PgPushMarker {
    pool: PgPool,
}

impl PgPushMarker {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MarkerStore for PgPushMarker {
    async fn load(&self) -> Option<DateTime<Utc>> {
        let row = sqlx::query("SELECT last_push FROM push_marker WHERE id")
            .fetch_optional(&self.pool)
            .await;

        match row {
            Ok(Some(row)) => match row.try_get::<DateTime<Utc>, _>("last_push") {
                Ok(at) => Some(at),
                Err(e) => {
                    warn!(error = %e, "push marker row unreadable");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "failed to load push marker");
                None
            }
        }
    }

    async fn store(&self, at: DateTime<Utc>) {
        let result = sqlx::query(
            "INSERT INTO push_marker (id, last_push) VALUES (TRUE, $1)
             ON CONFLICT (id) DO UPDATE SET last_push = EXCLUDED.last_push",
        )
        .bind(at)
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            warn!(error = %e, "failed to persist push marker");
        }
    }
}
