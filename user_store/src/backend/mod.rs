//! Persistence backends for subscriber records

mod file;
mod postgres;

pub use file::FileUserBackend;
pub use postgres::PgUserBackend;

use crate::errors::StoreError;
use crate::record::{UserId, UserRecord};
use async_trait::async_trait;

/// Durable storage for subscriber records, keyed by subscriber id.
#[async_trait]
pub trait UserBackend: Send + Sync {
    async fn fetch_user(&self, id: UserId) -> Result<Option<UserRecord>, StoreError>;

    /// Persist the whole record (last writer wins at record granularity).
    async fn store_user(&self, record: &UserRecord) -> Result<(), StoreError>;

    /// Full erasure, not a soft delete.
    async fn remove_user(&self, id: UserId) -> Result<(), StoreError>;

    async fn all_users(&self) -> Result<Vec<UserRecord>, StoreError>;
}
