//! Convenience re-exports for common user-store usage

pub use crate::api::UserStats;
pub use crate::backend::{FileUserBackend, PgUserBackend, UserBackend};
pub use crate::errors::StoreError;
pub use crate::fields;
pub use crate::record::{CanteenId, UserId, UserRecord};
pub use crate::store::UserStore;
pub use crate::value::{Language, PricesVisibility, Value};
