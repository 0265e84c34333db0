//! Subscriber preference store
//!
//! Per-subscriber settings with a hybrid schema: a few frequently-queried
//! hot fields (username, first contact, language) held as typed struct
//! members / SQL columns, and everything else in an open-ended settings
//! bag with a small closed value type. Persistence is pluggable between
//! an exclusive JSON file and a shared Postgres table.

pub mod api;
pub mod backend;
pub mod errors;
pub mod fields;
pub mod prelude;
pub mod record;
pub mod store;
pub mod value;

pub use backend::{FileUserBackend, PgUserBackend, UserBackend};
pub use errors::StoreError;
pub use record::{CanteenId, UserId, UserRecord};
pub use store::UserStore;
pub use value::{Language, PricesVisibility, Value};
