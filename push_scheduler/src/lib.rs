//! Daily push notification scheduler
//!
//! One background task wakes on a fixed cadence, determines which
//! subscribers are due for their daily menu notification and hands
//! delivery requests to an injected transport collaborator. A durable
//! dispatch marker, persisted independently of the subscriber store,
//! guarantees at most one dispatch per subscriber per day across process
//! restarts and concurrently running instances.

pub mod delivery;
pub mod errors;
pub mod marker;
pub mod prelude;
pub mod scheduler;

pub use delivery::MenuDelivery;
pub use errors::{DeliveryError, PushError};
pub use marker::{FilePushMarker, MarkerStore, PgPushMarker};
pub use scheduler::PushScheduler;
