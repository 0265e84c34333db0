//! Convenience re-exports for common push-scheduler usage

pub use crate::delivery::MenuDelivery;
pub use crate::errors::{DeliveryError, PushError};
pub use crate::marker::{FilePushMarker, MarkerStore, PgPushMarker};
pub use crate::scheduler::PushScheduler;
