//! Error types for the push scheduler

use thiserror::Error;
use user_store::{CanteenId, UserId};

/// The transport collaborator failed to deliver one notification.
/// Logged and isolated to the affected subscriber; never aborts a tick.
#[derive(Error, Debug)]
#[error("delivery to subscriber {user} for canteen {canteen} failed: {reason}")]
pub struct DeliveryError {
    pub user: UserId,
    pub canteen: CanteenId,
    pub reason: String,
}

impl DeliveryError {
    pub fn new(user: UserId, canteen: CanteenId, reason: impl Into<String>) -> Self {
        Self {
            user,
            canteen,
            reason: reason.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum PushError {
    /// Subscriber enumeration failed; the tick is skipped without
    /// advancing the marker so the window is retried next tick.
    #[error("subscriber store unavailable: {0}")]
    Store(#[from] user_store::StoreError),

    #[error("scheduler already running")]
    AlreadyRunning,
}
