//! Delivery collaborator boundary

use crate::errors::DeliveryError;
use async_trait::async_trait;
use user_store::{CanteenId, UserId};

/// Outbound transport supplied by the messaging layer. The scheduler
/// calls this once per due subscriber and favorite canteen; `silent`
/// asks the transport to suppress the audible alert.
#[async_trait]
pub trait MenuDelivery: Send + Sync {
    async fn deliver(
        &self,
        user: UserId,
        canteen: CanteenId,
        silent: bool,
    ) -> Result<(), DeliveryError>;
}
