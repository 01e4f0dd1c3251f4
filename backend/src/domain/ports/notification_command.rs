//! Driving port for the public "please move your car" action.

use async_trait::async_trait;

use crate::domain::{DeliveryResult, Error};

/// Notification request decoded from a scanned code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyOwnerRequest {
    /// Scannable code taken from the placard.
    pub code: String,
    /// Requested channel name; the configured default is used when absent.
    pub channel: Option<String>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationCommand: Send + Sync {
    /// Resolve the code and notify the owner through the requested channel.
    async fn notify(&self, request: NotifyOwnerRequest) -> Result<DeliveryResult, Error>;
}
