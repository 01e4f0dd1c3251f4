//! Driven port for channel delivery mechanisms.
//!
//! One gateway exists per [`Channel`]. Gateways report failures with enough
//! detail for the dispatcher to decide whether a retry may help.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{Channel, PlateNumber};

use super::define_port_error;

/// Channel-specific message handed to a gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundMessage {
    /// Channel the message is sent over.
    pub channel: Channel,
    /// Push: owner identity. SMS: owner phone number.
    pub recipient: String,
    /// Plate of the car that needs moving.
    pub plate: PlateNumber,
    /// Human-readable body.
    pub body: String,
    /// When the notification was requested.
    pub requested_at: DateTime<Utc>,
}

/// Gateway acknowledgement for an accepted message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryReceipt {
    /// Provider reference for the accepted message, when one is issued.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_reference: Option<String>,
}

define_port_error! {
    /// Errors surfaced while handing a message to a gateway.
    pub enum DeliveryGatewayError {
        /// Network transport failed before a response arrived.
        Transport { message: String } =>
            "delivery transport failed: {message}",
        /// Gateway did not answer in time.
        Timeout { message: String } =>
            "delivery timed out: {message}",
        /// Gateway asked us to slow down.
        RateLimited { message: String } =>
            "delivery rate limited: {message}",
        /// Recipient address is unusable for this channel.
        InvalidRecipient { message: String } =>
            "delivery recipient invalid: {message}",
        /// Recipient opted out of this channel.
        Unsubscribed { message: String } =>
            "delivery recipient unsubscribed: {message}",
        /// Gateway refused the message for any other reason.
        Rejected { message: String } =>
            "delivery rejected: {message}",
    }
}

impl DeliveryGatewayError {
    /// Return whether retrying this error is expected to help.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. } | Self::Timeout { .. } | Self::RateLimited { .. }
        )
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeliveryGateway: Send + Sync {
    /// Hand `message` to the channel provider.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// let receipt = gateway.deliver(&message).await?;
    /// # Ok::<(), nomcar::domain::ports::DeliveryGatewayError>(())
    /// ```
    async fn deliver(&self, message: &OutboundMessage)
    -> Result<DeliveryReceipt, DeliveryGatewayError>;
}
