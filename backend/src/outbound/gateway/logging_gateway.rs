//! Gateway that records messages in the log instead of sending them.
//!
//! Used for channels without a configured provider endpoint in local runs.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tracing::info;

use crate::domain::ports::{
    DeliveryGateway, DeliveryGatewayError, DeliveryReceipt, OutboundMessage,
};

#[derive(Debug, Default)]
pub struct LoggingDeliveryGateway {
    sent: AtomicU64,
}

#[async_trait]
impl DeliveryGateway for LoggingDeliveryGateway {
    async fn deliver(
        &self,
        message: &OutboundMessage,
    ) -> Result<DeliveryReceipt, DeliveryGatewayError> {
        let sequence = self.sent.fetch_add(1, Ordering::Relaxed) + 1;
        info!(
            channel = %message.channel,
            plate = %message.plate,
            sequence,
            "notification logged instead of sent"
        );
        Ok(DeliveryReceipt {
            provider_reference: Some(format!("log-{sequence}")),
        })
    }
}
