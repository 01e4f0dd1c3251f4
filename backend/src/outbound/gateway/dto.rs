//! Wire DTOs for the HTTP delivery gateway.
//!
//! The gateway receives one JSON document per message and answers with an
//! optional provider reference.

use serde::{Deserialize, Serialize};

use crate::domain::ports::OutboundMessage;

#[derive(Debug, Serialize)]
pub(super) struct DeliveryRequestDto<'a> {
    pub(super) channel: &'a str,
    pub(super) recipient: &'a str,
    pub(super) car_id: &'a str,
    pub(super) message: &'a str,
    pub(super) requested_at: String,
}

impl<'a> From<&'a OutboundMessage> for DeliveryRequestDto<'a> {
    fn from(value: &'a OutboundMessage) -> Self {
        Self {
            channel: value.channel.as_str(),
            recipient: value.recipient.as_str(),
            car_id: value.plate.as_ref(),
            message: value.body.as_str(),
            requested_at: value.requested_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct DeliveryResponseDto {
    #[serde(default, alias = "msgid")]
    pub(super) message_id: Option<String>,
}
