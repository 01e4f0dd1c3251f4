//! Reqwest-backed delivery gateway.
//!
//! Posts each message as JSON to one provider endpoint. This adapter owns
//! transport details only: serialisation, the client timeout, and mapping
//! HTTP failures onto [`DeliveryGatewayError`] variants the dispatcher can
//! classify.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use tracing::warn;

use super::dto::{DeliveryRequestDto, DeliveryResponseDto};
use crate::domain::ports::{
    DeliveryGateway, DeliveryGatewayError, DeliveryReceipt, OutboundMessage,
};

const DEFAULT_USER_AGENT: &str = concat!("nomcar/", env!("CARGO_PKG_VERSION"));

/// Delivery gateway that POSTs to a single endpoint.
pub struct HttpDeliveryGateway {
    client: Client,
    endpoint: Url,
    api_token: Option<String>,
}

impl HttpDeliveryGateway {
    /// Build a gateway whose client gives up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(
        endpoint: Url,
        timeout: Duration,
        api_token: Option<String>,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(DEFAULT_USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            endpoint,
            api_token,
        })
    }
}

#[async_trait]
impl DeliveryGateway for HttpDeliveryGateway {
    async fn deliver(
        &self,
        message: &OutboundMessage,
    ) -> Result<DeliveryReceipt, DeliveryGatewayError> {
        let mut request = self
            .client
            .post(self.endpoint.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&DeliveryRequestDto::from(message));
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(map_transport_error)?;
        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }

        Ok(DeliveryReceipt {
            provider_reference: parse_receipt(body.as_ref()).message_id,
        })
    }
}

fn parse_receipt(body: &[u8]) -> DeliveryResponseDto {
    if body.iter().all(u8::is_ascii_whitespace) {
        return DeliveryResponseDto::default();
    }
    // The provider accepted the message; an unreadable body only costs us
    // the reference.
    serde_json::from_slice(body).unwrap_or_else(|error| {
        warn!(%error, "delivery gateway returned an unreadable receipt");
        DeliveryResponseDto::default()
    })
}

fn map_transport_error(error: reqwest::Error) -> DeliveryGatewayError {
    if error.is_timeout() {
        DeliveryGatewayError::timeout(error.to_string())
    } else {
        DeliveryGatewayError::transport(error.to_string())
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> DeliveryGatewayError {
    let body_preview = body_preview(body);
    let message = if body_preview.is_empty() {
        format!("status {}", status.as_u16())
    } else {
        format!("status {}: {}", status.as_u16(), body_preview)
    };

    match status {
        StatusCode::TOO_MANY_REQUESTS => DeliveryGatewayError::rate_limited(message),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            DeliveryGatewayError::timeout(message)
        }
        StatusCode::GONE => DeliveryGatewayError::unsubscribed(message),
        StatusCode::NOT_FOUND | StatusCode::UNPROCESSABLE_ENTITY => {
            DeliveryGatewayError::invalid_recipient(message)
        }
        _ if status.is_client_error() => DeliveryGatewayError::rejected(message),
        _ => DeliveryGatewayError::transport(message),
    }
}

fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 120;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let mut preview: String = compact.chars().take(PREVIEW_CHAR_LIMIT).collect();
    if preview.len() < compact.len() {
        preview.push_str("...");
    }
    preview
}
