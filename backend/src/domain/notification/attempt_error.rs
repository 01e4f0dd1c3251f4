//! Attempt-local outcomes for one gateway call.

use serde::Serialize;

use crate::domain::ports::DeliveryGatewayError;

/// How a delivery failure is treated by the retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    /// Network trouble or a timeout; worth another attempt.
    Transient,
    /// The recipient cannot be reached on this channel; never retried.
    Permanent,
}

pub(super) struct AttemptError {
    pub(super) class: FailureClass,
    pub(super) error: DeliveryGatewayError,
}

impl From<DeliveryGatewayError> for AttemptError {
    fn from(error: DeliveryGatewayError) -> Self {
        let class = if error.is_retryable() {
            FailureClass::Transient
        } else {
            FailureClass::Permanent
        };
        Self { class, error }
    }
}
