//! Driving port for owner-facing reads.
//!
//! Neither operation exposes another owner's data: listing is scoped to the
//! caller and codes are only issued for cars the caller holds.

use async_trait::async_trait;
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{Car, Error, OwnerIdentity};

/// Scannable code issued for one car.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct IssuedCode {
    /// Opaque token to embed in a QR image.
    pub qr_code: String,
    /// Public notify link carrying the token.
    pub notify_url: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CarQuery: Send + Sync {
    /// Cars bound to `owner`; empty when there are none.
    async fn list_cars(&self, owner: &OwnerIdentity) -> Result<Vec<Car>, Error>;

    /// Issue the scannable code for `car_id` when `owner` holds it.
    async fn issue_code(&self, owner: &OwnerIdentity, car_id: &str) -> Result<IssuedCode, Error>;
}
