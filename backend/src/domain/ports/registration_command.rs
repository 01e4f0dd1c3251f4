//! Driving port for the car registration write path.

use async_trait::async_trait;

use crate::domain::{Error, OwnerIdentity};

/// Raw registration input as received from an inbound adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterCarRequest {
    /// Caller identity resolved by the adapter.
    pub owner: OwnerIdentity,
    /// Plate as typed by the owner, before normalisation.
    pub car_id: String,
    /// Phone number in wire form; `None` or zero means not supplied.
    pub owner_phone_num: Option<i64>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RegistrationCommand: Send + Sync {
    /// Bind a car to the caller, or refresh the caller's contact details.
    async fn register(&self, request: RegisterCarRequest) -> Result<(), Error>;
}
