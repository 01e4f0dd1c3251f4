//! Registration write path.
//!
//! Validates the request shape and hands the binding to [`CarRegistry`].

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::car_registry::map_validation_error;
use crate::domain::ports::{RegisterCarRequest, RegistrationCommand};
use crate::domain::{CarRegistry, Error, OwnerContact};

pub struct RegistrationService {
    registry: Arc<CarRegistry>,
}

impl RegistrationService {
    pub fn new(registry: Arc<CarRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl RegistrationCommand for RegistrationService {
    async fn register(&self, request: RegisterCarRequest) -> Result<(), Error> {
        let RegisterCarRequest {
            owner,
            car_id,
            owner_phone_num,
        } = request;
        let contact = match owner_phone_num {
            Some(number) => OwnerContact::from_number(number).map_err(map_validation_error)?,
            None => None,
        };
        self.registry.register(&car_id, owner, contact).await?;
        Ok(())
    }
}
