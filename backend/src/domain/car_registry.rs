//! Authoritative owner of car bindings.
//!
//! Writes to one plate are serialised through [`KeyedLocks`], so two owners
//! racing to register the same plate resolve to one success and one
//! [`ErrorCode::OwnershipConflict`](crate::domain::ErrorCode). Reads go
//! straight to the repository.

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info, warn};

use crate::domain::ports::{CarRepository, CarRepositoryError};
use crate::domain::{
    Car, CarValidationError, Error, KeyedLocks, OwnerContact, OwnerIdentity, PlateNumber,
};

/// Result of a successful registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// A new binding was created.
    Created,
    /// The owner re-registered and the contact changed.
    ContactUpdated,
    /// The owner re-registered with identical details; nothing was written.
    Unchanged,
}

pub struct CarRegistry {
    repository: Arc<dyn CarRepository>,
    write_locks: KeyedLocks<PlateNumber>,
}

impl CarRegistry {
    pub fn new(repository: Arc<dyn CarRepository>) -> Self {
        Self {
            repository,
            write_locks: KeyedLocks::new(),
        }
    }

    /// Create or refresh the binding for `plate`.
    ///
    /// `plate` is parsed with format validation; a binding held by another
    /// owner is never modified.
    pub async fn register(
        &self,
        plate: &str,
        owner: OwnerIdentity,
        contact: Option<OwnerContact>,
    ) -> Result<RegistrationOutcome, Error> {
        let plate = PlateNumber::parse(plate).map_err(map_validation_error)?;
        let _guard = self.write_locks.lock(plate.clone()).await;

        let existing = self
            .repository
            .find_by_plate(&plate)
            .await
            .map_err(map_repository_error)?;

        let (car, outcome) = match existing {
            None => (
                Car::register(plate, owner, contact),
                RegistrationOutcome::Created,
            ),
            Some(car) if !car.is_owned_by(&owner) => {
                warn!(plate = %car.plate(), "registration rejected: plate bound to another owner");
                return Err(Error::ownership_conflict(format!(
                    "car {} is registered to another owner",
                    car.plate()
                ))
                .with_details(json!({ "carId": car.plate().as_ref() })));
            }
            Some(car) if car.contact() == contact.as_ref() => {
                debug!(plate = %car.plate(), "registration unchanged");
                return Ok(RegistrationOutcome::Unchanged);
            }
            Some(car) => (
                car.update_contact(contact),
                RegistrationOutcome::ContactUpdated,
            ),
        };

        self.repository
            .save(&car)
            .await
            .map_err(map_repository_error)?;
        info!(plate = %car.plate(), ?outcome, "car registration stored");
        Ok(outcome)
    }

    /// Every car held by `owner`, ordered by plate.
    pub async fn list_by_owner(&self, owner: &OwnerIdentity) -> Result<Vec<Car>, Error> {
        let mut cars = self
            .repository
            .list_by_owner(owner)
            .await
            .map_err(map_repository_error)?;
        cars.sort_by(|left, right| left.plate().cmp(right.plate()));
        Ok(cars)
    }

    /// Fetch the binding for `plate`.
    ///
    /// The plate is normalised but not format checked, so an unrecognised
    /// plate is reported as not found.
    pub async fn get(&self, plate: &str) -> Result<Car, Error> {
        let plate = PlateNumber::normalise(plate).map_err(map_validation_error)?;
        self.find(&plate).await
    }

    pub(crate) async fn find(&self, plate: &PlateNumber) -> Result<Car, Error> {
        self.repository
            .find_by_plate(plate)
            .await
            .map_err(map_repository_error)?
            .ok_or_else(|| {
                Error::not_found(format!("car {plate} is not registered"))
                    .with_details(json!({ "carId": plate.as_ref() }))
            })
    }
}

pub(crate) fn map_validation_error(error: CarValidationError) -> Error {
    let field = match &error {
        CarValidationError::EmptyPlate | CarValidationError::InvalidPlateFormat { .. } => "car_id",
        CarValidationError::EmptyOwner => "owner",
        CarValidationError::InvalidContact => "owner_phone_num",
    };
    Error::invalid_input(error.to_string()).with_details(json!({ "field": field }))
}

fn map_repository_error(error: CarRepositoryError) -> Error {
    match error {
        CarRepositoryError::Unavailable { message } => {
            Error::service_unavailable(format!("car repository unavailable: {message}"))
        }
        CarRepositoryError::Storage { message } => {
            Error::internal(format!("car repository storage failed: {message}"))
        }
    }
}
