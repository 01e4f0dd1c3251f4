//! Driven port for durable car bindings.
//!
//! The registry owns concurrency control; adapters only need atomic
//! single-record reads and writes so a reader never observes a partial car.

use async_trait::async_trait;

use crate::domain::{Car, OwnerIdentity, PlateNumber};

use super::define_port_error;

define_port_error! {
    /// Persistence errors raised by car repository adapters.
    pub enum CarRepositoryError {
        /// Backing store could not be reached.
        Unavailable { message: String } => "car repository unavailable: {message}",
        /// Stored data could not be read or written.
        Storage { message: String } => "car repository storage failed: {message}",
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CarRepository: Send + Sync {
    /// Fetch the binding for `plate`, if any.
    async fn find_by_plate(&self, plate: &PlateNumber) -> Result<Option<Car>, CarRepositoryError>;

    /// Every binding held by `owner`, ordered by plate.
    async fn list_by_owner(&self, owner: &OwnerIdentity) -> Result<Vec<Car>, CarRepositoryError>;

    /// Insert or replace the binding keyed by the car's plate.
    ///
    /// Returns only once the write is durable for the adapter's medium.
    async fn save(&self, car: &Car) -> Result<(), CarRepositoryError>;
}
