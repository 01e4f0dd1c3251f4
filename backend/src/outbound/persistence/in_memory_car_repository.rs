//! Process-local car repository.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::domain::ports::{CarRepository, CarRepositoryError};
use crate::domain::{Car, OwnerIdentity, PlateNumber};

/// Cars keyed by plate, held behind a read-write lock.
#[derive(Debug, Default)]
pub struct InMemoryCarRepository {
    cars: RwLock<BTreeMap<PlateNumber, Car>>,
}

impl InMemoryCarRepository {
    /// Seed the repository with existing cars.
    pub fn with_cars(cars: impl IntoIterator<Item = Car>) -> Self {
        Self {
            cars: RwLock::new(
                cars.into_iter()
                    .map(|car| (car.plate().clone(), car))
                    .collect(),
            ),
        }
    }

    /// Copy of every stored car, ordered by plate.
    pub fn snapshot(&self) -> Result<Vec<Car>, CarRepositoryError> {
        let cars = self.cars.read().map_err(|_| poisoned())?;
        Ok(cars.values().cloned().collect())
    }

    pub(super) fn insert(&self, car: Car) -> Result<(), CarRepositoryError> {
        let mut cars = self.cars.write().map_err(|_| poisoned())?;
        cars.insert(car.plate().clone(), car);
        Ok(())
    }
}

fn poisoned() -> CarRepositoryError {
    CarRepositoryError::storage("car map lock poisoned")
}

#[async_trait]
impl CarRepository for InMemoryCarRepository {
    async fn find_by_plate(&self, plate: &PlateNumber) -> Result<Option<Car>, CarRepositoryError> {
        let cars = self.cars.read().map_err(|_| poisoned())?;
        Ok(cars.get(plate).cloned())
    }

    async fn list_by_owner(&self, owner: &OwnerIdentity) -> Result<Vec<Car>, CarRepositoryError> {
        let cars = self.cars.read().map_err(|_| poisoned())?;
        Ok(cars
            .values()
            .filter(|car| car.is_owned_by(owner))
            .cloned()
            .collect())
    }

    async fn save(&self, car: &Car) -> Result<(), CarRepositoryError> {
        self.insert(car.clone())
    }
}
