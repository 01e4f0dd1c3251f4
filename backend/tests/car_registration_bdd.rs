//! Behaviour tests for car registration and owner listing.

#[allow(dead_code, reason = "Shared wiring exposes helpers other suites use.")]
#[path = "support/services.rs"]
mod services;

use std::cell::RefCell;

use nomcar::domain::ports::RegisterCarRequest;
use nomcar::domain::{Error, OwnerIdentity};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use services::Services;
use tokio::runtime::Runtime;

struct RegistrationWorld {
    runtime: Runtime,
    services: RefCell<Option<Services>>,
    last_result: RefCell<Option<Result<(), Error>>>,
}

impl RegistrationWorld {
    fn new() -> Self {
        Self {
            runtime: tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("tokio runtime"),
            services: RefCell::new(None),
            last_result: RefCell::new(None),
        }
    }

    fn with_services<T>(&self, f: impl FnOnce(&Services) -> T) -> T {
        let mut slot = self.services.borrow_mut();
        let services = slot.get_or_insert_with(Services::with_defaults);
        f(services)
    }

    fn register(&self, owner: &str, plate: &str, phone: Option<i64>) -> Result<(), Error> {
        let registration = self.with_services(Services::registration);
        self.runtime.block_on(registration.register(RegisterCarRequest {
            owner: OwnerIdentity::new(owner).expect("owner"),
            car_id: plate.to_owned(),
            owner_phone_num: phone,
        }))
    }

    fn plates_of(&self, owner: &str) -> Vec<String> {
        let cars = self.with_services(Services::cars);
        let owner = OwnerIdentity::new(owner).expect("owner");
        self.runtime
            .block_on(cars.list_cars(&owner))
            .expect("listing succeeds")
            .iter()
            .map(|car| car.plate().to_string())
            .collect()
    }

    fn last_result(&self) -> Result<(), Error> {
        self.last_result
            .borrow()
            .clone()
            .expect("a registration was attempted")
    }
}

#[fixture]
fn world() -> RegistrationWorld {
    RegistrationWorld::new()
}

#[given("an empty registry")]
fn an_empty_registry(world: &RegistrationWorld) {
    world.with_services(|_| ());
}

#[given("owner \"{owner}\" has registered car \"{plate}\"")]
fn owner_has_registered_car(world: &RegistrationWorld, owner: String, plate: String) {
    world
        .register(&owner, &plate, None)
        .expect("initial registration succeeds");
}

#[when("owner \"{owner}\" registers car \"{plate}\" with phone {phone}")]
fn owner_registers_car(world: &RegistrationWorld, owner: String, plate: String, phone: i64) {
    let result = world.register(&owner, &plate, Some(phone));
    world.last_result.replace(Some(result));
}

#[then("the registration succeeds")]
fn the_registration_succeeds(world: &RegistrationWorld) {
    world.last_result().expect("registration succeeds");
}

#[then("the registration fails with \"{code}\"")]
fn the_registration_fails_with(world: &RegistrationWorld, code: String) {
    let err = world.last_result().expect_err("registration fails");
    let actual = serde_json::to_value(err.code()).expect("code serialises");
    assert_eq!(actual, code.as_str());
}

#[then("owner \"{owner}\" has exactly the car \"{plate}\"")]
fn owner_has_exactly_the_car(world: &RegistrationWorld, owner: String, plate: String) {
    assert_eq!(world.plates_of(&owner), vec![plate]);
}

#[then("owner \"{owner}\" has no cars")]
fn owner_has_no_cars(world: &RegistrationWorld, owner: String) {
    assert!(world.plates_of(&owner).is_empty());
}

#[scenario(
    path = "tests/features/car_registration.feature",
    name = "A registered car is listed for its owner"
)]
fn a_registered_car_is_listed(world: RegistrationWorld) {
    drop(world);
}

#[scenario(
    path = "tests/features/car_registration.feature",
    name = "Registering the same car twice is idempotent"
)]
fn registering_twice_is_idempotent(world: RegistrationWorld) {
    drop(world);
}

#[scenario(
    path = "tests/features/car_registration.feature",
    name = "Another owner cannot claim a registered plate"
)]
fn another_owner_cannot_claim(world: RegistrationWorld) {
    drop(world);
}

#[scenario(
    path = "tests/features/car_registration.feature",
    name = "Malformed plates are rejected"
)]
fn malformed_plates_are_rejected(world: RegistrationWorld) {
    drop(world);
}
