//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Driven ports (`CarRepository`, `DeliveryGateway`) are implemented by
//! outbound adapters. Driving ports (`RegistrationCommand`,
//! `NotificationCommand`, `CarQuery`) are what inbound adapters call.

mod macros;
pub(crate) use macros::define_port_error;

mod car_query;
mod car_repository;
mod delivery_gateway;
mod notification_command;
mod registration_command;

#[cfg(test)]
pub use car_query::MockCarQuery;
pub use car_query::{CarQuery, IssuedCode};
#[cfg(test)]
pub use car_repository::MockCarRepository;
pub use car_repository::{CarRepository, CarRepositoryError};
#[cfg(test)]
pub use delivery_gateway::MockDeliveryGateway;
pub use delivery_gateway::{
    DeliveryGateway, DeliveryGatewayError, DeliveryReceipt, OutboundMessage,
};
#[cfg(test)]
pub use notification_command::MockNotificationCommand;
pub use notification_command::{NotificationCommand, NotifyOwnerRequest};
#[cfg(test)]
pub use registration_command::MockRegistrationCommand;
pub use registration_command::{RegisterCarRequest, RegistrationCommand};
