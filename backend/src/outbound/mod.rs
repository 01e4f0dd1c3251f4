//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **persistence**: in-memory and JSON-file `CarRepository` adapters
//! - **gateway**: HTTP and logging `DeliveryGateway` adapters
//!
//! Adapters translate between domain types and their medium. They contain no
//! business logic.

pub mod gateway;
pub mod persistence;
