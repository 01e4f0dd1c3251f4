//! Delivery gateway adapters implementing the `DeliveryGateway` port.

mod dto;
mod http_gateway;
mod logging_gateway;

pub use http_gateway::HttpDeliveryGateway;
pub use logging_gateway::LoggingDeliveryGateway;
