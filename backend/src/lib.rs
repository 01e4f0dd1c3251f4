//! nomcar: car registration and "please move your car" notifications.
//!
//! The crate is laid out hexagonally. [`domain`] holds the rules and ports,
//! [`inbound`] the HTTP adapter, and [`outbound`] the storage and delivery
//! adapters. [`settings`] turns configuration into typed domain values.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
pub mod settings;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
pub use domain::TraceId;
pub use middleware::Trace;
