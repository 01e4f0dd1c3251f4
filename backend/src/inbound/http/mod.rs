//! HTTP inbound adapter exposing the nomcar endpoints.
//!
//! Handlers translate requests into driving-port calls and map domain errors
//! onto status codes. They hold no registration or dispatch logic.

pub mod cars;
pub mod error;
pub mod health;
pub mod identity;
pub mod notify;
pub mod response;
pub mod state;

pub use error::ApiResult;

use actix_web::web;

/// Base path shared by the car and notify endpoints.
pub const API_SCOPE: &str = "/nomcar/api";

/// Register the nomcar API routes under [`API_SCOPE`].
///
/// Callers still provide [`state::HttpState`] as app data.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope(API_SCOPE)
            .app_data(cars::json_config())
            .service(cars::register_car)
            .service(cars::list_cars)
            .service(cars::issue_code)
            .service(notify::notify_owner),
    );
}
