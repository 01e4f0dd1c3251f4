//! Shared HTTP adapter state.
//!
//! Handlers accept this state via `actix_web::web::Data` so they only depend on
//! the driving ports and remain testable with mocks.

use std::sync::Arc;

use crate::domain::ports::{CarQuery, NotificationCommand, RegistrationCommand};

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub registration: Arc<dyn RegistrationCommand>,
    pub notification: Arc<dyn NotificationCommand>,
    pub cars: Arc<dyn CarQuery>,
}

impl HttpState {
    /// Construct state from the driving port implementations.
    ///
    /// # Examples
    /// ```ignore
    /// let state = HttpState::new(registration, notification, cars);
    /// let app = App::new().app_data(web::Data::new(state));
    /// ```
    pub fn new(
        registration: Arc<dyn RegistrationCommand>,
        notification: Arc<dyn NotificationCommand>,
        cars: Arc<dyn CarQuery>,
    ) -> Self {
        Self {
            registration,
            notification,
            cars,
        }
    }
}
