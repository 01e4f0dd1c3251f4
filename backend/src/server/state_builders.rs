//! Builders wiring adapters and domain services into HTTP state.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use mockable::DefaultClock;
use tracing::info;
use url::Url;

use nomcar::domain::ports::{CarRepository, DeliveryGateway};
use nomcar::domain::{
    CarRegistry, Channel, CodeResolver, DeliveryGateways, NotificationDispatcher,
    NotificationService, RegistrationService,
};
use nomcar::inbound::http::state::HttpState;
use nomcar::outbound::gateway::{HttpDeliveryGateway, LoggingDeliveryGateway};
use nomcar::outbound::persistence::{InMemoryCarRepository, JsonFileCarRepository};

use super::ServerConfig;

/// Use the JSON snapshot when a data file is configured, memory otherwise.
fn build_car_repository(config: &ServerConfig) -> io::Result<Arc<dyn CarRepository>> {
    match &config.data_file {
        Some(path) => {
            let repository = JsonFileCarRepository::open(path).map_err(io::Error::other)?;
            info!(path = %path.display(), "car registry backed by JSON file");
            Ok(Arc::new(repository))
        }
        None => {
            info!("car registry held in memory; registrations are lost on restart");
            Ok(Arc::new(InMemoryCarRepository::default()))
        }
    }
}

fn build_gateway(
    channel: Channel,
    endpoint: Option<&Url>,
    token: Option<&String>,
    timeout: Duration,
) -> io::Result<Arc<dyn DeliveryGateway>> {
    match endpoint {
        Some(url) => {
            info!(%channel, endpoint = %url, "using HTTP delivery gateway");
            let gateway = HttpDeliveryGateway::new(url.clone(), timeout, token.cloned())
                .map_err(io::Error::other)?;
            Ok(Arc::new(gateway))
        }
        None => {
            info!(%channel, "no endpoint configured; deliveries are logged only");
            Ok(Arc::new(LoggingDeliveryGateway::default()))
        }
    }
}

fn build_gateways(config: &ServerConfig) -> io::Result<DeliveryGateways> {
    let endpoints = &config.gateways;
    let timeout = config.dispatcher.delivery_timeout;
    Ok(DeliveryGateways {
        push: Some(build_gateway(
            Channel::Push,
            endpoints.push.as_ref(),
            endpoints.token.as_ref(),
            timeout,
        )?),
        sms: Some(build_gateway(
            Channel::Sms,
            endpoints.sms.as_ref(),
            endpoints.token.as_ref(),
            timeout,
        )?),
    })
}

/// Build the HTTP state from validated configuration.
///
/// # Errors
/// Returns [`io::Error`] when the registry file cannot be opened or a gateway
/// client cannot be constructed.
pub(super) fn build_http_state(config: &ServerConfig) -> io::Result<HttpState> {
    let registry = Arc::new(CarRegistry::new(build_car_repository(config)?));
    let codes = Arc::new(CodeResolver::new(&config.code_secret, Arc::clone(&registry)));
    let dispatcher = Arc::new(NotificationDispatcher::new(
        Arc::clone(&registry),
        build_gateways(config)?,
        Arc::new(DefaultClock),
        config.dispatcher.clone(),
    ));
    let notifications = Arc::new(NotificationService::new(
        Arc::clone(&registry),
        codes,
        dispatcher,
        config.public_base_url.clone(),
    ));

    Ok(HttpState::new(
        Arc::new(RegistrationService::new(registry)),
        notifications.clone(),
        notifications,
    ))
}
