//! HTTP server configuration object and helpers.

use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;

#[cfg(feature = "metrics")]
use actix_web_prom::PrometheusMetrics;
use url::Url;

use nomcar::domain::{CodeSecret, DispatcherConfig};
use nomcar::settings::{BuildMode, NomcarSettings, load_code_secret};

/// Provider endpoints for the outbound delivery gateways.
#[derive(Debug, Clone, Default)]
pub struct GatewayEndpoints {
    pub push: Option<Url>,
    pub sms: Option<Url>,
    pub token: Option<String>,
}

/// Fully validated configuration for creating the HTTP server.
pub struct ServerConfig {
    pub(crate) bind_addr: SocketAddr,
    pub(crate) public_base_url: Url,
    pub(crate) code_secret: CodeSecret,
    pub(crate) dispatcher: DispatcherConfig,
    pub(crate) gateways: GatewayEndpoints,
    pub(crate) data_file: Option<PathBuf>,
    #[cfg(feature = "metrics")]
    pub(crate) prometheus: Option<PrometheusMetrics>,
}

impl ServerConfig {
    /// Validate raw settings and load the code secret.
    ///
    /// # Errors
    /// Returns [`io::Error`] when a setting is malformed or the secret cannot
    /// be loaded under the current build mode.
    pub fn from_settings(settings: &NomcarSettings, mode: BuildMode) -> io::Result<Self> {
        let code_secret = load_code_secret(
            &settings.code_secret_file(),
            settings.allow_ephemeral_secret,
            mode,
        )
        .map_err(io::Error::other)?;

        Ok(Self {
            bind_addr: settings.bind_addr().map_err(io::Error::other)?,
            public_base_url: settings.public_base_url().map_err(io::Error::other)?,
            code_secret,
            dispatcher: settings.dispatcher_config().map_err(io::Error::other)?,
            gateways: GatewayEndpoints {
                push: settings.push_endpoint().map_err(io::Error::other)?,
                sms: settings.sms_endpoint().map_err(io::Error::other)?,
                token: settings.gateway_token.clone(),
            },
            data_file: settings.data_file.clone(),
            #[cfg(feature = "metrics")]
            prometheus: None,
        })
    }

    #[cfg(feature = "metrics")]
    /// Attach Prometheus middleware to the configuration.
    pub fn with_metrics(mut self, prometheus: PrometheusMetrics) -> Self {
        self.prometheus = Some(prometheus);
        self
    }

    /// Return the socket address the server will bind to.
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }
}
