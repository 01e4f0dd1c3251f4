//! Server settings loaded via OrthoConfig.
//!
//! Every value can come from a `NOMCAR_*` environment variable, the CLI, or a
//! configuration file. Missing values fall back to local-development defaults
//! and are converted into typed domain configuration on demand.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::domain::{ChannelSet, DispatcherConfig, UnknownChannel};

mod code_secret;

pub use code_secret::{BuildMode, CodeSecretConfigError, load_code_secret};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_PUBLIC_BASE_URL: &str = "http://localhost:8080/";
const DEFAULT_CODE_SECRET_FILE: &str = "/var/run/secrets/nomcar_code_secret";

/// Errors raised while turning raw settings into typed values.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("invalid bind address '{value}': {source}")]
    BindAddr {
        value: String,
        #[source]
        source: std::net::AddrParseError,
    },
    #[error("invalid URL for {name} '{value}': {source}")]
    Url {
        name: &'static str,
        value: String,
        #[source]
        source: url::ParseError,
    },
    #[error("invalid channel list: {0}")]
    Channels(#[from] UnknownChannel),
    #[error("at least one notification channel must be enabled")]
    NoChannels,
    #[error("max_attempts must be at least 1")]
    ZeroAttempts,
}

/// Configuration values for the nomcar server.
#[derive(Debug, Clone, Default, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "NOMCAR")]
pub struct NomcarSettings {
    /// Socket address the HTTP server binds to.
    pub bind_addr: Option<String>,
    /// Externally reachable base URL used to build notify links.
    pub public_base_url: Option<String>,
    /// File holding the secret used to seal scannable codes.
    pub code_secret_file: Option<PathBuf>,
    /// Permit a generated code secret when the file cannot be read.
    #[ortho_config(default = false)]
    pub allow_ephemeral_secret: bool,
    /// Comma separated list of channels callers may request.
    pub channels: Option<String>,
    pub idempotency_window_ms: Option<u64>,
    /// Gateway attempts per notification, including the first.
    pub max_attempts: Option<u32>,
    pub initial_backoff_ms: Option<u64>,
    pub max_backoff_ms: Option<u64>,
    /// Upper bound on one gateway call.
    pub delivery_timeout_ms: Option<u64>,
    /// Push provider endpoint. Push messages are only logged when unset.
    pub push_endpoint: Option<String>,
    /// SMS provider endpoint. SMS messages are only logged when unset.
    pub sms_endpoint: Option<String>,
    /// Bearer token sent to both gateways.
    pub gateway_token: Option<String>,
    /// JSON snapshot file for registrations. Registrations stay in memory
    /// when unset.
    pub data_file: Option<PathBuf>,
}

impl NomcarSettings {
    pub fn bind_addr(&self) -> Result<SocketAddr, SettingsError> {
        let value = self.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR);
        value.parse().map_err(|source| SettingsError::BindAddr {
            value: value.to_owned(),
            source,
        })
    }

    /// Base URL for notify links, always ending in `/` so joins append.
    pub fn public_base_url(&self) -> Result<Url, SettingsError> {
        let raw = self
            .public_base_url
            .as_deref()
            .unwrap_or(DEFAULT_PUBLIC_BASE_URL);
        let value = if raw.ends_with('/') {
            raw.to_owned()
        } else {
            format!("{raw}/")
        };
        parse_url("public_base_url", &value)
    }

    pub fn code_secret_file(&self) -> PathBuf {
        self.code_secret_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CODE_SECRET_FILE))
    }

    pub fn push_endpoint(&self) -> Result<Option<Url>, SettingsError> {
        self.push_endpoint
            .as_deref()
            .map(|value| parse_url("push_endpoint", value))
            .transpose()
    }

    pub fn sms_endpoint(&self) -> Result<Option<Url>, SettingsError> {
        self.sms_endpoint
            .as_deref()
            .map(|value| parse_url("sms_endpoint", value))
            .transpose()
    }

    /// Build the dispatcher configuration, filling gaps with its defaults.
    pub fn dispatcher_config(&self) -> Result<DispatcherConfig, SettingsError> {
        let defaults = DispatcherConfig::default();

        let channels = match self.channels.as_deref() {
            Some(raw) => raw.parse::<ChannelSet>()?,
            None => defaults.channels,
        };
        if channels.is_empty() {
            return Err(SettingsError::NoChannels);
        }

        let max_attempts = self.max_attempts.unwrap_or(defaults.max_attempts);
        if max_attempts == 0 {
            return Err(SettingsError::ZeroAttempts);
        }

        let millis = |value: Option<u64>, fallback: Duration| {
            value.map_or(fallback, Duration::from_millis)
        };

        Ok(DispatcherConfig {
            channels,
            idempotency_window: millis(self.idempotency_window_ms, defaults.idempotency_window),
            max_attempts,
            initial_backoff: millis(self.initial_backoff_ms, defaults.initial_backoff),
            max_backoff: millis(self.max_backoff_ms, defaults.max_backoff),
            delivery_timeout: millis(self.delivery_timeout_ms, defaults.delivery_timeout),
        })
    }
}

fn parse_url(name: &'static str, value: &str) -> Result<Url, SettingsError> {
    Url::parse(value).map_err(|source| SettingsError::Url {
        name,
        value: value.to_owned(),
        source,
    })
}
