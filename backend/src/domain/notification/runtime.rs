//! Gateway bundle and retry runtime helpers for the dispatcher.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::Rng as _;

use crate::domain::Channel;
use crate::domain::ports::DeliveryGateway;

use super::{BackoffJitter, RetrySleeper};

/// One optional gateway per channel.
#[derive(Clone, Default)]
pub struct DeliveryGateways {
    /// Push notification provider.
    pub push: Option<Arc<dyn DeliveryGateway>>,
    /// SMS provider.
    pub sms: Option<Arc<dyn DeliveryGateway>>,
}

impl DeliveryGateways {
    /// Bundle with the same gateway behind every channel.
    pub fn uniform(gateway: Arc<dyn DeliveryGateway>) -> Self {
        Self {
            push: Some(Arc::clone(&gateway)),
            sms: Some(gateway),
        }
    }

    /// Gateway configured for `channel`, if any.
    pub fn for_channel(&self, channel: Channel) -> Option<&Arc<dyn DeliveryGateway>> {
        match channel {
            Channel::Push => self.push.as_ref(),
            Channel::Sms => self.sms.as_ref(),
        }
    }
}

/// Runtime helpers used by the retry loop.
pub struct DispatcherRuntime {
    /// Async sleep implementation.
    pub sleeper: Arc<dyn RetrySleeper>,
    /// Jitter strategy for retry delays.
    pub jitter: Arc<dyn BackoffJitter>,
}

impl Default for DispatcherRuntime {
    fn default() -> Self {
        Self {
            sleeper: Arc::new(TokioSleeper),
            jitter: Arc::new(RandomJitter),
        }
    }
}

/// Tokio-based sleeper implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl RetrySleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Adds up to a quarter of the base delay, drawn from the thread RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomJitter;

impl BackoffJitter for RandomJitter {
    fn jittered_delay(&self, base: Duration, _attempt: u32, _now: DateTime<Utc>) -> Duration {
        let base_ms = u64::try_from(base.as_millis()).unwrap_or(u64::MAX);
        let max_extra = (base_ms / 4).max(1);
        let extra = rand::thread_rng().gen_range(0..=max_extra);
        Duration::from_millis(base_ms.saturating_add(extra))
    }
}
