//! Notification dispatch: resolve the owner, deliver, retry, deduplicate.
//!
//! Each request moves through `Requested -> Resolving -> Sending` and ends in
//! `Delivered` or `Failed`. Requests for the same `(plate, channel)` pair are
//! serialised so a double tap inside the idempotency window is answered from
//! the recent-dispatch cache, with the same result or the same failure,
//! instead of reaching the gateway twice.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use mockable::Clock;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, warn};
use utoipa::ToSchema;

use crate::domain::ports::{DeliveryGatewayError, DeliveryReceipt, OutboundMessage};
use crate::domain::{
    Car, CarRegistry, Channel, ChannelSet, Error, KeyedLocks, PlateNumber, TraceId,
};

mod attempt_error;
mod message;
mod recent_deliveries;
mod runtime;

use attempt_error::AttemptError;
pub use attempt_error::FailureClass;
use recent_deliveries::{DeliveryKey, RecentDeliveries, RecordedDispatch, RecordedFailure};
pub use runtime::{DeliveryGateways, DispatcherRuntime, RandomJitter, TokioSleeper};

/// Dispatcher configuration controlling retries and deduplication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// Channels accepted from callers.
    pub channels: ChannelSet,
    /// Span during which a repeat request returns the earlier result.
    pub idempotency_window: Duration,
    /// Maximum gateway attempts per request, including the first.
    pub max_attempts: u32,
    /// Initial retry backoff.
    pub initial_backoff: Duration,
    /// Maximum retry backoff cap.
    pub max_backoff: Duration,
    /// Upper bound on a single gateway call.
    pub delivery_timeout: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            channels: ChannelSet::default(),
            idempotency_window: Duration::from_secs(5),
            max_attempts: 3,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(2),
            delivery_timeout: Duration::from_secs(5),
        }
    }
}

/// Terminal outcome of a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryOutcome {
    Delivered,
    Failed,
}

/// Report of one dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct DeliveryResult {
    /// Plate the notification was about.
    #[schema(value_type = String, example = "粤A12345")]
    pub car_id: PlateNumber,
    /// Channel used.
    pub channel: Channel,
    pub outcome: DeliveryOutcome,
    /// Gateway calls made.
    pub attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_reference: Option<String>,
    /// When the dispatch reached its terminal state.
    pub completed_at: DateTime<Utc>,
}

/// Dispatch lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Requested,
    Resolving,
    Sending,
    Delivered,
    Failed,
}

impl DispatchState {
    /// Whether `next` is a legal successor of `self`.
    pub fn can_advance_to(self, next: DispatchState) -> bool {
        matches!(
            (self, next),
            (Self::Requested, Self::Resolving)
                | (Self::Resolving, Self::Sending | Self::Failed)
                | (Self::Sending, Self::Delivered | Self::Failed)
        )
    }

    fn advance(self, next: DispatchState, plate: &str, channel: &str) -> DispatchState {
        debug_assert!(self.can_advance_to(next), "{self:?} -> {next:?}");
        debug!(plate, channel, from = ?self, to = ?next, "dispatch state changed");
        next
    }
}

/// Async clock-independent sleeping abstraction for retries.
#[async_trait]
pub trait RetrySleeper: Send + Sync {
    /// Suspend execution for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Retry backoff jitter abstraction.
pub trait BackoffJitter: Send + Sync {
    /// Return a jittered delay from the exponential base delay.
    ///
    /// ```rust
    /// use nomcar::domain::BackoffJitter;
    /// use chrono::{TimeZone, Utc};
    /// use std::time::Duration;
    /// struct FixedJitter;
    /// impl BackoffJitter for FixedJitter {
    ///     fn jittered_delay(&self, base: Duration, attempt: u32, _now: chrono::DateTime<chrono::Utc>) -> Duration {
    ///         base + Duration::from_millis(u64::from(attempt) * 10)
    ///     }
    /// }
    /// let now = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).single().expect("valid time");
    /// let delay = FixedJitter.jittered_delay(Duration::from_millis(200), 2, now);
    /// assert_eq!(delay, Duration::from_millis(220));
    /// ```
    fn jittered_delay(&self, base: Duration, attempt: u32, now: DateTime<Utc>) -> Duration;
}

/// Routes notification requests to channel gateways.
pub struct NotificationDispatcher {
    registry: Arc<CarRegistry>,
    gateways: DeliveryGateways,
    clock: Arc<dyn Clock>,
    sleeper: Arc<dyn RetrySleeper>,
    jitter: Arc<dyn BackoffJitter>,
    config: DispatcherConfig,
    in_flight: KeyedLocks<DeliveryKey>,
    recent: Mutex<RecentDeliveries>,
}

impl NotificationDispatcher {
    /// Build a dispatcher using default runtime dependencies.
    pub fn new(
        registry: Arc<CarRegistry>,
        gateways: DeliveryGateways,
        clock: Arc<dyn Clock>,
        config: DispatcherConfig,
    ) -> Self {
        Self::with_runtime(
            registry,
            gateways,
            clock,
            DispatcherRuntime::default(),
            config,
        )
    }

    /// Build a dispatcher with injected runtime abstractions.
    pub fn with_runtime(
        registry: Arc<CarRegistry>,
        gateways: DeliveryGateways,
        clock: Arc<dyn Clock>,
        runtime: DispatcherRuntime,
        config: DispatcherConfig,
    ) -> Self {
        let window = TimeDelta::from_std(config.idempotency_window).unwrap_or(TimeDelta::MAX);
        Self {
            registry,
            gateways,
            clock,
            sleeper: runtime.sleeper,
            jitter: runtime.jitter,
            config,
            in_flight: KeyedLocks::new(),
            recent: Mutex::new(RecentDeliveries::new(window)),
        }
    }

    /// Channels callers may request.
    pub fn channels(&self) -> &ChannelSet {
        &self.config.channels
    }

    /// Notify the owner of `car_id` through `channel`.
    ///
    /// The dispatch runs on its own task: if the caller goes away, delivery
    /// and its retries still finish and only the result is dropped.
    pub async fn notify(self: &Arc<Self>, car_id: &str, channel: &str) -> Result<DeliveryResult, Error> {
        let this = Arc::clone(self);
        let car_id = car_id.to_owned();
        let channel = channel.to_owned();
        let task = tokio::spawn(TraceId::inherit(TraceId::current(), async move {
            this.dispatch(&car_id, &channel).await
        }));
        task.await
            .map_err(|error| Error::internal(format!("notification task failed: {error}")))?
    }

    /// Run one dispatch on the current task.
    pub async fn dispatch(&self, car_id: &str, channel: &str) -> Result<DeliveryResult, Error> {
        let requested_at = self.clock.utc();
        let state = DispatchState::Requested.advance(DispatchState::Resolving, car_id, channel);

        let car = match self.registry.get(car_id).await {
            Ok(car) => car,
            Err(error) => {
                state.advance(DispatchState::Failed, car_id, channel);
                return Err(error);
            }
        };
        let channel = match self.resolve_channel(channel) {
            Ok(channel) => channel,
            Err(error) => {
                state.advance(DispatchState::Failed, car_id, channel);
                return Err(error);
            }
        };

        let key = (car.plate().clone(), channel);
        let _guard = self.in_flight.lock(key.clone()).await;

        if let Some(previous) = self.recent_dispatch(&key) {
            info!(
                plate = %car.plate(),
                %channel,
                outcome = ?previous.result.outcome,
                "duplicate notification absorbed"
            );
            return replay(previous);
        }

        let state = state.advance(DispatchState::Sending, car.plate().as_ref(), channel.as_str());
        match self.deliver_with_retries(&car, channel).await {
            Ok((receipt, attempts)) => {
                state.advance(DispatchState::Delivered, car.plate().as_ref(), channel.as_str());
                let result = self.completed(&car, channel, DeliveryOutcome::Delivered, attempts, receipt);
                self.remember(
                    key,
                    RecordedDispatch {
                        requested_at,
                        result: result.clone(),
                        failure: None,
                    },
                );
                info!(plate = %car.plate(), %channel, attempts, "notification delivered");
                Ok(result)
            }
            Err((failure, attempts)) => {
                state.advance(DispatchState::Failed, car.plate().as_ref(), channel.as_str());
                let result = self.completed(
                    &car,
                    channel,
                    DeliveryOutcome::Failed,
                    attempts,
                    DeliveryReceipt {
                        provider_reference: None,
                    },
                );
                warn!(
                    plate = %car.plate(),
                    %channel,
                    attempts,
                    class = ?failure.class,
                    error = %failure.error,
                    "notification delivery failed"
                );
                let recorded = RecordedFailure {
                    class: failure.class,
                    reason: failure.error.to_string(),
                };
                let error = delivery_failed_error(&result, &recorded);
                self.remember(
                    key,
                    RecordedDispatch {
                        requested_at,
                        result,
                        failure: Some(recorded),
                    },
                );
                Err(error)
            }
        }
    }

    fn resolve_channel(&self, name: &str) -> Result<Channel, Error> {
        let channel: Channel = name.parse().map_err(|err: crate::domain::UnknownChannel| {
            Error::unsupported_channel(err.to_string()).with_details(json!({ "channel": name }))
        })?;
        if !self.config.channels.contains(channel) || self.gateways.for_channel(channel).is_none()
        {
            return Err(Error::unsupported_channel(format!(
                "channel {channel} is not configured"
            ))
            .with_details(json!({ "channel": channel.as_str() })));
        }
        Ok(channel)
    }

    async fn deliver_with_retries(
        &self,
        car: &Car,
        channel: Channel,
    ) -> Result<(DeliveryReceipt, u32), (AttemptError, u32)> {
        let gateway = self
            .gateways
            .for_channel(channel)
            .ok_or_else(|| (AttemptError::from(DeliveryGatewayError::rejected("no gateway")), 0))?;
        let message = message::build_message(car, channel, self.clock.utc())
            .map_err(|error| (AttemptError::from(error), 0))?;
        let max_attempts = self.config.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            let failure = match self.attempt(gateway.as_ref(), &message).await {
                Ok(receipt) => return Ok((receipt, attempt)),
                Err(failure) => failure,
            };
            match failure.class {
                FailureClass::Transient if attempt < max_attempts => {
                    debug!(plate = %car.plate(), %channel, attempt, error = %failure.error, "retrying delivery");
                    let base_delay = self.retry_base_delay(attempt);
                    let jittered = self
                        .jitter
                        .jittered_delay(base_delay, attempt, self.clock.utc());
                    self.sleeper.sleep(jittered).await;
                }
                _ => return Err((failure, attempt)),
            }
        }

        Err((
            AttemptError::from(DeliveryGatewayError::rejected(
                "retry loop ended without an outcome",
            )),
            max_attempts,
        ))
    }

    async fn attempt(
        &self,
        gateway: &dyn crate::domain::ports::DeliveryGateway,
        message: &OutboundMessage,
    ) -> Result<DeliveryReceipt, AttemptError> {
        match tokio::time::timeout(self.config.delivery_timeout, gateway.deliver(message)).await {
            Ok(Ok(receipt)) => Ok(receipt),
            Ok(Err(error)) => Err(AttemptError::from(error)),
            Err(_) => Err(AttemptError::from(DeliveryGatewayError::timeout(format!(
                "no response within {:?}",
                self.config.delivery_timeout
            )))),
        }
    }

    fn completed(
        &self,
        car: &Car,
        channel: Channel,
        outcome: DeliveryOutcome,
        attempts: u32,
        receipt: DeliveryReceipt,
    ) -> DeliveryResult {
        DeliveryResult {
            car_id: car.plate().clone(),
            channel,
            outcome,
            attempts,
            provider_reference: receipt.provider_reference,
            completed_at: self.clock.utc(),
        }
    }

    fn recent_dispatch(&self, key: &DeliveryKey) -> Option<RecordedDispatch> {
        let now = self.clock.utc();
        self.recent
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(key, now)
    }

    fn remember(&self, key: DeliveryKey, recorded: RecordedDispatch) {
        let now = self.clock.utc();
        self.recent
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(key, recorded, now);
    }

    fn retry_base_delay(&self, attempt: u32) -> Duration {
        let exponent = 2_u32.saturating_pow(attempt.saturating_sub(1));
        let base_ms = u64::try_from(self.config.initial_backoff.as_millis()).unwrap_or(u64::MAX);
        let max_ms = u64::try_from(self.config.max_backoff.as_millis()).unwrap_or(u64::MAX);
        Duration::from_millis(base_ms.saturating_mul(u64::from(exponent)).min(max_ms))
    }
}

/// Answer a repeat request with the earlier outcome, failures included.
fn replay(recorded: RecordedDispatch) -> Result<DeliveryResult, Error> {
    match recorded.failure {
        None => Ok(recorded.result),
        Some(failure) => Err(delivery_failed_error(&recorded.result, &failure)),
    }
}

fn delivery_failed_error(result: &DeliveryResult, failure: &RecordedFailure) -> Error {
    let message = match failure.class {
        FailureClass::Transient => format!(
            "notification for {} via {} failed after {} attempts",
            result.car_id, result.channel, result.attempts
        ),
        FailureClass::Permanent => format!(
            "notification for {} via {} was rejected",
            result.car_id, result.channel
        ),
    };
    Error::delivery_failed(message).with_details(json!({
        "result": result,
        "classification": failure.class,
        "reason": failure.reason,
    }))
}
