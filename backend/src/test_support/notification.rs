//! Shared test doubles for notification dispatch tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeDelta, TimeZone, Utc};
use mockable::Clock;

use crate::domain::ports::{
    DeliveryGateway, DeliveryGatewayError, DeliveryReceipt, OutboundMessage,
};
use crate::domain::{BackoffJitter, RetrySleeper};

/// Fixed instant used as the starting point for test clocks.
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0)
        .single()
        .unwrap_or_else(|| panic!("fixed test instant must be valid"))
}

/// Clock whose time only moves when a test advances it.
pub struct MutableClock(Mutex<DateTime<Utc>>);

impl MutableClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    pub fn advance(&self, delta: Duration) {
        let delta = match TimeDelta::from_std(delta) {
            Ok(delta) => delta,
            Err(error) => panic!("failed to convert {delta:?} to TimeDelta: {error}"),
        };
        *self.lock_clock() += delta;
    }

    fn lock_clock(&self) -> std::sync::MutexGuard<'_, DateTime<Utc>> {
        match self.0.lock() {
            Ok(guard) => guard,
            Err(_) => panic!("clock mutex"),
        }
    }
}

impl Clock for MutableClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.lock_clock()
    }
}

/// Sleeper that returns at once and remembers each requested delay.
#[derive(Default)]
pub struct RecordingSleeper(Mutex<Vec<Duration>>);

impl RecordingSleeper {
    pub fn delays(&self) -> Vec<Duration> {
        match self.0.lock() {
            Ok(entries) => entries.clone(),
            Err(_) => panic!("sleeper mutex"),
        }
    }
}

#[async_trait]
impl RetrySleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        match self.0.lock() {
            Ok(mut entries) => entries.push(duration),
            Err(_) => panic!("sleeper mutex"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoJitter;

impl BackoffJitter for NoJitter {
    fn jittered_delay(&self, base: Duration, _attempt: u32, _now: DateTime<Utc>) -> Duration {
        base
    }
}

/// Gateway step: reply with a result, optionally after a delay.
pub enum GatewayStep {
    Reply(Result<DeliveryReceipt, DeliveryGatewayError>),
    Stall(Duration),
}

/// Gateway that replays a script and records every message it sees.
///
/// Once the script runs out every call succeeds.
#[derive(Default)]
pub struct ScriptedGateway {
    script: Mutex<VecDeque<GatewayStep>>,
    calls: AtomicUsize,
    messages: Mutex<Vec<OutboundMessage>>,
}

impl ScriptedGateway {
    pub fn new(script: Vec<GatewayStep>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            ..Self::default()
        }
    }

    /// Shorthand for a script made only of immediate replies.
    pub fn replying(
        replies: impl IntoIterator<Item = Result<DeliveryReceipt, DeliveryGatewayError>>,
    ) -> Self {
        Self::new(replies.into_iter().map(GatewayStep::Reply).collect())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn messages(&self) -> Vec<OutboundMessage> {
        match self.messages.lock() {
            Ok(messages) => messages.clone(),
            Err(_) => panic!("gateway messages mutex"),
        }
    }

    fn next_step(&self) -> Option<GatewayStep> {
        match self.script.lock() {
            Ok(mut script) => script.pop_front(),
            Err(_) => panic!("gateway script mutex"),
        }
    }
}

/// Receipt carrying `reference`.
pub fn receipt(reference: &str) -> DeliveryReceipt {
    DeliveryReceipt {
        provider_reference: Some(reference.to_owned()),
    }
}

#[async_trait]
impl DeliveryGateway for ScriptedGateway {
    async fn deliver(
        &self,
        message: &OutboundMessage,
    ) -> Result<DeliveryReceipt, DeliveryGatewayError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        match self.messages.lock() {
            Ok(mut messages) => messages.push(message.clone()),
            Err(_) => panic!("gateway messages mutex"),
        }
        match self.next_step() {
            Some(GatewayStep::Reply(result)) => result,
            Some(GatewayStep::Stall(delay)) => {
                tokio::time::sleep(delay).await;
                Ok(receipt(&format!("late-{call}")))
            }
            None => Ok(receipt(&format!("msg-{call}"))),
        }
    }
}
