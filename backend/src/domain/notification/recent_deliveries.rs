//! Short-lived memory of finished dispatches used to absorb repeat taps.

use std::collections::HashMap;

use chrono::{DateTime, TimeDelta, Utc};

use crate::domain::{Channel, PlateNumber};

use super::{DeliveryResult, FailureClass};

pub(super) type DeliveryKey = (PlateNumber, Channel);

/// Why a recorded dispatch failed, kept so a repeat gets the same answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct RecordedFailure {
    pub(super) class: FailureClass,
    pub(super) reason: String,
}

/// Terminal outcome of one dispatch.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct RecordedDispatch {
    /// When the dispatch was requested; the window is measured from here.
    pub(super) requested_at: DateTime<Utc>,
    pub(super) result: DeliveryResult,
    /// `None` when the message was delivered.
    pub(super) failure: Option<RecordedFailure>,
}

/// Finished dispatches keyed by `(plate, channel)`.
///
/// Entries requested longer ago than the window are never returned and are
/// evicted on every insert, so the map is bounded by the notify rate over one
/// window.
#[derive(Debug)]
pub(super) struct RecentDeliveries {
    window: TimeDelta,
    entries: HashMap<DeliveryKey, RecordedDispatch>,
}

impl RecentDeliveries {
    pub(super) fn new(window: TimeDelta) -> Self {
        Self {
            window,
            entries: HashMap::new(),
        }
    }

    /// The recorded dispatch for `key` if it was requested within the window.
    pub(super) fn get(&self, key: &DeliveryKey, now: DateTime<Utc>) -> Option<RecordedDispatch> {
        self.entries
            .get(key)
            .filter(|recorded| self.is_fresh(recorded, now))
            .cloned()
    }

    pub(super) fn insert(&mut self, key: DeliveryKey, recorded: RecordedDispatch, now: DateTime<Utc>) {
        let window = self.window;
        self.entries
            .retain(|_, existing| now.signed_duration_since(existing.requested_at) < window);
        self.entries.insert(key, recorded);
    }

    pub(super) fn len(&self) -> usize {
        self.entries.len()
    }

    fn is_fresh(&self, recorded: &RecordedDispatch, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(recorded.requested_at) < self.window
    }
}
