//! Event type definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One past publication of a named event, retained for late-subscriber
/// replay. At most the bus's history capacity is kept per event name;
/// the oldest records are evicted first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Event name the payload was published under
    pub event: String,
    /// The published payload, opaque to the bus
    pub payload: Value,
    /// When the publish was recorded; non-decreasing per process
    pub timestamp: DateTime<Utc>,
}

/// An opaque handle identifying one listener registration.
///
/// Removal is by token identity, never by comparing callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionToken(pub(crate) u64);

/// Options controlling a subscription.
///
/// # Example
///
/// ```
/// use confab_core::events::SubscribeOptions;
///
/// let options = SubscribeOptions::new().include_past(true).max_past_events(10);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SubscribeOptions {
    /// Remove the listener after its first delivery
    pub once: bool,
    /// Replay retained history to the new listener during subscribe
    pub include_past: bool,
    /// Bound replay to the most recent N records (`None` = all retained)
    pub max_past_events: Option<usize>,
}

impl SubscribeOptions {
    /// Create options with all defaults (durable listener, no replay)
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether the listener is removed after its first delivery
    #[must_use]
    pub fn once(mut self, once: bool) -> Self {
        self.once = once;
        self
    }

    /// Set whether retained history is replayed during subscribe
    #[must_use]
    pub fn include_past(mut self, include_past: bool) -> Self {
        self.include_past = include_past;
        self
    }

    /// Bound replay to the most recent `n` records
    #[must_use]
    pub fn max_past_events(mut self, n: usize) -> Self {
        self.max_past_events = Some(n);
        self
    }
}
