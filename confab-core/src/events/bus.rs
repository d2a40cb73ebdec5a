//! In-process event bus with bounded history replay
//!
//! [`EventBus`] delivers named JSON payloads from publishers to
//! subscribers synchronously, on the publishing thread. Event names are
//! caller-defined free-form strings; the bus imposes no schema or
//! namespace rules (even the empty string is an accepted key).
//!
//! Every publish is also recorded in a bounded per-event history so late
//! subscribers can ask for a replay of what they missed
//! ([`SubscribeOptions::include_past`]).
//!
//! # Dispatch rules
//!
//! - Listeners for one event name are invoked in subscription order,
//!   against a snapshot taken at the start of each publish. Listeners a
//!   callback adds or removes take effect from the next publish.
//! - A listener registered with `once` is removed after its first
//!   delivery and never fires again, even across overlapping dispatches.
//! - The bus does not catch listener panics: a panicking listener
//!   unwinds out of [`publish`](EventBus::publish) and listeners later
//!   in the order are not invoked for that publish.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use chrono::Utc;
use serde_json::Value;

use super::types::{EventRecord, SubscribeOptions, SubscriptionToken};

/// Default bound on retained history records per event name
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

type ListenerFn = dyn Fn(&Value) + Send + Sync;

/// One listener registration, owned by the bus registry
struct Registration {
    token: SubscriptionToken,
    callback: Arc<ListenerFn>,
    once: bool,
    /// Set on first delivery of a `once` registration; a set flag means
    /// the registration must never be delivered to again
    fired: AtomicBool,
}

struct BusState {
    /// Event name → ordered listener registrations (insertion order =
    /// delivery order)
    listeners: HashMap<String, Vec<Arc<Registration>>>,
    /// Event name → retained publications, oldest first
    history: HashMap<String, VecDeque<EventRecord>>,
    history_capacity: usize,
    next_token: u64,
    /// High water mark keeping record timestamps non-decreasing even if
    /// the system clock steps backwards
    last_timestamp: Option<chrono::DateTime<Utc>>,
}

impl BusState {
    /// Append a history record for `event`, trimming to capacity
    /// immediately after insertion.
    fn record(&mut self, event: &str, payload: Value) {
        let now = Utc::now();
        let timestamp = match self.last_timestamp {
            Some(last) if last > now => last,
            _ => now,
        };
        self.last_timestamp = Some(timestamp);

        let records = self.history.entry(event.to_string()).or_default();
        records.push_back(EventRecord {
            event: event.to_string(),
            payload,
            timestamp,
        });
        while records.len() > self.history_capacity {
            records.pop_front();
        }
    }

    /// Payloads to replay for a new subscriber: the most recent `limit`
    /// retained records (all of them when `limit` is `None`), oldest
    /// first.
    fn replay_window(&self, event: &str, limit: Option<usize>) -> Vec<Value> {
        let Some(records) = self.history.get(event) else {
            return Vec::new();
        };
        let skip = match limit {
            Some(n) => records.len().saturating_sub(n),
            None => 0,
        };
        records.iter().skip(skip).map(|r| r.payload.clone()).collect()
    }

    fn remove(&mut self, event: &str, token: SubscriptionToken) {
        if let Some(registrations) = self.listeners.get_mut(event) {
            registrations.retain(|r| r.token != token);
            if registrations.is_empty() {
                self.listeners.remove(event);
            }
        }
    }
}

/// In-process publish/subscribe event bus.
///
/// `EventBus` is a cheaply clonable handle over shared state; clones
/// publish to and subscribe on the same bus. Construct one per scope of
/// interest (typically one per host) and pass it to consumers - there is
/// no process-global instance.
///
/// # Example
///
/// ```
/// use confab_core::events::EventBus;
/// use serde_json::json;
///
/// let bus = EventBus::new();
/// let subscription = bus.subscribe("user:login", |payload| {
///     println!("logged in: {payload}");
/// });
///
/// bus.publish("user:login", json!({"id": 42}));
/// subscription.unsubscribe();
/// ```
#[derive(Clone)]
pub struct EventBus {
    state: Arc<Mutex<BusState>>,
}

impl EventBus {
    /// Create a bus retaining up to [`DEFAULT_HISTORY_CAPACITY`] records
    /// per event name.
    pub fn new() -> Self {
        Self::with_history_capacity(DEFAULT_HISTORY_CAPACITY)
    }

    /// Create a bus with a custom per-event history bound
    pub fn with_history_capacity(capacity: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(BusState {
                listeners: HashMap::new(),
                history: HashMap::new(),
                history_capacity: capacity,
                next_token: 0,
                last_timestamp: None,
            })),
        }
    }

    /// Register a durable listener for `event`.
    ///
    /// The listener is appended to the end of the event's delivery
    /// order. The returned [`Subscription`] is the only way to remove
    /// it; dropping the handle leaves the listener registered.
    pub fn subscribe<F>(&self, event: &str, callback: F) -> Subscription
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.subscribe_with(event, SubscribeOptions::new(), callback)
    }

    /// Register a one-shot listener for `event`, removed after its
    /// first delivery.
    pub fn once<F>(&self, event: &str, callback: F) -> Subscription
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.subscribe_with(event, SubscribeOptions::new().once(true), callback)
    }

    /// [`once`](Self::once) with explicit options; `once` is forced on.
    pub fn once_with<F>(&self, event: &str, options: SubscribeOptions, callback: F) -> Subscription
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.subscribe_with(event, options.once(true), callback)
    }

    /// Register a listener for `event` with full control over options.
    ///
    /// When [`SubscribeOptions::include_past`] is set and history exists
    /// for `event`, the callback is invoked once per retained record,
    /// oldest first, before this method returns - bounded to the most
    /// recent [`SubscribeOptions::max_past_events`] records when given.
    ///
    /// Compatibility note: a `once` listener subscribing with
    /// `include_past` consumes only the EARLIEST record of the replay
    /// window and is then removed; the rest of the history is not
    /// replayed. Callers wanting full history must use a durable
    /// subscription.
    pub fn subscribe_with<F>(
        &self,
        event: &str,
        options: SubscribeOptions,
        callback: F,
    ) -> Subscription
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let (registration, replay) = {
            let mut state = self.lock();
            let token = SubscriptionToken(state.next_token);
            state.next_token += 1;

            let registration = Arc::new(Registration {
                token,
                callback: Arc::new(callback),
                once: options.once,
                fired: AtomicBool::new(false),
            });
            state
                .listeners
                .entry(event.to_string())
                .or_default()
                .push(registration.clone());

            let replay = if options.include_past {
                state.replay_window(event, options.max_past_events)
            } else {
                Vec::new()
            };
            (registration, replay)
        };

        tracing::debug!(
            event,
            token = registration.token.0,
            once = registration.once,
            replayed = replay.len(),
            "listener registered"
        );

        // Replay runs outside the lock so the callback may freely call
        // back into the bus.
        for payload in replay {
            if registration.once {
                if !registration.fired.swap(true, Ordering::SeqCst) {
                    (registration.callback)(&payload);
                    self.lock().remove(event, registration.token);
                }
                break;
            }
            (registration.callback)(&payload);
        }

        Subscription {
            state: Arc::downgrade(&self.state),
            event: event.to_string(),
            token: registration.token,
        }
    }

    /// Publish `payload` under `event`.
    ///
    /// The publication is recorded in history first (whether or not
    /// anyone is listening), then delivered synchronously to every
    /// listener registered at the start of the call, in subscription
    /// order. Publishing with no listeners is not an error.
    pub fn publish(&self, event: &str, payload: Value) {
        let snapshot = {
            let mut state = self.lock();
            state.record(event, payload.clone());
            state.listeners.get(event).cloned().unwrap_or_default()
        };

        tracing::trace!(event, listeners = snapshot.len(), "publishing event");

        for registration in snapshot {
            if registration.once {
                if registration.fired.swap(true, Ordering::SeqCst) {
                    continue;
                }
                (registration.callback)(&payload);
                self.lock().remove(event, registration.token);
            } else {
                (registration.callback)(&payload);
            }
        }
    }

    /// Drop every listener registration and all retained history.
    ///
    /// Intended for test isolation and full teardown.
    pub fn clear(&self) {
        let mut state = self.lock();
        state.listeners.clear();
        state.history.clear();
        tracing::debug!("event bus cleared");
    }

    /// Number of listeners currently registered for `event`
    pub fn listener_count(&self, event: &str) -> usize {
        self.lock().listeners.get(event).map_or(0, Vec::len)
    }

    /// Retained history records for `event`, oldest first
    pub fn history(&self, event: &str) -> Vec<EventRecord> {
        self.lock()
            .history
            .get(event)
            .map(|records| records.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn lock(&self) -> MutexGuard<'_, BusState> {
        lock_state(&self.state)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

// Listener callbacks never run while the state lock is held, so a
// panicking listener cannot poison it; recover if an internal panic
// ever does.
fn lock_state(state: &Mutex<BusState>) -> MutexGuard<'_, BusState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle to one listener registration.
///
/// The handle is the caller's only capability over the registration:
/// [`unsubscribe`](Self::unsubscribe) removes it by token identity and
/// is idempotent - removing an already-absent registration (double
/// unsubscribe, or a `once` listener that already fired) is a no-op.
///
/// Dropping a `Subscription` does NOT unsubscribe; use
/// [`SubscriptionScope`](super::SubscriptionScope) to tie subscriptions
/// to a context's lifetime. Clones refer to the same registration.
#[derive(Clone)]
pub struct Subscription {
    state: Weak<Mutex<BusState>>,
    event: String,
    token: SubscriptionToken,
}

impl Subscription {
    /// The event name this subscription listens on
    pub fn event(&self) -> &str {
        &self.event
    }

    /// The registration's identity token
    pub fn token(&self) -> SubscriptionToken {
        self.token
    }

    /// Remove the registration from the bus. Safe to call repeatedly;
    /// also a no-op after the bus itself has been dropped.
    pub fn unsubscribe(&self) {
        if let Some(state) = self.state.upgrade() {
            lock_state(&state).remove(&self.event, self.token);
            tracing::debug!(event = %self.event, token = self.token.0, "listener removed");
        }
    }

    /// Whether the registration is still present in the bus registry
    pub fn is_active(&self) -> bool {
        self.state.upgrade().is_some_and(|state| {
            lock_state(&state)
                .listeners
                .get(&self.event)
                .is_some_and(|regs| regs.iter().any(|r| r.token == self.token))
        })
    }
}
