//! Subscription lifetime binding
//!
//! [`SubscriptionScope`] ties a set of bus subscriptions to the lifetime
//! of a calling context (an app surface, a plugin host, a test). Every
//! subscription made through the scope is released when the scope is
//! closed or dropped - on every exit path, including panic unwinds -
//! even if the caller never touches the returned handle.

use std::sync::{Arc, Mutex, PoisonError, Weak};

use serde_json::Value;

use super::bus::{EventBus, Subscription};
use super::types::SubscribeOptions;

/// Binds subscriptions to one calling context.
///
/// # Example
///
/// ```
/// use confab_core::events::{EventBus, SubscriptionScope};
/// use serde_json::json;
///
/// let bus = EventBus::new();
/// {
///     let scope = SubscriptionScope::new(bus.clone());
///     scope.subscribe("app:created", |_| {});
///     scope.publish("app:created", json!({"app_id": "a1"}));
/// } // scope dropped: the subscription is gone
/// assert_eq!(bus.listener_count("app:created"), 0);
/// ```
pub struct SubscriptionScope {
    bus: EventBus,
    active: Arc<Mutex<Vec<Subscription>>>,
}

impl SubscriptionScope {
    /// Create a scope over `bus`
    pub fn new(bus: EventBus) -> Self {
        Self {
            bus,
            active: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// The underlying bus
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Register a durable listener whose lifetime is bound to this scope
    pub fn subscribe<F>(&self, event: &str, callback: F) -> ScopedSubscription
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.track(self.bus.subscribe(event, callback))
    }

    /// Register a scope-bound listener with explicit options
    pub fn subscribe_with<F>(
        &self,
        event: &str,
        options: SubscribeOptions,
        callback: F,
    ) -> ScopedSubscription
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.track(self.bus.subscribe_with(event, options, callback))
    }

    /// Register a scope-bound one-shot listener
    pub fn once<F>(&self, event: &str, callback: F) -> ScopedSubscription
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.track(self.bus.once(event, callback))
    }

    /// Publish on the underlying bus. Publishing acquires nothing, so
    /// there is nothing for the scope to track.
    pub fn publish(&self, event: &str, payload: Value) {
        self.bus.publish(event, payload);
    }

    /// Number of subscriptions the scope is still tracking
    pub fn active_count(&self) -> usize {
        self.lock_active().len()
    }

    /// Release every remaining subscription and clear the list.
    /// Idempotent; also run by `Drop`.
    pub fn close(&self) {
        let drained: Vec<Subscription> = self.lock_active().drain(..).collect();
        if !drained.is_empty() {
            tracing::debug!(released = drained.len(), "subscription scope closed");
        }
        for subscription in drained {
            subscription.unsubscribe();
        }
    }

    fn track(&self, subscription: Subscription) -> ScopedSubscription {
        self.lock_active().push(subscription.clone());
        ScopedSubscription {
            inner: subscription,
            active: Arc::downgrade(&self.active),
        }
    }

    // No user code runs while this lock is held; recover from poisoning
    // rather than propagate.
    fn lock_active(&self) -> std::sync::MutexGuard<'_, Vec<Subscription>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for SubscriptionScope {
    fn drop(&mut self) {
        self.close();
    }
}

/// Handle to a subscription tracked by a [`SubscriptionScope`].
///
/// [`unsubscribe`](Self::unsubscribe) removes the listener from the bus
/// AND drops the scope's tracking entry, so repeated or out-of-order
/// calls (before or after the scope closes) all stay safe no-ops.
pub struct ScopedSubscription {
    inner: Subscription,
    active: Weak<Mutex<Vec<Subscription>>>,
}

impl ScopedSubscription {
    /// The event name this subscription listens on
    pub fn event(&self) -> &str {
        self.inner.event()
    }

    /// Whether the registration is still present in the bus registry
    pub fn is_active(&self) -> bool {
        self.inner.is_active()
    }

    /// Unsubscribe from the bus and stop tracking in the scope
    pub fn unsubscribe(&self) {
        self.inner.unsubscribe();
        if let Some(active) = self.active.upgrade() {
            active
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .retain(|s| s.token() != self.inner.token());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::panic::AssertUnwindSafe;

    #[test]
    fn drop_releases_all_subscriptions() {
        let bus = EventBus::new();
        {
            let scope = SubscriptionScope::new(bus.clone());
            scope.subscribe("a", |_| {});
            scope.subscribe("b", |_| {});
            scope.once("c", |_| {});
            assert_eq!(scope.active_count(), 3);
        }

        assert_eq!(bus.listener_count("a"), 0);
        assert_eq!(bus.listener_count("b"), 0);
        assert_eq!(bus.listener_count("c"), 0);
    }

    #[test]
    fn close_is_idempotent() {
        let bus = EventBus::new();
        let scope = SubscriptionScope::new(bus.clone());
        scope.subscribe("a", |_| {});

        scope.close();
        scope.close();

        assert_eq!(scope.active_count(), 0);
        assert_eq!(bus.listener_count("a"), 0);
    }

    #[test]
    fn scoped_unsubscribe_removes_bus_listener_and_tracking_entry() {
        let bus = EventBus::new();
        let scope = SubscriptionScope::new(bus.clone());

        let subscription = scope.subscribe("a", |_| {});
        scope.subscribe("b", |_| {});
        assert_eq!(scope.active_count(), 2);

        subscription.unsubscribe();

        assert_eq!(scope.active_count(), 1);
        assert_eq!(bus.listener_count("a"), 0);
        assert_eq!(bus.listener_count("b"), 1);
    }

    #[test]
    fn repeated_and_out_of_order_unsubscribe_is_safe() {
        let bus = EventBus::new();
        let scope = SubscriptionScope::new(bus.clone());
        let subscription = scope.subscribe("a", |_| {});

        subscription.unsubscribe();
        subscription.unsubscribe();
        scope.close();
        subscription.unsubscribe();

        assert_eq!(bus.listener_count("a"), 0);
    }

    #[test]
    fn publish_passes_through_to_bus() {
        let bus = EventBus::new();
        let scope = SubscriptionScope::new(bus.clone());

        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = log.clone();
        bus.subscribe("e", move |payload| {
            sink.lock().unwrap().push(payload.clone());
        });

        scope.publish("e", json!(1));

        assert_eq!(*log.lock().unwrap(), vec![json!(1)]);
        // Publishing tracked nothing
        assert_eq!(scope.active_count(), 0);
    }

    #[test]
    fn scope_delegates_subscribe_options() {
        let bus = EventBus::new();
        bus.publish("e", json!("p1"));
        bus.publish("e", json!("p2"));

        let scope = SubscriptionScope::new(bus.clone());
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = log.clone();
        scope.subscribe_with(
            "e",
            SubscribeOptions::new().include_past(true).max_past_events(1),
            move |payload| {
                sink.lock().unwrap().push(payload.clone());
            },
        );

        assert_eq!(*log.lock().unwrap(), vec![json!("p2")]);
    }

    #[test]
    fn once_fired_then_scope_close_is_safe() {
        let bus = EventBus::new();
        let scope = SubscriptionScope::new(bus.clone());
        scope.once("e", |_| {});

        bus.publish("e", json!(1));
        assert_eq!(bus.listener_count("e"), 0);
        // The fired once is still tracked; closing is a harmless no-op
        assert_eq!(scope.active_count(), 1);
        scope.close();
        assert_eq!(scope.active_count(), 0);
    }

    #[test]
    fn panic_unwind_still_releases_subscriptions() {
        let bus = EventBus::new();

        let result = std::panic::catch_unwind(AssertUnwindSafe(|| {
            let scope = SubscriptionScope::new(bus.clone());
            scope.subscribe("a", |_| {});
            panic!("context blew up");
        }));

        assert!(result.is_err());
        assert_eq!(bus.listener_count("a"), 0);
    }
}
