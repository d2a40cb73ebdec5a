//! Event system for confab
//!
//! - [`EventBus`] - in-process pub/sub with bounded history replay
//! - [`SubscriptionScope`] - binds subscriptions to a context lifetime
//! - [`EventRecord`] / [`SubscribeOptions`] - records and knobs

pub mod bus;
pub mod scope;
pub mod types;

// Re-export key types for convenience
pub use bus::{DEFAULT_HISTORY_CAPACITY, EventBus, Subscription};
pub use scope::{ScopedSubscription, SubscriptionScope};
pub use types::{EventRecord, SubscribeOptions, SubscriptionToken};
