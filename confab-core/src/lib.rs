//! confab-core: Core library for the confab app platform
//!
//! This crate provides the foundational components for confab:
//!
//! - **Event system** - [`EventBus`] for in-process publish/subscribe
//!   with bounded history replay, and [`SubscriptionScope`] for binding
//!   subscriptions to a context's lifetime
//! - **Plugin host** - [`PluginHost`] for attaching plugins and feeding
//!   them lifecycle events off the bus
//!
//! # Quick Start
//!
//! ```
//! use confab_core::events::{EventBus, SubscribeOptions};
//! use serde_json::json;
//!
//! let bus = EventBus::new();
//!
//! // A consumer reacts to app lifecycle transitions
//! let subscription = bus.subscribe("app:created", |payload| {
//!     println!("app created: {payload}");
//! });
//!
//! // A producer announces one
//! bus.publish("app:created", json!({"app_id": "a1"}));
//!
//! // A late joiner can replay what it missed
//! bus.subscribe_with("app:created", SubscribeOptions::new().include_past(true), |payload| {
//!     println!("caught up: {payload}");
//! });
//!
//! subscription.unsubscribe();
//! ```

pub mod events;
pub mod plugins;

// Re-export key types for convenience
pub use events::{
    DEFAULT_HISTORY_CAPACITY, EventBus, EventRecord, ScopedSubscription, SubscribeOptions,
    Subscription, SubscriptionScope, SubscriptionToken,
};
pub use plugins::{PluginHost, PluginHostError, PluginInfo, PluginState};
