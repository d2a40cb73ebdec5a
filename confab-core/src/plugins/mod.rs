//! Plugin system for confab
//!
//! This module provides the infrastructure for attaching and managing
//! plugins:
//!
//! - [`PluginHost`]: attaches plugins and dispatches lifecycle events to
//!   them from the event bus
//! - [`PluginHostError`]: error types for plugin operations
//!
//! Plugins are in-process values implementing
//! [`Plugin`](confab_plugin_api::Plugin), handed to
//! [`PluginHost::attach`]. The host subscribes to the lifecycle
//! vocabulary through a
//! [`SubscriptionScope`](crate::events::SubscriptionScope), so dropping
//! the host releases every bus listener it holds.

mod error;
mod host;

pub use error::PluginHostError;
pub use host::{PluginHost, PluginInfo, PluginState};
