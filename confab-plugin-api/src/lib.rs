//! confab-plugin-api - Plugin API for the confab app platform
//!
//! This crate provides the traits and types needed to write plugins for
//! confab. Plugins react to lifecycle events that apps and agents publish
//! on the host event bus, and get a [`PluginContext`] for configuration
//! and logging.
//!
//! # Example
//!
//! ```
//! use confab_plugin_api::{Plugin, PluginContext, PluginError, PluginManifest};
//!
//! #[derive(Default)]
//! pub struct MyPlugin;
//!
//! impl Plugin for MyPlugin {
//!     fn manifest(&self) -> PluginManifest {
//!         PluginManifest {
//!             name: "my-plugin".to_string(),
//!             version: "0.1.0".to_string(),
//!             description: "My custom plugin".to_string(),
//!             ..Default::default()
//!         }
//!     }
//!
//!     fn on_load(&mut self, ctx: &mut PluginContext) -> Result<(), PluginError> {
//!         ctx.log_info("Plugin loaded!");
//!         Ok(())
//!     }
//!
//!     fn on_app_created(&mut self, app_id: &str, _name: Option<&str>, ctx: &mut PluginContext) {
//!         ctx.log_debug(&format!("saw app {app_id}"));
//!     }
//! }
//! ```

pub mod context;
pub mod error;
pub mod lifecycle;
pub mod types;

pub use context::{PluginConfig, PluginContext};
pub use error::PluginError;
pub use lifecycle::LifecycleEvent;
pub use types::PluginManifest;

/// Current plugin API version. Plugins must match this exactly;
/// the host checks it when a plugin is attached.
pub const API_VERSION: u32 = 1;

/// The core plugin trait - implement this to create a confab plugin.
///
/// All lifecycle handlers have default no-op implementations, so plugins
/// only need to override the handlers they care about.
pub trait Plugin: Send {
    /// Return plugin metadata
    fn manifest(&self) -> PluginManifest;

    /// Called when the plugin is attached. Use this to initialize state.
    fn on_load(&mut self, ctx: &mut PluginContext) -> Result<(), PluginError>;

    /// Called when the plugin is detached. Use this to clean up resources.
    fn on_unload(&mut self) -> Result<(), PluginError> {
        Ok(())
    }

    // ─── Lifecycle Handlers (default no-ops) ─────────────────────────

    /// Called when an app instance is created
    fn on_app_created(&mut self, _app_id: &str, _name: Option<&str>, _ctx: &mut PluginContext) {}

    /// Called when an app finishes initializing
    fn on_app_initialized(&mut self, _app_id: &str, _ctx: &mut PluginContext) {}

    /// Called when an app reports an error
    fn on_app_error(
        &mut self,
        _app_id: &str,
        _message: &str,
        _recoverable: bool,
        _ctx: &mut PluginContext,
    ) {
    }

    /// Called when a surface starts rendering
    fn on_render_started(&mut self, _app_id: &str, _surface: &str, _ctx: &mut PluginContext) {}

    /// Called when a surface finishes rendering
    fn on_render_completed(&mut self, _app_id: &str, _surface: &str, _ctx: &mut PluginContext) {}

    /// Called for events on lifecycle names whose payload does not decode
    /// into the typed vocabulary (apps may publish free-form payloads).
    fn on_event(&mut self, _name: &str, _payload: &serde_json::Value, _ctx: &mut PluginContext) {}
}
