//! PluginHost - wires plugins onto the event bus
//!
//! The host owns a [`SubscriptionScope`] with one listener per lifecycle
//! wire name. Each listener decodes the payload and dispatches to every
//! attached plugin, so anything apps and agents publish on the bus
//! reaches plugin handlers without the plugins touching the bus
//! themselves.
//!
//! Dispatch is panic-isolated per plugin: a panicking handler marks that
//! plugin failed and sibling plugins continue to receive events. This is
//! host policy layered on top of the bus - a plain bus listener that
//! panics still unwinds out of `publish`.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};

use serde_json::Value;

use confab_plugin_api::{API_VERSION, LifecycleEvent, Plugin, PluginContext, PluginManifest};

use super::error::PluginHostError;
use crate::events::{EventBus, SubscriptionScope};

/// An attached plugin with its runtime state
struct AttachedPlugin {
    manifest: PluginManifest,
    instance: Box<dyn Plugin>,
    context: PluginContext,
    state: PluginState,
}

/// State of an attached plugin
#[derive(Debug, Clone, PartialEq)]
pub enum PluginState {
    /// Plugin is attached and receiving events
    Loaded,
    /// Plugin has failed (panicked in a handler) and is skipped
    Failed { error: String },
}

/// Information about an attached plugin
#[derive(Debug, Clone)]
pub struct PluginInfo {
    /// Plugin name
    pub name: String,
    /// Plugin manifest
    pub manifest: PluginManifest,
    /// Current state
    pub state: PluginState,
}

type SharedPlugins = Arc<Mutex<HashMap<String, Arc<Mutex<AttachedPlugin>>>>>;

/// The plugin host manages attaching, detaching, and dispatching
/// lifecycle events to plugins.
///
/// # Example
///
/// ```ignore
/// use confab_core::{events::EventBus, plugins::PluginHost};
///
/// let bus = EventBus::new();
/// let host = PluginHost::new(bus.clone());
/// host.attach(Box::new(MyPlugin::default()))?;
///
/// // Anything published under a lifecycle name now reaches the plugin
/// bus.publish("app:created", payload);
/// ```
pub struct PluginHost {
    plugins: SharedPlugins,
    scope: SubscriptionScope,
}

impl PluginHost {
    /// Create a host listening on `bus` for the lifecycle vocabulary
    pub fn new(bus: EventBus) -> Self {
        let plugins: SharedPlugins = Arc::new(Mutex::new(HashMap::new()));
        let scope = SubscriptionScope::new(bus);

        for name in LifecycleEvent::NAMES {
            let plugins = plugins.clone();
            scope.subscribe(name, move |payload| {
                dispatch_all(&plugins, name, payload);
            });
        }

        Self { plugins, scope }
    }

    /// Attach a plugin: check its API version, call `on_load`, and start
    /// delivering lifecycle events to it.
    pub fn attach(&self, plugin: Box<dyn Plugin>) -> Result<(), PluginHostError> {
        let manifest = plugin.manifest();
        if manifest.api_version != API_VERSION {
            return Err(PluginHostError::ApiVersionMismatch {
                expected: API_VERSION,
                found: manifest.api_version,
            });
        }

        let name = manifest.name.clone();
        if self.lock_plugins().contains_key(&name) {
            return Err(PluginHostError::AlreadyAttached { name });
        }

        // on_load runs outside the registry lock: it is plugin code and
        // may publish on the bus.
        let mut instance = plugin;
        let mut context = PluginContext::new(name.clone());
        instance.on_load(&mut context)?;

        tracing::info!(plugin = %name, version = %manifest.version, "Plugin attached");

        let attached = AttachedPlugin {
            manifest,
            instance,
            context,
            state: PluginState::Loaded,
        };
        let mut map = self.lock_plugins();
        if map.contains_key(&name) {
            return Err(PluginHostError::AlreadyAttached { name });
        }
        map.insert(name, Arc::new(Mutex::new(attached)));
        Ok(())
    }

    /// Detach a plugin, calling `on_unload`. An `on_unload` error is
    /// logged, not propagated - the plugin is gone either way.
    pub fn detach(&self, name: &str) -> Result<(), PluginHostError> {
        let cell = self
            .lock_plugins()
            .remove(name)
            .ok_or_else(|| PluginHostError::NotFound {
                name: name.to_string(),
            })?;

        if let Err(e) = lock_cell(&cell).instance.on_unload() {
            tracing::warn!(plugin = %name, error = %e, "Plugin on_unload returned error");
        }
        tracing::info!(plugin = %name, "Plugin detached");
        Ok(())
    }

    /// Detach every plugin and stop listening on the bus.
    /// Also run by `Drop`.
    pub fn shutdown(&self) {
        self.scope.close();
        let names: Vec<String> = self.lock_plugins().keys().cloned().collect();
        for name in names {
            let _ = self.detach(&name);
        }
    }

    /// Whether a plugin is attached and still receiving events
    pub fn is_loaded(&self, name: &str) -> bool {
        self.lock_plugins()
            .get(name)
            .is_some_and(|cell| lock_cell(cell).state == PluginState::Loaded)
    }

    /// Snapshot of every attached plugin's metadata and state
    pub fn infos(&self) -> Vec<PluginInfo> {
        self.lock_plugins()
            .iter()
            .map(|(name, cell)| {
                let cell = lock_cell(cell);
                PluginInfo {
                    name: name.clone(),
                    manifest: cell.manifest.clone(),
                    state: cell.state.clone(),
                }
            })
            .collect()
    }

    fn lock_plugins(&self) -> MutexGuard<'_, HashMap<String, Arc<Mutex<AttachedPlugin>>>> {
        self.plugins.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for PluginHost {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn lock_cell(cell: &Mutex<AttachedPlugin>) -> MutexGuard<'_, AttachedPlugin> {
    cell.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Deliver one bus event to every attached plugin.
///
/// The registry lock is released before any handler runs, so handlers
/// that publish back onto the bus re-enter dispatch safely; the one
/// plugin currently mid-handler is skipped for the nested event instead
/// of deadlocking on itself.
fn dispatch_all(plugins: &SharedPlugins, name: &str, payload: &Value) {
    let cells: Vec<(String, Arc<Mutex<AttachedPlugin>>)> = {
        let map = plugins.lock().unwrap_or_else(PoisonError::into_inner);
        map.iter()
            .map(|(name, cell)| (name.clone(), cell.clone()))
            .collect()
    };

    let decoded = LifecycleEvent::from_payload(payload);

    for (plugin_name, cell) in cells {
        let mut guard = match cell.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                tracing::warn!(plugin = %plugin_name, event = name, "skipping re-entrant dispatch");
                continue;
            }
        };
        if guard.state != PluginState::Loaded {
            continue;
        }

        let attached = &mut *guard;
        let result = std::panic::catch_unwind(AssertUnwindSafe(|| match &decoded {
            Some(event) => dispatch_to_plugin(attached.instance.as_mut(), &mut attached.context, event),
            None => attached
                .instance
                .on_event(name, payload, &mut attached.context),
        }));

        if result.is_err() {
            tracing::error!(plugin = %plugin_name, event = name, "Plugin panicked in handler, disabling");
            guard.state = PluginState::Failed {
                error: format!("panicked while handling {name}"),
            };
        }
    }
}

/// Route a decoded lifecycle event to the matching typed handler
fn dispatch_to_plugin(plugin: &mut dyn Plugin, ctx: &mut PluginContext, event: &LifecycleEvent) {
    match event {
        LifecycleEvent::AppCreated { app_id, name } => {
            plugin.on_app_created(app_id, name.as_deref(), ctx);
        }
        LifecycleEvent::AppInitialized { app_id } => {
            plugin.on_app_initialized(app_id, ctx);
        }
        LifecycleEvent::AppError {
            app_id,
            message,
            recoverable,
        } => {
            plugin.on_app_error(app_id, message, *recoverable, ctx);
        }
        LifecycleEvent::RenderStarted { app_id, surface } => {
            plugin.on_render_started(app_id, surface, ctx);
        }
        LifecycleEvent::RenderCompleted { app_id, surface } => {
            plugin.on_render_completed(app_id, surface, ctx);
        }
    }
}
