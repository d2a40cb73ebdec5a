//! Typed lifecycle event vocabulary
//!
//! The event bus itself imposes no schema: event names are free-form
//! strings and payloads are arbitrary JSON. [`LifecycleEvent`] is the
//! convenience contract layered on top for the lifecycle transitions
//! that apps, plugins, and agents announce on the bus. The host
//! subscribes to every name in [`LifecycleEvent::NAMES`] and decodes
//! payloads back into this enum before dispatching to plugin handlers.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lifecycle transitions published on the event bus.
///
/// Each variant maps to a well-known wire name (see
/// [`event_name`](Self::event_name)); the serialized payload is
/// self-describing via the `type` tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// An app instance was created
    AppCreated {
        app_id: String,
        name: Option<String>,
    },

    /// An app finished initializing and is ready to render
    AppInitialized { app_id: String },

    /// An app hit an error during its lifecycle
    AppError {
        app_id: String,
        message: String,
        recoverable: bool,
    },

    /// A surface (card, panel, modal, canvas) started rendering
    RenderStarted { app_id: String, surface: String },

    /// A surface finished rendering
    RenderCompleted { app_id: String, surface: String },
}

impl LifecycleEvent {
    /// Every wire name in the lifecycle vocabulary, in declaration order.
    pub const NAMES: [&'static str; 5] = [
        "app:created",
        "app:initialized",
        "app:error",
        "render:started",
        "render:completed",
    ];

    /// The bus event name this variant is published under
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::AppCreated { .. } => "app:created",
            Self::AppInitialized { .. } => "app:initialized",
            Self::AppError { .. } => "app:error",
            Self::RenderStarted { .. } => "render:started",
            Self::RenderCompleted { .. } => "render:completed",
        }
    }

    /// The app this event concerns
    pub fn app_id(&self) -> &str {
        match self {
            Self::AppCreated { app_id, .. }
            | Self::AppInitialized { app_id }
            | Self::AppError { app_id, .. }
            | Self::RenderStarted { app_id, .. }
            | Self::RenderCompleted { app_id, .. } => app_id,
        }
    }

    /// Serialize into a bus payload
    pub fn to_payload(&self) -> Value {
        // Serialization of a tagged unit-free enum cannot fail
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Decode a bus payload back into a lifecycle event.
    ///
    /// Returns `None` for payloads outside the vocabulary; callers fall
    /// back to raw handling in that case.
    pub fn from_payload(payload: &Value) -> Option<Self> {
        serde_json::from_value(payload.clone()).ok()
    }
}
