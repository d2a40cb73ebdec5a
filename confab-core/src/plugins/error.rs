//! Error types for the plugin host

use confab_plugin_api::PluginError;
use thiserror::Error;

/// Errors from plugin host operations
#[derive(Error, Debug)]
pub enum PluginHostError {
    /// A plugin with this name is already attached
    #[error("Plugin already attached: {name}")]
    AlreadyAttached { name: String },

    /// No attached plugin has this name
    #[error("Plugin not found: {name}")]
    NotFound { name: String },

    /// Plugin was built against a different API version
    #[error("Plugin API version mismatch: expected {expected}, found {found}")]
    ApiVersionMismatch { expected: u32, found: u32 },

    /// The plugin itself returned an error
    #[error("Plugin error: {0}")]
    Plugin(#[from] PluginError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn already_attached_displays_name() {
        let error = PluginHostError::AlreadyAttached {
            name: "analytics".to_string(),
        };
        assert!(error.to_string().contains("analytics"));
    }

    #[test]
    fn not_found_displays_name() {
        let error = PluginHostError::NotFound {
            name: "history".to_string(),
        };
        assert!(error.to_string().contains("Plugin not found"));
        assert!(error.to_string().contains("history"));
    }

    #[test]
    fn api_version_mismatch_displays_versions() {
        let error = PluginHostError::ApiVersionMismatch {
            expected: 1,
            found: 2,
        };
        assert!(error.to_string().contains("expected 1"));
        assert!(error.to_string().contains("found 2"));
    }

    #[test]
    fn converts_from_plugin_error() {
        let plugin_error = PluginError::custom("boom");
        let host_error: PluginHostError = plugin_error.into();
        assert!(matches!(host_error, PluginHostError::Plugin(_)));
    }
}
