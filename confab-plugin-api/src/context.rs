//! PluginContext - a plugin's interface to host capabilities

use crate::error::PluginError;
use serde::{Serialize, de::DeserializeOwned};
use std::collections::HashMap;
use std::path::Path;

/// A plugin's interface to host capabilities.
///
/// This is passed to plugins during lifecycle events and provides access to:
/// - Plugin configuration (persistent key-value store)
/// - Logging utilities tagged with the plugin name
pub struct PluginContext {
    plugin_name: String,
    config: PluginConfig,
}

/// Plugin configuration - persistent key-value store backed by TOML
pub struct PluginConfig {
    values: HashMap<String, toml::Value>,
    dirty: bool,
}

impl PluginContext {
    /// Create a new plugin context with an empty config
    pub fn new(plugin_name: impl Into<String>) -> Self {
        Self {
            plugin_name: plugin_name.into(),
            config: PluginConfig::new(),
        }
    }

    /// Create a context with a pre-loaded config
    pub fn with_config(plugin_name: impl Into<String>, config: PluginConfig) -> Self {
        Self {
            plugin_name: plugin_name.into(),
            config,
        }
    }

    /// Get the plugin's name
    pub fn plugin_name(&self) -> &str {
        &self.plugin_name
    }

    // ─── Configuration ───────────────────────────────────────────────

    /// Read a configuration value
    ///
    /// # Example
    /// ```ignore
    /// let threshold: Option<u32> = ctx.config_get("threshold");
    /// ```
    pub fn config_get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.config.get(key)
    }

    /// Write a configuration value
    pub fn config_set<T: Serialize>(&mut self, key: &str, value: T) -> Result<(), PluginError> {
        self.config.set(key, value)
    }

    /// Check if the configuration has unsaved changes
    pub fn config_is_dirty(&self) -> bool {
        self.config.is_dirty()
    }

    /// Get a mutable reference to the config (for internal use by the host)
    pub fn config_mut(&mut self) -> &mut PluginConfig {
        &mut self.config
    }

    // ─── Logging ─────────────────────────────────────────────────────

    /// Log an info message (automatically prefixed with plugin name)
    pub fn log_info(&self, message: &str) {
        tracing::info!(plugin = %self.plugin_name, "{}", message);
    }

    /// Log a warning message
    pub fn log_warn(&self, message: &str) {
        tracing::warn!(plugin = %self.plugin_name, "{}", message);
    }

    /// Log an error message
    pub fn log_error(&self, message: &str) {
        tracing::error!(plugin = %self.plugin_name, "{}", message);
    }

    /// Log a debug message
    pub fn log_debug(&self, message: &str) {
        tracing::debug!(plugin = %self.plugin_name, "{}", message);
    }
}

impl PluginConfig {
    /// Create a new empty config
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
            dirty: false,
        }
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, PluginError> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let content = std::fs::read_to_string(path)?;
        let values: HashMap<String, toml::Value> =
            toml::from_str(&content).map_err(|e| PluginError::Config(e.to_string()))?;
        Ok(Self {
            values,
            dirty: false,
        })
    }

    /// Save configuration to a TOML file
    pub fn save(&mut self, path: &Path) -> Result<(), PluginError> {
        let content = toml::to_string_pretty(&self.values)
            .map_err(|e| PluginError::Serialization(e.to_string()))?;

        if let Some(parent) = path.parent().filter(|p| !p.exists()) {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        self.dirty = false;
        Ok(())
    }

    /// Get a configuration value
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.values.get(key).and_then(|v| v.clone().try_into().ok())
    }

    /// Set a configuration value
    pub fn set<T: Serialize>(&mut self, key: &str, value: T) -> Result<(), PluginError> {
        let toml_value =
            toml::Value::try_from(value).map_err(|e| PluginError::Serialization(e.to_string()))?;
        self.values.insert(key.to_string(), toml_value);
        self.dirty = true;
        Ok(())
    }

    /// Check if the config has been modified since loading/saving
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Mark the config as clean (internal use after save)
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_context_creation() {
        let ctx = PluginContext::new("test");
        assert_eq!(ctx.plugin_name(), "test");
        assert!(!ctx.config_is_dirty());
    }

    #[test]
    fn test_config_get_set() {
        let mut config = PluginConfig::new();

        config.set("string_key", "hello").unwrap();
        config.set("int_key", 42i64).unwrap();
        config.set("bool_key", true).unwrap();

        assert_eq!(
            config.get::<String>("string_key"),
            Some("hello".to_string())
        );
        assert_eq!(config.get::<i64>("int_key"), Some(42));
        assert_eq!(config.get::<bool>("bool_key"), Some(true));
        assert_eq!(config.get::<String>("missing"), None);
    }

    #[test]
    fn test_config_dirty_tracking() {
        let mut config = PluginConfig::new();
        assert!(!config.is_dirty());

        config.set("key", "value").unwrap();
        assert!(config.is_dirty());

        config.mark_clean();
        assert!(!config.is_dirty());
    }

    #[test]
    fn test_config_save_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.toml");

        let mut config = PluginConfig::new();
        config.set("name", "test-plugin").unwrap();
        config.set("threshold", 100i64).unwrap();
        config.save(&config_path).unwrap();
        assert!(!config.is_dirty());

        let loaded = PluginConfig::load(&config_path).unwrap();
        assert_eq!(
            loaded.get::<String>("name"),
            Some("test-plugin".to_string())
        );
        assert_eq!(loaded.get::<i64>("threshold"), Some(100));
    }

    #[test]
    fn test_config_load_missing_file() {
        let config = PluginConfig::load(Path::new("/nonexistent/path/config.toml")).unwrap();
        assert!(config.values.is_empty());
    }

    #[test]
    fn test_context_config_passthrough() {
        let mut ctx = PluginContext::new("test");
        ctx.config_set("retries", 3i64).unwrap();

        assert_eq!(ctx.config_get::<i64>("retries"), Some(3));
        assert!(ctx.config_is_dirty());
    }
}
