//! Plugin metadata structures

use serde::{Deserialize, Serialize};

/// Plugin manifest containing metadata about the plugin
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginManifest {
    /// Plugin name (used for identification and log tagging)
    pub name: String,
    /// Plugin version (semver)
    pub version: String,
    /// API version this plugin was built against
    pub api_version: u32,
    /// Human-readable description
    pub description: String,
    /// Plugin author
    pub author: String,
}

impl Default for PluginManifest {
    fn default() -> Self {
        Self {
            name: String::new(),
            version: "0.0.1".to_string(),
            api_version: crate::API_VERSION,
            description: String::new(),
            author: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_default_api_version() {
        let manifest = PluginManifest::default();
        assert_eq!(manifest.api_version, crate::API_VERSION);
    }

    #[test]
    fn test_manifest_toml_roundtrip() {
        let manifest = PluginManifest {
            name: "test-plugin".to_string(),
            version: "1.0.0".to_string(),
            api_version: 1,
            description: "A test plugin".to_string(),
            author: "Test Author".to_string(),
        };

        let toml_str = toml::to_string(&manifest).expect("Failed to serialize");
        let parsed: PluginManifest = toml::from_str(&toml_str).expect("Failed to parse");

        assert_eq!(manifest.name, parsed.name);
        assert_eq!(manifest.version, parsed.version);
        assert_eq!(manifest.api_version, parsed.api_version);
    }
}
