//! Projector configuration.

use serde::Deserialize;

use crate::Result;

/// Settings for a graph projector.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProjectorConfig {
    /// Check and bump record versions on update
    pub optimistic_concurrency: bool,
    /// Entity property holding the version number
    pub version_property: String,
    /// Deepest relationship path the read path will follow
    pub max_depth: usize,
}

impl Default for ProjectorConfig {
    fn default() -> Self {
        Self {
            optimistic_concurrency: false,
            version_property: "version".to_string(),
            max_depth: 32,
        }
    }
}

impl ProjectorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable/disable the optimistic-concurrency version check.
    pub fn optimistic_concurrency(mut self, enabled: bool) -> Self {
        self.optimistic_concurrency = enabled;
        self
    }

    /// Set the version property name.
    pub fn version_property(mut self, name: impl Into<String>) -> Self {
        self.version_property = name.into();
        self
    }

    /// Set the maximum traversal depth.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Load from a JSON document; missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ProjectorConfig::default();
        assert!(!config.optimistic_concurrency);
        assert_eq!(config.version_property, "version");
        assert_eq!(config.max_depth, 32);
    }

    #[test]
    fn builder_chain() {
        let config = ProjectorConfig::new()
            .optimistic_concurrency(true)
            .version_property("revision")
            .max_depth(4);
        assert!(config.optimistic_concurrency);
        assert_eq!(config.version_property, "revision");
        assert_eq!(config.max_depth, 4);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = ProjectorConfig::from_json(r#"{"optimistic_concurrency": true}"#).unwrap();
        assert!(config.optimistic_concurrency);
        assert_eq!(config.max_depth, 32);
        assert!(ProjectorConfig::from_json("{\"max_depth\": \"deep\"}").is_err());
    }
}
