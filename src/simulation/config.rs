//! Simulation configuration
//!
//! Read from JSON of the form
//! `{"featureFlags": {"RIGHT_OF_WAY_SYSTEM": true}}`. Every field is
//! optional; missing flags are off.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureFlags {
    /// Add the right-of-way system to the pipeline
    #[serde(rename = "RIGHT_OF_WAY_SYSTEM", default)]
    pub right_of_way_system: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimConfig {
    #[serde(default)]
    pub feature_flags: FeatureFlags,
}

impl SimConfig {
    pub fn with_right_of_way(mut self, enabled: bool) -> Self {
        self.feature_flags.right_of_way_system = enabled;
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Invalid simulation config")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_json_str(&json)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_is_read_from_json() {
        let cfg =
            SimConfig::from_json_str(r#"{"featureFlags": {"RIGHT_OF_WAY_SYSTEM": true}}"#).unwrap();
        assert!(cfg.feature_flags.right_of_way_system);
    }

    #[test]
    fn missing_flags_default_to_off() {
        assert_eq!(SimConfig::from_json_str("{}").unwrap(), SimConfig::default());
        let cfg = SimConfig::from_json_str(r#"{"featureFlags": {}}"#).unwrap();
        assert!(!cfg.feature_flags.right_of_way_system);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(SimConfig::from_json_str("{featureFlags").is_err());
    }
}
