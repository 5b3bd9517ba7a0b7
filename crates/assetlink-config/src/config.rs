//! Top-level configuration structure.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ConfigError, Result};
use crate::settings::{GlobalSettings, GraphSettings};

/// File name looked up by [`AssetLinkConfig::discover`].
pub const CONFIG_FILE_NAME: &str = "assetlink.toml";

/// Prefix of environment variables merged over the file values.
///
/// Nested keys are separated by a double underscore, e.g.
/// `ASSETLINK_GRAPH__EAGER_INITIALIZATION=false`.
pub const ENV_PREFIX: &str = "ASSETLINK_";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetLinkConfig {
    #[serde(default)]
    pub graph: GraphSettings,

    #[serde(default)]
    pub settings: GlobalSettings,
}

impl AssetLinkConfig {
    /// Create from a `serde_json::Value`, for programmatic configuration.
    ///
    /// ```
    /// use assetlink_config::AssetLinkConfig;
    /// use serde_json::json;
    ///
    /// let config = AssetLinkConfig::from_value(json!({
    ///     "graph": { "eager_initialization": false }
    /// }))
    /// .unwrap();
    /// assert!(!config.graph.eager_initialization);
    /// assert_eq!(config.graph.cascade_warn_threshold, 256);
    /// ```
    pub fn from_value(value: Value) -> Result<Self> {
        let config: AssetLinkConfig =
            serde_json::from_value(value).map_err(|e| ConfigError::InvalidValue {
                field: "config".to_string(),
                hint: Some(e.to_string()),
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_value(&self) -> Result<Value> {
        serde_json::to_value(self).map_err(|e| ConfigError::InvalidValue {
            field: "config".to_string(),
            hint: Some(e.to_string()),
        })
    }

    /// Parse a TOML document on top of the defaults.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: AssetLinkConfig =
            toml::from_str(source).map_err(|e| ConfigError::InvalidValue {
                field: "config".to_string(),
                hint: Some(e.to_string()),
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.settings.validate()
    }
}
