//! Settings groups.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Behaviour of the dependency manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphSettings {
    /// Start the initial scan on a background thread when the manager is
    /// created over a session that already has content.
    pub eager_initialization: bool,

    /// Snapshot assets of read-only packages too, instead of sharing the
    /// session's handle.
    pub clone_system_assets: bool,

    /// Log a warning when a single mutation pulls more than this many
    /// previously untracked assets into the graph. `0` disables the warning.
    pub cascade_warn_threshold: usize,

    /// Check graph invariants after every mutation. Costly; meant for tests
    /// and debugging sessions.
    pub verify_after_mutation: bool,
}

impl Default for GraphSettings {
    fn default() -> Self {
        Self {
            eager_initialization: true,
            clone_system_assets: false,
            cascade_warn_threshold: 256,
            verify_after_mutation: false,
        }
    }
}

/// Settings shared by every consumer of the graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalSettings {
    #[serde(default)]
    pub log_level: Option<String>,

    #[serde(default)]
    pub log_format: Option<String>,
}

impl GlobalSettings {
    /// Reject unknown log levels early rather than when logging starts.
    pub fn validate(&self) -> Result<()> {
        if let Some(level) = &self.log_level {
            match level.to_lowercase().as_str() {
                "off" | "silent" | "error" | "warn" | "warning" | "info" | "debug" | "trace" => {}
                _ => return Err(ConfigError::InvalidLogLevel(level.clone())),
            }
        }
        if let Some(format) = &self.log_format {
            if !matches!(format.as_str(), "compact" | "pretty" | "full") {
                return Err(ConfigError::InvalidValue {
                    field: "settings.log_format".to_string(),
                    hint: Some(format!("expected compact, pretty or full, got `{format}`")),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_log_level_rejected() {
        let settings = GlobalSettings {
            log_level: Some("chatty".into()),
            log_format: None,
        };
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::InvalidLogLevel(level)) if level == "chatty"
        ));
    }

    #[test]
    fn test_log_level_case_insensitive() {
        let settings = GlobalSettings {
            log_level: Some("DEBUG".into()),
            log_format: Some("pretty".into()),
        };
        assert!(settings.validate().is_ok());
    }
}
