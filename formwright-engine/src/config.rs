//! Engine configuration, read from an optional TOML file.
//!
//! ```toml
//! submit_timeout_ms = 5000
//! validate_on_change = true
//! touch_on_set = true
//! fallback_message = "Invalid value"
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// How long `submit` waits for pending asynchronous validation.
    pub submit_timeout_ms: u64,
    /// Validate written fields (and their dependents) on every write.
    pub validate_on_change: bool,
    /// Mark a field touched when its value is written.
    pub touch_on_set: bool,
    /// Message shown when a host predicate faults.
    pub fallback_message: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            submit_timeout_ms: 10_000,
            validate_on_change: true,
            touch_on_set: true,
            fallback_message: "Invalid value".to_string(),
        }
    }
}

impl EngineConfig {
    /// Loads config from `path`. A missing, unreadable or malformed file
    /// yields the defaults.
    pub fn load_from(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            info!("No engine config found at {:?}, using defaults", path);
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(contents) => match Self::from_toml_str(&contents) {
                Ok(config) => {
                    info!("Loaded engine config from {:?}", path);
                    config
                }
                Err(e) => {
                    warn!("Failed to parse engine config {:?}: {}. Using defaults.", path, e);
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Failed to read engine config {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    /// Parses config from TOML text. Omitted keys take their defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn submit_timeout(&self) -> Duration {
        Duration::from_millis(self.submit_timeout_ms)
    }
}
