//! Registry configuration.
//!
//! Defaults match what native hosts expect out of the box: service name
//! `"Media"` and handles retained for the life of the registry. Hosts may
//! override via environment or a JSON document.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{MediaError, Result};

pub const DEFAULT_SERVICE: &str = "Media";

pub const ENV_SERVICE: &str = "MEDIA_BRIDGE_SERVICE";
pub const ENV_RETENTION: &str = "MEDIA_BRIDGE_RETENTION";

/// What happens to a registry entry when its handle is released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RetentionPolicy {
    /// Entries live as long as the registry.
    #[default]
    Retain,
    /// `release()` evicts the entry after notifying the native side.
    EvictOnRelease,
}

impl FromStr for RetentionPolicy {
    type Err = MediaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "retain" => Ok(RetentionPolicy::Retain),
            "evict-on-release" => Ok(RetentionPolicy::EvictOnRelease),
            other => Err(MediaError::Config(format!(
                "unknown retention policy {:?} (expected retain or evict-on-release)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Service name put on every outbound call.
    pub service_name: String,
    pub retention: RetentionPolicy,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            service_name: DEFAULT_SERVICE.into(),
            retention: RetentionPolicy::default(),
        }
    }
}

impl MediaConfig {
    /// Read overrides from `MEDIA_BRIDGE_SERVICE` / `MEDIA_BRIDGE_RETENTION`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) over an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(service) = lookup(ENV_SERVICE).filter(|s| !s.trim().is_empty()) {
            config.service_name = service.trim().to_string();
        }
        if let Some(retention) = lookup(ENV_RETENTION) {
            config.retention = retention.parse()?;
        }
        Ok(config)
    }

    /// Parse a host-supplied JSON document. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| MediaError::Config(e.to_string()))?;
        if config.service_name.is_empty() {
            return Err(MediaError::Config("service_name must not be empty".into()));
        }
        Ok(config)
    }
}
