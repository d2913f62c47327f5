//! Platform configuration.
//!
//! The platform block lives in the host's JSON config file, so keys are
//! camelCase: `excludedApps`, `pollingInterval`, `requestTimeout`,
//! `discoveryTimeout`, `devices`.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::device::DeviceAddress;
use crate::error::ConfigError;

/// Platform name users register the bridge under.
pub const PLATFORM_NAME: &str = "RokuTV";

/// Default configuration values.
pub mod defaults {
    /// Poll interval in milliseconds.
    pub const POLLING_INTERVAL_MS: u64 = 30_000;
    /// Per-call device timeout in milliseconds.
    pub const REQUEST_TIMEOUT_MS: u64 = 5_000;
    /// SSDP listen window in milliseconds.
    pub const DISCOVERY_TIMEOUT_MS: u64 = 3_000;
}

/// Environment variables that override the file.
pub mod env_vars {
    pub const POLLING_INTERVAL: &str = "ROKUTV_POLLING_INTERVAL";
    pub const REQUEST_TIMEOUT: &str = "ROKUTV_REQUEST_TIMEOUT";
    pub const LOG_JSON: &str = "ROKUTV_LOG_JSON";
}

fn default_polling_interval() -> u64 {
    defaults::POLLING_INTERVAL_MS
}

fn default_request_timeout() -> u64 {
    defaults::REQUEST_TIMEOUT_MS
}

fn default_discovery_timeout() -> u64 {
    defaults::DISCOVERY_TIMEOUT_MS
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformConfig {
    /// Display name of the platform instance
    #[serde(default)]
    pub name: Option<String>,
    /// App display names to leave out of the input source list
    #[serde(default)]
    pub excluded_apps: Vec<String>,
    /// Poll interval in milliseconds
    #[serde(default = "default_polling_interval")]
    pub polling_interval: u64,
    /// Per-call device timeout in milliseconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
    /// SSDP listen window in milliseconds
    #[serde(default = "default_discovery_timeout")]
    pub discovery_timeout: u64,
    /// Static device addresses; SSDP is used when empty
    #[serde(default)]
    pub devices: Vec<String>,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            name: None,
            excluded_apps: Vec::new(),
            polling_interval: defaults::POLLING_INTERVAL_MS,
            request_timeout: defaults::REQUEST_TIMEOUT_MS,
            discovery_timeout: defaults::DISCOVERY_TIMEOUT_MS,
            devices: Vec::new(),
        }
    }
}

impl PlatformConfig {
    /// Parse and validate a JSON platform block.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file, then apply environment overrides.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let mut config = Self::from_json(&raw)?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Apply `ROKUTV_*` overrides. Unparseable values are ignored.
    pub fn apply_env(&mut self) {
        if let Some(ms) = env_u64(env_vars::POLLING_INTERVAL) {
            self.polling_interval = ms;
        }
        if let Some(ms) = env_u64(env_vars::REQUEST_TIMEOUT) {
            self.request_timeout = ms;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.polling_interval == 0 {
            return Err(ConfigError::Invalid {
                field: "pollingInterval",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.request_timeout == 0 {
            return Err(ConfigError::Invalid {
                field: "requestTimeout",
                reason: "must be greater than zero".to_string(),
            });
        }
        self.device_addresses()?;
        Ok(())
    }

    pub fn with_excluded_apps(mut self, apps: Vec<String>) -> Self {
        self.excluded_apps = apps;
        self
    }

    pub fn with_polling_interval(mut self, ms: u64) -> Self {
        self.polling_interval = ms;
        self
    }

    pub fn with_devices(mut self, devices: Vec<String>) -> Self {
        self.devices = devices;
        self
    }

    pub fn polling_interval(&self) -> Duration {
        Duration::from_millis(self.polling_interval)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout)
    }

    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_millis(self.discovery_timeout)
    }

    pub fn is_excluded(&self, app_name: &str) -> bool {
        self.excluded_apps.iter().any(|name| name == app_name)
    }

    pub fn device_addresses(&self) -> Result<Vec<DeviceAddress>, ConfigError> {
        self.devices
            .iter()
            .map(|raw| {
                raw.parse::<DeviceAddress>().map_err(|e| ConfigError::Invalid {
                    field: "devices",
                    reason: e.to_string(),
                })
            })
            .collect()
    }
}

fn env_u64(name: &str) -> Option<u64> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}
