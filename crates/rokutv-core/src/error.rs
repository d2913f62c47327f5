//! Error types shared across the bridge.
//!
//! Errors never cross the accessory-host boundary: characteristic handlers
//! log them and acknowledge anyway. They exist so the layers below can tell
//! the difference between "device said no" and "device did not answer".

use crate::app_map::LocalAppId;

/// Lookup miss in an [`AppIdentityMap`](crate::app_map::AppIdentityMap).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AppMapError {
    #[error("No application with remote id '{0}'")]
    RemoteIdNotFound(String),

    #[error("No application with local id {0}")]
    LocalIdNotFound(LocalAppId),
}

/// Failure talking to a device.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeviceError {
    /// The device could not be reached (connection refused, DNS, reset).
    #[error("Device unreachable: {0}")]
    Unreachable(String),

    /// The device answered, but not with something we understand.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The device refused to launch an application.
    #[error("Failed to launch app '{app_id}': {reason}")]
    LaunchFailed { app_id: String, reason: String },

    /// No answer within the per-call deadline.
    #[error("Operation timed out after {0}ms")]
    Timeout(u64),
}

impl DeviceError {
    /// Whether the error indicates the device is not answering at all.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Unreachable(_) | Self::Timeout(_))
    }
}

/// Configuration loading or validation failure.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid value for '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Umbrella error for callers that do not care which layer failed.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    AppMap(#[from] AppMapError),

    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, Error>;
