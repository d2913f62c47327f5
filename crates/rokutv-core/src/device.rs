//! Device-side data model.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::app_map::{AppIdentityMap, LocalAppId, RawApp};
use crate::error::DeviceError;

/// Port the Roku External Control Protocol listens on.
pub const ECP_PORT: u16 = 8060;

/// Power mode string reported by a device that is switched on.
pub const POWER_ON_MODE: &str = "PowerOn";

/// Network locator of a device.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceAddress {
    host: String,
    port: u16,
}

impl DeviceAddress {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: ECP_PORT,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Base URL for ECP requests, without a trailing slash.
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

impl FromStr for DeviceAddress {
    type Err = DeviceError;

    /// Accepts `host`, `host:port` or a full `http://host:port/` location.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let without_scheme = trimmed
            .strip_prefix("http://")
            .or_else(|| trimmed.strip_prefix("https://"))
            .unwrap_or(trimmed);
        let authority = without_scheme.split('/').next().unwrap_or_default();

        let (host, port) = match authority.rsplit_once(':') {
            Some((host, port)) => {
                let port = port
                    .parse::<u16>()
                    .map_err(|_| DeviceError::Protocol(format!("Invalid port in address '{}'", s)))?;
                (host, port)
            }
            None => (authority, ECP_PORT),
        };

        if host.is_empty() {
            return Err(DeviceError::Protocol(format!("Missing host in address '{}'", s)));
        }

        Ok(Self {
            host: host.to_string(),
            port,
        })
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.port == ECP_PORT {
            write!(f, "{}", self.host)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// Identity and power information from `query/device-info`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub power_mode: String,
    pub vendor_name: String,
    pub model_name: String,
    pub serial_number: String,
    pub user_device_name: String,
}

impl DeviceInfo {
    pub fn powered(&self) -> bool {
        self.power_mode == POWER_ON_MODE
    }
}

/// Remote-control keys understood by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeviceKey {
    Reverse,
    Forward,
    Up,
    Down,
    Left,
    Right,
    Select,
    Back,
    Home,
    Play,
    Info,
    PowerOn,
    PowerOff,
}

impl DeviceKey {
    pub const ALL: [DeviceKey; 13] = [
        Self::Reverse,
        Self::Forward,
        Self::Up,
        Self::Down,
        Self::Left,
        Self::Right,
        Self::Select,
        Self::Back,
        Self::Home,
        Self::Play,
        Self::Info,
        Self::PowerOn,
        Self::PowerOff,
    ];

    /// Key name as used in ECP `keypress/` paths.
    pub fn ecp_name(&self) -> &'static str {
        match self {
            Self::Reverse => "Rev",
            Self::Forward => "Fwd",
            Self::Up => "Up",
            Self::Down => "Down",
            Self::Left => "Left",
            Self::Right => "Right",
            Self::Select => "Select",
            Self::Back => "Back",
            Self::Home => "Home",
            Self::Play => "Play",
            Self::Info => "Info",
            Self::PowerOn => "PowerOn",
            Self::PowerOff => "PowerOff",
        }
    }

    pub fn power(on: bool) -> Self {
        if on {
            Self::PowerOn
        } else {
            Self::PowerOff
        }
    }
}

impl fmt::Display for DeviceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.ecp_name())
    }
}

impl FromStr for DeviceKey {
    type Err = DeviceError;

    /// Case-insensitive match on the ECP name or the enum name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.replace(['_', '-'], "").to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|key| {
                key.ecp_name().to_ascii_lowercase() == wanted
                    || format!("{:?}", key).to_ascii_lowercase() == wanted
            })
            .ok_or_else(|| DeviceError::Protocol(format!("Unknown key '{}'", s)))
    }
}

/// Relative volume step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VolumeDirection {
    Up,
    Down,
}

impl VolumeDirection {
    pub fn ecp_name(&self) -> &'static str {
        match self {
            Self::Up => "VolumeUp",
            Self::Down => "VolumeDown",
        }
    }
}

/// Everything learned about one device during a discovery pass.
///
/// `apps` already contains the home pseudo-app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    pub address: DeviceAddress,
    pub info: DeviceInfo,
    pub apps: Vec<RawApp>,
}

impl DeviceDescriptor {
    pub fn app_map(&self) -> AppIdentityMap {
        AppIdentityMap::new(self.apps.clone())
    }

    pub fn display_name(&self) -> &str {
        if self.info.user_device_name.is_empty() {
            self.address.host()
        } else {
            &self.info.user_device_name
        }
    }
}

/// Device state as seen by one poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedDeviceState {
    pub powered: bool,
    pub active_local_app_id: LocalAppId,
}
