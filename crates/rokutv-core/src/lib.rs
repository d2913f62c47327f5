//! Core types for the Roku TV accessory bridge.
//!
//! This crate has no network code. It defines the application identity map,
//! the device data model, the error taxonomy, platform configuration and the
//! event bus that carries host-visible state changes.

pub mod app_map;
pub mod config;
pub mod device;
pub mod error;
pub mod event;
pub mod eventbus;

pub use app_map::{
    AppIdentityMap, LocalAppId, LocalIdCollision, MappedApplication, RawApp, HOME_APP_ID,
    HOME_APP_KIND, HOME_APP_NAME,
};
pub use config::{PlatformConfig, PLATFORM_NAME};
pub use device::{
    DeviceAddress, DeviceDescriptor, DeviceInfo, DeviceKey, ObservedDeviceState,
    VolumeDirection, ECP_PORT,
};
pub use error::{AppMapError, ConfigError, DeviceError, Error, Result};
pub use event::{AccessoryEvent, EventMetadata};
pub use eventbus::{
    EventBus, EventBusReceiver, FilterBuilder, FilteredReceiver, SharedEventBus,
    DEFAULT_CHANNEL_CAPACITY,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
