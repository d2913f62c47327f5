//! Roku TV accessory bridge.
//!
//! ## Architecture
//!
//! - **DiscoveryCoordinator**: finds devices and builds their descriptors
//! - **AccessorySynchronizer**: polls a device and publishes state changes
//! - **CommandTranslator**: turns host writes into device commands
//! - **RokuAccessory**: ties the above together for one device
//! - **RokuTvPlatform**: host lifecycle (cache restore, ready, publish)
//!
//! The host is reached only through [`host::AccessoryRepository`] and the
//! event bus; nothing here holds global state.

pub mod accessory;
pub mod discovery;
pub mod host;
pub mod platform;
pub mod sync;
pub mod translator;

pub use accessory::RokuAccessory;
pub use discovery::{input_sources, DiscoveredDevice, DiscoveryCoordinator};
pub use host::{
    accessory_uuid, Accessory, AccessoryCategory, AccessoryRepository, CharacteristicKind,
    CharacteristicValue, InMemoryAccessoryRepository, InputSource, InputSourceType, RemoteKey,
    VolumeSelector,
};
pub use platform::RokuTvPlatform;
pub use sync::{AccessorySynchronizer, PublishedSnapshot};
pub use translator::{device_key_for, CommandTranslator};
