//! Device controller interface.
//!
//! A [`DeviceController`] wraps one device's command transport. Every call is
//! independently fallible; callers treat any error as "state unknown" and do
//! not update exposed state from it.

use std::sync::Arc;

use async_trait::async_trait;
use rokutv_core::{DeviceAddress, DeviceError, DeviceInfo, DeviceKey, RawApp, VolumeDirection};

pub type DeviceResult<T> = std::result::Result<T, DeviceError>;

#[async_trait]
pub trait DeviceController: Send + Sync {
    /// Address of the device this controller talks to.
    fn address(&self) -> &DeviceAddress;

    /// Full info query; `powered` derives from the power mode.
    async fn query_info(&self) -> DeviceResult<DeviceInfo>;

    /// Installed applications, in the order the device lists them.
    async fn query_apps(&self) -> DeviceResult<Vec<RawApp>>;

    /// Remote id of the foreground app, `None` on the home screen.
    async fn query_active_app(&self) -> DeviceResult<Option<String>>;

    async fn launch(&self, remote_id: &str) -> DeviceResult<()>;

    async fn send_key(&self, key: DeviceKey) -> DeviceResult<()>;

    async fn set_volume(&self, direction: VolumeDirection) -> DeviceResult<()>;

    async fn mute(&self) -> DeviceResult<()>;
}

/// Finds devices on the network and hands out controllers for them.
#[async_trait]
pub trait DeviceDiscoverer: Send + Sync {
    async fn discover_all(&self) -> DeviceResult<Vec<DeviceAddress>>;

    fn connect(&self, address: &DeviceAddress) -> Arc<dyn DeviceController>;
}
