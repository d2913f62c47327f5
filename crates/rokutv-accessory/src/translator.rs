//! Host intent to device commands.
//!
//! Every entry point returns `()`: the host gets its acknowledgement whether
//! or not the device did what was asked, because Roku has no reliable
//! command acknowledgement. Failures are logged, and where the host could be
//! left showing the wrong thing a refresh is triggered.

use std::sync::Arc;

use rokutv_core::{AppIdentityMap, DeviceKey, LocalAppId, VolumeDirection};
use rokutv_devices::DeviceController;
use tracing::{error, info, warn};

use crate::host::{CharacteristicValue, RemoteKey, VolumeSelector};
use crate::sync::AccessorySynchronizer;

/// Device key sent for each host remote key.
pub fn device_key_for(key: RemoteKey) -> DeviceKey {
    match key {
        RemoteKey::Rewind => DeviceKey::Reverse,
        RemoteKey::FastForward => DeviceKey::Forward,
        RemoteKey::NextTrack => DeviceKey::Right,
        RemoteKey::PreviousTrack => DeviceKey::Left,
        RemoteKey::ArrowUp => DeviceKey::Up,
        RemoteKey::ArrowDown => DeviceKey::Down,
        RemoteKey::ArrowLeft => DeviceKey::Left,
        RemoteKey::ArrowRight => DeviceKey::Right,
        RemoteKey::Select => DeviceKey::Select,
        RemoteKey::Back => DeviceKey::Back,
        RemoteKey::Exit => DeviceKey::Home,
        RemoteKey::PlayPause => DeviceKey::Play,
        RemoteKey::Information => DeviceKey::Info,
    }
}

pub struct CommandTranslator {
    controller: Arc<dyn DeviceController>,
    apps: Arc<AppIdentityMap>,
    synchronizer: Arc<AccessorySynchronizer>,
}

impl CommandTranslator {
    pub fn new(
        controller: Arc<dyn DeviceController>,
        apps: Arc<AppIdentityMap>,
        synchronizer: Arc<AccessorySynchronizer>,
    ) -> Self {
        Self {
            controller,
            apps,
            synchronizer,
        }
    }

    /// Dispatch a characteristic write.
    pub async fn apply(&self, value: CharacteristicValue) {
        match value {
            CharacteristicValue::Active(on) => self.set_power(on).await,
            CharacteristicValue::ActiveIdentifier(local_id) => self.set_active_input(local_id).await,
            CharacteristicValue::RemoteKey(raw) => self.press_remote_key(raw).await,
            CharacteristicValue::VolumeSelector(selector) => self.set_volume(selector).await,
            CharacteristicValue::Mute(_) => self.toggle_mute().await,
        }
    }

    /// Unknown key values are acknowledged without touching the device.
    pub async fn press_remote_key(&self, raw: u8) {
        let Some(key) = RemoteKey::from_value(raw) else {
            info!("Ignoring unsupported remote key {}", raw);
            return;
        };
        let device_key = device_key_for(key);
        info!("Remote key pressed: {:?} -> {}", key, device_key);
        if let Err(e) = self.controller.send_key(device_key).await {
            warn!(device = %self.controller.address(), "Keypress {} failed: {}", device_key, e);
        }
    }

    /// Power on/off, then confirm by re-reading power, then refresh all state.
    pub async fn set_power(&self, on: bool) {
        info!("Set power => {}", on);
        if let Err(e) = self.controller.send_key(DeviceKey::power(on)).await {
            warn!(device = %self.controller.address(), "Power command failed: {}", e);
        }
        if let Some(powered) = self.synchronizer.refresh_power().await {
            if powered != on {
                info!("Device reports power {} after power command", powered);
            }
        }
        self.synchronizer.refresh().await;
    }

    pub async fn set_active_input(&self, local_id: LocalAppId) {
        let app = match self.apps.by_local_id(local_id) {
            Ok(app) => app,
            Err(e) => {
                warn!("Set active input: {}", e);
                self.synchronizer.refresh().await;
                return;
            }
        };

        info!("Set active input source => {}", app.name);
        if app.is_home() {
            if let Err(e) = self.controller.send_key(DeviceKey::Home).await {
                warn!(device = %self.controller.address(), "Home keypress failed: {}", e);
                self.synchronizer.refresh().await;
            }
        } else if let Err(e) = self.controller.launch(&app.remote_id).await {
            error!(device = %self.controller.address(), "Failed to launch app {}: {}", app.name, e);
            self.synchronizer.refresh().await;
        }
    }

    pub async fn set_volume(&self, selector: VolumeSelector) {
        let direction = match selector {
            VolumeSelector::Increment => {
                info!("Incrementing the volume");
                VolumeDirection::Up
            }
            VolumeSelector::Decrement => {
                info!("Decrementing the volume");
                VolumeDirection::Down
            }
        };
        if let Err(e) = self.controller.set_volume(direction).await {
            warn!(device = %self.controller.address(), "Volume command failed: {}", e);
        }
    }

    pub async fn toggle_mute(&self) {
        info!("Toggling mute");
        if let Err(e) = self.controller.mute().await {
            warn!(device = %self.controller.address(), "Mute command failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_table() {
        let expected = [
            (RemoteKey::Rewind, DeviceKey::Reverse),
            (RemoteKey::FastForward, DeviceKey::Forward),
            (RemoteKey::NextTrack, DeviceKey::Right),
            (RemoteKey::PreviousTrack, DeviceKey::Left),
            (RemoteKey::ArrowUp, DeviceKey::Up),
            (RemoteKey::ArrowDown, DeviceKey::Down),
            (RemoteKey::ArrowLeft, DeviceKey::Left),
            (RemoteKey::ArrowRight, DeviceKey::Right),
            (RemoteKey::Select, DeviceKey::Select),
            (RemoteKey::Back, DeviceKey::Back),
            (RemoteKey::Exit, DeviceKey::Home),
            (RemoteKey::PlayPause, DeviceKey::Play),
            (RemoteKey::Information, DeviceKey::Info),
        ];
        for (remote, device) in expected {
            assert_eq!(device_key_for(remote), device, "{:?}", remote);
        }
    }
}
