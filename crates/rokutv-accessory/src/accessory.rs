//! Roku TV accessory.
//!
//! One instance per discovered device. It owns the device's controller, app
//! map, synchronizer and translator, fills in the host accessory's services
//! and answers characteristic reads and writes.

use std::sync::Arc;

use parking_lot::Mutex;
use rokutv_core::{AppIdentityMap, DeviceDescriptor, EventBus, PlatformConfig};
use rokutv_devices::DeviceController;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::discovery::input_sources;
use crate::host::{
    Accessory, AccessoryInformation, CharacteristicKind, CharacteristicValue, InputSource,
    SleepDiscoveryMode, VolumeControlType,
};
use crate::sync::AccessorySynchronizer;
use crate::translator::CommandTranslator;

pub struct RokuAccessory {
    uuid: Uuid,
    descriptor: DeviceDescriptor,
    apps: Arc<AppIdentityMap>,
    controller: Arc<dyn DeviceController>,
    synchronizer: Arc<AccessorySynchronizer>,
    translator: CommandTranslator,
    inputs: Vec<InputSource>,
    poll_task: Mutex<Option<JoinHandle<()>>>,
}

impl RokuAccessory {
    pub fn new(
        uuid: Uuid,
        descriptor: DeviceDescriptor,
        controller: Arc<dyn DeviceController>,
        config: &PlatformConfig,
        event_bus: EventBus,
    ) -> Self {
        info!("Roku TV address is: {}", descriptor.address);
        let apps = Arc::new(descriptor.app_map());
        let synchronizer = Arc::new(AccessorySynchronizer::new(
            uuid.to_string(),
            controller.clone(),
            apps.clone(),
            event_bus,
            config.polling_interval(),
        ));
        let translator = CommandTranslator::new(controller.clone(), apps.clone(), synchronizer.clone());
        let inputs = input_sources(&apps, &config.excluded_apps);

        Self {
            uuid,
            descriptor,
            apps,
            controller,
            synchronizer,
            translator,
            inputs,
            poll_task: Mutex::new(None),
        }
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn descriptor(&self) -> &DeviceDescriptor {
        &self.descriptor
    }

    pub fn apps(&self) -> &AppIdentityMap {
        &self.apps
    }

    pub fn inputs(&self) -> &[InputSource] {
        &self.inputs
    }

    pub fn synchronizer(&self) -> &Arc<AccessorySynchronizer> {
        &self.synchronizer
    }

    /// Fill in information, television, speaker and input services.
    ///
    /// Works on fresh and cache-restored accessories alike; existing inputs
    /// are matched by name and updated in place.
    pub fn configure(&self, accessory: &mut Accessory) {
        let info = &self.descriptor.info;
        accessory.information = AccessoryInformation {
            manufacturer: info.vendor_name.clone(),
            model: info.model_name.clone(),
            name: info.user_device_name.clone(),
            serial_number: info.serial_number.clone(),
        };

        accessory.television.configured_name = self.descriptor.display_name().to_string();
        accessory.television.sleep_discovery_mode = SleepDiscoveryMode::AlwaysDiscoverable;

        accessory.speaker.active = true;
        accessory.speaker.volume_control_type = VolumeControlType::Relative;

        accessory.television.linked_inputs.clear();
        for input in &self.inputs {
            info!(
                "Adding input {} with identifier {}, type {:?}",
                input.name, input.identifier, input.source_type
            );
            accessory.television.linked_inputs.push(input.identifier);
            accessory.upsert_input(input.clone());
        }
    }

    /// Start the poll loop. Calling it twice keeps the first loop.
    pub fn start_polling(&self) {
        let mut task = self.poll_task.lock();
        if task.is_none() {
            debug!(accessory = %self.uuid, "Polling every {:?}", self.synchronizer.interval());
            *task = Some(self.synchronizer.clone().spawn());
        }
    }

    pub fn stop_polling(&self) {
        if let Some(task) = self.poll_task.lock().take() {
            task.abort();
        }
    }

    /// Characteristic write. Always completes; never fails.
    pub async fn handle_set(&self, value: CharacteristicValue) {
        self.translator.apply(value).await;
    }

    /// Characteristic read.
    ///
    /// Reads go to the device; if it does not answer, the last published
    /// value is returned instead. Write-only characteristics return `None`.
    pub async fn handle_get(&self, kind: CharacteristicKind) -> Option<CharacteristicValue> {
        match kind {
            CharacteristicKind::Active => {
                let powered = match self.controller.query_info().await {
                    Ok(info) => {
                        info!("Getting power state: {}", info.power_mode);
                        info.powered()
                    }
                    Err(e) => {
                        warn!(accessory = %self.uuid, "Power read failed: {}", e);
                        self.synchronizer.snapshot().powered.unwrap_or(false)
                    }
                };
                Some(CharacteristicValue::Active(powered))
            }
            CharacteristicKind::ActiveIdentifier => {
                let local_id = match self.controller.query_active_app().await {
                    Ok(remote_id) => self.synchronizer.resolve_active(remote_id.as_deref()),
                    Err(e) => {
                        warn!(accessory = %self.uuid, "Active app read failed: {}", e);
                        self.synchronizer
                            .snapshot()
                            .active_input
                            .unwrap_or_else(|| self.apps.home_local_id())
                    }
                };
                Some(CharacteristicValue::ActiveIdentifier(local_id))
            }
            CharacteristicKind::RemoteKey
            | CharacteristicKind::VolumeSelector
            | CharacteristicKind::Mute => None,
        }
    }
}

impl Drop for RokuAccessory {
    fn drop(&mut self) {
        self.stop_polling();
    }
}
