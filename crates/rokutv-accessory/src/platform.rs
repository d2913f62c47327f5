//! Platform lifecycle.
//!
//! The host restores cached accessories through [`RokuTvPlatform::configure_accessory`]
//! and then signals readiness with [`RokuTvPlatform::did_finish_launching`],
//! which discovers devices, attaches each one to its cached accessory (or a
//! new one), publishes the new ones and starts polling.

use std::sync::Arc;

use rokutv_core::{AccessoryEvent, ConfigError, EventBus, PlatformConfig};
use rokutv_devices::{DeviceDiscoverer, SsdpDiscoverer, StaticDiscoverer};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::accessory::RokuAccessory;
use crate::discovery::{DiscoveredDevice, DiscoveryCoordinator};
use crate::host::{accessory_uuid, Accessory, AccessoryCategory, AccessoryRepository};

const EVENT_SOURCE: &str = "platform";

pub struct RokuTvPlatform {
    config: PlatformConfig,
    repository: Arc<dyn AccessoryRepository>,
    coordinator: DiscoveryCoordinator,
    event_bus: EventBus,
    accessories: RwLock<Vec<Arc<RokuAccessory>>>,
}

impl RokuTvPlatform {
    pub fn new(
        config: PlatformConfig,
        repository: Arc<dyn AccessoryRepository>,
        discoverer: Arc<dyn DeviceDiscoverer>,
        event_bus: EventBus,
    ) -> Self {
        debug!(
            "Finished initializing platform: {}",
            config.name.as_deref().unwrap_or(rokutv_core::PLATFORM_NAME)
        );
        Self {
            config,
            repository,
            coordinator: DiscoveryCoordinator::new(discoverer),
            event_bus,
            accessories: RwLock::new(Vec::new()),
        }
    }

    /// Build a platform whose discoverer follows the config: static
    /// addresses when `devices` is set, SSDP otherwise.
    pub fn from_config(
        config: PlatformConfig,
        repository: Arc<dyn AccessoryRepository>,
        event_bus: EventBus,
    ) -> Result<Self, ConfigError> {
        let addresses = config.device_addresses()?;
        let discoverer: Arc<dyn DeviceDiscoverer> = if addresses.is_empty() {
            Arc::new(SsdpDiscoverer::new(
                config.discovery_timeout(),
                config.request_timeout(),
            ))
        } else {
            Arc::new(StaticDiscoverer::new(addresses, config.request_timeout()))
        };
        Ok(Self::new(config, repository, discoverer, event_bus))
    }

    pub fn config(&self) -> &PlatformConfig {
        &self.config
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Host hook for accessories restored from its cache.
    pub async fn configure_accessory(&self, accessory: Accessory) {
        self.repository.restore(accessory).await;
    }

    /// Host hook for "platform ready".
    ///
    /// Returns the accessories that are now running. Discovery failure is
    /// logged and yields an empty list.
    pub async fn did_finish_launching(&self) -> Vec<Arc<RokuAccessory>> {
        debug!("Executed did_finish_launching");
        let devices = match self.coordinator.discover().await {
            Ok(devices) => devices,
            Err(e) => {
                warn!("Device discovery failed: {}", e);
                return Vec::new();
            }
        };

        let mut to_publish = Vec::new();
        let mut started = Vec::new();
        for device in devices {
            let uuid = accessory_uuid(&device.descriptor.address);
            if self.accessory(&uuid).await.is_some() {
                debug!(accessory = %uuid, "Device already attached");
                continue;
            }
            let (roku, new_accessory) = self.with_roku_accessory(uuid, device).await;
            if let Some(accessory) = new_accessory {
                to_publish.push(accessory);
            }
            roku.start_polling();
            self.accessories.write().await.push(roku.clone());
            started.push(roku);
        }

        if !to_publish.is_empty() {
            let published: Vec<(Uuid, String)> = to_publish
                .iter()
                .map(|a| (a.uuid, a.display_name.clone()))
                .collect();
            self.repository.publish_external(to_publish).await;
            for (uuid, name) in published {
                self.event_bus.publish_with_source(
                    AccessoryEvent::AccessoryPublished {
                        accessory_id: uuid.to_string(),
                        name,
                    },
                    EVENT_SOURCE,
                );
            }
        }

        started
    }

    /// Attach a device to its cached accessory, or create one.
    ///
    /// The second value is the accessory to publish when it is new.
    async fn with_roku_accessory(
        &self,
        uuid: Uuid,
        device: DiscoveredDevice,
    ) -> (Arc<RokuAccessory>, Option<Accessory>) {
        let roku = Arc::new(RokuAccessory::new(
            uuid,
            device.descriptor,
            device.controller,
            &self.config,
            self.event_bus.clone(),
        ));

        match self.repository.cached(&uuid).await {
            Some(mut existing) => {
                info!("Restoring existing accessory from cache: {}", existing.display_name);
                roku.configure(&mut existing);
                let name = existing.display_name.clone();
                self.repository.update(existing).await;
                self.event_bus.publish_with_source(
                    AccessoryEvent::AccessoryRestored {
                        accessory_id: uuid.to_string(),
                        name,
                    },
                    EVENT_SOURCE,
                );
                (roku, None)
            }
            None => {
                let mut accessory = Accessory::new(
                    roku.descriptor().display_name(),
                    uuid,
                    AccessoryCategory::Television,
                );
                roku.configure(&mut accessory);
                (roku, Some(accessory))
            }
        }
    }

    pub async fn accessory(&self, uuid: &Uuid) -> Option<Arc<RokuAccessory>> {
        self.accessories
            .read()
            .await
            .iter()
            .find(|a| &a.uuid() == uuid)
            .cloned()
    }

    pub async fn accessories(&self) -> Vec<Arc<RokuAccessory>> {
        self.accessories.read().await.clone()
    }

    /// Stop every poll loop.
    pub async fn shutdown(&self) {
        let accessories = std::mem::take(&mut *self.accessories.write().await);
        for accessory in &accessories {
            accessory.stop_polling();
        }
        info!("Stopped {} accessory poll loop(s)", accessories.len());
    }
}
