//! Discovery coordination.
//!
//! Turns the addresses a [`DeviceDiscoverer`] finds into
//! [`DeviceDescriptor`]s: app list plus info block, with the home
//! pseudo-app appended. Each device is enriched independently, so one TV
//! that stops answering halfway through does not hide the others.

use std::sync::Arc;

use futures::future::join_all;
use rokutv_core::{AppIdentityMap, DeviceAddress, DeviceDescriptor, RawApp, HOME_APP_KIND};
use rokutv_devices::{DeviceController, DeviceDiscoverer, DeviceResult};
use tracing::{info, warn};

use crate::host::{InputSource, InputSourceType};

/// A described device and the controller that reached it.
pub struct DiscoveredDevice {
    pub descriptor: DeviceDescriptor,
    pub controller: Arc<dyn DeviceController>,
}

pub struct DiscoveryCoordinator {
    discoverer: Arc<dyn DeviceDiscoverer>,
}

impl DiscoveryCoordinator {
    pub fn new(discoverer: Arc<dyn DeviceDiscoverer>) -> Self {
        Self { discoverer }
    }

    /// Find devices and describe each one.
    ///
    /// Fails only if discovery itself fails; per-device failures are logged
    /// and the device is left out.
    pub async fn discover(&self) -> DeviceResult<Vec<DiscoveredDevice>> {
        let mut addresses = self.discoverer.discover_all().await?;
        let mut seen: Vec<DeviceAddress> = Vec::with_capacity(addresses.len());
        addresses.retain(|address| {
            if seen.contains(address) {
                false
            } else {
                seen.push(address.clone());
                true
            }
        });

        let devices: Vec<DiscoveredDevice> = join_all(
            addresses.into_iter().map(|address| self.describe(address)),
        )
        .await
        .into_iter()
        .flatten()
        .collect();

        info!("Discovered {} Roku device(s)", devices.len());
        Ok(devices)
    }

    async fn describe(&self, address: DeviceAddress) -> Option<DiscoveredDevice> {
        let controller = self.discoverer.connect(&address);
        let (apps, info) = futures::join!(controller.query_apps(), controller.query_info());

        let mut apps = match apps {
            Ok(apps) => apps,
            Err(e) => {
                warn!(device = %address, "Skipping device, app list query failed: {}", e);
                return None;
            }
        };
        let info = match info {
            Ok(info) => info,
            Err(e) => {
                warn!(device = %address, "Skipping device, info query failed: {}", e);
                return None;
            }
        };

        apps.push(RawApp::home());
        info!(
            device = %address,
            "Found {} ({} {}) with {} apps",
            info.user_device_name,
            info.vendor_name,
            info.model_name,
            apps.len()
        );

        Some(DiscoveredDevice {
            descriptor: DeviceDescriptor {
                address,
                info,
                apps,
            },
            controller,
        })
    }
}

fn input_source_type(kind: &str) -> InputSourceType {
    if kind.eq_ignore_ascii_case(HOME_APP_KIND) {
        InputSourceType::HomeScreen
    } else {
        // Channels ("appl") and everything else show up as HDMI inputs.
        InputSourceType::Hdmi
    }
}

/// Input sources for the host, in app-list order, without excluded apps.
///
/// The home pseudo-app is always kept.
pub fn input_sources(apps: &AppIdentityMap, excluded_apps: &[String]) -> Vec<InputSource> {
    apps.all()
        .iter()
        .filter(|app| app.is_home() || !excluded_apps.iter().any(|name| name == &app.name))
        .map(|app| InputSource {
            identifier: app.local_id,
            remote_id: app.remote_id.clone(),
            name: app.name.clone(),
            source_type: input_source_type(&app.kind),
            configured: true,
        })
        .collect()
}
