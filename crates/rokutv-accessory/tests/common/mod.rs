//! Scripted device mocks shared by the accessory tests.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rokutv_core::{DeviceAddress, DeviceError, DeviceInfo, DeviceKey, RawApp, VolumeDirection};
use rokutv_devices::{DeviceController, DeviceDiscoverer, DeviceResult};

/// Controller whose answers are set up by the test and whose calls are recorded.
pub struct MockController {
    address: DeviceAddress,
    name: String,
    apps: Vec<RawApp>,
    power_script: Mutex<VecDeque<bool>>,
    powered: Mutex<bool>,
    active: Mutex<Option<String>>,
    info_fails: AtomicBool,
    active_fails: AtomicBool,
    launch_fails: AtomicBool,
    unreachable: AtomicBool,
    calls: Mutex<Vec<String>>,
}

impl MockController {
    pub fn new(host: &str) -> Self {
        Self {
            address: DeviceAddress::new(host),
            name: "Living Room".to_string(),
            apps: vec![RawApp::new("12", "Netflix", "appl", "4.1.218")],
            power_script: Mutex::new(VecDeque::new()),
            powered: Mutex::new(false),
            active: Mutex::new(None),
            info_fails: AtomicBool::new(false),
            active_fails: AtomicBool::new(false),
            launch_fails: AtomicBool::new(false),
            unreachable: AtomicBool::new(false),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn with_apps(mut self, apps: Vec<RawApp>) -> Self {
        self.apps = apps;
        self
    }

    /// Power readings returned by successive info queries. Once the script
    /// runs out the last value keeps being returned.
    pub fn with_power_script(self, script: &[bool]) -> Self {
        self.power_script.lock().extend(script.iter().copied());
        self
    }

    pub fn with_active(self, remote_id: Option<&str>) -> Self {
        *self.active.lock() = remote_id.map(str::to_string);
        self
    }

    pub fn failing_info(self) -> Self {
        self.info_fails.store(true, Ordering::SeqCst);
        self
    }

    pub fn failing_active(self) -> Self {
        self.active_fails.store(true, Ordering::SeqCst);
        self
    }

    pub fn failing_launch(self) -> Self {
        self.launch_fails.store(true, Ordering::SeqCst);
        self
    }

    pub fn unreachable(self) -> Self {
        self.unreachable.store(true, Ordering::SeqCst);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.as_str() == call).count()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().push(call.into());
    }

    fn check_reachable(&self) -> DeviceResult<()> {
        if self.unreachable.load(Ordering::SeqCst) {
            Err(DeviceError::Unreachable(self.address.host().to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl DeviceController for MockController {
    fn address(&self) -> &DeviceAddress {
        &self.address
    }

    async fn query_info(&self) -> DeviceResult<DeviceInfo> {
        self.record("query_info");
        self.check_reachable()?;
        if self.info_fails.load(Ordering::SeqCst) {
            return Err(DeviceError::Protocol("device-info: bad response".to_string()));
        }
        let powered = {
            let mut current = self.powered.lock();
            if let Some(next) = self.power_script.lock().pop_front() {
                *current = next;
            }
            *current
        };
        Ok(DeviceInfo {
            power_mode: if powered { "PowerOn" } else { "DisplayOff" }.to_string(),
            vendor_name: "TCL".to_string(),
            model_name: "55S425".to_string(),
            serial_number: "X00000123456".to_string(),
            user_device_name: self.name.clone(),
        })
    }

    async fn query_apps(&self) -> DeviceResult<Vec<RawApp>> {
        self.record("query_apps");
        self.check_reachable()?;
        Ok(self.apps.clone())
    }

    async fn query_active_app(&self) -> DeviceResult<Option<String>> {
        self.record("query_active_app");
        self.check_reachable()?;
        if self.active_fails.load(Ordering::SeqCst) {
            return Err(DeviceError::Protocol("active-app: bad response".to_string()));
        }
        Ok(self.active.lock().clone())
    }

    async fn launch(&self, remote_id: &str) -> DeviceResult<()> {
        self.record(format!("launch {}", remote_id));
        self.check_reachable()?;
        if self.launch_fails.load(Ordering::SeqCst) {
            return Err(DeviceError::LaunchFailed {
                app_id: remote_id.to_string(),
                reason: "HTTP 404".to_string(),
            });
        }
        *self.active.lock() = Some(remote_id.to_string());
        Ok(())
    }

    async fn send_key(&self, key: DeviceKey) -> DeviceResult<()> {
        self.record(format!("keypress {}", key.ecp_name()));
        self.check_reachable()
    }

    async fn set_volume(&self, direction: VolumeDirection) -> DeviceResult<()> {
        self.record(format!("keypress {}", direction.ecp_name()));
        self.check_reachable()
    }

    async fn mute(&self) -> DeviceResult<()> {
        self.record("keypress VolumeMute");
        self.check_reachable()
    }
}

/// Discoverer that hands out preconfigured mock controllers.
pub struct MockDiscoverer {
    order: Vec<DeviceAddress>,
    controllers: HashMap<DeviceAddress, Arc<MockController>>,
}

impl MockDiscoverer {
    pub fn new(controllers: Vec<Arc<MockController>>) -> Self {
        let order = controllers.iter().map(|c| c.address().clone()).collect();
        let controllers = controllers
            .into_iter()
            .map(|c| (c.address().clone(), c))
            .collect();
        Self { order, controllers }
    }
}

#[async_trait]
impl DeviceDiscoverer for MockDiscoverer {
    async fn discover_all(&self) -> DeviceResult<Vec<DeviceAddress>> {
        Ok(self.order.clone())
    }

    fn connect(&self, address: &DeviceAddress) -> Arc<dyn DeviceController> {
        match self.controllers.get(address) {
            Some(controller) => controller.clone(),
            None => Arc::new(MockController::new(address.host()).unreachable()),
        }
    }
}
