//! Accessory state synchronization.
//!
//! The synchronizer polls a device and publishes power and active-input
//! changes to the event bus. It is the only owner of the "last published"
//! record; the command translator asks it to refresh rather than publishing
//! on its own.
//!
//! Refreshes may overlap (a poll tick and a command-triggered refresh). Each
//! refresh takes a sequence number when it is issued, and a reading is only
//! applied if no reading from a later-issued refresh has been applied to the
//! same field already.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rokutv_core::{AccessoryEvent, AppIdentityMap, EventBus, LocalAppId, ObservedDeviceState, HOME_APP_ID};
use rokutv_devices::DeviceController;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, warn};

const EVENT_SOURCE: &str = "synchronizer";

#[derive(Debug, Default)]
struct PublishedState {
    powered: Option<bool>,
    power_seq: u64,
    active_input: Option<LocalAppId>,
    input_seq: u64,
}

/// Last values published to the host. `None` until the first good read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishedSnapshot {
    pub powered: Option<bool>,
    pub active_input: Option<LocalAppId>,
}

impl PublishedSnapshot {
    pub fn observed(&self) -> Option<ObservedDeviceState> {
        Some(ObservedDeviceState {
            powered: self.powered?,
            active_local_app_id: self.active_input?,
        })
    }
}

pub struct AccessorySynchronizer {
    accessory_id: String,
    controller: Arc<dyn DeviceController>,
    apps: Arc<AppIdentityMap>,
    event_bus: EventBus,
    interval: Duration,
    issued: AtomicU64,
    state: Mutex<PublishedState>,
}

impl AccessorySynchronizer {
    pub fn new(
        accessory_id: impl Into<String>,
        controller: Arc<dyn DeviceController>,
        apps: Arc<AppIdentityMap>,
        event_bus: EventBus,
        interval: Duration,
    ) -> Self {
        Self {
            accessory_id: accessory_id.into(),
            controller,
            apps,
            event_bus,
            interval,
            issued: AtomicU64::new(0),
            state: Mutex::new(PublishedState::default()),
        }
    }

    pub fn accessory_id(&self) -> &str {
        &self.accessory_id
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn snapshot(&self) -> PublishedSnapshot {
        let state = self.state.lock();
        PublishedSnapshot {
            powered: state.powered,
            active_input: state.active_input,
        }
    }

    fn next_sequence(&self) -> u64 {
        self.issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Map the device's foreground app to a local id; unknown apps and the
    /// home screen both resolve to the home pseudo-app.
    pub fn resolve_active(&self, remote_id: Option<&str>) -> LocalAppId {
        let remote_id = remote_id.unwrap_or(HOME_APP_ID);
        match self.apps.by_remote_id(remote_id) {
            Ok(app) => app.local_id,
            Err(e) => {
                debug!(accessory = %self.accessory_id, "{}, showing Home", e);
                self.apps.home_local_id()
            }
        }
    }

    /// One poll: query power and active app concurrently and publish what
    /// came back. Failed queries are logged and leave their field alone.
    pub async fn refresh(&self) {
        let seq = self.next_sequence();
        let (info, active) = futures::join!(
            self.controller.query_info(),
            self.controller.query_active_app()
        );

        match info {
            Ok(info) => {
                debug!(
                    accessory = %self.accessory_id,
                    "Power state is: {} {}",
                    info.power_mode,
                    info.powered()
                );
                self.apply_power(seq, info.powered());
            }
            Err(e) => warn!(accessory = %self.accessory_id, "Power query failed: {}", e),
        }

        match active {
            Ok(remote_id) => {
                let local_id = self.resolve_active(remote_id.as_deref());
                self.apply_active_input(seq, local_id);
            }
            Err(e) => warn!(accessory = %self.accessory_id, "Active app query failed: {}", e),
        }
    }

    /// Re-read power only and publish it if it changed.
    ///
    /// Returns the device's power state, or `None` if the query failed.
    pub async fn refresh_power(&self) -> Option<bool> {
        let seq = self.next_sequence();
        match self.controller.query_info().await {
            Ok(info) => {
                let powered = info.powered();
                self.apply_power(seq, powered);
                Some(powered)
            }
            Err(e) => {
                warn!(accessory = %self.accessory_id, "Power query failed: {}", e);
                None
            }
        }
    }

    /// Returns `true` if an event was published.
    fn apply_power(&self, seq: u64, powered: bool) -> bool {
        let mut state = self.state.lock();
        if seq < state.power_seq {
            debug!(accessory = %self.accessory_id, seq, "Discarding stale power reading");
            return false;
        }
        state.power_seq = seq;
        if state.powered == Some(powered) {
            return false;
        }
        state.powered = Some(powered);
        self.event_bus.publish_with_source(
            AccessoryEvent::PowerChanged {
                accessory_id: self.accessory_id.clone(),
                powered,
            },
            EVENT_SOURCE,
        );
        true
    }

    /// Active input is republished on every good read, changed or not.
    fn apply_active_input(&self, seq: u64, local_id: LocalAppId) -> bool {
        let mut state = self.state.lock();
        if seq < state.input_seq {
            debug!(accessory = %self.accessory_id, seq, "Discarding stale active app reading");
            return false;
        }
        state.input_seq = seq;
        state.active_input = Some(local_id);
        self.event_bus.publish_with_source(
            AccessoryEvent::ActiveInputChanged {
                accessory_id: self.accessory_id.clone(),
                local_id,
            },
            EVENT_SOURCE,
        );
        true
    }

    /// Start polling. The first tick fires immediately; each tick's refresh
    /// runs on its own task so a slow device never delays the schedule.
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut timer = interval(self.interval);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                timer.tick().await;
                let this = Arc::clone(&self);
                tokio::spawn(async move { this.refresh().await });
            }
        })
    }
}
