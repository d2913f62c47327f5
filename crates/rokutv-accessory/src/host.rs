//! Accessory-host boundary.
//!
//! Typed stand-ins for the host's accessory, service and characteristic
//! objects, plus the repository the platform uses to restore cached
//! accessories and publish new ones. The numeric values follow the HomeKit
//! characteristic definitions so a host adapter can pass them through.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use rokutv_core::{AccessoryEvent, DeviceAddress, EventBus, LocalAppId};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

/// Namespace for accessory UUIDs derived from device addresses.
const ACCESSORY_NAMESPACE: Uuid = Uuid::from_u128(0x5f0c_2a4e_8b71_4d3a_9e56_0c1d_7b2f_a803);

/// Stable accessory UUID for a device.
pub fn accessory_uuid(address: &DeviceAddress) -> Uuid {
    Uuid::new_v5(&ACCESSORY_NAMESPACE, address.host().as_bytes())
}

/// Remote-control buttons as the host numbers them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum RemoteKey {
    Rewind = 0,
    FastForward = 1,
    NextTrack = 2,
    PreviousTrack = 3,
    ArrowUp = 4,
    ArrowDown = 5,
    ArrowLeft = 6,
    ArrowRight = 7,
    Select = 8,
    Back = 9,
    Exit = 10,
    PlayPause = 11,
    Information = 15,
}

impl RemoteKey {
    pub fn from_value(value: u8) -> Option<Self> {
        Some(match value {
            0 => Self::Rewind,
            1 => Self::FastForward,
            2 => Self::NextTrack,
            3 => Self::PreviousTrack,
            4 => Self::ArrowUp,
            5 => Self::ArrowDown,
            6 => Self::ArrowLeft,
            7 => Self::ArrowRight,
            8 => Self::Select,
            9 => Self::Back,
            10 => Self::Exit,
            11 => Self::PlayPause,
            15 => Self::Information,
            _ => return None,
        })
    }

    pub fn value(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum VolumeSelector {
    Increment = 0,
    Decrement = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum InputSourceType {
    Other = 0,
    HomeScreen = 1,
    Hdmi = 3,
    Application = 10,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SleepDiscoveryMode {
    NotDiscoverable,
    #[default]
    AlwaysDiscoverable,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum VolumeControlType {
    None,
    #[default]
    Relative,
    Absolute,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessoryCategory {
    #[default]
    Television,
}

/// Characteristics the TV accessory handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CharacteristicKind {
    Active,
    ActiveIdentifier,
    RemoteKey,
    VolumeSelector,
    Mute,
}

/// A value written to (or read from) a characteristic.
///
/// `RemoteKey` carries the raw host value so that keys this bridge does not
/// know about still reach the translator and are acknowledged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CharacteristicValue {
    Active(bool),
    ActiveIdentifier(LocalAppId),
    RemoteKey(u8),
    VolumeSelector(VolumeSelector),
    Mute(bool),
}

impl CharacteristicValue {
    pub fn kind(&self) -> CharacteristicKind {
        match self {
            Self::Active(_) => CharacteristicKind::Active,
            Self::ActiveIdentifier(_) => CharacteristicKind::ActiveIdentifier,
            Self::RemoteKey(_) => CharacteristicKind::RemoteKey,
            Self::VolumeSelector(_) => CharacteristicKind::VolumeSelector,
            Self::Mute(_) => CharacteristicKind::Mute,
        }
    }
}

/// One selectable input on the TV service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputSource {
    pub identifier: LocalAppId,
    pub remote_id: String,
    pub name: String,
    pub source_type: InputSourceType,
    pub configured: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessoryInformation {
    pub manufacturer: String,
    pub model: String,
    pub name: String,
    pub serial_number: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelevisionService {
    pub configured_name: String,
    pub sleep_discovery_mode: SleepDiscoveryMode,
    pub active: bool,
    pub active_identifier: Option<LocalAppId>,
    /// Identifiers of linked input sources, in display order
    pub linked_inputs: Vec<LocalAppId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeakerService {
    pub active: bool,
    pub volume_control_type: VolumeControlType,
}

/// Host-side accessory record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Accessory {
    pub uuid: Uuid,
    pub display_name: String,
    pub category: AccessoryCategory,
    pub information: AccessoryInformation,
    pub television: TelevisionService,
    pub speaker: SpeakerService,
    pub inputs: Vec<InputSource>,
}

impl Accessory {
    pub fn new(display_name: impl Into<String>, uuid: Uuid, category: AccessoryCategory) -> Self {
        Self {
            uuid,
            display_name: display_name.into(),
            category,
            information: AccessoryInformation::default(),
            television: TelevisionService::default(),
            speaker: SpeakerService::default(),
            inputs: Vec::new(),
        }
    }

    pub fn input_by_name(&self, name: &str) -> Option<&InputSource> {
        self.inputs.iter().find(|input| input.name == name)
    }

    /// Reuse the input with the same name if the accessory already has one.
    pub fn upsert_input(&mut self, input: InputSource) {
        match self.inputs.iter_mut().find(|existing| existing.name == input.name) {
            Some(existing) => *existing = input,
            None => self.inputs.push(input),
        }
    }

    /// Reflect a state event onto the stored characteristics.
    pub fn apply_event(&mut self, event: &AccessoryEvent) {
        match event {
            AccessoryEvent::PowerChanged { powered, .. } => self.television.active = *powered,
            AccessoryEvent::ActiveInputChanged { local_id, .. } => {
                self.television.active_identifier = Some(*local_id)
            }
            _ => {}
        }
    }
}

/// What the platform needs from the host's accessory store.
#[async_trait]
pub trait AccessoryRepository: Send + Sync {
    /// Called by the host for every accessory restored from its cache.
    async fn restore(&self, accessory: Accessory);

    async fn cached(&self, uuid: &Uuid) -> Option<Accessory>;

    /// Store changes to an already known accessory.
    async fn update(&self, accessory: Accessory);

    /// Hand newly created accessories to the host for display.
    async fn publish_external(&self, accessories: Vec<Accessory>);
}

/// Repository kept in memory. Used by the CLI and by tests.
#[derive(Default)]
pub struct InMemoryAccessoryRepository {
    accessories: RwLock<HashMap<Uuid, Accessory>>,
    published: RwLock<Vec<Uuid>>,
}

impl InMemoryAccessoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, uuid: &Uuid) -> Option<Accessory> {
        self.accessories.read().await.get(uuid).cloned()
    }

    pub async fn len(&self) -> usize {
        self.accessories.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.accessories.read().await.is_empty()
    }

    /// UUIDs passed to `publish_external`, in order.
    pub async fn published(&self) -> Vec<Uuid> {
        self.published.read().await.clone()
    }

    pub async fn apply_event(&self, event: &AccessoryEvent) {
        let Ok(uuid) = Uuid::parse_str(event.accessory_id()) else {
            return;
        };
        if let Some(accessory) = self.accessories.write().await.get_mut(&uuid) {
            accessory.apply_event(event);
        }
    }

    /// Keep stored characteristics in step with the event bus.
    pub fn follow(self: Arc<Self>, event_bus: &EventBus) -> JoinHandle<()> {
        let mut rx = event_bus.subscribe();
        tokio::spawn(async move {
            while let Some((event, _)) = rx.recv().await {
                debug!(event = event.type_name(), accessory = event.accessory_id(), "Host update");
                self.apply_event(&event).await;
            }
        })
    }
}

#[async_trait]
impl AccessoryRepository for InMemoryAccessoryRepository {
    async fn restore(&self, accessory: Accessory) {
        info!("Loading accessory from cache: {}", accessory.display_name);
        self.accessories
            .write()
            .await
            .insert(accessory.uuid, accessory);
    }

    async fn cached(&self, uuid: &Uuid) -> Option<Accessory> {
        self.get(uuid).await
    }

    async fn update(&self, accessory: Accessory) {
        self.accessories
            .write()
            .await
            .insert(accessory.uuid, accessory);
    }

    async fn publish_external(&self, accessories: Vec<Accessory>) {
        let mut store = self.accessories.write().await;
        let mut published = self.published.write().await;
        for accessory in accessories {
            info!("Publishing accessory: {}", accessory.display_name);
            published.push(accessory.uuid);
            store.insert(accessory.uuid, accessory);
        }
    }
}
