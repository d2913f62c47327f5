//! Events describing changes to host-visible accessory state.

use serde::{Deserialize, Serialize};

use crate::app_map::LocalAppId;

/// A change to state the accessory host displays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AccessoryEvent {
    /// The TV's power characteristic changed.
    PowerChanged { accessory_id: String, powered: bool },

    /// The TV's active input identifier was (re)published.
    ActiveInputChanged {
        accessory_id: String,
        local_id: LocalAppId,
    },

    /// A newly created accessory was handed to the host.
    AccessoryPublished { accessory_id: String, name: String },

    /// A cached accessory was re-attached to a discovered device.
    AccessoryRestored { accessory_id: String, name: String },
}

impl AccessoryEvent {
    pub fn accessory_id(&self) -> &str {
        match self {
            Self::PowerChanged { accessory_id, .. }
            | Self::ActiveInputChanged { accessory_id, .. }
            | Self::AccessoryPublished { accessory_id, .. }
            | Self::AccessoryRestored { accessory_id, .. } => accessory_id,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::PowerChanged { .. } => "PowerChanged",
            Self::ActiveInputChanged { .. } => "ActiveInputChanged",
            Self::AccessoryPublished { .. } => "AccessoryPublished",
            Self::AccessoryRestored { .. } => "AccessoryRestored",
        }
    }

    pub fn is_power_event(&self) -> bool {
        matches!(self, Self::PowerChanged { .. })
    }

    pub fn is_input_event(&self) -> bool {
        matches!(self, Self::ActiveInputChanged { .. })
    }

    pub fn is_lifecycle_event(&self) -> bool {
        matches!(
            self,
            Self::AccessoryPublished { .. } | Self::AccessoryRestored { .. }
        )
    }
}

/// Where and when an event was produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMetadata {
    pub source: String,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
}

impl EventMetadata {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }
}
