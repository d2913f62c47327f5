//! Event bus for accessory state changes.
//!
//! Synchronizers publish here; the host adapter (and tests) subscribe. A
//! broadcast channel means a slow subscriber loses old events rather than
//! stalling a poll loop.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::event::{AccessoryEvent, EventMetadata};

/// Default channel capacity for the event bus.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<(AccessoryEvent, EventMetadata)>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// The capacity determines how many events are buffered for slow subscribers.
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Publish an event with `system` as its source.
    ///
    /// Returns `true` if there was at least one subscriber.
    pub fn publish(&self, event: AccessoryEvent) -> bool {
        self.publish_with_source(event, "system")
    }

    pub fn publish_with_source(&self, event: AccessoryEvent, source: impl Into<String>) -> bool {
        self.tx.send((event, EventMetadata::new(source))).is_ok()
    }

    pub fn subscribe(&self) -> EventBusReceiver {
        EventBusReceiver {
            rx: self.tx.subscribe(),
        }
    }

    /// Subscribe to events matching `filter`.
    pub fn subscribe_filtered<F>(&self, filter: F) -> FilteredReceiver<F>
    where
        F: Fn(&AccessoryEvent) -> bool + Send + 'static,
    {
        FilteredReceiver::new(self.tx.subscribe(), filter)
    }

    /// Helper for common filtered subscriptions.
    pub fn filter(&self) -> FilterBuilder {
        FilterBuilder {
            tx: self.tx.clone(),
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

pub struct EventBusReceiver {
    rx: broadcast::Receiver<(AccessoryEvent, EventMetadata)>,
}

impl EventBusReceiver {
    /// Receive the next event. Returns `None` once the bus is closed.
    pub async fn recv(&mut self) -> Option<(AccessoryEvent, EventMetadata)> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Event subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    pub fn try_recv(&mut self) -> Option<(AccessoryEvent, EventMetadata)> {
        self.rx.try_recv().ok()
    }

    /// Drain everything currently buffered.
    pub fn drain(&mut self) -> Vec<AccessoryEvent> {
        let mut events = Vec::new();
        while let Some((event, _)) = self.try_recv() {
            events.push(event);
        }
        events
    }
}

pub struct FilteredReceiver<F>
where
    F: Fn(&AccessoryEvent) -> bool + Send,
{
    rx: broadcast::Receiver<(AccessoryEvent, EventMetadata)>,
    filter: F,
}

impl<F> FilteredReceiver<F>
where
    F: Fn(&AccessoryEvent) -> bool + Send,
{
    fn new(rx: broadcast::Receiver<(AccessoryEvent, EventMetadata)>, filter: F) -> Self {
        Self { rx, filter }
    }

    pub async fn recv(&mut self) -> Option<(AccessoryEvent, EventMetadata)> {
        loop {
            match self.rx.recv().await {
                Ok((event, meta)) => {
                    if (self.filter)(&event) {
                        return Some((event, meta));
                    }
                }
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    pub fn try_recv(&mut self) -> Option<(AccessoryEvent, EventMetadata)> {
        while let Ok((event, meta)) = self.rx.try_recv() {
            if (self.filter)(&event) {
                return Some((event, meta));
            }
        }
        None
    }

    /// Drain every buffered event that passes the filter.
    pub fn drain(&mut self) -> Vec<AccessoryEvent> {
        let mut events = Vec::new();
        while let Some((event, _)) = self.try_recv() {
            events.push(event);
        }
        events
    }
}

pub struct FilterBuilder {
    tx: broadcast::Sender<(AccessoryEvent, EventMetadata)>,
}

impl FilterBuilder {
    pub fn power_events(&self) -> FilteredReceiver<fn(&AccessoryEvent) -> bool> {
        FilteredReceiver::new(self.tx.subscribe(), AccessoryEvent::is_power_event)
    }

    pub fn input_events(&self) -> FilteredReceiver<fn(&AccessoryEvent) -> bool> {
        FilteredReceiver::new(self.tx.subscribe(), AccessoryEvent::is_input_event)
    }

    pub fn lifecycle_events(&self) -> FilteredReceiver<fn(&AccessoryEvent) -> bool> {
        FilteredReceiver::new(self.tx.subscribe(), AccessoryEvent::is_lifecycle_event)
    }

    /// Events for one accessory only.
    pub fn for_accessory(
        &self,
        accessory_id: impl Into<String>,
    ) -> FilteredReceiver<impl Fn(&AccessoryEvent) -> bool + Send + 'static> {
        let target = accessory_id.into();
        FilteredReceiver::new(self.tx.subscribe(), move |event: &AccessoryEvent| {
            event.accessory_id() == target
        })
    }
}

pub type SharedEventBus = Arc<EventBus>;
