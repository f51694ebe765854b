//! Thread-safe, bounded event bus.
//!
//! The bus provides a simple publish/subscribe mechanism where:
//! - Any thread can publish events via `EventPublisher::publish()`
//! - The control thread polls for events via `EventBus::drain()`
//!
//! Publishing never blocks. When the queue is full the event is dropped and
//! logged; a flood of hotkey repeats must not stall the listener thread.

use std::sync::mpsc::{self, Receiver, SyncSender, TryRecvError, TrySendError};

use super::types::AppEvent;
use crate::model::constants::EVENT_QUEUE_CAPACITY;

/// Event bus for application-wide event distribution.
///
/// Uses a bounded multi-producer, single-consumer channel internally.
/// Multiple publishers can send events concurrently, and a single
/// consumer (the control thread) receives and processes them.
///
/// # Example
///
/// ```
/// use map_overlay::events::{AppEvent, EventBus};
///
/// let bus = EventBus::new();
/// let publisher = bus.publisher();
///
/// publisher.publish(AppEvent::OpenSettings);
///
/// let events = bus.drain();
/// assert_eq!(events.len(), 1);
/// ```
pub struct EventBus {
    sender: SyncSender<AppEvent>,
    receiver: Receiver<AppEvent>,
}

impl EventBus {
    /// Create a new event bus with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(EVENT_QUEUE_CAPACITY)
    }

    /// Create a new event bus holding at most `capacity` pending events.
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, receiver) = mpsc::sync_channel(capacity);
        Self { sender, receiver }
    }

    /// Get a publisher handle that can be cloned and sent to other threads.
    pub fn publisher(&self) -> EventPublisher {
        EventPublisher {
            sender: self.sender.clone(),
        }
    }

    /// Try to receive the next event without blocking.
    pub fn try_recv(&self) -> Option<AppEvent> {
        match self.receiver.try_recv() {
            Ok(event) => Some(event),
            // The bus owns a sender, so Disconnected cannot happen while it lives
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Drain all pending events into a Vec, in publish order.
    pub fn drain(&self) -> Vec<AppEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.try_recv() {
            events.push(event);
        }
        events
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// A cloneable, thread-safe event publisher.
#[derive(Clone)]
pub struct EventPublisher {
    sender: SyncSender<AppEvent>,
}

impl EventPublisher {
    /// Publish an event to the bus.
    ///
    /// Returns false if the event was dropped (queue full or bus gone).
    pub fn publish(&self, event: AppEvent) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                log::warn!("Event queue full, dropping: {}", event.description());
                false
            }
            // Receiver dropped means the app is shutting down
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}
