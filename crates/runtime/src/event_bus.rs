use tokio::sync::broadcast;

use crate::frame::Frame;

/// Default capacity of the broadcast ring per bus.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// A typed event stamped with the frame during which it was emitted.
#[derive(Debug, Clone, PartialEq)]
pub struct Event<E> {
    pub frame_index: u64,
    pub payload: E,
}

/// Typed fan-out of engine events.
///
/// Subscribers get every event emitted after they subscribe. Emitting with
/// no subscribers is not an error; slow subscribers lag and skip instead of
/// blocking the emitter.
#[derive(Debug)]
pub struct EventBus<E> {
    sender: broadcast::Sender<Event<E>>,
    emitted: u64,
}

impl<E: Clone> EventBus<E> {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_EVENT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender, emitted: 0 }
    }

    pub fn emit(&mut self, frame: Frame, payload: E) {
        self.emitted += 1;
        // A send error only means nobody is listening.
        let _ = self.sender.send(Event {
            frame_index: frame.index,
            payload,
        });
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event<E>> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Total events emitted over the bus lifetime, listened to or not.
    pub fn emitted(&self) -> u64 {
        self.emitted
    }
}

impl<E: Clone> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}
