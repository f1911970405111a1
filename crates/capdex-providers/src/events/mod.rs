//! In-process registry event bus
//!
//! Carries registry mutation events from the store to the invalidation
//! controller over a tokio broadcast channel. Subscribers that fall behind
//! lose the oldest events; the controller treats a lagged receiver as a
//! signal to schedule a full rebuild rather than trusting partial deltas.

use capdex_domain::events::RegistryEvent;
use tokio::sync::broadcast;

use crate::constants::EVENT_BUS_CAPACITY;

/// Broadcast-based registry event bus
#[derive(Debug, Clone)]
pub struct RegistryEventBus {
    sender: broadcast::Sender<RegistryEvent>,
}

impl RegistryEventBus {
    /// Create a bus with the default capacity
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_BUS_CAPACITY);
        Self { sender }
    }

    /// Publish an event; silently dropped when nobody subscribes
    pub fn publish(&self, event: RegistryEvent) {
        let _ = self.sender.send(event);
    }

    /// Subscribe to future events
    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.sender.subscribe()
    }
}

impl Default for RegistryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let bus = RegistryEventBus::new();
        let mut rx = bus.subscribe();
        bus.publish(RegistryEvent::ServiceCreated(7));
        assert_eq!(rx.recv().await.unwrap(), RegistryEvent::ServiceCreated(7));
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_fine() {
        let bus = RegistryEventBus::new();
        bus.publish(RegistryEvent::PolicyChanged(1));
    }
}
