//! The Event Bus Adapter: publish/subscribe for [`crate::models::event::ProxyEvent`]
//! and configuration-change notifications, backed by a single broadcast
//! channel per topic family.
//!
//! Delivery ordering is not guaranteed and lagging subscribers drop the
//! oldest buffered messages rather than block publishers — `broadcast`'s
//! native semantics match the "handlers must tolerate out-of-order delivery
//! and duplicates" contract directly.

use crate::models::event::{ConfigEvent, ProxyEvent};
use log::warn;
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 1024;

pub struct EventBus {
    proxy_events: broadcast::Sender<ProxyEvent>,
    config_events: broadcast::Sender<ConfigEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (proxy_events, _) = broadcast::channel(CHANNEL_CAPACITY);
        let (config_events, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            proxy_events,
            config_events,
        }
    }

    /// Publishes a proxy event. A publish with no subscribers is not an
    /// error — it's the common case before any observer attaches.
    pub fn publish(&self, event: ProxyEvent) {
        if self.proxy_events.send(event).is_err() {
            // no subscribers currently attached
        }
    }

    pub fn publish_config_change(&self, event: ConfigEvent) {
        if let Err(e) = self.config_events.send(event) {
            warn!("failed to broadcast config change: {e}");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProxyEvent> {
        self.proxy_events.subscribe()
    }

    pub fn subscribe_config_changes(&self) -> broadcast::Receiver<ConfigEvent> {
        self.config_events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::event::ProxyEventName;

    #[tokio::test]
    async fn subscriber_receives_published_event() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        bus.publish(ProxyEvent::new(
            ProxyEventName::RequestReceived,
            "e1",
            "http://up/",
            "r1",
            "/x",
            "GET",
        ));
        let received = rx.recv().await.unwrap();
        assert_eq!(received.name, ProxyEventName::RequestReceived);
    }

    #[test]
    fn publish_without_subscribers_does_not_panic() {
        let bus = EventBus::new();
        bus.publish(ProxyEvent::new(
            ProxyEventName::RequestSent,
            "e1",
            "http://up/",
            "r1",
            "/x",
            "GET",
        ));
    }
}
