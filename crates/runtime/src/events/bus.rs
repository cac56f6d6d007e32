//! Topic-based event bus implementation.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::broadcast;

use pickup_core::LivenessEvent;

use super::types::{FilterEvent, PickupEvent};

/// Topics for event routing
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize)]
pub enum Topic {
    /// Death, resurrection and forced resets
    Liveness,
    /// Target selection and interaction rounds
    Pickup,
    /// Rule reloads
    Filters,
}

impl Topic {
    pub const ALL: [Topic; 3] = [Topic::Liveness, Topic::Pickup, Topic::Filters];
}

/// Event wrapper that carries the topic and typed event
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Event {
    Liveness(LivenessEvent),
    Pickup(PickupEvent),
    Filters(FilterEvent),
}

impl Event {
    pub fn topic(&self) -> Topic {
        match self {
            Event::Liveness(_) => Topic::Liveness,
            Event::Pickup(_) => Topic::Pickup,
            Event::Filters(_) => Topic::Filters,
        }
    }
}

/// Topic-based event bus
///
/// Channels are created up front for every topic and never change, so
/// publishing and subscribing need no lock.
#[derive(Clone)]
pub struct EventBus {
    channels: Arc<HashMap<Topic, broadcast::Sender<Event>>>,
}

impl EventBus {
    /// Creates a new event bus with default capacity for each topic
    pub fn new() -> Self {
        Self::with_capacity(100)
    }

    /// Creates a new event bus with specified capacity per topic
    pub fn with_capacity(capacity: usize) -> Self {
        let channels = Topic::ALL
            .into_iter()
            .map(|topic| (topic, broadcast::channel(capacity.max(1)).0))
            .collect();

        Self {
            channels: Arc::new(channels),
        }
    }

    /// Publish an event to its corresponding topic
    pub fn publish(&self, event: Event) {
        let topic = event.topic();
        if let Some(tx) = self.channels.get(&topic)
            && tx.send(event).is_err()
        {
            // No subscribers for this topic - this is normal, not an error
            tracing::trace!(target: "pickup::events", ?topic, "no subscribers");
        }
    }

    /// Subscribe to a specific topic
    ///
    /// Returns a receiver that will only receive events for that topic.
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        match self.channels.get(&topic) {
            Some(tx) => tx.subscribe(),
            // Every topic is created in `with_capacity`.
            None => broadcast::channel(1).1,
        }
    }

    /// Subscribe to multiple topics
    pub fn subscribe_multiple(
        &self,
        topics: &[Topic],
    ) -> HashMap<Topic, broadcast::Receiver<Event>> {
        topics
            .iter()
            .map(|&topic| (topic, self.subscribe(topic)))
            .collect()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("topics", &self.channels.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_only_see_their_topic() {
        let bus = EventBus::new();
        let mut liveness = bus.subscribe(Topic::Liveness);
        let mut filters = bus.subscribe(Topic::Filters);

        bus.publish(Event::Liveness(LivenessEvent::Died));
        bus.publish(Event::Filters(FilterEvent::ReloadFailed {
            error: "busy".into(),
        }));

        assert_eq!(
            liveness.recv().await.unwrap(),
            Event::Liveness(LivenessEvent::Died)
        );
        assert!(liveness.try_recv().is_err());
        assert_eq!(filters.recv().await.unwrap().topic(), Topic::Filters);
    }

    #[test]
    fn publishing_without_subscribers_is_fine() {
        let bus = EventBus::with_capacity(0);
        bus.publish(Event::Pickup(PickupEvent::AreaChanged { area_id: 3 }));
    }

    #[test]
    fn events_serialize_tagged_by_topic() {
        use pickup_core::EntityId;

        let event = Event::Pickup(PickupEvent::RoundIssued {
            id: EntityId(7),
            round: 2,
        });
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            serde_json::json!({ "Pickup": { "RoundIssued": { "id": 7, "round": 2 } } })
        );
    }
}
