//! Structural change notifications
//!
//! The world emits a [`WorldEvent`] whenever its graph or its points change.
//! Hosts (a renderer, an editor) subscribe to refresh their own state; the
//! simulation itself never depends on anyone listening.

use std::collections::BTreeMap;
use std::fmt;

use super::types::{DespawnPointId, NodeId, RoadId, SpawnPointId, TrafficLightId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorldEvent {
    NodeCreated(NodeId),
    NodeMoved(NodeId),
    NodeDeleted(NodeId),
    RoadCreated(RoadId),
    RoadChanged(RoadId),
    RoadDeleted(RoadId),
    SpawnPointCreated(SpawnPointId),
    SpawnPointDeleted(SpawnPointId),
    DespawnPointCreated(DespawnPointId),
    DespawnPointDeleted(DespawnPointId),
    TrafficLightCreated(TrafficLightId),
    TrafficLightDeleted(TrafficLightId),
    WorldLoaded,
}

/// Handle returned by [`EventBus::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Handler = Box<dyn Fn(&WorldEvent) + Send + Sync>;

#[derive(Default)]
pub struct EventBus {
    handlers: BTreeMap<SubscriptionId, Handler>,
    next_id: u64,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.handlers.len())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, handler: F) -> SubscriptionId
    where
        F: Fn(&WorldEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.handlers.insert(id, Box::new(handler));
        id
    }

    /// Returns false if the subscription was already gone
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.handlers.remove(&id).is_some()
    }

    /// Deliver an event to every subscriber in subscription order
    pub fn emit(&self, event: WorldEvent) {
        for handler in self.handlers.values() {
            handler(&event);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.handlers.len()
    }
}
