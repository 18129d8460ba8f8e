//! Vehicle sources and sinks

use super::types::{DespawnPointId, NodeId, RoadId, SpawnPointId};

/// Periodically creates vehicles at the start of a road leaving `node`
#[derive(Debug, Clone)]
pub struct SpawnPoint {
    pub id: SpawnPointId,
    pub node: NodeId,
    pub road: RoadId,
    /// Mean seconds between spawns
    pub interval: f32,
    pub timer: f32,
    pub min_speed: f32,
    pub max_speed: f32,
    /// Spawning stops while the world holds this many vehicles
    pub max_vehicles: usize,
    pub enabled: bool,
    pub vehicle_counter: u64,
}

impl SpawnPoint {
    pub fn new(id: SpawnPointId, node: NodeId, road: RoadId) -> Self {
        Self {
            id,
            node,
            road,
            interval: 3.0,
            timer: 0.0,
            min_speed: 20.0,
            max_speed: 40.0,
            max_vehicles: 50,
            enabled: true,
            vehicle_counter: 0,
        }
    }
}

/// Marks the road entering `node` as a vehicle sink
#[derive(Debug, Clone)]
pub struct DespawnPoint {
    pub id: DespawnPointId,
    pub node: NodeId,
    pub road: RoadId,
    pub enabled: bool,
}

impl DespawnPoint {
    pub fn new(id: DespawnPointId, node: NodeId, road: RoadId) -> Self {
        Self {
            id,
            node,
            road,
            enabled: true,
        }
    }
}
