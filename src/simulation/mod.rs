//! Road traffic simulation engine
//!
//! The world holds a directed road graph (nodes, roads, one intersection per
//! node) together with the spawn points, despawn points, traffic lights and
//! vehicles living on it. A [`Simulator`] advances it in fixed ticks by
//! running the systems in order:
//!
//! Spawn → Collision → TrafficLight → RightOfWay (optional) → Pathfinding →
//! Movement → Despawn
//!
//! Everything runs headless; rendering and editing tools drive the world
//! through its mutation API and read it through the shared lock.

mod config;
mod curve;
mod events;
mod intersection;
mod persistence;
mod points;
mod right_of_way;
mod rng;
mod road;
mod road_graph;
mod simulator;
mod traffic_light;
mod types;
mod vehicle;
mod world;

pub mod systems;

pub use config::{FeatureFlags, SimConfig};
pub use curve::CubicBezier;
pub use events::{EventBus, SubscriptionId, WorldEvent};
pub use intersection::Intersection;
pub use persistence::{
    DespawnPointData, NodeData, PersistenceError, RoadData, SaveFormat, SpawnPointData,
    TrafficLightData, CURRENT_VERSION,
};
pub use points::{DespawnPoint, SpawnPoint};
pub use right_of_way::{
    IntersectionKind, RightOfWayRule, RoadPriority, HIGH_PRIORITY_SPEED, LOW_PRIORITY_SPEED,
};
pub use rng::SimRng;
pub use road::{Node, Road, RoadCurve, Turn, STRAIGHT_TOLERANCE, U_TURN_THRESHOLD};
pub use road_graph::{RoadEdge, RoadGraph};
pub use simulator::{Simulator, DEFAULT_TICK};
pub use traffic_light::{LightState, TrafficLight};
pub use types::{
    normalize_angle, DespawnPointId, NodeId, RoadId, SimId, SpawnPointId, TrafficLightId, Vec2,
    VehicleId, DEFAULT_ROAD_WIDTH, MIN_LOOP_OFFSET,
};
pub use vehicle::{Transition, Vehicle};
pub use world::{SharedWorld, World, WorldStats};
