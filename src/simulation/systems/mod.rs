//! Per-tick simulation systems
//!
//! Each system owns one concern and mutates the world through the exclusive
//! `&mut World` it is handed. The [`SystemManager`] runs them in order, taking
//! the world's write lock once per system so readers never observe a system
//! half way through its update.

mod collision;
mod despawn;
mod movement;
mod pathfinding;
mod right_of_way;
mod spawn;
mod traffic_light;

pub use collision::{CollisionSystem, ANTICIPATION_DISTANCE, EMERGENCY_BRAKE, SAFE_DISTANCE};
pub use despawn::DespawnSystem;
pub use movement::{
    MovementSystem, JERK_LIMIT, MAX_ACCELERATION, MAX_DECELERATION, MIN_APPROACH_SPEED,
};
pub use pathfinding::{PathfindingSystem, CURVE_RADIUS, ENTRY_DISTANCE};
pub use right_of_way::{
    RightOfWaySystem, APPROACH_DISTANCE, ARRIVAL_MARGIN, MAX_WAIT_TIME, STOP_DISTANCE,
    YIELD_DISTANCE,
};
pub use spawn::SpawnSystem;
pub use traffic_light::{TrafficLightSystem, FULL_STOP_DISTANCE, STOPPING_DISTANCE};

use log::debug;
use std::sync::{PoisonError, RwLock};

use super::road::Road;
use super::world::World;

/// Vehicles leave a road on a transition curve this far before its end,
/// which is also where they stop for lights and yielding
pub const TRANSITION_START_OFFSET: f32 = 12.0;

/// Distance along `road` at which vehicles stop and transitions begin
pub fn stop_line(road: &Road) -> f32 {
    (road.length - TRANSITION_START_OFFSET).max(0.0)
}

/// A unit of per-tick logic
pub trait System: Send {
    fn name(&self) -> &'static str;

    fn update(&mut self, world: &mut World, dt: f32);

    /// Drop any state derived from the world (caches, timers). Called after
    /// the world is replaced or its road graph edited.
    fn reset(&mut self);
}

/// Ordered list of systems run once per tick
#[derive(Default)]
pub struct SystemManager {
    systems: Vec<Box<dyn System>>,
}

impl SystemManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_system<S: System + 'static>(&mut self, system: S) {
        self.systems.push(Box::new(system));
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.systems.iter().map(|s| s.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.systems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    /// Run every system once, each under its own write lock
    pub fn update(&mut self, world: &RwLock<World>, dt: f32) {
        for system in &mut self.systems {
            let mut guard = world.write().unwrap_or_else(PoisonError::into_inner);
            system.update(&mut guard, dt);
        }
    }

    pub fn reset_all(&mut self) {
        for system in &mut self.systems {
            debug!("Resetting {}", system.name());
            system.reset();
        }
    }
}
