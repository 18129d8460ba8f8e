//! Fixed-timestep driver for the system pipeline
//!
//! `update_once` takes wall-clock deltas of any size and drains them in
//! ticks of exactly `tick` seconds, so the outcome does not depend on the
//! caller's frame rate.

use log::info;
use std::sync::{PoisonError, RwLockReadGuard};

use super::config::SimConfig;
use super::events::WorldEvent;
use super::systems::{
    CollisionSystem, DespawnSystem, MovementSystem, PathfindingSystem, RightOfWaySystem,
    SpawnSystem, SystemManager, TrafficLightSystem,
};
use super::world::{SharedWorld, World};

/// Default tick length in seconds
pub const DEFAULT_TICK: f32 = 0.016;

pub struct Simulator {
    world: SharedWorld,
    systems: SystemManager,
    /// Seconds per tick
    tick: f32,
    /// Wall-clock time not yet simulated
    accumulator: f32,
    paused: bool,
    ticks: u64,
}

impl Simulator {
    pub fn new(world: World, tick: f32, config: &SimConfig) -> Self {
        Self::with_shared(world.into_shared(), tick, config)
    }

    /// Build the pipeline in tick order; the right-of-way system is only
    /// included when the feature flag is set
    pub fn with_shared(world: SharedWorld, tick: f32, config: &SimConfig) -> Self {
        let mut systems = SystemManager::new();
        systems.add_system(SpawnSystem::new());
        systems.add_system(CollisionSystem::new());
        systems.add_system(TrafficLightSystem::new());
        if config.feature_flags.right_of_way_system {
            systems.add_system(RightOfWaySystem::new());
        }
        systems.add_system(PathfindingSystem::new());
        systems.add_system(MovementSystem::new());
        systems.add_system(DespawnSystem::new());

        info!("Simulator pipeline: {}", systems.names().join(" -> "));

        Self {
            world,
            systems,
            tick: if tick > 0.0 { tick } else { DEFAULT_TICK },
            accumulator: 0.0,
            paused: false,
            ticks: 0,
        }
    }

    pub fn world(&self) -> SharedWorld {
        self.world.clone()
    }

    /// Read access for renderers and reports
    pub fn read(&self) -> RwLockReadGuard<'_, World> {
        self.world.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn tick(&self) -> f32 {
        self.tick
    }

    pub fn tick_count(&self) -> u64 {
        self.ticks
    }

    pub fn system_names(&self) -> Vec<&'static str> {
        self.systems.names()
    }

    pub fn accumulated(&self) -> f32 {
        self.accumulator
    }

    /// Feed `dt` seconds of wall-clock time; runs as many whole ticks as
    /// fit and keeps the remainder for the next call. Returns the number of
    /// ticks run.
    pub fn update_once(&mut self, dt: f32) -> u32 {
        if self.paused {
            return 0;
        }
        self.accumulator += dt.max(0.0);

        let mut ran = 0;
        while self.accumulator >= self.tick {
            self.step();
            self.accumulator -= self.tick;
            ran += 1;
        }
        ran
    }

    /// Run exactly one tick, paused or not
    pub fn step(&mut self) {
        self.systems.update(&self.world, self.tick);

        let mut world = self.world.write().unwrap_or_else(PoisonError::into_inner);
        world.time += self.tick;
        self.ticks += 1;
    }

    /// Run `ticks` ticks back to back
    pub fn run(&mut self, ticks: u64) {
        for _ in 0..ticks {
            self.step();
        }
    }

    pub fn toggle_pause(&mut self) -> bool {
        self.paused = !self.paused;
        info!("Simulation {}", if self.paused { "paused" } else { "resumed" });
        self.paused
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn reset_systems(&mut self) {
        self.systems.reset_all();
    }

    /// Swap in a whole new world (after a load, say). Event subscribers
    /// carry over to the new world.
    pub fn replace_world(&mut self, mut world: World) {
        {
            let mut current = self.world.write().unwrap_or_else(PoisonError::into_inner);
            std::mem::swap(&mut world.events, &mut current.events);
            *current = world;
            current.events.emit(WorldEvent::WorldLoaded);
        }
        self.reset_systems();
        info!("World replaced");
    }

    /// Mutate the world under the write lock, then drop every cache derived
    /// from the old road graph
    pub fn edit_world<T>(&mut self, edit: impl FnOnce(&mut World) -> T) -> T {
        let result = {
            let mut world = self.world.write().unwrap_or_else(PoisonError::into_inner);
            edit(&mut world)
        };
        self.reset_systems();
        result
    }
}
