use log::debug;
use std::collections::BTreeSet;

use super::System;
use crate::simulation::types::RoadId;
use crate::simulation::world::World;

/// Removes vehicles that reached the end of a road with an enabled despawn
/// point
#[derive(Debug, Default)]
pub struct DespawnSystem;

impl DespawnSystem {
    pub fn new() -> Self {
        Self
    }
}

impl System for DespawnSystem {
    fn name(&self) -> &'static str {
        "despawn"
    }

    fn update(&mut self, world: &mut World, _dt: f32) {
        let sinks: BTreeSet<RoadId> = world.despawn_roads();
        if sinks.is_empty() {
            return;
        }

        let roads = &world.roads;
        let before = world.vehicles.len();
        world.vehicles.retain(|vehicle| {
            let done = !vehicle.in_transition()
                && sinks.contains(&vehicle.road)
                && roads
                    .get(&vehicle.road)
                    .is_some_and(|road| vehicle.distance >= road.length);
            if done {
                debug!("Vehicle {:?} despawned on road {:?}", vehicle.id, vehicle.road);
            }
            !done
        });

        let removed = before - world.vehicles.len();
        world.stats.vehicles_despawned += removed as u64;
    }

    fn reset(&mut self) {}
}
