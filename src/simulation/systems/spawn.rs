use log::debug;

use super::System;
use crate::simulation::types::SpawnPointId;
use crate::simulation::world::World;

/// Creates vehicles at enabled spawn points
#[derive(Debug, Default)]
pub struct SpawnSystem;

impl SpawnSystem {
    pub fn new() -> Self {
        Self
    }
}

impl System for SpawnSystem {
    fn name(&self) -> &'static str {
        "spawn"
    }

    fn update(&mut self, world: &mut World, dt: f32) {
        let ids: Vec<SpawnPointId> = world.spawn_points.keys().copied().collect();

        for id in ids {
            // Random jitter keeps neighbouring spawn points out of step
            let jitter = 0.5 + world.rng.unit();
            let vehicle_count = world.vehicles.len();

            let Some(sp) = world.spawn_points.get_mut(&id) else {
                continue;
            };
            if !sp.enabled || vehicle_count >= sp.max_vehicles {
                continue;
            }
            sp.timer += dt;
            if sp.timer < sp.interval * jitter {
                continue;
            }

            let Some(road_max) = world.roads.get(&sp.road).map(|r| r.max_speed) else {
                continue;
            };
            sp.timer = 0.0;
            let (road, min_speed, max_speed) = (sp.road, sp.min_speed, sp.max_speed);
            sp.vehicle_counter += 1;
            let serial = sp.vehicle_counter;

            let speed = world
                .rng
                .random_range(min_speed..max_speed)
                .min(road_max);
            if let Some(vehicle) = world.push_vehicle(road, 0.0, speed) {
                world.stats.vehicles_spawned += 1;
                debug!(
                    "Spawn point {:?} released vehicle {:?} (#{}) at {:.1}",
                    id, vehicle, serial, speed
                );
            }
        }
    }

    fn reset(&mut self) {}
}
