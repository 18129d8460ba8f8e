use std::collections::{BTreeMap, BTreeSet};

use super::System;
use crate::simulation::intersection::Intersection;
use crate::simulation::road::Road;
use crate::simulation::types::{NodeId, RoadId};
use crate::simulation::vehicle::Vehicle;
use crate::simulation::world::World;

/// Lowest target speed while approaching a dead end
pub const MIN_APPROACH_SPEED: f32 = 5.0;

/// Units/s² when speeding up
pub const MAX_ACCELERATION: f32 = 8.0;

/// Units/s² when slowing down
pub const MAX_DECELERATION: f32 = 12.0;

/// Largest change of acceleration per second
pub const JERK_LIMIT: f32 = 30.0;

/// Dead-end approach window as a fraction of the road length
const APPROACH_WINDOW_RATIO: f32 = 0.4;
const MIN_APPROACH_WINDOW: f32 = 20.0;

/// Integrates speed and distance for every vehicle on a road
#[derive(Debug, Default)]
pub struct MovementSystem;

fn smoothstep(x: f32) -> f32 {
    let x = x.clamp(0.0, 1.0);
    x * x * (3.0 - 2.0 * x)
}

impl MovementSystem {
    pub fn new() -> Self {
        Self
    }

    /// Target speed `remaining` units before a dead end on `road`
    pub fn approach_speed(road: &Road, remaining: f32) -> f32 {
        if remaining <= 0.0 {
            return 0.0;
        }
        let window = (road.length * APPROACH_WINDOW_RATIO)
            .max(MIN_APPROACH_WINDOW)
            .min(road.length);
        if remaining >= window {
            return road.max_speed;
        }
        let floor = MIN_APPROACH_SPEED.min(road.max_speed);
        floor + (road.max_speed - floor) * smoothstep(remaining / window)
    }

    /// Acceleration and speed after one tick of chasing `target` from
    /// `speed`, starting at `acceleration`
    pub fn chase(speed: f32, acceleration: f32, target: f32, dt: f32) -> (f32, f32) {
        let desired = ((target - speed) / dt).clamp(-MAX_DECELERATION, MAX_ACCELERATION);
        let max_change = JERK_LIMIT * dt;
        let mut acceleration = acceleration + (desired - acceleration).clamp(-max_change, max_change);

        let mut new_speed = speed + acceleration * dt;
        let overshoot = (acceleration > 0.0 && new_speed > target)
            || (acceleration < 0.0 && new_speed < target);
        if overshoot {
            new_speed = target;
            acceleration = 0.0;
        }
        (acceleration, new_speed)
    }
}

/// Whether a vehicle on `road` can leave it at the far end
fn has_exit(
    vehicle: &Vehicle,
    road: &Road,
    roads: &BTreeMap<RoadId, Road>,
    intersections: &BTreeMap<NodeId, Intersection>,
) -> bool {
    if vehicle.next_road.is_some() {
        return true;
    }
    intersections.get(&road.to).is_some_and(|intersection| {
        intersection
            .outgoing
            .iter()
            .filter_map(|id| roads.get(id))
            .any(|next| !road.is_u_turn_to(next))
    })
}

impl System for MovementSystem {
    fn name(&self) -> &'static str {
        "movement"
    }

    fn update(&mut self, world: &mut World, dt: f32) {
        if dt <= 0.0 {
            return;
        }
        let sinks: BTreeSet<RoadId> = world.despawn_roads();

        for vehicle in &mut world.vehicles {
            if vehicle.in_transition() {
                // The curve is driven by Pathfinding; only the speed lives here
                let limit = world
                    .roads
                    .get(&vehicle.next_road.unwrap_or(vehicle.road))
                    .map_or(0.0, |road| road.max_speed);
                let target = limit.min(vehicle.speed_cap).max(0.0);
                let (acceleration, speed) =
                    Self::chase(vehicle.speed, vehicle.acceleration, target, dt);
                vehicle.acceleration = acceleration;
                vehicle.speed = speed.clamp(0.0, target);
                vehicle.clear_speed_cap();
                continue;
            }
            let Some(road) = world.roads.get(&vehicle.road) else {
                continue;
            };

            let remaining = road.length - vehicle.distance;
            let target = if sinks.contains(&road.id)
                || has_exit(vehicle, road, &world.roads, &world.intersections)
            {
                road.max_speed
            } else {
                Self::approach_speed(road, remaining)
            };
            let target = target.min(vehicle.speed_cap).max(0.0);

            let (acceleration, speed) = Self::chase(vehicle.speed, vehicle.acceleration, target, dt);
            vehicle.acceleration = acceleration;
            vehicle.speed = speed.clamp(0.0, road.max_speed).min(vehicle.speed_cap);

            vehicle.distance = (vehicle.distance + vehicle.speed * dt).clamp(0.0, road.length);
            vehicle.pos = road.pos_at(vehicle.distance);
            vehicle.clear_speed_cap();
        }
    }

    fn reset(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smoothstep_is_flat_at_both_ends() {
        assert_eq!(smoothstep(0.0), 0.0);
        assert_eq!(smoothstep(1.0), 1.0);
        assert!((smoothstep(0.5) - 0.5).abs() < 1e-6);
        assert_eq!(smoothstep(2.0), 1.0);
    }

    #[test]
    fn acceleration_ramps_up_under_the_jerk_limit() {
        let (accel, speed) = MovementSystem::chase(20.0, 0.0, 40.0, 0.1);
        assert!((accel - 3.0).abs() < 1e-5);
        assert!((speed - 20.3).abs() < 1e-4);

        let (accel, speed) = MovementSystem::chase(speed, accel, 40.0, 0.1);
        assert!((accel - 6.0).abs() < 1e-5);
        assert!((speed - 20.9).abs() < 1e-4);
    }

    #[test]
    fn chase_never_overshoots() {
        let (accel, speed) = MovementSystem::chase(39.9, 8.0, 40.0, 0.1);
        assert_eq!(speed, 40.0);
        assert_eq!(accel, 0.0);

        let (_, speed) = MovementSystem::chase(0.5, -12.0, 0.0, 0.1);
        assert_eq!(speed, 0.0);
    }
}
