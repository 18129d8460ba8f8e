use std::collections::BTreeMap;

use super::System;
use crate::simulation::types::RoadId;
use crate::simulation::world::World;

/// Gaps below this force a full stop
pub const SAFE_DISTANCE: f32 = 15.0;

/// Deceleration (units/s²) used when easing behind a slower leader
pub const EMERGENCY_BRAKE: f32 = 20.0;

/// Gaps below this start easing towards the leader's speed
pub const ANTICIPATION_DISTANCE: f32 = 30.0;

/// Nearest obstruction in front of a vehicle
#[derive(Debug, Clone, Copy)]
struct Obstacle {
    gap: f32,
    speed: f32,
}

impl Obstacle {
    fn nearer(self, other: Option<Obstacle>) -> Obstacle {
        match other {
            Some(o) if o.gap < self.gap => o,
            _ => self,
        }
    }
}

/// Keeps vehicles from running into the vehicle ahead of them
#[derive(Debug, Default)]
pub struct CollisionSystem;

impl CollisionSystem {
    pub fn new() -> Self {
        Self
    }

    /// Target speed behind a leader `gap` units ahead moving at `leader_speed`
    pub fn safe_speed(gap: f32, leader_speed: f32) -> f32 {
        let ratio = gap / ANTICIPATION_DISTANCE;
        if ratio < 0.5 {
            leader_speed * 0.8
        } else {
            leader_speed * (0.8 + ratio * 0.4)
        }
    }

    /// Decelerate-only adjustment towards `target`, at most
    /// `EMERGENCY_BRAKE * dt` per tick
    fn ease_down(speed: f32, target: f32, dt: f32) -> f32 {
        if speed <= target {
            return speed;
        }
        (speed - EMERGENCY_BRAKE * dt).max(target).max(0.0)
    }

    /// Speed ceiling imposed by an obstacle, if any
    fn ceiling(speed: f32, obstacle: Obstacle, dt: f32) -> Option<f32> {
        if obstacle.gap < SAFE_DISTANCE {
            Some(0.0)
        } else if obstacle.gap < ANTICIPATION_DISTANCE {
            let target = Self::safe_speed(obstacle.gap, obstacle.speed);
            Some(Self::ease_down(speed, target, dt))
        } else {
            None
        }
    }
}

/// Nearest vehicle ahead of `distance` on a distance-sorted road. Of two
/// vehicles at the same distance, the one spawned first is ahead.
fn ahead_of(world: &World, on_road: &[usize], index: usize, distance: f32) -> Option<Obstacle> {
    on_road
        .iter()
        .filter(|&&i| i != index)
        .find(|&&i| {
            let d = world.vehicles[i].distance;
            d > distance || (d == distance && i < index)
        })
        .map(|&i| Obstacle {
            gap: world.vehicles[i].distance - distance,
            speed: world.vehicles[i].speed,
        })
}

/// Vehicle closest to the start of a distance-sorted road
fn first_on(world: &World, on_road: Option<&Vec<usize>>) -> Option<(f32, f32)> {
    on_road
        .and_then(|indices| indices.first())
        .map(|&i| (world.vehicles[i].distance, world.vehicles[i].speed))
}

impl System for CollisionSystem {
    fn name(&self) -> &'static str {
        "collision"
    }

    fn update(&mut self, world: &mut World, dt: f32) {
        let by_road: BTreeMap<RoadId, Vec<usize>> = world.vehicles_by_road();
        let mut ceilings: Vec<(usize, f32)> = Vec::new();

        for (index, vehicle) in world.vehicles.iter().enumerate() {
            let on_road = by_road
                .get(&vehicle.road)
                .map(Vec::as_slice)
                .unwrap_or(&[]);

            match vehicle.transition {
                None => {
                    let Some(road) = world.roads.get(&vehicle.road) else {
                        continue;
                    };
                    let ahead = ahead_of(world, on_road, index, vehicle.distance);

                    let on_next = vehicle.next_road.and_then(|next| {
                        first_on(world, by_road.get(&next)).map(|(distance, speed)| Obstacle {
                            gap: (road.length - vehicle.distance) + distance,
                            speed,
                        })
                    });

                    let nearest = match ahead {
                        Some(a) => Some(a.nearer(on_next)),
                        None => on_next,
                    };
                    if let Some(obstacle) = nearest {
                        if let Some(cap) = Self::ceiling(vehicle.speed, obstacle, dt) {
                            ceilings.push((index, cap));
                        }
                    }
                }
                Some(transition) => {
                    // Mid-transition: the next road (measured from where the
                    // curve ends) and the road being left each cap independently
                    if let Some(next) = vehicle.next_road {
                        if let Some(obstacle) =
                            by_road.get(&next).and_then(|indices| {
                                indices
                                    .iter()
                                    .map(|&i| &world.vehicles[i])
                                    .find(|o| o.distance >= transition.entry_distance)
                                    .map(|o| Obstacle {
                                        gap: transition.remaining_length() + o.distance
                                            - transition.entry_distance,
                                        speed: o.speed,
                                    })
                            })
                        {
                            if let Some(cap) = Self::ceiling(vehicle.speed, obstacle, dt) {
                                ceilings.push((index, cap));
                            }
                        }
                    }

                    let ahead = world.roads.get(&vehicle.road).and_then(|road| {
                        let leaving_at = road.length - super::TRANSITION_START_OFFSET
                            + transition.t * transition.curve.length();
                        ahead_of(world, on_road, index, leaving_at)
                    });
                    if let Some(obstacle) = ahead {
                        if let Some(cap) = Self::ceiling(vehicle.speed, obstacle, dt) {
                            ceilings.push((index, cap));
                        }
                    }
                }
            }
        }

        for (index, cap) in ceilings {
            world.vehicles[index].limit_speed(cap);
        }
    }

    fn reset(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_speed_ramps_with_gap() {
        assert!((CollisionSystem::safe_speed(10.0, 20.0) - 16.0).abs() < 1e-5);
        assert!((CollisionSystem::safe_speed(30.0, 20.0) - 24.0).abs() < 1e-5);
    }

    #[test]
    fn easing_never_accelerates() {
        assert_eq!(CollisionSystem::ease_down(10.0, 15.0, 0.1), 10.0);
        assert!((CollisionSystem::ease_down(20.0, 5.0, 0.1) - 18.0).abs() < 1e-5);
        assert_eq!(CollisionSystem::ease_down(20.0, 19.5, 0.1), 19.5);
    }
}
