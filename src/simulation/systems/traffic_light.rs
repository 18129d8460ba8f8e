use std::collections::BTreeMap;

use super::{stop_line, System};
use crate::simulation::traffic_light::LightState;
use crate::simulation::types::RoadId;
use crate::simulation::world::World;

/// Lights affect vehicles this close to the stop line
pub const STOPPING_DISTANCE: f32 = 30.0;

/// Closer than this to the stop line a red light means a full stop
pub const FULL_STOP_DISTANCE: f32 = 5.0;

/// Advances every light and slows vehicles approaching red or yellow
#[derive(Debug, Default)]
pub struct TrafficLightSystem;

impl TrafficLightSystem {
    pub fn new() -> Self {
        Self
    }

    /// Speed ceiling for a vehicle `distance` units before the stop line
    /// facing a light in `state`, on a road limited to `max_speed`
    pub fn ceiling(state: LightState, distance: f32, max_speed: f32) -> Option<f32> {
        if distance >= STOPPING_DISTANCE {
            return None;
        }
        match state {
            LightState::Red if distance > FULL_STOP_DISTANCE => {
                Some(max_speed * distance / STOPPING_DISTANCE)
            }
            LightState::Red => Some(0.0),
            LightState::Yellow => Some(max_speed * 0.5),
            LightState::Green => None,
        }
    }
}

impl System for TrafficLightSystem {
    fn name(&self) -> &'static str {
        "traffic_light"
    }

    fn update(&mut self, world: &mut World, dt: f32) {
        for light in world.traffic_lights.values_mut() {
            light.update(dt);
        }

        let mut states: BTreeMap<RoadId, LightState> = BTreeMap::new();
        for light in world.traffic_lights.values().filter(|l| !l.can_proceed()) {
            for road in &light.controlled_roads {
                states.insert(*road, light.state);
            }
        }
        if states.is_empty() {
            return;
        }

        for vehicle in &mut world.vehicles {
            if vehicle.next_road.is_none() || vehicle.in_transition() {
                continue;
            }
            let Some(state) = states.get(&vehicle.road) else {
                continue;
            };
            let Some(road) = world.roads.get(&vehicle.road) else {
                continue;
            };

            let to_stop_line = stop_line(road) - vehicle.distance;
            if let Some(cap) = Self::ceiling(*state, to_stop_line, road.max_speed) {
                vehicle.limit_speed(cap);
            }
        }
    }

    fn reset(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn red_ceiling_shrinks_with_distance() {
        assert_eq!(TrafficLightSystem::ceiling(LightState::Red, 40.0, 40.0), None);
        assert_eq!(
            TrafficLightSystem::ceiling(LightState::Red, 15.0, 40.0),
            Some(20.0)
        );
        assert_eq!(TrafficLightSystem::ceiling(LightState::Red, 3.0, 40.0), Some(0.0));
        assert_eq!(TrafficLightSystem::ceiling(LightState::Red, -2.0, 40.0), Some(0.0));
    }

    #[test]
    fn yellow_halves_and_green_passes() {
        assert_eq!(
            TrafficLightSystem::ceiling(LightState::Yellow, 10.0, 40.0),
            Some(20.0)
        );
        assert_eq!(TrafficLightSystem::ceiling(LightState::Green, 1.0, 40.0), None);
    }
}
