//! Traffic light state machine

use serde::{Deserialize, Serialize};

use super::types::{NodeId, RoadId, TrafficLightId};

/// Phase timers are compared with this tolerance so that durations which are
/// whole multiples of the tick size switch on the expected tick
const PHASE_EPSILON: f32 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LightState {
    Red,
    Yellow,
    Green,
}

/// A fixed-cycle light guarding some of an intersection's incoming roads
#[derive(Debug, Clone)]
pub struct TrafficLight {
    pub id: TrafficLightId,
    pub intersection: NodeId,
    pub controlled_roads: Vec<RoadId>,
    pub state: LightState,
    /// Last steady state before the current one; decides where Yellow leads
    pub prev_state: LightState,
    pub timer: f32,
    pub green_time: f32,
    pub yellow_time: f32,
    pub red_time: f32,
    pub enabled: bool,
}

impl TrafficLight {
    pub fn new(id: TrafficLightId, intersection: NodeId, start_green: bool) -> Self {
        Self {
            id,
            intersection,
            controlled_roads: Vec::new(),
            state: if start_green {
                LightState::Green
            } else {
                LightState::Red
            },
            prev_state: LightState::Red,
            timer: 0.0,
            green_time: 8.0,
            yellow_time: 2.0,
            red_time: 8.0,
            enabled: true,
        }
    }

    pub fn add_controlled_road(&mut self, road: RoadId) {
        if !self.controls(road) {
            self.controlled_roads.push(road);
        }
    }

    pub fn controls(&self, road: RoadId) -> bool {
        self.controlled_roads.contains(&road)
    }

    /// Advance the cycle by `dt` seconds. Disabled lights are frozen.
    pub fn update(&mut self, dt: f32) {
        if !self.enabled {
            return;
        }

        self.timer += dt;

        let duration = match self.state {
            LightState::Green => self.green_time,
            LightState::Yellow => self.yellow_time,
            LightState::Red => self.red_time,
        };
        if self.timer + PHASE_EPSILON < duration {
            return;
        }

        self.state = match self.state {
            LightState::Green | LightState::Red => {
                self.prev_state = self.state;
                LightState::Yellow
            }
            LightState::Yellow if self.prev_state == LightState::Green => LightState::Red,
            LightState::Yellow => LightState::Green,
        };
        self.timer = 0.0;
    }

    /// Vehicles may pass freely
    pub fn can_proceed(&self) -> bool {
        !self.enabled || self.state == LightState::Green
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::types::SimId;

    fn light(start_green: bool) -> TrafficLight {
        TrafficLight::new(TrafficLightId(SimId(0)), NodeId(SimId(1)), start_green)
    }

    #[test]
    fn red_cycle_goes_through_yellow_to_green() {
        let mut tl = light(false);
        for _ in 0..16 {
            tl.update(0.5);
        }
        assert_eq!(tl.state, LightState::Yellow);
        assert_eq!(tl.prev_state, LightState::Red);
        for _ in 0..4 {
            tl.update(0.5);
        }
        assert_eq!(tl.state, LightState::Green);
    }

    #[test]
    fn disabled_light_is_frozen_and_passable() {
        let mut tl = light(false);
        tl.enabled = false;
        tl.update(100.0);
        assert_eq!(tl.state, LightState::Red);
        assert!(tl.can_proceed());
    }
}
