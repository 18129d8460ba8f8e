//! Vehicle state
//!
//! A vehicle is either on a road (`distance` along `road`) or crossing an
//! intersection on a transition curve towards `next_road`.

use super::curve::CubicBezier;
use super::types::{DespawnPointId, RoadId, Vec2, VehicleId};

/// Curved path through an intersection between two roads
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub curve: CubicBezier,
    /// Progress along the curve in `[0, 1]`
    pub t: f32,
    /// Distance along the next road at which the curve ends
    pub entry_distance: f32,
}

impl Transition {
    /// Length of the curve still to be driven
    pub fn remaining_length(&self) -> f32 {
        self.curve.length() * (1.0 - self.t).max(0.0)
    }
}

#[derive(Debug, Clone)]
pub struct Vehicle {
    pub id: VehicleId,
    pub road: RoadId,
    pub next_road: Option<RoadId>,
    pub distance: f32,
    pub speed: f32,
    /// Current longitudinal acceleration (jerk-limited)
    pub acceleration: f32,
    pub pos: Vec2,
    pub transition: Option<Transition>,
    pub target_despawn: Option<DespawnPointId>,
    /// Ceiling imposed this tick by collision, light and right-of-way checks
    pub speed_cap: f32,
}

impl Vehicle {
    pub fn new(id: VehicleId, road: RoadId, speed: f32, pos: Vec2) -> Self {
        Self {
            id,
            road,
            next_road: None,
            distance: 0.0,
            speed,
            acceleration: 0.0,
            pos,
            transition: None,
            target_despawn: None,
            speed_cap: f32::INFINITY,
        }
    }

    pub fn in_transition(&self) -> bool {
        self.transition.is_some()
    }

    /// Lower the speed to `ceiling` if needed and remember it for Movement.
    /// Ceilings never compound: the lowest one of the tick wins.
    pub fn limit_speed(&mut self, ceiling: f32) {
        let ceiling = ceiling.max(0.0);
        if self.speed > ceiling {
            self.speed = ceiling;
        }
        self.speed_cap = self.speed_cap.min(ceiling);
    }

    /// Stop immediately
    pub fn halt(&mut self) {
        self.limit_speed(0.0);
        self.acceleration = 0.0;
    }

    pub fn clear_speed_cap(&mut self) {
        self.speed_cap = f32::INFINITY;
    }
}
