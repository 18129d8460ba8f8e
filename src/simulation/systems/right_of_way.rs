//! Yielding at intersections without traffic lights
//!
//! For every vehicle closing in on an uncontrolled intersection the system
//! looks for other vehicles whose paths through the same intersection cross
//! its own, then decides who goes first:
//!
//! 1. a turning vehicle yields to one going straight,
//! 2. a lower priority road yields to a higher one,
//! 3. the later arrival yields, if arrivals differ by more than
//!    [`ARRIVAL_MARGIN`],
//! 4. otherwise a vehicle yields to one close by on its right.
//!
//! Vehicles that have been held for more than [`MAX_WAIT_TIME`] are let
//! through slowly so that no configuration can deadlock.

use log::debug;
use std::collections::{BTreeMap, BTreeSet};
use std::f32::consts::PI;

use super::{stop_line, System};
use crate::simulation::right_of_way::RightOfWayRule;
use crate::simulation::road::{Road, Turn};
use crate::simulation::types::{normalize_angle, NodeId, RoadId, VehicleId};
use crate::simulation::vehicle::Vehicle;
use crate::simulation::world::World;

/// Vehicles closer than this to the stop line are approaching
pub const APPROACH_DISTANCE: f32 = 60.0;

/// Inside this distance yielding vehicles slow to at most 40 % of the limit
pub const YIELD_DISTANCE: f32 = 30.0;

/// Inside this distance yielding vehicles stop
pub const STOP_DISTANCE: f32 = 10.0;

/// Arrival times closer than this are a tie
pub const ARRIVAL_MARGIN: f32 = 0.5;

/// Seconds a stopped, yielding vehicle waits before it may creep through
pub const MAX_WAIT_TIME: f32 = 5.0;

/// Approach headings differing by an angle inside this band cross each other
const CONFLICT_BAND: (f32, f32) = (PI / 4.0, 3.0 * PI / 4.0);

/// Vehicles in a transition count as this close to the stop line
const IN_TRANSITION_DISTANCE: f32 = 5.0;

const STOP_DECELERATION: f32 = 15.0;
const YIELD_DECELERATION: f32 = 10.0;
const APPROACH_DECELERATION: f32 = 8.0;
const CREEP_ACCELERATION: f32 = 5.0;
const CREEP_SPEED_RATIO: f32 = 0.3;

/// How a vehicle intends to pass an intersection
#[derive(Debug, Clone, Copy)]
struct Approach {
    index: usize,
    id: VehicleId,
    intersection: NodeId,
    /// Distance to the stop line
    distance: f32,
    /// Heading of the road being left
    heading: f32,
    turning: bool,
    left_turn: bool,
    road: RoadId,
    next_road: RoadId,
    in_transition: bool,
}

impl Approach {
    fn of(index: usize, vehicle: &Vehicle, world: &World) -> Option<Self> {
        let next_id = vehicle.next_road?;
        let road = world.roads.get(&vehicle.road)?;
        let next = world.roads.get(&next_id)?;
        let turn = road.turn_to(next);

        let distance = if vehicle.in_transition() {
            IN_TRANSITION_DISTANCE
        } else {
            stop_line(road) - vehicle.distance
        };

        Some(Self {
            index,
            id: vehicle.id,
            intersection: road.to,
            distance,
            heading: road.heading(),
            turning: turn.is_turning(),
            left_turn: turn == Turn::Left,
            road: vehicle.road,
            next_road: next_id,
            in_transition: vehicle.in_transition(),
        })
    }

    fn is_approaching(&self) -> bool {
        self.distance <= APPROACH_DISTANCE
    }

    /// Whether the two paths through the intersection cross
    fn conflicts_with(&self, other: &Approach) -> bool {
        if self.road == other.road {
            return false;
        }
        if self.next_road == other.next_road {
            return true;
        }

        let diff = normalize_angle(self.heading - other.heading).abs();
        let crossing = diff > CONFLICT_BAND.0 && diff < CONFLICT_BAND.1;
        if !crossing {
            return false;
        }

        let straight = !self.turning;
        let other_straight = !other.turning;
        (self.left_turn && (other_straight || other.left_turn))
            || (straight && other.left_turn)
            || (straight && other_straight)
    }

    /// Whether `other` comes from this vehicle's right-hand side
    fn has_on_right(&self, other: &Approach) -> bool {
        let relative = normalize_angle(other.heading - self.heading);
        relative > CONFLICT_BAND.0 && relative < CONFLICT_BAND.1
    }
}

/// Resolves conflicts at intersections without a traffic light
#[derive(Debug, Default)]
pub struct RightOfWaySystem {
    rules: BTreeMap<NodeId, RightOfWayRule>,
    /// Seconds each vehicle has spent approaching, per intersection
    arrival_times: BTreeMap<NodeId, BTreeMap<VehicleId, f32>>,
    /// Seconds each held vehicle has been waiting
    waiting: BTreeMap<VehicleId, f32>,
}

impl RightOfWaySystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rule(&self, intersection: NodeId) -> Option<&RightOfWayRule> {
        self.rules.get(&intersection)
    }

    pub fn arrival_time(&self, intersection: NodeId, vehicle: VehicleId) -> Option<f32> {
        self.arrival_times.get(&intersection)?.get(&vehicle).copied()
    }

    fn update_rules(&mut self, world: &World) {
        for (id, intersection) in &world.intersections {
            if self.rules.contains_key(id) || world.has_traffic_light(*id) {
                continue;
            }
            let rule = RightOfWayRule::analyze(intersection, &world.roads);
            debug!("Right-of-way rule for {:?}: {:?}", id, rule.kind);
            self.rules.insert(*id, rule);
        }
    }

    fn update_arrival_times(&mut self, approaches: &[Approach], dt: f32) {
        let mut present: BTreeSet<VehicleId> = BTreeSet::new();

        for approach in approaches.iter().filter(|a| a.is_approaching()) {
            present.insert(approach.id);
            self.arrival_times
                .entry(approach.intersection)
                .or_default()
                .entry(approach.id)
                .and_modify(|t| *t += dt)
                .or_insert(0.0);
        }

        for times in self.arrival_times.values_mut() {
            times.retain(|id, _| present.contains(id));
        }
        self.arrival_times.retain(|_, times| !times.is_empty());

        self.waiting.retain(|id, _| present.contains(id));
        for wait in self.waiting.values_mut() {
            *wait += dt;
        }
    }

    /// Whether `me` must give way to anyone it conflicts with
    fn should_yield(&self, me: &Approach, others: &[Approach], rule: &RightOfWayRule) -> bool {
        let times = self.arrival_times.get(&me.intersection);
        let my_time = times.and_then(|t| t.get(&me.id)).copied();

        for other in others {
            if other.id == me.id
                || other.intersection != me.intersection
                || !other.is_approaching()
                || !me.conflicts_with(other)
            {
                continue;
            }

            if me.turning != other.turning {
                if me.turning {
                    return true;
                }
                continue;
            }

            if rule.has_priority(me.road, other.road) {
                continue;
            }
            if rule.has_priority(other.road, me.road) {
                return true;
            }

            let their_time = times.and_then(|t| t.get(&other.id)).copied();
            if let (Some(mine), Some(theirs)) = (my_time, their_time) {
                if theirs - mine > ARRIVAL_MARGIN {
                    return true;
                }
                if mine - theirs > ARRIVAL_MARGIN {
                    continue;
                }
            }

            if me.has_on_right(other) && other.distance < YIELD_DISTANCE {
                return true;
            }
        }

        false
    }

    /// Three-zone slow down ahead of the stop line
    fn yield_ceiling(vehicle: &Vehicle, road: &Road, distance: f32, dt: f32) -> f32 {
        let (target, rate) = if distance < STOP_DISTANCE {
            (0.0, STOP_DECELERATION)
        } else if distance < YIELD_DISTANCE {
            let ratio = (distance - STOP_DISTANCE) / (YIELD_DISTANCE - STOP_DISTANCE);
            (road.max_speed * ratio * 0.4, YIELD_DECELERATION)
        } else {
            let ratio = (distance - YIELD_DISTANCE) / (APPROACH_DISTANCE - YIELD_DISTANCE);
            (road.max_speed * (0.4 + ratio * 0.6), APPROACH_DECELERATION)
        };

        if vehicle.speed > target {
            (vehicle.speed - rate * dt).max(target).max(0.0)
        } else {
            vehicle.speed
        }
    }

    /// Let a vehicle that has waited too long creep into the intersection
    fn creep(vehicle: &mut Vehicle, road: &Road, distance: f32, dt: f32) {
        if distance >= STOP_DISTANCE * 2.0 {
            return;
        }
        let target = (road.max_speed * CREEP_SPEED_RATIO).min(vehicle.speed_cap);
        if vehicle.speed < target {
            vehicle.speed = (vehicle.speed + CREEP_ACCELERATION * dt).min(target);
        }
    }
}

impl System for RightOfWaySystem {
    fn name(&self) -> &'static str {
        "right_of_way"
    }

    fn update(&mut self, world: &mut World, dt: f32) {
        self.update_rules(world);

        let approaches: Vec<Approach> = world
            .vehicles
            .iter()
            .enumerate()
            .filter_map(|(index, vehicle)| Approach::of(index, vehicle, world))
            .collect();
        self.update_arrival_times(&approaches, dt);

        for me in approaches.iter().filter(|a| a.is_approaching()) {
            if me.in_transition || world.has_traffic_light(me.intersection) {
                continue;
            }
            let Some(rule) = self.rules.get(&me.intersection) else {
                continue;
            };
            let Some(road) = world.roads.get(&world.vehicles[me.index].road) else {
                continue;
            };

            if self.waiting.get(&me.id).is_some_and(|w| *w > MAX_WAIT_TIME) {
                Self::creep(&mut world.vehicles[me.index], road, me.distance, dt);
                continue;
            }

            if self.should_yield(me, &approaches, rule) {
                let vehicle = &mut world.vehicles[me.index];
                if vehicle.speed < 1.0 {
                    self.waiting.entry(me.id).or_insert(0.0);
                }
                let ceiling = Self::yield_ceiling(vehicle, road, me.distance, dt);
                vehicle.limit_speed(ceiling);
            }
        }
    }

    fn reset(&mut self) {
        self.rules.clear();
        self.arrival_times.clear();
        self.waiting.clear();
    }
}
