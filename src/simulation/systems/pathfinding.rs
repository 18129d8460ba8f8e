use log::{debug, info};
use std::collections::{BTreeMap, BTreeSet};

use super::{stop_line, System};
use crate::simulation::curve::CubicBezier;
use crate::simulation::points::DespawnPoint;
use crate::simulation::rng::SimRng;
use crate::simulation::road::Road;
use crate::simulation::road_graph::RoadGraph;
use crate::simulation::types::{DespawnPointId, NodeId, RoadId};
use crate::simulation::vehicle::{Transition, Vehicle};
use crate::simulation::world::World;

/// Distance from each end of a transition curve to its inner control point
pub const CURVE_RADIUS: f32 = 7.0;

/// Distance along the next road at which a transition ends
pub const ENTRY_DISTANCE: f32 = 20.0;

/// Routes vehicles towards a despawn point and drives them through
/// intersections on transition curves
#[derive(Debug, Default)]
pub struct PathfindingSystem {
    /// Built on first use, dropped by `reset`
    graph: Option<RoadGraph>,
}

impl PathfindingSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_graph(&self) -> bool {
        self.graph.is_some()
    }

    fn ensure_graph(&mut self, world: &World) -> &RoadGraph {
        self.graph.get_or_insert_with(|| {
            let graph = RoadGraph::build(&world.intersections, &world.roads);
            info!(
                "Built road graph: {} nodes, {} roads",
                graph.node_count(),
                graph.road_count()
            );
            graph
        })
    }

    /// Shortest node path through the cached graph
    pub fn find_shortest_path(
        &mut self,
        world: &World,
        start: NodeId,
        target: NodeId,
    ) -> Option<Vec<NodeId>> {
        self.ensure_graph(world).find_shortest_path(start, target)
    }
}

/// Distance along `road` past which the next road is chosen
fn decision_threshold(road: &Road) -> f32 {
    if road.length < 60.0 {
        road.length * 0.3
    } else {
        road.length * 0.5
    }
}

/// Distance along `road` at which a transition onto it ends
fn entry_distance(road: &Road) -> f32 {
    if road.length < 40.0 {
        road.length * 0.3
    } else {
        ENTRY_DISTANCE
    }
}

fn target_is_valid(target: Option<DespawnPointId>, despawns: &BTreeMap<DespawnPointId, DespawnPoint>) -> bool {
    target
        .and_then(|id| despawns.get(&id))
        .is_some_and(|dp| dp.enabled)
}

/// Draw a random enabled despawn point not located where `road` starts
fn draw_target(
    road: &Road,
    despawns: &BTreeMap<DespawnPointId, DespawnPoint>,
    rng: &mut SimRng,
) -> Option<DespawnPointId> {
    let candidates: Vec<DespawnPointId> = despawns
        .values()
        .filter(|dp| dp.enabled && dp.node != road.from)
        .map(|dp| dp.id)
        .collect();
    rng.choose_random(&candidates).copied()
}

/// Any road out of `road.to` other than the way back
fn random_exit(
    graph: &RoadGraph,
    road: &Road,
    roads: &BTreeMap<RoadId, Road>,
    rng: &mut SimRng,
) -> Option<RoadId> {
    let exits: Vec<RoadId> = graph
        .outgoing(road.to)
        .iter()
        .copied()
        .filter(|id| roads.get(id).is_some_and(|next| !road.is_u_turn_to(next)))
        .collect();
    rng.choose_random(&exits).copied()
}

/// First road of the shortest route from the end of `road` to the despawn
/// road of `target`
fn exit_towards(
    graph: &RoadGraph,
    road: &Road,
    roads: &BTreeMap<RoadId, Road>,
    target: &DespawnPoint,
) -> Option<RoadId> {
    let despawn_road = roads.get(&target.road)?;
    let current = road.to;
    let allowed = |id: &RoadId| roads.get(id).is_some_and(|next| !road.is_u_turn_to(next));

    if current == despawn_road.from {
        return graph
            .outgoing(current)
            .iter()
            .copied()
            .find(|id| *id == despawn_road.id && allowed(id));
    }

    let path = graph.find_shortest_path(current, despawn_road.from)?;
    let hop = *path.get(1)?;
    graph
        .outgoing(current)
        .iter()
        .copied()
        .find(|id| allowed(id) && roads.get(id).is_some_and(|next| next.to == hop))
}

/// Curve from the stop line of `from` to the entry point on `to`
fn transition_curve(from: &Road, to: &Road) -> (CubicBezier, f32) {
    let entry = entry_distance(to);
    let p0 = from.pos_at(stop_line(from));
    let p3 = to.pos_at(entry);
    let p1 = p0 + from.direction() * CURVE_RADIUS;
    let p2 = p3 - to.direction() * CURVE_RADIUS;
    (CubicBezier::new(p0, p1, p2, p3), entry)
}

/// Advance a vehicle along its transition; re-home it on arrival
fn advance_transition(vehicle: &mut Vehicle, roads: &BTreeMap<RoadId, Road>, dt: f32) {
    let Some(mut transition) = vehicle.transition else {
        return;
    };
    let Some(next) = vehicle.next_road.and_then(|id| roads.get(&id)) else {
        // Next road vanished under us: stay on the current road
        vehicle.transition = None;
        vehicle.next_road = None;
        vehicle.halt();
        return;
    };

    let length = transition.curve.length();
    transition.t = if length > f32::EPSILON {
        transition.t + vehicle.speed * dt / length
    } else {
        1.0
    };

    if transition.t < 1.0 {
        vehicle.pos = transition.curve.point_at(transition.t);
        vehicle.transition = Some(transition);
        return;
    }

    debug!("Vehicle {:?} entered road {:?}", vehicle.id, next.id);
    vehicle.road = next.id;
    vehicle.next_road = None;
    vehicle.transition = None;
    vehicle.distance = transition.entry_distance.clamp(0.0, next.length);
    vehicle.speed = vehicle.speed.clamp(0.0, next.max_speed);
    vehicle.pos = next.pos_at(vehicle.distance);
}

impl System for PathfindingSystem {
    fn name(&self) -> &'static str {
        "pathfinding"
    }

    fn update(&mut self, world: &mut World, dt: f32) {
        let graph = self.ensure_graph(world);
        let sinks: BTreeSet<RoadId> = world.despawn_roads();

        let World {
            vehicles,
            roads,
            despawn_points,
            rng,
            ..
        } = world;

        for vehicle in vehicles.iter_mut() {
            if vehicle.in_transition() {
                advance_transition(vehicle, roads, dt);
                continue;
            }
            let Some(road) = roads.get(&vehicle.road) else {
                continue;
            };

            // Vehicles on a despawn road drive to its end and leave
            if !sinks.contains(&road.id) {
                if !target_is_valid(vehicle.target_despawn, despawn_points) {
                    vehicle.target_despawn = draw_target(road, despawn_points, rng);
                }

                if vehicle.next_road.is_none() && vehicle.distance > decision_threshold(road) {
                    let towards = vehicle
                        .target_despawn
                        .and_then(|id| despawn_points.get(&id))
                        .and_then(|target| exit_towards(graph, road, roads, target));
                    vehicle.next_road = towards.or_else(|| random_exit(graph, road, roads, rng));
                    if let Some(next) = vehicle.next_road {
                        debug!("Vehicle {:?} heading for road {:?}", vehicle.id, next);
                    }
                }
            }

            let next = vehicle.next_road.and_then(|id| roads.get(&id));
            match next {
                Some(next) if vehicle.distance >= stop_line(road) && vehicle.speed > 0.0 => {
                    let (curve, entry_distance) = transition_curve(road, next);
                    vehicle.transition = Some(Transition {
                        curve,
                        t: 0.0,
                        entry_distance,
                    });
                    vehicle.pos = curve.point_at(0.0);
                }
                Some(_) => {}
                None => {
                    vehicle.next_road = None;
                    if vehicle.distance >= road.length {
                        vehicle.halt();
                        vehicle.distance = road.length;
                        vehicle.pos = road.pos_at(road.length);
                    }
                }
            }
        }
    }

    fn reset(&mut self) {
        self.graph = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::types::Vec2;

    #[test]
    fn short_roads_decide_and_enter_earlier() {
        let mut world = World::new();
        let a = world.add_node(Vec2::new(0.0, 0.0));
        let b = world.add_node(Vec2::new(30.0, 0.0));
        let c = world.add_node(Vec2::new(130.0, 0.0));
        let short = world.add_road(a, b, 40.0).unwrap();
        let long = world.add_road(b, c, 40.0).unwrap();

        let short = world.road(short).unwrap();
        let long = world.road(long).unwrap();
        assert!((decision_threshold(short) - 9.0).abs() < 1e-4);
        assert!((decision_threshold(long) - 50.0).abs() < 1e-4);
        assert!((entry_distance(short) - 9.0).abs() < 1e-4);
        assert_eq!(entry_distance(long), ENTRY_DISTANCE);
    }

    #[test]
    fn transition_curve_joins_stop_line_and_entry_point() {
        let mut world = World::new();
        let a = world.add_node(Vec2::new(0.0, 0.0));
        let b = world.add_node(Vec2::new(100.0, 0.0));
        let c = world.add_node(Vec2::new(100.0, 100.0));
        let ab = world.add_road(a, b, 40.0).unwrap();
        let bc = world.add_road(b, c, 40.0).unwrap();

        let (curve, entry) =
            transition_curve(world.road(ab).unwrap(), world.road(bc).unwrap());
        assert_eq!(entry, ENTRY_DISTANCE);
        assert!(curve.point_at(0.0).distance(&Vec2::new(88.0, 0.0)) < 1e-3);
        assert!(curve.point_at(1.0).distance(&Vec2::new(100.0, 20.0)) < 1e-3);
    }
}
