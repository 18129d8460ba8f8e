//! Main simulation world that ties everything together
//!
//! The world owns every node, road, point, light and vehicle. Entities refer
//! to each other by id only; every mutation below keeps the intersection
//! index and the cross references consistent.

use anyhow::{bail, Context, Result};
use log::{debug, warn};
use ordered_float::OrderedFloat;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, RwLock};

use super::events::{EventBus, WorldEvent};
use super::intersection::Intersection;
use super::points::{DespawnPoint, SpawnPoint};
use super::rng::SimRng;
use super::road::{Node, Road, RoadCurve};
use super::traffic_light::TrafficLight;
use super::types::{
    DespawnPointId, NodeId, RoadId, SimId, SpawnPointId, TrafficLightId, Vec2, VehicleId,
    MIN_LOOP_OFFSET,
};
use super::vehicle::Vehicle;

/// The world as shared between the simulator and its readers
pub type SharedWorld = Arc<RwLock<World>>;

/// Control points of a tangent-fitted curve sit this fraction of the road
/// length away from the endpoints, scaled by how sharply the road bends
const CURVE_BASE_MULTIPLIER: f32 = 0.8;
const CURVE_MIN_CONTROL_DISTANCE: f32 = 60.0;
const CURVE_MAX_CONTROL_DISTANCE: f32 = 800.0;

/// Running totals kept across ticks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorldStats {
    pub vehicles_spawned: u64,
    pub vehicles_despawned: u64,
}

/// The main simulation world
#[derive(Debug)]
pub struct World {
    pub nodes: BTreeMap<NodeId, Node>,
    pub roads: BTreeMap<RoadId, Road>,

    /// One intersection per node, keyed by the node's id
    pub intersections: BTreeMap<NodeId, Intersection>,

    /// All vehicles, in spawn order
    pub vehicles: Vec<Vehicle>,

    pub spawn_points: BTreeMap<SpawnPointId, SpawnPoint>,
    pub despawn_points: BTreeMap<DespawnPointId, DespawnPoint>,
    pub traffic_lights: BTreeMap<TrafficLightId, TrafficLight>,

    /// Random source for spawn timing, speeds and route choices
    pub rng: SimRng,

    pub events: EventBus,

    /// Simulated seconds
    pub time: f32,

    pub stats: WorldStats,

    /// Next ID to assign
    next_id: usize,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    pub fn with_rng(rng: SimRng) -> Self {
        Self {
            nodes: BTreeMap::new(),
            roads: BTreeMap::new(),
            intersections: BTreeMap::new(),
            vehicles: Vec::new(),
            spawn_points: BTreeMap::new(),
            despawn_points: BTreeMap::new(),
            traffic_lights: BTreeMap::new(),
            rng,
            events: EventBus::new(),
            time: 0.0,
            stats: WorldStats::default(),
            next_id: 0,
        }
    }

    pub fn new() -> Self {
        Self::with_rng(SimRng::new())
    }

    /// Create a new World with a seeded RNG for reproducible simulations
    pub fn new_with_seed(seed: u64) -> Self {
        Self::with_rng(SimRng::seeded(seed))
    }

    pub fn into_shared(self) -> SharedWorld {
        Arc::new(RwLock::new(self))
    }

    pub(crate) fn next_sim_id(&mut self) -> SimId {
        let id = SimId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Make sure freshly allocated ids never collide with `id`
    pub(crate) fn reserve_id(&mut self, id: SimId) {
        self.next_id = self.next_id.max(id.0 + 1);
    }

    // ------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn road(&self, id: RoadId) -> Option<&Road> {
        self.roads.get(&id)
    }

    pub fn intersection(&self, id: NodeId) -> Option<&Intersection> {
        self.intersections.get(&id)
    }

    pub fn vehicle(&self, id: VehicleId) -> Option<&Vehicle> {
        self.vehicles.iter().find(|v| v.id == id)
    }

    pub fn vehicle_mut(&mut self, id: VehicleId) -> Option<&mut Vehicle> {
        self.vehicles.iter_mut().find(|v| v.id == id)
    }

    /// Find the road running from `from` to `to`
    pub fn find_road_between(&self, from: NodeId, to: NodeId) -> Option<RoadId> {
        self.intersections
            .get(&from)?
            .outgoing
            .iter()
            .copied()
            .find(|id| self.roads.get(id).is_some_and(|r| r.to == to))
    }

    pub fn has_traffic_light(&self, node: NodeId) -> bool {
        self.traffic_lights.values().any(|l| l.intersection == node)
    }

    /// Roads carrying at least one enabled despawn point
    pub fn despawn_roads(&self) -> BTreeSet<RoadId> {
        self.despawn_points
            .values()
            .filter(|dp| dp.enabled)
            .map(|dp| dp.road)
            .collect()
    }

    /// Indices into `vehicles` of every vehicle on a road (transitions
    /// excluded), ordered by distance along the road
    pub fn vehicles_by_road(&self) -> BTreeMap<RoadId, Vec<usize>> {
        let mut by_road: BTreeMap<RoadId, Vec<usize>> = BTreeMap::new();
        for (index, vehicle) in self.vehicles.iter().enumerate() {
            if !vehicle.in_transition() {
                by_road.entry(vehicle.road).or_default().push(index);
            }
        }
        for indices in by_road.values_mut() {
            indices.sort_by_key(|&i| OrderedFloat(self.vehicles[i].distance));
        }
        by_road
    }

    // ------------------------------------------------------------------
    // Nodes
    // ------------------------------------------------------------------

    /// Add a node (and its intersection) to the world
    pub fn add_node(&mut self, pos: Vec2) -> NodeId {
        let id = NodeId(self.next_sim_id());
        self.insert_node(Node::new(id, pos));
        self.events.emit(WorldEvent::NodeCreated(id));
        id
    }

    pub(crate) fn insert_node(&mut self, node: Node) {
        self.reserve_id(node.id.0);
        self.intersections
            .insert(node.id, Intersection::new(node.id));
        self.nodes.insert(node.id, node);
    }

    /// Move a node, refreshing the geometry of every road touching it and
    /// the position of every vehicle on those roads
    pub fn move_node(&mut self, id: NodeId, pos: Vec2) -> Result<()> {
        self.nodes.get_mut(&id).context("Node not found")?.pos = pos;

        let touched: Vec<RoadId> = self
            .roads
            .values()
            .filter(|r| r.from == id || r.to == id)
            .map(|r| r.id)
            .collect();
        for road_id in &touched {
            self.refresh_road_geometry(*road_id)?;
        }

        for vehicle in &mut self.vehicles {
            if vehicle.in_transition() || !touched.contains(&vehicle.road) {
                continue;
            }
            if let Some(road) = self.roads.get(&vehicle.road) {
                vehicle.distance = vehicle.distance.clamp(0.0, road.length);
                vehicle.pos = road.pos_at(vehicle.distance);
            }
        }

        self.events.emit(WorldEvent::NodeMoved(id));
        Ok(())
    }

    /// Remove a node together with every road, point and light attached to it
    pub fn remove_node(&mut self, id: NodeId) -> Result<()> {
        if !self.nodes.contains_key(&id) {
            bail!("Node {:?} not found", id);
        }

        let roads: Vec<RoadId> = self
            .roads
            .values()
            .filter(|r| r.from == id || r.to == id)
            .map(|r| r.id)
            .collect();
        for road_id in roads {
            self.remove_road(road_id)?;
        }

        let spawns: Vec<SpawnPointId> = self
            .spawn_points
            .values()
            .filter(|sp| sp.node == id)
            .map(|sp| sp.id)
            .collect();
        for sp in spawns {
            self.remove_spawn_point(sp)?;
        }

        let despawns: Vec<DespawnPointId> = self
            .despawn_points
            .values()
            .filter(|dp| dp.node == id)
            .map(|dp| dp.id)
            .collect();
        for dp in despawns {
            self.remove_despawn_point(dp)?;
        }

        let lights: Vec<TrafficLightId> = self
            .traffic_lights
            .values()
            .filter(|l| l.intersection == id)
            .map(|l| l.id)
            .collect();
        for light in lights {
            self.remove_traffic_light(light)?;
        }

        self.intersections.remove(&id);
        self.nodes.remove(&id);
        self.events.emit(WorldEvent::NodeDeleted(id));
        Ok(())
    }

    // ------------------------------------------------------------------
    // Roads
    // ------------------------------------------------------------------

    /// Add a one-way road. Loops get default opposing anchor offsets.
    pub fn add_road(&mut self, from: NodeId, to: NodeId, max_speed: f32) -> Result<RoadId> {
        self.add_road_with_offsets(from, to, max_speed, Vec2::ZERO, Vec2::ZERO)
    }

    /// Add a one-way road with explicit anchor offsets. Zero offsets on a
    /// loop are replaced by the default loop offsets.
    pub fn add_road_with_offsets(
        &mut self,
        from: NodeId,
        to: NodeId,
        max_speed: f32,
        start_offset: Vec2,
        end_offset: Vec2,
    ) -> Result<RoadId> {
        let from_node = *self.nodes.get(&from).context("Start node not found")?;
        let to_node = *self.nodes.get(&to).context("End node not found")?;
        if max_speed <= 0.0 {
            bail!("Road speed limit must be positive, got {max_speed}");
        }

        let id = RoadId(self.next_sim_id());
        let mut road = Road::new(id, &from_node, &to_node, max_speed);

        if start_offset != Vec2::ZERO || end_offset != Vec2::ZERO {
            road.start_offset = start_offset;
            road.end_offset = end_offset;
        } else if from == to {
            let offset = (road.width * 0.75).max(MIN_LOOP_OFFSET);
            road.start_offset = Vec2::new(offset, 0.0);
            road.end_offset = Vec2::new(-offset, 0.0);
        }
        road.update_geometry(from_node.pos, to_node.pos);

        self.insert_road(road);
        self.events.emit(WorldEvent::RoadCreated(id));
        debug!("Added road {:?} from {:?} to {:?}", id, from, to);
        Ok(id)
    }

    /// Add a road in each direction between two nodes
    pub fn add_two_way_road(
        &mut self,
        a: NodeId,
        b: NodeId,
        max_speed: f32,
    ) -> Result<(RoadId, RoadId)> {
        let forward = self.add_road(a, b, max_speed)?;
        let backward = self.add_road(b, a, max_speed)?;
        Ok((forward, backward))
    }

    /// Store a fully built road, link it with an existing opposite road and
    /// register it with both endpoint intersections
    pub(crate) fn insert_road(&mut self, mut road: Road) {
        self.reserve_id(road.id.0);

        if road.from != road.to {
            let reverse = self
                .roads
                .values()
                .find(|r| r.from == road.to && r.to == road.from && r.reverse_road.is_none())
                .map(|r| r.id);
            if let Some(reverse) = reverse {
                road.reverse_road = Some(reverse);
                if let Some(r) = self.roads.get_mut(&reverse) {
                    r.reverse_road = Some(road.id);
                }
            }
        }

        self.intersections
            .entry(road.from)
            .or_insert_with(|| Intersection::new(road.from))
            .add_outgoing(road.id);
        self.intersections
            .entry(road.to)
            .or_insert_with(|| Intersection::new(road.to))
            .add_incoming(road.id);
        self.roads.insert(road.id, road);
    }

    /// Recompute a road's cached anchors and length from its nodes
    pub(crate) fn refresh_road_geometry(&mut self, id: RoadId) -> Result<()> {
        let road = self.roads.get(&id).context("Road not found")?;
        let from = self.nodes.get(&road.from).context("Start node not found")?.pos;
        let to = self.nodes.get(&road.to).context("End node not found")?.pos;
        if let Some(road) = self.roads.get_mut(&id) {
            road.update_geometry(from, to);
        }
        Ok(())
    }

    /// Remove a road. Vehicles on it (or already turning onto it) are
    /// removed, spawn and despawn points on it are deleted, and lights stop
    /// controlling it.
    pub fn remove_road(&mut self, id: RoadId) -> Result<()> {
        let road = self.roads.remove(&id).context("Road not found")?;

        if let Some(intersection) = self.intersections.get_mut(&road.from) {
            intersection.remove_road(id);
        }
        if let Some(intersection) = self.intersections.get_mut(&road.to) {
            intersection.remove_road(id);
        }
        if let Some(reverse) = road.reverse_road.and_then(|r| self.roads.get_mut(&r)) {
            reverse.reverse_road = None;
        }

        let before = self.vehicles.len();
        self.vehicles
            .retain(|v| v.road != id && !(v.in_transition() && v.next_road == Some(id)));
        let dropped = before - self.vehicles.len();
        for vehicle in &mut self.vehicles {
            if vehicle.next_road == Some(id) {
                vehicle.next_road = None;
            }
        }

        let spawns: Vec<SpawnPointId> = self
            .spawn_points
            .values()
            .filter(|sp| sp.road == id)
            .map(|sp| sp.id)
            .collect();
        for sp in spawns {
            self.remove_spawn_point(sp)?;
        }

        let despawns: Vec<DespawnPointId> = self
            .despawn_points
            .values()
            .filter(|dp| dp.road == id)
            .map(|dp| dp.id)
            .collect();
        for dp in despawns {
            self.remove_despawn_point(dp)?;
        }

        for light in self.traffic_lights.values_mut() {
            light.controlled_roads.retain(|r| *r != id);
        }

        if dropped > 0 {
            warn!("Removed {} vehicles with road {:?}", dropped, id);
        }
        self.events.emit(WorldEvent::RoadDeleted(id));
        Ok(())
    }

    /// Insert a new node at `pos` into a road (and its reverse, if any).
    /// Vehicles, points and light references move onto the matching half.
    /// Returns the new node and the two halves of the original road.
    pub fn split_road(&mut self, id: RoadId, pos: Vec2) -> Result<(NodeId, RoadId, RoadId)> {
        let road = self.roads.get(&id).context("Road not found")?.clone();
        if road.is_loop() {
            bail!("Cannot split loop road {:?}", id);
        }
        let reverse = road.reverse_road.and_then(|r| self.roads.get(&r).cloned());

        let node = self.add_node(pos);

        let (first, second) = self.replace_with_halves(&road, node)?;
        if let Some(reverse) = reverse {
            self.replace_with_halves(&reverse, node)?;
        }

        Ok((node, first, second))
    }

    /// Swap `road` for two roads meeting at `node`, moving every reference
    fn replace_with_halves(&mut self, road: &Road, node: NodeId) -> Result<(RoadId, RoadId)> {
        self.roads.remove(&road.id);
        if let Some(i) = self.intersections.get_mut(&road.from) {
            i.remove_road(road.id);
        }
        if let Some(i) = self.intersections.get_mut(&road.to) {
            i.remove_road(road.id);
        }
        if let Some(reverse) = road.reverse_road.and_then(|r| self.roads.get_mut(&r)) {
            reverse.reverse_road = None;
        }

        let from = *self.nodes.get(&road.from).context("Start node not found")?;
        let mid = *self.nodes.get(&node).context("Split node not found")?;
        let to = *self.nodes.get(&road.to).context("End node not found")?;

        let mut first = Road::new(RoadId(self.next_sim_id()), &from, &mid, road.max_speed);
        first.width = road.width;
        first.start_offset = road.start_offset;
        first.update_geometry(from.pos, mid.pos);

        let mut second = Road::new(RoadId(self.next_sim_id()), &mid, &to, road.max_speed);
        second.width = road.width;
        second.end_offset = road.end_offset;
        second.update_geometry(mid.pos, to.pos);

        let (first_id, second_id) = (first.id, second.id);
        let first_length = first.length;
        self.insert_road(first);
        self.insert_road(second);

        for vehicle in &mut self.vehicles {
            if vehicle.next_road == Some(road.id) {
                vehicle.next_road = Some(first_id);
            }
            if vehicle.road != road.id {
                continue;
            }
            if vehicle.in_transition() || vehicle.distance > first_length {
                // Already past the new node: the exit chosen at the far end still holds
                vehicle.road = second_id;
                vehicle.distance = (vehicle.distance - first_length).max(0.0);
            } else {
                // The next node is now the split node, so the exit must be chosen again
                vehicle.road = first_id;
                vehicle.next_road = None;
            }
            if let Some(r) = self.roads.get(&vehicle.road) {
                if !vehicle.in_transition() {
                    vehicle.distance = vehicle.distance.min(r.length);
                    vehicle.pos = r.pos_at(vehicle.distance);
                }
            }
        }
        for sp in self.spawn_points.values_mut() {
            if sp.road == road.id {
                sp.road = first_id;
            }
        }
        for dp in self.despawn_points.values_mut() {
            if dp.road == road.id {
                dp.road = second_id;
            }
        }
        for light in self.traffic_lights.values_mut() {
            for controlled in &mut light.controlled_roads {
                if *controlled == road.id {
                    *controlled = second_id;
                }
            }
        }

        self.events.emit(WorldEvent::RoadDeleted(road.id));
        self.events.emit(WorldEvent::RoadCreated(first_id));
        self.events.emit(WorldEvent::RoadCreated(second_id));
        Ok((first_id, second_id))
    }

    /// Change a road's speed limit and/or width; non-positive values are ignored
    pub fn set_road_properties(&mut self, id: RoadId, max_speed: f32, width: f32) -> Result<()> {
        let road = self.roads.get_mut(&id).context("Road not found")?;
        if max_speed > 0.0 {
            road.max_speed = max_speed;
        }
        if width > 0.0 {
            road.width = width;
        }
        self.events.emit(WorldEvent::RoadChanged(id));
        Ok(())
    }

    /// Bend a road so that it leaves along `incoming`'s direction of travel
    /// and arrives along `outgoing`'s. Either neighbour may be omitted, in
    /// which case the road's own direction is used at that end. The reverse
    /// road receives the mirrored curve, shifted half a road width aside.
    pub fn set_road_curve(
        &mut self,
        id: RoadId,
        incoming: Option<RoadId>,
        outgoing: Option<RoadId>,
    ) -> Result<()> {
        let road = self.roads.get(&id).context("Road not found")?;
        let from = self.nodes.get(&road.from).context("Start node not found")?.pos;
        let to = self.nodes.get(&road.to).context("End node not found")?.pos;
        let own_direction = from.direction_to(&to);

        let from_tangent = match incoming {
            Some(r) => self.arrival_direction(r, road.from)?,
            None => own_direction,
        };
        let to_tangent = match outgoing {
            Some(r) => self.departure_direction(r, road.to)?,
            None => own_direction,
        };

        let dot = (from_tangent.x * to_tangent.x + from_tangent.y * to_tangent.y).clamp(-1.0, 1.0);
        let angle_factor = 0.25 + 0.75 * (dot.acos() / std::f32::consts::PI);
        let control_distance = (road.length * CURVE_BASE_MULTIPLIER * angle_factor)
            .clamp(CURVE_MIN_CONTROL_DISTANCE, CURVE_MAX_CONTROL_DISTANCE);

        let curve = RoadCurve {
            control_p1: from + from_tangent * control_distance,
            control_p2: to - to_tangent * control_distance,
        };

        let width = road.width;
        let reverse = road.reverse_road;
        self.apply_curve(id, Some(curve))?;

        if let Some(reverse) = reverse {
            let shift = Vec2::new(-own_direction.y, own_direction.x) * (width * 0.5);
            let mirrored = RoadCurve {
                control_p1: curve.control_p2 + shift,
                control_p2: curve.control_p1 + shift,
            };
            self.apply_curve(reverse, Some(mirrored))?;
        }
        Ok(())
    }

    /// Straighten a road (and its reverse)
    pub fn clear_road_curve(&mut self, id: RoadId) -> Result<()> {
        let reverse = self.roads.get(&id).context("Road not found")?.reverse_road;
        self.apply_curve(id, None)?;
        if let Some(reverse) = reverse {
            self.apply_curve(reverse, None)?;
        }
        Ok(())
    }

    pub(crate) fn apply_curve(&mut self, id: RoadId, curve: Option<RoadCurve>) -> Result<()> {
        self.roads.get_mut(&id).context("Road not found")?.curve = curve;
        self.refresh_road_geometry(id)?;
        self.events.emit(WorldEvent::RoadChanged(id));
        Ok(())
    }

    /// Direction of travel of `road` where it meets `node`, as if arriving
    fn arrival_direction(&self, road: RoadId, node: NodeId) -> Result<Vec2> {
        let r = self.roads.get(&road).context("Neighbour road not found")?;
        let from = self.nodes.get(&r.from).context("Start node not found")?.pos;
        let to = self.nodes.get(&r.to).context("End node not found")?.pos;
        Ok(if r.to == node {
            from.direction_to(&to)
        } else {
            to.direction_to(&from)
        })
    }

    /// Direction of travel of `road` where it meets `node`, as if leaving
    fn departure_direction(&self, road: RoadId, node: NodeId) -> Result<Vec2> {
        let r = self.roads.get(&road).context("Neighbour road not found")?;
        let from = self.nodes.get(&r.from).context("Start node not found")?.pos;
        let to = self.nodes.get(&r.to).context("End node not found")?.pos;
        Ok(if r.from == node {
            from.direction_to(&to)
        } else {
            to.direction_to(&from)
        })
    }

    // ------------------------------------------------------------------
    // Spawn and despawn points
    // ------------------------------------------------------------------

    /// Add a spawn point generating vehicles on `road`, which must leave `node`
    pub fn add_spawn_point(&mut self, node: NodeId, road: RoadId) -> Result<SpawnPointId> {
        let r = self.roads.get(&road).context("Spawn road not found")?;
        if r.from != node {
            bail!("Spawn road {:?} does not leave node {:?}", road, node);
        }
        let id = SpawnPointId(self.next_sim_id());
        self.spawn_points
            .insert(id, SpawnPoint::new(id, node, road));
        self.events.emit(WorldEvent::SpawnPointCreated(id));
        Ok(id)
    }

    pub fn remove_spawn_point(&mut self, id: SpawnPointId) -> Result<()> {
        self.spawn_points
            .remove(&id)
            .context("Spawn point not found")?;
        self.events.emit(WorldEvent::SpawnPointDeleted(id));
        Ok(())
    }

    /// Add a despawn point on `road`, which must enter `node`
    pub fn add_despawn_point(&mut self, node: NodeId, road: RoadId) -> Result<DespawnPointId> {
        let r = self.roads.get(&road).context("Despawn road not found")?;
        if r.to != node {
            bail!("Despawn road {:?} does not enter node {:?}", road, node);
        }
        let id = DespawnPointId(self.next_sim_id());
        self.despawn_points
            .insert(id, DespawnPoint::new(id, node, road));
        self.events.emit(WorldEvent::DespawnPointCreated(id));
        Ok(id)
    }

    pub fn remove_despawn_point(&mut self, id: DespawnPointId) -> Result<()> {
        self.despawn_points
            .remove(&id)
            .context("Despawn point not found")?;
        for vehicle in &mut self.vehicles {
            if vehicle.target_despawn == Some(id) {
                vehicle.target_despawn = None;
            }
        }
        self.events.emit(WorldEvent::DespawnPointDeleted(id));
        Ok(())
    }

    // ------------------------------------------------------------------
    // Traffic lights
    // ------------------------------------------------------------------

    /// Add a light controlling every road currently entering `node`
    pub fn add_traffic_light(&mut self, node: NodeId) -> Result<TrafficLightId> {
        let incoming = self
            .intersections
            .get(&node)
            .context("Intersection not found")?
            .incoming
            .clone();
        self.add_traffic_light_for(node, &incoming)
    }

    /// Add a light controlling the given roads at `node`. Lights added to
    /// the same intersection alternate between starting green and red.
    pub fn add_traffic_light_for(
        &mut self,
        node: NodeId,
        roads: &[RoadId],
    ) -> Result<TrafficLightId> {
        if !self.intersections.contains_key(&node) {
            bail!("Intersection {:?} not found", node);
        }
        for road in roads {
            if !self.roads.contains_key(road) {
                bail!("Controlled road {:?} not found", road);
            }
        }

        let existing = self
            .traffic_lights
            .values()
            .filter(|l| l.intersection == node)
            .count();

        let id = TrafficLightId(self.next_sim_id());
        let mut light = TrafficLight::new(id, node, existing % 2 == 0);
        for road in roads {
            light.add_controlled_road(*road);
        }
        self.traffic_lights.insert(id, light);
        self.events.emit(WorldEvent::TrafficLightCreated(id));
        Ok(id)
    }

    pub fn remove_traffic_light(&mut self, id: TrafficLightId) -> Result<()> {
        self.traffic_lights
            .remove(&id)
            .context("Traffic light not found")?;
        self.events.emit(WorldEvent::TrafficLightDeleted(id));
        Ok(())
    }

    // ------------------------------------------------------------------
    // Vehicles
    // ------------------------------------------------------------------

    /// Place a vehicle on a road. Distance and speed are clamped to the road.
    pub fn add_vehicle(&mut self, road: RoadId, distance: f32, speed: f32) -> Result<VehicleId> {
        if !self.roads.contains_key(&road) {
            bail!("Road {:?} not found", road);
        }
        self.push_vehicle(road, distance, speed)
            .context("Failed to place vehicle")
    }

    pub(crate) fn push_vehicle(
        &mut self,
        road: RoadId,
        distance: f32,
        speed: f32,
    ) -> Option<VehicleId> {
        let (length, max_speed) = {
            let r = self.roads.get(&road)?;
            (r.length, r.max_speed)
        };
        let id = VehicleId(self.next_sim_id());
        let distance = distance.clamp(0.0, length);
        let pos = self.roads.get(&road)?.pos_at(distance);

        let mut vehicle = Vehicle::new(id, road, speed.clamp(0.0, max_speed), pos);
        vehicle.distance = distance;
        self.vehicles.push(vehicle);
        Some(id)
    }

    // ------------------------------------------------------------------
    // Demo world and reporting
    // ------------------------------------------------------------------

    /// Create the default demo world
    pub fn create_demo_world() -> Self {
        Self::build_demo_world(World::new())
    }

    /// Create the default demo world with a seeded RNG for reproducible runs
    pub fn create_demo_world_with_seed(seed: u64) -> Self {
        Self::build_demo_world(World::new_with_seed(seed))
    }

    /// A 3x3 grid of two-way roads with a signalised centre and four gates
    /// on the edges, each with a spawn point going in and a despawn point
    /// coming out
    pub fn build_demo_world(mut world: World) -> Self {
        let spacing = 150.0;
        let mut grid = [[NodeId(SimId(0)); 3]; 3];

        for (row, nodes) in grid.iter_mut().enumerate() {
            for (col, node) in nodes.iter_mut().enumerate() {
                let x = (col as f32 - 1.0) * spacing;
                let y = (row as f32 - 1.0) * spacing;
                *node = world.add_node(Vec2::new(x, y));
            }
        }

        for row in 0..3 {
            for col in 0..2 {
                let _ = world.add_two_way_road(grid[row][col], grid[row][col + 1], 40.0);
            }
        }
        for row in 0..2 {
            for col in 0..3 {
                let _ = world.add_two_way_road(grid[row][col], grid[row + 1][col], 40.0);
            }
        }

        let gates = [
            (grid[1][0], Vec2::new(-2.0 * spacing, 0.0)),
            (grid[1][2], Vec2::new(2.0 * spacing, 0.0)),
            (grid[0][1], Vec2::new(0.0, -2.0 * spacing)),
            (grid[2][1], Vec2::new(0.0, 2.0 * spacing)),
        ];
        for (edge, pos) in gates {
            let gate = world.add_node(pos);
            if let Ok((inbound, outbound)) = world.add_two_way_road(gate, edge, 50.0) {
                let _ = world.add_spawn_point(gate, inbound);
                let _ = world.add_despawn_point(gate, outbound);
            }
        }

        let _ = world.add_traffic_light(grid[1][1]);

        world
    }

    /// Print a summary of the world state
    pub fn print_summary(&self) {
        println!("=== Traffic Simulation Summary ===");
        println!("Time: {:.2}s", self.time);
        println!("Nodes: {}, Roads: {}", self.nodes.len(), self.roads.len());
        println!(
            "Spawn points: {}, Despawn points: {}, Traffic lights: {}",
            self.spawn_points.len(),
            self.despawn_points.len(),
            self.traffic_lights.len()
        );
        println!(
            "Vehicles: {} active, {} spawned, {} despawned",
            self.vehicles.len(),
            self.stats.vehicles_spawned,
            self.stats.vehicles_despawned
        );

        let moving: Vec<&Vehicle> = self.vehicles.iter().filter(|v| v.speed > 0.0).collect();
        if !self.vehicles.is_empty() {
            let mean = self.vehicles.iter().map(|v| v.speed).sum::<f32>()
                / self.vehicles.len() as f32;
            println!(
                "Moving: {}, stopped: {}, mean speed: {:.1}",
                moving.len(),
                self.vehicles.len() - moving.len(),
                mean
            );
        }

        for light in self.traffic_lights.values() {
            println!(
                "  Light {:?} at {:?}: {:?} ({:.1}s){}",
                light.id.0,
                light.intersection.0,
                light.state,
                light.timer,
                if light.enabled { "" } else { " [disabled]" }
            );
        }
    }
}
