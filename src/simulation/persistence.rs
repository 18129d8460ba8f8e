//! Versioned save records
//!
//! The world converts to and from a flat, serde-friendly record set. Reading
//! and writing files is left to the caller.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

use super::points::{DespawnPoint, SpawnPoint};
use super::road::{Node, Road, RoadCurve};
use super::traffic_light::{LightState, TrafficLight};
use super::types::{DespawnPointId, NodeId, RoadId, SpawnPointId, TrafficLightId, Vec2};
use super::world::World;

pub const CURRENT_VERSION: &str = "1.0.0";

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("unsupported save format version {found:?} (expected {:?})", CURRENT_VERSION)]
    UnsupportedVersion { found: String },

    #[error("duplicate id {0} in save data")]
    DuplicateId(usize),

    #[error("{owner} refers to unknown node {node:?}")]
    UnknownNode { owner: String, node: NodeId },

    #[error("{owner} refers to unknown road {road:?}")]
    UnknownRoad { owner: String, road: RoadId },

    #[error("malformed save data: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveFormat {
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    pub nodes: Vec<NodeData>,
    pub roads: Vec<RoadData>,
    #[serde(default)]
    pub spawn_points: Vec<SpawnPointData>,
    #[serde(default)]
    pub despawn_points: Vec<DespawnPointData>,
    #[serde(default)]
    pub traffic_lights: Vec<TrafficLightData>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeData {
    pub id: NodeId,
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoadData {
    pub id: RoadId,
    pub from_node_id: NodeId,
    pub to_node_id: NodeId,
    pub max_speed: f32,
    pub width: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reverse_road_id: Option<RoadId>,
    #[serde(default)]
    pub start_offset: Vec2,
    #[serde(default)]
    pub end_offset: Vec2,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub curve: Option<RoadCurve>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpawnPointData {
    pub id: SpawnPointId,
    pub node_id: NodeId,
    pub road_id: RoadId,
    pub interval: f32,
    pub min_speed: f32,
    pub max_speed: f32,
    pub max_vehicles: usize,
    pub enabled: bool,
    #[serde(default)]
    pub vehicle_counter: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DespawnPointData {
    pub id: DespawnPointId,
    pub node_id: NodeId,
    pub road_id: RoadId,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficLightData {
    pub id: TrafficLightId,
    pub intersection_id: NodeId,
    pub controlled_road_ids: Vec<RoadId>,
    pub state: LightState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev_state: Option<LightState>,
    pub green_time: f32,
    pub yellow_time: f32,
    pub red_time: f32,
    pub enabled: bool,
}

impl SaveFormat {
    pub fn to_json(&self) -> Result<String, PersistenceError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, PersistenceError> {
        Ok(serde_json::from_str(json)?)
    }
}

impl World {
    /// Snapshot the world's structure. Vehicles are not saved.
    pub fn to_save_format(&self) -> SaveFormat {
        SaveFormat {
            version: CURRENT_VERSION.to_string(),
            timestamp: None,
            nodes: self
                .nodes
                .values()
                .map(|n| NodeData {
                    id: n.id,
                    x: n.pos.x,
                    y: n.pos.y,
                })
                .collect(),
            roads: self
                .roads
                .values()
                .map(|r| RoadData {
                    id: r.id,
                    from_node_id: r.from,
                    to_node_id: r.to,
                    max_speed: r.max_speed,
                    width: r.width,
                    reverse_road_id: r.reverse_road,
                    start_offset: r.start_offset,
                    end_offset: r.end_offset,
                    curve: r.curve,
                })
                .collect(),
            spawn_points: self
                .spawn_points
                .values()
                .map(|sp| SpawnPointData {
                    id: sp.id,
                    node_id: sp.node,
                    road_id: sp.road,
                    interval: sp.interval,
                    min_speed: sp.min_speed,
                    max_speed: sp.max_speed,
                    max_vehicles: sp.max_vehicles,
                    enabled: sp.enabled,
                    vehicle_counter: sp.vehicle_counter,
                })
                .collect(),
            despawn_points: self
                .despawn_points
                .values()
                .map(|dp| DespawnPointData {
                    id: dp.id,
                    node_id: dp.node,
                    road_id: dp.road,
                    enabled: dp.enabled,
                })
                .collect(),
            traffic_lights: self
                .traffic_lights
                .values()
                .map(|l| TrafficLightData {
                    id: l.id,
                    intersection_id: l.intersection,
                    controlled_road_ids: l.controlled_roads.clone(),
                    state: l.state,
                    prev_state: Some(l.prev_state),
                    green_time: l.green_time,
                    yellow_time: l.yellow_time,
                    red_time: l.red_time,
                    enabled: l.enabled,
                })
                .collect(),
        }
    }

    /// Rebuild a world from save records. Ids are kept as saved; the world
    /// starts with no vehicles and an unseeded random source.
    pub fn from_save_format(save: &SaveFormat) -> Result<World, PersistenceError> {
        if save.version != CURRENT_VERSION {
            return Err(PersistenceError::UnsupportedVersion {
                found: save.version.clone(),
            });
        }

        let mut seen = BTreeSet::new();
        let mut claim = |id: usize| {
            if seen.insert(id) {
                Ok(())
            } else {
                Err(PersistenceError::DuplicateId(id))
            }
        };

        let mut world = World::new();

        for n in &save.nodes {
            claim(n.id.0 .0)?;
            world.insert_node(Node::new(n.id, Vec2::new(n.x, n.y)));
        }

        for r in &save.roads {
            claim(r.id.0 .0)?;
            let owner = || format!("road {:?}", r.id);
            let from = *world.nodes.get(&r.from_node_id).ok_or_else(|| {
                PersistenceError::UnknownNode {
                    owner: owner(),
                    node: r.from_node_id,
                }
            })?;
            let to = *world
                .nodes
                .get(&r.to_node_id)
                .ok_or_else(|| PersistenceError::UnknownNode {
                    owner: owner(),
                    node: r.to_node_id,
                })?;

            let mut road = Road::new(r.id, &from, &to, r.max_speed);
            road.width = r.width;
            road.start_offset = r.start_offset;
            road.end_offset = r.end_offset;
            road.curve = r.curve;
            road.update_geometry(from.pos, to.pos);
            world.insert_road(road);
        }

        // Saved reverse links win over the ones inferred on insertion
        for r in &save.roads {
            let Some(reverse) = r.reverse_road_id else {
                continue;
            };
            if !world.roads.contains_key(&reverse) {
                return Err(PersistenceError::UnknownRoad {
                    owner: format!("road {:?}", r.id),
                    road: reverse,
                });
            }
            if let Some(road) = world.roads.get_mut(&r.id) {
                road.reverse_road = Some(reverse);
            }
        }

        for sp in &save.spawn_points {
            claim(sp.id.0 .0)?;
            let owner = format!("spawn point {:?}", sp.id);
            check_node(&world, &owner, sp.node_id)?;
            check_road(&world, &owner, sp.road_id)?;
            let mut point = SpawnPoint::new(sp.id, sp.node_id, sp.road_id);
            point.interval = sp.interval;
            point.min_speed = sp.min_speed;
            point.max_speed = sp.max_speed;
            point.max_vehicles = sp.max_vehicles;
            point.enabled = sp.enabled;
            point.vehicle_counter = sp.vehicle_counter;
            world.reserve_id(sp.id.0);
            world.spawn_points.insert(sp.id, point);
        }

        for dp in &save.despawn_points {
            claim(dp.id.0 .0)?;
            let owner = format!("despawn point {:?}", dp.id);
            check_node(&world, &owner, dp.node_id)?;
            check_road(&world, &owner, dp.road_id)?;
            let mut point = DespawnPoint::new(dp.id, dp.node_id, dp.road_id);
            point.enabled = dp.enabled;
            world.reserve_id(dp.id.0);
            world.despawn_points.insert(dp.id, point);
        }

        for l in &save.traffic_lights {
            claim(l.id.0 .0)?;
            let owner = format!("traffic light {:?}", l.id);
            check_node(&world, &owner, l.intersection_id)?;
            let mut light = TrafficLight::new(l.id, l.intersection_id, true);
            for road in &l.controlled_road_ids {
                check_road(&world, &owner, *road)?;
                light.add_controlled_road(*road);
            }
            light.state = l.state;
            light.prev_state = l.prev_state.unwrap_or(match l.state {
                LightState::Yellow => LightState::Green,
                _ => LightState::Red,
            });
            light.green_time = l.green_time;
            light.yellow_time = l.yellow_time;
            light.red_time = l.red_time;
            light.enabled = l.enabled;
            world.reserve_id(l.id.0);
            world.traffic_lights.insert(l.id, light);
        }

        Ok(world)
    }
}

fn check_node(world: &World, owner: &str, node: NodeId) -> Result<(), PersistenceError> {
    if world.nodes.contains_key(&node) {
        Ok(())
    } else {
        Err(PersistenceError::UnknownNode {
            owner: owner.to_string(),
            node,
        })
    }
}

fn check_road(world: &World, owner: &str, road: RoadId) -> Result<(), PersistenceError> {
    if world.roads.contains_key(&road) {
        Ok(())
    } else {
        Err(PersistenceError::UnknownRoad {
            owner: owner.to_string(),
            road,
        })
    }
}
