//! Road network graph for pathfinding
//!
//! A snapshot of the world's node/road adjacency taken when the pathfinder
//! first needs it. The snapshot is not updated by world mutations; the owner
//! must drop it whenever the graph changes.

use petgraph::algo::astar;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::BTreeMap;

use super::intersection::Intersection;
use super::road::Road;
use super::types::{NodeId, RoadId};

/// Edge data for the road network graph
#[derive(Debug, Clone, Copy)]
pub struct RoadEdge {
    pub road_id: RoadId,
    pub weight: f32,
}

impl RoadEdge {
    pub fn from_road(road: &Road) -> Self {
        Self {
            road_id: road.id,
            weight: road.length.max(0.0),
        }
    }
}

#[derive(Debug, Default)]
pub struct RoadGraph {
    /// The underlying petgraph directed graph (one edge per road)
    graph: DiGraph<NodeId, RoadEdge>,

    /// Maps node IDs to their indices in the graph
    node_indices: BTreeMap<NodeId, NodeIndex>,

    /// Outgoing roads per node, in the intersection's own order
    outgoing: BTreeMap<NodeId, Vec<RoadId>>,
}

impl RoadGraph {
    pub fn build(
        intersections: &BTreeMap<NodeId, Intersection>,
        roads: &BTreeMap<RoadId, Road>,
    ) -> Self {
        let mut graph = Self::default();

        for (node_id, intersection) in intersections {
            let index = graph.graph.add_node(*node_id);
            graph.node_indices.insert(*node_id, index);
            graph
                .outgoing
                .insert(*node_id, intersection.outgoing.clone());
        }

        for road in roads.values() {
            let (Some(&from), Some(&to)) =
                (graph.node_indices.get(&road.from), graph.node_indices.get(&road.to))
            else {
                continue;
            };
            graph.graph.add_edge(from, to, RoadEdge::from_road(road));
        }

        graph
    }

    pub fn node_count(&self) -> usize {
        self.node_indices.len()
    }

    pub fn road_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Roads leaving a node as they were when the graph was built
    pub fn outgoing(&self, node: NodeId) -> &[RoadId] {
        self.outgoing.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Shortest node sequence from `start` to `target` weighted by road
    /// length, both ends included. `[start]` when they are equal, `None`
    /// when the target cannot be reached.
    pub fn find_shortest_path(&self, start: NodeId, target: NodeId) -> Option<Vec<NodeId>> {
        if start == target {
            return Some(vec![start]);
        }
        let start_index = *self.node_indices.get(&start)?;
        let target_index = *self.node_indices.get(&target)?;

        let (_, node_path) = astar(
            &self.graph,
            start_index,
            |node| node == target_index,
            |edge| edge.weight().weight,
            |_| 0.0, // Null heuristic = Dijkstra
        )?;

        Some(
            node_path
                .into_iter()
                .filter_map(|index| self.graph.node_weight(index).copied())
                .collect(),
        )
    }
}
