//! Nodes and directed roads
//!
//! A road caches its anchor points and length; both must be refreshed with
//! [`Road::update_geometry`] whenever an endpoint node moves or an offset
//! changes, since they are read for every vehicle on every tick.

use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

use super::curve::CubicBezier;
use super::types::{normalize_angle, NodeId, RoadId, Vec2, DEFAULT_ROAD_WIDTH};

/// Headings within this angle of each other count as going straight
pub const STRAIGHT_TOLERANCE: f32 = PI / 6.0;

/// Headings turned by more than this angle count as a U-turn
pub const U_TURN_THRESHOLD: f32 = 5.0 * PI / 6.0;

/// A graph vertex: a road endpoint or intersection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub pos: Vec2,
}

impl Node {
    pub fn new(id: NodeId, pos: Vec2) -> Self {
        Self { id, pos }
    }
}

/// The two inner control points of a curved road
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoadCurve {
    pub control_p1: Vec2,
    pub control_p2: Vec2,
}

/// Direction a vehicle takes when moving from one road onto another
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Turn {
    Straight,
    Left,
    Right,
    UTurn,
}

impl Turn {
    pub fn is_turning(self) -> bool {
        self != Turn::Straight
    }
}

/// A directed road between two nodes
#[derive(Debug, Clone)]
pub struct Road {
    pub id: RoadId,
    pub from: NodeId,
    pub to: NodeId,
    pub max_speed: f32,
    pub length: f32,
    pub width: f32,
    pub reverse_road: Option<RoadId>,
    pub curve: Option<RoadCurve>,
    pub start_offset: Vec2,
    pub end_offset: Vec2,
    start: Vec2,
    end: Vec2,
    path: Option<CubicBezier>,
}

impl Road {
    pub fn new(id: RoadId, from: &Node, to: &Node, max_speed: f32) -> Self {
        let mut road = Self {
            id,
            from: from.id,
            to: to.id,
            max_speed,
            length: 0.0,
            width: DEFAULT_ROAD_WIDTH,
            reverse_road: None,
            curve: None,
            start_offset: Vec2::ZERO,
            end_offset: Vec2::ZERO,
            start: from.pos,
            end: to.pos,
            path: None,
        };
        road.update_geometry(from.pos, to.pos);
        road
    }

    /// Recompute anchors, length and the cached curve from endpoint positions
    pub fn update_geometry(&mut self, from_pos: Vec2, to_pos: Vec2) {
        self.start = from_pos + self.start_offset;
        self.end = to_pos + self.end_offset;
        self.length = self.start.distance(&self.end);
        self.path = self
            .curve
            .map(|c| CubicBezier::new(self.start, c.control_p1, c.control_p2, self.end));
    }

    /// Start anchor (from-node position plus start offset)
    pub fn start(&self) -> Vec2 {
        self.start
    }

    /// End anchor (to-node position plus end offset)
    pub fn end(&self) -> Vec2 {
        self.end
    }

    /// Unit direction of travel along the chord
    pub fn direction(&self) -> Vec2 {
        self.start.direction_to(&self.end)
    }

    /// Heading of the chord, counter-clockwise from +x
    pub fn heading(&self) -> f32 {
        self.start.angle_to(&self.end)
    }

    pub fn is_loop(&self) -> bool {
        self.from == self.to
    }

    /// Map a distance along the road to a point in the plane
    pub fn pos_at(&self, distance: f32) -> Vec2 {
        if self.length <= 0.0 {
            return self.start;
        }
        let t = (distance / self.length).clamp(0.0, 1.0);

        let point = match &self.path {
            Some(path) => path.point_at(t),
            None => self.start.lerp(&self.end, t),
        };

        // Opposite-direction pairs drive on their own right-hand lane
        if self.reverse_road.is_some() {
            point + self.start.perpendicular_offset(&self.end, self.width * 0.25)
        } else {
            point
        }
    }

    /// True when `next` leads straight back to where this road came from
    pub fn is_u_turn_to(&self, next: &Road) -> bool {
        next.from == self.to && next.to == self.from
    }

    /// Signed heading change when continuing from this road onto `next`
    pub fn turn_angle_to(&self, next: &Road) -> f32 {
        normalize_angle(next.heading() - self.heading())
    }

    pub fn turn_to(&self, next: &Road) -> Turn {
        let angle = self.turn_angle_to(next);
        if angle.abs() < STRAIGHT_TOLERANCE {
            Turn::Straight
        } else if angle.abs() > U_TURN_THRESHOLD {
            Turn::UTurn
        } else if angle > 0.0 {
            Turn::Left
        } else {
            Turn::Right
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::types::SimId;

    const EPSILON: f32 = 1e-4;

    fn node(id: usize, x: f32, y: f32) -> Node {
        Node::new(NodeId(SimId(id)), Vec2::new(x, y))
    }

    fn road(from: &Node, to: &Node) -> Road {
        Road::new(RoadId(SimId(100)), from, to, 40.0)
    }

    #[test]
    fn length_without_offsets() {
        let r = road(&node(1, 0.0, 0.0), &node(2, 3.0, 4.0));
        assert!((r.length - 5.0).abs() < EPSILON);
        assert!((r.width - 12.0).abs() < EPSILON);
    }

    #[test]
    fn offsets_shift_anchors_and_length() {
        let a = node(1, 0.0, 0.0);
        let b = node(2, 10.0, 0.0);
        let mut r = road(&a, &b);
        r.start_offset = Vec2::new(1.0, 1.0);
        r.end_offset = Vec2::new(2.0, -1.0);
        r.update_geometry(a.pos, b.pos);

        assert!((r.length - 125.0_f32.sqrt()).abs() < EPSILON);
        assert!(r.pos_at(0.0).distance(&Vec2::new(1.0, 1.0)) < EPSILON);
        assert!(r.pos_at(r.length).distance(&Vec2::new(12.0, -1.0)) < EPSILON);
    }

    #[test]
    fn pos_at_clamps_out_of_range() {
        let r = road(&node(1, 0.0, 0.0), &node(2, 10.0, 0.0));
        assert!(r.pos_at(-5.0).distance(&Vec2::new(0.0, 0.0)) < EPSILON);
        assert!(r.pos_at(25.0).distance(&Vec2::new(10.0, 0.0)) < EPSILON);
        assert!(r.pos_at(5.0).distance(&Vec2::new(5.0, 0.0)) < EPSILON);
    }

    #[test]
    fn zero_length_road_returns_start() {
        let n = node(1, 5.0, 3.0);
        let r = road(&n, &n);
        assert_eq!(r.length, 0.0);
        let p = r.pos_at(0.0);
        assert!(p.distance(&Vec2::new(5.0, 3.0)) < EPSILON);
        assert!(!p.x.is_nan() && !p.y.is_nan());
    }

    #[test]
    fn loop_with_opposing_offsets() {
        let n = node(1, 0.0, 0.0);
        let mut r = road(&n, &n);
        r.start_offset = Vec2::new(10.0, 0.0);
        r.end_offset = Vec2::new(-10.0, 0.0);
        r.update_geometry(n.pos, n.pos);
        assert!((r.length - 20.0).abs() < EPSILON);
        assert!(r.pos_at(r.length / 2.0).distance(&Vec2::ZERO) < EPSILON);
    }

    #[test]
    fn curved_road_ends_on_anchors() {
        let a = node(1, 0.0, 0.0);
        let b = node(2, 100.0, 0.0);
        let mut r = road(&a, &b);
        r.curve = Some(RoadCurve {
            control_p1: Vec2::new(30.0, 40.0),
            control_p2: Vec2::new(70.0, 40.0),
        });
        r.update_geometry(a.pos, b.pos);
        assert!(r.pos_at(0.0).distance(&a.pos) < EPSILON);
        assert!(r.pos_at(r.length).distance(&b.pos) < EPSILON);
        assert!(r.pos_at(r.length / 2.0).y > 1.0);
    }

    #[test]
    fn turn_classification() {
        let west = node(1, -100.0, 0.0);
        let centre = node(2, 0.0, 0.0);
        let east = node(3, 100.0, 0.0);
        let north = node(4, 0.0, 100.0);
        let south = node(5, 0.0, -100.0);

        let incoming = road(&west, &centre);
        assert_eq!(incoming.turn_to(&road(&centre, &east)), Turn::Straight);
        assert_eq!(incoming.turn_to(&road(&centre, &north)), Turn::Left);
        assert_eq!(incoming.turn_to(&road(&centre, &south)), Turn::Right);
        assert_eq!(incoming.turn_to(&road(&centre, &west)), Turn::UTurn);
        assert!(incoming.is_u_turn_to(&road(&centre, &west)));
    }
}
