//! Right-of-way rules for intersections without traffic lights

use std::collections::{BTreeMap, BTreeSet};

use super::intersection::Intersection;
use super::road::Road;
use super::types::{NodeId, RoadId};

/// Roads faster than this outrank normal roads
pub const HIGH_PRIORITY_SPEED: f32 = 50.0;

/// Roads slower than this are outranked by normal roads
pub const LOW_PRIORITY_SPEED: f32 = 30.0;

/// Priority tier of a road entering an intersection
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RoadPriority {
    Low,
    Normal,
    High,
}

impl RoadPriority {
    pub fn for_speed(max_speed: f32) -> Self {
        if max_speed > HIGH_PRIORITY_SPEED {
            RoadPriority::High
        } else if max_speed < LOW_PRIORITY_SPEED {
            RoadPriority::Low
        } else {
            RoadPriority::Normal
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntersectionKind {
    TwoWay,
    ThreeWay,
    FourWay,
}

impl IntersectionKind {
    /// Classify by the number of distinct roads, counting a two-way pair once
    pub fn from_road_count(count: usize) -> Self {
        match count {
            0..=2 => IntersectionKind::TwoWay,
            3 => IntersectionKind::ThreeWay,
            _ => IntersectionKind::FourWay,
        }
    }
}

/// Priority table for one uncontrolled intersection
#[derive(Debug, Clone)]
pub struct RightOfWayRule {
    pub intersection: NodeId,
    pub kind: IntersectionKind,
    pub road_priorities: BTreeMap<RoadId, RoadPriority>,
}

impl RightOfWayRule {
    pub fn new(intersection: NodeId, kind: IntersectionKind) -> Self {
        Self {
            intersection,
            kind,
            road_priorities: BTreeMap::new(),
        }
    }

    /// Build the rule for an intersection from the roads touching it
    pub fn analyze(intersection: &Intersection, roads: &BTreeMap<RoadId, Road>) -> Self {
        let mut seen = BTreeSet::new();
        let mut rule = Self::new(intersection.id, IntersectionKind::TwoWay);

        for road_id in intersection.roads() {
            let Some(road) = roads.get(&road_id) else {
                continue;
            };
            let key = match road.reverse_road {
                Some(reverse) => (road_id.min(reverse), road_id.max(reverse)),
                None => (road_id, road_id),
            };
            seen.insert(key);
            rule.set_road_priority(road_id, RoadPriority::for_speed(road.max_speed));
        }

        rule.kind = IntersectionKind::from_road_count(seen.len());
        rule
    }

    pub fn set_road_priority(&mut self, road: RoadId, priority: RoadPriority) {
        self.road_priorities.insert(road, priority);
    }

    /// Unknown roads are treated as normal priority
    pub fn road_priority(&self, road: RoadId) -> RoadPriority {
        self.road_priorities
            .get(&road)
            .copied()
            .unwrap_or(RoadPriority::Normal)
    }

    /// Strictly higher tier; equal tiers leave the decision to later rules
    pub fn has_priority(&self, approaching: RoadId, conflicting: RoadId) -> bool {
        self.road_priority(approaching) > self.road_priority(conflicting)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_tiers_from_speed() {
        assert_eq!(RoadPriority::for_speed(60.0), RoadPriority::High);
        assert_eq!(RoadPriority::for_speed(50.0), RoadPriority::Normal);
        assert_eq!(RoadPriority::for_speed(30.0), RoadPriority::Normal);
        assert_eq!(RoadPriority::for_speed(20.0), RoadPriority::Low);
    }

    #[test]
    fn kind_from_count() {
        assert_eq!(IntersectionKind::from_road_count(1), IntersectionKind::TwoWay);
        assert_eq!(IntersectionKind::from_road_count(3), IntersectionKind::ThreeWay);
        assert_eq!(IntersectionKind::from_road_count(6), IntersectionKind::FourWay);
    }
}
