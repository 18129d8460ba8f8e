//! Intersection adjacency for the traffic simulation
//!
//! One intersection exists per node. It lists the roads entering and leaving
//! that node and is kept in step with the world's road collection by every
//! road mutation.

use super::types::{NodeId, RoadId};

/// Incoming/outgoing road adjacency for one node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Intersection {
    pub id: NodeId,
    pub incoming: Vec<RoadId>,
    pub outgoing: Vec<RoadId>,
}

impl Intersection {
    pub fn new(id: NodeId) -> Self {
        Self {
            id,
            incoming: Vec::new(),
            outgoing: Vec::new(),
        }
    }

    pub fn add_incoming(&mut self, road: RoadId) {
        if !self.incoming.contains(&road) {
            self.incoming.push(road);
        }
    }

    pub fn add_outgoing(&mut self, road: RoadId) {
        if !self.outgoing.contains(&road) {
            self.outgoing.push(road);
        }
    }

    /// Drop a road from both lists
    pub fn remove_road(&mut self, road: RoadId) {
        self.incoming.retain(|r| *r != road);
        self.outgoing.retain(|r| *r != road);
    }

    /// Every road touching this node, without duplicates (a loop appears once)
    pub fn roads(&self) -> Vec<RoadId> {
        let mut roads = self.incoming.clone();
        for road in &self.outgoing {
            if !roads.contains(road) {
                roads.push(*road);
            }
        }
        roads
    }

    pub fn is_empty(&self) -> bool {
        self.incoming.is_empty() && self.outgoing.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::types::SimId;

    #[test]
    fn adjacency_lists_stay_unique() {
        let mut intersection = Intersection::new(NodeId(SimId(0)));
        let a = RoadId(SimId(1));
        let b = RoadId(SimId(2));

        intersection.add_incoming(a);
        intersection.add_incoming(a);
        intersection.add_outgoing(b);
        intersection.add_outgoing(a);

        assert_eq!(intersection.incoming, vec![a]);
        assert_eq!(intersection.outgoing, vec![b, a]);
        assert_eq!(intersection.roads(), vec![a, b]);

        intersection.remove_road(a);
        assert!(intersection.incoming.is_empty());
        assert_eq!(intersection.outgoing, vec![b]);
        assert!(!intersection.is_empty());
    }
}
