//! R-tree over node centers using the rstar crate.
//!
//! Force-mode nodes are rendered as circles of varying radius, so queries
//! return candidates within a radius and the caller decides which circle
//! actually contains the pointer.

use rstar::{AABB, PointDistance, RTree, RTreeObject};

use crate::graph::NodeId;

/// A node center in layout space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodePoint {
    pub id: NodeId,
    pub x: f64,
    pub y: f64,
}

impl RTreeObject for NodePoint {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.x, self.y])
    }
}

impl PointDistance for NodePoint {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.x - point[0];
        let dy = self.y - point[1];
        dx * dx + dy * dy
    }
}

/// Spatial index for graph nodes.
///
/// Rebuilt in bulk whenever positions changed since the last query; the
/// simulation moves every node each tick so incremental updates buy nothing.
#[derive(Default)]
pub struct SpatialIndex {
    tree: RTree<NodePoint>,
}

impl SpatialIndex {
    pub fn new() -> Self {
        Self { tree: RTree::new() }
    }

    /// All nodes whose center lies within `radius` of the point.
    pub fn in_radius(&self, x: f64, y: f64, radius: f64) -> Vec<NodeId> {
        self.tree
            .locate_within_distance([x, y], radius * radius)
            .map(|point| point.id)
            .collect()
    }

    /// Replace the index contents with `(id, x, y)` tuples.
    ///
    /// Non-finite coordinates are left out so a diverged node cannot poison
    /// the tree.
    pub fn rebuild(&mut self, points: &[(NodeId, f64, f64)]) {
        let node_points: Vec<_> = points
            .iter()
            .filter(|(_, x, y)| x.is_finite() && y.is_finite())
            .map(|&(id, x, y)| NodePoint { id, x, y })
            .collect();

        self.tree = RTree::bulk_load(node_points);
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(points: &[(NodeId, f64, f64)]) -> SpatialIndex {
        let mut index = SpatialIndex::new();
        index.rebuild(points);
        index
    }

    #[test]
    fn test_in_radius() {
        let index = index(&[
            (NodeId(0), 0.0, 0.0),
            (NodeId(1), 3.0, 0.0),
            (NodeId(2), 10.0, 0.0),
        ]);

        let found = index.in_radius(0.0, 0.0, 5.0);
        assert_eq!(found.len(), 2);
        assert!(found.contains(&NodeId(0)));
        assert!(found.contains(&NodeId(1)));
    }

    #[test]
    fn test_rebuild_skips_non_finite() {
        let index = index(&[(NodeId(0), f64::NAN, 0.0), (NodeId(1), 1.0, 1.0)]);
        assert_eq!(index.len(), 1);
        assert_eq!(index.in_radius(0.0, 0.0, 2.0), vec![NodeId(1)]);
        assert!(SpatialIndex::new().is_empty());
    }
}
