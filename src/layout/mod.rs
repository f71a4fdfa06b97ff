//! Layout algorithms.
//!
//! - `pack`: hierarchical circle packing (one pass per invocation)
//! - `force`: iterative force-directed simulation
//!
//! Both produce a [`LayoutFrame`]: one circle per node in layout space.

mod enclose;
pub mod force;
pub mod pack;
mod quadtree;

use serde::{Deserialize, Serialize};

use crate::graph::NodeId;

pub use enclose::{enclose, pack_siblings};
pub use force::{ForceConfig, ForceLayout, Frames};
pub use pack::{PackConfig, PackLayout, PackResult, PackValue};

/// A circle in layout space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub x: f64,
    pub y: f64,
    pub r: f64,
}

impl Circle {
    pub fn new(x: f64, y: f64, r: f64) -> Self {
        Self { x, y, r }
    }

    /// Distance between centers.
    pub fn distance(&self, other: &Circle) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        (self.x - x).hypot(self.y - y) <= self.r
    }
}

/// Positions and radii of every node at one point in time, indexed by
/// `NodeId`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutFrame {
    circles: Vec<Circle>,
}

impl LayoutFrame {
    pub fn new(circles: Vec<Circle>) -> Self {
        Self { circles }
    }

    pub fn len(&self) -> usize {
        self.circles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.circles.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<Circle> {
        self.circles.get(id.index()).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Circle)> {
        self.circles
            .iter()
            .enumerate()
            .map(|(i, c)| (NodeId(i as u32), c))
    }

    pub fn circles(&self) -> &[Circle] {
        &self.circles
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circle_geometry() {
        let a = Circle::new(0.0, 0.0, 5.0);
        let b = Circle::new(3.0, 4.0, 1.0);
        assert_eq!(a.distance(&b), 5.0);
        assert!(a.contains_point(3.0, 4.0));
        assert!(!b.contains_point(0.0, 0.0));
    }

    #[test]
    fn test_frame_lookup() {
        let frame = LayoutFrame::new(vec![Circle::new(1.0, 2.0, 3.0)]);
        assert_eq!(frame.get(NodeId(0)), Some(Circle::new(1.0, 2.0, 3.0)));
        assert_eq!(frame.get(NodeId(1)), None);
        assert_eq!(frame.iter().count(), 1);
    }
}
