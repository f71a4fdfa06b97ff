//! Hierarchical circle packing.
//!
//! Every leaf gets a circle with area proportional to its value; internal
//! nodes enclose their packed children. A first bottom-up pass establishes
//! the unpadded scale. Further passes inflate every child by the padding in
//! layout units before packing; since the padding itself grows the root,
//! the conversion from pixels is repeated until the gap between siblings
//! holds at the final scale. A top-down pass then turns relative offsets
//! into absolute positions and scales the root to fit the target size.
//!
//! # Degenerate input
//!
//! Nodes whose value is zero, negative or not finite get radius 0. They stay
//! in the output at their parent's packing position rather than being
//! dropped. A tree whose total value is 0 keeps every circle at `(0, 0, 0)`.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::enclose::pack_siblings;
use super::{Circle, LayoutFrame};
use crate::graph::{Hierarchy, NodeId};

/// Upper bound on padded passes before settling for a smaller gap.
const MAX_PAD_PASSES: usize = 16;
/// Relative slack accepted between the padding used and the padding needed.
const PAD_TOLERANCE: f64 = 1e-9;

/// Which node attribute drives circle area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PackValue {
    /// `|weight|`: every answered category counts, whatever its sign.
    #[default]
    AbsWeight,
    /// `max(rank, 0)`.
    Rank,
}

/// Configuration for the packing layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PackConfig {
    /// Target `[width, height]`; the root circle fills the smaller side.
    pub size: [f64; 2],
    /// Gap in pixels between sibling circles at every level.
    pub padding: f64,
    pub value: PackValue,
}

impl Default for PackConfig {
    fn default() -> Self {
        Self {
            size: [580.0, 580.0],
            padding: 2.0,
            value: PackValue::AbsWeight,
        }
    }
}

/// Result of the packing computation.
#[derive(Debug, Clone)]
pub struct PackResult {
    /// Circle per node, indexed by `NodeId`. The root is centered at the
    /// origin.
    pub frame: LayoutFrame,
    /// Aggregated value per node.
    pub values: Vec<f64>,
}

impl PackResult {
    pub fn circle(&self, id: NodeId) -> Option<Circle> {
        self.frame.get(id)
    }
}

/// The circle packing layout engine.
pub struct PackLayout {
    config: PackConfig,
}

impl PackLayout {
    pub fn new(config: PackConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(PackConfig::default())
    }

    pub fn config(&self) -> &PackConfig {
        &self.config
    }

    /// Compute the layout for every node of `hierarchy`.
    pub fn compute(&self, hierarchy: &Hierarchy) -> PackResult {
        let n = hierarchy.len();
        let values = self.aggregate_values(hierarchy);
        let mut circles = vec![Circle::default(); n];
        if n == 0 {
            return PackResult {
                frame: LayoutFrame::new(circles),
                values,
            };
        }

        for (id, node) in hierarchy.iter() {
            if node.children.is_empty() {
                circles[id.index()].r = values[id.index()].sqrt();
            }
        }

        let root = hierarchy.root().index();
        pack_pass(hierarchy, &mut circles, 0.0);
        let unpadded = circles[root].r;
        if unpadded <= 0.0 {
            warn!("packing tree has no positive value; all {n} circles collapse to the origin");
            return PackResult {
                frame: LayoutFrame::new(circles),
                values,
            };
        }

        let [w, h] = self.config.size;
        let side = w.min(h);
        let padding = self.config.padding.max(0.0);
        // Siblings end up 2 * pad apart in layout units, which is
        // pad * side / r_root pixels once scaled.
        let mut pad = padding * unpadded / side;
        for pass in 1..=MAX_PAD_PASSES {
            pack_pass(hierarchy, &mut circles, pad);
            let needed = padding * circles[root].r / side;
            if needed <= pad * (1.0 + PAD_TOLERANCE) {
                break;
            }
            if pass == MAX_PAD_PASSES {
                warn!("padding {padding} does not fit in {side}px; siblings end up closer");
                break;
            }
            pad = needed;
        }
        let scale = side / (2.0 * circles[root].r);

        circles[root].x = 0.0;
        circles[root].y = 0.0;
        circles[root].r = side / 2.0;
        for (id, node) in hierarchy.iter().skip(1) {
            let Some(parent) = node.parent else { continue };
            let p = circles[parent.index()];
            let c = &mut circles[id.index()];
            c.x = p.x + c.x * scale;
            c.y = p.y + c.y * scale;
            c.r *= scale;
        }

        debug!(
            "packed {n} circles, root radius {:.1}, scale {scale:.4}",
            circles[root].r
        );
        PackResult {
            frame: LayoutFrame::new(circles),
            values,
        }
    }

    /// Leaf value per policy, internal value as the sum over children.
    fn aggregate_values(&self, hierarchy: &Hierarchy) -> Vec<f64> {
        let mut values = vec![0.0; hierarchy.len()];
        let mut degenerate = 0usize;

        for id in hierarchy.bottom_up() {
            let Some(node) = hierarchy.get(id) else { continue };
            let value = if node.children.is_empty() {
                let raw = match self.config.value {
                    PackValue::AbsWeight => node.weight.abs(),
                    PackValue::Rank => node.rank.max(0.0),
                };
                if raw.is_finite() && raw > 0.0 {
                    raw
                } else {
                    degenerate += 1;
                    0.0
                }
            } else {
                node.children.iter().map(|c| values[c.index()]).sum()
            };
            values[id.index()] = value;
        }

        if degenerate > 0 {
            warn!("{degenerate} leaves have no positive packing value and get radius 0");
        }
        values
    }
}

/// Pack the children of every internal node, bottom-up, with each child
/// inflated by `pad`. Children end up relative to their parent's center.
fn pack_pass(hierarchy: &Hierarchy, circles: &mut [Circle], pad: f64) {
    let mut scratch = Vec::new();
    for id in hierarchy.bottom_up() {
        let children = hierarchy.children(id);
        if children.is_empty() {
            continue;
        }

        scratch.clear();
        scratch.extend(children.iter().map(|c| {
            let circle = circles[c.index()];
            Circle {
                r: circle.r + pad,
                ..circle
            }
        }));
        let enclosing = pack_siblings(&mut scratch);

        for (child, placed) in children.iter().zip(&scratch) {
            let c = &mut circles[child.index()];
            c.x = placed.x;
            c.y = placed.y;
        }
        circles[id.index()].r = enclosing + pad;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphNode;

    const EPS: f64 = 1e-6;

    fn layout(tree: &GraphNode) -> (Hierarchy, PackResult) {
        let hierarchy = Hierarchy::from_tree(tree);
        let result = PackLayout::with_defaults().compute(&hierarchy);
        (hierarchy, result)
    }

    fn assert_packed(hierarchy: &Hierarchy, result: &PackResult) {
        assert_eq!(result.frame.len(), hierarchy.len());
        for (id, node) in hierarchy.iter() {
            let c = result.circle(id).unwrap();
            assert!(c.x.is_finite() && c.y.is_finite() && c.r >= 0.0);

            if let Some(parent) = node.parent {
                let p = result.circle(parent).unwrap();
                let d = c.distance(&p);
                assert!(d + c.r <= p.r + EPS, "{} escapes {}", node.name, parent);
            }

            let siblings = hierarchy.children(id);
            for (i, a) in siblings.iter().enumerate() {
                for b in &siblings[i + 1..] {
                    let (ca, cb) = (result.circle(*a).unwrap(), result.circle(*b).unwrap());
                    assert!(ca.distance(&cb) >= ca.r + cb.r - EPS, "siblings {a} and {b} overlap");
                }
            }
        }
    }

    /// Smallest edge-to-edge distance between any two siblings.
    fn min_sibling_gap(hierarchy: &Hierarchy, result: &PackResult) -> Option<f64> {
        let mut gap: Option<f64> = None;
        for (id, _) in hierarchy.iter() {
            let siblings = hierarchy.children(id);
            for (i, a) in siblings.iter().enumerate() {
                for b in &siblings[i + 1..] {
                    let (ca, cb) = (result.circle(*a).unwrap(), result.circle(*b).unwrap());
                    let d = ca.distance(&cb) - ca.r - cb.r;
                    gap = Some(gap.map_or(d, |g| g.min(d)));
                }
            }
        }
        gap
    }

    fn sample() -> GraphNode {
        GraphNode::branch(
            "Articles",
            -3.0,
            vec![
                GraphNode::branch(
                    "People",
                    -2.0,
                    vec![
                        GraphNode::leaf("Living people", -2.0),
                        GraphNode::leaf("Writers", -1.0),
                        GraphNode::leaf("Models", 1.0),
                    ],
                ),
                GraphNode::branch(
                    "Science",
                    1.0,
                    vec![GraphNode::leaf("Mathematics", -1.0), GraphNode::leaf("Geology", 3.0)],
                ),
                GraphNode::leaf("Middle Ages", -1.0),
            ],
        )
    }

    #[test]
    fn test_root_fills_size_at_origin() {
        let (hierarchy, result) = layout(&sample());
        let root = result.circle(hierarchy.root()).unwrap();
        assert_eq!((root.x, root.y), (0.0, 0.0));
        assert!((root.r - 290.0).abs() < 1e-9);
    }

    #[test]
    fn test_containment_and_no_overlap() {
        let (hierarchy, result) = layout(&sample());
        assert_packed(&hierarchy, &result);
    }

    #[test]
    fn test_siblings_keep_padding_gap() {
        for padding in [0.0, 2.0, 10.0] {
            let hierarchy = Hierarchy::from_tree(&sample());
            let config = PackConfig {
                padding,
                ..Default::default()
            };
            let result = PackLayout::new(config).compute(&hierarchy);
            let gap = min_sibling_gap(&hierarchy, &result).unwrap();
            assert!(gap >= padding - 1e-3, "padding {padding}: gap {gap}");
            assert_packed(&hierarchy, &result);
        }
    }

    #[test]
    fn test_values_aggregate_abs_weight() {
        let (hierarchy, result) = layout(&sample());
        assert_eq!(result.values[hierarchy.root().index()], 9.0);
        // People = 2 + 1 + 1
        assert_eq!(result.values[1], 4.0);
    }

    #[test]
    fn test_area_proportional_to_value_for_leaf_siblings() {
        let tree = GraphNode::branch(
            "root",
            0.0,
            vec![GraphNode::leaf("a", 4.0), GraphNode::leaf("b", 1.0)],
        );
        let (_, result) = layout(&tree);
        let a = result.circle(NodeId(1)).unwrap();
        let b = result.circle(NodeId(2)).unwrap();
        assert!((a.r / b.r - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_rank_value_policy() {
        let tree = GraphNode::branch(
            "root",
            0.0,
            vec![
                GraphNode::leaf("a", -1.0).with_rank(9.0),
                GraphNode::leaf("b", -1.0).with_rank(-4.0),
            ],
        );
        let hierarchy = Hierarchy::from_tree(&tree);
        let config = PackConfig {
            value: PackValue::Rank,
            ..Default::default()
        };
        let result = PackLayout::new(config).compute(&hierarchy);
        assert_eq!(result.values, vec![9.0, 9.0, 0.0]);
        assert_eq!(result.circle(NodeId(2)).unwrap().r, 0.0);
        assert_packed(&hierarchy, &result);
    }

    #[test]
    fn test_zero_value_tree_does_not_produce_nan() {
        let tree = GraphNode::branch(
            "root",
            0.0,
            vec![GraphNode::leaf("a", 0.0), GraphNode::leaf("b", 0.0)],
        );
        let (_, result) = layout(&tree);
        assert_eq!(result.frame.len(), 3);
        assert!(result.frame.iter().all(|(_, c)| *c == Circle::default()));
    }

    #[test]
    fn test_single_leaf_root() {
        let (_, result) = layout(&GraphNode::leaf("only", 5.0));
        let root = result.circle(NodeId(0)).unwrap();
        assert!((root.r - 290.0).abs() < 1e-9);
    }

    #[test]
    fn test_wide_and_deep_tree() {
        let leaves = |prefix: &str, n: usize| -> Vec<GraphNode> {
            (0..n)
                .map(|i| GraphNode::leaf(format!("{prefix}{i}"), ((i % 5) + 1) as f64))
                .collect()
        };
        let tree = GraphNode::branch(
            "root",
            0.0,
            vec![
                GraphNode::branch("wide", 0.0, leaves("w", 60)),
                GraphNode::branch(
                    "deep",
                    0.0,
                    vec![GraphNode::branch(
                        "deeper",
                        0.0,
                        vec![GraphNode::branch("deepest", 0.0, leaves("d", 7))],
                    )],
                ),
                GraphNode::leaf("zero", 0.0),
            ],
        );
        let (hierarchy, result) = layout(&tree);
        assert_eq!(result.frame.len(), tree.count());
        assert_packed(&hierarchy, &result);
    }

    #[cfg(not(target_arch = "wasm32"))]
    mod properties {
        use super::*;
        use proptest::prelude::*;

        /// Pixel tolerance for placement round-off.
        const TOLERANCE: f64 = 1e-2;

        fn weight() -> impl Strategy<Value = f64> {
            prop_oneof![1 => Just(0.0), 8 => -50.0..50.0f64]
        }

        fn tree() -> impl Strategy<Value = GraphNode> {
            weight()
                .prop_map(|w| GraphNode::leaf("leaf", w))
                .prop_recursive(4, 64, 8, |inner| {
                    prop::collection::vec(inner, 1..8)
                        .prop_map(|children| GraphNode::branch("branch", 0.0, children))
                })
        }

        proptest! {
            #[test]
            fn packing_contains_children_and_separates_siblings(
                root in tree(),
                padding in 0.0..6.0f64,
            ) {
                let hierarchy = Hierarchy::from_tree(&root);
                let config = PackConfig { padding, ..Default::default() };
                let result = PackLayout::new(config).compute(&hierarchy);
                prop_assert_eq!(result.frame.len(), root.count());

                for (id, node) in hierarchy.iter() {
                    let c = result.circle(id).unwrap();
                    prop_assert!(c.x.is_finite() && c.y.is_finite() && c.r >= 0.0);
                    if let Some(parent) = node.parent {
                        let p = result.circle(parent).unwrap();
                        prop_assert!(c.distance(&p) + c.r <= p.r + TOLERANCE);
                    }
                }

                // a tree without value collapses to the origin
                prop_assume!(result.values[0] > 0.0);
                if let Some(gap) = min_sibling_gap(&hierarchy, &result) {
                    prop_assert!(gap >= padding - TOLERANCE, "gap {} < padding {}", gap, padding);
                }
            }
        }
    }
}
