//! Tree-form graph input (`categoryGraph`) and its flattened arena.
//!
//! `GraphNode` mirrors the nested JSON the server sends. Layout code works
//! on `Hierarchy`, which stores nodes in pre-order with explicit parent
//! back-references, so a child's `NodeId` is always greater than its
//! parent's and walking ids in reverse is a valid bottom-up order.

use serde::{Deserialize, Serialize};

use super::node::{NodeId, NodeKey};

/// A node of the category tree, as delivered by `categoryGraph`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphNode {
    pub id: NodeKey,
    pub name: String,
    /// Signed knowledge weight, drives color.
    pub weight: f64,
    /// Category rank.
    pub rank: f64,
    pub children: Vec<GraphNode>,
}

impl GraphNode {
    /// Leaf node with the given name and weight.
    pub fn leaf(name: impl Into<String>, weight: f64) -> Self {
        Self {
            name: name.into(),
            weight,
            ..Default::default()
        }
    }

    /// Internal node with the given children.
    pub fn branch(name: impl Into<String>, weight: f64, children: Vec<GraphNode>) -> Self {
        Self {
            name: name.into(),
            weight,
            children,
            ..Default::default()
        }
    }

    /// Builder-style rank setter.
    pub fn with_rank(mut self, rank: f64) -> Self {
        self.rank = rank;
        self
    }

    /// Total number of nodes in this subtree.
    pub fn count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.children.iter());
        }
        count
    }
}

/// One node of the flattened tree.
#[derive(Debug, Clone)]
pub struct HierarchyNode {
    pub key: NodeKey,
    pub name: String,
    pub weight: f64,
    pub rank: f64,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Distance from the root (root = 0).
    pub depth: u32,
}

/// Arena of tree nodes in pre-order.
#[derive(Debug, Clone)]
pub struct Hierarchy {
    nodes: Vec<HierarchyNode>,
}

impl Hierarchy {
    /// Flatten a nested tree. Iterative, so deep trees cannot overflow the stack.
    pub fn from_tree(root: &GraphNode) -> Self {
        let mut nodes: Vec<HierarchyNode> = Vec::with_capacity(root.count());
        let mut stack: Vec<(&GraphNode, Option<NodeId>, u32)> = vec![(root, None, 0)];

        while let Some((node, parent, depth)) = stack.pop() {
            let id = NodeId(nodes.len() as u32);
            if let Some(parent) = parent {
                nodes[parent.index()].children.push(id);
            }
            nodes.push(HierarchyNode {
                key: node.id.clone(),
                name: node.name.clone(),
                weight: node.weight,
                rank: node.rank,
                parent,
                children: Vec::with_capacity(node.children.len()),
                depth,
            });
            for child in node.children.iter().rev() {
                stack.push((child, Some(id), depth + 1));
            }
        }

        Self { nodes }
    }

    /// The root is always the first node.
    #[inline]
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&HierarchyNode> {
        self.nodes.get(id.index())
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.index() < self.nodes.len()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn is_leaf(&self, id: NodeId) -> bool {
        self.children(id).is_empty()
    }

    /// Iterate `(id, node)` in pre-order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &HierarchyNode)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (NodeId(i as u32), node))
    }

    /// Ids ordered so that every child comes before its parent.
    pub fn bottom_up(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len() as u32).rev().map(NodeId)
    }

    /// Minimum and maximum `weight` over all nodes, or None if empty.
    pub fn weight_extent(&self) -> Option<(f64, f64)> {
        extent(self.nodes.iter().map(|n| n.weight))
    }
}

/// Minimum and maximum of the finite values, or None if there are none.
pub fn extent(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}
