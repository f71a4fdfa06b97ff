//! GraphEngine - force-mode graph storage.
//!
//! The GraphEngine stores the node/edge topology using petgraph's
//! StableGraph and keeps SoA (Structure of Arrays) buffers for current and
//! previous positions, which the force simulation integrates in place.
//! Node attributes (`name`, `weight`, `rank`) stay in a parallel `Vec`
//! indexed by `NodeId`.

use std::collections::HashMap;

use log::warn;
use petgraph::Undirected;
use petgraph::stable_graph::{NodeIndex, StableGraph};
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use serde::{Deserialize, Serialize};

use super::edge::{EdgeData, EdgeId, LinkKey};
use super::node::{NodeData, NodeId, NodeKey, NodeState};
use super::tree::extent;
use crate::spatial::SpatialIndex;

/// Flat node/edge payload, as delivered by `pageGraph`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlatGraph {
    pub nodes: Vec<NodeData>,
    pub edges: Vec<EdgeData>,
}

/// The force-mode graph.
///
/// This struct manages:
/// - Graph topology via petgraph (parallel edges and self-loops allowed)
/// - Position buffers in SoA layout (current and previous, for Verlet)
/// - Node state (fixed, dragging)
/// - Link degree per node (used to split spring corrections)
/// - Spatial index for pointer hit testing
pub struct GraphEngine {
    /// Nodes store their NodeId, edges store their EdgeId.
    graph: StableGraph<NodeId, EdgeId, Undirected>,

    /// Node attributes, indexed by NodeId.
    data: Vec<NodeData>,

    /// Next edge ID to assign
    next_edge_id: u32,

    pos_x: Vec<f64>,
    pos_y: Vec<f64>,

    /// Previous positions; `pos - prev` is the implicit velocity.
    prev_x: Vec<f64>,
    prev_y: Vec<f64>,

    states: Vec<NodeState>,

    /// Number of edge endpoints per node (a self-loop counts twice).
    degrees: Vec<u32>,

    spatial: SpatialIndex,

    /// Whether the spatial index needs rebuilding
    spatial_dirty: bool,
}

impl GraphEngine {
    /// Create a new empty graph engine.
    pub fn new() -> Self {
        Self::with_capacity(0, 0)
    }

    /// Create a graph engine with pre-allocated capacity.
    pub fn with_capacity(node_capacity: usize, edge_capacity: usize) -> Self {
        Self {
            graph: StableGraph::with_capacity(node_capacity, edge_capacity),
            data: Vec::with_capacity(node_capacity),
            next_edge_id: 0,
            pos_x: Vec::with_capacity(node_capacity),
            pos_y: Vec::with_capacity(node_capacity),
            prev_x: Vec::with_capacity(node_capacity),
            prev_y: Vec::with_capacity(node_capacity),
            states: Vec::with_capacity(node_capacity),
            degrees: Vec::with_capacity(node_capacity),
            spatial: SpatialIndex::new(),
            spatial_dirty: false,
        }
    }

    /// Build the engine from a server payload.
    ///
    /// Edges whose endpoints cannot be resolved are skipped with a warning.
    /// `LinkKey::Auto` is settled once for the whole edge list.
    /// Self-loops and duplicate edges are kept as given.
    pub fn from_flat_graph(graph: &FlatGraph, link_key: LinkKey) -> Self {
        let mut engine = Self::with_capacity(graph.nodes.len(), graph.edges.len());

        let mut by_key: HashMap<&NodeKey, NodeId> = HashMap::with_capacity(graph.nodes.len());
        for node in &graph.nodes {
            let id = engine.add_node(node.clone(), 0.0, 0.0);
            by_key.entry(&node.id).or_insert(id);
        }

        let node_count = graph.nodes.len();
        let link_key = link_key.resolve(&graph.edges, node_count);
        let resolve = |key: &NodeKey| -> Option<NodeId> {
            match (link_key, key) {
                (LinkKey::Index, NodeKey::Number(i)) => usize::try_from(*i)
                    .ok()
                    .filter(|&i| i < node_count)
                    .map(|i| NodeId(i as u32)),
                _ => by_key.get(key).copied(),
            }
        };

        for (i, edge) in graph.edges.iter().enumerate() {
            match (resolve(&edge.source), resolve(&edge.target)) {
                (Some(source), Some(target)) => {
                    engine.add_edge(source, target);
                }
                _ => warn!(
                    "skipping edge {i}: {} -> {} does not reference a known node",
                    edge.source, edge.target
                ),
            }
        }

        engine
    }

    // =========================================================================
    // Node Operations
    // =========================================================================

    /// Add a node at the specified position. `data.fixed` pins it there.
    pub fn add_node(&mut self, data: NodeData, x: f64, y: f64) -> NodeId {
        let id = NodeId(self.data.len() as u32);
        self.graph.add_node(id);

        let mut state = NodeState::new();
        state.set_fixed(data.fixed);
        self.data.push(data);
        self.pos_x.push(x);
        self.pos_y.push(y);
        self.prev_x.push(x);
        self.prev_y.push(y);
        self.states.push(state);
        self.degrees.push(0);

        self.spatial_dirty = true;
        id
    }

    /// Get the number of nodes.
    pub fn node_count(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.index() < self.data.len()
    }

    /// Node attributes.
    pub fn node(&self, id: NodeId) -> Option<&NodeData> {
        self.data.get(id.index())
    }

    /// Iterate node ids in insertion order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.data.len() as u32).map(NodeId)
    }

    /// Get a node's position.
    pub fn position(&self, id: NodeId) -> Option<(f64, f64)> {
        let i = id.index();
        (i < self.pos_x.len()).then(|| (self.pos_x[i], self.pos_y[i]))
    }

    /// Move a node, resetting its velocity.
    pub fn set_position(&mut self, id: NodeId, x: f64, y: f64) {
        let i = id.index();
        if i < self.pos_x.len() {
            self.pos_x[i] = x;
            self.pos_y[i] = y;
            self.prev_x[i] = x;
            self.prev_y[i] = y;
            self.spatial_dirty = true;
        }
    }

    pub fn state(&self, id: NodeId) -> NodeState {
        self.states.get(id.index()).copied().unwrap_or_default()
    }

    pub fn state_mut(&mut self, id: NodeId) -> Option<&mut NodeState> {
        self.states.get_mut(id.index())
    }

    pub fn is_node_pinned(&self, id: NodeId) -> bool {
        self.state(id).is_pinned()
    }

    /// Number of edge endpoints touching the node.
    pub fn degree(&self, id: NodeId) -> u32 {
        self.degrees.get(id.index()).copied().unwrap_or(0)
    }

    /// Min/max rank over all nodes.
    pub fn rank_extent(&self) -> Option<(f64, f64)> {
        extent(self.data.iter().map(|n| n.rank))
    }

    /// Min/max weight over all nodes.
    pub fn weight_extent(&self) -> Option<(f64, f64)> {
        extent(self.data.iter().map(|n| n.weight))
    }

    // =========================================================================
    // Edge Operations
    // =========================================================================

    /// Add an edge between two nodes.
    pub fn add_edge(&mut self, source: NodeId, target: NodeId) -> Option<EdgeId> {
        if !self.contains(source) || !self.contains(target) {
            return None;
        }

        let id = EdgeId(self.next_edge_id);
        self.next_edge_id += 1;

        self.graph.add_edge(
            NodeIndex::new(source.index()),
            NodeIndex::new(target.index()),
            id,
        );
        self.degrees[source.index()] += 1;
        self.degrees[target.index()] += 1;

        Some(id)
    }

    /// Get the number of edges.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Edges as `(source, target)` in insertion order.
    pub fn edges(&self) -> Vec<(NodeId, NodeId)> {
        let mut edges: Vec<(EdgeId, NodeId, NodeId)> = self
            .graph
            .edge_references()
            .map(|e| {
                (
                    *e.weight(),
                    NodeId(e.source().index() as u32),
                    NodeId(e.target().index() as u32),
                )
            })
            .collect();
        edges.sort_by_key(|(id, _, _)| id.0);
        edges.into_iter().map(|(_, s, t)| (s, t)).collect()
    }

    // =========================================================================
    // Buffer Access
    // =========================================================================

    pub fn positions_x(&self) -> &[f64] {
        &self.pos_x
    }

    pub fn positions_y(&self) -> &[f64] {
        &self.pos_y
    }

    /// Mutable access to all simulation buffers at once.
    pub(crate) fn buffers_mut(&mut self) -> SimBuffers<'_> {
        self.spatial_dirty = true;
        SimBuffers {
            x: &mut self.pos_x,
            y: &mut self.pos_y,
            px: &mut self.prev_x,
            py: &mut self.prev_y,
            states: &self.states,
            degrees: &self.degrees,
        }
    }

    // =========================================================================
    // Spatial Queries
    // =========================================================================

    /// Find the node under a layout-space point.
    ///
    /// `radii` holds the rendered radius per node; the nearest node whose
    /// circle contains the point wins.
    pub fn node_at(&mut self, x: f64, y: f64, radii: &[f64]) -> Option<NodeId> {
        if self.spatial_dirty {
            self.rebuild_spatial_index();
        }
        let max_radius = radii.iter().copied().fold(0.0_f64, f64::max);
        self.spatial
            .in_radius(x, y, max_radius)
            .into_iter()
            .filter_map(|id| {
                let (nx, ny) = self.position(id)?;
                let r = radii.get(id.index()).copied().unwrap_or(0.0);
                let d2 = (nx - x).powi(2) + (ny - y).powi(2);
                (d2 <= r * r).then_some((id, d2))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id)
    }

    /// Rebuild the spatial index.
    pub fn rebuild_spatial_index(&mut self) {
        let points: Vec<_> = self
            .node_ids()
            .map(|id| (id, self.pos_x[id.index()], self.pos_y[id.index()]))
            .collect();

        self.spatial.rebuild(&points);
        self.spatial_dirty = false;
    }
}

impl Default for GraphEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Borrowed simulation buffers.
pub(crate) struct SimBuffers<'a> {
    pub x: &'a mut [f64],
    pub y: &'a mut [f64],
    pub px: &'a mut [f64],
    pub py: &'a mut [f64],
    pub states: &'a [NodeState],
    pub degrees: &'a [u32],
}
