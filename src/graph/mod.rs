//! Graph data structures.
//!
//! Two input shapes arrive from the quiz server: a nested category tree
//! (packing mode) and a flat node/edge list (force mode). The tree is
//! flattened into a `Hierarchy` arena; the flat graph is stored in a
//! petgraph-backed `GraphEngine` with SoA position buffers.

mod edge;
mod engine;
mod node;
mod tree;

pub use edge::{EdgeData, EdgeId, LinkKey};
pub use engine::{FlatGraph, GraphEngine};
pub use node::{NodeData, NodeId, NodeKey, NodeState};
pub use tree::{GraphNode, Hierarchy, HierarchyNode, extent};
