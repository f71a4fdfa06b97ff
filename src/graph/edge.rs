//! Edge identifiers and input edge shapes.
//!
//! Edges come from the server as `{source, target}` pairs. Endpoints are
//! array indices (the `pageGraph` payload) or node ids. `LinkKey::Auto`
//! picks between the two per graph.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::node::NodeKey;

/// Stable edge identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EdgeId(pub u32);

impl EdgeId {
    /// Create a new EdgeId from a raw u32.
    #[inline]
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw u32 value.
    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Edge({})", self.0)
    }
}

/// An edge of the force-mode graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeData {
    pub source: NodeKey,
    pub target: NodeKey,
}

impl LinkKey {
    /// Settle `Auto` for a concrete edge list over `node_count` nodes.
    pub fn resolve(self, edges: &[EdgeData], node_count: usize) -> LinkKey {
        if self != LinkKey::Auto {
            return self;
        }
        let in_range = |key: &NodeKey| match key {
            NodeKey::Number(i) => usize::try_from(*i).is_ok_and(|i| i < node_count),
            NodeKey::Text(_) => true,
        };
        if edges.iter().all(|e| in_range(&e.source) && in_range(&e.target)) {
            LinkKey::Index
        } else {
            LinkKey::Id
        }
    }
}

impl EdgeData {
    /// Edge between two node indices.
    pub fn between(source: usize, target: usize) -> Self {
        Self {
            source: NodeKey::Number(source as i64),
            target: NodeKey::Number(target as i64),
        }
    }

    /// Self-loops are kept but exert no force.
    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }
}

/// How edge endpoints reference nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LinkKey {
    /// `Index` when every numeric endpoint is a valid position in the
    /// `nodes` array, otherwise `Id`.
    #[default]
    Auto,
    /// Numbers are positions in the `nodes` array; strings match node ids.
    Index,
    /// Endpoints always match node ids.
    Id,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_id() {
        let id = EdgeId::new(42);
        assert_eq!(id.raw(), 42);
        assert_eq!(format!("{}", id), "Edge(42)");
    }

    #[test]
    fn test_edge_deserialize_indices() {
        let edge: EdgeData = serde_json::from_str(r#"{"source": 0, "target": 1}"#).unwrap();
        assert_eq!(edge, EdgeData::between(0, 1));
        assert!(!edge.is_self_loop());
        assert!(EdgeData::between(2, 2).is_self_loop());
    }

    #[test]
    fn test_auto_link_key() {
        let by_index = [EdgeData::between(0, 1)];
        assert_eq!(LinkKey::Auto.resolve(&by_index, 2), LinkKey::Index);

        // ids 1 and 2 over two nodes: 2 is not a valid position
        let by_id = [EdgeData::between(1, 2)];
        assert_eq!(LinkKey::Auto.resolve(&by_id, 2), LinkKey::Id);

        assert_eq!(LinkKey::Index.resolve(&by_id, 2), LinkKey::Index);
        assert_eq!(LinkKey::Id.resolve(&by_index, 2), LinkKey::Id);
        assert_eq!(LinkKey::Auto.resolve(&[], 0), LinkKey::Index);
    }
}
