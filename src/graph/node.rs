//! Node identifiers, input node shapes and per-node state.
//!
//! Every node that enters a layout gets a dense `NodeId` (its slot in the
//! layout buffers). The opaque identifier sent by the quiz server is kept
//! as a `NodeKey` and only used to resolve edges and for display.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Dense node identifier (slot index in layout buffers).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Create a new NodeId from a raw u32.
    #[inline]
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw u32 value.
    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }

    /// Slot index into layout buffers.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({})", self.0)
    }
}

impl From<u32> for NodeId {
    #[inline]
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl From<NodeId> for u32 {
    #[inline]
    fn from(id: NodeId) -> Self {
        id.0
    }
}

/// Opaque node identifier as sent by the server (number or string).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeKey {
    Number(i64),
    Text(String),
}

impl Default for NodeKey {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// A node of the force-mode graph, as delivered by `pageGraph`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeData {
    pub id: NodeKey,
    pub name: String,
    /// Signed knowledge weight, drives color.
    pub weight: f64,
    /// Page rank, drives size.
    pub rank: f64,
    /// Starting position; nodes without one are placed on a spiral.
    pub x: Option<f64>,
    pub y: Option<f64>,
    /// Held in place by the simulation.
    pub fixed: bool,
}

/// Node state flags packed into a single byte.
#[derive(Debug, Clone, Copy, Default)]
pub struct NodeState {
    flags: u8,
}

impl NodeState {
    const FIXED: u8 = 0b0000_0001;
    const DRAGGING: u8 = 0b0000_0010;

    /// Create a new default node state.
    #[inline]
    pub fn new() -> Self {
        Self { flags: 0 }
    }

    /// Fixed by the caller, independent of dragging.
    #[inline]
    pub fn is_fixed(self) -> bool {
        self.flags & Self::FIXED != 0
    }

    #[inline]
    pub fn set_fixed(&mut self, fixed: bool) {
        if fixed {
            self.flags |= Self::FIXED;
        } else {
            self.flags &= !Self::FIXED;
        }
    }

    /// Currently held by the pointer.
    #[inline]
    pub fn is_dragging(self) -> bool {
        self.flags & Self::DRAGGING != 0
    }

    #[inline]
    pub fn set_dragging(&mut self, dragging: bool) {
        if dragging {
            self.flags |= Self::DRAGGING;
        } else {
            self.flags &= !Self::DRAGGING;
        }
    }

    /// Whether the simulation must leave this node where it is.
    #[inline]
    pub fn is_pinned(self) -> bool {
        self.flags & (Self::FIXED | Self::DRAGGING) != 0
    }
}
