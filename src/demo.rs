//! Built-in category tree for trying the packing view without a server.

use crate::error::Result;
use crate::graph::GraphNode;

const DEMO_CATEGORY_GRAPH: &str = include_str!("../assets/demo_category_graph.json");

pub fn demo_category_graph() -> Result<GraphNode> {
    Ok(serde_json::from_str(DEMO_CATEGORY_GRAPH)?)
}
