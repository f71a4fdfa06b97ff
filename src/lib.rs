//! Knowledge Map - WASM Module
//!
//! Visualization engine for the knowledge map quiz client. It renders the
//! graph derived from a user's quiz answers in one of two modes: a
//! zoomable hierarchical circle packing of categories, or a force-directed
//! node-link view of pages. It is compiled to WebAssembly and exposes a
//! JavaScript-friendly API via wasm-bindgen; everything below `dom` is plain
//! Rust and runs in native tests.
//!
//! # Architecture
//!
//! - `graph`: input shapes, the tree arena and the petgraph-backed engine
//! - `scale`: linear and diverging color scales
//! - `layout`: circle packing and the force simulation
//! - `zoom`: click-to-zoom controller for the packing view
//! - `render`: retained scene and the per-mode renderers
//! - `viz`: the active mode and its interaction model
//! - `dom`: SVG mount and animation loop
//! - `fetch`: graph requests against the quiz endpoint

use js_sys::Float64Array;
use log::{Level, info};
use wasm_bindgen::prelude::*;

pub mod config;
pub mod demo;
pub mod dom;
pub mod error;
pub mod fetch;
pub mod graph;
pub mod layout;
pub mod render;
pub mod scale;
pub mod spatial;
pub mod viz;
pub mod zoom;

pub use config::VizConfig;
pub use error::{Result, VizError};
pub use viz::{Mode, Visualization};

use fetch::Action;
use graph::{FlatGraph, GraphNode, Hierarchy};
use layout::{PackConfig, PackLayout};

/// Initialize logging and panic hooks for the WASM module.
#[wasm_bindgen(start)]
pub fn init() {
    let _ = console_log::init_with_level(Level::Info);
    console_error_panic_hook::set_once();
    info!("knowledge map initialized");
}

/// A visualization mounted into one DOM element.
#[wasm_bindgen]
pub struct KnowledgeMapWasm {
    app: dom::App,
}

#[wasm_bindgen]
impl KnowledgeMapWasm {
    /// Mount into the element with id `mount_id`.
    ///
    /// `config` is an optional plain object; missing keys keep their
    /// defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(mount_id: &str, config: JsValue) -> std::result::Result<KnowledgeMapWasm, JsValue> {
        let config = if config.is_undefined() || config.is_null() {
            VizConfig::default()
        } else {
            serde_wasm_bindgen::from_value(config)?
        };
        Ok(Self {
            app: dom::App::mount(mount_id, config)?,
        })
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    /// Draw a category tree as a zoomable circle packing.
    #[wasm_bindgen(js_name = renderPackedGraph)]
    pub fn render_packed_graph(&self, root: JsValue) -> std::result::Result<(), JsValue> {
        let root: GraphNode = serde_wasm_bindgen::from_value(root)?;
        Ok(self.app.render_packed_graph(&root)?)
    }

    /// Draw nodes and edges as a force-directed graph.
    #[wasm_bindgen(js_name = renderForceGraph)]
    pub fn render_force_graph(&self, nodes: JsValue, edges: JsValue) -> std::result::Result<(), JsValue> {
        let graph = FlatGraph {
            nodes: serde_wasm_bindgen::from_value(nodes)?,
            edges: serde_wasm_bindgen::from_value(edges)?,
        };
        Ok(self.app.render_force_graph(&graph)?)
    }

    /// Fetch the user's page graph and draw it in force mode.
    #[wasm_bindgen(js_name = showPageGraph)]
    pub fn show_page_graph(&self) -> std::result::Result<(), JsValue> {
        Ok(self.app.fetch_graph(Action::PageGraph)?)
    }

    /// Fetch the user's category tree and draw it as a packing.
    #[wasm_bindgen(js_name = showCategoryGraph)]
    pub fn show_category_graph(&self) -> std::result::Result<(), JsValue> {
        Ok(self.app.fetch_graph(Action::CategoryGraph)?)
    }

    /// Draw the built-in sample category tree.
    #[wasm_bindgen(js_name = showDemoGraph)]
    pub fn show_demo_graph(&self) -> std::result::Result<(), JsValue> {
        let root = demo::demo_category_graph()?;
        Ok(self.app.render_packed_graph(&root)?)
    }

    /// Replace the drawing with inline error text.
    #[wasm_bindgen(js_name = showError)]
    pub fn show_error(&self, message: &str) {
        self.app.show_message(message);
    }

    /// Cancel any animation and empty the mount point.
    pub fn teardown(&self) {
        self.app.teardown();
    }

    // =========================================================================
    // Interaction
    // =========================================================================

    /// Click at SVG pixel coordinates. `slow` stretches the zoom, as
    /// holding alt does for real clicks.
    pub fn click(&self, x: f64, y: f64, slow: bool) -> std::result::Result<bool, JsValue> {
        Ok(self.app.click(x, y, slow)?)
    }

    /// Start dragging the force node under the pointer. Returns its index.
    #[wasm_bindgen(js_name = dragStart)]
    pub fn drag_start(&self, x: f64, y: f64) -> std::result::Result<Option<u32>, JsValue> {
        Ok(self.app.drag_start(x, y)?)
    }

    #[wasm_bindgen(js_name = dragTo)]
    pub fn drag_to(&self, x: f64, y: f64) {
        self.app.drag_to(x, y);
    }

    #[wasm_bindgen(js_name = dragEnd)]
    pub fn drag_end(&self) {
        self.app.drag_end();
    }

    /// Advance animations to `now_ms`. Returns whether more frames follow.
    pub fn frame(&self, now_ms: f64) -> bool {
        self.app.frame(now_ms)
    }

    /// Index of the focused node in packing mode.
    pub fn focus(&self) -> Option<u32> {
        self.app.focus()
    }

    /// JSON snapshot of everything currently drawn.
    #[wasm_bindgen(js_name = sceneJson)]
    pub fn scene_json(&self) -> std::result::Result<String, JsValue> {
        Ok(self.app.scene_json()?)
    }
}

/// Compute a circle packing without mounting anything.
///
/// Returns a Float64Array of `[x0, y0, r0, x1, y1, r1, ...]` in pre-order,
/// with the root centered at the origin.
///
/// # Arguments
///
/// * `root` - Category tree (`{name, weight, rank, children}`)
/// * `size` - Diameter of the root circle
/// * `padding` - Gap between sibling circles
#[wasm_bindgen(js_name = computePackLayout)]
pub fn compute_pack_layout(root: JsValue, size: f64, padding: f64) -> std::result::Result<Float64Array, JsValue> {
    let root: GraphNode = serde_wasm_bindgen::from_value(root)?;
    Ok(Float64Array::from(&pack_circles(&root, size, padding)[..]))
}

fn pack_circles(root: &GraphNode, size: f64, padding: f64) -> Vec<f64> {
    let hierarchy = Hierarchy::from_tree(root);
    let config = PackConfig {
        size: [size, size],
        padding,
        ..Default::default()
    };
    let result = PackLayout::new(config).compute(&hierarchy);

    // Interleave into [x0, y0, r0, x1, y1, r1, ...]
    result
        .frame
        .circles()
        .iter()
        .flat_map(|c| [c.x, c.y, c.r])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_circles_interleaved() {
        let tree = GraphNode::branch(
            "root",
            0.0,
            vec![GraphNode::leaf("a", 2.0), GraphNode::leaf("b", -1.0)],
        );
        let circles = pack_circles(&tree, 580.0, 2.0);
        assert_eq!(circles.len(), 9);
        assert_eq!(&circles[..3], &[0.0, 0.0, 290.0]);
        assert!(circles[5] > circles[8], "a packs larger than b");
    }

    #[test]
    fn test_visualization_reexported() {
        let mut viz = Visualization::new(VizConfig::default());
        viz.render_packed_graph(&GraphNode::leaf("only", 1.0)).unwrap();
        assert!(matches!(viz.mode(), Some(Mode::Packing(_))));
    }
}
