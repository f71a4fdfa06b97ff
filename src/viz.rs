//! The visualization: one mount point, one active mode.
//!
//! `Visualization` owns the scene and at most one [`Mode`]. Rendering new
//! data tears the previous mode down first, so a zoom transition or a
//! running simulation never outlives the data it was started for. Time is
//! passed in by the caller (`now_ms`), which keeps the whole state machine
//! drivable from tests without a browser.

use log::{debug, info, warn};

use crate::config::VizConfig;
use crate::error::{Result, VizError};
use crate::graph::{FlatGraph, GraphEngine, GraphNode, Hierarchy, NodeId};
use crate::layout::{ForceLayout, PackLayout};
use crate::render::{Scene, SceneDelta, force, packed};
use crate::zoom::{View, ZoomController};

/// Zoomable circle packing of a category tree.
pub struct PackingView {
    zoom: ZoomController,
}

impl PackingView {
    pub fn zoom(&self) -> &ZoomController {
        &self.zoom
    }
}

/// Force-directed node-link view.
pub struct ForceView {
    layout: ForceLayout,
}

impl ForceView {
    pub fn layout(&self) -> &ForceLayout {
        &self.layout
    }
}

/// The currently rendered mode.
pub enum Mode {
    Packing(PackingView),
    Force(ForceView),
}

impl Mode {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Packing(_) => "packing",
            Self::Force(_) => "force",
        }
    }
}

pub struct Visualization {
    config: VizConfig,
    scene: Scene,
    mode: Option<Mode>,
}

impl Default for Visualization {
    fn default() -> Self {
        Self::new(VizConfig::default())
    }
}

impl Visualization {
    pub fn new(config: VizConfig) -> Self {
        Self {
            config,
            scene: Scene::default(),
            mode: None,
        }
    }

    pub fn config(&self) -> &VizConfig {
        &self.config
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Drain the scene's change set for the DOM binding.
    pub fn take_dirty(&mut self) -> SceneDelta {
        self.scene.take_dirty()
    }

    pub fn mode(&self) -> Option<&Mode> {
        self.mode.as_ref()
    }

    /// Current focus of the packing view.
    pub fn focus(&self) -> Option<NodeId> {
        match &self.mode {
            Some(Mode::Packing(view)) => Some(view.zoom.focus()),
            _ => None,
        }
    }

    /// Current window of the packing view.
    pub fn view(&self) -> Option<View> {
        match &self.mode {
            Some(Mode::Packing(view)) => Some(view.zoom.view()),
            _ => None,
        }
    }

    /// Whether [`frame`](Self::frame) still has work to do.
    pub fn is_animating(&self) -> bool {
        match &self.mode {
            Some(Mode::Packing(view)) => view.zoom.is_transitioning(),
            Some(Mode::Force(view)) => view.layout.is_running(),
            None => false,
        }
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    /// Replace whatever is shown with a zoomable packing of `root`.
    pub fn render_packed_graph(&mut self, root: &GraphNode) -> Result<()> {
        self.teardown();

        let config = &self.config.packing;
        let hierarchy = Hierarchy::from_tree(root);
        let packed = PackLayout::new(config.pack_config()).compute(&hierarchy);
        let zoom = ZoomController::new(&hierarchy, packed.frame, config.zoom_config())?;

        packed::draw(&mut self.scene, &hierarchy, &zoom, config);
        info!("rendered packing of {} nodes", hierarchy.len());

        self.mode = Some(Mode::Packing(PackingView {
            zoom,
        }));
        Ok(())
    }

    /// Replace whatever is shown with a force layout of `graph` and start
    /// the simulation.
    pub fn render_force_graph(&mut self, graph: &FlatGraph) -> Result<()> {
        self.teardown();

        let config = &self.config.force;
        let engine = GraphEngine::from_flat_graph(graph, config.link_key);
        if engine.is_empty() {
            warn!("force graph has no nodes; drawing an empty canvas");
        }

        let mut layout = ForceLayout::new(engine, config.simulation.clone());
        let radii = force::node_radii(layout.engine(), config);
        layout.set_radii(radii);
        layout.start();

        force::draw(&mut self.scene, &layout, config);
        info!(
            "rendered force graph of {} nodes and {} links",
            layout.engine().node_count(),
            layout.engine().edge_count()
        );

        self.mode = Some(Mode::Force(ForceView { layout }));
        Ok(())
    }

    /// Cancel any transition or simulation and clear the scene.
    pub fn teardown(&mut self) {
        if let Some(mode) = self.mode.take() {
            debug!("tearing down {} view", mode.name());
            match mode {
                Mode::Packing(mut view) => view.zoom.cancel(),
                Mode::Force(mut view) => {
                    view.layout.drag_end();
                    view.layout.stop();
                }
            }
        }
        let (width, height) = (self.scene.width(), self.scene.height());
        self.scene.clear(width, height);
    }

    /// Tear down and show inline text instead of a graph.
    pub fn show_message(&mut self, message: impl Into<String>) {
        self.teardown();
        self.scene.set_message(Some(message.into()));
    }

    pub fn scene_json(&self) -> Result<String> {
        self.scene.to_json()
    }

    // =========================================================================
    // Animation
    // =========================================================================

    /// Advance the active transition or simulation to `now_ms` and update
    /// the scene. Returns whether more frames are needed.
    pub fn frame(&mut self, now_ms: f64) -> bool {
        match &mut self.mode {
            Some(Mode::Packing(view)) => {
                let running = view.zoom.advance(now_ms);
                packed::update(&mut self.scene, &view.zoom);
                running
            }
            Some(Mode::Force(view)) => {
                let running = view.layout.tick();
                force::update(&mut self.scene, &view.layout, &self.config.force);
                running
            }
            None => false,
        }
    }

    // =========================================================================
    // Pointer Input
    // =========================================================================

    /// Click at a screen position. In the packing view this zooms to the
    /// deepest circle under the pointer, or back to the root when the
    /// click misses every circle. Returns whether a transition started.
    pub fn click(&mut self, sx: f64, sy: f64, now_ms: f64, slow: bool) -> Result<bool> {
        let Some(Mode::Packing(view)) = &mut self.mode else {
            return Ok(false);
        };
        match view.zoom.hit_test(sx, sy) {
            Some(node) => view.zoom.click(node, now_ms, slow),
            None => view.zoom.click_background(now_ms, slow),
        }
    }

    /// Zoom the packing view to `node`.
    pub fn click_node(&mut self, node: NodeId, now_ms: f64, slow: bool) -> Result<bool> {
        match &mut self.mode {
            Some(Mode::Packing(view)) => view.zoom.click(node, now_ms, slow),
            _ => Err(VizError::WrongMode {
                expected: "packing",
            }),
        }
    }

    /// Start dragging the force node under a screen position, if any.
    pub fn drag_start(&mut self, sx: f64, sy: f64) -> Result<Option<NodeId>> {
        let Some(Mode::Force(view)) = &mut self.mode else {
            return Ok(None);
        };
        let Some(node) = view.layout.node_at(sx, sy) else {
            return Ok(None);
        };
        view.layout.drag_start(node)?;
        debug!("drag {node}");
        Ok(Some(node))
    }

    /// Move the dragged node. The scene follows on the next frame.
    pub fn drag_to(&mut self, sx: f64, sy: f64) {
        if let Some(Mode::Force(view)) = &mut self.mode {
            view.layout.drag_to(sx, sy);
        }
    }

    pub fn drag_end(&mut self) {
        if let Some(Mode::Force(view)) = &mut self.mode {
            view.layout.drag_end();
        }
    }

    pub fn is_dragging(&self) -> bool {
        matches!(&self.mode, Some(Mode::Force(view)) if view.layout.dragged().is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{EdgeData, NodeData, NodeKey};
    use crate::render::{Primitive, PrimitiveKey};
    use crate::scale::Color;

    /// Run frames 16ms apart until the visualization settles.
    fn settle(viz: &mut Visualization, mut now: f64) -> f64 {
        for _ in 0..10_000 {
            now += 16.0;
            if !viz.frame(now) {
                return now;
            }
        }
        panic!("visualization did not settle");
    }

    fn circle(viz: &Visualization, index: u32) -> crate::render::CircleShape {
        match viz.scene().get(PrimitiveKey::Circle(index)) {
            Some(Primitive::Circle(c)) => c.clone(),
            other => panic!("expected circle {index}, got {other:?}"),
        }
    }

    fn scenario_a() -> GraphNode {
        serde_json::from_str(
            r#"{"name": "root", "weight": 0, "children": [
                {"name": "a", "weight": 2},
                {"name": "b", "weight": -1}
            ]}"#,
        )
        .unwrap()
    }

    fn scenario_b() -> FlatGraph {
        serde_json::from_str(
            r#"{
                "nodes": [{"id": 1, "rank": 10, "weight": 5}, {"id": 2, "rank": 20, "weight": -5}],
                "edges": [{"source": 1, "target": 2}]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_scenario_a_packing() {
        let mut viz = Visualization::default();
        viz.render_packed_graph(&scenario_a()).unwrap();

        assert_eq!(viz.scene().circles().count(), 3);
        let (root, a, b) = (circle(&viz, 0), circle(&viz, 1), circle(&viz, 2));
        for child in [&a, &b] {
            let d = (child.cx - root.cx).hypot(child.cy - root.cy);
            assert!(d + child.r <= root.r + 1e-6);
        }
        assert!(a.fill.lightness() > b.fill.lightness());
        assert_eq!(a.fill, Color::WHITE);
        assert_eq!(b.fill, Color::BLACK);

        // |2| packs larger than |-1|
        assert!(a.r > b.r);
    }

    #[test]
    fn test_scenario_b_force() {
        let mut viz = Visualization::default();
        viz.render_force_graph(&scenario_b()).unwrap();
        let Some(Mode::Force(view)) = viz.mode() else {
            panic!("expected force mode");
        };
        assert_eq!(view.layout().engine().edge_count(), 1);
        assert!(viz.is_animating());
        settle(&mut viz, 0.0);
        assert!(!viz.is_animating());

        assert!(viz.scene().get(PrimitiveKey::Line(0)).is_some());
        let (one, two) = (circle(&viz, 0), circle(&viz, 1));
        assert_eq!(one.r, 5.0);
        assert_eq!(two.r, 30.0);
        assert_eq!(one.fill, Color::GREEN);
        assert_eq!(two.fill, Color::RED);
    }

    #[test]
    fn test_click_zooms_and_settles_on_target() {
        let mut viz = Visualization::default();
        viz.render_packed_graph(&scenario_a()).unwrap();
        let a = circle(&viz, 1);

        assert!(viz.click(a.cx, a.cy, 0.0, false).unwrap());
        settle(&mut viz, 0.0);
        assert_eq!(viz.focus(), Some(NodeId(1)));

        let Some(Mode::Packing(view)) = viz.mode() else {
            panic!("expected packing mode");
        };
        assert_eq!(viz.view(), Some(view.zoom().target_view(NodeId(1)).unwrap()));

        // The focused circle now spans the view minus the margin.
        let zoomed = circle(&viz, 1);
        assert!((zoomed.cx - 300.0).abs() < 1e-9);
    }

    #[test]
    fn test_background_click_returns_to_root() {
        let mut viz = Visualization::default();
        viz.render_packed_graph(&scenario_a()).unwrap();
        viz.click_node(NodeId(2), 0.0, false).unwrap();
        let now = settle(&mut viz, 0.0);

        // The corner misses both children; it lands on the root or on nothing.
        assert!(viz.click(0.0, 0.0, now, false).unwrap());
        settle(&mut viz, now);
        assert_eq!(viz.focus(), Some(NodeId(0)));
    }

    #[test]
    fn test_click_in_force_mode_is_ignored() {
        let mut viz = Visualization::default();
        viz.render_force_graph(&scenario_b()).unwrap();
        assert!(!viz.click(300.0, 200.0, 0.0, false).unwrap());
        assert!(matches!(
            viz.click_node(NodeId(0), 0.0, false),
            Err(VizError::WrongMode { expected: "packing" })
        ));
    }

    #[test]
    fn test_drag_pins_node() {
        let graph = FlatGraph {
            nodes: vec![NodeData {
                id: NodeKey::Number(1),
                name: "solo".into(),
                weight: 1.0,
                rank: 1.0,
                ..Default::default()
            }],
            edges: vec![EdgeData::between(0, 0)],
        };
        let mut viz = Visualization::default();
        viz.render_force_graph(&graph).unwrap();
        let node = circle(&viz, 0);

        assert_eq!(viz.drag_start(node.cx, node.cy).unwrap(), Some(NodeId(0)));
        assert!(viz.is_dragging());
        viz.drag_to(100.0, 50.0);
        viz.frame(16.0);
        let moved = circle(&viz, 0);
        assert_eq!((moved.cx, moved.cy), (100.0, 50.0));

        viz.drag_end();
        assert!(!viz.is_dragging());
        assert_eq!(viz.drag_start(599.0, 399.0).unwrap(), None);
    }

    #[test]
    fn test_mode_switch_cancels_transition() {
        let mut viz = Visualization::default();
        viz.render_packed_graph(&scenario_a()).unwrap();
        viz.click_node(NodeId(1), 0.0, true).unwrap();
        assert!(viz.is_animating());

        viz.render_force_graph(&scenario_b()).unwrap();
        assert_eq!(viz.mode().map(Mode::name), Some("force"));
        assert_eq!(viz.focus(), None);

        let delta = viz.take_dirty();
        assert!(delta.rebuilt);
        assert_eq!(viz.scene().circles().count(), 2);
    }

    #[test]
    fn test_message_and_teardown() {
        let mut viz = Visualization::default();
        viz.render_packed_graph(&scenario_a()).unwrap();
        viz.show_message("Loading...");

        assert!(viz.mode().is_none());
        assert!(viz.scene().is_empty());
        assert_eq!(viz.scene().message(), Some("Loading..."));
        assert!(!viz.frame(0.0));

        let json: serde_json::Value = serde_json::from_str(&viz.scene_json().unwrap()).unwrap();
        assert_eq!(json["message"], "Loading...");
    }

    #[test]
    fn test_empty_force_graph_renders_nothing() {
        let mut viz = Visualization::default();
        viz.render_force_graph(&FlatGraph::default()).unwrap();
        assert!(viz.scene().is_empty());
        settle(&mut viz, 0.0);
    }
}
