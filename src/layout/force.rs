//! Force-directed layout with position Verlet integration.
//!
//! Each tick applies, in order:
//! 1. link springs, moving both endpoints toward `link_distance` (the
//!    correction is split by degree, so hubs move less),
//! 2. gravity toward the canvas center,
//! 3. charge repulsion through a Barnes-Hut quadtree, applied to the
//!    previous position so it shows up as velocity,
//! 4. integration with friction.
//!
//! Every force is scaled by `alpha`, which decays geometrically each tick;
//! the simulation stops once it drops below `alpha_min`. Pinned nodes
//! (fixed or being dragged) keep their position.

use std::f64::consts::PI;

use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};

use super::quadtree::{Bodies, QuadNode};
use super::{Circle, LayoutFrame};
use crate::error::{Result, VizError};
use crate::graph::{GraphEngine, NodeId};

/// Radius of the first ring of the initial phyllotaxis spiral.
const INITIAL_RADIUS: f64 = 10.0;

/// Configuration for the force simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ForceConfig {
    /// Canvas `[width, height]`; gravity pulls toward its center.
    pub size: [f64; 2],
    /// Node charge. Negative values repel.
    pub charge: f64,
    pub link_distance: f64,
    /// Spring stiffness in `0.0..=1.0`.
    pub link_strength: f64,
    /// Velocity retained per tick.
    pub friction: f64,
    pub gravity: f64,
    /// Barnes-Hut accuracy; smaller is more exact.
    pub theta: f64,
    pub alpha_start: f64,
    pub alpha_decay: f64,
    pub alpha_min: f64,
}

impl Default for ForceConfig {
    fn default() -> Self {
        Self {
            size: [600.0, 400.0],
            charge: -30.0,
            link_distance: 5.0,
            link_strength: 0.1,
            friction: 0.9,
            gravity: 0.1,
            theta: 0.8,
            alpha_start: 0.1,
            alpha_decay: 0.99,
            alpha_min: 0.005,
        }
    }
}

/// The force simulation over a `GraphEngine`.
pub struct ForceLayout {
    config: ForceConfig,
    engine: GraphEngine,
    /// Edge endpoints as buffer slots.
    links: Vec<(usize, usize)>,
    /// Rendered radius per node, carried into frames and hit tests.
    radii: Vec<f64>,
    alpha: f64,
    dragged: Option<NodeId>,
    ticks: u64,
}

impl ForceLayout {
    /// Take ownership of the graph and place its nodes on a spiral around
    /// the canvas center, except those that carry their own finite `x` and
    /// `y`. The simulation starts stopped.
    pub fn new(mut engine: GraphEngine, config: ForceConfig) -> Self {
        let [w, h] = config.size;
        let angle_step = PI * (3.0 - 5f64.sqrt());
        let ids: Vec<NodeId> = engine.node_ids().collect();
        for (i, id) in ids.into_iter().enumerate() {
            let given = engine
                .node(id)
                .and_then(|n| n.x.zip(n.y))
                .filter(|(x, y)| x.is_finite() && y.is_finite());
            let (x, y) = given.unwrap_or_else(|| {
                let radius = INITIAL_RADIUS * (0.5 + i as f64).sqrt();
                let angle = i as f64 * angle_step;
                (w / 2.0 + radius * angle.cos(), h / 2.0 + radius * angle.sin())
            });
            engine.set_position(id, x, y);
        }

        let links = engine
            .edges()
            .into_iter()
            .map(|(s, t)| (s.index(), t.index()))
            .collect();
        let radii = vec![0.0; engine.node_count()];

        Self {
            config,
            engine,
            links,
            radii,
            alpha: 0.0,
            dragged: None,
            ticks: 0,
        }
    }

    pub fn config(&self) -> &ForceConfig {
        &self.config
    }

    pub fn engine(&self) -> &GraphEngine {
        &self.engine
    }

    /// Edge endpoints as buffer slots, in edge order.
    pub fn links(&self) -> &[(usize, usize)] {
        &self.links
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn is_running(&self) -> bool {
        self.alpha > 0.0
    }

    /// Number of ticks taken since construction.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn radii(&self) -> &[f64] {
        &self.radii
    }

    /// Set the rendered radius per node. Missing entries count as 0.
    pub fn set_radii(&mut self, mut radii: Vec<f64>) {
        radii.resize(self.engine.node_count(), 0.0);
        self.radii = radii;
    }

    /// Start from rest: drop all momentum and reset alpha.
    pub fn start(&mut self) {
        let ids: Vec<NodeId> = self.engine.node_ids().collect();
        for id in ids {
            if let Some((x, y)) = self.engine.position(id) {
                self.engine.set_position(id, x, y);
            }
        }
        self.alpha = self.config.alpha_start;
        debug!(
            "force layout started: {} nodes, {} links",
            self.engine.node_count(),
            self.links.len()
        );
    }

    /// Reheat without touching momentum.
    pub fn resume(&mut self) {
        self.alpha = self.config.alpha_start;
    }

    pub fn stop(&mut self) {
        self.alpha = 0.0;
    }

    /// Advance one step. Returns false once the simulation has cooled down
    /// (or was stopped), in which case nothing moved.
    pub fn tick(&mut self) -> bool {
        if self.alpha <= 0.0 {
            return false;
        }
        self.alpha *= self.config.alpha_decay;
        if self.alpha < self.config.alpha_min {
            self.alpha = 0.0;
            debug!("force layout cooled after {} ticks", self.ticks);
            return false;
        }

        let alpha = self.alpha;
        let config = &self.config;
        let links = &self.links;
        let sim = self.engine.buffers_mut();
        let n = sim.x.len();

        // Springs.
        for &(s, t) in links {
            let dx = sim.x[t] - sim.x[s];
            let dy = sim.y[t] - sim.y[s];
            let d2 = dx * dx + dy * dy;
            if d2 <= 0.0 {
                continue;
            }
            let d = d2.sqrt();
            let l = alpha * config.link_strength * (d - config.link_distance) / d;
            let (dx, dy) = (dx * l, dy * l);
            let (ws, wt) = (sim.degrees[s] as f64, sim.degrees[t] as f64);
            let k = if ws + wt > 0.0 { ws / (ws + wt) } else { 0.5 };
            sim.x[t] -= dx * k;
            sim.y[t] -= dy * k;
            sim.x[s] += dx * (1.0 - k);
            sim.y[s] += dy * (1.0 - k);
        }

        // Gravity.
        let k = alpha * config.gravity;
        if k != 0.0 {
            let (cx, cy) = (config.size[0] / 2.0, config.size[1] / 2.0);
            for i in 0..n {
                sim.x[i] += (cx - sim.x[i]) * k;
                sim.y[i] += (cy - sim.y[i]) * k;
            }
        }

        // Charge.
        if config.charge != 0.0 && n > 1 {
            let charges = vec![config.charge * alpha; n];
            let bodies = Bodies {
                xs: &*sim.x,
                ys: &*sim.y,
                charges: &charges,
            };
            match QuadNode::build(bodies) {
                Some(tree) => {
                    let theta2 = config.theta * config.theta;
                    let mut pushes = vec![(0.0, 0.0); n];
                    for (i, push) in pushes.iter_mut().enumerate() {
                        if !sim.states[i].is_pinned() {
                            tree.accumulate(bodies, i, theta2, push);
                        }
                    }
                    for (i, (px, py)) in pushes.into_iter().enumerate() {
                        sim.px[i] -= px;
                        sim.py[i] -= py;
                    }
                }
                None => warn!("non-finite node position, skipping charge this tick"),
            }
        }

        // Integrate.
        for i in 0..n {
            if sim.states[i].is_pinned() {
                sim.x[i] = sim.px[i];
                sim.y[i] = sim.py[i];
            } else {
                let (x, y) = (sim.x[i], sim.y[i]);
                sim.x[i] -= (sim.px[i] - x) * config.friction;
                sim.y[i] -= (sim.py[i] - y) * config.friction;
                sim.px[i] = x;
                sim.py[i] = y;
            }
        }

        self.ticks += 1;
        trace!("tick {} alpha {alpha:.4}", self.ticks);
        true
    }

    /// Current positions and radii.
    pub fn frame(&self) -> LayoutFrame {
        let xs = self.engine.positions_x();
        let ys = self.engine.positions_y();
        LayoutFrame::new(
            xs.iter()
                .zip(ys)
                .zip(&self.radii)
                .map(|((&x, &y), &r)| Circle { x, y, r })
                .collect(),
        )
    }

    /// Lazily step the simulation, yielding a frame per tick until it
    /// cools down.
    pub fn frames(&mut self) -> Frames<'_> {
        Frames { layout: self }
    }

    // =========================================================================
    // Dragging
    // =========================================================================

    /// Node under a layout-space point, using the rendered radii.
    pub fn node_at(&mut self, x: f64, y: f64) -> Option<NodeId> {
        self.engine.node_at(x, y, &self.radii)
    }

    pub fn dragged(&self) -> Option<NodeId> {
        self.dragged
    }

    /// Pin `id` under the pointer. Any previous drag is released first.
    pub fn drag_start(&mut self, id: NodeId) -> Result<()> {
        if !self.engine.contains(id) {
            return Err(VizError::UnknownNode(id));
        }
        self.drag_end();
        if let Some(state) = self.engine.state_mut(id) {
            state.set_dragging(true);
        }
        self.dragged = Some(id);
        self.resume();
        Ok(())
    }

    /// Move the dragged node and reheat. No-op without an active drag or
    /// for a non-finite point.
    pub fn drag_to(&mut self, x: f64, y: f64) {
        if !(x.is_finite() && y.is_finite()) {
            warn!("ignoring drag to non-finite point ({x}, {y})");
            return;
        }
        if let Some(id) = self.dragged {
            self.engine.set_position(id, x, y);
            self.resume();
        }
    }

    /// Release the dragged node back to the simulation.
    pub fn drag_end(&mut self) {
        if let Some(id) = self.dragged.take() {
            if let Some(state) = self.engine.state_mut(id) {
                state.set_dragging(false);
            }
        }
    }
}

/// Iterator over simulation frames; see [`ForceLayout::frames`].
pub struct Frames<'a> {
    layout: &'a mut ForceLayout,
}

impl Iterator for Frames<'_> {
    type Item = LayoutFrame;

    fn next(&mut self) -> Option<LayoutFrame> {
        self.layout.tick().then(|| self.layout.frame())
    }
}
