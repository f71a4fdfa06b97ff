//! Zoom/focus controller for the packing view.
//!
//! The controller owns the [`ViewState`] (focused node plus the visible
//! window `[x, y, width]` in layout space) and the per-label visibility.
//! Clicking a node starts a timed transition that flies the view to that
//! node's circle; frames are pulled with [`ZoomController::advance`], so
//! the controller runs the same under a browser animation loop and in
//! tests.
//!
//! The flight path follows van Wijk and Nuij's smooth zoom: zoom out,
//! pan, zoom back in, with a constant perceived speed.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::{Result, VizError};
use crate::graph::{Hierarchy, NodeId};
use crate::layout::{Circle, LayoutFrame};

const RHO: f64 = std::f64::consts::SQRT_2;
const EPSILON2: f64 = 1e-12;
/// Narrowest view in layout units; keeps the screen scale finite.
const MIN_VIEW_WIDTH: f64 = 1e-6;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ZoomConfig {
    /// Side of the square drawing area in pixels.
    pub diameter: f64,
    /// Extra layout-space width around a focused circle.
    pub margin: f64,
    pub duration_ms: f64,
    /// Duration multiplier for slow (modifier-held) zooms.
    pub slow_factor: f64,
}

impl Default for ZoomConfig {
    fn default() -> Self {
        Self {
            diameter: 600.0,
            margin: 20.0,
            duration_ms: 750.0,
            slow_factor: 10.0,
        }
    }
}

/// Visible window: center `(x, y)` and `width`, all in layout units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct View {
    pub x: f64,
    pub y: f64,
    pub width: f64,
}

impl View {
    pub fn new(x: f64, y: f64, width: f64) -> Self {
        Self { x, y, width }
    }
}

/// Focus and view of the packing visualization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewState {
    pub focus: NodeId,
    pub view: View,
}

/// Smooth zoom between two views.
#[derive(Debug, Clone, Copy)]
pub struct ZoomInterpolator {
    from: View,
    to: View,
    dx: f64,
    dy: f64,
    d1: f64,
    r0: f64,
    s: f64,
    path: Path,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Path {
    /// Pan and zoom along the optimal curve.
    Curve,
    /// Same center: pure exponential zoom.
    ZoomOnly,
    /// Degenerate widths: straight interpolation.
    Linear,
}

impl ZoomInterpolator {
    pub fn new(from: View, to: View) -> Self {
        let (w0, w1) = (from.width, to.width);
        let dx = to.x - from.x;
        let dy = to.y - from.y;
        let d2 = dx * dx + dy * dy;
        let d1 = d2.sqrt();
        let rho2 = RHO * RHO;
        let rho4 = rho2 * rho2;

        let mut interp = Self {
            from,
            to,
            dx,
            dy,
            d1,
            r0: 0.0,
            s: 0.0,
            path: Path::Linear,
        };

        if !(w0 > 0.0 && w1 > 0.0 && w0.is_finite() && w1.is_finite()) {
            return interp;
        }

        if d2 < EPSILON2 {
            interp.s = (w1 / w0).ln() / RHO;
            interp.path = Path::ZoomOnly;
        } else {
            let b0 = (w1 * w1 - w0 * w0 + rho4 * d2) / (2.0 * w0 * rho2 * d1);
            let b1 = (w1 * w1 - w0 * w0 - rho4 * d2) / (2.0 * w1 * rho2 * d1);
            let r0 = ((b0 * b0 + 1.0).sqrt() - b0).ln();
            let r1 = ((b1 * b1 + 1.0).sqrt() - b1).ln();
            interp.r0 = r0;
            interp.s = (r1 - r0) / RHO;
            interp.path = Path::Curve;
        }
        interp
    }

    /// View at progress `t` in `0.0..=1.0`.
    pub fn at(&self, t: f64) -> View {
        let View { x: ux0, y: uy0, width: w0 } = self.from;
        match self.path {
            Path::Curve => {
                let s = t * self.s;
                let cosh_r0 = self.r0.cosh();
                let u = w0 / (RHO * RHO * self.d1)
                    * (cosh_r0 * (RHO * s + self.r0).tanh() - self.r0.sinh());
                View::new(
                    ux0 + u * self.dx,
                    uy0 + u * self.dy,
                    w0 * cosh_r0 / (RHO * s + self.r0).cosh(),
                )
            }
            Path::ZoomOnly => View::new(
                ux0 + t * self.dx,
                uy0 + t * self.dy,
                w0 * (RHO * t * self.s).exp(),
            ),
            Path::Linear => View::new(
                ux0 + t * self.dx,
                uy0 + t * self.dy,
                w0 + t * (self.to.width - w0),
            ),
        }
    }
}

/// Cubic ease-in-out on `0.0..=1.0`.
pub fn ease_cubic_in_out(t: f64) -> f64 {
    if t <= 0.0 {
        return 0.0;
    }
    if t >= 1.0 {
        return 1.0;
    }
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        let u = 2.0 * t - 2.0;
        0.5 * u * u * u + 1.0
    }
}

/// Visibility of one node label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LabelState {
    pub opacity: f64,
    pub display: bool,
}

impl LabelState {
    const SHOWN: Self = Self {
        opacity: 1.0,
        display: true,
    };
    const HIDDEN: Self = Self {
        opacity: 0.0,
        display: false,
    };

    pub fn is_visible(&self) -> bool {
        self.display && self.opacity > 0.0
    }
}

#[derive(Debug, Clone)]
struct Transition {
    path: ZoomInterpolator,
    start_ms: f64,
    duration_ms: f64,
    /// Opacity at transition start and end, per label.
    opacity: Vec<(f64, f64)>,
}

/// Click-to-zoom state machine: `Idle(focus)` or transitioning toward it.
pub struct ZoomController {
    config: ZoomConfig,
    circles: LayoutFrame,
    parents: Vec<Option<NodeId>>,
    depths: Vec<u32>,
    root: NodeId,
    state: ViewState,
    labels: Vec<LabelState>,
    transition: Option<Transition>,
}

impl ZoomController {
    /// Focus the root of a packed hierarchy.
    pub fn new(hierarchy: &Hierarchy, circles: LayoutFrame, config: ZoomConfig) -> Result<Self> {
        if hierarchy.is_empty() {
            return Err(VizError::EmptyGraph);
        }
        let root = hierarchy.root();
        let parents: Vec<Option<NodeId>> = hierarchy.iter().map(|(_, n)| n.parent).collect();
        let depths = hierarchy.iter().map(|(_, n)| n.depth).collect();
        let labels = parents
            .iter()
            .map(|p| if *p == Some(root) { LabelState::SHOWN } else { LabelState::HIDDEN })
            .collect();

        let mut controller = Self {
            config,
            circles,
            parents,
            depths,
            root,
            state: ViewState {
                focus: root,
                view: View::new(0.0, 0.0, 1.0),
            },
            labels,
            transition: None,
        };
        controller.state.view = controller.target_view(root)?;
        Ok(controller)
    }

    pub fn config(&self) -> &ZoomConfig {
        &self.config
    }

    pub fn state(&self) -> ViewState {
        self.state
    }

    pub fn focus(&self) -> NodeId {
        self.state.focus
    }

    pub fn view(&self) -> View {
        self.state.view
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn labels(&self) -> &[LabelState] {
        &self.labels
    }

    pub fn circles(&self) -> &LayoutFrame {
        &self.circles
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.parents.get(id.index()).copied().flatten()
    }

    pub fn is_transitioning(&self) -> bool {
        self.transition.is_some()
    }

    /// View that frames `id`: its center, width `2r + margin`, never
    /// narrower than `MIN_VIEW_WIDTH`.
    pub fn target_view(&self, id: NodeId) -> Result<View> {
        let c = self.circles.get(id).ok_or(VizError::UnknownNode(id))?;
        let width = 2.0 * c.r + self.config.margin;
        if width.is_nan() || width < MIN_VIEW_WIDTH {
            warn!("{id} has view width {width}, clamping to {MIN_VIEW_WIDTH}");
            return Ok(View::new(c.x, c.y, MIN_VIEW_WIDTH));
        }
        Ok(View::new(c.x, c.y, width))
    }

    /// Zoom to `node`. Clicking the current focus does nothing.
    ///
    /// A click during a transition supersedes it, starting from wherever the
    /// view and labels are at `now_ms`. Returns whether a transition
    /// started.
    pub fn click(&mut self, node: NodeId, now_ms: f64, slow: bool) -> Result<bool> {
        let target = self.target_view(node)?;
        if node == self.state.focus {
            return Ok(false);
        }

        self.advance(now_ms);
        let from = self.state.view;
        self.state.focus = node;

        let opacity = self
            .labels
            .iter_mut()
            .zip(&self.parents)
            .map(|(label, parent)| {
                let owned = *parent == Some(node);
                if owned {
                    label.display = true;
                }
                if owned || label.display {
                    (label.opacity, if owned { 1.0 } else { 0.0 })
                } else {
                    (label.opacity, label.opacity)
                }
            })
            .collect();

        let duration_ms = if slow {
            self.config.duration_ms * self.config.slow_factor
        } else {
            self.config.duration_ms
        };
        debug!("zoom to {node} over {duration_ms} ms");

        self.transition = Some(Transition {
            path: ZoomInterpolator::new(from, target),
            start_ms: now_ms,
            duration_ms,
            opacity,
        });
        Ok(true)
    }

    /// Zoom back to the root, as a click on the empty background does.
    pub fn click_background(&mut self, now_ms: f64, slow: bool) -> Result<bool> {
        self.click(self.root, now_ms, slow)
    }

    /// Move the active transition to `now_ms`. Returns whether it is still
    /// running afterwards.
    pub fn advance(&mut self, now_ms: f64) -> bool {
        let Some(transition) = &self.transition else {
            return false;
        };

        let elapsed = now_ms - transition.start_ms;
        let t = if transition.duration_ms > 0.0 {
            (elapsed / transition.duration_ms).clamp(0.0, 1.0)
        } else {
            1.0
        };
        let done = t >= 1.0;
        let e = ease_cubic_in_out(t);

        if done {
            self.state.view = self.target_view(self.state.focus).unwrap_or(self.state.view);
        } else {
            self.state.view = transition.path.at(e);
        }
        for (label, (from, to)) in self.labels.iter_mut().zip(&transition.opacity) {
            label.opacity = if done { *to } else { from + (to - from) * e };
        }

        if done {
            let focus = self.state.focus;
            for (label, parent) in self.labels.iter_mut().zip(&self.parents) {
                if *parent != Some(focus) {
                    label.display = false;
                }
            }
            self.transition = None;
            debug!("zoom settled on {focus}");
        }
        !done
    }

    /// Drop the active transition, leaving view and labels where they are.
    pub fn cancel(&mut self) {
        self.transition = None;
    }

    // =========================================================================
    // Screen Transform
    // =========================================================================

    /// Layout-to-screen scale for the current view.
    pub fn scale(&self) -> f64 {
        self.config.diameter / self.state.view.width
    }

    /// Circle in screen pixels for the current view.
    pub fn view_to_screen(&self, c: &Circle) -> Circle {
        let k = self.scale();
        let half = self.config.diameter / 2.0;
        let v = self.state.view;
        Circle::new((c.x - v.x) * k + half, (c.y - v.y) * k + half, c.r * k)
    }

    /// Screen pixel to layout coordinates.
    pub fn screen_to_layout(&self, sx: f64, sy: f64) -> (f64, f64) {
        let k = self.scale();
        let half = self.config.diameter / 2.0;
        let v = self.state.view;
        ((sx - half) / k + v.x, (sy - half) / k + v.y)
    }

    /// Deepest circle under a screen point.
    pub fn hit_test(&self, sx: f64, sy: f64) -> Option<NodeId> {
        let (x, y) = self.screen_to_layout(sx, sy);
        self.circles
            .iter()
            .filter(|(_, c)| c.r > 0.0 && c.contains_point(x, y))
            .max_by_key(|(id, _)| (self.depths.get(id.index()).copied().unwrap_or(0), *id))
            .map(|(id, _)| id)
    }
}
