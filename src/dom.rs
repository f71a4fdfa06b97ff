//! Browser binding.
//!
//! Mirrors the [`Scene`] into SVG elements inside a mount point, drives
//! [`Visualization::frame`] from `requestAnimationFrame` while something
//! is animating, and forwards pointer events. Elements are created on a
//! rebuild and only have their attributes touched afterwards.
//!
//! Shared state lives behind an `Rc`; every JS callback holds a `Weak`, so
//! dropping the [`App`] cancels the pending frame, detaches the listeners
//! and empties the mount point.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use log::{debug, error, warn};
use wasm_bindgen::prelude::*;
use web_sys::{Document, Element, MouseEvent, Window};

use crate::config::VizConfig;
use crate::error::{Result, VizError};
use crate::fetch::{self, Action, GraphPayload};
use crate::graph::{FlatGraph, GraphNode};
use crate::render::{Primitive, PrimitiveKey, Scene, SceneDelta};
use crate::viz::Visualization;

const SVG_NS: &str = "http://www.w3.org/2000/svg";

fn window() -> Result<Window> {
    web_sys::window().ok_or_else(|| VizError::Js("no global window".into()))
}

/// Milliseconds on the clock shared by frames and clicks.
pub fn now_ms() -> f64 {
    web_sys::window()
        .and_then(|w| w.performance())
        .map_or_else(js_sys::Date::now, |p| p.now())
}

// =============================================================================
// SVG Mount
// =============================================================================

struct SvgMount {
    document: Document,
    container: Element,
    svg: Element,
    /// Prefix for element ids, so two mounts on one page do not collide.
    prefix: String,
    elements: HashMap<PrimitiveKey, Element>,
}

impl SvgMount {
    fn new(mount_id: &str) -> Result<Self> {
        let document = window()?
            .document()
            .ok_or_else(|| VizError::Js("no document".into()))?;
        let container = document
            .get_element_by_id(mount_id)
            .ok_or_else(|| VizError::MountNotFound(mount_id.to_string()))?;
        let svg = document.create_element_ns(Some(SVG_NS), "svg")?;
        Ok(Self {
            document,
            container,
            svg,
            prefix: mount_id.to_string(),
            elements: HashMap::new(),
        })
    }

    fn sync(&mut self, scene: &Scene, delta: &SceneDelta) -> Result<()> {
        if delta.rebuilt {
            return self.rebuild(scene);
        }
        for key in &delta.changed {
            if let (Some(element), Some(primitive)) = (self.elements.get(key), scene.get(*key)) {
                apply(element, primitive)?;
            }
        }
        Ok(())
    }

    fn rebuild(&mut self, scene: &Scene) -> Result<()> {
        self.clear();
        if let Some(message) = scene.message() {
            self.container.set_text_content(Some(message));
            return Ok(());
        }

        self.svg.set_attribute("width", &scene.width().to_string())?;
        self.svg.set_attribute("height", &scene.height().to_string())?;
        for (key, primitive) in scene.iter() {
            let tag = match primitive {
                Primitive::Circle(_) => "circle",
                Primitive::Line(_) => "line",
                Primitive::Text(_) => "text",
            };
            let element = self.document.create_element_ns(Some(SVG_NS), tag)?;
            element.set_id(&format!("{}-{}", self.prefix, key.dom_id()));
            if let Primitive::Text(text) = primitive {
                element.set_text_content(Some(&text.text));
            }
            apply(&element, primitive)?;
            self.svg.append_child(&element)?;
            self.elements.insert(key, element);
        }
        self.container.append_child(&self.svg)?;
        debug!("mounted {} svg elements in #{}", self.elements.len(), self.prefix);
        Ok(())
    }

    fn clear(&mut self) {
        self.container.set_inner_html("");
        self.svg.set_inner_html("");
        self.elements.clear();
    }

    /// Pointer position in SVG pixels.
    fn pointer(&self, event: &MouseEvent) -> (f64, f64) {
        let rect = self.svg.get_bounding_client_rect();
        (
            event.client_x() as f64 - rect.left(),
            event.client_y() as f64 - rect.top(),
        )
    }
}

fn apply(element: &Element, primitive: &Primitive) -> Result<()> {
    match primitive {
        Primitive::Circle(c) => {
            element.set_attribute("class", c.class)?;
            element.set_attribute("cx", &c.cx.to_string())?;
            element.set_attribute("cy", &c.cy.to_string())?;
            element.set_attribute("r", &c.r.to_string())?;
            element.set_attribute("fill", &c.fill.to_string())?;
        }
        Primitive::Line(l) => {
            element.set_attribute("class", l.class)?;
            element.set_attribute("x1", &l.x1.to_string())?;
            element.set_attribute("y1", &l.y1.to_string())?;
            element.set_attribute("x2", &l.x2.to_string())?;
            element.set_attribute("y2", &l.y2.to_string())?;
        }
        Primitive::Text(t) => {
            element.set_attribute("x", &t.x.to_string())?;
            element.set_attribute("y", &t.y.to_string())?;
            if let Some(dy) = t.dy {
                element.set_attribute("dy", dy)?;
            }
            if let Some(class) = t.class {
                element.set_attribute("class", class)?;
            }
            let display = if t.display { "inline" } else { "none" };
            element.set_attribute(
                "style",
                &format!("fill-opacity: {}; display: {display}", t.opacity),
            )?;
        }
    }
    Ok(())
}

// =============================================================================
// Shared State
// =============================================================================

type MouseHandler = fn(&State, &MouseEvent);

struct State {
    viz: RefCell<Visualization>,
    mount: RefCell<SvgMount>,
    /// Handle of the pending animation frame request.
    raf: Cell<Option<i32>>,
    /// Bumped whenever the shown graph is replaced; fetch completions from
    /// an older generation are dropped.
    generation: Cell<u64>,
    on_frame: RefCell<Option<Closure<dyn FnMut(f64)>>>,
    listeners: RefCell<Vec<(&'static str, Closure<dyn FnMut(MouseEvent)>)>>,
}

impl State {
    fn sync(&self) {
        let mut viz = self.viz.borrow_mut();
        let delta = viz.take_dirty();
        if delta.is_empty() {
            return;
        }
        if let Err(err) = self.mount.borrow_mut().sync(viz.scene(), &delta) {
            error!("failed to update svg: {err}");
        }
    }

    fn schedule(&self) {
        if self.raf.get().is_some() || !self.viz.borrow().is_animating() {
            return;
        }
        let on_frame = self.on_frame.borrow();
        let Some(callback) = on_frame.as_ref() else {
            return;
        };
        let request = window().and_then(|w| {
            w.request_animation_frame(callback.as_ref().unchecked_ref())
                .map_err(VizError::from)
        });
        match request {
            Ok(handle) => self.raf.set(Some(handle)),
            Err(err) => warn!("could not schedule animation frame: {err}"),
        }
    }

    fn cancel_frame(&self) {
        if let Some(handle) = self.raf.take() {
            if let Ok(w) = window() {
                let _ = w.cancel_animation_frame(handle);
            }
        }
    }

    fn frame(&self) {
        self.raf.set(None);
        self.viz.borrow_mut().frame(now_ms());
        self.sync();
        self.schedule();
    }

    /// Run an interaction against the visualization, then sync and keep
    /// the loop going if it started an animation.
    fn update<R>(&self, f: impl FnOnce(&mut Visualization) -> R) -> R {
        let result = f(&mut *self.viz.borrow_mut());
        self.sync();
        self.schedule();
        result
    }

    /// Replace the shown graph. Failures are shown inline.
    fn replace(&self, f: impl FnOnce(&mut Visualization) -> Result<()>) -> Result<()> {
        self.cancel_frame();
        self.generation.set(self.generation.get() + 1);
        let result = f(&mut *self.viz.borrow_mut());
        if let Err(err) = &result {
            error!("render failed: {err}");
            self.viz.borrow_mut().show_message(err.to_string());
        }
        self.sync();
        self.schedule();
        result
    }

    fn show_message(&self, message: String) {
        let _ = self.replace(|viz| {
            viz.show_message(message);
            Ok(())
        });
    }

    fn apply_payload(&self, outcome: Result<GraphPayload>) {
        let _ = match outcome {
            Ok(GraphPayload::Page(graph)) => self.replace(|viz| viz.render_force_graph(&graph)),
            Ok(GraphPayload::Category(root)) => self.replace(|viz| viz.render_packed_graph(&root)),
            Err(err) => {
                self.show_message(err.to_string());
                Ok(())
            }
        };
    }
}

impl Drop for State {
    fn drop(&mut self) {
        self.cancel_frame();
        let mount = self.mount.get_mut();
        for (event, listener) in self.listeners.get_mut().drain(..) {
            let _ = mount
                .svg
                .remove_event_listener_with_callback(event, listener.as_ref().unchecked_ref());
        }
        mount.clear();
    }
}

fn on_click(state: &State, event: &MouseEvent) {
    let (x, y) = state.mount.borrow().pointer(event);
    let slow = event.alt_key();
    if let Err(err) = state.update(|viz| viz.click(x, y, now_ms(), slow)) {
        warn!("click at ({x}, {y}) ignored: {err}");
    }
}

fn on_mouse_down(state: &State, event: &MouseEvent) {
    let (x, y) = state.mount.borrow().pointer(event);
    match state.update(|viz| viz.drag_start(x, y)) {
        Ok(Some(_)) => event.prevent_default(),
        Ok(None) => {}
        Err(err) => warn!("drag start ignored: {err}"),
    }
}

fn on_mouse_move(state: &State, event: &MouseEvent) {
    if !state.viz.borrow().is_dragging() {
        return;
    }
    let (x, y) = state.mount.borrow().pointer(event);
    state.update(|viz| viz.drag_to(x, y));
}

fn on_mouse_up(state: &State, _event: &MouseEvent) {
    state.update(Visualization::drag_end);
}

// =============================================================================
// App
// =============================================================================

/// A visualization mounted into a DOM element.
pub struct App {
    state: Rc<State>,
}

impl App {
    /// Attach to the element with id `mount_id`.
    pub fn mount(mount_id: &str, config: VizConfig) -> Result<Self> {
        let mount = SvgMount::new(mount_id)?;
        let state = Rc::new(State {
            viz: RefCell::new(Visualization::new(config)),
            mount: RefCell::new(mount),
            raf: Cell::new(None),
            generation: Cell::new(0),
            on_frame: RefCell::new(None),
            listeners: RefCell::new(Vec::new()),
        });

        let weak = Rc::downgrade(&state);
        *state.on_frame.borrow_mut() = Some(Closure::new(move |_timestamp: f64| {
            if let Some(state) = weak.upgrade() {
                state.frame();
            }
        }));

        let handlers: [(&'static str, MouseHandler); 5] = [
            ("click", on_click),
            ("mousedown", on_mouse_down),
            ("mousemove", on_mouse_move),
            ("mouseup", on_mouse_up),
            ("mouseleave", on_mouse_up),
        ];
        for (event, handler) in handlers {
            let weak = Rc::downgrade(&state);
            let listener = Closure::<dyn FnMut(MouseEvent)>::new(move |ev: MouseEvent| {
                if let Some(state) = weak.upgrade() {
                    handler(&state, &ev);
                }
            });
            state
                .mount
                .borrow()
                .svg
                .add_event_listener_with_callback(event, listener.as_ref().unchecked_ref())?;
            state.listeners.borrow_mut().push((event, listener));
        }

        debug!("mounted visualization in #{mount_id}");
        Ok(Self { state })
    }

    pub fn render_packed_graph(&self, root: &GraphNode) -> Result<()> {
        self.state.replace(|viz| viz.render_packed_graph(root))
    }

    pub fn render_force_graph(&self, graph: &FlatGraph) -> Result<()> {
        self.state.replace(|viz| viz.render_force_graph(graph))
    }

    /// Show "Loading..." and fetch a graph; the response replaces the
    /// message unless something else was shown in the meantime.
    pub fn fetch_graph(&self, action: Action) -> Result<()> {
        self.state.show_message("Loading...".to_string());
        let generation = self.state.generation.get();
        let endpoint = self.state.viz.borrow().config().endpoint().to_string();

        let weak = Rc::downgrade(&self.state);
        let sent = fetch::fetch_graph(&endpoint, action, move |outcome| {
            let Some(state) = weak.upgrade() else {
                return;
            };
            if state.generation.get() != generation {
                debug!("dropping stale {action} response");
                return;
            }
            state.apply_payload(outcome);
        });
        if let Err(err) = &sent {
            error!("{action} request not sent: {err}");
            self.state.show_message(err.to_string());
        }
        sent
    }

    pub fn click(&self, x: f64, y: f64, slow: bool) -> Result<bool> {
        self.state.update(|viz| viz.click(x, y, now_ms(), slow))
    }

    pub fn drag_start(&self, x: f64, y: f64) -> Result<Option<u32>> {
        self.state
            .update(|viz| viz.drag_start(x, y))
            .map(|node| node.map(u32::from))
    }

    pub fn drag_to(&self, x: f64, y: f64) {
        self.state.update(|viz| viz.drag_to(x, y));
    }

    pub fn drag_end(&self) {
        self.state.update(Visualization::drag_end);
    }

    /// Advance by hand, e.g. when the page drives its own loop.
    pub fn frame(&self, now_ms: f64) -> bool {
        self.state.update(|viz| viz.frame(now_ms))
    }

    pub fn teardown(&self) {
        let _ = self.state.replace(|viz| {
            viz.teardown();
            Ok(())
        });
    }

    pub fn show_message(&self, message: &str) {
        self.state.show_message(message.to_string());
    }

    pub fn scene_json(&self) -> Result<String> {
        self.state.viz.borrow().scene_json()
    }

    pub fn focus(&self) -> Option<u32> {
        self.state.viz.borrow().focus().map(u32::from)
    }
}
