//! Retained scene of keyed drawing primitives.
//!
//! Renderers write into the scene; the DOM binding reads it. Setters only
//! mark a primitive dirty when an attribute actually changes, so a frame
//! in which nothing moved costs the DOM nothing. A full redraw (`clear`)
//! flags the scene as rebuilt, telling the binding to recreate elements.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Serialize, Serializer};

use crate::scale::Color;

/// How primitives stack when painted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaintOrder {
    /// Lines, then every circle, then every label.
    #[default]
    Layered,
    /// Lines, then each node's circle immediately followed by its label.
    Grouped,
}

/// Identity of a primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "kind", content = "index", rename_all = "camelCase")]
pub enum PrimitiveKey {
    Line(u32),
    Circle(u32),
    Text(u32),
}

impl PrimitiveKey {
    /// Stable DOM id fragment, e.g. `circle-3`.
    pub fn dom_id(self) -> String {
        match self {
            Self::Line(i) => format!("line-{i}"),
            Self::Circle(i) => format!("circle-{i}"),
            Self::Text(i) => format!("text-{i}"),
        }
    }

    fn paint_rank(self, order: PaintOrder) -> (u8, u32, u8) {
        match (self, order) {
            (Self::Line(i), _) => (0, i, 0),
            (Self::Circle(i), _) => (1, i, 0),
            (Self::Text(i), PaintOrder::Layered) => (2, i, 0),
            (Self::Text(i), PaintOrder::Grouped) => (1, i, 1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CircleShape {
    pub cx: f64,
    pub cy: f64,
    pub r: f64,
    pub fill: Color,
    pub class: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineShape {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub class: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextShape {
    pub x: f64,
    pub y: f64,
    /// Vertical offset as a CSS length, e.g. `.35em`.
    pub dy: Option<&'static str>,
    pub text: String,
    pub class: Option<&'static str>,
    pub opacity: f64,
    pub display: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Primitive {
    Circle(CircleShape),
    Line(LineShape),
    Text(TextShape),
}

/// Changes since the last [`Scene::take_dirty`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneDelta {
    /// The scene was cleared and rebuilt; every element must be recreated.
    pub rebuilt: bool,
    /// Primitives whose attributes changed.
    pub changed: Vec<PrimitiveKey>,
}

impl SceneDelta {
    pub fn is_empty(&self) -> bool {
        !self.rebuilt && self.changed.is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Scene {
    width: f64,
    height: f64,
    #[serde(serialize_with = "serialize_primitives")]
    primitives: BTreeMap<PrimitiveKey, Primitive>,
    /// Inline status text shown instead of (or above) the drawing.
    message: Option<String>,
    #[serde(skip)]
    order: PaintOrder,
    #[serde(skip)]
    dirty: BTreeSet<PrimitiveKey>,
    #[serde(skip)]
    rebuilt: bool,
}

impl Scene {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    /// Remove every primitive and the message; resize the canvas.
    pub fn clear(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
        self.primitives.clear();
        self.message = None;
        self.dirty.clear();
        self.rebuilt = true;
    }

    pub fn paint_order(&self) -> PaintOrder {
        self.order
    }

    /// Takes effect on the next rebuild.
    pub fn set_paint_order(&mut self, order: PaintOrder) {
        if self.order != order {
            self.order = order;
            self.rebuilt = true;
        }
    }

    pub fn insert(&mut self, key: PrimitiveKey, primitive: Primitive) {
        self.primitives.insert(key, primitive);
        self.dirty.insert(key);
    }

    pub fn get(&self, key: PrimitiveKey) -> Option<&Primitive> {
        self.primitives.get(&key)
    }

    pub fn len(&self) -> usize {
        self.primitives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }

    /// Primitives in paint order.
    pub fn iter(&self) -> impl Iterator<Item = (PrimitiveKey, &Primitive)> {
        let mut entries: Vec<_> = self.primitives.iter().map(|(k, p)| (*k, p)).collect();
        entries.sort_by_key(|(key, _)| key.paint_rank(self.order));
        entries.into_iter()
    }

    pub fn circles(&self) -> impl Iterator<Item = (u32, &CircleShape)> {
        self.primitives.iter().filter_map(|(k, p)| match (k, p) {
            (PrimitiveKey::Circle(i), Primitive::Circle(c)) => Some((*i, c)),
            _ => None,
        })
    }

    pub fn texts(&self) -> impl Iterator<Item = (u32, &TextShape)> {
        self.primitives.iter().filter_map(|(k, p)| match (k, p) {
            (PrimitiveKey::Text(i), Primitive::Text(t)) => Some((*i, t)),
            _ => None,
        })
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Show inline status text, or remove it with `None`.
    pub fn set_message(&mut self, message: Option<String>) {
        if self.message != message {
            self.message = message;
            self.rebuilt = true;
        }
    }

    /// Move and resize a circle.
    pub fn set_circle(&mut self, index: u32, cx: f64, cy: f64, r: f64) {
        let key = PrimitiveKey::Circle(index);
        if let Some(Primitive::Circle(c)) = self.primitives.get_mut(&key) {
            if (c.cx, c.cy, c.r) != (cx, cy, r) {
                c.cx = cx;
                c.cy = cy;
                c.r = r;
                self.dirty.insert(key);
            }
        }
    }

    pub fn set_line(&mut self, index: u32, x1: f64, y1: f64, x2: f64, y2: f64) {
        let key = PrimitiveKey::Line(index);
        if let Some(Primitive::Line(l)) = self.primitives.get_mut(&key) {
            if (l.x1, l.y1, l.x2, l.y2) != (x1, y1, x2, y2) {
                l.x1 = x1;
                l.y1 = y1;
                l.x2 = x2;
                l.y2 = y2;
                self.dirty.insert(key);
            }
        }
    }

    pub fn set_text_position(&mut self, index: u32, x: f64, y: f64) {
        let key = PrimitiveKey::Text(index);
        if let Some(Primitive::Text(t)) = self.primitives.get_mut(&key) {
            if (t.x, t.y) != (x, y) {
                t.x = x;
                t.y = y;
                self.dirty.insert(key);
            }
        }
    }

    pub fn set_text_visibility(&mut self, index: u32, opacity: f64, display: bool) {
        let key = PrimitiveKey::Text(index);
        if let Some(Primitive::Text(t)) = self.primitives.get_mut(&key) {
            if (t.opacity, t.display) != (opacity, display) {
                t.opacity = opacity;
                t.display = display;
                self.dirty.insert(key);
            }
        }
    }

    /// Drain the change set.
    pub fn take_dirty(&mut self) -> SceneDelta {
        let delta = SceneDelta {
            rebuilt: std::mem::take(&mut self.rebuilt),
            changed: std::mem::take(&mut self.dirty).into_iter().collect(),
        };
        if delta.rebuilt {
            SceneDelta {
                rebuilt: true,
                changed: self.primitives.keys().copied().collect(),
            }
        } else {
            delta
        }
    }

    /// JSON snapshot of the whole scene.
    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Primitives as a flat list, each tagged with its DOM id.
fn serialize_primitives<S: Serializer>(
    primitives: &BTreeMap<PrimitiveKey, Primitive>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    #[derive(Serialize)]
    struct Entry<'a> {
        id: String,
        #[serde(flatten)]
        primitive: &'a Primitive,
    }

    serializer.collect_seq(primitives.iter().map(|(key, primitive)| Entry {
        id: key.dom_id(),
        primitive,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn circle(cx: f64) -> Primitive {
        Primitive::Circle(CircleShape {
            cx,
            cy: 0.0,
            r: 1.0,
            fill: Color::BLACK,
            class: "node",
        })
    }

    #[test]
    fn test_paint_order() {
        let mut scene = Scene::new(10.0, 10.0);
        scene.insert(PrimitiveKey::Text(0), Primitive::Text(TextShape {
            x: 0.0,
            y: 0.0,
            dy: None,
            text: "a".into(),
            class: None,
            opacity: 1.0,
            display: true,
        }));
        scene.insert(PrimitiveKey::Circle(0), circle(0.0));
        scene.insert(PrimitiveKey::Line(0), Primitive::Line(LineShape {
            x1: 0.0,
            y1: 0.0,
            x2: 1.0,
            y2: 1.0,
            class: "link",
        }));
        let keys: Vec<_> = scene.iter().map(|(k, _)| k).collect();
        assert_eq!(
            keys,
            vec![PrimitiveKey::Line(0), PrimitiveKey::Circle(0), PrimitiveKey::Text(0)]
        );
    }

    #[test]
    fn test_grouped_paint_order() {
        let mut scene = Scene::new(10.0, 10.0);
        for i in 0..2 {
            scene.insert(PrimitiveKey::Circle(i), circle(i as f64));
            scene.insert(PrimitiveKey::Text(i), Primitive::Text(TextShape {
                x: 0.0,
                y: 0.0,
                dy: None,
                text: format!("t{i}"),
                class: None,
                opacity: 1.0,
                display: true,
            }));
        }
        scene.take_dirty();
        scene.set_paint_order(PaintOrder::Grouped);
        assert!(scene.take_dirty().rebuilt);

        let keys: Vec<_> = scene.iter().map(|(k, _)| k).collect();
        assert_eq!(
            keys,
            vec![
                PrimitiveKey::Circle(0),
                PrimitiveKey::Text(0),
                PrimitiveKey::Circle(1),
                PrimitiveKey::Text(1),
            ]
        );
    }

    #[test]
    fn test_dirty_tracking_only_on_change() {
        let mut scene = Scene::new(10.0, 10.0);
        scene.clear(10.0, 10.0);
        scene.insert(PrimitiveKey::Circle(0), circle(0.0));
        scene.insert(PrimitiveKey::Circle(1), circle(5.0));

        let delta = scene.take_dirty();
        assert!(delta.rebuilt);
        assert_eq!(delta.changed.len(), 2);
        assert!(scene.take_dirty().is_empty());

        scene.set_circle(0, 0.0, 0.0, 1.0);
        assert!(scene.take_dirty().is_empty());

        scene.set_circle(1, 6.0, 0.0, 1.0);
        let delta = scene.take_dirty();
        assert!(!delta.rebuilt);
        assert_eq!(delta.changed, vec![PrimitiveKey::Circle(1)]);
    }

    #[test]
    fn test_message_forces_rebuild() {
        let mut scene = Scene::new(10.0, 10.0);
        scene.set_message(Some("Loading...".into()));
        assert_eq!(scene.message(), Some("Loading..."));
        assert!(scene.take_dirty().rebuilt);

        scene.set_message(Some("Loading...".into()));
        assert!(scene.take_dirty().is_empty());
    }

    #[test]
    fn test_json_snapshot() {
        let mut scene = Scene::new(600.0, 600.0);
        scene.insert(PrimitiveKey::Circle(0), circle(3.0));
        let json: serde_json::Value = serde_json::from_str(&scene.to_json().unwrap()).unwrap();
        assert_eq!(json["width"], 600.0);
        assert_eq!(json["primitives"].as_array().map(Vec::len), Some(1));
        assert_eq!(json["primitives"][0]["id"], "circle-0");
        assert_eq!(json["primitives"][0]["type"], "circle");
        assert_eq!(json["primitives"][0]["fill"], "#000000");
    }
}
