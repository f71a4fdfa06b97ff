//! Packing view: one circle and one label per node, positioned through the
//! zoom controller's current view.

use log::debug;

use super::scene::{CircleShape, PaintOrder, Primitive, PrimitiveKey, Scene, TextShape};
use crate::config::PackingConfig;
use crate::graph::{Hierarchy, NodeId};
use crate::scale::ColorScale;
use crate::zoom::ZoomController;

const LABEL_CLASS: &str = "label";

fn circle_class(hierarchy: &Hierarchy, id: NodeId) -> &'static str {
    if id == hierarchy.root() {
        "node node--root"
    } else if hierarchy.is_leaf(id) {
        "node node--leaf"
    } else {
        "node"
    }
}

/// Full redraw of a packed hierarchy.
pub fn draw(scene: &mut Scene, hierarchy: &Hierarchy, zoom: &ZoomController, config: &PackingConfig) {
    let (min, max) = hierarchy.weight_extent().unwrap_or((0.0, 0.0));
    let fill = ColorScale::diverging(min, max, config.colors);

    scene.clear(config.diameter, config.diameter);
    scene.set_paint_order(PaintOrder::Layered);
    for (id, node) in hierarchy.iter() {
        let Some(circle) = zoom.circles().get(id) else {
            continue;
        };
        let screen = zoom.view_to_screen(&circle);
        let label = zoom.labels().get(id.index()).copied().unwrap_or_default();

        scene.insert(
            PrimitiveKey::Circle(id.raw()),
            Primitive::Circle(CircleShape {
                cx: screen.x,
                cy: screen.y,
                r: screen.r,
                fill: fill.map(node.weight),
                class: circle_class(hierarchy, id),
            }),
        );
        scene.insert(
            PrimitiveKey::Text(id.raw()),
            Primitive::Text(TextShape {
                x: screen.x,
                y: screen.y,
                dy: None,
                text: node.name.clone(),
                class: Some(LABEL_CLASS),
                opacity: label.opacity,
                display: label.display,
            }),
        );
    }
    debug!("drew {} packed nodes, weight range [{min}, {max}]", hierarchy.len());
}

/// Move circles and labels to the controller's current view and apply the
/// label crossfade.
pub fn update(scene: &mut Scene, zoom: &ZoomController) {
    for (id, circle) in zoom.circles().iter() {
        let screen = zoom.view_to_screen(circle);
        scene.set_circle(id.raw(), screen.x, screen.y, screen.r);
        scene.set_text_position(id.raw(), screen.x, screen.y);
        if let Some(label) = zoom.labels().get(id.index()) {
            scene.set_text_visibility(id.raw(), label.opacity, label.display);
        }
    }
}
