//! Force view: a line per edge, a circle and a label per node.

use log::debug;

use super::scene::{CircleShape, LineShape, PaintOrder, Primitive, PrimitiveKey, Scene, TextShape};
use crate::config::ForceModeConfig;
use crate::graph::GraphEngine;
use crate::layout::ForceLayout;
use crate::scale::{ColorScale, LinearScale};

/// Baseline shift that vertically centers a label on its node.
const LABEL_DY: &str = ".35em";

/// Radius per node from the rank extent.
pub fn node_radii(engine: &GraphEngine, config: &ForceModeConfig) -> Vec<f64> {
    let (min, max) = engine.rank_extent().unwrap_or((0.0, 0.0));
    let size = LinearScale::new([min, max], config.node_size);
    engine
        .node_ids()
        .map(|id| engine.node(id).map_or(0.0, |n| size.map(n.rank)).max(0.0))
        .collect()
}

/// Full redraw at the layout's current positions.
pub fn draw(scene: &mut Scene, layout: &ForceLayout, config: &ForceModeConfig) {
    let engine = layout.engine();
    let (min, max) = engine.weight_extent().unwrap_or((0.0, 0.0));
    let fill = ColorScale::diverging(min, max, config.colors);
    let [width, height] = layout.config().size;

    scene.clear(width, height);
    scene.set_paint_order(PaintOrder::Grouped);
    let (xs, ys) = (engine.positions_x(), engine.positions_y());
    for (i, &(s, t)) in layout.links().iter().enumerate() {
        scene.insert(
            PrimitiveKey::Line(i as u32),
            Primitive::Line(LineShape {
                x1: xs[s],
                y1: ys[s],
                x2: xs[t],
                y2: ys[t],
                class: "link",
            }),
        );
    }

    for (id, circle) in layout.frame().iter() {
        let Some(node) = engine.node(id) else {
            continue;
        };
        scene.insert(
            PrimitiveKey::Circle(id.raw()),
            Primitive::Circle(CircleShape {
                cx: circle.x,
                cy: circle.y,
                r: circle.r,
                fill: fill.map(node.weight),
                class: "node",
            }),
        );
        scene.insert(
            PrimitiveKey::Text(id.raw()),
            Primitive::Text(TextShape {
                x: circle.x + config.label_offset,
                y: circle.y,
                dy: Some(LABEL_DY),
                text: node.name.clone(),
                class: None,
                opacity: 1.0,
                display: true,
            }),
        );
    }
    debug!(
        "drew {} nodes and {} links",
        engine.node_count(),
        engine.edge_count()
    );
}

/// Per-tick update: move lines, circles and labels in place.
pub fn update(scene: &mut Scene, layout: &ForceLayout, config: &ForceModeConfig) {
    let engine = layout.engine();
    let (xs, ys) = (engine.positions_x(), engine.positions_y());
    for (i, &(s, t)) in layout.links().iter().enumerate() {
        scene.set_line(i as u32, xs[s], ys[s], xs[t], ys[t]);
    }
    for (i, ((&x, &y), &r)) in xs.iter().zip(ys).zip(layout.radii()).enumerate() {
        scene.set_circle(i as u32, x, y, r);
        scene.set_text_position(i as u32, x + config.label_offset, y);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{EdgeData, FlatGraph, LinkKey, NodeData, NodeKey};
    use crate::scale::Color;

    fn graph() -> FlatGraph {
        let node = |id: i64, rank: f64, weight: f64| NodeData {
            id: NodeKey::Number(id),
            name: format!("n{id}"),
            weight,
            rank,
            ..Default::default()
        };
        FlatGraph {
            nodes: vec![node(10, 1.0, -2.0), node(11, 3.0, 0.0), node(12, 5.0, 2.0)],
            edges: vec![EdgeData::between(0, 1), EdgeData::between(1, 2)],
        }
    }

    fn layout(config: &ForceModeConfig) -> ForceLayout {
        let engine = GraphEngine::from_flat_graph(&graph(), LinkKey::Index);
        let mut layout = ForceLayout::new(engine, config.simulation.clone());
        let radii = node_radii(layout.engine(), config);
        layout.set_radii(radii);
        layout
    }

    #[test]
    fn test_radii_follow_rank() {
        let config = ForceModeConfig::default();
        let engine = GraphEngine::from_flat_graph(&graph(), LinkKey::Index);
        assert_eq!(node_radii(&engine, &config), vec![5.0, 17.5, 30.0]);
    }

    #[test]
    fn test_equal_ranks_use_middle_size() {
        let config = ForceModeConfig::default();
        let mut flat = graph();
        for node in &mut flat.nodes {
            node.rank = 4.0;
        }
        let engine = GraphEngine::from_flat_graph(&flat, LinkKey::Index);
        assert_eq!(node_radii(&engine, &config), vec![17.5; 3]);
    }

    #[test]
    fn test_draw_primitives() {
        let config = ForceModeConfig::default();
        let layout = layout(&config);
        let mut scene = Scene::default();
        draw(&mut scene, &layout, &config);

        assert_eq!(scene.len(), 2 + 3 + 3);
        assert_eq!((scene.width(), scene.height()), (600.0, 400.0));

        let fills: Vec<Color> = scene.circles().map(|(_, c)| c.fill).collect();
        assert_eq!(fills, vec![Color::RED, Color::YELLOW, Color::GREEN]);

        let (_, first) = scene.circles().next().unwrap();
        let (_, label) = scene.texts().next().unwrap();
        assert_eq!(label.x, first.cx + 8.0);
        assert_eq!(label.dy, Some(".35em"));
        assert_eq!(label.text, "n10");

        // each label is painted right after its own circle
        let keys: Vec<_> = scene.iter().map(|(k, _)| k).collect();
        assert_eq!(keys[2..4], [PrimitiveKey::Circle(0), PrimitiveKey::Text(0)]);
        assert_eq!(keys[6..], [PrimitiveKey::Circle(2), PrimitiveKey::Text(2)]);
    }

    #[test]
    fn test_update_moves_in_place() {
        let config = ForceModeConfig::default();
        let mut layout = layout(&config);
        let mut scene = Scene::default();
        draw(&mut scene, &layout, &config);
        scene.take_dirty();

        layout.start();
        layout.tick();
        update(&mut scene, &layout, &config);

        let delta = scene.take_dirty();
        assert!(!delta.rebuilt);
        assert!(!delta.changed.is_empty());
        assert_eq!(scene.len(), 8);

        let line = match scene.get(PrimitiveKey::Line(0)) {
            Some(Primitive::Line(l)) => l.clone(),
            other => panic!("expected line, got {other:?}"),
        };
        let (x, y) = layout.engine().position(crate::graph::NodeId(0)).unwrap();
        assert_eq!((line.x1, line.y1), (x, y));
    }
}
