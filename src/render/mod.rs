//! Rendering into a retained scene.
//!
//! - `packed`: circles and labels of the zoomable packing view
//! - `force`: links, nodes and labels of the force view
//!
//! Each mode has a `draw` for full redraws and an `update` that moves the
//! existing primitives.

pub mod force;
pub mod packed;
mod scene;

pub use scene::{
    CircleShape, LineShape, PaintOrder, Primitive, PrimitiveKey, Scene, SceneDelta, TextShape,
};
