//! Scalar mappers: numeric and color scales shared by both layout modes.

mod color;
mod linear;

pub use color::{Color, ColorScale, Hsl, ParseColorError, interpolate_hsl};
pub use linear::LinearScale;
