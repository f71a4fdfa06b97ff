//! Spatial indexing for pointer hit testing in force mode.

mod rtree;

pub use rtree::SpatialIndex;
