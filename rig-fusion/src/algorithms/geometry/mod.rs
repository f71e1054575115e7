//! Geometric primitives used for view selection.
//!
//! - [`ConvexHull`]: 3D hull with point containment and overlap tests

mod hull;

pub use hull::ConvexHull;
