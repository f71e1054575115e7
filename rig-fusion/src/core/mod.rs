//! Core foundation layer.
//!
//! Bottom layer of the fusion stack with no internal dependencies.
//!
//! # Contents
//!
//! - [`types`]: Poses, point clouds, laser scans and sensor frames
//! - [`math`]: Angle normalization and interpolation

pub mod math;
pub mod types;
