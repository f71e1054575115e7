//! Algorithms layer.
//!
//! # Contents
//!
//! - [`matching`]: planar scan matching and 3D registration (ICP, GICP)
//! - [`geometry`]: convex hulls for overlap tests

pub mod geometry;
pub mod matching;
