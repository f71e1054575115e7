//! Sensor processing layer.
//!
//! # Contents
//!
//! - [`preprocessing`]: smoothing of organized range captures

pub mod preprocessing;
