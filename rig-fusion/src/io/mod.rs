//! I/O layer.
//!
//! This layer handles everything that touches the filesystem.
//!
//! # Contents
//!
//! - [`rawlog`]: Recorded sensor stream (input and localized output)
//! - [`reference_map`]: Static 2D reference map loading
//! - [`trajectory_log`]: Accepted 2D poses, one per line

pub mod rawlog;
pub mod reference_map;
pub mod trajectory_log;

pub use rawlog::{RawlogError, RawlogReader, RawlogWriter, StreamRecord};
pub use reference_map::{ReferenceMapError, load_reference_map};
pub use trajectory_log::TrajectoryLog;
