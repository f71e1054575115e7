//! Core data types for the fusion pipeline.
//!
//! Planar types:
//! - [`Point2D`], [`Pose2D`]: ground-plane geometry in meters and radians
//! - [`LaserScan`], [`PointCloud2D`]: scanner sweeps and their Cartesian form
//!
//! Spatial types:
//! - [`Point3D`], [`Pose3D`]: rigid 3D geometry
//! - [`PointCloud3D`]: unorganized 3D points
//! - [`RangeCloud`], [`SensorFrame`]: organized captures and their poses
//!
//! - [`Timestamped<T>`]: generic timestamp wrapper

mod cloud;
mod frame;
mod pose;
mod pose3d;
mod scan;
mod timestamped;

pub use cloud::PointCloud3D;
pub use frame::{IndexedFrame, RangeCloud, ScanRecord, SensorFrame};
pub use pose::{Point2D, Pose2D};
pub use pose3d::{Point3D, Pose3D};
pub use scan::{LaserScan, PointCloud2D};
pub use timestamped::Timestamped;
