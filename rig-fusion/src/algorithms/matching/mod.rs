//! Point-set alignment.
//!
//! Two capabilities sit behind narrow traits so the pipeline never depends
//! on a particular backend:
//!
//! - [`ScanMatcher`]: planar scan against a 2D reference map, reporting a
//!   goodness percentage
//! - [`Aligner`]: 3D cloud against a 3D reference cloud, reporting a
//!   quality percentage
//!
//! # Backends
//!
//! - [`PointToPointIcp`]: planar ICP with shrinking correspondence gates
//! - [`PointToPointIcp3D`]: classic 3D ICP (closed-form SVD update)
//! - [`GeneralizedIcp`]: plane-to-plane ICP with per-point covariances
//!
//! # Example
//!
//! ```ignore
//! use rig_fusion::algorithms::matching::{Aligner, DynAligner, RefineMethod};
//!
//! let aligner = DynAligner::new(RefineMethod::Gicp, &icp_config, &gicp_config).unwrap();
//! let result = aligner.align(&source, &target, &Pose3D::identity());
//! if result.quality >= 96.0 {
//!     println!("Correction: {:?}", result.transform);
//! }
//! ```

mod dynamic;
mod gicp;
mod icp;
mod icp3d;
pub(crate) mod icp_common;

#[cfg(test)]
pub(crate) mod test_utils;

pub use dynamic::{DynAligner, RefineMethod};
pub use gicp::{GeneralizedIcp, GicpConfig};
pub use icp::{IcpConfig, PointToPointIcp};
pub use icp3d::{Icp3DConfig, PointToPointIcp3D};

use crate::core::types::{PointCloud2D, PointCloud3D, Pose2D, Pose3D};

/// Result of aligning a planar scan to the reference map.
#[derive(Debug, Clone)]
pub struct ScanMatchResult {
    /// Estimated pose of the scan origin in the map frame.
    pub transform: Pose2D,

    /// Percentage (0-100) of scan points with a map point inside the final
    /// correspondence gate.
    pub goodness: f32,

    /// Whether the correspondence gate shrank to its floor before the
    /// iteration budget ran out.
    pub converged: bool,

    /// Number of iterations performed.
    pub iterations: u32,

    /// Mean squared error of final correspondences.
    pub mse: f32,
}

impl ScanMatchResult {
    /// Create a failed result carrying the initial guess.
    pub fn failed(initial_guess: Pose2D) -> Self {
        Self {
            transform: initial_guess,
            goodness: 0.0,
            converged: false,
            iterations: 0,
            mse: f32::MAX,
        }
    }
}

/// Trait for planar scan-to-map matching.
pub trait ScanMatcher {
    /// Align `source` (robot frame) to `target` (map frame).
    ///
    /// `initial_guess` seeds the search and is returned unchanged in a
    /// failed result.
    fn match_scans(
        &self,
        source: &PointCloud2D,
        target: &PointCloud2D,
        initial_guess: &Pose2D,
    ) -> ScanMatchResult;
}

/// Result of a 3D registration.
#[derive(Debug, Clone)]
pub struct RegistrationResult {
    /// Transform that maps source points onto the target.
    pub transform: Pose3D,

    /// Percentage (0-100) of source points with a target point inside the
    /// quality radius after alignment. 100 means a perfect fit.
    pub quality: f32,

    pub converged: bool,

    pub iterations: u32,

    /// Root mean squared correspondence distance after alignment.
    pub rmse: f32,
}

impl RegistrationResult {
    /// Result for inputs that could not be aligned at all.
    pub fn failed() -> Self {
        Self {
            transform: Pose3D::identity(),
            quality: 0.0,
            converged: false,
            iterations: 0,
            rmse: f32::MAX,
        }
    }
}

/// Trait for 3D point-set registration backends.
pub trait Aligner {
    /// Estimate the transform mapping `source` onto `target`, starting at
    /// `initial_guess`.
    fn align(
        &self,
        source: &PointCloud3D,
        target: &PointCloud3D,
        initial_guess: &Pose3D,
    ) -> RegistrationResult;
}
