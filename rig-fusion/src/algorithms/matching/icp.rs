//! Planar Point-to-Point ICP against a static reference map.
//!
//! # Algorithm
//!
//! ```text
//! Input: scan S (robot frame), map M, initial guess T₀
//! Output: pose T* of the robot in the map frame, goodness in %
//!
//! 1. gate_d = max_correspondence_distance, gate_a = angular_gate
//! 2. For each iteration:
//!    a. Pair every s ∈ S with its nearest m ∈ M when
//!       |T·s − m| < gate_d + gate_a · |s|
//!    b. Solve the closed-form rigid fit T' over the pairs
//!    c. If T' barely moved from T, shrink both gates by `gate_decay`;
//!       stop once gate_d falls below `min_correspondence_distance`
//! 3. goodness = 100 · |pairs under the final gates| / |S|
//! ```
//!
//! The distance-proportional term lets far returns (which move more for the
//! same heading error) still find partners early on.

use kiddo::SquaredEuclidean;
use serde::{Deserialize, Serialize};

use super::icp_common::{KdTree2, build_kdtree_2d, solve_rigid_2d};
use super::{ScanMatchResult, ScanMatcher};
use crate::core::types::{Point2D, PointCloud2D, Pose2D};

/// Configuration for planar ICP.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IcpConfig {
    /// Maximum number of iterations.
    pub max_iterations: u32,

    /// Initial correspondence gate (meters).
    pub max_correspondence_distance: f32,

    /// Gate growth per meter of point range (radians, applied as arc length).
    pub angular_gate: f32,

    /// Factor applied to both gates whenever an iteration converges.
    pub gate_decay: f32,

    /// Floor for the distance gate; reaching it ends the search.
    pub min_correspondence_distance: f32,

    /// Convergence threshold for translation (meters).
    pub translation_epsilon: f32,

    /// Convergence threshold for rotation (radians).
    pub rotation_epsilon: f32,

    /// Minimum number of valid correspondences required.
    pub min_correspondences: usize,
}

impl Default for IcpConfig {
    fn default() -> Self {
        Self {
            max_iterations: 800,
            max_correspondence_distance: 0.75,      // 75cm
            angular_gate: 10f32.to_radians(),       // 10°
            gate_decay: 0.99,
            min_correspondence_distance: 0.05,      // 5cm
            translation_epsilon: 1e-4,              // 0.1mm
            rotation_epsilon: 1e-4,                 // ~0.006°
            min_correspondences: 10,
        }
    }
}

/// Planar ICP matcher.
///
/// Suitable for initial errors of a few decimeters and degrees, which is
/// what consecutive scans at walking speed produce when the previous pose
/// seeds the next match.
#[derive(Debug, Clone)]
pub struct PointToPointIcp {
    config: IcpConfig,
}

impl PointToPointIcp {
    pub fn new(config: IcpConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &IcpConfig {
        &self.config
    }

    /// Pair scan points with map points under the current gates.
    fn find_correspondences(
        source: &PointCloud2D,
        target: &PointCloud2D,
        tree: &KdTree2,
        transform: &Pose2D,
        gate_d: f32,
        gate_a: f32,
    ) -> (Vec<(Point2D, Point2D)>, f32) {
        let mut pairs = Vec::with_capacity(source.len());
        let mut sum_sq = 0.0f32;
        for s in source.iter() {
            let range = (s.x * s.x + s.y * s.y).sqrt();
            let gate = gate_d + gate_a * range;
            let q = transform.transform_point(&s);
            let nn = tree.nearest_one::<SquaredEuclidean>(&[q.x, q.y]);
            if nn.distance < gate * gate {
                pairs.push((s, target.point_at(nn.item as usize)));
                sum_sq += nn.distance;
            }
        }
        (pairs, sum_sq)
    }
}

impl ScanMatcher for PointToPointIcp {
    fn match_scans(
        &self,
        source: &PointCloud2D,
        target: &PointCloud2D,
        initial_guess: &Pose2D,
    ) -> ScanMatchResult {
        if source.is_empty() || target.is_empty() {
            return ScanMatchResult::failed(*initial_guess);
        }

        let tree = build_kdtree_2d(target);
        let cfg = &self.config;

        let mut transform = *initial_guess;
        let mut gate_d = cfg.max_correspondence_distance;
        let mut gate_a = cfg.angular_gate;
        let mut iterations = 0u32;
        let mut converged = false;

        for iter in 0..cfg.max_iterations {
            iterations = iter + 1;

            let (pairs, _) =
                Self::find_correspondences(source, target, &tree, &transform, gate_d, gate_a);
            if pairs.len() < cfg.min_correspondences {
                break;
            }

            let Some(next) = solve_rigid_2d(&pairs) else {
                break;
            };
            let delta = transform.relative_to(&next);
            transform = next;

            let step = (delta.x * delta.x + delta.y * delta.y).sqrt();
            if step < cfg.translation_epsilon && delta.theta.abs() < cfg.rotation_epsilon {
                gate_d *= cfg.gate_decay;
                gate_a *= cfg.gate_decay;
                if gate_d < cfg.min_correspondence_distance {
                    converged = true;
                    break;
                }
            }
        }

        let (pairs, sum_sq) =
            Self::find_correspondences(source, target, &tree, &transform, gate_d, gate_a);
        let goodness = 100.0 * pairs.len() as f32 / source.len() as f32;
        let mse = if pairs.is_empty() {
            f32::MAX
        } else {
            sum_sq / pairs.len() as f32
        };

        log::trace!(
            "ICP2D: {} iterations, goodness {:.1}%, gate {:.3}m",
            iterations,
            goodness,
            gate_d
        );

        ScanMatchResult {
            transform,
            goodness,
            converged,
            iterations,
            mse,
        }
    }
}
