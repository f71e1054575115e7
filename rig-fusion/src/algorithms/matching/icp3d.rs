//! Classic point-to-point ICP in 3D.
//!
//! Same gate schedule as the planar matcher: pairs are accepted inside a
//! distance gate that shrinks each time the estimate settles, and the
//! closed-form Kabsch fit solves every step.

use nalgebra::Isometry3;
use serde::{Deserialize, Serialize};

use super::icp_common::{KdTree3, build_kdtree_3d, inlier_percentage, nearest_3d, solve_rigid_3d};
use super::{Aligner, RegistrationResult};
use crate::core::types::{PointCloud3D, Pose3D};

/// Configuration for 3D point-to-point ICP.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Icp3DConfig {
    pub max_iterations: u32,

    /// Initial correspondence gate (meters).
    pub max_correspondence_distance: f32,

    /// Factor applied to the gate whenever an iteration converges.
    pub gate_decay: f32,

    /// Floor for the gate; reaching it ends the search.
    pub min_correspondence_distance: f32,

    /// Radius used to score the final alignment (meters).
    pub quality_radius: f32,

    pub translation_epsilon: f32,

    pub rotation_epsilon: f32,

    pub min_correspondences: usize,
}

impl Default for Icp3DConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            max_correspondence_distance: 0.40, // 40cm
            gate_decay: 0.5,
            min_correspondence_distance: 0.10, // 10cm
            quality_radius: 0.10,
            translation_epsilon: 1e-4,
            rotation_epsilon: 1e-4,
            min_correspondences: 20,
        }
    }
}

/// Point-to-point 3D ICP backend.
#[derive(Debug, Clone)]
pub struct PointToPointIcp3D {
    config: Icp3DConfig,
}

impl PointToPointIcp3D {
    pub fn new(config: Icp3DConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Icp3DConfig {
        &self.config
    }

    fn correspondences(
        source: &PointCloud3D,
        target: &PointCloud3D,
        tree: &KdTree3,
        transform: &Isometry3<f32>,
        gate: f32,
    ) -> Vec<(nalgebra::Point3<f32>, nalgebra::Point3<f32>)> {
        let gate_sq = gate * gate;
        let mut pairs = Vec::with_capacity(source.len());
        for p in source.iter() {
            let s = p.to_point3();
            let (j, d2) = nearest_3d(tree, &(transform * s));
            if d2 <= gate_sq {
                pairs.push((s, target.points[j].to_point3()));
            }
        }
        pairs
    }
}

impl Aligner for PointToPointIcp3D {
    fn align(
        &self,
        source: &PointCloud3D,
        target: &PointCloud3D,
        initial_guess: &Pose3D,
    ) -> RegistrationResult {
        if source.is_empty() || target.is_empty() {
            return RegistrationResult::failed();
        }

        let cfg = &self.config;
        let tree = build_kdtree_3d(target);
        let mut transform = *initial_guess.isometry();
        let mut gate = cfg.max_correspondence_distance;
        let mut iterations = 0u32;
        let mut converged = false;

        for iter in 0..cfg.max_iterations {
            iterations = iter + 1;

            let pairs = Self::correspondences(source, target, &tree, &transform, gate);
            if pairs.len() < cfg.min_correspondences {
                break;
            }
            let Some(next) = solve_rigid_3d(&pairs) else {
                break;
            };

            let delta = transform.inverse() * next;
            transform = next;

            if delta.translation.vector.norm() < cfg.translation_epsilon
                && delta.rotation.angle() < cfg.rotation_epsilon
            {
                gate *= cfg.gate_decay;
                if gate < cfg.min_correspondence_distance {
                    converged = true;
                    break;
                }
            }
        }

        let (quality, rmse) = inlier_percentage(source, &tree, &transform, cfg.quality_radius);
        log::trace!(
            "ICP3D: {} iterations, quality {:.1}%, rmse {:.4}m",
            iterations,
            quality,
            rmse
        );

        RegistrationResult {
            transform: Pose3D::from_isometry(transform),
            quality,
            converged,
            iterations,
            rmse,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::matching::test_utils::create_corner_scene;
    use approx::assert_relative_eq;

    #[test]
    fn test_identical_clouds_give_identity() {
        let scene = create_corner_scene(0.1);
        let icp = PointToPointIcp3D::new(Icp3DConfig::default());
        let result = icp.align(&scene, &scene, &Pose3D::identity());

        assert_relative_eq!(result.quality, 100.0);
        assert!(result.transform.translation().norm() < 1e-4);
        assert!(result.transform.rotation_angle() < 1e-3);
    }

    #[test]
    fn test_recovers_small_offset() {
        let scene = create_corner_scene(0.1);
        // small enough that every first nearest neighbour is the true one
        let truth = Pose3D::from_xyz_ypr(0.015, -0.01, 0.01, 0.003, 0.0, 0.0);
        // source = scene displaced by truth⁻¹, so truth maps it back
        let source = scene.transform(&truth.inverse());

        let icp = PointToPointIcp3D::new(Icp3DConfig::default());
        let result = icp.align(&source, &scene, &Pose3D::identity());

        assert!(result.quality > 96.0, "quality {}", result.quality);
        assert_relative_eq!(result.transform.x(), truth.x(), epsilon = 5e-3);
        assert_relative_eq!(result.transform.y(), truth.y(), epsilon = 5e-3);
        assert_relative_eq!(result.transform.z(), truth.z(), epsilon = 5e-3);
        assert_relative_eq!(result.transform.yaw(), truth.yaw(), epsilon = 5e-3);
    }

    #[test]
    fn test_disjoint_clouds_fail_quality() {
        let scene = create_corner_scene(0.1);
        let far = scene.transform(&Pose3D::from_xyz_ypr(20.0, 0.0, 0.0, 0.0, 0.0, 0.0));
        let icp = PointToPointIcp3D::new(Icp3DConfig::default());
        let result = icp.align(&far, &scene, &Pose3D::identity());
        assert!(result.quality < 1.0);
        assert!(!result.converged);
    }
}
