//! Generalized ICP (plane-to-plane).
//!
//! Every point carries a covariance estimated from its `k` nearest
//! neighbours and flattened to a disc: unit variance along the local surface,
//! `covariance_epsilon` along the normal. Each iteration minimises
//!
//! ```text
//! Σᵢ rᵢᵀ (C_tᵢ + R C_sᵢ Rᵀ)⁻¹ rᵢ,   rᵢ = tᵢ − T·sᵢ
//! ```
//!
//! with one Gauss-Newton step on a left perturbation `T ← exp(δ)·T`,
//! `δ = [ω, v]`.

use kiddo::SquaredEuclidean;
use nalgebra::{Isometry3, Matrix3, Matrix3x6, Matrix6, SymmetricEigen, Vector3, Vector6};
use serde::{Deserialize, Serialize};

use super::icp_common::{KdTree3, build_kdtree_3d, inlier_percentage, nearest_3d};
use super::{Aligner, RegistrationResult};
use crate::core::types::{PointCloud3D, Pose3D};

/// Configuration for generalized ICP.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GicpConfig {
    pub max_iterations: u32,

    /// Pairs farther apart than this are ignored (meters).
    pub max_correspondence_distance: f32,

    /// Neighbours used to estimate each point's covariance.
    pub k_neighbors: usize,

    /// Variance assigned along the surface normal.
    pub covariance_epsilon: f32,

    /// Radius used to score the final alignment (meters).
    pub quality_radius: f32,

    pub translation_epsilon: f32,

    pub rotation_epsilon: f32,

    pub min_correspondences: usize,
}

impl Default for GicpConfig {
    fn default() -> Self {
        Self {
            max_iterations: 20,
            max_correspondence_distance: 0.2, // 20cm
            k_neighbors: 20,
            covariance_epsilon: 1e-3,
            quality_radius: 0.1,
            translation_epsilon: 1e-5,
            rotation_epsilon: 1e-5,
            min_correspondences: 20,
        }
    }
}

/// Plane-to-plane registration backend.
#[derive(Debug, Clone)]
pub struct GeneralizedIcp {
    config: GicpConfig,
}

impl GeneralizedIcp {
    pub fn new(config: GicpConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GicpConfig {
        &self.config
    }

    /// Disc-shaped covariance for every point of `cloud`.
    fn covariances(&self, cloud: &PointCloud3D, tree: &KdTree3) -> Vec<Matrix3<f32>> {
        let k = self.config.k_neighbors.clamp(3, cloud.len().max(3));
        cloud
            .iter()
            .map(|p| {
                let neighbours = tree.nearest_n::<SquaredEuclidean>(&p.as_array(), std::num::NonZero::new(k).expect("k is clamped to >= 3"));
                if neighbours.len() < 3 {
                    return Matrix3::identity();
                }
                let n = neighbours.len() as f32;
                let mean = neighbours
                    .iter()
                    .fold(Vector3::zeros(), |acc, nn| {
                        acc + cloud.points[nn.item as usize].to_point3().coords
                    })
                    / n;
                let mut cov = Matrix3::zeros();
                for nn in &neighbours {
                    let d = cloud.points[nn.item as usize].to_point3().coords - mean;
                    cov += d * d.transpose();
                }
                self.flatten(cov / n)
            })
            .collect()
    }

    /// Replace the eigenvalues of `cov` by (1, 1, ε), smallest axis → ε.
    fn flatten(&self, cov: Matrix3<f32>) -> Matrix3<f32> {
        let eig = SymmetricEigen::new(cov);
        let normal_axis = eig.eigenvalues.imin();
        let mut values = Vector3::repeat(1.0);
        values[normal_axis] = self.config.covariance_epsilon;
        eig.eigenvectors * Matrix3::from_diagonal(&values) * eig.eigenvectors.transpose()
    }
}

#[inline]
fn skew(v: &Vector3<f32>) -> Matrix3<f32> {
    Matrix3::new(0.0, -v.z, v.y, v.z, 0.0, -v.x, -v.y, v.x, 0.0)
}

impl Aligner for GeneralizedIcp {
    fn align(
        &self,
        source: &PointCloud3D,
        target: &PointCloud3D,
        initial_guess: &Pose3D,
    ) -> RegistrationResult {
        if source.len() < 3 || target.len() < 3 {
            return RegistrationResult::failed();
        }

        let cfg = &self.config;
        let source_tree = build_kdtree_3d(source);
        let target_tree = build_kdtree_3d(target);
        let source_cov = self.covariances(source, &source_tree);
        let target_cov = self.covariances(target, &target_tree);

        let gate_sq = cfg.max_correspondence_distance * cfg.max_correspondence_distance;
        let mut transform: Isometry3<f32> = *initial_guess.isometry();
        let mut iterations = 0u32;
        let mut converged = false;

        for iter in 0..cfg.max_iterations {
            iterations = iter + 1;
            let rotation = transform.rotation.to_rotation_matrix();
            let r = rotation.matrix();

            let mut h = Matrix6::<f32>::zeros();
            let mut b = Vector6::<f32>::zeros();
            let mut pairs = 0usize;

            for (i, p) in source.iter().enumerate() {
                let q = transform * p.to_point3();
                let (j, d2) = nearest_3d(&target_tree, &q);
                if d2 > gate_sq {
                    continue;
                }
                let combined = target_cov[j] + r * source_cov[i] * r.transpose();
                let Some(info) = combined.try_inverse() else {
                    continue;
                };
                let residual = target.points[j].to_point3().coords - q.coords;

                // ∂r/∂δ for q' = exp(δ)·q:  [ [q]×, −I ]
                let mut jac = Matrix3x6::<f32>::zeros();
                jac.fixed_view_mut::<3, 3>(0, 0).copy_from(&skew(&q.coords));
                jac.fixed_view_mut::<3, 3>(0, 3)
                    .copy_from(&(-Matrix3::<f32>::identity()));

                let jt_info = jac.transpose() * info;
                h += jt_info * jac;
                b += jt_info * residual;
                pairs += 1;
            }

            if pairs < cfg.min_correspondences {
                break;
            }
            let Some(chol) = h.cholesky() else {
                break;
            };
            let delta = chol.solve(&(-b));
            let omega = Vector3::new(delta[0], delta[1], delta[2]);
            let v = Vector3::new(delta[3], delta[4], delta[5]);
            transform = Isometry3::new(v, omega) * transform;

            if v.norm() < cfg.translation_epsilon && omega.norm() < cfg.rotation_epsilon {
                converged = true;
                break;
            }
        }

        let (quality, rmse) = inlier_percentage(source, &target_tree, &transform, cfg.quality_radius);
        log::trace!(
            "GICP: {} iterations, quality {:.1}%, rmse {:.4}m",
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
