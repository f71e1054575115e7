//! Shared building blocks for the ICP variants.
//!
//! - k-d tree construction over 2D and 3D clouds
//! - closed-form rigid fits for matched point pairs
//! - the inlier-percentage quality metric
//!
//! The immutable kiddo tree is used because range images put many points on
//! the same depth plane, and map points often share grid coordinates.

use kiddo::{ImmutableKdTree, SquaredEuclidean};
use nalgebra::{Isometry3, Matrix3, Point3, Rotation3, Translation3, UnitQuaternion, Vector3};

use crate::core::types::{Point2D, PointCloud2D, PointCloud3D, Pose2D};

pub type KdTree2 = ImmutableKdTree<f32, 2>;
pub type KdTree3 = ImmutableKdTree<f32, 3>;

pub fn build_kdtree_2d(cloud: &PointCloud2D) -> KdTree2 {
    let entries: Vec<[f32; 2]> = cloud.iter().map(|p| [p.x, p.y]).collect();
    ImmutableKdTree::new_from_slice(&entries)
}

pub fn build_kdtree_3d(cloud: &PointCloud3D) -> KdTree3 {
    let entries: Vec<[f32; 3]> = cloud.iter().map(|p| p.as_array()).collect();
    ImmutableKdTree::new_from_slice(&entries)
}

/// Nearest target index and squared distance for a query point.
#[inline]
pub fn nearest_3d(tree: &KdTree3, query: &Point3<f32>) -> (usize, f32) {
    let nn = tree.nearest_one::<SquaredEuclidean>(&[query.x, query.y, query.z]);
    (nn.item as usize, nn.distance)
}

/// Least-squares rigid transform mapping each `source` point onto its pair.
///
/// Returns `None` with fewer than three pairs.
pub fn solve_rigid_2d(pairs: &[(Point2D, Point2D)]) -> Option<Pose2D> {
    if pairs.len() < 3 {
        return None;
    }
    let n = pairs.len() as f32;
    let (mut sx, mut sy, mut tx, mut ty) = (0.0f32, 0.0f32, 0.0f32, 0.0f32);
    for (s, t) in pairs {
        sx += s.x;
        sy += s.y;
        tx += t.x;
        ty += t.y;
    }
    let sc = Point2D::new(sx / n, sy / n);
    let tc = Point2D::new(tx / n, ty / n);

    // θ = atan2(Σ s×t, Σ s·t) over centered pairs
    let mut cross = 0.0f32;
    let mut dot = 0.0f32;
    for (s, t) in pairs {
        let (ax, ay) = (s.x - sc.x, s.y - sc.y);
        let (bx, by) = (t.x - tc.x, t.y - tc.y);
        cross += ax * by - ay * bx;
        dot += ax * bx + ay * by;
    }
    let theta = cross.atan2(dot);
    let (sin_t, cos_t) = theta.sin_cos();
    Some(Pose2D::new(
        tc.x - (sc.x * cos_t - sc.y * sin_t),
        tc.y - (sc.x * sin_t + sc.y * cos_t),
        theta,
    ))
}

/// Kabsch fit of a rigid 3D transform to matched pairs.
///
/// Returns `None` with fewer than three pairs or when the SVD fails.
pub fn solve_rigid_3d(pairs: &[(Point3<f32>, Point3<f32>)]) -> Option<Isometry3<f32>> {
    if pairs.len() < 3 {
        return None;
    }
    let n = pairs.len() as f32;
    let mut sc = Vector3::zeros();
    let mut tc = Vector3::zeros();
    for (s, t) in pairs {
        sc += s.coords;
        tc += t.coords;
    }
    sc /= n;
    tc /= n;

    let mut h = Matrix3::zeros();
    for (s, t) in pairs {
        h += (s.coords - sc) * (t.coords - tc).transpose();
    }

    let svd = h.svd(true, true);
    let u = svd.u?;
    let v_t = svd.v_t?;
    let mut r = v_t.transpose() * u.transpose();
    if r.determinant() < 0.0 {
        let mut v = v_t.transpose();
        v.column_mut(2).neg_mut();
        r = v * u.transpose();
    }

    let rotation = UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(r));
    let t = tc - rotation * sc;
    Some(Isometry3::from_parts(Translation3::from(t), rotation))
}

/// Percentage of `source` points that land within `radius` of the target
/// after applying `transform`.
pub fn inlier_percentage(
    source: &PointCloud3D,
    target_tree: &KdTree3,
    transform: &Isometry3<f32>,
    radius: f32,
) -> (f32, f32) {
    if source.is_empty() {
        return (0.0, f32::MAX);
    }
    let radius_sq = radius * radius;
    let mut inliers = 0usize;
    let mut sum_sq = 0.0f32;
    for p in source.iter() {
        let q = transform * p.to_point3();
        let (_, d2) = nearest_3d(target_tree, &q);
        if d2 <= radius_sq {
            inliers += 1;
            sum_sq += d2;
        }
    }
    let quality = 100.0 * inliers as f32 / source.len() as f32;
    let rmse = if inliers > 0 {
        (sum_sq / inliers as f32).sqrt()
    } else {
        f32::MAX
    };
    (quality, rmse)
}
