//! 3D point clouds.

use serde::{Deserialize, Serialize};

use super::pose3d::{Point3D, Pose3D};

/// Unorganized collection of 3D points.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PointCloud3D {
    pub points: Vec<Point3D>,
}

impl PointCloud3D {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            points: Vec::with_capacity(capacity),
        }
    }

    pub fn from_points(points: Vec<Point3D>) -> Self {
        Self { points }
    }

    #[inline]
    pub fn push(&mut self, point: Point3D) {
        self.points.push(point);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Point3D> + '_ {
        self.points.iter()
    }

    /// Append all points of `other`.
    pub fn extend_from(&mut self, other: &PointCloud3D) {
        self.points.extend_from_slice(&other.points);
    }

    /// Every `stride`-th point, starting from the first.
    pub fn subsample(&self, stride: usize) -> PointCloud3D {
        let stride = stride.max(1);
        Self {
            points: self.points.iter().step_by(stride).copied().collect(),
        }
    }

    /// Transform every point by `pose`, returning a new cloud.
    pub fn transform(&self, pose: &Pose3D) -> PointCloud3D {
        Self {
            points: self.points.iter().map(|p| pose.transform_point(p)).collect(),
        }
    }

    /// Transform every point in place.
    pub fn transform_in_place(&mut self, pose: &Pose3D) {
        for p in &mut self.points {
            *p = pose.transform_point(p);
        }
    }

    /// Centroid of all points, `None` when empty.
    pub fn centroid(&self) -> Option<Point3D> {
        if self.is_empty() {
            return None;
        }
        let n = self.len() as f32;
        let (sx, sy, sz) = self
            .points
            .iter()
            .fold((0.0, 0.0, 0.0), |(x, y, z), p| (x + p.x, y + p.y, z + p.z));
        Some(Point3D::new(sx / n, sy / n, sz / n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_subsample_keeps_first_of_each_stride() {
        let cloud = PointCloud3D::from_points(
            (0..5).map(|i| Point3D::new(i as f32, 0.0, 0.0)).collect(),
        );
        let half = cloud.subsample(2);
        assert_eq!(half.len(), 3);
        assert_relative_eq!(half.points[1].x, 2.0);
        assert_eq!(cloud.subsample(0).len(), 5);
    }

    #[test]
    fn test_transform_moves_centroid() {
        let cloud = PointCloud3D::from_points(vec![
            Point3D::new(1.0, 0.0, 0.0),
            Point3D::new(-1.0, 0.0, 0.0),
        ]);
        let moved = cloud.transform(&Pose3D::from_xyz_ypr(0.0, 2.0, 1.0, 0.0, 0.0, 0.0));
        let c = moved.centroid().unwrap();
        assert_relative_eq!(c.y, 2.0);
        assert_relative_eq!(c.z, 1.0);
    }
}
