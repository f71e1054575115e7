//! Planar laser scan and 2D point cloud types.

use super::pose::{Point2D, Pose2D};
use serde::{Deserialize, Serialize};

/// Raw planar range scan in polar coordinates.
///
/// One sweep of the ground-plane scanner. Each measurement is a range
/// value at `angle_min + i * angle_increment`, in the scanner frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaserScan {
    /// Start angle in radians
    pub angle_min: f32,
    /// Angular resolution (radians between consecutive readings)
    pub angle_increment: f32,
    /// Minimum valid range in meters
    pub range_min: f32,
    /// Maximum valid range in meters
    pub range_max: f32,
    /// Range measurements in meters (0 or NaN = invalid)
    pub ranges: Vec<f32>,
}

impl LaserScan {
    /// Create a new laser scan with the given parameters.
    pub fn new(
        angle_min: f32,
        angle_increment: f32,
        range_min: f32,
        range_max: f32,
        ranges: Vec<f32>,
    ) -> Self {
        Self {
            angle_min,
            angle_increment,
            range_min,
            range_max,
            ranges,
        }
    }

    /// Number of range measurements.
    #[inline]
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    #[inline]
    pub fn angle_at(&self, index: usize) -> f32 {
        self.angle_min + index as f32 * self.angle_increment
    }

    /// Check if a range value is valid.
    #[inline]
    pub fn is_valid_range(&self, range: f32) -> bool {
        range.is_finite() && range > 0.0 && range >= self.range_min && range <= self.range_max
    }

    /// Count valid returns.
    pub fn valid_count(&self) -> usize {
        self.ranges
            .iter()
            .filter(|&&r| self.is_valid_range(r))
            .count()
    }

    /// Convert valid returns to Cartesian points in the robot frame.
    ///
    /// `scanner_pose` is the scanner's mounting pose on the robot.
    pub fn to_point_cloud(&self, scanner_pose: &Pose2D) -> PointCloud2D {
        let mut cloud = PointCloud2D::with_capacity(self.ranges.len());
        for (i, &range) in self.ranges.iter().enumerate() {
            if !self.is_valid_range(range) {
                continue;
            }
            let (sin_a, cos_a) = self.angle_at(i).sin_cos();
            let local = Point2D::new(range * cos_a, range * sin_a);
            let p = scanner_pose.transform_point(&local);
            cloud.push_xy(p.x, p.y);
        }
        cloud
    }
}

impl Default for LaserScan {
    fn default() -> Self {
        Self {
            angle_min: -std::f32::consts::FRAC_PI_2,
            angle_increment: std::f32::consts::PI / 180.0,
            range_min: 0.02,
            range_max: 30.0,
            ranges: Vec::new(),
        }
    }
}

/// Collection of 2D points in Struct of Arrays layout.
///
/// Used for the reference map and for scans converted to the robot frame.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PointCloud2D {
    /// X coordinates in meters
    pub xs: Vec<f32>,
    /// Y coordinates in meters
    pub ys: Vec<f32>,
}

impl PointCloud2D {
    /// Create an empty point cloud.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a point cloud with pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            xs: Vec::with_capacity(capacity),
            ys: Vec::with_capacity(capacity),
        }
    }

    /// Create from a vector of points (converts AoS to SoA).
    pub fn from_points(points: Vec<Point2D>) -> Self {
        let mut cloud = Self::with_capacity(points.len());
        for p in points {
            cloud.push_xy(p.x, p.y);
        }
        cloud
    }

    #[inline]
    pub fn push_xy(&mut self, x: f32, y: f32) {
        self.xs.push(x);
        self.ys.push(y);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.xs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.xs.is_empty()
    }

    /// Get point at index.
    ///
    /// # Panics
    /// Panics if `i` is out of bounds.
    #[inline]
    pub fn point_at(&self, i: usize) -> Point2D {
        Point2D::new(self.xs[i], self.ys[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = Point2D> + '_ {
        self.xs
            .iter()
            .zip(self.ys.iter())
            .map(|(&x, &y)| Point2D::new(x, y))
    }

    /// Centroid of all points, `None` when empty.
    pub fn centroid(&self) -> Option<Point2D> {
        if self.is_empty() {
            return None;
        }
        let n = self.len() as f32;
        let sx: f32 = self.xs.iter().sum();
        let sy: f32 = self.ys.iter().sum();
        Some(Point2D::new(sx / n, sy / n))
    }

    /// Transform every point by `pose`, returning a new cloud.
    pub fn transform(&self, pose: &Pose2D) -> PointCloud2D {
        let (sin_t, cos_t) = pose.theta.sin_cos();
        let mut out = PointCloud2D::with_capacity(self.len());
        for (&x, &y) in self.xs.iter().zip(self.ys.iter()) {
            out.push_xy(
                pose.x + x * cos_t - y * sin_t,
                pose.y + x * sin_t + y * cos_t,
            );
        }
        out
    }
}
