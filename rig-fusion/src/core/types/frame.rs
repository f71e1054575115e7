//! Sensor frames carried through the fusion pipeline.

use serde::{Deserialize, Serialize};

use super::cloud::PointCloud3D;
use super::pose3d::{Point3D, Pose3D};
use super::scan::LaserScan;

/// Organized range/intensity capture from one 3D camera.
///
/// Points are stored row-major in the sensor frame, `width * height` of
/// them when the grid is organized. Entries with non-finite coordinates or
/// zero range mark pixels without a depth return.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RangeCloud {
    pub width: u32,
    pub height: u32,
    pub points: Vec<Point3D>,
    pub intensities: Vec<u8>,
}

impl RangeCloud {
    pub fn new(width: u32, height: u32, points: Vec<Point3D>) -> Self {
        Self {
            width,
            height,
            points,
            intensities: Vec::new(),
        }
    }

    /// Unorganized capture (height 1).
    pub fn from_points(points: Vec<Point3D>) -> Self {
        Self::new(points.len() as u32, 1, points)
    }

    pub fn with_intensities(mut self, intensities: Vec<u8>) -> Self {
        self.intensities = intensities;
        self
    }

    /// True when the points form a `width × height` grid with more than one row.
    pub fn is_organized(&self) -> bool {
        self.height > 1 && (self.width as usize) * (self.height as usize) == self.points.len()
    }

    #[inline]
    pub fn is_valid_point(point: &Point3D) -> bool {
        point.is_finite() && point.norm() > 1e-6
    }

    pub fn valid_points(&self) -> impl Iterator<Item = &Point3D> + '_ {
        self.points.iter().filter(|p| Self::is_valid_point(p))
    }

    pub fn valid_count(&self) -> usize {
        self.valid_points().count()
    }

    /// Valid points in the sensor frame.
    pub fn to_cloud(&self) -> PointCloud3D {
        PointCloud3D::from_points(self.valid_points().copied().collect())
    }
}

/// One 3D capture and the pose the pipeline assigns to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorFrame {
    /// Sensor label (e.g. `RGBD_1`)
    pub sensor: String,
    /// Capture time in microseconds
    pub timestamp_us: u64,
    /// Mounting pose of the sensor on the robot (sensor → robot)
    pub sensor_pose: Pose3D,
    /// Captured range data in the sensor frame
    pub cloud: RangeCloud,
    /// World pose of the sensor, once assigned
    pub pose: Option<Pose3D>,
}

impl SensorFrame {
    pub fn new(
        sensor: impl Into<String>,
        timestamp_us: u64,
        sensor_pose: Pose3D,
        cloud: RangeCloud,
    ) -> Self {
        Self {
            sensor: sensor.into(),
            timestamp_us,
            sensor_pose,
            cloud,
            pose: None,
        }
    }

    /// Valid points in the world frame under the current pose estimate.
    ///
    /// Returns `None` until a pose has been assigned.
    pub fn world_cloud(&self) -> Option<PointCloud3D> {
        let pose = self.pose?;
        let mut cloud = self.cloud.to_cloud();
        cloud.transform_in_place(&pose);
        Some(cloud)
    }

    /// Left-compose a world correction: pose ← correction ∘ pose.
    pub fn apply_correction(&mut self, correction: &Pose3D) {
        if let Some(pose) = self.pose.as_mut() {
            *pose = correction.compose(pose);
        }
    }
}

/// A sensor frame tagged with its position in the input stream.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedFrame {
    /// Zero-based position of the record in the input stream
    pub index: usize,
    pub frame: SensorFrame,
}

impl IndexedFrame {
    pub fn new(index: usize, frame: SensorFrame) -> Self {
        Self { index, frame }
    }
}

/// One sweep of the planar scanner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanRecord {
    /// Sensor label (e.g. `HOKUYO1`)
    pub sensor: String,
    /// Capture time in microseconds
    pub timestamp_us: u64,
    pub scan: LaserScan,
}

impl ScanRecord {
    pub fn new(sensor: impl Into<String>, timestamp_us: u64, scan: LaserScan) -> Self {
        Self {
            sensor: sensor.into(),
            timestamp_us,
            scan,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_invalid_points_are_skipped() {
        let cloud = RangeCloud::new(
            2,
            2,
            vec![
                Point3D::new(1.0, 0.0, 0.0),
                Point3D::new(0.0, 0.0, 0.0),
                Point3D::new(f32::NAN, 0.0, 1.0),
                Point3D::new(0.0, 2.0, 0.0),
            ],
        );
        assert!(cloud.is_organized());
        assert_eq!(cloud.valid_count(), 2);
        assert_eq!(cloud.to_cloud().len(), 2);
    }

    #[test]
    fn test_world_cloud_requires_pose() {
        let mut frame = SensorFrame::new(
            "RGBD_1",
            10,
            Pose3D::identity(),
            RangeCloud::from_points(vec![Point3D::new(1.0, 0.0, 0.0)]),
        );
        assert!(frame.world_cloud().is_none());

        frame.pose = Some(Pose3D::from_xyz_ypr(1.0, 0.0, 0.0, 0.0, 0.0, 0.0));
        frame.apply_correction(&Pose3D::from_xyz_ypr(0.0, 1.0, 0.0, 0.0, 0.0, 0.0));
        let world = frame.world_cloud().unwrap();
        assert_relative_eq!(world.points[0].x, 2.0, epsilon = 1e-6);
        assert_relative_eq!(world.points[0].y, 1.0, epsilon = 1e-6);
    }
}
