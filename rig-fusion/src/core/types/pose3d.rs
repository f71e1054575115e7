//! Rigid 3D points and poses.
//!
//! [`Pose3D`] is a thin wrapper over `nalgebra::Isometry3<f32>` that speaks
//! the yaw/pitch/roll vocabulary used by the rig configuration. Rotation
//! order is `R = Rz(yaw) · Ry(pitch) · Rx(roll)`.

use nalgebra::{Isometry3, Point3, Translation3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use super::pose::Pose2D;

/// A 3D point in meters.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point3D {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Point3D {
    #[inline]
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub fn to_point3(self) -> Point3<f32> {
        Point3::new(self.x, self.y, self.z)
    }

    #[inline]
    pub fn from_point3(p: &Point3<f32>) -> Self {
        Self::new(p.x, p.y, p.z)
    }

    #[inline]
    pub fn as_array(&self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }

    /// True when all coordinates are finite.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Euclidean norm (distance from the origin).
    #[inline]
    pub fn norm(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

/// Six-degree-of-freedom rigid pose.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose3D {
    iso: Isometry3<f32>,
}

impl Pose3D {
    #[inline]
    pub fn identity() -> Self {
        Self {
            iso: Isometry3::identity(),
        }
    }

    #[inline]
    pub fn from_isometry(iso: Isometry3<f32>) -> Self {
        Self { iso }
    }

    /// Build from a translation and yaw/pitch/roll in radians.
    pub fn from_xyz_ypr(x: f32, y: f32, z: f32, yaw: f32, pitch: f32, roll: f32) -> Self {
        let rotation = UnitQuaternion::from_euler_angles(roll, pitch, yaw);
        Self {
            iso: Isometry3::from_parts(Translation3::new(x, y, z), rotation),
        }
    }

    /// Lift a planar pose into 3D (z = 0, pitch = roll = 0).
    pub fn from_pose2d(pose: &Pose2D) -> Self {
        Self::from_xyz_ypr(pose.x, pose.y, 0.0, pose.theta, 0.0, 0.0)
    }

    #[inline]
    pub fn isometry(&self) -> &Isometry3<f32> {
        &self.iso
    }

    #[inline]
    pub fn x(&self) -> f32 {
        self.iso.translation.x
    }

    #[inline]
    pub fn y(&self) -> f32 {
        self.iso.translation.y
    }

    #[inline]
    pub fn z(&self) -> f32 {
        self.iso.translation.z
    }

    #[inline]
    pub fn translation(&self) -> Vector3<f32> {
        self.iso.translation.vector
    }

    /// Rotation as (yaw, pitch, roll) in radians.
    pub fn ypr(&self) -> (f32, f32, f32) {
        let (roll, pitch, yaw) = self.iso.rotation.euler_angles();
        (yaw, pitch, roll)
    }

    #[inline]
    pub fn yaw(&self) -> f32 {
        self.ypr().0
    }

    /// Planar projection: position x/y and yaw.
    pub fn to_pose2d(&self) -> Pose2D {
        Pose2D::new(self.x(), self.y(), self.yaw())
    }

    /// self ∘ other: apply `other` in the frame of `self`.
    #[inline]
    pub fn compose(&self, other: &Pose3D) -> Pose3D {
        Pose3D {
            iso: self.iso * other.iso,
        }
    }

    #[inline]
    pub fn inverse(&self) -> Pose3D {
        Pose3D {
            iso: self.iso.inverse(),
        }
    }

    #[inline]
    pub fn transform_point(&self, point: &Point3D) -> Point3D {
        Point3D::from_point3(&(self.iso * point.to_point3()))
    }

    /// Translation distance on the ground plane.
    pub fn planar_distance(&self, other: &Pose3D) -> f32 {
        let dx = self.x() - other.x();
        let dy = self.y() - other.y();
        (dx * dx + dy * dy).sqrt()
    }

    /// Rotation angle of this pose, in radians.
    pub fn rotation_angle(&self) -> f32 {
        self.iso.rotation.angle()
    }
}

impl Default for Pose3D {
    fn default() -> Self {
        Self::identity()
    }
}

impl From<Pose2D> for Pose3D {
    fn from(pose: Pose2D) -> Self {
        Self::from_pose2d(&pose)
    }
}
