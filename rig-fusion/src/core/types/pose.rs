//! Planar point and pose types.

use serde::{Deserialize, Serialize};

use crate::core::math::{angle_diff, normalize_angle};

/// A 2D point in meters.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2D {
    /// X coordinate in meters
    pub x: f32,
    /// Y coordinate in meters
    pub y: f32,
}

impl Point2D {
    /// Create a new point.
    #[inline]
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Squared distance to another point (avoids sqrt).
    #[inline]
    pub fn distance_squared(&self, other: &Point2D) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// Distance to another point.
    #[inline]
    pub fn distance(&self, other: &Point2D) -> f32 {
        self.distance_squared(other).sqrt()
    }
}

/// Robot pose on the ground plane.
///
/// Position (x, y) in meters and heading (theta) in radians, normalized
/// to [-π, π].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose2D {
    /// X position in meters
    pub x: f32,
    /// Y position in meters
    pub y: f32,
    /// Heading in radians, normalized to [-π, π]
    pub theta: f32,
}

impl Pose2D {
    /// Create a new pose with theta normalized to [-π, π].
    #[inline]
    pub fn new(x: f32, y: f32, theta: f32) -> Self {
        Self {
            x,
            y,
            theta: normalize_angle(theta),
        }
    }

    /// Identity pose at origin with zero heading.
    #[inline]
    pub fn identity() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            theta: 0.0,
        }
    }

    /// Compose two poses: self ⊕ other
    ///
    /// ```text
    /// C = A ⊕ B:
    ///   C.x = A.x + B.x * cos(A.θ) - B.y * sin(A.θ)
    ///   C.y = A.y + B.x * sin(A.θ) + B.y * cos(A.θ)
    ///   C.θ = normalize(A.θ + B.θ)
    /// ```
    #[inline]
    pub fn compose(&self, other: &Pose2D) -> Pose2D {
        let (sin_t, cos_t) = self.theta.sin_cos();
        Pose2D::new(
            self.x + other.x * cos_t - other.y * sin_t,
            self.y + other.x * sin_t + other.y * cos_t,
            self.theta + other.theta,
        )
    }

    /// Inverse of this pose.
    #[inline]
    pub fn inverse(&self) -> Pose2D {
        let (sin_t, cos_t) = self.theta.sin_cos();
        Pose2D::new(
            -self.x * cos_t - self.y * sin_t,
            self.x * sin_t - self.y * cos_t,
            -self.theta,
        )
    }

    /// Pose of `other` expressed in the frame of `self`: self⁻¹ ⊕ other.
    ///
    /// The heading component is the shortest signed turn.
    #[inline]
    pub fn relative_to(&self, other: &Pose2D) -> Pose2D {
        let (sin_t, cos_t) = self.theta.sin_cos();
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        Pose2D {
            x: dx * cos_t + dy * sin_t,
            y: -dx * sin_t + dy * cos_t,
            theta: angle_diff(self.theta, other.theta),
        }
    }

    /// Scale every component of a relative motion by `factor`.
    #[inline]
    pub fn scaled(&self, factor: f32) -> Pose2D {
        Pose2D::new(self.x * factor, self.y * factor, self.theta * factor)
    }

    /// Transform a point from local frame to global frame.
    #[inline]
    pub fn transform_point(&self, point: &Point2D) -> Point2D {
        let (sin_t, cos_t) = self.theta.sin_cos();
        Point2D::new(
            self.x + point.x * cos_t - point.y * sin_t,
            self.y + point.x * sin_t + point.y * cos_t,
        )
    }

    /// Euclidean distance between the positions of two poses.
    #[inline]
    pub fn distance(&self, other: &Pose2D) -> f32 {
        Point2D::new(self.x, self.y).distance(&Point2D::new(other.x, other.y))
    }

    /// Pose a fraction `factor` of the way from `start` to `end`.
    ///
    /// The motion `start⁻¹ ⊕ end` is scaled component-wise and composed
    /// back onto `start`, so the position moves along the straight segment
    /// and the heading turns along the shortest arc. Factors outside
    /// [0, 1] extrapolate.
    pub fn interpolate(start: &Pose2D, end: &Pose2D, factor: f32) -> Pose2D {
        let delta = start.relative_to(end);
        start.compose(&delta.scaled(factor))
    }
}

impl Default for Pose2D {
    fn default() -> Self {
        Self::identity()
    }
}
