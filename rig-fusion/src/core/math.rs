//! Angular arithmetic shared by the 2D trajectory and the key-pose filter.

use std::f32::consts::PI;

/// Normalize angle to [-π, π].
///
/// # Example
/// ```
/// use rig_fusion::core::math::normalize_angle;
/// use std::f32::consts::PI;
///
/// assert!((normalize_angle(2.5 * PI) - 0.5 * PI).abs() < 1e-5);
/// assert!((normalize_angle(-2.5 * PI) + 0.5 * PI).abs() < 1e-5);
/// ```
#[inline]
pub fn normalize_angle(angle: f32) -> f32 {
    let mut a = angle % (2.0 * PI);
    if a > PI {
        a -= 2.0 * PI;
    } else if a < -PI {
        a += 2.0 * PI;
    }
    a
}

/// Shortest signed angular difference from `a` to `b`.
///
/// ```
/// use rig_fusion::core::math::angle_diff;
/// use std::f32::consts::PI;
///
/// let diff = angle_diff(PI - 0.1, -PI + 0.1);
/// assert!((diff - 0.2).abs() < 1e-6);
/// ```
#[inline]
pub fn angle_diff(a: f32, b: f32) -> f32 {
    normalize_angle(b - a)
}

/// Absolute heading change between two yaw angles, in radians.
#[inline]
pub fn heading_change(a: f32, b: f32) -> f32 {
    angle_diff(a, b).abs()
}

/// Linear interpolation between two angles along the shortest arc.
///
/// `t` in [0, 1] maps `a` to `b`; values outside extrapolate.
#[inline]
pub fn angle_lerp(a: f32, b: f32, t: f32) -> f32 {
    normalize_angle(a + angle_diff(a, b) * t)
}
