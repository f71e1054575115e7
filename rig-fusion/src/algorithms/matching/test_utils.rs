//! Shared synthetic scenes for matcher tests.

use crate::core::types::{Point3D, PointCloud2D, PointCloud3D};

/// Rectangular room outline (four walls), `n` points in total.
///
/// Walls carry a tiny per-point offset so no two points coincide.
pub fn create_room(n: usize, width: f32, height: f32) -> PointCloud2D {
    let mut cloud = PointCloud2D::new();
    let per_wall = n / 4;
    for i in 0..per_wall {
        let f = i as f32 / per_wall as f32;
        let noise = i as f32 * 0.0001;
        cloud.push_xy(f * width, noise);
        cloud.push_xy(width + noise, f * height);
        cloud.push_xy(width - f * width, height + noise);
        cloud.push_xy(noise, height - f * height);
    }
    cloud
}

/// Corner of a room: floor, two walls and a box standing on the floor.
///
/// The box breaks the symmetry of the corner so every degree of freedom is
/// observable. Samples sit on a `spacing` grid with a small deterministic
/// jitter.
pub fn create_corner_scene(spacing: f32) -> PointCloud3D {
    let mut cloud = PointCloud3D::new();
    let steps = |len: f32| (len / spacing) as usize;
    let jitter = |i: usize, j: usize| ((i * 7 + j * 13) % 11) as f32 * spacing * 0.02;

    // floor z = 0
    for i in 0..steps(3.0) {
        for j in 0..steps(2.0) {
            let x = i as f32 * spacing + jitter(i, j);
            let y = j as f32 * spacing + jitter(j, i);
            cloud.push(Point3D::new(x, y, 0.0));
        }
    }
    // wall x = 0
    for j in 0..steps(2.0) {
        for k in 1..steps(1.5) {
            cloud.push(Point3D::new(0.0, j as f32 * spacing + jitter(j, k), k as f32 * spacing));
        }
    }
    // wall y = 0
    for i in 1..steps(3.0) {
        for k in 1..steps(1.5) {
            cloud.push(Point3D::new(i as f32 * spacing + jitter(k, i), 0.0, k as f32 * spacing));
        }
    }
    // box top at z = 0.5 over [1.5, 2.1] × [0.8, 1.2]
    for i in 0..steps(0.6) {
        for j in 0..steps(0.4) {
            cloud.push(Point3D::new(
                1.5 + i as f32 * spacing,
                0.8 + j as f32 * spacing,
                0.5,
            ));
        }
    }
    // box front face x = 1.5
    for j in 0..steps(0.4) {
        for k in 1..steps(0.5) {
            cloud.push(Point3D::new(1.5, 0.8 + j as f32 * spacing, k as f32 * spacing));
        }
    }
    cloud
}
