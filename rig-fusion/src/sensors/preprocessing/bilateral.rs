//! Edge-preserving smoothing of organized range captures.
//!
//! A bilateral filter over the pixel grid: each valid pixel's range is
//! replaced by a weighted mean of its neighbours, with weights falling off
//! with pixel distance (`sigma_s`) and with range difference (`sigma_r`).
//! Points move along their own viewing ray, so only depth noise is removed.

use serde::{Deserialize, Serialize};

use crate::core::types::{Point3D, RangeCloud};

/// Configuration for the bilateral range filter.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct BilateralConfig {
    /// Spatial standard deviation in pixels.
    ///
    /// Default: 10
    pub sigma_s: f32,

    /// Range standard deviation in meters.
    ///
    /// Default: 0.05m
    pub sigma_r: f32,

    /// Half-width of the square window in pixels.
    ///
    /// Default: 10
    pub window_radius: usize,
}

impl Default for BilateralConfig {
    fn default() -> Self {
        Self {
            sigma_s: 10.0,
            sigma_r: 0.05,
            window_radius: 10,
        }
    }
}

/// Bilateral filter for [`RangeCloud`] grids.
#[derive(Debug, Clone)]
pub struct BilateralFilter {
    config: BilateralConfig,
}

impl BilateralFilter {
    pub fn new(config: BilateralConfig) -> Self {
        Self { config }
    }

    /// Smooth `cloud` in place.
    ///
    /// Unorganized captures are left untouched. Returns the number of
    /// points that were adjusted.
    pub fn apply(&self, cloud: &mut RangeCloud) -> usize {
        if !cloud.is_organized() {
            log::debug!(
                "Skipping smoothing of unorganized cloud ({} points)",
                cloud.points.len()
            );
            return 0;
        }

        let w = cloud.width as usize;
        let h = cloud.height as usize;
        let radius = self.config.window_radius as isize;
        let inv_two_ss = 1.0 / (2.0 * self.config.sigma_s * self.config.sigma_s);
        let inv_two_sr = 1.0 / (2.0 * self.config.sigma_r * self.config.sigma_r);

        let ranges: Vec<Option<f32>> = cloud
            .points
            .iter()
            .map(|p| RangeCloud::is_valid_point(p).then(|| p.norm()))
            .collect();

        let mut smoothed: Vec<Point3D> = cloud.points.clone();
        let mut adjusted = 0usize;

        for v in 0..h {
            for u in 0..w {
                let idx = v * w + u;
                let Some(center) = ranges[idx] else {
                    continue;
                };

                let mut sum_w = 0.0f32;
                let mut sum_r = 0.0f32;
                for dv in -radius..=radius {
                    let nv = v as isize + dv;
                    if nv < 0 || nv >= h as isize {
                        continue;
                    }
                    for du in -radius..=radius {
                        let nu = u as isize + du;
                        if nu < 0 || nu >= w as isize {
                            continue;
                        }
                        let Some(r) = ranges[nv as usize * w + nu as usize] else {
                            continue;
                        };
                        let spatial = ((du * du + dv * dv) as f32) * inv_two_ss;
                        let diff = r - center;
                        let weight = (-spatial - diff * diff * inv_two_sr).exp();
                        sum_w += weight;
                        sum_r += weight * r;
                    }
                }

                let filtered = sum_r / sum_w;
                if (filtered - center).abs() > f32::EPSILON {
                    let scale = filtered / center;
                    let p = cloud.points[idx];
                    smoothed[idx] = Point3D::new(p.x * scale, p.y * scale, p.z * scale);
                    adjusted += 1;
                }
            }
        }

        cloud.points = smoothed;
        adjusted
    }
}
