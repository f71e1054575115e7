//! Overlap-based reference selection.
//!
//! Only reference frames whose convex hull overlaps the hull of at least
//! one current frame contribute to the registration target. Frames whose
//! hull cannot be built (too few or coplanar points) are kept.

use serde::{Deserialize, Serialize};

use crate::algorithms::geometry::ConvexHull;
use crate::core::types::PointCloud3D;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlapConfig {
    /// Points sampled per cloud when building its hull.
    pub max_hull_points: usize,
}

impl Default for OverlapConfig {
    fn default() -> Self {
        Self {
            max_hull_points: 1500,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct OverlapSelector {
    config: OverlapConfig,
}

impl OverlapSelector {
    pub fn new(config: OverlapConfig) -> Self {
        Self { config }
    }

    /// Hull of a world-frame cloud, `None` when degenerate.
    pub fn hull_of(&self, cloud: &PointCloud3D) -> Option<ConvexHull> {
        ConvexHull::from_cloud(cloud, self.config.max_hull_points)
    }

    /// Overlap test where a missing hull overlaps everything.
    pub fn overlaps(a: Option<&ConvexHull>, b: Option<&ConvexHull>) -> bool {
        match (a, b) {
            (Some(a), Some(b)) => a.overlaps(b),
            _ => true,
        }
    }

    /// True when `reference` overlaps any of `current`.
    pub fn selects(reference: Option<&ConvexHull>, current: &[Option<ConvexHull>]) -> bool {
        current.is_empty()
            || current
                .iter()
                .any(|c| Self::overlaps(reference, c.as_ref()))
    }
}
