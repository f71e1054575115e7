//! Registration reference: the frames new sets are aligned against.
//!
//! In replace mode the reference is exactly the last accepted set. In
//! accumulate mode every accepted set is appended and the target cloud is
//! thinned by a stride to keep alignment cost bounded.

use serde::{Deserialize, Serialize};

use super::aggregation::SensorSet;
use super::overlap::OverlapSelector;
use crate::algorithms::geometry::ConvexHull;
use crate::core::types::PointCloud3D;

/// Reference lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryMode {
    /// Reference = last accepted set
    #[default]
    Replace,
    /// Reference = every accepted set so far
    Accumulate,
}

/// One committed frame in world coordinates.
#[derive(Debug, Clone)]
pub struct ReferenceEntry {
    pub sensor: String,
    /// Stream index of the source frame
    pub index: usize,
    pub cloud: PointCloud3D,
    /// Only computed when overlap selection is enabled
    pub hull: Option<ConvexHull>,
}

#[derive(Debug)]
pub struct ReferenceAccumulator {
    mode: MemoryMode,
    stride: usize,
    entries: Vec<ReferenceEntry>,
    committed_sets: usize,
}

impl ReferenceAccumulator {
    pub fn new(mode: MemoryMode, stride: usize) -> Self {
        Self {
            mode,
            stride: stride.max(1),
            entries: Vec::new(),
            committed_sets: 0,
        }
    }

    /// Add an accepted set (after refinement or fallback).
    pub fn commit(&mut self, set: &SensorSet, selector: Option<&OverlapSelector>) {
        if self.mode == MemoryMode::Replace {
            self.entries.clear();
        }

        for item in &set.frames {
            let Some(cloud) = item.frame.world_cloud() else {
                continue;
            };
            let hull = selector.and_then(|s| s.hull_of(&cloud));
            self.entries.push(ReferenceEntry {
                sensor: item.frame.sensor.clone(),
                index: item.index,
                cloud,
                hull,
            });
        }

        self.committed_sets += 1;
        log::debug!(
            "Reference now holds {} frames from {} sets",
            self.entries.len(),
            self.committed_sets
        );
    }

    pub fn entries(&self) -> &[ReferenceEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Merge the entries accepted by `keep` into one target cloud.
    pub fn target_cloud(&self, keep: impl Fn(&ReferenceEntry) -> bool) -> PointCloud3D {
        let stride = match self.mode {
            MemoryMode::Replace => 1,
            MemoryMode::Accumulate => self.stride,
        };

        let mut target = PointCloud3D::new();
        for entry in self.entries.iter().filter(|e| keep(e)) {
            if stride == 1 {
                target.extend_from(&entry.cloud);
            } else {
                target.extend_from(&entry.cloud.subsample(stride));
            }
        }
        target
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{IndexedFrame, Point3D, Pose3D, RangeCloud, SensorFrame};

    fn set(start_index: usize, x: f32) -> SensorSet {
        let points: Vec<Point3D> = (0..10).map(|i| Point3D::new(i as f32, 0.0, 1.0)).collect();
        let frames = ["A", "B"]
            .iter()
            .enumerate()
            .map(|(k, label)| {
                let mut f = SensorFrame::new(
                    *label,
                    0,
                    Pose3D::identity(),
                    RangeCloud::from_points(points.clone()),
                );
                f.pose = Some(Pose3D::from_xyz_ypr(x, 0.0, 0.0, 0.0, 0.0, 0.0));
                IndexedFrame::new(start_index + k, f)
            })
            .collect();
        SensorSet {
            sequence: start_index,
            frames,
        }
    }

    #[test]
    fn test_replace_keeps_last_set_only() {
        let mut reference = ReferenceAccumulator::new(MemoryMode::Replace, 2);
        reference.commit(&set(0, 0.0), None);
        reference.commit(&set(2, 5.0), None);

        assert_eq!(reference.entries().len(), 2);
        assert!(reference.entries().iter().all(|e| e.index >= 2));
        let target = reference.target_cloud(|_| true);
        assert_eq!(target.len(), 20);
        assert_eq!(target.points[0].x, 5.0);
    }

    #[test]
    fn test_accumulate_grows_and_subsamples() {
        let mut reference = ReferenceAccumulator::new(MemoryMode::Accumulate, 2);
        reference.commit(&set(0, 0.0), None);
        reference.commit(&set(2, 5.0), None);

        assert_eq!(reference.entries().len(), 4);
        // 4 frames × 10 points, every second point
        assert_eq!(reference.target_cloud(|_| true).len(), 20);
        assert_eq!(reference.target_cloud(|e| e.sensor == "A").len(), 10);
    }

    #[test]
    fn test_unposed_frames_are_skipped() {
        let mut s = set(0, 0.0);
        s.frames[1].frame.pose = None;
        let mut reference = ReferenceAccumulator::new(MemoryMode::Replace, 1);
        reference.commit(&s, None);
        assert_eq!(reference.entries().len(), 1);
    }
}
