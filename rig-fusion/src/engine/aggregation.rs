//! Sensor set aggregation and key-pose filtering.
//!
//! The aggregator keeps one slot per sensor. A frame fills (or overwrites)
//! the slot of its sensor; once every slot is filled the set is emitted and
//! the slots are cleared.
//!
//! The key-pose filter keeps a set only when *every* sensor moved enough
//! since the previous accepted set, so that redundant views of the same
//! place do not pile up in the reference.

use serde::{Deserialize, Serialize};

use crate::core::math::heading_change;
use crate::core::types::{IndexedFrame, PointCloud3D, Pose3D};

/// One frame per sensor, ordered by slot.
#[derive(Debug, Clone)]
pub struct SensorSet {
    /// Zero-based count of sets emitted before this one
    pub sequence: usize,
    pub frames: Vec<IndexedFrame>,
}

impl SensorSet {
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Stream indices of the member frames.
    pub fn indices(&self) -> Vec<usize> {
        self.frames.iter().map(|f| f.index).collect()
    }

    /// `(sensor, pose)` for every posed member.
    pub fn poses(&self) -> Vec<(String, Pose3D)> {
        self.frames
            .iter()
            .filter_map(|f| f.frame.pose.map(|p| (f.frame.sensor.clone(), p)))
            .collect()
    }

    /// Member clouds merged in the world frame.
    pub fn world_cloud(&self) -> PointCloud3D {
        let mut merged = PointCloud3D::new();
        for f in &self.frames {
            if let Some(cloud) = f.frame.world_cloud() {
                merged.extend_from(&cloud);
            }
        }
        merged
    }
}

/// Result of feeding one frame to the aggregator.
#[derive(Debug)]
pub enum Aggregated {
    /// Stored; the set is still incomplete
    Pending,
    /// Stored and the set is now complete
    Complete(SensorSet),
    /// Stored, replacing an older frame of the same sensor
    Displaced(IndexedFrame),
    /// The frame's sensor has no slot
    Unknown(IndexedFrame),
}

/// Slot-per-sensor set builder.
#[derive(Debug)]
pub struct SensorSetAggregator {
    labels: Vec<String>,
    slots: Vec<Option<IndexedFrame>>,
    emitted: usize,
}

impl SensorSetAggregator {
    pub fn new(labels: Vec<String>) -> Self {
        let slots = vec![None; labels.len()];
        Self {
            labels,
            slots,
            emitted: 0,
        }
    }

    pub fn push(&mut self, frame: IndexedFrame) -> Aggregated {
        let Some(slot) = self.labels.iter().position(|l| *l == frame.frame.sensor) else {
            return Aggregated::Unknown(frame);
        };

        if let Some(old) = self.slots[slot].replace(frame) {
            log::debug!(
                "Frame {} of {} overwritten before its set completed",
                old.index,
                old.frame.sensor
            );
            return Aggregated::Displaced(old);
        }

        if self.slots.iter().all(Option::is_some) {
            let frames = self.slots.iter_mut().filter_map(Option::take).collect();
            let set = SensorSet {
                sequence: self.emitted,
                frames,
            };
            self.emitted += 1;
            return Aggregated::Complete(set);
        }
        Aggregated::Pending
    }

    /// Frames of the unfinished set, in slot order.
    pub fn drain(&mut self) -> Vec<IndexedFrame> {
        self.slots.iter_mut().filter_map(Option::take).collect()
    }
}

/// Motion thresholds for the key-pose filter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyPoseConfig {
    /// Planar distance a sensor must exceed (meters).
    pub min_distance: f32,
    /// Heading change a sensor must exceed (degrees).
    pub min_rotation_deg: f32,
}

impl Default for KeyPoseConfig {
    fn default() -> Self {
        Self {
            min_distance: 0.3,
            min_rotation_deg: 20.0,
        }
    }
}

/// Verdict on a candidate set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyPoseDecision {
    /// First set of the run
    Seed,
    Accepted,
    /// `sensor` did not move enough
    Rejected { sensor: String },
}

impl KeyPoseDecision {
    pub fn is_kept(&self) -> bool {
        !matches!(self, KeyPoseDecision::Rejected { .. })
    }
}

#[derive(Debug, Clone)]
pub struct KeyPoseFilter {
    min_distance: f32,
    min_rotation: f32,
}

impl KeyPoseFilter {
    pub fn new(config: &KeyPoseConfig) -> Self {
        Self {
            min_distance: config.min_distance,
            min_rotation: config.min_rotation_deg.to_radians(),
        }
    }

    /// True when a sensor moved from `before` to `after` by more than
    /// either threshold.
    pub fn has_moved(&self, before: &Pose3D, after: &Pose3D) -> bool {
        before.planar_distance(after) > self.min_distance
            || heading_change(before.yaw(), after.yaw()) > self.min_rotation
    }

    /// Compare `candidate` against the poses of the previous accepted set.
    ///
    /// Sensors without a pose on either side count as moved.
    pub fn evaluate(
        &self,
        candidate: &SensorSet,
        previous: Option<&[(String, Pose3D)]>,
    ) -> KeyPoseDecision {
        let Some(previous) = previous else {
            return KeyPoseDecision::Seed;
        };

        for item in &candidate.frames {
            let Some(now) = item.frame.pose else {
                continue;
            };
            let Some((_, before)) = previous.iter().find(|(s, _)| *s == item.frame.sensor) else {
                continue;
            };
            if !self.has_moved(before, &now) {
                return KeyPoseDecision::Rejected {
                    sensor: item.frame.sensor.clone(),
                };
            }
        }
        KeyPoseDecision::Accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{RangeCloud, SensorFrame};

    fn posed(index: usize, sensor: &str, x: f32, yaw_deg: f32) -> IndexedFrame {
        let mut frame = SensorFrame::new(sensor, index as u64, Pose3D::identity(), RangeCloud::default());
        frame.pose = Some(Pose3D::from_xyz_ypr(x, 0.0, 0.0, yaw_deg.to_radians(), 0.0, 0.0));
        IndexedFrame::new(index, frame)
    }

    fn labels() -> Vec<String> {
        vec!["A".to_string(), "B".to_string()]
    }

    #[test]
    fn test_set_completes_in_slot_order() {
        let mut agg = SensorSetAggregator::new(labels());
        assert!(matches!(agg.push(posed(0, "B", 0.0, 0.0)), Aggregated::Pending));
        match agg.push(posed(1, "A", 0.0, 0.0)) {
            Aggregated::Complete(set) => {
                assert_eq!(set.sequence, 0);
                assert_eq!(set.indices(), vec![1, 0]);
            }
            other => panic!("expected complete set, got {:?}", other),
        }
        assert!(agg.drain().is_empty());
    }

    #[test]
    fn test_overwrite_and_unknown() {
        let mut agg = SensorSetAggregator::new(labels());
        agg.push(posed(0, "A", 0.0, 0.0));
        match agg.push(posed(1, "A", 0.0, 0.0)) {
            Aggregated::Displaced(old) => assert_eq!(old.index, 0),
            other => panic!("expected displaced frame, got {:?}", other),
        }
        assert!(matches!(agg.push(posed(2, "C", 0.0, 0.0)), Aggregated::Unknown(_)));

        let leftovers = agg.drain();
        assert_eq!(leftovers.len(), 1);
        assert_eq!(leftovers[0].index, 1);
    }

    fn set(frames: Vec<IndexedFrame>) -> SensorSet {
        SensorSet {
            sequence: 0,
            frames,
        }
    }

    #[test]
    fn test_first_set_is_seed() {
        let filter = KeyPoseFilter::new(&KeyPoseConfig::default());
        let candidate = set(vec![posed(0, "A", 0.0, 0.0)]);
        assert_eq!(filter.evaluate(&candidate, None), KeyPoseDecision::Seed);
    }

    #[test]
    fn test_distance_or_rotation_counts_as_motion() {
        let filter = KeyPoseFilter::new(&KeyPoseConfig::default());
        let previous = set(vec![posed(0, "A", 0.0, 0.0)]).poses();

        let small = set(vec![posed(1, "A", 0.2, 5.0)]);
        assert!(!filter.evaluate(&small, Some(&previous)).is_kept());

        let far = set(vec![posed(2, "A", 0.35, 0.0)]);
        assert_eq!(filter.evaluate(&far, Some(&previous)), KeyPoseDecision::Accepted);

        let turned = set(vec![posed(3, "A", 0.0, 25.0)]);
        assert_eq!(filter.evaluate(&turned, Some(&previous)), KeyPoseDecision::Accepted);
    }

    #[test]
    fn test_every_sensor_must_move() {
        let filter = KeyPoseFilter::new(&KeyPoseConfig::default());
        let previous = set(vec![posed(0, "A", 0.0, 0.0), posed(1, "B", 0.0, 0.0)]).poses();

        let one_moved = set(vec![posed(2, "A", 1.0, 0.0), posed(3, "B", 0.1, 0.0)]);
        assert_eq!(
            filter.evaluate(&one_moved, Some(&previous)),
            KeyPoseDecision::Rejected {
                sensor: "B".to_string()
            }
        );

        let both_moved = set(vec![posed(4, "A", 1.0, 0.0), posed(5, "B", 0.0, 30.0)]);
        assert_eq!(
            filter.evaluate(&both_moved, Some(&previous)),
            KeyPoseDecision::Accepted
        );
    }

    #[test]
    fn test_heading_change_wraps() {
        let filter = KeyPoseFilter::new(&KeyPoseConfig::default());
        let before = Pose3D::from_xyz_ypr(0.0, 0.0, 0.0, 175f32.to_radians(), 0.0, 0.0);
        let after = Pose3D::from_xyz_ypr(0.0, 0.0, 0.0, (-175f32).to_radians(), 0.0, 0.0);
        assert!(!filter.has_moved(&before, &after));
    }
}
