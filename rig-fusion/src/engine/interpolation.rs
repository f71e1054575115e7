//! Temporal pose interpolation for 3D frames.
//!
//! 3D frames wait in a buffer until two accepted robot poses bracket them.
//! Each bracketed frame gets the robot pose at its capture time, composed
//! with the sensor mounting:
//!
//! ```text
//! f     = (t - t1) / (t2 - t1)
//! robot = p1 ⊕ (f · (p1⁻¹ ⊕ p2))
//! world = robot ∘ sensor_pose
//! ```

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::trajectory::RobotPose;
use crate::core::types::{IndexedFrame, Pose2D, Pose3D, SensorFrame};

/// What to do with frames outside the bracketing interval.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntervalPolicy {
    /// Drop frames older than the bracket; newer ones wait for the next.
    #[default]
    Reject,
    /// Older frames take the bracket start; newer ones wait.
    Clamp,
    /// Pose every buffered frame with the raw factor.
    Extrapolate,
}

/// What to do with buffered frames when a scan is rejected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RejectedScanPolicy {
    /// Discard the buffer.
    #[default]
    Drop,
    /// Keep the buffer for the next accepted bracket.
    Hold,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpolationConfig {
    pub interval_policy: IntervalPolicy,
    pub rejected_scan_policy: RejectedScanPolicy,
}

/// Frame counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InterpolationStats {
    pub posed: usize,
    /// Frames dropped for lying before their bracket
    pub out_of_interval: usize,
    /// Frames discarded because a scan was rejected
    pub dropped_on_reject: usize,
    /// Frames still waiting when the stream ended
    pub dropped_at_end: usize,
}

impl InterpolationStats {
    pub fn dropped(&self) -> usize {
        self.out_of_interval + self.dropped_on_reject + self.dropped_at_end
    }
}

/// Fraction of the way from `t1` to `t2` at which `t` lies.
///
/// Callers guarantee `t2 > t1`.
#[inline]
pub fn interpolation_factor(t: u64, t1: u64, t2: u64) -> f32 {
    ((t as f64 - t1 as f64) / (t2 as f64 - t1 as f64)) as f32
}

/// Pose a frame directly at its mounting, for runs without a trajectory.
pub fn assign_mount_pose(frame: &mut SensorFrame) {
    frame.pose = Some(frame.sensor_pose);
}

/// Buffers frames and poses them once bracketed.
#[derive(Debug, Default)]
pub struct TemporalPoseInterpolator {
    config: InterpolationConfig,
    pending: VecDeque<IndexedFrame>,
    previous: Option<RobotPose>,
    stats: InterpolationStats,
}

impl TemporalPoseInterpolator {
    pub fn new(config: InterpolationConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Buffer a frame until a bracket is available.
    pub fn push(&mut self, frame: IndexedFrame) {
        self.pending.push_back(frame);
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Register an accepted pose and return every frame it lets us pose,
    /// in buffer order.
    pub fn on_accepted(&mut self, pose: &RobotPose) -> Vec<IndexedFrame> {
        let Some(start) = self.previous.replace(*pose) else {
            return Vec::new();
        };
        let t1 = start.timestamp_us();
        let t2 = pose.timestamp_us();
        if t2 <= t1 {
            return Vec::new();
        }

        let mut posed = Vec::new();
        let mut waiting = VecDeque::with_capacity(self.pending.len());

        for mut item in self.pending.drain(..) {
            let t = item.frame.timestamp_us;
            let raw = interpolation_factor(t, t1, t2);

            let factor = match self.config.interval_policy {
                IntervalPolicy::Extrapolate => raw,
                _ if t > t2 => {
                    waiting.push_back(item);
                    continue;
                }
                IntervalPolicy::Reject if t < t1 => {
                    log::debug!(
                        "Frame {} at {} us precedes bracket [{}, {}], dropped",
                        item.index,
                        t,
                        t1,
                        t2
                    );
                    self.stats.out_of_interval += 1;
                    continue;
                }
                IntervalPolicy::Reject | IntervalPolicy::Clamp => raw.clamp(0.0, 1.0),
            };

            let robot = Pose2D::interpolate(start.pose(), pose.pose(), factor);
            item.frame.pose = Some(Pose3D::from(robot).compose(&item.frame.sensor_pose));
            self.stats.posed += 1;
            posed.push(item);
        }

        self.pending = waiting;
        posed
    }

    /// A scan was rejected; apply the configured buffer policy.
    pub fn on_rejected(&mut self) {
        if self.config.rejected_scan_policy == RejectedScanPolicy::Drop && !self.pending.is_empty()
        {
            log::debug!(
                "Scan rejected, discarding {} buffered frames",
                self.pending.len()
            );
            self.stats.dropped_on_reject += self.pending.len();
            self.pending.clear();
        }
    }

    /// End of stream: drop frames that never got a bracket.
    pub fn finish(&mut self) -> usize {
        let n = self.pending.len();
        if n > 0 {
            log::info!("{} frames never bracketed by two accepted scans, dropped", n);
        }
        self.stats.dropped_at_end += n;
        self.pending.clear();
        n
    }

    pub fn stats(&self) -> InterpolationStats {
        self.stats
    }
}
