//! 2D trajectory estimation.
//!
//! Each planar scan is aligned against the static reference map, seeded
//! with the last accepted pose. Scans whose goodness clears the acceptance
//! threshold extend the trajectory; everything else is reported back so
//! the interpolator can discard frames it can no longer bracket.

use serde::{Deserialize, Serialize};

use crate::algorithms::matching::{IcpConfig, PointToPointIcp, ScanMatcher};
use crate::core::types::{LaserScan, PointCloud2D, Pose2D, Timestamped};
use crate::error::{FusionError, Result};
use crate::io::TrajectoryLog;

/// Configuration for the trajectory estimator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrajectoryConfig {
    /// Scans must score strictly above this goodness (0-100).
    pub accept_goodness: f32,

    /// Starting guess `[x, y, yaw_degrees]` in the map frame.
    pub initial_pose: [f32; 3],

    pub icp: IcpConfig,
}

impl Default for TrajectoryConfig {
    fn default() -> Self {
        Self {
            accept_goodness: 80.0,
            initial_pose: [0.0, 0.0, 0.0],
            icp: IcpConfig::default(),
        }
    }
}

impl TrajectoryConfig {
    pub fn initial_guess(&self) -> Pose2D {
        let [x, y, yaw] = self.initial_pose;
        Pose2D::new(x, y, yaw.to_radians())
    }
}

/// An accepted robot pose.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RobotPose {
    pub pose: Timestamped<Pose2D>,
    /// Scan match goodness (0-100)
    pub goodness: f32,
}

impl RobotPose {
    pub fn new(pose: Pose2D, timestamp_us: u64, goodness: f32) -> Self {
        Self {
            pose: Timestamped::new(pose, timestamp_us),
            goodness,
        }
    }

    #[inline]
    pub fn timestamp_us(&self) -> u64 {
        self.pose.timestamp_us
    }

    #[inline]
    pub fn pose(&self) -> &Pose2D {
        &self.pose.data
    }
}

/// Why a scan did not extend the trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    LowGoodness,
    NonIncreasingTimestamp,
    EmptyScan,
}

/// Outcome of one scan.
#[derive(Debug, Clone, PartialEq)]
pub enum TrajectoryStep {
    Accepted(RobotPose),
    Rejected { goodness: f32, reason: RejectReason },
}

impl TrajectoryStep {
    pub fn is_accepted(&self) -> bool {
        matches!(self, TrajectoryStep::Accepted(_))
    }
}

/// Scan-to-map trajectory estimator.
pub struct TrajectoryEstimator<M: ScanMatcher = PointToPointIcp> {
    matcher: M,
    accept_goodness: f32,
    map: PointCloud2D,
    scanner_pose: Pose2D,
    guess: Pose2D,
    history: Vec<RobotPose>,
    rejected: usize,
    log: Option<TrajectoryLog>,
}

impl TrajectoryEstimator<PointToPointIcp> {
    /// Estimator with the planar ICP matcher from `config`.
    ///
    /// `scanner_pose` is the scanner mounting on the robot.
    pub fn new(config: &TrajectoryConfig, map: PointCloud2D, scanner_pose: Pose2D) -> Self {
        Self::with_matcher(
            PointToPointIcp::new(config.icp.clone()),
            config,
            map,
            scanner_pose,
        )
    }
}

impl<M: ScanMatcher> TrajectoryEstimator<M> {
    pub fn with_matcher(
        matcher: M,
        config: &TrajectoryConfig,
        map: PointCloud2D,
        scanner_pose: Pose2D,
    ) -> Self {
        Self {
            matcher,
            accept_goodness: config.accept_goodness,
            map,
            scanner_pose,
            guess: config.initial_guess(),
            history: Vec::new(),
            rejected: 0,
            log: None,
        }
    }

    /// Append accepted poses to `log`.
    pub fn with_log(mut self, log: TrajectoryLog) -> Self {
        self.log = Some(log);
        self
    }

    /// Align one scan and extend the trajectory on success.
    ///
    /// Errors only when the trajectory log cannot be written.
    pub fn estimate(&mut self, scan: &LaserScan, timestamp_us: u64) -> Result<TrajectoryStep> {
        if let Some(last) = self.history.last()
            && timestamp_us <= last.timestamp_us()
        {
            log::warn!(
                "Scan at {} us is not after last accepted pose at {} us, skipping",
                timestamp_us,
                last.timestamp_us()
            );
            return Ok(self.reject(0.0, RejectReason::NonIncreasingTimestamp));
        }

        let points = scan.to_point_cloud(&self.scanner_pose);
        if points.is_empty() {
            log::debug!("Scan at {} us has no valid returns", timestamp_us);
            return Ok(self.reject(0.0, RejectReason::EmptyScan));
        }

        let result = self.matcher.match_scans(&points, &self.map, &self.guess);
        if result.goodness <= self.accept_goodness {
            log::debug!(
                "Scan at {} us rejected: goodness {:.1}% after {} iterations",
                timestamp_us,
                result.goodness,
                result.iterations
            );
            return Ok(self.reject(result.goodness, RejectReason::LowGoodness));
        }

        let accepted = RobotPose::new(result.transform, timestamp_us, result.goodness);
        self.guess = result.transform;
        self.history.push(accepted);

        if let Some(log) = self.log.as_mut() {
            log.append(&result.transform)
                .map_err(|e| FusionError::io(log.path(), e))?;
        }

        log::trace!(
            "Pose at {} us: ({:.3}, {:.3}, {:.1}°) goodness {:.1}%",
            timestamp_us,
            result.transform.x,
            result.transform.y,
            result.transform.theta.to_degrees(),
            result.goodness
        );
        Ok(TrajectoryStep::Accepted(accepted))
    }

    fn reject(&mut self, goodness: f32, reason: RejectReason) -> TrajectoryStep {
        self.rejected += 1;
        TrajectoryStep::Rejected { goodness, reason }
    }

    /// Current seed for the next scan.
    pub fn guess(&self) -> &Pose2D {
        &self.guess
    }

    pub fn poses(&self) -> &[RobotPose] {
        &self.history
    }

    pub fn rejected_count(&self) -> usize {
        self.rejected
    }

    /// Flush the log and hand back the trajectory with the still
    /// unfinished log, which the caller moves into place once the run
    /// has succeeded.
    pub fn finish(mut self) -> Result<(Vec<RobotPose>, Option<TrajectoryLog>)> {
        if let Some(log) = self.log.as_mut() {
            log.flush().map_err(|e| FusionError::io(log.path(), e))?;
            log::info!(
                "Wrote {} trajectory rows to {}",
                log.rows(),
                log.path().display()
            );
        }
        Ok((self.history, self.log))
    }
}
