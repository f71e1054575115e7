//! End-to-end fusion pipeline.
//!
//! ```text
//! records ──► TrajectoryEstimator ──► TemporalPoseInterpolator
//!                                              │ posed frames
//!                                              ▼
//!                                   (bilateral smoothing)
//!                                              │
//!                                              ▼
//!                 SensorSetAggregator ──► KeyPoseFilter
//!                                              │ accepted sets
//!                                              ▼
//!   ReferenceAccumulator ◄──► PairwiseRegistrationEngine (+ OverlapSelector)
//!                                              │
//!                                              ▼
//!                         output records (input order, rejected sets removed)
//! ```
//!
//! Everything runs on one thread in input order. The pipeline owns no
//! global state: the whole run is driven by one immutable [`RunConfig`].

use std::time::{Duration, Instant};

use super::aggregation::{Aggregated, KeyPoseDecision, KeyPoseFilter, SensorSet, SensorSetAggregator};
use super::interpolation::{InterpolationStats, TemporalPoseInterpolator, assign_mount_pose};
use super::overlap::OverlapSelector;
use super::reference::ReferenceAccumulator;
use super::registration::{
    ChainKey, PairwiseRegistrationEngine, RegistrationOutcome, RegistrationStats,
};
use super::trajectory::{RobotPose, TrajectoryEstimator, TrajectoryStep};
use crate::algorithms::geometry::ConvexHull;
use crate::algorithms::matching::DynAligner;
use crate::config::RunConfig;
use crate::core::types::{IndexedFrame, PointCloud2D, Pose3D};
use crate::error::{FusionError, Result};
use crate::io::TrajectoryLog;
use crate::io::rawlog::StreamRecord;
use crate::sensors::preprocessing::BilateralFilter;

/// Records between progress lines while localizing.
const PROGRESS_INTERVAL: usize = 200;

/// Summary of one complete sensor set.
#[derive(Debug, Clone)]
pub struct SetReport {
    pub sequence: usize,
    /// Stream indices of the member frames
    pub indices: Vec<usize>,
    pub decision: KeyPoseDecision,
    pub outcomes: Vec<(ChainKey, RegistrationOutcome)>,
}

/// Per-set completion hook.
///
/// Called once every set has been fully processed, which is also the
/// natural point to checkpoint a long run.
pub trait ProgressSink {
    fn on_set_complete(&mut self, report: &SetReport);
}

/// Default sink: one info line per set.
#[derive(Debug, Default)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn on_set_complete(&mut self, report: &SetReport) {
        match &report.decision {
            KeyPoseDecision::Rejected { sensor } => {
                log::info!(
                    "Set {} {:?}: redundant ({} did not move), removed",
                    report.sequence,
                    report.indices,
                    sensor
                );
            }
            decision => {
                let qualities: Vec<String> = report
                    .outcomes
                    .iter()
                    .map(|(chain, o)| match o.quality() {
                        Some(q) => format!("{} {:.1}%", chain, q),
                        None => format!("{} skipped", chain),
                    })
                    .collect();
                log::info!(
                    "Set {} {:?}: {}{}",
                    report.sequence,
                    report.indices,
                    if *decision == KeyPoseDecision::Seed {
                        "seed"
                    } else {
                        "kept"
                    },
                    if qualities.is_empty() {
                        String::new()
                    } else {
                        format!(", {}", qualities.join(", "))
                    }
                );
            }
        }
    }
}

/// Wall-clock time per phase.
#[derive(Debug, Clone, Copy, Default)]
pub struct PhaseTimings {
    pub localize: Duration,
    pub smoothing: Duration,
    pub registration: Duration,
}

/// Counters for one run.
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    pub records_in: usize,
    pub records_out: usize,
    pub scans: usize,
    pub scans_accepted: usize,
    pub frames: usize,
    pub interpolation: InterpolationStats,
    pub frames_smoothed: usize,
    pub sets_complete: usize,
    pub sets_rejected: usize,
    pub frames_removed: usize,
    pub frames_displaced: usize,
    pub registration: RegistrationStats,
    pub timings: PhaseTimings,
}

impl RunStats {
    pub fn log_summary(&self) {
        log::info!("=== Run summary ===");
        log::info!(
            "Records: {} in, {} out",
            self.records_in,
            self.records_out
        );
        log::info!(
            "Scans: {} ({} accepted)",
            self.scans,
            self.scans_accepted
        );
        log::info!(
            "Frames: {} ({} posed, {} dropped, {} smoothed)",
            self.frames,
            self.interpolation.posed,
            self.interpolation.dropped(),
            self.frames_smoothed
        );
        log::info!(
            "Sets: {} complete, {} redundant ({} frames removed), {} displaced frames",
            self.sets_complete,
            self.sets_rejected,
            self.frames_removed,
            self.frames_displaced
        );
        if self.registration.attempted() > 0 || self.registration.skipped > 0 {
            log::info!(
                "Registration: {} accepted, {} fallbacks, {} skipped, mean quality {}",
                self.registration.accepted,
                self.registration.fallbacks,
                self.registration.skipped,
                self.registration
                    .mean_quality()
                    .map(|q| format!("{:.1}%", q))
                    .unwrap_or_else(|| "n/a".to_string())
            );
        }
        log::info!(
            "Timings: localize {:.2}s, smoothing {:.2}s, registration {:.2}s",
            self.timings.localize.as_secs_f64(),
            self.timings.smoothing.as_secs_f64(),
            self.timings.registration.as_secs_f64()
        );
    }
}

/// Result of a run.
#[derive(Debug)]
pub struct PipelineOutput {
    /// Output stream in input order
    pub records: Vec<StreamRecord>,
    pub trajectory: Vec<RobotPose>,
    /// Flushed but not yet moved into place; see [`TrajectoryLog::finish`]
    pub trajectory_log: Option<TrajectoryLog>,
    pub stats: RunStats,
}

/// State carried across sets during the registration phase.
struct SetStage {
    key_filter: Option<KeyPoseFilter>,
    selector: Option<OverlapSelector>,
    engine: Option<PairwiseRegistrationEngine<DynAligner>>,
    reference: ReferenceAccumulator,
    previous: Option<Vec<(String, Pose3D)>>,
    per_sensor: bool,
    use_2d_guess: bool,
}

/// Offline fusion pipeline.
pub struct FusionPipeline {
    config: RunConfig,
    sink: Box<dyn ProgressSink>,
}

impl FusionPipeline {
    pub fn new(config: &RunConfig) -> Self {
        Self {
            config: config.clone(),
            sink: Box::new(LogProgress),
        }
    }

    pub fn with_progress_sink(mut self, sink: Box<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Run the whole pipeline over `records`.
    ///
    /// `map` is the 2D reference map; `log` receives accepted 2D poses.
    pub fn run<I, E>(
        &mut self,
        records: I,
        map: PointCloud2D,
        log: Option<TrajectoryLog>,
    ) -> Result<PipelineOutput>
    where
        I: IntoIterator<Item = std::result::Result<StreamRecord, E>>,
        FusionError: From<E>,
    {
        let mut stats = RunStats::default();

        // Phase 1: 2D trajectory and frame posing
        let started = Instant::now();
        let (mut table, mut posed, trajectory, trajectory_log, seen_labels) =
            self.localize(records, map, log, &mut stats)?;
        stats.timings.localize = started.elapsed();

        // Phase 2: optional smoothing of posed clouds
        if self.config.modes.smooth_clouds {
            let started = Instant::now();
            let filter = BilateralFilter::new(self.config.smoothing);
            for item in posed.iter_mut() {
                if filter.apply(&mut item.frame.cloud) > 0 {
                    stats.frames_smoothed += 1;
                }
            }
            stats.timings.smoothing = started.elapsed();
        }

        // Phase 3: sets, key poses, registration
        let started = Instant::now();
        let labels = if self.config.sensors.is_empty() {
            log::info!("Sensors discovered from stream: {:?}", seen_labels);
            seen_labels
        } else {
            self.config.sensor_labels()
        };
        self.process_sets(labels, posed, &mut table, &mut stats);
        stats.timings.registration = started.elapsed();

        let records: Vec<StreamRecord> = table.into_iter().flatten().collect();
        stats.records_out = records.len();

        Ok(PipelineOutput {
            records,
            trajectory,
            trajectory_log,
            stats,
        })
    }

    /// Read every record, estimate the trajectory and pose 3D frames.
    ///
    /// Returns the output table (frames leave a hole to be filled later),
    /// the posed frames in stream order, the trajectory with its log, and
    /// the sensor labels in first-seen order.
    #[allow(clippy::type_complexity)]
    fn localize<I, E>(
        &self,
        records: I,
        map: PointCloud2D,
        log: Option<TrajectoryLog>,
        stats: &mut RunStats,
    ) -> Result<(
        Vec<Option<StreamRecord>>,
        Vec<IndexedFrame>,
        Vec<RobotPose>,
        Option<TrajectoryLog>,
        Vec<String>,
    )>
    where
        I: IntoIterator<Item = std::result::Result<StreamRecord, E>>,
        FusionError: From<E>,
    {
        let cfg = &self.config;
        let mut estimator =
            TrajectoryEstimator::new(&cfg.trajectory, map, cfg.scanner.to_pose2d());
        if let Some(log) = log {
            estimator = estimator.with_log(log);
        }
        let mut interpolator = TemporalPoseInterpolator::new(cfg.interpolation.clone());

        let mut table: Vec<Option<StreamRecord>> = Vec::new();
        let mut posed: Vec<IndexedFrame> = Vec::new();
        let mut seen_labels: Vec<String> = Vec::new();

        for (index, record) in records.into_iter().enumerate() {
            let record = record?;
            stats.records_in += 1;

            match record {
                StreamRecord::Scan2D(scan) => {
                    stats.scans += 1;
                    if cfg.modes.use_2d_guess {
                        match estimator.estimate(&scan.scan, scan.timestamp_us)? {
                            TrajectoryStep::Accepted(pose) => {
                                stats.scans_accepted += 1;
                                posed.extend(interpolator.on_accepted(&pose));
                            }
                            TrajectoryStep::Rejected { .. } => interpolator.on_rejected(),
                        }
                    }
                    table.push(Some(StreamRecord::Scan2D(scan)));
                }
                StreamRecord::Range3D(mut frame) => {
                    stats.frames += 1;
                    if !seen_labels.contains(&frame.sensor) {
                        seen_labels.push(frame.sensor.clone());
                    }
                    if let Some(mount) = cfg.sensor_extrinsic(&frame.sensor) {
                        frame.sensor_pose = mount;
                    }
                    if cfg.modes.use_2d_guess {
                        interpolator.push(IndexedFrame::new(index, frame));
                    } else {
                        assign_mount_pose(&mut frame);
                        posed.push(IndexedFrame::new(index, frame));
                    }
                    table.push(None);
                }
            }

            if stats.records_in % PROGRESS_INTERVAL == 0 {
                log::info!(
                    "Localized {} records ({} scans accepted, {} frames posed)",
                    stats.records_in,
                    stats.scans_accepted,
                    posed.len()
                );
            }
        }

        interpolator.finish();
        stats.interpolation = interpolator.stats();
        if !cfg.modes.use_2d_guess {
            stats.interpolation.posed = posed.len();
        }
        let (trajectory, log) = estimator.finish()?;

        posed.sort_by_key(|f| f.index);
        Ok((table, posed, trajectory, log, seen_labels))
    }

    fn process_sets(
        &mut self,
        labels: Vec<String>,
        posed: Vec<IndexedFrame>,
        table: &mut [Option<StreamRecord>],
        stats: &mut RunStats,
    ) {
        let cfg = &self.config;
        let engine = DynAligner::new(
            cfg.modes.refine,
            &cfg.registration.icp,
            &cfg.registration.gicp,
        )
        .map(|aligner| PairwiseRegistrationEngine::new(aligner, &cfg.registration));
        if let Some(engine) = &engine {
            log::info!(
                "3D refinement: {} ({} mode)",
                engine.aligner().method().description(),
                if cfg.per_sensor_registration() {
                    "per-sensor"
                } else {
                    "joint"
                }
            );
        }

        let mut stage = SetStage {
            key_filter: cfg.modes.use_key_poses.then(|| KeyPoseFilter::new(&cfg.key_pose)),
            selector: cfg
                .modes
                .use_overlap_filter
                .then(|| OverlapSelector::new(cfg.overlap.clone())),
            engine,
            reference: ReferenceAccumulator::new(
                cfg.modes.memory,
                cfg.registration.reference_stride,
            ),
            previous: None,
            per_sensor: cfg.per_sensor_registration(),
            use_2d_guess: cfg.modes.use_2d_guess,
        };

        let mut aggregator = SensorSetAggregator::new(labels);
        for frame in posed {
            match aggregator.push(frame) {
                Aggregated::Pending => {}
                Aggregated::Displaced(old) => {
                    stats.frames_displaced += 1;
                    write_back(table, old);
                }
                Aggregated::Unknown(frame) => write_back(table, frame),
                Aggregated::Complete(mut set) => {
                    stats.sets_complete += 1;
                    let report = stage.process(&mut set);
                    self.sink.on_set_complete(&report);

                    if report.decision.is_kept() {
                        for item in set.frames {
                            write_back(table, item);
                        }
                    } else {
                        stats.sets_rejected += 1;
                        stats.frames_removed += set.frames.len();
                    }
                }
            }
        }
        for leftover in aggregator.drain() {
            write_back(table, leftover);
        }

        if let Some(engine) = &stage.engine {
            stats.registration = engine.stats();
        }
    }
}

impl SetStage {
    fn process(&mut self, set: &mut SensorSet) -> SetReport {
        let decision = match &self.key_filter {
            Some(filter) => filter.evaluate(set, self.previous.as_deref()),
            None if self.previous.is_none() => KeyPoseDecision::Seed,
            None => KeyPoseDecision::Accepted,
        };

        let mut report = SetReport {
            sequence: set.sequence,
            indices: set.indices(),
            decision,
            outcomes: Vec::new(),
        };
        if !report.decision.is_kept() {
            return report;
        }

        if report.decision == KeyPoseDecision::Accepted {
            if !self.use_2d_guess
                && let Some(previous) = &self.previous
            {
                seed_from_previous(set, previous);
            }
            report.outcomes = self.register(set);
        }

        if self.engine.is_some() {
            self.reference.commit(set, self.selector.as_ref());
        }
        self.previous = Some(set.poses());
        report
    }

    fn register(&mut self, set: &mut SensorSet) -> Vec<(ChainKey, RegistrationOutcome)> {
        let Some(engine) = self.engine.as_mut() else {
            return Vec::new();
        };
        if self.reference.is_empty() {
            return Vec::new();
        }

        let hull_of = |frames: &[IndexedFrame], selector: &OverlapSelector| -> Vec<Option<ConvexHull>> {
            frames
                .iter()
                .filter_map(|f| f.frame.world_cloud())
                .map(|c| selector.hull_of(&c))
                .collect()
        };

        if self.per_sensor {
            let mut outcomes = Vec::with_capacity(set.frames.len());
            for k in 0..set.frames.len() {
                let frames = &mut set.frames[k..k + 1];
                let target = match &self.selector {
                    Some(selector) => {
                        let current = hull_of(&*frames, selector);
                        self.reference
                            .target_cloud(|e| OverlapSelector::selects(e.hull.as_ref(), &current))
                    }
                    None => self.reference.target_cloud(|_| true),
                };
                let chain = ChainKey::Sensor(frames[0].frame.sensor.clone());
                let outcome = engine.register(chain.clone(), frames, &target);
                outcomes.push((chain, outcome));
            }
            outcomes
        } else {
            let target = match &self.selector {
                Some(selector) => {
                    let current = hull_of(&set.frames, selector);
                    self.reference
                        .target_cloud(|e| OverlapSelector::selects(e.hull.as_ref(), &current))
                }
                None => self.reference.target_cloud(|_| true),
            };
            let outcome = engine.register(ChainKey::Joint, &mut set.frames, &target);
            vec![(ChainKey::Joint, outcome)]
        }
    }
}

/// Start each frame from the pose its sensor had in the previous set.
fn seed_from_previous(set: &mut SensorSet, previous: &[(String, Pose3D)]) {
    for item in set.frames.iter_mut() {
        if let Some((_, pose)) = previous.iter().find(|(s, _)| *s == item.frame.sensor) {
            item.frame.pose = Some(*pose);
        }
    }
}

fn write_back(table: &mut [Option<StreamRecord>], item: IndexedFrame) {
    if let Some(slot) = table.get_mut(item.index) {
        *slot = Some(StreamRecord::Range3D(item.frame));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::matching::RefineMethod;
    use crate::config::SensorMount;
    use crate::core::types::{LaserScan, Point3D, RangeCloud, ScanRecord, SensorFrame};
    use crate::engine::reference::MemoryMode;
    use crate::io::rawlog::RawlogError;
    use std::sync::{Arc, Mutex};

    /// Room map plus a scan set that sees it from the origin.
    fn room() -> (PointCloud2D, LaserScan) {
        let mut map = PointCloud2D::new();
        let n = 720;
        let mut ranges = Vec::with_capacity(n);
        let increment = std::f32::consts::TAU / n as f32;
        for i in 0..n {
            let angle = -std::f32::consts::PI + i as f32 * increment;
            let (s, c) = angle.sin_cos();
            // distance to a 4 m × 3 m box centred on the origin
            let tx = if c.abs() > 1e-6 { 2.0 / c.abs() } else { f32::MAX };
            let ty = if s.abs() > 1e-6 { 1.5 / s.abs() } else { f32::MAX };
            let r = tx.min(ty);
            ranges.push(r);
            map.push_xy(r * c, r * s);
        }
        let scan = LaserScan::new(-std::f32::consts::PI, increment, 0.05, 10.0, ranges);
        (map, scan)
    }

    /// Floor patch, a wall and a step, seen from the sensor.
    fn frame(sensor: &str, t: u64) -> SensorFrame {
        frame_at(sensor, t, 0.0)
    }

    /// The same scene moved `dx` meters along x.
    fn frame_at(sensor: &str, t: u64, dx: f32) -> SensorFrame {
        let mut points = Vec::new();
        for i in 0..20 {
            for j in 0..20 {
                let (u, v) = (i as f32 * 0.05, j as f32 * 0.05);
                points.push(Point3D::new(dx + 1.0 + u, v, -0.5));
                points.push(Point3D::new(dx + 2.0, v, -0.5 + u));
                if i < 6 && j < 8 {
                    points.push(Point3D::new(dx + 1.2 + u, 0.3 + v * 0.5, -0.2));
                }
            }
        }
        SensorFrame::new(sensor, t, Pose3D::identity(), RangeCloud::from_points(points))
    }

    fn ok(records: Vec<StreamRecord>) -> impl Iterator<Item = std::result::Result<StreamRecord, RawlogError>> {
        records.into_iter().map(Ok)
    }

    #[derive(Clone, Default)]
    struct Collect(Arc<Mutex<Vec<SetReport>>>);

    impl ProgressSink for Collect {
        fn on_set_complete(&mut self, report: &SetReport) {
            self.0.lock().unwrap().push(report.clone());
        }
    }

    #[test]
    fn test_frames_between_scans_are_posed() {
        let (map, scan) = room();
        let records = vec![
            StreamRecord::Scan2D(ScanRecord::new("LIDAR", 0, scan.clone())),
            StreamRecord::Range3D(frame("CAM", 500_000)),
            StreamRecord::Scan2D(ScanRecord::new("LIDAR", 1_000_000, scan)),
        ];

        let mut pipeline = FusionPipeline::new(&RunConfig::default());
        let out = pipeline.run(ok(records), map, None).unwrap();

        assert_eq!(out.trajectory.len(), 2);
        assert_eq!(out.records.len(), 3);
        let posed = out.records[1].as_range().unwrap();
        let pose = posed.pose.unwrap();
        assert!(pose.translation().norm() < 0.02, "pose {:?}", pose);
        assert_eq!(out.stats.interpolation.posed, 1);
    }

    #[test]
    fn test_unbracketed_frames_are_removed() {
        let (map, scan) = room();
        let records = vec![
            StreamRecord::Range3D(frame("CAM", 0)),
            StreamRecord::Scan2D(ScanRecord::new("LIDAR", 100, scan)),
            StreamRecord::Range3D(frame("CAM", 200)),
        ];
        let mut pipeline = FusionPipeline::new(&RunConfig::default());
        let out = pipeline.run(ok(records), map, None).unwrap();
        assert_eq!(out.records.len(), 1);
        assert!(out.records[0].is_scan());
        assert_eq!(out.stats.interpolation.dropped_at_end, 2);
    }

    #[test]
    fn test_static_sets_are_removed_by_key_pose_filter() {
        let mut config = RunConfig::default();
        config.modes.use_2d_guess = false;
        config.modes.use_key_poses = true;
        config.sensors = vec![
            SensorMount {
                label: "A".to_string(),
                ..Default::default()
            },
            SensorMount {
                label: "B".to_string(),
                x: 0.1,
                ..Default::default()
            },
        ];

        let records = vec![
            StreamRecord::Range3D(frame("A", 0)),
            StreamRecord::Range3D(frame("B", 1)),
            StreamRecord::Range3D(frame("A", 2)),
            StreamRecord::Range3D(frame("B", 3)),
        ];
        let sink = Collect::default();
        let mut pipeline =
            FusionPipeline::new(&config).with_progress_sink(Box::new(sink.clone()));
        let out = pipeline.run(ok(records), PointCloud2D::new(), None).unwrap();

        let reports = sink.0.lock().unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].decision, KeyPoseDecision::Seed);
        assert!(!reports[1].decision.is_kept());
        assert_eq!(out.records.len(), 2);
        assert_eq!(out.stats.sets_rejected, 1);

        // configured mounting replaced the stream's
        let b = out.records[1].as_range().unwrap();
        assert_eq!(b.pose.unwrap().x(), 0.1);
    }

    #[test]
    fn test_identical_sets_register_to_identity() {
        let mut config = RunConfig::default();
        config.modes.use_2d_guess = false;
        config.modes.refine = RefineMethod::Icp;

        let records = vec![
            StreamRecord::Range3D(frame("A", 0)),
            StreamRecord::Range3D(frame("A", 1)),
        ];
        let sink = Collect::default();
        let mut pipeline =
            FusionPipeline::new(&config).with_progress_sink(Box::new(sink.clone()));
        let out = pipeline.run(ok(records), PointCloud2D::new(), None).unwrap();

        let reports = sink.0.lock().unwrap();
        assert_eq!(reports.len(), 2);
        let (chain, outcome) = &reports[1].outcomes[0];
        assert_eq!(*chain, ChainKey::Joint);
        assert!(outcome.is_accepted());
        assert!(outcome.quality().unwrap() > 99.9);
        let pose = out.records[1].as_range().unwrap().pose.unwrap();
        assert!(pose.translation().norm() < 1e-3);
        assert_eq!(out.stats.registration.accepted, 1);
    }

    #[test]
    fn test_overlap_filter_selects_only_overlapping_references() {
        let mut config = RunConfig::default();
        config.modes.use_2d_guess = false;
        config.modes.refine = RefineMethod::Icp;
        config.modes.memory = MemoryMode::Accumulate;
        config.modes.use_overlap_filter = true;
        config.registration.reference_stride = 1;

        let records = vec![
            StreamRecord::Range3D(frame("A", 0)),
            StreamRecord::Range3D(frame_at("A", 1, 50.0)),
            StreamRecord::Range3D(frame("A", 2)),
        ];
        let sink = Collect::default();
        let mut pipeline =
            FusionPipeline::new(&config).with_progress_sink(Box::new(sink.clone()));
        let out = pipeline.run(ok(records), PointCloud2D::new(), None).unwrap();

        let reports = sink.0.lock().unwrap();
        assert_eq!(reports.len(), 3);
        assert_eq!(reports[0].decision, KeyPoseDecision::Seed);

        // the distant set shares no volume with the seed: empty target
        let (chain, outcome) = &reports[1].outcomes[0];
        assert_eq!(*chain, ChainKey::Sensor("A".to_string()));
        assert!(matches!(outcome, RegistrationOutcome::Skipped { .. }));

        // the seed is selected, the distant set is left out
        let (_, outcome) = &reports[2].outcomes[0];
        assert!(outcome.is_accepted(), "{:?}", outcome);
        assert!(outcome.quality().unwrap() > 99.9);
        let pose = out.records[2].as_range().unwrap().pose.unwrap();
        assert!(pose.translation().norm() < 1e-3, "pose {:?}", pose);
        assert_eq!(out.stats.registration.accepted, 1);
        assert_eq!(out.stats.registration.skipped, 1);
    }
}
