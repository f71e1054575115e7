//! End-to-end fusion tests.
//!
//! These tests drive the public API the way the `rig-localize` binary
//! does: streams go through rawlog files, scans through real ICP, and 3D
//! sets through real registration backends.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempfile::TempDir;

use rig_fusion::algorithms::matching::{
    DynAligner, GicpConfig, Icp3DConfig, PointToPointIcp3D, RefineMethod,
};
use rig_fusion::config::SensorMount;
use rig_fusion::engine::{
    Aggregated, ChainKey, KeyPoseConfig, KeyPoseDecision, KeyPoseFilter, MemoryMode,
    PairwiseRegistrationEngine, RegistrationConfig, RegistrationOutcome, SensorSetAggregator,
};
use rig_fusion::io::rawlog::{FLAG_LOCALIZED, RawlogError};
use rig_fusion::{
    FusionError, FusionPipeline, IndexedFrame, LaserScan, Point3D, PointCloud2D, PointCloud3D,
    Pose3D, ProgressSink, RangeCloud, RawlogReader, RawlogWriter, RunConfig, ScanRecord,
    SensorFrame, SetReport, StreamRecord, TrajectoryLog,
};

use std::sync::{Arc, Mutex};

// ============================================================================
// Scene helpers
// ============================================================================

const ROOM_HALF_X: f32 = 4.0;
const ROOM_HALF_Y: f32 = 3.0;

/// Walls of an 8 m × 6 m room centred on the origin, sampled every 1 cm.
fn room_map() -> PointCloud2D {
    let mut map = PointCloud2D::new();
    let step = 0.01;
    let nx = (2.0 * ROOM_HALF_X / step) as usize;
    let ny = (2.0 * ROOM_HALF_Y / step) as usize;
    for i in 0..=nx {
        let x = -ROOM_HALF_X + i as f32 * step;
        map.push_xy(x, -ROOM_HALF_Y);
        map.push_xy(x, ROOM_HALF_Y);
    }
    for j in 1..ny {
        let y = -ROOM_HALF_Y + j as f32 * step;
        map.push_xy(-ROOM_HALF_X, y);
        map.push_xy(ROOM_HALF_X, y);
    }
    map
}

/// Full-turn scan of the room taken from `(px, py)` facing +x.
fn room_scan(px: f32, py: f32, rng: &mut StdRng) -> LaserScan {
    let n = 720;
    let increment = std::f32::consts::TAU / n as f32;
    let angle_min = -std::f32::consts::PI;
    let ranges = (0..n)
        .map(|i| {
            let (s, c) = (angle_min + i as f32 * increment).sin_cos();
            let tx = if c > 1e-6 {
                (ROOM_HALF_X - px) / c
            } else if c < -1e-6 {
                (-ROOM_HALF_X - px) / c
            } else {
                f32::MAX
            };
            let ty = if s > 1e-6 {
                (ROOM_HALF_Y - py) / s
            } else if s < -1e-6 {
                (-ROOM_HALF_Y - py) / s
            } else {
                f32::MAX
            };
            tx.min(ty) + rng.gen_range(-0.003..0.003)
        })
        .collect();
    LaserScan::new(angle_min, increment, 0.05, 12.0, ranges)
}

/// Floor, two walls and a box: every degree of freedom is observable.
fn corner_scene(spacing: f32) -> Vec<Point3D> {
    let mut points = Vec::new();
    let steps = |len: f32| (len / spacing) as usize;
    for i in 0..steps(3.0) {
        for j in 0..steps(2.0) {
            points.push(Point3D::new(i as f32 * spacing, j as f32 * spacing, 0.0));
        }
    }
    for j in 0..steps(2.0) {
        for k in 1..steps(1.5) {
            points.push(Point3D::new(0.0, j as f32 * spacing, k as f32 * spacing));
        }
    }
    for i in 1..steps(3.0) {
        for k in 1..steps(1.5) {
            points.push(Point3D::new(i as f32 * spacing, 0.0, k as f32 * spacing));
        }
    }
    for i in 0..steps(0.6) {
        for j in 0..steps(0.4) {
            points.push(Point3D::new(1.5 + i as f32 * spacing, 0.8 + j as f32 * spacing, 0.5));
        }
    }
    for j in 0..steps(0.4) {
        for k in 1..steps(0.5) {
            points.push(Point3D::new(1.5, 0.8 + j as f32 * spacing, k as f32 * spacing));
        }
    }
    points
}

fn posed_frame(index: usize, sensor: &str, pose: Pose3D) -> IndexedFrame {
    let mut frame = SensorFrame::new(
        sensor,
        index as u64,
        Pose3D::identity(),
        RangeCloud::from_points(corner_scene(0.05)),
    );
    frame.pose = Some(pose);
    IndexedFrame::new(index, frame)
}

fn scene_cloud(pose: &Pose3D) -> PointCloud3D {
    PointCloud3D::from_points(corner_scene(0.05)).transform(pose)
}

#[derive(Clone, Default)]
struct Collect(Arc<Mutex<Vec<SetReport>>>);

impl ProgressSink for Collect {
    fn on_set_complete(&mut self, report: &SetReport) {
        self.0.lock().unwrap().push(report.clone());
    }
}

// ============================================================================
// End to end
// ============================================================================

#[test]
fn test_frame_between_scans_lands_halfway() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("run.rawlog");
    let mut rng = StdRng::seed_from_u64(7);

    let mut writer = RawlogWriter::create(&input).unwrap();
    for record in [
        StreamRecord::Scan2D(ScanRecord::new("LIDAR", 0, room_scan(0.0, 0.0, &mut rng))),
        StreamRecord::Range3D(SensorFrame::new(
            "CAM",
            500_000,
            Pose3D::identity(),
            RangeCloud::from_points(corner_scene(0.1)),
        )),
        StreamRecord::Scan2D(ScanRecord::new(
            "LIDAR",
            1_000_000,
            room_scan(1.0, 0.0, &mut rng),
        )),
    ] {
        writer.write_record(&record).unwrap();
    }
    writer.finish().unwrap();

    let mut config = RunConfig::default();
    config.trajectory.icp.max_correspondence_distance = 1.5;
    config.output.trajectory_log = dir.path().join("trajectory.txt");

    let reader = RawlogReader::open(&input).unwrap();
    let log = TrajectoryLog::create(&config.output.trajectory_log).unwrap();
    let output = FusionPipeline::new(&config)
        .run(reader, room_map(), Some(log))
        .unwrap();

    assert_eq!(output.trajectory.len(), 2);
    assert!(output.trajectory[1].goodness > 80.0);
    assert!((output.trajectory[1].pose().x - 1.0).abs() < 0.02);

    let out_path = config.output_path_for(&input);
    assert_eq!(out_path, dir.path().join("run_located.rawlog"));
    let mut writer = RawlogWriter::create(&out_path).unwrap();
    writer.set_flags(FLAG_LOCALIZED);
    for record in &output.records {
        writer.write_record(record).unwrap();
    }
    writer.finish().unwrap();
    assert!(!config.output.trajectory_log.exists());
    output.trajectory_log.unwrap().finish().unwrap();

    let reader = RawlogReader::open(&out_path).unwrap();
    assert!(reader.header().is_localized());
    let records: Vec<StreamRecord> = reader.collect::<Result<_, _>>().unwrap();
    assert_eq!(records.len(), 3);

    let pose = records[1].as_range().unwrap().pose.unwrap();
    assert!((pose.x() - 0.5).abs() < 0.02, "x = {}", pose.x());
    assert!(pose.y().abs() < 0.02, "y = {}", pose.y());
    assert!(pose.yaw().abs() < 0.01, "yaw = {}", pose.yaw());

    let rows = std::fs::read_to_string(&config.output.trajectory_log).unwrap();
    assert_eq!(rows.lines().count(), 2);
}

#[test]
fn test_stream_error_leaves_no_output() {
    let dir = TempDir::new().unwrap();
    let out_path = dir.path().join("out.rawlog");

    let run = || -> Result<(), FusionError> {
        let mut writer = RawlogWriter::create(&out_path)?;
        let records = vec![
            Ok(StreamRecord::Range3D(SensorFrame::new(
                "CAM",
                0,
                Pose3D::identity(),
                RangeCloud::default(),
            ))),
            Err(RawlogError::InvalidFormat("truncated record".to_string())),
        ];
        let output = FusionPipeline::new(&RunConfig::default()).run(
            records,
            room_map(),
            None,
        )?;
        for record in &output.records {
            writer.write_record(record)?;
        }
        writer.finish()?;
        Ok(())
    };

    assert!(matches!(run(), Err(FusionError::Rawlog(_))));
    assert!(!out_path.exists());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_accumulated_reference_registers_each_sensor() {
    let mut config = RunConfig::default();
    config.modes.use_2d_guess = false;
    config.modes.refine = RefineMethod::Icp;
    config.modes.memory = MemoryMode::Accumulate;
    config.sensors = ["A", "B"]
        .iter()
        .map(|label| SensorMount {
            label: label.to_string(),
            ..Default::default()
        })
        .collect();

    let records: Vec<Result<StreamRecord, RawlogError>> = (0..6)
        .map(|i| {
            let sensor = if i % 2 == 0 { "A" } else { "B" };
            Ok(StreamRecord::Range3D(SensorFrame::new(
                sensor,
                i,
                Pose3D::identity(),
                RangeCloud::from_points(corner_scene(0.1)),
            )))
        })
        .collect();

    let sink = Collect::default();
    let output = FusionPipeline::new(&config)
        .with_progress_sink(Box::new(sink.clone()))
        .run(records, PointCloud2D::new(), None)
        .unwrap();

    let reports = sink.0.lock().unwrap();
    assert_eq!(reports.len(), 3);
    assert_eq!(reports[0].decision, KeyPoseDecision::Seed);
    for report in &reports[1..] {
        let chains: Vec<&ChainKey> = report.outcomes.iter().map(|(c, _)| c).collect();
        assert_eq!(
            chains,
            vec![
                &ChainKey::Sensor("A".to_string()),
                &ChainKey::Sensor("B".to_string())
            ]
        );
        assert!(report.outcomes.iter().all(|(_, o)| o.is_accepted()));
    }
    assert_eq!(output.records.len(), 6);
    assert_eq!(output.stats.registration.accepted, 4);
}

// ============================================================================
// Key poses
// ============================================================================

#[test]
fn test_key_pose_requires_every_sensor_to_move() {
    let labels = vec!["A".to_string(), "B".to_string()];
    let mut aggregator = SensorSetAggregator::new(labels);
    let filter = KeyPoseFilter::new(&KeyPoseConfig::default());
    let at = |x: f32, yaw_deg: f32| Pose3D::from_xyz_ypr(x, 0.0, 0.0, yaw_deg.to_radians(), 0.0, 0.0);

    let mut sets = Vec::new();
    for (index, (sensor, pose)) in [
        ("A", at(0.0, 0.0)),
        ("B", at(0.0, 0.0)),
        // A moved 0.5 m, B only turned 10°
        ("A", at(0.5, 0.0)),
        ("B", at(0.0, 10.0)),
        // both turned past 20°
        ("A", at(0.5, 25.0)),
        ("B", at(0.0, 35.0)),
    ]
    .into_iter()
    .enumerate()
    {
        if let Aggregated::Complete(set) = aggregator.push(posed_frame(index, sensor, pose)) {
            sets.push(set);
        }
    }
    assert_eq!(sets.len(), 3);

    let seed = sets[0].poses();
    assert_eq!(filter.evaluate(&sets[0], None), KeyPoseDecision::Seed);
    assert_eq!(
        filter.evaluate(&sets[1], Some(&seed)),
        KeyPoseDecision::Rejected {
            sensor: "B".to_string()
        }
    );
    // compared with the last accepted set, not the rejected one
    assert_eq!(
        filter.evaluate(&sets[2], Some(&seed)),
        KeyPoseDecision::Accepted
    );
}

// ============================================================================
// Registration
// ============================================================================

#[test]
fn test_realigning_a_set_with_itself_is_identity() {
    let icp = Icp3DConfig::default();
    let gicp = GicpConfig::default();
    for method in [RefineMethod::Icp, RefineMethod::Gicp] {
        let aligner = DynAligner::new(method, &icp, &gicp).unwrap();
        let mut engine = PairwiseRegistrationEngine::new(aligner, &RegistrationConfig::default());

        let mut frames = vec![posed_frame(0, "A", Pose3D::identity())];
        let target = scene_cloud(&Pose3D::identity());
        let outcome = engine.register(ChainKey::Joint, &mut frames, &target);

        let RegistrationOutcome::Accepted(result) = outcome else {
            panic!("{} did not accept an identical cloud: {:?}", method, outcome);
        };
        assert!(result.quality > 99.9, "{} quality {}", method, result.quality);
        let pose = frames[0].frame.pose.unwrap();
        assert!(pose.translation().norm() < 1e-3);
        assert!(pose.rotation_angle() < 1e-2);
    }
}

#[test]
fn test_quality_gate_falls_back_per_chain() {
    let mut engine = PairwiseRegistrationEngine::new(
        PointToPointIcp3D::new(Icp3DConfig::default()),
        &RegistrationConfig::default(),
    );
    let chain = ChainKey::Sensor("A".to_string());
    let offset = Pose3D::from_xyz_ypr(0.02, 0.015, 0.01, 0.0, 0.0, 0.0);

    // good alignment records a correction
    let mut frames = vec![posed_frame(0, "A", Pose3D::identity())];
    let outcome = engine.register(chain.clone(), &mut frames, &scene_cloud(&offset));
    assert!(outcome.is_accepted(), "{:?}", outcome);
    let learned = *engine.last_applied(&chain).unwrap();
    assert!((learned.x() - 0.02).abs() < 2e-3);
    assert!((learned.z() - 0.01).abs() < 2e-3);

    // a hopeless target falls back to that correction
    let far = Pose3D::from_xyz_ypr(25.0, 0.0, 0.0, 0.0, 0.0, 0.0);
    let mut frames = vec![posed_frame(1, "A", Pose3D::identity())];
    match engine.register(chain.clone(), &mut frames, &scene_cloud(&far)) {
        RegistrationOutcome::Fallback {
            applied, had_prior, ..
        } => {
            assert!(had_prior);
            assert_eq!(applied, learned);
        }
        other => panic!("expected fallback, got {:?}", other),
    }
    assert_eq!(frames[0].frame.pose, Some(learned));

    // a chain without history falls back to identity
    let other = ChainKey::Sensor("B".to_string());
    let mut frames = vec![posed_frame(2, "B", Pose3D::identity())];
    let outcome = engine.register(other, &mut frames, &scene_cloud(&far));
    assert_eq!(outcome.applied(), Some(Pose3D::identity()));
    assert_eq!(frames[0].frame.pose, Some(Pose3D::identity()));
}
