//! RigFusion - Offline pose fusion for multi-camera rigs
//!
//! # Architecture
//!
//! The crate is organized into 6 logical layers:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                 main.rs, bin/                       │  ← Executables
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                 io/, config/                        │  ← Infrastructure
//! │     (rawlog, reference map, trajectory log)         │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                    engine/                          │  ← Orchestration
//! │  (trajectory, interpolation, sets, registration)    │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                  algorithms/                        │  ← Core algorithms
//! │          (matching, convex hull geometry)           │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                   sensors/                          │  ← Sensor processing
//! │              (bilateral smoothing)                  │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                     core/                           │  ← Foundation
//! │                (types, math)                        │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! # Pipeline
//!
//! ## Stage 1: 2D Trajectory
//! - Planar scans aligned to a static reference map with ICP
//! - Scans above 80% goodness become robot poses
//! - Accepted poses written to a trajectory log
//!
//! ## Stage 2: Frame Posing
//! - 3D frames buffered until two accepted poses bracket them
//! - Linear position, shortest-arc heading
//! - World pose = robot pose ∘ sensor mounting
//!
//! ## Stage 3: Sensor Sets
//! - One frame per configured sensor forms a set
//! - Key-pose filter drops sets where any sensor stood still
//!
//! ## Stage 4: 3D Refinement
//! - Point-to-point ICP or generalized ICP against a reference
//! - Quality gate at 96% with fallback to the last correction
//! - Reference replaced per set or accumulated over the run
//! - Optional convex-hull overlap selection of reference frames

// ============================================================================
// Layer 1: Core foundation (no internal deps)
// ============================================================================
pub mod core;

// ============================================================================
// Layer 2: Sensor processing (depends on core)
// ============================================================================
pub mod sensors;

// ============================================================================
// Layer 3: Algorithms (depends on core)
// ============================================================================
pub mod algorithms;

// ============================================================================
// Layer 4: Fusion engine (depends on core, sensors, algorithms)
// ============================================================================
pub mod engine;

// ============================================================================
// Layer 5: Infrastructure (depends on all layers)
// ============================================================================
pub mod config;
pub mod error;
pub mod io;

// ============================================================================
// Convenience re-exports (flat namespace for common use)
// ============================================================================

// Core types
pub use crate::core::math;
pub use crate::core::types::{IndexedFrame, RangeCloud, ScanRecord, SensorFrame};
pub use crate::core::types::{LaserScan, PointCloud2D, PointCloud3D};
pub use crate::core::types::{Point2D, Point3D, Pose2D, Pose3D, Timestamped};

// Sensors - Preprocessing
pub use sensors::preprocessing::{BilateralConfig, BilateralFilter};

// Algorithms - Matching
pub use algorithms::matching::{
    Aligner, DynAligner, GeneralizedIcp, GicpConfig, Icp3DConfig, IcpConfig, PointToPointIcp,
    PointToPointIcp3D, RefineMethod, RegistrationResult, ScanMatchResult, ScanMatcher,
};

// Algorithms - Geometry
pub use algorithms::geometry::ConvexHull;

// Engine
pub use engine::{
    ChainKey, FusionPipeline, KeyPoseDecision, KeyPoseFilter, MemoryMode,
    PairwiseRegistrationEngine, PipelineOutput, ProgressSink, ReferenceAccumulator,
    RegistrationOutcome, RobotPose, RunStats, SensorSet, SensorSetAggregator, SetReport,
    TemporalPoseInterpolator, TrajectoryEstimator, TrajectoryStep,
};

// Configuration and errors
pub use config::{ConfigError, RunConfig};
pub use error::{FusionError, Result};

// I/O
pub use io::rawlog::{RawlogHeader, RawlogInfo, RawlogReader, RawlogWriter, StreamRecord};
pub use io::{TrajectoryLog, load_reference_map};
