//! Fusion orchestration layer.
//!
//! This layer turns a recorded stream into posed, refined 3D frames.
//!
//! # Contents
//!
//! - [`trajectory`]: Scan-to-map 2D trajectory estimation
//! - [`interpolation`]: Temporal pose interpolation for 3D frames
//! - [`aggregation`]: Sensor set aggregation and key-pose filtering
//! - [`overlap`]: Convex-hull overlap selection of reference frames
//! - [`registration`]: Gated pairwise 3D registration
//! - [`reference`]: Registration reference (replace or accumulate)
//! - [`pipeline`]: End-to-end run

pub mod aggregation;
pub mod interpolation;
pub mod overlap;
pub mod pipeline;
pub mod reference;
pub mod registration;
pub mod trajectory;

pub use aggregation::{
    Aggregated, KeyPoseConfig, KeyPoseDecision, KeyPoseFilter, SensorSet, SensorSetAggregator,
};
pub use interpolation::{
    InterpolationConfig, InterpolationStats, IntervalPolicy, RejectedScanPolicy,
    TemporalPoseInterpolator,
};
pub use overlap::{OverlapConfig, OverlapSelector};
pub use pipeline::{FusionPipeline, LogProgress, PipelineOutput, ProgressSink, RunStats, SetReport};
pub use reference::{MemoryMode, ReferenceAccumulator, ReferenceEntry};
pub use registration::{
    ChainKey, PairwiseRegistrationEngine, RegistrationConfig, RegistrationOutcome,
};
pub use trajectory::{RobotPose, TrajectoryConfig, TrajectoryEstimator, TrajectoryStep};
