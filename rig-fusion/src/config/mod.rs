//! Run configuration.
//!
//! Loaded once from TOML and passed by reference to every stage. Every
//! field has a default, so an empty file (or no file) is a valid
//! configuration.
//!
//! ```toml
//! [modes]
//! use_2d_guess = true
//! refine = "gicp"          # off | icp | gicp
//! memory = "accumulate"    # replace | accumulate
//! use_key_poses = true
//!
//! [scanner]
//! x = 0.2
//! yaw = 0.0
//!
//! [[sensors]]
//! label = "RGBD_1"
//! x = 0.27
//! z = 1.01
//! yaw = 45.0
//! pitch = 0.0
//! roll = -90.0
//!
//! [registration]
//! quality_threshold = 96.0
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::algorithms::matching::RefineMethod;
use crate::core::types::{Pose2D, Pose3D};
use crate::engine::aggregation::KeyPoseConfig;
use crate::engine::interpolation::InterpolationConfig;
use crate::engine::overlap::OverlapConfig;
use crate::engine::reference::MemoryMode;
use crate::engine::registration::RegistrationConfig;
use crate::engine::trajectory::TrajectoryConfig;
use crate::sensors::preprocessing::BilateralConfig;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot parse config {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Complete configuration of one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub modes: ModeConfig,
    /// Planar scanner mounting (x, y, yaw are used)
    pub scanner: MountPose,
    /// 3D sensors, in set slot order. Empty means "discover from stream".
    pub sensors: Vec<SensorMount>,
    pub trajectory: TrajectoryConfig,
    pub interpolation: InterpolationConfig,
    pub key_pose: KeyPoseConfig,
    pub registration: RegistrationConfig,
    pub smoothing: BilateralConfig,
    pub overlap: OverlapConfig,
    pub output: OutputConfig,
}

/// Stage toggles.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModeConfig {
    /// Pose 3D frames from the 2D trajectory
    pub use_2d_guess: bool,
    pub refine: RefineMethod,
    pub memory: MemoryMode,
    pub use_key_poses: bool,
    pub use_overlap_filter: bool,
    pub smooth_clouds: bool,
    /// Register each sensor on its own chain. Unset follows the memory
    /// mode (per sensor when accumulating).
    pub per_sensor: Option<bool>,
}

impl Default for ModeConfig {
    fn default() -> Self {
        Self {
            use_2d_guess: true,
            refine: RefineMethod::Off,
            memory: MemoryMode::Replace,
            use_key_poses: false,
            use_overlap_filter: false,
            smooth_clouds: false,
            per_sensor: None,
        }
    }
}

/// Rigid mounting on the robot. Angles in degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MountPose {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub yaw: f32,
    pub pitch: f32,
    pub roll: f32,
}

impl MountPose {
    pub fn to_pose3d(&self) -> Pose3D {
        Pose3D::from_xyz_ypr(
            self.x,
            self.y,
            self.z,
            self.yaw.to_radians(),
            self.pitch.to_radians(),
            self.roll.to_radians(),
        )
    }

    /// Planar part of the mounting.
    pub fn to_pose2d(&self) -> Pose2D {
        Pose2D::new(self.x, self.y, self.yaw.to_radians())
    }
}

/// A labelled 3D sensor and its mounting.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorMount {
    pub label: String,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub yaw: f32,
    pub pitch: f32,
    pub roll: f32,
}

impl SensorMount {
    pub fn mount(&self) -> MountPose {
        MountPose {
            x: self.x,
            y: self.y,
            z: self.z,
            yaw: self.yaw,
            pitch: self.pitch,
            roll: self.roll,
        }
    }
}

/// Output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Explicit output stream path; derived from the input name when unset
    pub path: Option<PathBuf>,
    pub write_trajectory: bool,
    pub trajectory_log: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: None,
            write_trajectory: true,
            trajectory_log: PathBuf::from("trajectory.txt"),
        }
    }
}

impl RunConfig {
    /// Read and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: RunConfig =
            basic_toml::from_str(&contents).map_err(|e| ConfigError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        config.validate()?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parse TOML text without touching the filesystem.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: RunConfig = basic_toml::from_str(contents).map_err(|e| ConfigError::Parse {
            path: PathBuf::from("<string>"),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges and sensor labels.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let percent = |name: &str, v: f32| {
            if (0.0..=100.0).contains(&v) {
                Ok(())
            } else {
                Err(ConfigError::Invalid(format!(
                    "{} must be within [0, 100], got {}",
                    name, v
                )))
            }
        };
        percent("trajectory.accept_goodness", self.trajectory.accept_goodness)?;
        percent(
            "registration.quality_threshold",
            self.registration.quality_threshold,
        )?;

        if self.key_pose.min_distance < 0.0 || self.key_pose.min_rotation_deg < 0.0 {
            return Err(ConfigError::Invalid(
                "key_pose thresholds must be non-negative".to_string(),
            ));
        }
        if self.registration.reference_stride == 0 {
            return Err(ConfigError::Invalid(
                "registration.reference_stride must be at least 1".to_string(),
            ));
        }
        // also rejects NaN
        let positive = |v: f32| v > 0.0;
        if !positive(self.smoothing.sigma_s) || !positive(self.smoothing.sigma_r) {
            return Err(ConfigError::Invalid(format!(
                "smoothing sigmas must be positive, got sigma_s = {}, sigma_r = {}",
                self.smoothing.sigma_s, self.smoothing.sigma_r
            )));
        }
        if self.overlap.max_hull_points < 4 {
            return Err(ConfigError::Invalid(
                "overlap.max_hull_points must be at least 4".to_string(),
            ));
        }

        for (i, sensor) in self.sensors.iter().enumerate() {
            if sensor.label.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("sensors[{}] has no label", i)));
            }
            if self.sensors[..i].iter().any(|s| s.label == sensor.label) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate sensor label {:?}",
                    sensor.label
                )));
            }
        }

        if self.modes.use_key_poses && !self.modes.use_2d_guess {
            log::warn!("Key-pose filter without 2D guess: every set after the first will look static");
        }
        Ok(())
    }

    /// Configured labels in slot order.
    pub fn sensor_labels(&self) -> Vec<String> {
        self.sensors.iter().map(|s| s.label.clone()).collect()
    }

    /// Configured mounting of `label`, if any.
    pub fn sensor_extrinsic(&self, label: &str) -> Option<Pose3D> {
        self.sensors
            .iter()
            .find(|s| s.label == label)
            .map(|s| s.mount().to_pose3d())
    }

    pub fn per_sensor_registration(&self) -> bool {
        self.modes
            .per_sensor
            .unwrap_or(self.modes.memory == MemoryMode::Accumulate)
    }

    /// `<stem>_located[-ICP|-GICP][-memory][-smoothed].rawlog` next to
    /// `input`, unless an explicit path is configured.
    pub fn output_path_for(&self, input: &Path) -> PathBuf {
        if let Some(path) = &self.output.path {
            return path.clone();
        }

        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "stream".to_string());
        let mut name = format!("{}_located", stem);
        if let Some(tag) = self.modes.refine.file_tag() {
            name.push('-');
            name.push_str(tag);
        }
        if self.modes.memory == MemoryMode::Accumulate {
            name.push_str("-memory");
        }
        if self.modes.smooth_clouds {
            name.push_str("-smoothed");
        }
        name.push_str(".rawlog");

        input.with_file_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_empty_config_is_default() {
        let config = RunConfig::from_toml_str("").unwrap();
        assert!(config.modes.use_2d_guess);
        assert_eq!(config.modes.refine, RefineMethod::Off);
        assert_eq!(config.trajectory.accept_goodness, 80.0);
        assert_eq!(config.registration.quality_threshold, 96.0);
        assert_eq!(config.key_pose.min_distance, 0.3);
        assert!(config.sensors.is_empty());
    }

    #[test]
    fn test_parse_sections() {
        let toml = r#"
            [modes]
            refine = "gicp"
            memory = "accumulate"
            use_key_poses = true

            [scanner]
            x = 0.2
            yaw = 90.0

            [[sensors]]
            label = "RGBD_1"
            z = 1.0
            yaw = 45.0

            [[sensors]]
            label = "RGBD_2"

            [registration]
            quality_threshold = 90.0
        "#;
        let config = RunConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.modes.refine, RefineMethod::Gicp);
        assert_eq!(config.modes.memory, MemoryMode::Accumulate);
        assert!(config.per_sensor_registration());
        assert_eq!(config.sensor_labels(), vec!["RGBD_1", "RGBD_2"]);
        assert_eq!(config.registration.quality_threshold, 90.0);

        let scanner = config.scanner.to_pose2d();
        assert_relative_eq!(scanner.theta, std::f32::consts::FRAC_PI_2, epsilon = 1e-6);

        let mount = config.sensor_extrinsic("RGBD_1").unwrap();
        assert_relative_eq!(mount.z(), 1.0);
        assert_relative_eq!(mount.yaw(), 45f32.to_radians(), epsilon = 1e-5);
        assert!(config.sensor_extrinsic("RGBD_9").is_none());
    }

    #[test]
    fn test_validation_failures() {
        assert!(matches!(
            RunConfig::from_toml_str("[registration]\nquality_threshold = 120.0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            RunConfig::from_toml_str("[[sensors]]\nlabel = \"A\"\n[[sensors]]\nlabel = \"A\""),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            RunConfig::from_toml_str("[modes]\nrefine = \"ndt\""),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_smoothing_sigmas_must_be_positive() {
        for section in [
            "[smoothing]\nsigma_s = 0.0",
            "[smoothing]\nsigma_r = 0.0",
            "[smoothing]\nsigma_r = -0.01",
        ] {
            assert!(
                matches!(RunConfig::from_toml_str(section), Err(ConfigError::Invalid(_))),
                "accepted {:?}",
                section
            );
        }
        assert!(RunConfig::from_toml_str("[smoothing]\nsigma_s = 2.5").is_ok());
    }

    #[test]
    fn test_output_naming() {
        let mut config = RunConfig::default();
        let input = Path::new("/data/run.rawlog");
        assert_eq!(
            config.output_path_for(input),
            PathBuf::from("/data/run_located.rawlog")
        );

        config.modes.refine = RefineMethod::Gicp;
        config.modes.memory = MemoryMode::Accumulate;
        config.modes.smooth_clouds = true;
        assert_eq!(
            config.output_path_for(input),
            PathBuf::from("/data/run_located-GICP-memory-smoothed.rawlog")
        );

        config.output.path = Some(PathBuf::from("out.rawlog"));
        assert_eq!(config.output_path_for(input), PathBuf::from("out.rawlog"));
    }
}
