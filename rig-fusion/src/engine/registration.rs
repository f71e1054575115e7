//! Pairwise 3D registration with a quality gate.
//!
//! The current frames (world frame, current pose estimate) are aligned to
//! the reference cloud starting from identity. A result below the quality
//! threshold is not trusted: the chain falls back to its last applied
//! correction, or identity when it has none. Whatever transform is chosen
//! is applied to the frames as `pose ← T ∘ pose` and becomes the chain's
//! last correction.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::algorithms::matching::{
    Aligner, DynAligner, GicpConfig, Icp3DConfig, RegistrationResult,
};
use crate::core::types::{IndexedFrame, PointCloud3D, Pose3D};

/// Configuration for pairwise registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationConfig {
    /// Results below this quality (0-100) fall back.
    pub quality_threshold: f32,

    /// Sources with fewer valid points are not registered.
    pub min_source_points: usize,

    /// Keep every n-th reference point in accumulate mode.
    pub reference_stride: usize,

    pub icp: Icp3DConfig,

    pub gicp: GicpConfig,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            quality_threshold: 96.0,
            min_source_points: 100,
            reference_stride: 2,
            icp: Icp3DConfig::default(),
            gicp: GicpConfig::default(),
        }
    }
}

/// Identity of a fallback chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChainKey {
    /// All sensors of a set registered together
    Joint,
    /// One sensor registered on its own
    Sensor(String),
}

impl std::fmt::Display for ChainKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChainKey::Joint => write!(f, "joint"),
            ChainKey::Sensor(label) => write!(f, "{}", label),
        }
    }
}

/// What happened to one registration request.
#[derive(Debug, Clone)]
pub enum RegistrationOutcome {
    /// Result passed the gate and was applied
    Accepted(RegistrationResult),
    /// Result failed the gate; `applied` was used instead
    Fallback {
        result: RegistrationResult,
        applied: Pose3D,
        /// Whether `applied` came from an earlier correction
        had_prior: bool,
    },
    /// Nothing to align; poses untouched
    Skipped { source_points: usize },
}

impl RegistrationOutcome {
    /// Transform applied to the frames, if any.
    pub fn applied(&self) -> Option<Pose3D> {
        match self {
            RegistrationOutcome::Accepted(r) => Some(r.transform),
            RegistrationOutcome::Fallback { applied, .. } => Some(*applied),
            RegistrationOutcome::Skipped { .. } => None,
        }
    }

    /// Quality reported by the aligner, if it ran.
    pub fn quality(&self) -> Option<f32> {
        match self {
            RegistrationOutcome::Accepted(r) | RegistrationOutcome::Fallback { result: r, .. } => {
                Some(r.quality)
            }
            RegistrationOutcome::Skipped { .. } => None,
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, RegistrationOutcome::Accepted(_))
    }
}

/// Registration counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegistrationStats {
    pub accepted: usize,
    pub fallbacks: usize,
    pub skipped: usize,
    quality_sum: f64,
}

impl RegistrationStats {
    pub fn attempted(&self) -> usize {
        self.accepted + self.fallbacks
    }

    /// Mean quality over every alignment that ran.
    pub fn mean_quality(&self) -> Option<f32> {
        let n = self.attempted();
        (n > 0).then(|| (self.quality_sum / n as f64) as f32)
    }
}

/// Gated registration engine with per-chain fallback memory.
pub struct PairwiseRegistrationEngine<A: Aligner = DynAligner> {
    aligner: A,
    quality_threshold: f32,
    min_source_points: usize,
    last_applied: HashMap<ChainKey, Pose3D>,
    stats: RegistrationStats,
}

impl<A: Aligner> PairwiseRegistrationEngine<A> {
    pub fn new(aligner: A, config: &RegistrationConfig) -> Self {
        Self {
            aligner,
            quality_threshold: config.quality_threshold,
            min_source_points: config.min_source_points,
            last_applied: HashMap::new(),
            stats: RegistrationStats::default(),
        }
    }

    pub fn aligner(&self) -> &A {
        &self.aligner
    }

    /// Last correction applied on `chain`.
    pub fn last_applied(&self, chain: &ChainKey) -> Option<&Pose3D> {
        self.last_applied.get(chain)
    }

    pub fn stats(&self) -> RegistrationStats {
        self.stats
    }

    /// Decide which transform to apply for `result` on `chain`.
    pub fn gate(&self, chain: &ChainKey, result: RegistrationResult) -> RegistrationOutcome {
        if result.quality >= self.quality_threshold {
            return RegistrationOutcome::Accepted(result);
        }
        let prior = self.last_applied.get(chain).copied();
        RegistrationOutcome::Fallback {
            result,
            applied: prior.unwrap_or_else(Pose3D::identity),
            had_prior: prior.is_some(),
        }
    }

    /// Align `frames` to `target` and correct their poses.
    pub fn register(
        &mut self,
        chain: ChainKey,
        frames: &mut [IndexedFrame],
        target: &PointCloud3D,
    ) -> RegistrationOutcome {
        let mut source = PointCloud3D::new();
        for item in frames.iter() {
            if let Some(cloud) = item.frame.world_cloud() {
                source.extend_from(&cloud);
            }
        }

        if source.len() < self.min_source_points || target.is_empty() {
            log::debug!(
                "Chain {}: skipping registration ({} source, {} target points)",
                chain,
                source.len(),
                target.len()
            );
            self.stats.skipped += 1;
            return RegistrationOutcome::Skipped {
                source_points: source.len(),
            };
        }

        let result = self.aligner.align(&source, target, &Pose3D::identity());
        self.stats.quality_sum += result.quality as f64;
        let outcome = self.gate(&chain, result);

        match &outcome {
            RegistrationOutcome::Accepted(r) => {
                self.stats.accepted += 1;
                log::debug!(
                    "Chain {}: accepted, quality {:.1}%, {} iterations",
                    chain,
                    r.quality,
                    r.iterations
                );
            }
            RegistrationOutcome::Fallback {
                result, had_prior, ..
            } => {
                self.stats.fallbacks += 1;
                log::warn!(
                    "Chain {}: quality {:.1}% below {:.1}%, using {}",
                    chain,
                    result.quality,
                    self.quality_threshold,
                    if *had_prior {
                        "last correction"
                    } else {
                        "identity"
                    }
                );
            }
            RegistrationOutcome::Skipped { .. } => {}
        }

        if let Some(applied) = outcome.applied() {
            for item in frames.iter_mut() {
                item.frame.apply_correction(&applied);
            }
            self.last_applied.insert(chain, applied);
        }
        outcome
    }
}
