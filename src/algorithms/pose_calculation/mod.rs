//! Pose extraction strategies.
//!
//! A pose calculator reduces the weighted sample population to one output
//! pose (and possibly several hypotheses). Exactly one strategy is active;
//! the operator can switch at runtime, which discards the outgoing
//! strategy's internal state and initializes the incoming one against the
//! current population.

pub mod best_particle;
pub mod binning;
pub mod kmeans;
pub mod overall_average;
pub mod particle_history;

pub use best_particle::BestParticleCalculator;
pub use binning::Binning2DCalculator;
pub use kmeans::KMeansCalculator;
pub use overall_average::OverallAverageCalculator;
pub use particle_history::{MergingStrategy, ParticleHistoryCalculator};

use serde::{Deserialize, Serialize};

use crate::core::field::FieldDimensions;
use crate::core::types::pose::{RobotPose, RobotPoseHypotheses};

use super::localization::sample_set::SampleSet;

/// The available strategies, selectable at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PoseCalculatorKind {
    BestParticle,
    OverallAverage,
    #[serde(rename = "binning-2d")]
    Binning2D,
    KMeansClustering,
    ParticleHistory,
}

impl Default for PoseCalculatorKind {
    fn default() -> Self {
        PoseCalculatorKind::ParticleHistory
    }
}

/// Parameters of the pose extraction strategies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoseCalculationConfig {
    /// The active strategy.
    #[serde(default)]
    pub calculator: PoseCalculatorKind,

    /// Particle history: how many percent larger a new cluster must be
    /// before the selection switches away from the current one.
    #[serde(default = "default_cluster_switch_percentage")]
    pub cluster_switch_percentage: u32,

    /// Particle history: the per-cycle cluster consolidation policy.
    #[serde(default)]
    pub merging_strategy: MergingStrategy,
}

fn default_cluster_switch_percentage() -> u32 {
    50
}

impl Default for PoseCalculationConfig {
    fn default() -> Self {
        Self {
            calculator: PoseCalculatorKind::default(),
            cluster_switch_percentage: default_cluster_switch_percentage(),
            merging_strategy: MergingStrategy::default(),
        }
    }
}

/// A strategy that reduces the population to an output pose.
pub trait PoseCalculator {
    /// Compute the output pose. `pose` carries the previous result in and
    /// keeps it (with validity 0) when no usable samples exist.
    fn calc_pose(&mut self, samples: &mut SampleSet, pose: &mut RobotPose);

    /// (Re)initialize internal state against the current population.
    fn init(&mut self, _samples: &mut SampleSet) {}

    /// Hand out a cluster id for a freshly injected sample.
    fn new_cluster_index(&mut self) -> usize {
        0
    }

    /// The id of the currently selected cluster, if the strategy has one.
    fn index_of_best_cluster(&self) -> Option<usize> {
        None
    }

    /// Report simultaneous hypotheses. Strategies without genuine
    /// multi-modality leave the list empty.
    fn hypotheses(&self, _samples: &SampleSet, hypotheses: &mut RobotPoseHypotheses) {
        hypotheses.hypotheses.clear();
    }

    /// Whether [`PoseCalculator::hypotheses`] can ever return anything.
    fn supports_hypotheses(&self) -> bool {
        false
    }
}

/// Instantiate a strategy. The caller is expected to `init` it against the
/// current sample set afterwards.
pub fn create_pose_calculator(
    kind: PoseCalculatorKind,
    field: &FieldDimensions,
    config: &PoseCalculationConfig,
    seed: u64,
) -> Box<dyn PoseCalculator> {
    match kind {
        PoseCalculatorKind::BestParticle => Box::new(BestParticleCalculator::new()),
        PoseCalculatorKind::OverallAverage => Box::new(OverallAverageCalculator::new()),
        PoseCalculatorKind::Binning2D => Box::new(Binning2DCalculator::new(
            2.0 * field.x_groundline,
            2.0 * field.y_sideline,
        )),
        PoseCalculatorKind::KMeansClustering => Box::new(KMeansCalculator::new(seed)),
        PoseCalculatorKind::ParticleHistory => Box::new(ParticleHistoryCalculator::new(
            config.cluster_switch_percentage,
            config.merging_strategy,
            seed,
        )),
    }
}
