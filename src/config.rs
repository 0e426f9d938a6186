//! Configuration for the self locator.
//!
//! All tunables live in one TOML-loadable struct. Every field has a
//! default, so a partial file (or none at all) yields a working setup; the
//! file can be reloaded at runtime without restarting.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::algorithms::localization::motion_model::MotionModelConfig;
use crate::algorithms::localization::sensor::center_circle::CenterCircleNoise;
use crate::algorithms::localization::sensor::corners::CornerNoise;
use crate::algorithms::localization::sensor::goal_posts::GoalPostNoise;
use crate::algorithms::localization::sensor::lines::LineNoise;
use crate::algorithms::localization::template_generator::TemplateConfig;
use crate::algorithms::pose_calculation::PoseCalculationConfig;
use crate::core::types::pose::Pose2D;
use crate::error::Result;

/// Population and observation budget.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationConfig {
    /// Number of samples in the population.
    #[serde(default = "default_number_of_samples")]
    pub number_of_samples: usize,

    /// Total number of observations applied per cycle; optional
    /// observations are drawn (with replacement) up to this count.
    #[serde(default = "default_number_of_observations")]
    pub number_of_observations: usize,

    /// RNG seed; 0 draws a seed from the clock at startup.
    #[serde(default)]
    pub seed: u64,
}

fn default_number_of_samples() -> usize {
    100
}
fn default_number_of_observations() -> usize {
    6
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            number_of_samples: default_number_of_samples(),
            number_of_observations: default_number_of_observations(),
            seed: 0,
        }
    }
}

/// Per-landmark-class noise parameters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SensorNoiseConfig {
    #[serde(default)]
    pub goal_posts: GoalPostNoise,
    #[serde(default)]
    pub center_circle: CenterCircleNoise,
    #[serde(default)]
    pub lines: LineNoise,
    #[serde(default)]
    pub corners: CornerNoise,
}

/// Resampling and adaptive-injection parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResamplingConfig {
    /// Additive per-sample survival bonus, as a fraction of the average
    /// weighting. Keeps low-weight samples alive with some probability.
    #[serde(default = "default_resampling_threshold")]
    pub resampling_threshold: f64,

    /// Decay constant of the slow average-likelihood estimate.
    #[serde(default = "default_alpha_slow")]
    pub alpha_slow: f64,

    /// Decay constant of the fast average-likelihood estimate.
    #[serde(default = "default_alpha_fast")]
    pub alpha_fast: f64,

    /// Disable template injection entirely (pure resampling).
    #[serde(default)]
    pub disable_sensor_resetting: bool,
}

fn default_resampling_threshold() -> f64 {
    0.3
}
fn default_alpha_slow() -> f64 {
    0.05
}
fn default_alpha_fast() -> f64 {
    0.2
}

impl Default for ResamplingConfig {
    fn default() -> Self {
        Self {
            resampling_threshold: default_resampling_threshold(),
            alpha_slow: default_alpha_slow(),
            alpha_fast: default_alpha_fast(),
            disable_sensor_resetting: false,
        }
    }
}

/// Field model build parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldModelConfig {
    /// Observed lines longer than this (mm) are matched only against the
    /// long lines of the field model.
    #[serde(default = "default_max_crossing_length")]
    pub max_crossing_length: f32,
}

fn default_max_crossing_length() -> f32 {
    300.0
}

impl Default for FieldModelConfig {
    fn default() -> Self {
        Self {
            max_crossing_length: default_max_crossing_length(),
        }
    }
}

/// Reinitialization policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetConfig {
    /// React to game-state transitions (penalty release, penalty shootout).
    #[serde(default)]
    pub consider_game_state: bool,

    /// Initialize around a known start pose instead of uniformly.
    #[serde(default)]
    pub known_start_pose: bool,

    /// Behavior agent name; "penalty" forces penalty-shootout handling.
    #[serde(default = "default_agent")]
    pub agent: String,

    #[serde(default)]
    pub start_pose: Pose2D,

    /// Per-axis spread around the start pose (x mm, y mm, theta rad).
    #[serde(default = "default_start_pose_std_dev")]
    pub start_pose_standard_deviation: Pose2D,
}

fn default_start_pose_std_dev() -> Pose2D {
    Pose2D {
        x: 200.0,
        y: 200.0,
        theta: 0.2,
    }
}
fn default_agent() -> String {
    "soccer".to_string()
}

impl Default for ResetConfig {
    fn default() -> Self {
        Self {
            consider_game_state: false,
            known_start_pose: false,
            start_pose: Pose2D::identity(),
            start_pose_standard_deviation: default_start_pose_std_dev(),
            agent: default_agent(),
        }
    }
}

/// The complete tunable parameter set of the locator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocatorConfig {
    #[serde(default)]
    pub population: PopulationConfig,
    #[serde(default)]
    pub motion: MotionModelConfig,
    #[serde(default)]
    pub sensors: SensorNoiseConfig,
    #[serde(default)]
    pub resampling: ResamplingConfig,
    #[serde(default)]
    pub field_model: FieldModelConfig,
    #[serde(default)]
    pub templates: TemplateConfig,
    #[serde(default)]
    pub pose_calculation: PoseCalculationConfig,
    #[serde(default)]
    pub reset: ResetConfig,
}

impl LocatorConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}
