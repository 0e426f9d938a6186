//! MaidanLoc - Monte Carlo self-localization for humanoid soccer robots
//!
//! A particle-filter state estimator that fuses noisy odometry with sparse,
//! ambiguous visual landmark observations (goal posts, the center circle,
//! field lines, line intersections) into one best-estimate robot pose plus
//! optional multiple pose hypotheses, once per control cycle.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                    engine/                          │  ← Orchestration
//! │            (per-cycle SelfLocator)                  │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                  algorithms/                        │  ← Core algorithms
//! │   (field_model, localization, pose_calculation)     │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                     core/                           │  ← Foundation
//! │          (types, math, rng, field geometry)         │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! # Per-cycle pipeline
//!
//! 1. **Motion update**: every sample moves by the odometry delta plus an
//!    anisotropic, sample-relative noise draw, clipped to the carpet.
//! 2. **Sensor update**: goal posts and the center circle are mandatory
//!    observations when visible; line endpoints and intersections fill a
//!    configured observation budget. Each sensor model multiplies a
//!    likelihood factor into the sample weightings; line and corner
//!    correspondence runs through precomputed nearest-feature tables.
//! 3. **Adaptive resampling**: stochastic universal resampling with an
//!    additive survival threshold; a slow/fast likelihood-ratio decides
//!    which fraction of the next generation is injected fresh from
//!    landmark-derived pose templates instead.
//! 4. **Pose extraction**: one of five pluggable strategies reduces the
//!    population to a pose with a validity score; the clustering
//!    strategies additionally report multiple hypotheses.

// ============================================================================
// Layer 1: Core foundation (no internal deps)
// ============================================================================
pub mod core;

// ============================================================================
// Layer 2: Algorithms (depends on core)
// ============================================================================
pub mod algorithms;

// ============================================================================
// Layer 3: Engine (depends on core, algorithms)
// ============================================================================
pub mod engine;

pub mod config;
pub mod error;

// ============================================================================
// Convenience re-exports (flat namespace for common use)
// ============================================================================

// Core types
pub use crate::core::field::{FieldDimensions, FieldGeometry};
pub use crate::core::rng::{Rng, SimpleRng};
pub use crate::core::types::{
    CameraInfo, CenterCirclePercept, Covariance2D, DistanceMethod, FieldLine, FrameInfo,
    GamePhase, GameState, GoalPercept, GoalPostPercept, GoalPostSide, Intersection,
    IntersectionKind, LinePercept, Point2D, Pose2D, RobotPose, RobotPoseHypotheses,
    RobotPoseHypothesis, SecondaryState,
};

// Algorithms - field model
pub use crate::algorithms::field_model::{ClosestPointTable, FieldModel, GoalNetTable};

// Algorithms - localization
pub use crate::algorithms::localization::{
    GaussianTable, MotionModel, MotionModelConfig, Observation, ObservationKind, Sample,
    SampleSet, SampleTemplateGenerator, SensorContext, SensorModel, SensorUpdate,
    TemplateConfig,
};

// Algorithms - pose calculation
pub use crate::algorithms::pose_calculation::{
    BestParticleCalculator, Binning2DCalculator, KMeansCalculator, MergingStrategy,
    OverallAverageCalculator, ParticleHistoryCalculator, PoseCalculationConfig, PoseCalculator,
    PoseCalculatorKind,
};

// Engine
pub use crate::config::LocatorConfig;
pub use crate::engine::{CycleInput, SelfLocator, TeamPoseMessage};
pub use crate::error::{LocError, Result};
