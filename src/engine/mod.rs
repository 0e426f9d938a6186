//! Orchestration layer: the per-cycle localization engine.

pub mod locator;

pub use locator::{CycleInput, SelfLocator, TeamPoseMessage};
