//! Landmark sensor models.
//!
//! Each model turns the frame's observations of one landmark class into a
//! per-sample likelihood factor. A model may decline to weight individual
//! samples (an observation can be goal-net clutter from some viewpoints);
//! the orchestrator substitutes the average factor for those samples so a
//! single geometric edge case cannot zero out the population.

pub mod center_circle;
pub mod corners;
pub mod goal_posts;
pub mod lines;

pub use center_circle::CenterCircleSensorModel;
pub use corners::CornersSensorModel;
pub use goal_posts::GoalPostsSensorModel;
pub use lines::LineSensorModel;

use crate::algorithms::field_model::{FieldModel, GoalNetTable};
use crate::core::field::FieldDimensions;
use crate::core::types::{CameraInfo, FrameInfo, GoalPercept, LinePercept};

use super::sample_set::SampleSet;

/// Landmark classes handled by distinct sensor models.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObservationKind {
    /// An endpoint of a perceived field line.
    Point,
    /// A line intersection (X/T/L).
    Corner,
    GoalPost,
    CenterCircle,
}

/// One selectable observation: its class and an index into the percept.
#[derive(Debug, Clone, Copy)]
pub struct Observation {
    pub kind: ObservationKind,
    pub index: usize,
}

impl Observation {
    pub fn new(kind: ObservationKind, index: usize) -> Self {
        Self { kind, index }
    }
}

/// Outcome of one model's weighting computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorUpdate {
    /// No observation of this class was selected; weightings untouched.
    None,
    /// Some samples received no factor (marked with [`NO_WEIGHTING`]).
    Partial,
    /// Every sample received a factor.
    Full,
}

/// Marker written into the weighting buffer for samples a partial update
/// could not assess.
pub const NO_WEIGHTING: f64 = -1.0;

/// Everything a sensor model needs for one frame, passed explicitly.
pub struct SensorContext<'a> {
    pub frame: &'a FrameInfo,
    pub field: &'a FieldDimensions,
    pub field_model: &'a FieldModel,
    pub goal_net: &'a GoalNetTable,
    pub camera: &'a CameraInfo,
    pub goal_percept: &'a GoalPercept,
    pub line_percept: &'a LinePercept,
}

/// A per-landmark-class likelihood model.
pub trait SensorModel {
    /// The observation class this model consumes.
    fn kind(&self) -> ObservationKind;

    /// Compute per-sample likelihood factors for the selected observations.
    ///
    /// `weightings` has one slot per sample; on [`SensorUpdate::Partial`]
    /// unassessed slots hold [`NO_WEIGHTING`].
    fn compute_weightings(
        &mut self,
        ctx: &SensorContext,
        samples: &SampleSet,
        selected: &[usize],
        weightings: &mut [f64],
    ) -> SensorUpdate;
}
