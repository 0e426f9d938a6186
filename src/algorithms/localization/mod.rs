//! The particle filter: population, motion model, sensor models and
//! template generation.

pub mod gaussian_table;
pub mod motion_model;
pub mod sample_set;
pub mod sensor;
pub mod template_generator;

pub use gaussian_table::GaussianTable;
pub use motion_model::{MotionModel, MotionModelConfig};
pub use sample_set::{Sample, SampleSet};
pub use sensor::{
    CenterCircleSensorModel, CornersSensorModel, GoalPostsSensorModel, LineSensorModel,
    Observation, ObservationKind, SensorContext, SensorModel, SensorUpdate,
};
pub use template_generator::{SampleTemplateGenerator, TemplateConfig};
