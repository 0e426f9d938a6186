//! Core algorithms: spatial lookup, particle filtering, pose extraction.

pub mod field_model;
pub mod localization;
pub mod pose_calculation;
