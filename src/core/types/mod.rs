//! Core data types shared by all layers.

pub mod game;
pub mod percept;
pub mod pose;

pub use game::{GamePhase, GameState, SecondaryState};
pub use percept::{
    CameraInfo, CenterCirclePercept, DistanceMethod, FieldLine, FrameInfo, GoalPercept,
    GoalPostPercept, GoalPostSide, Intersection, IntersectionKind, LinePercept,
};
pub use pose::{
    Covariance2D, Point2D, Pose2D, RobotPose, RobotPoseHypotheses, RobotPoseHypothesis,
};
