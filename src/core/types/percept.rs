//! Landmark percepts consumed by the locator.
//!
//! All percept positions are relative to the robot (millimeters), as
//! produced by the vision pipeline after projection to the ground plane.

use serde::{Deserialize, Serialize};

use super::pose::{Point2D, Pose2D};

/// How the distance to a goal post was estimated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistanceMethod {
    /// Distance derived from the bearing to the post's foot point.
    BearingBased,
    /// Distance derived from the post's size in the image.
    SizeBased,
    /// The post is too close for a usable distance; only the bearing counts.
    TooClose,
}

/// Side-known goal posts, indexed into [`GoalPercept::posts`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GoalPostSide {
    LeftOpponent = 0,
    RightOpponent = 1,
    LeftOwn = 2,
    RightOwn = 3,
}

/// A single perceived goal post.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GoalPostPercept {
    /// Position relative to the robot in millimeters.
    pub position_on_field: Point2D,
    pub distance_method: DistanceMethod,
    /// Frame timestamp (ms) of the most recent sighting; a post counts as
    /// seen this cycle when this equals the current frame time.
    pub last_seen: u64,
}

impl Default for GoalPostPercept {
    fn default() -> Self {
        Self {
            position_on_field: Point2D::default(),
            distance_method: DistanceMethod::BearingBased,
            last_seen: 0,
        }
    }
}

/// All goal post observations of one frame.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GoalPercept {
    /// Posts whose side (left/right) could be identified.
    pub posts: [GoalPostPercept; Self::NUM_POSTS],
    /// Posts where only the goal is known, not the side.
    /// Index 0: opponent goal, index 1: own goal.
    pub unknown_posts: [GoalPostPercept; Self::NUM_UNKNOWN_POSTS],
}

impl GoalPercept {
    pub const NUM_POSTS: usize = 4;
    pub const NUM_UNKNOWN_POSTS: usize = 2;
}

/// The perceived center circle.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CenterCirclePercept {
    /// Center position relative to the robot in millimeters.
    pub position: Point2D,
    pub found: bool,
}

/// A perceived field line segment (endpoints relative to the robot).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FieldLine {
    pub first: Point2D,
    pub last: Point2D,
}

impl FieldLine {
    /// Squared length, used to classify short vs. long lines.
    #[inline]
    pub fn length_squared(&self) -> f32 {
        self.first.distance_squared(&self.last)
    }
}

/// The type of a line intersection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntersectionKind {
    /// Two lines crossing each other.
    X,
    /// One line ending on another.
    T,
    /// Two lines ending in a corner.
    L,
}

/// A perceived intersection of two field lines.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Intersection {
    /// Position relative to the robot in millimeters.
    pub position: Point2D,
    pub kind: IntersectionKind,
    /// Direction of the first involved line (unit-ish vector, robot frame).
    pub dir1: Point2D,
    /// Direction of the second involved line; for T intersections this is
    /// the crossbar, for X it is unused.
    pub dir2: Point2D,
}

impl Intersection {
    /// Relative direction of the corner used for orientation lookup.
    ///
    /// X corners have no orientation; T corners are oriented by their stem;
    /// L corners by the bisector of their legs minus 45°.
    pub fn relative_direction(&self) -> f32 {
        match self.kind {
            IntersectionKind::X => 0.0,
            IntersectionKind::T => self.dir1.angle(),
            IntersectionKind::L => {
                (self.dir1 + self.dir2).angle() - std::f32::consts::FRAC_PI_4
            }
        }
    }
}

/// Line-related observations of one frame.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinePercept {
    pub lines: Vec<FieldLine>,
    pub intersections: Vec<Intersection>,
    pub circle: CenterCirclePercept,
}

/// The camera's pose relative to the robot's ground point.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CameraInfo {
    /// Camera position and viewing direction projected to the ground plane,
    /// relative to the robot origin (millimeters / radians).
    pub ground_pose: Pose2D,
    /// Camera height above the ground in millimeters.
    pub height: f32,
    /// Whether the camera extrinsics are trustworthy this frame.
    pub valid: bool,
}

impl Default for CameraInfo {
    fn default() -> Self {
        Self {
            ground_pose: Pose2D::identity(),
            height: 450.0,
            valid: true,
        }
    }
}

/// Per-cycle frame information.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct FrameInfo {
    /// Monotonic frame timestamp in milliseconds.
    pub time: u64,
}

impl FrameInfo {
    #[inline]
    pub fn time_since(&self, timestamp: u64) -> u64 {
        self.time.saturating_sub(timestamp)
    }
}
