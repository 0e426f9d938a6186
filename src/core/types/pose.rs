//! Pose and point types.
//!
//! All positions are in field millimeters; the field center is the origin,
//! x points toward the opponent goal, y to the left.

use serde::{Deserialize, Serialize};

/// A 2D point in field millimeters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f32,
    pub y: f32,
}

impl Point2D {
    #[inline]
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Squared distance to another point (avoids sqrt).
    #[inline]
    pub fn distance_squared(&self, other: &Point2D) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// Distance to another point.
    #[inline]
    pub fn distance(&self, other: &Point2D) -> f32 {
        self.distance_squared(other).sqrt()
    }

    /// Distance from the origin.
    #[inline]
    pub fn norm(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    /// Angle of the vector from the origin to this point.
    #[inline]
    pub fn angle(&self) -> f32 {
        self.y.atan2(self.x)
    }

    /// Rotate by a precomputed unit vector (cos, sin).
    ///
    /// This is the hot-path rotation: no trigonometry, just four
    /// multiplications, so it can run per sample per observation.
    #[inline]
    pub fn rotated_by(&self, cos: f32, sin: f32) -> Point2D {
        Point2D::new(self.x * cos - self.y * sin, self.x * sin + self.y * cos)
    }
}

impl Default for Point2D {
    fn default() -> Self {
        Self { x: 0.0, y: 0.0 }
    }
}

impl std::ops::Add for Point2D {
    type Output = Point2D;
    #[inline]
    fn add(self, other: Point2D) -> Point2D {
        Point2D::new(self.x + other.x, self.y + other.y)
    }
}

impl std::ops::Sub for Point2D {
    type Output = Point2D;
    #[inline]
    fn sub(self, other: Point2D) -> Point2D {
        Point2D::new(self.x - other.x, self.y - other.y)
    }
}

/// Robot pose in field coordinates.
///
/// Position (x, y) in millimeters and heading (theta) in radians,
/// normalized to [-π, π].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose2D {
    pub x: f32,
    pub y: f32,
    pub theta: f32,
}

impl Pose2D {
    /// Create a new pose with theta normalized to [-π, π].
    #[inline]
    pub fn new(x: f32, y: f32, theta: f32) -> Self {
        Self {
            x,
            y,
            theta: crate::core::math::normalize_angle(theta),
        }
    }

    /// Identity pose at origin with zero heading.
    #[inline]
    pub fn identity() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            theta: 0.0,
        }
    }

    #[inline]
    pub fn position(&self) -> Point2D {
        Point2D::new(self.x, self.y)
    }

    /// Compose two poses: apply `other` relative to `self`'s frame.
    #[inline]
    pub fn compose(&self, other: &Pose2D) -> Pose2D {
        let (sin_t, cos_t) = self.theta.sin_cos();
        Pose2D::new(
            self.x + other.x * cos_t - other.y * sin_t,
            self.y + other.x * sin_t + other.y * cos_t,
            self.theta + other.theta,
        )
    }

    /// Inverse of this pose: the transform that undoes it.
    #[inline]
    pub fn inverse(&self) -> Pose2D {
        let (sin_t, cos_t) = self.theta.sin_cos();
        Pose2D::new(
            -self.x * cos_t - self.y * sin_t,
            self.x * sin_t - self.y * cos_t,
            -self.theta,
        )
    }

    /// The relative transform from `other` to `self`: `other⁻¹ ⊕ self`.
    ///
    /// Used for odometry deltas between two absolute odometry readings.
    #[inline]
    pub fn relative_to(&self, other: &Pose2D) -> Pose2D {
        other.inverse().compose(self)
    }

    /// Transform a point from this pose's local frame to the global frame.
    #[inline]
    pub fn transform_point(&self, point: &Point2D) -> Point2D {
        let (sin_t, cos_t) = self.theta.sin_cos();
        Point2D::new(
            self.x + point.x * cos_t - point.y * sin_t,
            self.y + point.x * sin_t + point.y * cos_t,
        )
    }

    /// Bearing from this pose to a point in the global frame.
    #[inline]
    pub fn angle_to(&self, point: &Point2D) -> f32 {
        crate::core::math::normalize_angle(
            (point.y - self.y).atan2(point.x - self.x) - self.theta,
        )
    }
}

impl Default for Pose2D {
    fn default() -> Self {
        Self::identity()
    }
}

/// A symmetric 2×2 position covariance (millimeters squared).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Covariance2D {
    pub xx: f32,
    pub xy: f32,
    pub yy: f32,
}

impl Covariance2D {
    #[inline]
    pub fn new(xx: f32, xy: f32, yy: f32) -> Self {
        Self { xx, xy, yy }
    }

    #[inline]
    pub fn diagonal(xx: f32, yy: f32) -> Self {
        Self { xx, xy: 0.0, yy }
    }
}

impl Default for Covariance2D {
    fn default() -> Self {
        Self::diagonal(0.0, 0.0)
    }
}

/// The localization output: a pose with a confidence score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RobotPose {
    pub pose: Pose2D,
    /// Confidence in [0, 1]; 0 means the pose carries no information.
    pub validity: f32,
}

impl Default for RobotPose {
    fn default() -> Self {
        Self {
            pose: Pose2D::identity(),
            validity: 0.0,
        }
    }
}

/// One pose hypothesis with its position uncertainty.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RobotPoseHypothesis {
    pub pose: Pose2D,
    pub position_covariance: Covariance2D,
    pub validity: f32,
}

/// A bounded set of simultaneous pose hypotheses, ordered by support size.
#[derive(Debug, Clone, Default)]
pub struct RobotPoseHypotheses {
    pub hypotheses: Vec<RobotPoseHypothesis>,
}

impl RobotPoseHypotheses {
    /// Maximum number of hypotheses ever reported.
    pub const MAX_HYPOTHESES: usize = 4;
}
