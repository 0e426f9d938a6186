//! Goal-net confusion table.
//!
//! White goal nets look exactly like white field lines to the scanline
//! classifier. For every position and viewing direction on the carpet, this
//! table stores how far a perceived point may be before the ray pierces a
//! goal structure; anything beyond that distance is probably net, not line.

use crate::core::field::FieldDimensions;
use crate::core::types::pose::{Point2D, Pose2D};

/// Cell edge length of the position grid in millimeters.
pub const NET_CELL_SIZE: f32 = 64.0;
/// Number of discrete viewing-direction sectors.
pub const NET_SECTORS: usize = 32;

/// Maximum free view distance per (position, direction sector).
#[derive(Debug, Clone, PartialEq)]
pub struct GoalNetTable {
    x_size: usize,
    y_size: usize,
    max_free: Vec<i16>,
}

impl GoalNetTable {
    /// Compute the table by intersecting view rays with the goal frames.
    pub fn build(field: &FieldDimensions) -> Self {
        let x_size = (2.0 * field.x_carpet_border / NET_CELL_SIZE).ceil() as usize + 1;
        let y_size = (2.0 * field.y_carpet_border / NET_CELL_SIZE).ceil() as usize + 1;
        let mut table = Self {
            x_size,
            y_size,
            max_free: vec![i16::MAX; x_size * y_size * NET_SECTORS],
        };

        let segments = goal_segments(field);
        let sector_size = std::f32::consts::TAU / NET_SECTORS as f32;
        for y in 0..y_size {
            for x in 0..x_size {
                let origin = Point2D::new(
                    (x as f32 + 0.5 - x_size as f32 / 2.0) * NET_CELL_SIZE,
                    (y as f32 + 0.5 - y_size as f32 / 2.0) * NET_CELL_SIZE,
                );
                for a in 0..NET_SECTORS {
                    // Cast through the sector center.
                    let angle = sector_size * (a as f32 + 0.5);
                    let dir = Point2D::new(angle.cos(), angle.sin());
                    let mut max_dist = i16::MAX as f32;
                    for seg in &segments {
                        if let Some(d) = ray_segment_distance(&origin, &dir, &seg.0, &seg.1) {
                            if d < max_dist {
                                max_dist = d;
                            }
                        }
                    }
                    table.max_free[(y * x_size + x) * NET_SECTORS + a] = max_dist as i16;
                }
            }
        }
        table
    }

    /// The free view distance from a pose along a relative bearing.
    pub fn max_free_distance(&self, pose: &Pose2D, bearing: f32) -> f32 {
        let x = ((pose.x / NET_CELL_SIZE) + self.x_size as f32 / 2.0) as isize;
        let y = ((pose.y / NET_CELL_SIZE) + self.y_size as f32 / 2.0) as isize;
        let x = x.clamp(0, self.x_size as isize - 1) as usize;
        let y = y.clamp(0, self.y_size as isize - 1) as usize;
        let mut total = pose.theta + bearing;
        while total < 0.0 {
            total += std::f32::consts::TAU;
        }
        while total >= std::f32::consts::TAU {
            total -= std::f32::consts::TAU;
        }
        let sector = ((total / std::f32::consts::TAU) * NET_SECTORS as f32) as usize;
        let sector = sector.min(NET_SECTORS - 1);
        self.max_free[(y * self.x_size + x) * NET_SECTORS + sector] as f32
    }

    /// Whether a perceived point is probably part of a goal net from the
    /// given viewpoint: its measured distance exceeds the free view range.
    #[inline]
    pub fn point_probably_in_goal_net(&self, pose: &Pose2D, distance: f32, bearing: f32) -> bool {
        distance > self.max_free_distance(pose, bearing)
    }

    pub fn dimensions(&self) -> (usize, usize, usize) {
        (self.x_size, self.y_size, NET_SECTORS)
    }

    pub(crate) fn raw(&self) -> &[i16] {
        &self.max_free
    }

    pub(crate) fn from_raw(x_size: usize, y_size: usize, max_free: Vec<i16>) -> Self {
        debug_assert_eq!(max_free.len(), x_size * y_size * NET_SECTORS);
        Self {
            x_size,
            y_size,
            max_free,
        }
    }
}

/// The six goal frame segments (back bar and both sides, for both goals).
fn goal_segments(field: &FieldDimensions) -> Vec<(Point2D, Point2D)> {
    let x = field.x_goalpost;
    let d = field.goal_depth;
    let y = field.y_goal;
    vec![
        (Point2D::new(x + d, -y), Point2D::new(x + d, y)),
        (Point2D::new(x, -y), Point2D::new(x + d, -y)),
        (Point2D::new(x, y), Point2D::new(x + d, y)),
        (Point2D::new(-x - d, -y), Point2D::new(-x - d, y)),
        (Point2D::new(-x, -y), Point2D::new(-x - d, -y)),
        (Point2D::new(-x, y), Point2D::new(-x - d, y)),
    ]
}

/// Distance from `origin` along unit direction `dir` to segment `(a, b)`,
/// or `None` when the ray misses the segment.
fn ray_segment_distance(
    origin: &Point2D,
    dir: &Point2D,
    a: &Point2D,
    b: &Point2D,
) -> Option<f32> {
    let seg = *b - *a;
    let denom = dir.x * seg.y - dir.y * seg.x;
    if denom.abs() < 1e-9 {
        return None;
    }
    let diff = *a - *origin;
    let t = (diff.x * seg.y - diff.y * seg.x) / denom;
    let u = (diff.x * dir.y - diff.y * dir.x) / denom;
    if t >= 0.0 && (0.0..=1.0).contains(&u) {
        Some(t)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ray_segment_hit_and_miss() {
        let origin = Point2D::new(0.0, 0.0);
        let dir = Point2D::new(1.0, 0.0);
        let d = ray_segment_distance(
            &origin,
            &dir,
            &Point2D::new(1000.0, -500.0),
            &Point2D::new(1000.0, 500.0),
        );
        assert!(d.is_some());
        assert!((d.unwrap() - 1000.0).abs() < 1e-3);

        // Behind the origin: no hit.
        let behind = ray_segment_distance(
            &origin,
            &dir,
            &Point2D::new(-1000.0, -500.0),
            &Point2D::new(-1000.0, 500.0),
        );
        assert!(behind.is_none());
    }

    #[test]
    fn test_view_into_goal_is_limited() {
        let field = FieldDimensions::default();
        let table = GoalNetTable::build(&field);
        // Standing in front of the opponent goal, looking straight at it.
        let pose = Pose2D::new(field.x_goalpost - 1000.0, 0.0, 0.0);
        let free = table.max_free_distance(&pose, 0.0);
        assert!(
            free < 2000.0,
            "view into the goal should stop at the frame: {}",
            free
        );
        // Looking back toward midfield is unobstructed for a long way.
        let free_back = table.max_free_distance(&pose, std::f32::consts::PI);
        assert!(free_back > 4000.0, "open view was {}", free_back);
    }

    #[test]
    fn test_point_probably_in_goal_net() {
        let field = FieldDimensions::default();
        let table = GoalNetTable::build(&field);
        let pose = Pose2D::new(field.x_goalpost - 800.0, 0.0, 0.0);
        // A point far beyond the goal line along the view ray: suspect.
        assert!(table.point_probably_in_goal_net(&pose, 3000.0, 0.0));
        // A close point is fine.
        assert!(!table.point_probably_in_goal_net(&pose, 300.0, 0.0));
    }
}
