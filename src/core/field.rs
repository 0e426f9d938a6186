//! Static field geometry.
//!
//! [`FieldDimensions`] is built once from a [`FieldGeometry`] parameter set
//! and provides landmark coordinates, the field-line segment table and the
//! corner tables that the field model is precomputed from.

use serde::{Deserialize, Serialize};

use crate::core::rng::Rng;
use crate::core::types::pose::{Point2D, Pose2D};
use crate::core::types::GoalPostSide;

/// Raw field measurements in millimeters, loadable from configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldGeometry {
    #[serde(default = "default_field_length")]
    pub field_length: f32,
    #[serde(default = "default_field_width")]
    pub field_width: f32,
    #[serde(default = "default_carpet_length")]
    pub carpet_length: f32,
    #[serde(default = "default_carpet_width")]
    pub carpet_width: f32,
    #[serde(default = "default_penalty_area_depth")]
    pub penalty_area_depth: f32,
    #[serde(default = "default_penalty_area_width")]
    pub penalty_area_width: f32,
    /// Goal width measured between the post centers.
    #[serde(default = "default_goal_width")]
    pub goal_width: f32,
    #[serde(default = "default_goal_depth")]
    pub goal_depth: f32,
    #[serde(default = "default_center_circle_radius")]
    pub center_circle_radius: f32,
    #[serde(default = "default_goal_post_radius")]
    pub goal_post_radius: f32,
}

fn default_field_length() -> f32 {
    6000.0
}
fn default_field_width() -> f32 {
    4000.0
}
fn default_carpet_length() -> f32 {
    6800.0
}
fn default_carpet_width() -> f32 {
    4800.0
}
fn default_penalty_area_depth() -> f32 {
    600.0
}
fn default_penalty_area_width() -> f32 {
    2200.0
}
fn default_goal_width() -> f32 {
    1400.0
}
fn default_goal_depth() -> f32 {
    500.0
}
fn default_center_circle_radius() -> f32 {
    600.0
}
fn default_goal_post_radius() -> f32 {
    50.0
}

impl Default for FieldGeometry {
    fn default() -> Self {
        Self {
            field_length: default_field_length(),
            field_width: default_field_width(),
            carpet_length: default_carpet_length(),
            carpet_width: default_carpet_width(),
            penalty_area_depth: default_penalty_area_depth(),
            penalty_area_width: default_penalty_area_width(),
            goal_width: default_goal_width(),
            goal_depth: default_goal_depth(),
            center_circle_radius: default_center_circle_radius(),
            goal_post_radius: default_goal_post_radius(),
        }
    }
}

impl FieldGeometry {
    /// Fingerprint of the geometry, used to key the binary table cache.
    pub fn geometry_key(&self) -> u64 {
        let values = [
            self.field_length,
            self.field_width,
            self.carpet_length,
            self.carpet_width,
            self.penalty_area_depth,
            self.penalty_area_width,
            self.goal_width,
            self.goal_depth,
            self.center_circle_radius,
            self.goal_post_radius,
        ];
        // FNV-1a over the raw bit patterns.
        let mut hash: u64 = 0xcbf29ce484222325;
        for v in values {
            for byte in v.to_bits().to_le_bytes() {
                hash ^= byte as u64;
                hash = hash.wrapping_mul(0x100000001b3);
            }
        }
        hash
    }
}

/// A field line segment in field coordinates.
#[derive(Debug, Clone, Copy)]
pub struct LineSegment {
    pub start: Point2D,
    pub end: Point2D,
}

impl LineSegment {
    pub fn new(start: Point2D, end: Point2D) -> Self {
        Self { start, end }
    }

    #[inline]
    pub fn length(&self) -> f32 {
        self.start.distance(&self.end)
    }

    /// 0 if the segment runs mostly along the field's x axis, 1 if across.
    #[inline]
    pub fn direction_class(&self) -> usize {
        let dx = (self.end.x - self.start.x).abs();
        let dy = (self.end.y - self.start.y).abs();
        usize::from(dy > dx)
    }

    /// The point on this segment closest to `p`.
    pub fn closest_point_to(&self, p: &Point2D) -> Point2D {
        let d = self.end - self.start;
        let len_sq = d.x * d.x + d.y * d.y;
        if len_sq <= f32::EPSILON {
            return self.start;
        }
        let t = ((p.x - self.start.x) * d.x + (p.y - self.start.y) * d.y) / len_sq;
        let t = t.clamp(0.0, 1.0);
        Point2D::new(self.start.x + t * d.x, self.start.y + t * d.y)
    }
}

/// Number of segments used to approximate the center circle.
const CIRCLE_SEGMENTS: usize = 16;

/// Derived field description: landmark coordinates and feature tables.
#[derive(Debug, Clone)]
pub struct FieldDimensions {
    /// Half field length: x coordinate of the groundlines.
    pub x_groundline: f32,
    /// Half field width: y coordinate of the sidelines.
    pub y_sideline: f32,
    /// Half carpet length.
    pub x_carpet_border: f32,
    /// Half carpet width.
    pub y_carpet_border: f32,
    /// x coordinate of the penalty area front lines (positive half).
    pub x_penalty_area: f32,
    /// y coordinate of the penalty area side lines.
    pub y_penalty_area: f32,
    /// x coordinate of the goal post centers (positive half).
    pub x_goalpost: f32,
    /// y coordinate of the goal posts.
    pub y_goal: f32,
    pub goal_depth: f32,
    pub center_circle_radius: f32,
    pub goal_post_radius: f32,

    field_lines: Vec<LineSegment>,
    corners_x: Vec<Point2D>,
    corners_t: [Vec<Point2D>; 4],
    corners_l: [Vec<Point2D>; 4],
    geometry: FieldGeometry,
}

impl FieldDimensions {
    pub fn new(geometry: FieldGeometry) -> Self {
        let x_gl = geometry.field_length / 2.0;
        let y_sl = geometry.field_width / 2.0;
        let x_pa = x_gl - geometry.penalty_area_depth;
        let y_pa = geometry.penalty_area_width / 2.0;
        let y_goal = geometry.goal_width / 2.0;
        let r = geometry.center_circle_radius;

        let mut lines = Vec::new();
        let mut push = |x1: f32, y1: f32, x2: f32, y2: f32| {
            lines.push(LineSegment::new(Point2D::new(x1, y1), Point2D::new(x2, y2)));
        };
        // Groundlines and sidelines.
        push(x_gl, -y_sl, x_gl, y_sl);
        push(-x_gl, -y_sl, -x_gl, y_sl);
        push(-x_gl, y_sl, x_gl, y_sl);
        push(-x_gl, -y_sl, x_gl, -y_sl);
        // Center line.
        push(0.0, -y_sl, 0.0, y_sl);
        // Penalty areas.
        push(x_pa, -y_pa, x_pa, y_pa);
        push(x_pa, y_pa, x_gl, y_pa);
        push(x_pa, -y_pa, x_gl, -y_pa);
        push(-x_pa, -y_pa, -x_pa, y_pa);
        push(-x_pa, y_pa, -x_gl, y_pa);
        push(-x_pa, -y_pa, -x_gl, -y_pa);
        // Center circle, approximated by straight segments.
        for i in 0..CIRCLE_SEGMENTS {
            let a0 = (i as f32) / CIRCLE_SEGMENTS as f32 * std::f32::consts::TAU;
            let a1 = ((i + 1) as f32) / CIRCLE_SEGMENTS as f32 * std::f32::consts::TAU;
            push(r * a0.cos(), r * a0.sin(), r * a1.cos(), r * a1.sin());
        }

        // X corners: center line crossing the center circle.
        let corners_x = vec![Point2D::new(0.0, r), Point2D::new(0.0, -r)];

        // T and L corners, bucketed by the quantized absolute direction of
        // their canonical orientation (stem for T, bisector − 45° for L).
        let mut corners_t: [Vec<Point2D>; 4] = Default::default();
        let mut corners_l: [Vec<Point2D>; 4] = Default::default();
        // Sideline / center line junctions: stem points into the field.
        corners_t[3].push(Point2D::new(0.0, y_sl));
        corners_t[1].push(Point2D::new(0.0, -y_sl));
        // Groundline / penalty area junctions: stem points toward midfield.
        corners_t[0].push(Point2D::new(-x_gl, y_pa));
        corners_t[0].push(Point2D::new(-x_gl, -y_pa));
        corners_t[2].push(Point2D::new(x_gl, y_pa));
        corners_t[2].push(Point2D::new(x_gl, -y_pa));
        // Field corners.
        corners_l[0].push(Point2D::new(-x_gl, -y_sl));
        corners_l[3].push(Point2D::new(-x_gl, y_sl));
        corners_l[1].push(Point2D::new(x_gl, -y_sl));
        corners_l[2].push(Point2D::new(x_gl, y_sl));
        // Penalty area corners.
        corners_l[2].push(Point2D::new(-x_pa, y_pa));
        corners_l[1].push(Point2D::new(-x_pa, -y_pa));
        corners_l[3].push(Point2D::new(x_pa, y_pa));
        corners_l[0].push(Point2D::new(x_pa, -y_pa));

        Self {
            x_groundline: x_gl,
            y_sideline: y_sl,
            x_carpet_border: geometry.carpet_length / 2.0,
            y_carpet_border: geometry.carpet_width / 2.0,
            x_penalty_area: x_pa,
            y_penalty_area: y_pa,
            x_goalpost: x_gl,
            y_goal,
            goal_depth: geometry.goal_depth,
            center_circle_radius: r,
            goal_post_radius: geometry.goal_post_radius,
            field_lines: lines,
            corners_x,
            corners_t,
            corners_l,
            geometry,
        }
    }

    pub fn geometry(&self) -> &FieldGeometry {
        &self.geometry
    }

    pub fn geometry_key(&self) -> u64 {
        self.geometry.geometry_key()
    }

    /// All field line segments (including the center circle approximation).
    pub fn field_lines(&self) -> &[LineSegment] {
        &self.field_lines
    }

    pub fn x_corners(&self) -> &[Point2D] {
        &self.corners_x
    }

    /// T corners of one orientation class (0..4).
    pub fn t_corners(&self, orientation: usize) -> &[Point2D] {
        &self.corners_t[orientation & 3]
    }

    /// L corners of one orientation class (0..4).
    pub fn l_corners(&self, orientation: usize) -> &[Point2D] {
        &self.corners_l[orientation & 3]
    }

    /// The true field position of a side-known goal post.
    ///
    /// The own posts have their y coordinates switched: "left" is always
    /// from the robot's viewpoint when facing that goal.
    pub fn goal_post_position(&self, side: GoalPostSide) -> Point2D {
        match side {
            GoalPostSide::LeftOpponent => Point2D::new(self.x_goalpost, self.y_goal),
            GoalPostSide::RightOpponent => Point2D::new(self.x_goalpost, -self.y_goal),
            GoalPostSide::LeftOwn => Point2D::new(-self.x_goalpost, -self.y_goal),
            GoalPostSide::RightOwn => Point2D::new(-self.x_goalpost, self.y_goal),
        }
    }

    /// The two candidate positions for a post of unknown side.
    /// `goal_index` 0 is the opponent goal, 1 the own goal.
    pub fn unknown_post_candidates(&self, goal_index: usize) -> [Point2D; 2] {
        if goal_index == 0 {
            [
                self.goal_post_position(GoalPostSide::LeftOpponent),
                self.goal_post_position(GoalPostSide::RightOpponent),
            ]
        } else {
            [
                self.goal_post_position(GoalPostSide::LeftOwn),
                self.goal_post_position(GoalPostSide::RightOwn),
            ]
        }
    }

    #[inline]
    pub fn is_inside_carpet(&self, p: &Point2D) -> bool {
        p.x.abs() <= self.x_carpet_border && p.y.abs() <= self.y_carpet_border
    }

    /// Clip a point to the carpet boundary. Returns how far it moved.
    pub fn clip_to_carpet(&self, p: &mut Point2D) -> f32 {
        let clipped = Point2D::new(
            p.x.clamp(-self.x_carpet_border, self.x_carpet_border),
            p.y.clamp(-self.y_carpet_border, self.y_carpet_border),
        );
        let moved = p.distance(&clipped);
        *p = clipped;
        moved
    }

    /// A pose drawn uniformly over the playing field.
    pub fn random_pose_on_field<R: Rng>(&self, rng: &mut R) -> Pose2D {
        Pose2D::new(
            rng.gen_signed() * self.x_groundline,
            rng.gen_signed() * self.y_sideline,
            rng.gen_signed() * std::f32::consts::PI,
        )
    }
}

impl Default for FieldDimensions {
    fn default() -> Self {
        Self::new(FieldGeometry::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rng::SimpleRng;
    use approx::assert_relative_eq;

    #[test]
    fn test_derived_coordinates() {
        let field = FieldDimensions::default();
        assert_relative_eq!(field.x_groundline, 3000.0);
        assert_relative_eq!(field.y_sideline, 2000.0);
        assert_relative_eq!(field.x_penalty_area, 2400.0);
        assert_relative_eq!(field.y_goal, 700.0);
    }

    #[test]
    fn test_goal_post_positions_own_side_switched() {
        let field = FieldDimensions::default();
        use crate::core::types::GoalPostSide::*;
        assert_relative_eq!(field.goal_post_position(LeftOpponent).y, 700.0);
        // Seen from the robot facing its own goal, "left" is negative y.
        assert_relative_eq!(field.goal_post_position(LeftOwn).y, -700.0);
        assert_relative_eq!(field.goal_post_position(LeftOwn).x, -3000.0);
    }

    #[test]
    fn test_clip_to_carpet() {
        let field = FieldDimensions::default();
        let mut p = Point2D::new(5000.0, -3000.0);
        let moved = field.clip_to_carpet(&mut p);
        assert_relative_eq!(p.x, 3400.0);
        assert_relative_eq!(p.y, -2400.0);
        assert!(moved > 0.0);

        let mut inside = Point2D::new(100.0, 100.0);
        assert_eq!(field.clip_to_carpet(&mut inside), 0.0);
    }

    #[test]
    fn test_random_pose_inside_field() {
        let field = FieldDimensions::default();
        let mut rng = SimpleRng::new(3);
        for _ in 0..100 {
            let pose = field.random_pose_on_field(&mut rng);
            assert!(pose.x.abs() <= field.x_groundline);
            assert!(pose.y.abs() <= field.y_sideline);
            assert!(field.is_inside_carpet(&pose.position()));
        }
    }

    #[test]
    fn test_segment_closest_point() {
        let seg = LineSegment::new(Point2D::new(0.0, 0.0), Point2D::new(1000.0, 0.0));
        let p = seg.closest_point_to(&Point2D::new(500.0, 300.0));
        assert_relative_eq!(p.x, 500.0);
        assert_relative_eq!(p.y, 0.0);
        // Beyond the end, the endpoint wins.
        let q = seg.closest_point_to(&Point2D::new(1500.0, 300.0));
        assert_relative_eq!(q.x, 1000.0);
    }

    #[test]
    fn test_geometry_key_changes_with_geometry() {
        let a = FieldGeometry::default();
        let mut b = FieldGeometry::default();
        b.goal_width += 100.0;
        assert_ne!(a.geometry_key(), b.geometry_key());
        assert_eq!(a.geometry_key(), FieldGeometry::default().geometry_key());
    }

    #[test]
    fn test_corner_counts() {
        let field = FieldDimensions::default();
        assert_eq!(field.x_corners().len(), 2);
        let t_total: usize = (0..4).map(|o| field.t_corners(o).len()).sum();
        let l_total: usize = (0..4).map(|o| field.l_corners(o).len()).sum();
        assert_eq!(t_total, 6, "sideline junctions plus penalty junctions");
        assert_eq!(l_total, 8, "field corners plus penalty area corners");
    }
}
