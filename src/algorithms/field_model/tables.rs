//! Precomputed nearest-feature lookup tables.
//!
//! For every grid cell over the carpet, the tables store the coordinates of
//! the closest matching field feature. This turns the per-sample,
//! per-observation correspondence search of the sensor models into a single
//! array lookup.

use crate::core::field::FieldDimensions;
use crate::core::types::pose::Point2D;
use crate::core::types::IntersectionKind;

/// Grid cell edge length in millimeters.
pub const CELL_SIZE: f32 = 24.0;

/// A grid of closest-feature coordinates over the carpet area.
///
/// Coordinates are stored as `i16` millimeters, which comfortably covers
/// any realistic field while keeping the tables compact enough to cache.
#[derive(Debug, Clone, PartialEq)]
pub struct ClosestPointTable {
    x_size: usize,
    y_size: usize,
    points: Vec<[i16; 2]>,
}

impl ClosestPointTable {
    fn empty(x_size: usize, y_size: usize) -> Self {
        Self {
            x_size,
            y_size,
            points: vec![[0, 0]; x_size * y_size],
        }
    }

    /// Grid size derived from the carpet extent.
    fn grid_size(field: &FieldDimensions) -> (usize, usize) {
        let x_size = (2.0 * field.x_carpet_border / CELL_SIZE).ceil() as usize + 1;
        let y_size = (2.0 * field.y_carpet_border / CELL_SIZE).ceil() as usize + 1;
        (x_size, y_size)
    }

    #[inline]
    fn cell_center(&self, x: usize, y: usize) -> Point2D {
        Point2D::new(
            (x as f32 + 0.5 - self.x_size as f32 / 2.0) * CELL_SIZE,
            (y as f32 + 0.5 - self.y_size as f32 / 2.0) * CELL_SIZE,
        )
    }

    /// Build a table of closest points on field lines.
    ///
    /// Only segments of the requested direction class (0: along the field,
    /// 1: across) with at least `min_length` are considered.
    pub fn from_lines(field: &FieldDimensions, direction_class: usize, min_length: f32) -> Self {
        let (x_size, y_size) = Self::grid_size(field);
        let mut table = Self::empty(x_size, y_size);
        let segments: Vec<_> = field
            .field_lines()
            .iter()
            .filter(|s| s.direction_class() == direction_class && s.length() >= min_length)
            .collect();
        for y in 0..y_size {
            for x in 0..x_size {
                let probe = table.cell_center(x, y);
                let mut best = Point2D::default();
                let mut best_dist = f32::MAX;
                for seg in &segments {
                    let p = seg.closest_point_to(&probe);
                    let d = p.distance_squared(&probe);
                    if d < best_dist {
                        best_dist = d;
                        best = p;
                    }
                }
                table.points[y * x_size + x] = [best.x as i16, best.y as i16];
            }
        }
        table
    }

    /// Build a table of closest points from a discrete corner list.
    pub fn from_corners(field: &FieldDimensions, corners: &[Point2D]) -> Self {
        let (x_size, y_size) = Self::grid_size(field);
        let mut table = Self::empty(x_size, y_size);
        for y in 0..y_size {
            for x in 0..x_size {
                let probe = table.cell_center(x, y);
                let best = closest_in_list(corners, &probe);
                table.points[y * x_size + x] = [best.x as i16, best.y as i16];
            }
        }
        table
    }

    /// The closest stored feature for a point (clamped at the grid edge).
    #[inline]
    pub fn closest_point(&self, point: &Point2D) -> Point2D {
        let x = ((point.x / CELL_SIZE) + self.x_size as f32 / 2.0) as isize;
        let y = ((point.y / CELL_SIZE) + self.y_size as f32 / 2.0) as isize;
        let x = x.clamp(0, self.x_size as isize - 1) as usize;
        let y = y.clamp(0, self.y_size as isize - 1) as usize;
        let [px, py] = self.points[y * self.x_size + x];
        Point2D::new(px as f32, py as f32)
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.x_size, self.y_size)
    }

    pub(crate) fn raw(&self) -> &[[i16; 2]] {
        &self.points
    }

    pub(crate) fn from_raw(x_size: usize, y_size: usize, points: Vec<[i16; 2]>) -> Self {
        debug_assert_eq!(points.len(), x_size * y_size);
        Self {
            x_size,
            y_size,
            points,
        }
    }
}

fn closest_in_list(points: &[Point2D], probe: &Point2D) -> Point2D {
    let mut best = Point2D::default();
    let mut best_dist = f32::MAX;
    for p in points {
        let d = p.distance_squared(probe);
        if d < best_dist {
            best_dist = d;
            best = *p;
        }
    }
    best
}

/// The complete set of nearest-feature tables for one field.
///
/// Line tables are split by length class (all lines vs. only lines longer
/// than the crossing length) and by orientation (along/across); corner
/// tables by corner type and orientation. X corners are so few that they
/// are answered directly from the corner list.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldModel {
    line_tables: [[ClosestPointTable; 2]; 2],
    t_corner_tables: [ClosestPointTable; 4],
    l_corner_tables: [ClosestPointTable; 4],
    x_corners: Vec<Point2D>,
    max_crossing_length: f32,
}

impl FieldModel {
    /// Build all tables from the field geometry.
    ///
    /// This is expensive (a full grid scan per table) and is normally only
    /// done when the binary cache is missing or stale.
    pub fn build(field: &FieldDimensions, max_crossing_length: f32) -> Self {
        let line_tables = [
            [
                ClosestPointTable::from_lines(field, 0, 0.0),
                ClosestPointTable::from_lines(field, 1, 0.0),
            ],
            [
                ClosestPointTable::from_lines(field, 0, max_crossing_length),
                ClosestPointTable::from_lines(field, 1, max_crossing_length),
            ],
        ];
        let t_corner_tables = std::array::from_fn(|o| {
            ClosestPointTable::from_corners(field, field.t_corners(o))
        });
        let l_corner_tables = std::array::from_fn(|o| {
            ClosestPointTable::from_corners(field, field.l_corners(o))
        });
        Self {
            line_tables,
            t_corner_tables,
            l_corner_tables,
            x_corners: field.x_corners().to_vec(),
            max_crossing_length,
        }
    }

    pub fn max_crossing_length(&self) -> f32 {
        self.max_crossing_length
    }

    /// The field-line point closest to `point`.
    ///
    /// `neighbor` is another point of the same observed line; it determines
    /// the orientation class. `length_sq` is the squared length of the
    /// observed line and selects the short/long table.
    #[inline]
    pub fn closest_line_point(
        &self,
        point: &Point2D,
        neighbor: &Point2D,
        length_sq: f32,
    ) -> Point2D {
        let long = length_sq > self.max_crossing_length * self.max_crossing_length;
        let diff = *neighbor - *point;
        let across = diff.y.abs() > diff.x.abs();
        self.line_tables[usize::from(long)][usize::from(across)].closest_point(point)
    }

    /// The model corner of the given type and orientation closest to `point`.
    ///
    /// `direction` is the absolute direction of the corner's first axis; it
    /// is quantized to one of four orientation classes (ignored for X).
    #[inline]
    pub fn closest_corner(
        &self,
        point: &Point2D,
        kind: IntersectionKind,
        direction: f32,
    ) -> Point2D {
        match kind {
            IntersectionKind::X => closest_in_list(&self.x_corners, point),
            IntersectionKind::T | IntersectionKind::L => {
                let index = ((direction / std::f32::consts::FRAC_PI_2 + 0.5).floor() as i32 & 3)
                    as usize;
                let table = if kind == IntersectionKind::T {
                    &self.t_corner_tables[index]
                } else {
                    &self.l_corner_tables[index]
                };
                table.closest_point(point)
            }
        }
    }

    pub(crate) fn x_corner_list(&self) -> &[Point2D] {
        &self.x_corners
    }

    pub(crate) fn tables(&self) -> impl Iterator<Item = &ClosestPointTable> {
        self.line_tables
            .iter()
            .flatten()
            .chain(self.t_corner_tables.iter())
            .chain(self.l_corner_tables.iter())
    }

    pub(crate) fn from_parts(
        line_tables: [[ClosestPointTable; 2]; 2],
        t_corner_tables: [ClosestPointTable; 4],
        l_corner_tables: [ClosestPointTable; 4],
        x_corners: Vec<Point2D>,
        max_crossing_length: f32,
    ) -> Self {
        Self {
            line_tables,
            t_corner_tables,
            l_corner_tables,
            x_corners,
            max_crossing_length,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn model() -> (FieldDimensions, FieldModel) {
        let field = FieldDimensions::default();
        let model = FieldModel::build(&field, 300.0);
        (field, model)
    }

    #[test]
    fn test_closest_line_point_near_sideline() {
        let (field, model) = model();
        // A point just inside the left sideline, observed line along x.
        let probe = Point2D::new(500.0, field.y_sideline - 100.0);
        let neighbor = Point2D::new(900.0, field.y_sideline - 100.0);
        let closest = model.closest_line_point(&probe, &neighbor, 400.0 * 400.0);
        assert_relative_eq!(closest.y, field.y_sideline, epsilon = CELL_SIZE * 2.0);
    }

    #[test]
    fn test_closest_line_point_orientation_split() {
        let (_, model) = model();
        // Near the halfway line, an across-oriented observation must match
        // the center line, not a sideline.
        let probe = Point2D::new(150.0, 500.0);
        let neighbor = Point2D::new(150.0, 900.0);
        let closest = model.closest_line_point(&probe, &neighbor, 400.0 * 400.0);
        assert_relative_eq!(closest.x, 0.0, epsilon = CELL_SIZE * 2.0);
    }

    #[test]
    fn test_short_lines_match_circle() {
        let (field, model) = model();
        // A short observed line near the center circle should be matched
        // against circle segments (present only in the short-line table).
        let probe = Point2D::new(field.center_circle_radius + 80.0, 50.0);
        let neighbor = Point2D::new(field.center_circle_radius + 80.0, 250.0);
        let short = model.closest_line_point(&probe, &neighbor, 200.0 * 200.0);
        let dist_from_center = short.norm();
        assert!(
            (dist_from_center - field.center_circle_radius).abs() < 60.0,
            "short line should snap to the circle: {}",
            dist_from_center
        );
    }

    #[test]
    fn test_closest_corner_t_orientation() {
        let (field, model) = model();
        // Near the left sideline center: the T there has its stem pointing
        // into the field (class 3, direction -π/2).
        let probe = Point2D::new(200.0, field.y_sideline - 150.0);
        let corner = model.closest_corner(
            &probe,
            IntersectionKind::T,
            -std::f32::consts::FRAC_PI_2,
        );
        assert_relative_eq!(corner.x, 0.0, epsilon = 1.0);
        assert_relative_eq!(corner.y, field.y_sideline, epsilon = 1.0);
    }

    #[test]
    fn test_closest_corner_x() {
        let (field, model) = model();
        let probe = Point2D::new(100.0, 500.0);
        let corner = model.closest_corner(&probe, IntersectionKind::X, 1.234);
        assert_relative_eq!(corner.x, 0.0, epsilon = 1.0);
        assert_relative_eq!(corner.y, field.center_circle_radius, epsilon = 1.0);
    }

    #[test]
    fn test_lookup_clamps_outside_carpet() {
        let (_, model) = model();
        let far = Point2D::new(50_000.0, 50_000.0);
        // Must not panic; returns the feature stored in the edge cell.
        let p = model.closest_line_point(&far, &Point2D::new(50_400.0, 50_000.0), 1e6);
        assert!(p.norm() < 10_000.0);
    }
}
