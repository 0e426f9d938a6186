//! Pose extraction: densest 2×2 block of a fixed position grid.

use crate::core::types::pose::{Pose2D, RobotPose};

use super::super::localization::sample_set::SampleSet;
use super::PoseCalculator;

/// Number of grid cells along each axis.
const GRID: usize = 10;

/// Bins samples with nonzero weighting into a coarse position grid and
/// averages the samples inside the best-supported 2×2 block. More robust
/// against a secondary mode than the overall average, without maintaining
/// any state across cycles.
#[derive(Debug)]
pub struct Binning2DCalculator {
    field_length: f32,
    field_width: f32,
    counts: [[usize; GRID]; GRID],
}

impl Binning2DCalculator {
    pub fn new(field_length: f32, field_width: f32) -> Self {
        Self {
            field_length,
            field_width,
            counts: [[0; GRID]; GRID],
        }
    }

    #[inline]
    fn cell_of(&self, x: f32, y: f32) -> (usize, usize) {
        let cx = ((x / self.field_length + 0.5) * GRID as f32) as isize;
        let cy = ((y / self.field_width + 0.5) * GRID as f32) as isize;
        (
            cx.clamp(0, GRID as isize - 1) as usize,
            cy.clamp(0, GRID as isize - 1) as usize,
        )
    }
}

impl PoseCalculator for Binning2DCalculator {
    fn calc_pose(&mut self, samples: &mut SampleSet, pose: &mut RobotPose) {
        self.counts = [[0; GRID]; GRID];
        let mut x_min = GRID;
        let mut x_max = 0usize;
        let mut y_min = GRID;
        let mut y_max = 0usize;

        for sample in samples.samples() {
            if sample.weighting <= 0.0 {
                continue;
            }
            let (cx, cy) = self.cell_of(sample.position.x, sample.position.y);
            self.counts[cy][cx] += 1;
            x_min = x_min.min(cx);
            x_max = x_max.max(cx);
            y_min = y_min.min(cy);
            y_max = y_max.max(cy);
        }

        if x_min > x_max {
            // No sample had any weight.
            pose.validity = 0.0;
            return;
        }

        // A single occupied row/column cannot host a 2×2 scan window;
        // widen the bounding box by one cell (clamped at the grid edge).
        if x_min == x_max {
            if x_max == GRID - 1 {
                x_min -= 1;
            } else {
                x_max += 1;
            }
        }
        if y_min == y_max {
            if y_max == GRID - 1 {
                y_min -= 1;
            } else {
                y_max += 1;
            }
        }

        let mut best = (0usize, 0usize);
        let mut best_count = 0usize;
        for y in y_min..y_max {
            for x in x_min..x_max {
                let count = self.counts[y][x]
                    + self.counts[y][x + 1]
                    + self.counts[y + 1][x]
                    + self.counts[y + 1][x + 1];
                if count > best_count {
                    best_count = count;
                    best = (x, y);
                }
            }
        }

        if best_count == 0 {
            pose.validity = 0.0;
            return;
        }

        let mut x_sum = 0.0f64;
        let mut y_sum = 0.0f64;
        let mut cos_sum = 0.0f64;
        let mut sin_sum = 0.0f64;
        let mut count = 0usize;
        for sample in samples.samples() {
            if sample.weighting <= 0.0 {
                continue;
            }
            let (cx, cy) = self.cell_of(sample.position.x, sample.position.y);
            if (best.0..=best.0 + 1).contains(&cx) && (best.1..=best.1 + 1).contains(&cy) {
                x_sum += sample.position.x as f64;
                y_sum += sample.position.y as f64;
                cos_sum += sample.dir_cos as f64;
                sin_sum += sample.dir_sin as f64;
                count += 1;
            }
        }
        debug_assert_eq!(count, best_count);

        pose.pose = Pose2D::new(
            (x_sum / count as f64) as f32,
            (y_sum / count as f64) as f32,
            sin_sum.atan2(cos_sum) as f32,
        );
        pose.validity = best_count as f32 / samples.len() as f32;
    }
}
