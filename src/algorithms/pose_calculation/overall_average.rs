//! Pose extraction: weighted mean over the whole population.

use crate::core::types::pose::{Pose2D, RobotPose};

use super::super::localization::sample_set::SampleSet;
use super::PoseCalculator;

/// Weighted mean position and circular-mean heading over all samples with
/// nonzero weighting. Unimodal by construction; cheap and smooth while the
/// population tracks a single mode.
#[derive(Debug, Default)]
pub struct OverallAverageCalculator;

impl OverallAverageCalculator {
    pub fn new() -> Self {
        Self
    }
}

impl PoseCalculator for OverallAverageCalculator {
    fn calc_pose(&mut self, samples: &mut SampleSet, pose: &mut RobotPose) {
        let mut x_sum = 0.0f64;
        let mut y_sum = 0.0f64;
        let mut cos_sum = 0.0f64;
        let mut sin_sum = 0.0f64;
        let mut weight_sum = 0.0f64;
        for sample in samples.samples() {
            let w = sample.weighting;
            if w <= 0.0 {
                continue;
            }
            x_sum += w * sample.position.x as f64;
            y_sum += w * sample.position.y as f64;
            cos_sum += w * sample.dir_cos as f64;
            sin_sum += w * sample.dir_sin as f64;
            weight_sum += w;
        }
        if weight_sum > 0.0 {
            pose.pose = Pose2D::new(
                (x_sum / weight_sum) as f32,
                (y_sum / weight_sum) as f32,
                sin_sum.atan2(cos_sum) as f32,
            );
            pose.validity = (weight_sum / samples.len() as f64).min(1.0) as f32;
        } else {
            // Averaging over nothing: zeroed pose, no confidence.
            pose.pose = Pose2D::identity();
            pose.validity = 0.0;
        }
    }
}
