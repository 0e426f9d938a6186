//! Pose extraction: take the highest-weighted sample.

use crate::core::types::pose::RobotPose;

use super::super::localization::sample_set::SampleSet;
use super::PoseCalculator;

/// The simplest strategy: the single best sample wins.
///
/// The comparison is strictly greater-than, so among equally weighted
/// samples the one with the lower index is kept.
#[derive(Debug, Default)]
pub struct BestParticleCalculator;

impl BestParticleCalculator {
    pub fn new() -> Self {
        Self
    }
}

impl PoseCalculator for BestParticleCalculator {
    fn calc_pose(&mut self, samples: &mut SampleSet, pose: &mut RobotPose) {
        let mut best_index = None;
        let mut best_weighting = 0.0f64;
        for (i, sample) in samples.samples().iter().enumerate() {
            if sample.weighting > best_weighting {
                best_weighting = sample.weighting;
                best_index = Some(i);
            }
        }
        match best_index {
            Some(i) => {
                pose.pose = samples.samples()[i].pose();
                pose.validity = best_weighting.min(1.0) as f32;
            }
            // All weightings zero: the pose keeps its previous value and
            // carries no confidence.
            None => pose.validity = 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::pose::Pose2D;

    #[test]
    fn test_highest_weight_wins() {
        let mut samples = SampleSet::new(3);
        for (i, s) in samples.samples_mut().iter_mut().enumerate() {
            s.position.x = i as f32 * 1000.0;
            s.weighting = [0.2, 0.9, 0.5][i];
        }
        let mut pose = RobotPose::default();
        BestParticleCalculator::new().calc_pose(&mut samples, &mut pose);
        assert_eq!(pose.pose.x, 1000.0);
        assert!((pose.validity - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_tie_keeps_lower_index() {
        let mut samples = SampleSet::new(4);
        for (i, s) in samples.samples_mut().iter_mut().enumerate() {
            s.position.x = i as f32 * 1000.0;
            s.weighting = [0.3, 0.8, 0.8, 0.1][i];
        }
        let mut pose = RobotPose::default();
        BestParticleCalculator::new().calc_pose(&mut samples, &mut pose);
        assert_eq!(pose.pose.x, 1000.0, "the earlier of two maxima must win");
    }

    #[test]
    fn test_all_zero_keeps_pose_with_zero_validity() {
        let mut samples = SampleSet::new(5);
        for s in samples.samples_mut() {
            s.weighting = 0.0;
        }
        let mut pose = RobotPose {
            pose: Pose2D::new(123.0, 456.0, 0.5),
            validity: 0.7,
        };
        BestParticleCalculator::new().calc_pose(&mut samples, &mut pose);
        assert_eq!(pose.validity, 0.0);
        assert_eq!(pose.pose.x, 123.0, "pose must keep its last value");
    }
}
