//! Odometry-based motion update.
//!
//! Walking robots slip most along their direction of travel, so the
//! translational error bound is anisotropic: one coefficient along the
//! motion direction, a smaller one perpendicular to it. The rotational
//! bound is the maximum of a constant floor and terms proportional to the
//! distance walked and the angle turned.

use serde::{Deserialize, Serialize};

use crate::core::field::FieldDimensions;
use crate::core::rng::Rng;
use crate::core::types::pose::{Point2D, Pose2D};

use super::sample_set::Sample;

/// Noise coefficients of the motion model.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MotionModelConfig {
    /// Constant translational noise floor in millimeters.
    #[serde(default = "default_translation_noise")]
    pub translation_noise: f32,

    /// Constant rotational noise floor in radians.
    #[serde(default = "default_rotation_noise")]
    pub rotation_noise: f32,

    /// Rotational error per millimeter walked (rad/mm).
    #[serde(default = "default_moved_dist_weight")]
    pub moved_dist_weight: f32,

    /// Rotational error per radian turned (rad/rad).
    #[serde(default = "default_moved_angle_weight")]
    pub moved_angle_weight: f32,

    /// Translational error along the motion direction (mm/mm).
    #[serde(default = "default_major_dir_trans_weight")]
    pub major_dir_trans_weight: f32,

    /// Translational error perpendicular to the motion direction (mm/mm).
    #[serde(default = "default_minor_dir_trans_weight")]
    pub minor_dir_trans_weight: f32,
}

fn default_translation_noise() -> f32 {
    50.0
}
fn default_rotation_noise() -> f32 {
    0.06
}
fn default_moved_dist_weight() -> f32 {
    0.002
}
fn default_moved_angle_weight() -> f32 {
    0.2
}
fn default_major_dir_trans_weight() -> f32 {
    0.1
}
fn default_minor_dir_trans_weight() -> f32 {
    0.025
}

impl Default for MotionModelConfig {
    fn default() -> Self {
        Self {
            translation_noise: default_translation_noise(),
            rotation_noise: default_rotation_noise(),
            moved_dist_weight: default_moved_dist_weight(),
            moved_angle_weight: default_moved_angle_weight(),
            major_dir_trans_weight: default_major_dir_trans_weight(),
            minor_dir_trans_weight: default_minor_dir_trans_weight(),
        }
    }
}

/// The motion update: propagate every sample by the odometry offset plus
/// sample-relative noise, then clip to the carpet.
#[derive(Debug, Clone)]
pub struct MotionModel {
    config: MotionModelConfig,
}

impl MotionModel {
    pub fn new(config: MotionModelConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MotionModelConfig {
        &self.config
    }

    /// Apply one odometry offset to the whole population.
    ///
    /// `with_noise` is false when the previous cycle had no sensor update;
    /// without observations to ground them, spreading the samples further
    /// only loses information.
    pub fn update<R: Rng>(
        &self,
        samples: &mut [Sample],
        odometry_offset: &Pose2D,
        with_noise: bool,
        field: &FieldDimensions,
        rng: &mut R,
    ) {
        let trans_noise = if with_noise {
            self.config.translation_noise
        } else {
            0.0
        };
        let rot_noise = if with_noise {
            self.config.rotation_noise
        } else {
            0.0
        };

        let dx = odometry_offset.x;
        let dy = odometry_offset.y;
        let dist = (dx * dx + dy * dy).sqrt();
        let turned = odometry_offset.theta.abs();

        // Error bounds are identical for all samples this cycle.
        let rot_error = rot_noise
            .max(dist * self.config.moved_dist_weight)
            .max(turned * self.config.moved_angle_weight);
        let x_error = trans_noise
            .max((dx * self.config.major_dir_trans_weight).abs())
            .max((dy * self.config.minor_dir_trans_weight).abs());
        let y_error = trans_noise
            .max((dy * self.config.major_dir_trans_weight).abs())
            .max((dx * self.config.minor_dir_trans_weight).abs());

        for sample in samples.iter_mut() {
            // Uniform draw inside the anisotropic bound, in odometry frame.
            let offset = Point2D::new(
                dx - x_error + 2.0 * x_error * rng.gen_f32(),
                dy - y_error + 2.0 * y_error * rng.gen_f32(),
            );
            // The offset is relative to the sample's own heading: noise
            // direction follows the hypothesis, not the world frame.
            let world_offset = sample.rotate_to_field(&offset);
            sample.position = sample.position + world_offset;
            sample.set_angle(sample.angle + odometry_offset.theta + rng.gen_signed() * rot_error);
            field.clip_to_carpet(&mut sample.position);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::localization::sample_set::SampleSet;
    use crate::core::rng::SimpleRng;

    fn set_at(pose: Pose2D, n: usize) -> SampleSet {
        let mut set = SampleSet::new(n);
        for s in set.samples_mut() {
            *s = Sample::from_pose(&pose);
        }
        set
    }

    #[test]
    fn test_no_motion_no_noise_is_identity() {
        let field = FieldDimensions::default();
        let model = MotionModel::new(MotionModelConfig::default());
        let mut set = set_at(Pose2D::new(1000.0, 500.0, 0.3), 20);
        let mut rng = SimpleRng::new(1);

        model.update(
            set.samples_mut(),
            &Pose2D::identity(),
            false,
            &field,
            &mut rng,
        );
        for s in set.samples() {
            assert!((s.position.x - 1000.0).abs() < 1e-3);
            assert!((s.position.y - 500.0).abs() < 1e-3);
            assert!((s.angle - 0.3).abs() < 1e-6);
        }
    }

    #[test]
    fn test_forward_motion_moves_mean() {
        let field = FieldDimensions::default();
        let model = MotionModel::new(MotionModelConfig::default());
        let mut set = set_at(Pose2D::identity(), 500);
        let mut rng = SimpleRng::new(42);

        model.update(
            set.samples_mut(),
            &Pose2D::new(200.0, 0.0, 0.0),
            true,
            &field,
            &mut rng,
        );
        let mean_x: f32 =
            set.samples().iter().map(|s| s.position.x).sum::<f32>() / set.len() as f32;
        assert!(
            (mean_x - 200.0).abs() < 30.0,
            "mean should follow odometry: {}",
            mean_x
        );
    }

    #[test]
    fn test_noise_is_sample_relative() {
        let field = FieldDimensions::default();
        let model = MotionModel::new(MotionModelConfig::default());
        // Sample facing +y: a forward odometry step must move it along +y.
        let mut set = set_at(Pose2D::new(0.0, 0.0, std::f32::consts::FRAC_PI_2), 200);
        let mut rng = SimpleRng::new(7);

        model.update(
            set.samples_mut(),
            &Pose2D::new(300.0, 0.0, 0.0),
            true,
            &field,
            &mut rng,
        );
        let mean_y: f32 =
            set.samples().iter().map(|s| s.position.y).sum::<f32>() / set.len() as f32;
        assert!(mean_y > 200.0, "motion must be applied in the sample frame");
    }

    #[test]
    fn test_positions_stay_on_carpet() {
        let field = FieldDimensions::default();
        let model = MotionModel::new(MotionModelConfig::default());
        // Start right at the carpet corner and walk outward.
        let mut set = set_at(
            Pose2D::new(field.x_carpet_border, field.y_carpet_border, 0.0),
            100,
        );
        let mut rng = SimpleRng::new(3);

        for _ in 0..10 {
            model.update(
                set.samples_mut(),
                &Pose2D::new(300.0, 100.0, 0.0),
                true,
                &field,
                &mut rng,
            );
            for s in set.samples() {
                assert!(
                    field.is_inside_carpet(&s.position),
                    "sample left the carpet: ({}, {})",
                    s.position.x,
                    s.position.y
                );
            }
        }
    }

    #[test]
    fn test_heading_vector_stays_consistent() {
        let field = FieldDimensions::default();
        let model = MotionModel::new(MotionModelConfig::default());
        let mut set = set_at(Pose2D::identity(), 50);
        let mut rng = SimpleRng::new(11);

        model.update(
            set.samples_mut(),
            &Pose2D::new(100.0, 50.0, 0.4),
            true,
            &field,
            &mut rng,
        );
        for s in set.samples() {
            assert!((s.dir_cos - s.angle.cos()).abs() < 1e-6);
            assert!((s.dir_sin - s.angle.sin()).abs() < 1e-6);
        }
    }
}
