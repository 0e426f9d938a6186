//! Sensor model for perceived goal posts.
//!
//! Goal posts have known field positions, so every sample gets a definite
//! factor from its bearing and distance errors. For a post of unknown side
//! the likelihood is the maximum over both candidate positions; taking the
//! best match is an explicit tie-break, averaging would punish both sides.

use serde::{Deserialize, Serialize};

use crate::core::math::{distance_as_angle, gaussian_factor};
use crate::core::types::pose::Point2D;
use crate::core::types::{DistanceMethod, GoalPercept, GoalPostSide};

use super::super::sample_set::SampleSet;
use super::{ObservationKind, SensorContext, SensorModel, SensorUpdate};

/// Noise parameters of the goal post model.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GoalPostNoise {
    /// Bearing standard deviation in radians.
    #[serde(default = "default_angle_std_dev")]
    pub angle_standard_deviation: f32,
    /// Distance-as-angle standard deviation for bearing-based estimates.
    #[serde(default = "default_bearing_distance_std_dev")]
    pub bearing_distance_standard_deviation: f32,
    /// Distance-as-angle standard deviation for size-based estimates,
    /// which degrade differently with distance.
    #[serde(default = "default_size_distance_std_dev")]
    pub size_distance_standard_deviation: f32,
}

fn default_angle_std_dev() -> f32 {
    0.2
}
fn default_bearing_distance_std_dev() -> f32 {
    0.15
}
fn default_size_distance_std_dev() -> f32 {
    0.2
}

impl Default for GoalPostNoise {
    fn default() -> Self {
        Self {
            angle_standard_deviation: default_angle_std_dev(),
            bearing_distance_standard_deviation: default_bearing_distance_std_dev(),
            size_distance_standard_deviation: default_size_distance_std_dev(),
        }
    }
}

pub struct GoalPostsSensorModel {
    noise: GoalPostNoise,
}

impl GoalPostsSensorModel {
    pub fn new(noise: GoalPostNoise) -> Self {
        Self { noise }
    }

    fn distance_std_dev(&self, method: DistanceMethod) -> f32 {
        match method {
            DistanceMethod::SizeBased => self.noise.size_distance_standard_deviation,
            _ => self.noise.bearing_distance_standard_deviation,
        }
    }
}

impl SensorModel for GoalPostsSensorModel {
    fn kind(&self) -> ObservationKind {
        ObservationKind::GoalPost
    }

    fn compute_weightings(
        &mut self,
        ctx: &SensorContext,
        samples: &SampleSet,
        selected: &[usize],
        weightings: &mut [f64],
    ) -> SensorUpdate {
        weightings[..samples.len()].fill(1.0);
        let cam_height = ctx.camera.height;

        for &index in selected {
            if index < GoalPercept::NUM_POSTS {
                // Side-known post: one candidate position.
                let side = match index {
                    0 => GoalPostSide::LeftOpponent,
                    1 => GoalPostSide::RightOpponent,
                    2 => GoalPostSide::LeftOwn,
                    _ => GoalPostSide::RightOwn,
                };
                let post = &ctx.goal_percept.posts[index];
                let candidate = ctx.field.goal_post_position(side);
                let observed_angle = post.position_on_field.angle();
                let observed_dist_angle =
                    distance_as_angle(post.position_on_field.norm(), cam_height);
                let dist_std_dev = self.distance_std_dev(post.distance_method);
                let use_distance = post.distance_method != DistanceMethod::TooClose;

                for (i, sample) in samples.samples().iter().enumerate() {
                    let pose = sample.pose();
                    let mut w = angle_weighting(
                        observed_angle,
                        &candidate,
                        &pose,
                        self.noise.angle_standard_deviation,
                    );
                    if use_distance {
                        w *= distance_weighting(
                            observed_dist_angle,
                            &candidate,
                            &pose,
                            cam_height,
                            dist_std_dev,
                        );
                    }
                    weightings[i] *= w;
                }
            } else {
                // Unknown-side post: take the best of both candidates.
                let goal_index = index - GoalPercept::NUM_POSTS;
                let post = &ctx.goal_percept.unknown_posts[goal_index];
                let candidates = ctx.field.unknown_post_candidates(goal_index);
                let observed_angle = post.position_on_field.angle();
                let observed_dist_angle =
                    distance_as_angle(post.position_on_field.norm(), cam_height);
                let dist_std_dev = self.distance_std_dev(post.distance_method);
                let use_distance = post.distance_method != DistanceMethod::TooClose;

                for (i, sample) in samples.samples().iter().enumerate() {
                    let pose = sample.pose();
                    let mut best = 0.0f64;
                    for candidate in &candidates {
                        let mut w = angle_weighting(
                            observed_angle,
                            candidate,
                            &pose,
                            self.noise.angle_standard_deviation,
                        );
                        if use_distance {
                            w *= distance_weighting(
                                observed_dist_angle,
                                candidate,
                                &pose,
                                cam_height,
                                dist_std_dev,
                            );
                        }
                        if w > best {
                            best = w;
                        }
                    }
                    weightings[i] *= best;
                }
            }
        }
        SensorUpdate::Full
    }
}

/// Factor for the bearing error toward a model position, in (0, 1].
pub(super) fn angle_weighting(
    observed_angle: f32,
    model_position: &Point2D,
    pose: &crate::core::types::pose::Pose2D,
    std_dev: f32,
) -> f64 {
    let model_angle = pose.angle_to(model_position);
    gaussian_factor(
        crate::core::math::angle_diff(observed_angle, model_angle),
        std_dev,
    )
}

/// Factor for the distance error, evaluated in distance-as-angle space.
pub(super) fn distance_weighting(
    observed_distance_angle: f32,
    model_position: &Point2D,
    pose: &crate::core::types::pose::Pose2D,
    camera_height: f32,
    std_dev: f32,
) -> f64 {
    let model_distance = pose.position().distance(model_position);
    let model_distance_angle = distance_as_angle(model_distance, camera_height);
    gaussian_factor(model_distance_angle - observed_distance_angle, std_dev)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::field_model;
    use crate::core::field::FieldDimensions;
    use crate::core::types::pose::Pose2D;
    use crate::core::types::{CameraInfo, FrameInfo, GoalPostPercept, LinePercept};

    struct Fixture {
        field: FieldDimensions,
        field_model: crate::algorithms::field_model::FieldModel,
        goal_net: crate::algorithms::field_model::GoalNetTable,
    }

    impl Fixture {
        fn new() -> Self {
            let field = FieldDimensions::default();
            let (fm, net) = field_model::build(&field, 300.0);
            Self {
                field,
                field_model: fm,
                goal_net: net,
            }
        }
    }

    fn samples_at(poses: &[Pose2D]) -> SampleSet {
        let mut set = SampleSet::new(poses.len());
        for (s, p) in set.samples_mut().iter_mut().zip(poses) {
            *s = crate::algorithms::localization::sample_set::Sample::from_pose(p);
        }
        set
    }

    fn percept_seeing_post(field: &FieldDimensions, robot: &Pose2D, time: u64) -> GoalPercept {
        let mut percept = GoalPercept::default();
        let real = field.goal_post_position(GoalPostSide::LeftOpponent);
        percept.posts[0] = GoalPostPercept {
            position_on_field: robot.inverse().transform_point(&real),
            distance_method: DistanceMethod::BearingBased,
            last_seen: time,
        };
        percept
    }

    #[test]
    fn test_true_pose_outweighs_wrong_pose() {
        let fx = Fixture::new();
        let truth = Pose2D::new(1500.0, 0.0, 0.0);
        let wrong = Pose2D::new(-1500.0, 500.0, 1.0);
        let samples = samples_at(&[truth, wrong]);
        let frame = FrameInfo { time: 1000 };
        let goal_percept = percept_seeing_post(&fx.field, &truth, frame.time);
        let line_percept = LinePercept::default();
        let camera = CameraInfo::default();
        let ctx = SensorContext {
            frame: &frame,
            field: &fx.field,
            field_model: &fx.field_model,
            goal_net: &fx.goal_net,
            camera: &camera,
            goal_percept: &goal_percept,
            line_percept: &line_percept,
        };

        let mut model = GoalPostsSensorModel::new(GoalPostNoise::default());
        let mut weightings = vec![0.0; 2];
        let result = model.compute_weightings(&ctx, &samples, &[0], &mut weightings);
        assert_eq!(result, SensorUpdate::Full);
        assert!(
            weightings[0] > weightings[1] * 10.0,
            "truth {} vs wrong {}",
            weightings[0],
            weightings[1]
        );
        assert!(weightings[0] > 0.9, "perfect match should be ~1: {}", weightings[0]);
    }

    #[test]
    fn test_unknown_post_takes_best_candidate() {
        let fx = Fixture::new();
        // Robot at center looking at the opponent's left post; a sample
        // mirrored to see the right post equally well must score the same
        // through the max-over-candidates rule.
        let truth = Pose2D::new(0.0, 0.0, 0.0);
        let mirrored = Pose2D::new(0.0, 0.0, 0.0);
        let real_left = fx.field.goal_post_position(GoalPostSide::LeftOpponent);

        let mut goal_percept = GoalPercept::default();
        goal_percept.unknown_posts[0] = GoalPostPercept {
            position_on_field: truth.inverse().transform_point(&real_left),
            distance_method: DistanceMethod::BearingBased,
            last_seen: 500,
        };
        let frame = FrameInfo { time: 500 };
        let line_percept = LinePercept::default();
        let camera = CameraInfo::default();
        let ctx = SensorContext {
            frame: &frame,
            field: &fx.field,
            field_model: &fx.field_model,
            goal_net: &fx.goal_net,
            camera: &camera,
            goal_percept: &goal_percept,
            line_percept: &line_percept,
        };

        let samples = samples_at(&[truth, mirrored]);
        let mut model = GoalPostsSensorModel::new(GoalPostNoise::default());
        let mut weightings = vec![0.0; 2];
        model.compute_weightings(&ctx, &samples, &[GoalPercept::NUM_POSTS], &mut weightings);
        assert!(weightings[0] > 0.9, "best candidate should match: {}", weightings[0]);
    }

    #[test]
    fn test_too_close_post_skips_distance() {
        let fx = Fixture::new();
        let truth = Pose2D::new(2500.0, 700.0, 0.0);
        let frame = FrameInfo { time: 42 };
        let mut goal_percept = percept_seeing_post(&fx.field, &truth, frame.time);
        goal_percept.posts[0].distance_method = DistanceMethod::TooClose;
        // Corrupt the perceived distance; with TooClose only bearing counts.
        let bearing = goal_percept.posts[0].position_on_field.angle();
        goal_percept.posts[0].position_on_field =
            Point2D::new(9000.0 * bearing.cos(), 9000.0 * bearing.sin());

        let line_percept = LinePercept::default();
        let camera = CameraInfo::default();
        let ctx = SensorContext {
            frame: &frame,
            field: &fx.field,
            field_model: &fx.field_model,
            goal_net: &fx.goal_net,
            camera: &camera,
            goal_percept: &goal_percept,
            line_percept: &line_percept,
        };
        let samples = samples_at(&[truth]);
        let mut model = GoalPostsSensorModel::new(GoalPostNoise::default());
        let mut weightings = vec![0.0; 1];
        model.compute_weightings(&ctx, &samples, &[0], &mut weightings);
        assert!(
            weightings[0] > 0.9,
            "bearing-only match should stay high: {}",
            weightings[0]
        );
    }
}
