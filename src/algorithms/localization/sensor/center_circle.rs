//! Sensor model for the perceived center circle.

use serde::{Deserialize, Serialize};

use crate::core::math::distance_as_angle;
use crate::core::types::pose::Point2D;

use super::super::sample_set::SampleSet;
use super::goal_posts::{angle_weighting, distance_weighting};
use super::{ObservationKind, SensorContext, SensorModel, SensorUpdate, NO_WEIGHTING};

/// Noise parameters of the center circle model.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CenterCircleNoise {
    /// Bearing standard deviation in radians.
    #[serde(default = "default_angle_std_dev")]
    pub angle_standard_deviation: f32,
    /// Distance-as-angle standard deviation.
    #[serde(default = "default_distance_std_dev")]
    pub distance_standard_deviation: f32,
}

fn default_angle_std_dev() -> f32 {
    0.2
}
fn default_distance_std_dev() -> f32 {
    0.15
}

impl Default for CenterCircleNoise {
    fn default() -> Self {
        Self {
            angle_standard_deviation: default_angle_std_dev(),
            distance_standard_deviation: default_distance_std_dev(),
        }
    }
}

pub struct CenterCircleSensorModel {
    noise: CenterCircleNoise,
}

impl CenterCircleSensorModel {
    pub fn new(noise: CenterCircleNoise) -> Self {
        Self { noise }
    }
}

impl SensorModel for CenterCircleSensorModel {
    fn kind(&self) -> ObservationKind {
        ObservationKind::CenterCircle
    }

    fn compute_weightings(
        &mut self,
        ctx: &SensorContext,
        samples: &SampleSet,
        _selected: &[usize],
        weightings: &mut [f64],
    ) -> SensorUpdate {
        let circle = &ctx.line_percept.circle;
        let observed_distance = circle.position.norm();
        let observed_angle = circle.position.angle();
        let observed_dist_angle = distance_as_angle(observed_distance, ctx.camera.height);
        // The circle's field position is the origin by definition.
        let circle_position = Point2D::new(0.0, 0.0);

        let mut result = SensorUpdate::Full;
        for (i, sample) in samples.samples().iter().enumerate() {
            let pose = sample.pose();
            // From some viewpoints a white blob at this distance is more
            // plausibly the goal net; those samples get no factor.
            if ctx
                .goal_net
                .point_probably_in_goal_net(&pose, observed_distance, observed_angle)
            {
                weightings[i] = NO_WEIGHTING;
                result = SensorUpdate::Partial;
                continue;
            }
            weightings[i] = angle_weighting(
                observed_angle,
                &circle_position,
                &pose,
                self.noise.angle_standard_deviation,
            ) * distance_weighting(
                observed_dist_angle,
                &circle_position,
                &pose,
                ctx.camera.height,
                self.noise.distance_standard_deviation,
            );
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::field_model;
    use crate::algorithms::localization::sample_set::Sample;
    use crate::core::field::FieldDimensions;
    use crate::core::types::pose::Pose2D;
    use crate::core::types::{CameraInfo, CenterCirclePercept, FrameInfo, GoalPercept, LinePercept};

    #[test]
    fn test_circle_discriminates_position() {
        let field = FieldDimensions::default();
        let (fm, net) = field_model::build(&field, 300.0);
        let truth = Pose2D::new(-1200.0, 0.0, 0.0);
        let wrong = Pose2D::new(-2500.0, 1500.0, -1.0);

        let mut line_percept = LinePercept::default();
        line_percept.circle = CenterCirclePercept {
            position: truth.inverse().transform_point(&Point2D::new(0.0, 0.0)),
            found: true,
        };
        let frame = FrameInfo { time: 77 };
        let goal_percept = GoalPercept::default();
        let camera = CameraInfo::default();
        let ctx = SensorContext {
            frame: &frame,
            field: &field,
            field_model: &fm,
            goal_net: &net,
            camera: &camera,
            goal_percept: &goal_percept,
            line_percept: &line_percept,
        };

        let mut set = SampleSet::new(2);
        set.samples_mut()[0] = Sample::from_pose(&truth);
        set.samples_mut()[1] = Sample::from_pose(&wrong);

        let mut model = CenterCircleSensorModel::new(CenterCircleNoise::default());
        let mut weightings = vec![0.0; 2];
        let result = model.compute_weightings(&ctx, &set, &[0], &mut weightings);

        assert_ne!(result, SensorUpdate::None);
        assert!(weightings[0] > 0.9, "true pose factor {}", weightings[0]);
        assert!(
            weightings[1] == NO_WEIGHTING || weightings[1] < weightings[0],
            "wrong pose must not outscore truth: {:?}",
            weightings
        );
    }

    #[test]
    fn test_net_confusable_viewpoint_is_partial() {
        let field = FieldDimensions::default();
        let (fm, net) = field_model::build(&field, 300.0);
        // A sample deep in its own half looking at the opponent goal would
        // see the net exactly where this (fake) far circle is claimed.
        let net_gazer = Pose2D::new(field.x_goalpost - 600.0, 0.0, 0.0);

        let mut line_percept = LinePercept::default();
        line_percept.circle = CenterCirclePercept {
            position: Point2D::new(2500.0, 0.0),
            found: true,
        };
        let frame = FrameInfo { time: 78 };
        let goal_percept = GoalPercept::default();
        let camera = CameraInfo::default();
        let ctx = SensorContext {
            frame: &frame,
            field: &field,
            field_model: &fm,
            goal_net: &net,
            camera: &camera,
            goal_percept: &goal_percept,
            line_percept: &line_percept,
        };

        let mut set = SampleSet::new(1);
        set.samples_mut()[0] = Sample::from_pose(&net_gazer);
        let mut model = CenterCircleSensorModel::new(CenterCircleNoise::default());
        let mut weightings = vec![0.0; 1];
        let result = model.compute_weightings(&ctx, &set, &[0], &mut weightings);
        assert_eq!(result, SensorUpdate::Partial);
        assert_eq!(weightings[0], NO_WEIGHTING);
    }
}
