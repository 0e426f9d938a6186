//! Sensor model for perceived line intersections.
//!
//! Works like the line point model, but matches against the corner tables
//! of the field model: the observed intersection is projected under the
//! sample pose and compared to the nearest model corner of the same type
//! and orientation.

use serde::{Deserialize, Serialize};

use crate::core::types::pose::Point2D;
use crate::core::types::IntersectionKind;

use super::super::gaussian_table::GaussianTable;
use super::super::sample_set::SampleSet;
use super::lines::{displacement_factor, CameraFrame};
use super::{ObservationKind, SensorContext, SensorModel, SensorUpdate, NO_WEIGHTING};

/// Noise parameter of the corner model, in scaled displacement units.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CornerNoise {
    #[serde(default = "default_std_dev")]
    pub standard_deviation: f32,
}

fn default_std_dev() -> f32 {
    250.0
}

impl Default for CornerNoise {
    fn default() -> Self {
        Self {
            standard_deviation: default_std_dev(),
        }
    }
}

pub struct CornersSensorModel {
    gaussian: GaussianTable,
}

impl CornersSensorModel {
    pub fn new(noise: CornerNoise) -> Self {
        Self {
            gaussian: GaussianTable::new(noise.standard_deviation),
        }
    }
}

impl SensorModel for CornersSensorModel {
    fn kind(&self) -> ObservationKind {
        ObservationKind::Corner
    }

    fn compute_weightings(
        &mut self,
        ctx: &SensorContext,
        samples: &SampleSet,
        selected: &[usize],
        weightings: &mut [f64],
    ) -> SensorUpdate {
        let camera = CameraFrame::new(ctx.camera);
        let intersections = &ctx.line_percept.intersections;

        struct Prepared {
            position: Point2D,
            kind: IntersectionKind,
            distance: f32,
            bearing: f32,
            direction: f32,
            position_cam: Point2D,
        }
        let prepared: Vec<Prepared> = selected
            .iter()
            .map(|&index| {
                let intersection = &intersections[index];
                Prepared {
                    position: intersection.position,
                    kind: intersection.kind,
                    distance: intersection.position.norm(),
                    bearing: intersection.position.angle(),
                    direction: intersection.relative_direction(),
                    position_cam: camera.to_camera(&intersection.position),
                }
            })
            .collect();

        let mut result = SensorUpdate::Full;
        'samples: for (i, sample) in samples.samples().iter().enumerate() {
            let cam_dir = camera.camera_direction(sample);
            let mut w = 1.0f64;
            for obs in &prepared {
                let pose = sample.pose();
                if ctx
                    .goal_net
                    .point_probably_in_goal_net(&pose, obs.distance, obs.bearing)
                {
                    weightings[i] = NO_WEIGHTING;
                    result = SensorUpdate::Partial;
                    continue 'samples;
                }
                let p_obs = sample.position + sample.rotate_to_field(&obs.position);
                let p_model =
                    ctx.field_model
                        .closest_corner(&p_obs, obs.kind, sample.angle + obs.direction);
                let diff = p_model - p_obs;
                let diff_cam = CameraFrame::displacement_to_camera(&diff, cam_dir);
                w *= displacement_factor(&self.gaussian, &diff_cam, &obs.position_cam);
            }
            weightings[i] = w;
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
    use crate::core::types::{CameraInfo, FrameInfo, GoalPercept, Intersection, LinePercept};

    #[test]
    fn test_corner_match_prefers_true_pose() {
        let field = FieldDimensions::default();
        let (fm, net) = field_model::build(&field, 300.0);
        // Robot near the left sideline T junction, looking at it.
        let truth = Pose2D::new(0.0, 1200.0, std::f32::consts::FRAC_PI_2);
        let corner_field = Point2D::new(0.0, field.y_sideline);
        let inv = truth.inverse();
        let rel = inv.transform_point(&corner_field);
        // The stem points into the field (global -y); relative to the robot
        // frame that is behind it.
        let stem_global = Point2D::new(0.0, -1.0);
        let (sin, cos) = truth.theta.sin_cos();
        let stem_rel = Point2D::new(
            stem_global.x * cos + stem_global.y * sin,
            stem_global.y * cos - stem_global.x * sin,
        );

        let mut line_percept = LinePercept::default();
        line_percept.intersections.push(Intersection {
            position: rel,
            kind: IntersectionKind::T,
            dir1: stem_rel,
            dir2: Point2D::new(-stem_rel.y, stem_rel.x),
        });

        let frame = FrameInfo { time: 3 };
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
        set.samples_mut()[1] = Sample::from_pose(&Pose2D::new(1400.0, 600.0, 2.2));

        let mut model = CornersSensorModel::new(CornerNoise::default());
        let mut weightings = vec![0.0; 2];
        let result = model.compute_weightings(&ctx, &set, &[0], &mut weightings);
        assert_ne!(result, SensorUpdate::None);
        assert!(
            weightings[0] >= weightings[1],
            "true pose {} vs wrong pose {}",
            weightings[0],
            weightings[1]
        );
        assert!(weightings[0] > 0.5, "clean corner match scored {}", weightings[0]);
    }
}
