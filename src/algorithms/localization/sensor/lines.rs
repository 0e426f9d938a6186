//! Sensor model for perceived field-line points.
//!
//! No analytic correspondence search: the observed endpoint is projected
//! into field coordinates under each sample's pose, the field model answers
//! with the nearest same-orientation line point, and the displacement is
//! scored through the precomputed Gaussian table. The displacement is
//! decomposed into camera-relative near/far axes because depth errors grow
//! much faster than lateral errors.

use serde::{Deserialize, Serialize};

use crate::core::types::pose::Point2D;
use crate::core::types::CameraInfo;

use super::super::gaussian_table::{GaussianTable, NEAR_OFFSET, RELATIVE_SCALE};
use super::super::sample_set::{Sample, SampleSet};
use super::{ObservationKind, SensorContext, SensorModel, SensorUpdate, NO_WEIGHTING};

/// Noise parameter of the line point model, in scaled displacement units
/// (see [`RELATIVE_SCALE`]).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LineNoise {
    #[serde(default = "default_std_dev")]
    pub standard_deviation: f32,
}

fn default_std_dev() -> f32 {
    200.0
}

impl Default for LineNoise {
    fn default() -> Self {
        Self {
            standard_deviation: default_std_dev(),
        }
    }
}

/// The camera's ground-plane frame, shared by the line and corner models.
pub(super) struct CameraFrame {
    pub origin: Point2D,
    pub rot_cos: f32,
    pub rot_sin: f32,
}

impl CameraFrame {
    pub fn new(camera: &CameraInfo) -> Self {
        let (sin, cos) = camera.ground_pose.theta.sin_cos();
        Self {
            origin: camera.ground_pose.position(),
            rot_cos: cos,
            rot_sin: sin,
        }
    }

    /// A robot-frame point expressed in the camera frame.
    #[inline]
    pub fn to_camera(&self, p: &Point2D) -> Point2D {
        let d = *p - self.origin;
        Point2D::new(
            d.x * self.rot_cos + d.y * self.rot_sin,
            d.y * self.rot_cos - d.x * self.rot_sin,
        )
    }

    /// The camera viewing direction in the field frame for one sample:
    /// the unit vector of (sample heading + camera yaw), composed from the
    /// cached vectors without any trigonometry.
    #[inline]
    pub fn camera_direction(&self, sample: &Sample) -> (f32, f32) {
        (
            self.rot_cos * sample.dir_cos - self.rot_sin * sample.dir_sin,
            self.rot_cos * sample.dir_sin + self.rot_sin * sample.dir_cos,
        )
    }

    /// Rotate a field-frame displacement into the camera-relative frame.
    #[inline]
    pub fn displacement_to_camera(diff: &Point2D, cam_dir: (f32, f32)) -> Point2D {
        Point2D::new(
            diff.x * cam_dir.0 + diff.y * cam_dir.1,
            diff.y * cam_dir.0 - diff.x * cam_dir.1,
        )
    }
}

/// Score a field displacement against an observation in camera space.
#[inline]
pub(super) fn displacement_factor(
    gaussian: &GaussianTable,
    diff_cam: &Point2D,
    observation_cam: &Point2D,
) -> f64 {
    let near = gaussian.value(RELATIVE_SCALE * diff_cam.x / (observation_cam.x.abs() + NEAR_OFFSET));
    let far = if observation_cam.x != 0.0 {
        gaussian.value((RELATIVE_SCALE * diff_cam.y / observation_cam.x).abs())
    } else {
        gaussian.value(0.0)
    };
    near * far
}

pub struct LineSensorModel {
    gaussian: GaussianTable,
}

impl LineSensorModel {
    pub fn new(noise: LineNoise) -> Self {
        Self {
            gaussian: GaussianTable::new(noise.standard_deviation),
        }
    }
}

impl SensorModel for LineSensorModel {
    fn kind(&self) -> ObservationKind {
        ObservationKind::Point
    }

    fn compute_weightings(
        &mut self,
        ctx: &SensorContext,
        samples: &SampleSet,
        selected: &[usize],
        weightings: &mut [f64],
    ) -> SensorUpdate {
        let camera = CameraFrame::new(ctx.camera);
        let lines = &ctx.line_percept.lines;

        // Per-observation values that do not depend on the sample.
        struct Prepared {
            point: Point2D,
            other: Point2D,
            length_sq: f32,
            distance: f32,
            bearing: f32,
            point_cam: Point2D,
        }
        let prepared: Vec<Prepared> = selected
            .iter()
            .map(|&index| {
                let line = &lines[index >> 1];
                let (point, other) = if index & 1 == 0 {
                    (line.first, line.last)
                } else {
                    (line.last, line.first)
                };
                Prepared {
                    point,
                    other,
                    length_sq: line.length_squared(),
                    distance: point.norm(),
                    bearing: point.angle(),
                    point_cam: camera.to_camera(&point),
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
                let p_obs = sample.position + sample.rotate_to_field(&obs.point);
                let p_other = sample.position + sample.rotate_to_field(&obs.other);
                let p_model = ctx
                    .field_model
                    .closest_line_point(&p_obs, &p_other, obs.length_sq);
                let diff = p_model - p_obs;
                let diff_cam = CameraFrame::displacement_to_camera(&diff, cam_dir);
                w *= displacement_factor(&self.gaussian, &diff_cam, &obs.point_cam);
            }
            weightings[i] = w;
        }
        result
    }
}
