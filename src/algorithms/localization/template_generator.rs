//! Pose templates from unambiguous landmark geometry.
//!
//! Goal posts pin the robot down: a full goal fixes the pose up to
//! measurement noise, a single post constrains it to a circle. Recent
//! sightings are buffered for a few seconds so the resampling step can
//! inject fresh, observation-backed pose guesses even in frames without a
//! post in view.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::core::field::FieldDimensions;
use crate::core::rng::Rng;
use crate::core::types::pose::{Point2D, Pose2D};
use crate::core::types::{DistanceMethod, FrameInfo, GoalPercept, GoalPostSide};

/// Parameters of template generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateConfig {
    /// Standard deviation (mm) of the distance inflation applied when
    /// turning a buffered post sighting into a pose.
    #[serde(default = "default_distance_std_dev")]
    pub distance_standard_deviation: f32,

    /// When set, generated templates are restricted to this window,
    /// e.g. the own half during kick-off placement.
    #[serde(default)]
    pub clip_generation: bool,
    #[serde(default = "default_clip_range_x")]
    pub clip_range_x: [f32; 2],
    #[serde(default = "default_clip_range_y")]
    pub clip_range_y: [f32; 2],
}

fn default_distance_std_dev() -> f32 {
    150.0
}
fn default_clip_range_x() -> [f32; 2] {
    [-3000.0, 3000.0]
}
fn default_clip_range_y() -> [f32; 2] {
    [-2000.0, 2000.0]
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            distance_standard_deviation: default_distance_std_dev(),
            clip_generation: false,
            clip_range_x: default_clip_range_x(),
            clip_range_y: default_clip_range_y(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct FullGoal {
    seen_left: Point2D,
    real_left: Point2D,
    seen_right: Point2D,
    real_right: Point2D,
    timestamp: u64,
    odometry: Pose2D,
}

#[derive(Debug, Clone, Copy)]
struct KnownPost {
    seen: Point2D,
    real: Point2D,
    timestamp: u64,
    odometry: Pose2D,
}

#[derive(Debug, Clone, Copy)]
struct UnknownPost {
    seen: Point2D,
    real: [Point2D; 2],
    timestamp: u64,
    odometry: Pose2D,
}

/// How many sightings of each kind are buffered.
const MAX_PERCEPTS: usize = 10;
/// Sightings older than this are discarded (milliseconds).
const MAX_TIME_TO_KEEP: u64 = 5000;

/// Buffers landmark sightings and converts them into pose templates.
pub struct SampleTemplateGenerator {
    config: TemplateConfig,
    full_goals: VecDeque<FullGoal>,
    known_posts: VecDeque<KnownPost>,
    unknown_posts: VecDeque<UnknownPost>,
}

impl SampleTemplateGenerator {
    pub fn new(config: TemplateConfig) -> Self {
        Self {
            config,
            full_goals: VecDeque::with_capacity(MAX_PERCEPTS),
            known_posts: VecDeque::with_capacity(MAX_PERCEPTS),
            unknown_posts: VecDeque::with_capacity(MAX_PERCEPTS),
        }
    }

    pub fn clear(&mut self) {
        self.full_goals.clear();
        self.known_posts.clear();
        self.unknown_posts.clear();
    }

    /// Whether any buffered sighting can back a template right now.
    pub fn templates_available(&self) -> bool {
        !self.full_goals.is_empty()
            || !self.known_posts.is_empty()
            || !self.unknown_posts.is_empty()
    }

    /// Record this frame's goal sightings and expire stale ones.
    pub fn buffer_percepts<R: Rng>(
        &mut self,
        frame: &FrameInfo,
        odometry: &Pose2D,
        goal_percept: &GoalPercept,
        field: &FieldDimensions,
        rng: &mut R,
    ) {
        use GoalPostSide::*;
        let seen = |side: GoalPostSide| {
            let post = &goal_percept.posts[side as usize];
            post.last_seen == frame.time && post.distance_method != DistanceMethod::TooClose
        };

        let pair = if seen(LeftOpponent) && seen(RightOpponent) {
            Some((LeftOpponent, RightOpponent))
        } else if seen(LeftOwn) && seen(RightOwn) {
            Some((LeftOwn, RightOwn))
        } else {
            None
        };

        if let Some((left, right)) = pair {
            let goal = FullGoal {
                seen_left: goal_percept.posts[left as usize].position_on_field,
                real_left: field.goal_post_position(left),
                seen_right: goal_percept.posts[right as usize].position_on_field,
                real_right: field.goal_post_position(right),
                timestamp: frame.time,
                odometry: *odometry,
            };
            // Only buffer geometry a template can actually be built from.
            if self
                .template_from_full_goal(&goal, odometry, field, rng)
                .is_some()
            {
                push_bounded(&mut self.full_goals, goal);
            }
        } else {
            for side in [LeftOpponent, RightOpponent, LeftOwn, RightOwn] {
                if seen(side) {
                    push_bounded(
                        &mut self.known_posts,
                        KnownPost {
                            seen: goal_percept.posts[side as usize].position_on_field,
                            real: field.goal_post_position(side),
                            timestamp: frame.time,
                            odometry: *odometry,
                        },
                    );
                }
            }
        }

        for goal_index in 0..GoalPercept::NUM_UNKNOWN_POSTS {
            let post = &goal_percept.unknown_posts[goal_index];
            if post.last_seen == frame.time && post.distance_method != DistanceMethod::TooClose {
                push_bounded(
                    &mut self.unknown_posts,
                    UnknownPost {
                        seen: post.position_on_field,
                        real: field.unknown_post_candidates(goal_index),
                        timestamp: frame.time,
                        odometry: *odometry,
                    },
                );
            }
        }

        expire(&mut self.full_goals, frame, |g| g.timestamp);
        expire(&mut self.known_posts, frame, |p| p.timestamp);
        expire(&mut self.unknown_posts, frame, |p| p.timestamp);
    }

    /// Produce one fresh pose template.
    ///
    /// Full goals are preferred; single posts constrain less and unknown
    /// posts have to guess a side. When nothing works out, a random pose
    /// (within the clip window, if configured) is returned.
    pub fn new_template<R: Rng>(
        &self,
        odometry: &Pose2D,
        field: &FieldDimensions,
        rng: &mut R,
    ) -> Pose2D {
        let attempt = if !self.full_goals.is_empty() {
            let goal = self.full_goals[rng.gen_index(self.full_goals.len())];
            self.template_from_full_goal(&goal, odometry, field, rng)
        } else if !self.known_posts.is_empty() {
            let post = self.known_posts[rng.gen_index(self.known_posts.len())];
            self.template_from_post(&post.seen, &post.real, &post.odometry, odometry, field, rng)
        } else if !self.unknown_posts.is_empty() {
            let post = self.unknown_posts[rng.gen_index(self.unknown_posts.len())];
            let real = post.real[rng.gen_index(2)];
            self.template_from_post(&post.seen, &real, &post.odometry, odometry, field, rng)
        } else {
            None
        };
        attempt.unwrap_or_else(|| self.random_template(field, rng))
    }

    fn template_from_full_goal<R: Rng>(
        &self,
        goal: &FullGoal,
        odometry: &Pose2D,
        field: &FieldDimensions,
        rng: &mut R,
    ) -> Option<Pose2D> {
        let odometry_offset = odometry.relative_to(&goal.odometry);
        let left_dist = self.inflated_distance(goal.seen_left.norm(), rng);
        let right_dist = self.inflated_distance(goal.seen_right.norm(), rng);
        let r1 = left_dist + field.goal_post_radius;
        let r2 = right_dist + field.goal_post_radius;
        let (p1, p2) = intersect_circles(&goal.real_left, r1, &goal.real_right, r2)?;
        for p in [p1, p2] {
            if field.is_inside_carpet(&p) && self.inside_clip_window(&p) {
                let orig_angle = (goal.real_left - p).angle();
                let observed_angle = goal.seen_left.angle();
                let template = Pose2D::new(p.x, p.y, orig_angle - observed_angle);
                return Some(template.compose(&odometry_offset));
            }
        }
        None
    }

    fn template_from_post<R: Rng>(
        &self,
        seen: &Point2D,
        real: &Point2D,
        post_odometry: &Pose2D,
        odometry: &Pose2D,
        field: &FieldDimensions,
        rng: &mut R,
    ) -> Option<Pose2D> {
        let r = self.inflated_distance(seen.norm(), rng) + field.goal_post_radius;
        // Sample a position on the distance circle, biased toward midfield.
        let min_y = (real.y - r).max(-field.y_carpet_border);
        let max_y = (real.y + r).min(field.y_carpet_border);
        if min_y > max_y {
            return None;
        }
        let y = min_y + rng.gen_f32() * (max_y - min_y);
        let dy = y - real.y;
        let x_offset = (r * r - dy * dy).max(0.0).sqrt();
        let x = real.x + if real.x > 0.0 { -x_offset } else { x_offset };
        let p = Point2D::new(x, y);
        if !field.is_inside_carpet(&p) || !self.inside_clip_window(&p) {
            return None;
        }
        let orig_angle = (*real - p).angle();
        let observed_angle = seen.angle();
        let template = Pose2D::new(p.x, p.y, orig_angle - observed_angle);
        let odometry_offset = odometry.relative_to(post_odometry);
        Some(template.compose(&odometry_offset))
    }

    fn random_template<R: Rng>(&self, field: &FieldDimensions, rng: &mut R) -> Pose2D {
        if self.config.clip_generation {
            let [x0, x1] = self.config.clip_range_x;
            let [y0, y1] = self.config.clip_range_y;
            Pose2D::new(
                x0 + rng.gen_f32() * (x1 - x0),
                y0 + rng.gen_f32() * (y1 - y0),
                rng.gen_signed() * std::f32::consts::PI,
            )
        } else {
            field.random_pose_on_field(rng)
        }
    }

    fn inflated_distance<R: Rng>(&self, distance: f32, rng: &mut R) -> f32 {
        let sigma = self.config.distance_standard_deviation;
        let uncertainty = rng.gen_triangular(sigma);
        if distance + uncertainty > sigma {
            distance + uncertainty
        } else {
            distance
        }
    }

    fn inside_clip_window(&self, p: &Point2D) -> bool {
        if !self.config.clip_generation {
            return true;
        }
        let [x0, x1] = self.config.clip_range_x;
        let [y0, y1] = self.config.clip_range_y;
        (x0..=x1).contains(&p.x) && (y0..=y1).contains(&p.y)
    }
}

fn push_bounded<T>(buffer: &mut VecDeque<T>, item: T) {
    if buffer.len() == MAX_PERCEPTS {
        buffer.pop_front();
    }
    buffer.push_back(item);
}

fn expire<T>(buffer: &mut VecDeque<T>, frame: &FrameInfo, timestamp: impl Fn(&T) -> u64) {
    while let Some(front) = buffer.front() {
        if frame.time_since(timestamp(front)) > MAX_TIME_TO_KEEP {
            buffer.pop_front();
        } else {
            break;
        }
    }
}

/// Both intersection points of two circles, or `None` when they do not
/// intersect (or coincide).
fn intersect_circles(
    c1: &Point2D,
    r1: f32,
    c2: &Point2D,
    r2: f32,
) -> Option<(Point2D, Point2D)> {
    let d = c1.distance(c2);
    if d <= f32::EPSILON || d > r1 + r2 || d < (r1 - r2).abs() {
        return None;
    }
    let a = (r1 * r1 - r2 * r2 + d * d) / (2.0 * d);
    let h_sq = r1 * r1 - a * a;
    if h_sq < 0.0 {
        return None;
    }
    let h = h_sq.sqrt();
    let ex = (c2.x - c1.x) / d;
    let ey = (c2.y - c1.y) / d;
    let mx = c1.x + a * ex;
    let my = c1.y + a * ey;
    Some((
        Point2D::new(mx + h * ey, my - h * ex),
        Point2D::new(mx - h * ey, my + h * ex),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rng::SimpleRng;
    use crate::core::types::GoalPostPercept;
    use approx::assert_relative_eq;

    fn exact_config() -> TemplateConfig {
        TemplateConfig {
            distance_standard_deviation: 0.0,
            ..TemplateConfig::default()
        }
    }

    fn percept_with_full_goal(field: &FieldDimensions, robot: &Pose2D, time: u64) -> GoalPercept {
        let mut percept = GoalPercept::default();
        for side in [GoalPostSide::LeftOpponent, GoalPostSide::RightOpponent] {
            let real = field.goal_post_position(side);
            let rel = robot.inverse().transform_point(&real);
            percept.posts[side as usize] = GoalPostPercept {
                position_on_field: rel,
                distance_method: DistanceMethod::BearingBased,
                last_seen: time,
            };
        }
        percept
    }

    #[test]
    fn test_intersect_circles_basic() {
        let (p1, p2) =
            intersect_circles(&Point2D::new(-500.0, 0.0), 1000.0, &Point2D::new(500.0, 0.0), 1000.0)
                .unwrap();
        for p in [p1, p2] {
            assert_relative_eq!(p.x, 0.0, epsilon = 1e-3);
            assert_relative_eq!(p.y.abs(), (1000.0f32 * 1000.0 - 500.0 * 500.0).sqrt(), epsilon = 1e-2);
        }
        assert!(intersect_circles(
            &Point2D::new(0.0, 0.0),
            100.0,
            &Point2D::new(1000.0, 0.0),
            100.0
        )
        .is_none());
    }

    #[test]
    fn test_full_goal_template_recovers_true_pose() {
        let field = FieldDimensions::default();
        let mut generator = SampleTemplateGenerator::new(exact_config());
        let mut rng = SimpleRng::new(5);
        let truth = Pose2D::new(1000.0, -300.0, 0.4);
        let frame = FrameInfo { time: 10_000 };
        let odometry = Pose2D::identity();

        let percept = percept_with_full_goal(&field, &truth, frame.time);
        generator.buffer_percepts(&frame, &odometry, &percept, &field, &mut rng);
        assert!(generator.templates_available());

        // With zero inflation the template should land on the true pose,
        // up to the goal post radius baked into the circle radii.
        let template = generator.new_template(&odometry, &field, &mut rng);
        assert!(
            (template.x - truth.x).abs() < 120.0,
            "template x {} vs truth {}",
            template.x,
            truth.x
        );
        assert!((template.y - truth.y).abs() < 120.0);
        assert!(
            crate::core::math::angle_diff(template.theta, truth.theta).abs() < 0.15,
            "template heading {} vs truth {}",
            template.theta,
            truth.theta
        );
    }

    #[test]
    fn test_buffer_expiry() {
        let field = FieldDimensions::default();
        let mut generator = SampleTemplateGenerator::new(exact_config());
        let mut rng = SimpleRng::new(5);
        let truth = Pose2D::new(1000.0, -300.0, 0.4);
        let frame = FrameInfo { time: 10_000 };

        let percept = percept_with_full_goal(&field, &truth, frame.time);
        generator.buffer_percepts(&frame, &Pose2D::identity(), &percept, &field, &mut rng);
        assert!(generator.templates_available());

        // Much later, with nothing new seen, the buffer must drain.
        let later = FrameInfo {
            time: frame.time + MAX_TIME_TO_KEEP + 1,
        };
        generator.buffer_percepts(
            &later,
            &Pose2D::identity(),
            &GoalPercept::default(),
            &field,
            &mut rng,
        );
        assert!(!generator.templates_available());
    }

    #[test]
    fn test_random_fallback_respects_clip_window() {
        let field = FieldDimensions::default();
        let config = TemplateConfig {
            clip_generation: true,
            clip_range_x: [-2000.0, -1000.0],
            clip_range_y: [0.0, 500.0],
            ..TemplateConfig::default()
        };
        let generator = SampleTemplateGenerator::new(config);
        let mut rng = SimpleRng::new(8);
        for _ in 0..50 {
            let t = generator.new_template(&Pose2D::identity(), &field, &mut rng);
            assert!((-2000.0..=-1000.0).contains(&t.x), "x {}", t.x);
            assert!((0.0..=500.0).contains(&t.y), "y {}", t.y);
        }
    }
}
