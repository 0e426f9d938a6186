//! The per-cycle self-localization engine.
//!
//! One call per control cycle: motion update from odometry, importance
//! weighting from the frame's landmark observations, adaptive resampling
//! with template injection, then pose extraction through the active
//! strategy. All mutable state is owned here; collaborators receive
//! explicit references, never globals.

use serde::{Deserialize, Serialize};

use crate::algorithms::field_model::{self, FieldModel, GoalNetTable};
use crate::algorithms::localization::motion_model::MotionModel;
use crate::algorithms::localization::sample_set::{Sample, SampleSet};
use crate::algorithms::localization::sensor::{
    CenterCircleSensorModel, CornersSensorModel, GoalPostsSensorModel, LineSensorModel,
    Observation, ObservationKind, SensorContext, SensorModel, SensorUpdate, NO_WEIGHTING,
};
use crate::algorithms::localization::template_generator::SampleTemplateGenerator;
use crate::algorithms::pose_calculation::{
    create_pose_calculator, PoseCalculator, PoseCalculatorKind,
};
use crate::config::LocatorConfig;
use crate::core::field::{FieldDimensions, FieldGeometry};
use crate::core::rng::{Rng, SimpleRng};
use crate::core::types::pose::{Pose2D, RobotPose, RobotPoseHypotheses};
use crate::core::types::{
    CameraInfo, FrameInfo, GamePhase, GameState, GoalPercept, LinePercept, SecondaryState,
};
use crate::error::Result;

/// Everything the locator consumes in one control cycle.
pub struct CycleInput<'a> {
    pub frame: FrameInfo,
    /// Absolute accumulated odometry; the locator differentiates it.
    pub odometry: Pose2D,
    pub camera: CameraInfo,
    pub goal_percept: &'a GoalPercept,
    pub line_percept: &'a LinePercept,
    pub game: GameState,
}

/// The pose broadcast to teammates once per cycle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TeamPoseMessage {
    pub timestamp: u64,
    pub pose: Pose2D,
    pub validity: f32,
}

/// Monte Carlo self locator.
pub struct SelfLocator {
    config: LocatorConfig,
    field: FieldDimensions,
    field_model: FieldModel,
    goal_net: GoalNetTable,

    samples: SampleSet,
    weightings: Vec<f64>,
    motion_model: MotionModel,
    sensor_models: Vec<Box<dyn SensorModel>>,
    template_generator: SampleTemplateGenerator,
    calculator: Box<dyn PoseCalculator>,
    calculator_kind: PoseCalculatorKind,
    rng: SimpleRng,

    total_weighting: f64,
    slow_weighting: f64,
    fast_weighting: f64,
    updated_by_sensors: bool,
    last_odometry: Pose2D,
    last_pose: RobotPose,
    last_pose_timestamp: Option<u64>,
    reset_requested: bool,

    penalized_last_frame: bool,
    game_phase_last_frame: GamePhase,

    // Reused per cycle to keep the hot path allocation-free.
    observations: Vec<Observation>,
    selected_observations: Vec<Observation>,
    selected_indices: Vec<usize>,
}

impl SelfLocator {
    /// Build a locator, computing the field model tables in memory.
    pub fn new(config: LocatorConfig, geometry: FieldGeometry) -> Self {
        let field = FieldDimensions::new(geometry);
        let (field_model, goal_net) =
            field_model::build(&field, config.field_model.max_crossing_length);
        Self::assemble(config, field, field_model, goal_net)
    }

    /// Build a locator, loading the field model tables from a binary cache
    /// (rebuilding and rewriting it when stale).
    pub fn with_cache<P: AsRef<std::path::Path>>(
        config: LocatorConfig,
        geometry: FieldGeometry,
        cache_path: P,
    ) -> Result<Self> {
        let field = FieldDimensions::new(geometry);
        let (field_model, goal_net) = field_model::load_or_build(
            &field,
            config.field_model.max_crossing_length,
            cache_path,
        )?;
        Ok(Self::assemble(config, field, field_model, goal_net))
    }

    fn assemble(
        config: LocatorConfig,
        field: FieldDimensions,
        field_model: FieldModel,
        goal_net: GoalNetTable,
    ) -> Self {
        let seed = if config.population.seed == 0 {
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or(12345)
        } else {
            config.population.seed
        };
        let mut rng = SimpleRng::new(seed);

        let n = config.population.number_of_samples;
        let calculator_kind = config.pose_calculation.calculator;
        let calculator = create_pose_calculator(
            calculator_kind,
            &field,
            &config.pose_calculation,
            rng.gen_f32().to_bits() as u64 + 1,
        );

        let mut locator = Self {
            motion_model: MotionModel::new(config.motion),
            sensor_models: Self::build_sensor_models(&config),
            template_generator: SampleTemplateGenerator::new(config.templates.clone()),
            weightings: vec![1.0; n],
            config,
            field,
            field_model,
            goal_net,
            samples: SampleSet::new(n),
            calculator,
            calculator_kind,
            rng,
            total_weighting: 0.0,
            slow_weighting: 0.0,
            fast_weighting: 0.0,
            updated_by_sensors: false,
            last_odometry: Pose2D::identity(),
            last_pose: RobotPose::default(),
            last_pose_timestamp: None,
            reset_requested: false,
            penalized_last_frame: false,
            game_phase_last_frame: GamePhase::Initial,
            observations: Vec::with_capacity(64),
            selected_observations: Vec::with_capacity(64),
            selected_indices: Vec::with_capacity(64),
        };
        locator.init_samples(&Pose2D::identity());
        locator
    }

    fn build_sensor_models(config: &LocatorConfig) -> Vec<Box<dyn SensorModel>> {
        vec![
            Box::new(GoalPostsSensorModel::new(config.sensors.goal_posts)),
            Box::new(CenterCircleSensorModel::new(config.sensors.center_circle)),
            Box::new(LineSensorModel::new(config.sensors.lines)),
            Box::new(CornersSensorModel::new(config.sensors.corners)),
        ]
    }

    pub fn config(&self) -> &LocatorConfig {
        &self.config
    }

    pub fn field(&self) -> &FieldDimensions {
        &self.field
    }

    /// The current population (read-only, e.g. for visualization).
    pub fn samples(&self) -> &[Sample] {
        self.samples.samples()
    }

    /// Replace the configuration at runtime.
    ///
    /// Noise parameters take effect immediately; a changed population size
    /// or crossing length triggers the corresponding rebuild on the next
    /// cycle, a changed calculator kind a live strategy swap.
    pub fn set_config(&mut self, config: LocatorConfig) {
        if (config.field_model.max_crossing_length - self.field_model.max_crossing_length()).abs()
            > f32::EPSILON
        {
            log::info!("crossing length changed, rebuilding field model tables");
            let (field_model, goal_net) =
                field_model::build(&self.field, config.field_model.max_crossing_length);
            self.field_model = field_model;
            self.goal_net = goal_net;
        }
        self.motion_model = MotionModel::new(config.motion);
        self.sensor_models = Self::build_sensor_models(&config);
        self.template_generator = SampleTemplateGenerator::new(config.templates.clone());
        self.config = config;
    }

    /// Reload the configuration from a TOML file.
    pub fn reload_config<P: AsRef<std::path::Path>>(&mut self, path: P) -> Result<()> {
        let config = LocatorConfig::from_file(path)?;
        self.set_config(config);
        Ok(())
    }

    /// Request a full reinitialization before the next cycle.
    pub fn request_reset(&mut self) {
        self.reset_requested = true;
    }

    /// The message for the team broadcast channel, once a pose exists.
    pub fn team_message(&self) -> Option<TeamPoseMessage> {
        self.last_pose_timestamp.map(|timestamp| TeamPoseMessage {
            timestamp,
            pose: self.last_pose.pose,
            validity: self.last_pose.validity,
        })
    }

    /// Run one localization cycle and return the pose estimate.
    ///
    /// Called again with the same frame timestamp, the cached result is
    /// returned instead of recomputing.
    pub fn update(&mut self, input: &CycleInput) -> RobotPose {
        // A changed population size invalidates the whole set.
        if self.config.population.number_of_samples != self.samples.len() {
            self.reinit(input);
        }

        if self.last_pose_timestamp == Some(input.frame.time) {
            return self.last_pose;
        }

        self.pre_execution(input);

        self.motion_update(input);
        self.updated_by_sensors = self.apply_sensor_models(input);
        if self.updated_by_sensors {
            self.adapt_weightings();
            self.resampling(input);
        }
        let mut pose = self.last_pose;
        self.calculator.calc_pose(&mut self.samples, &mut pose);
        pose.validity = pose.validity.clamp(0.0, 1.0);

        self.last_pose = pose;
        self.last_pose_timestamp = Some(input.frame.time);
        pose
    }

    /// The multi-hypothesis output for the current frame.
    ///
    /// Only the clustering strategies maintain genuine multi-modality;
    /// for all others the list stays empty. Triggers the cycle when the
    /// pose has not been computed for this frame yet.
    pub fn hypotheses(&mut self, input: &CycleInput) -> RobotPoseHypotheses {
        let mut hypotheses = RobotPoseHypotheses::default();
        if !self.calculator.supports_hypotheses() {
            return hypotheses;
        }
        if self.last_pose_timestamp != Some(input.frame.time) {
            self.update(input);
        }
        self.calculator.hypotheses(&self.samples, &mut hypotheses);
        hypotheses
    }

    fn pre_execution(&mut self, input: &CycleInput) {
        self.template_generator.buffer_percepts(
            &input.frame,
            &input.odometry,
            input.goal_percept,
            &self.field,
            &mut self.rng,
        );

        self.samples.reset_weightings(1.0);

        // Live strategy swap: drop the old calculator's state entirely.
        if self.config.pose_calculation.calculator != self.calculator_kind {
            self.calculator_kind = self.config.pose_calculation.calculator;
            self.calculator = create_pose_calculator(
                self.calculator_kind,
                &self.field,
                &self.config.pose_calculation,
                self.rng.gen_f32().to_bits() as u64 + 1,
            );
            self.calculator.init(&mut self.samples);
        }

        if self.config.reset.consider_game_state {
            // Penalty shootout: set → playing replaces the population at
            // the configured start pose.
            if input.game.secondary == SecondaryState::PenaltyShootout
                || self.config.reset.agent == "penalty"
            {
                if self.game_phase_last_frame == GamePhase::Set
                    && input.game.phase == GamePhase::Playing
                {
                    self.reinit(input);
                }
            }
            // Normal play: a lifted penalty means the robot reenters at one
            // of the two touchline positions, facing the field.
            if input.game.secondary == SecondaryState::Normal
                || self.config.reset.agent == "soccer"
            {
                if self.penalized_last_frame && !input.game.penalized {
                    let poses = [
                        Pose2D::new(0.0, self.field.y_sideline, -std::f32::consts::FRAC_PI_2),
                        Pose2D::new(0.0, -self.field.y_sideline, std::f32::consts::FRAC_PI_2),
                    ];
                    let std_dev = Pose2D {
                        x: 200.0,
                        y: 200.0,
                        theta: 0.2,
                    };
                    self.init_samples_at(&poses, &[std_dev, std_dev], &input.odometry);
                }
            }
            self.penalized_last_frame = input.game.penalized;
            self.game_phase_last_frame = input.game.phase;
        }

        if self.reset_requested {
            self.reset_requested = false;
            self.reinit(input);
        }
    }

    /// Full reinitialization: fresh population (around the known start pose
    /// when configured, else uniform) and fresh calculator state.
    fn reinit(&mut self, input: &CycleInput) {
        let n = self.config.population.number_of_samples;
        if n != self.samples.len() {
            self.samples = SampleSet::new(n);
            self.weightings = vec![1.0; n];
        }
        self.template_generator.clear();
        self.init_samples(&input.odometry);
    }

    fn init_samples(&mut self, odometry: &Pose2D) {
        if self.config.reset.known_start_pose {
            let pose = self.config.reset.start_pose;
            let std_dev = self.config.reset.start_pose_standard_deviation;
            self.init_samples_at(&[pose], &[std_dev], odometry);
        } else {
            self.init_samples_at(&[], &[], odometry);
        }
    }

    /// Initialize the population at the given prior poses (triangular
    /// spread per axis), or uniformly over the field when none are given.
    fn init_samples_at(&mut self, poses: &[Pose2D], std_devs: &[Pose2D], odometry: &Pose2D) {
        debug_assert_eq!(poses.len(), std_devs.len());
        for sample in self.samples.samples_mut() {
            let pose = if poses.is_empty() {
                self.field.random_pose_on_field(&mut self.rng)
            } else {
                let index = self.rng.gen_index(poses.len());
                Pose2D::new(
                    poses[index].x + self.rng.gen_triangular(std_devs[index].x),
                    poses[index].y + self.rng.gen_triangular(std_devs[index].y),
                    poses[index].theta + self.rng.gen_triangular(std_devs[index].theta),
                )
            };
            *sample = Sample::from_pose(&pose);
        }
        self.last_odometry = *odometry;
        self.calculator.init(&mut self.samples);
    }

    fn motion_update(&mut self, input: &CycleInput) {
        let offset = input.odometry.relative_to(&self.last_odometry);
        self.last_odometry = input.odometry;
        self.motion_model.update(
            self.samples.samples_mut(),
            &offset,
            self.updated_by_sensors,
            &self.field,
            &mut self.rng,
        );
    }

    /// Select this frame's observations and multiply the models' factors
    /// into the sample weightings. Returns whether anything was applied.
    fn apply_sensor_models(&mut self, input: &CycleInput) -> bool {
        if !input.camera.valid {
            return false;
        }

        // Goal posts and the center circle are mandatory when visible;
        // side-known posts suppress the unknown-side ones.
        self.selected_observations.clear();
        for i in 0..GoalPercept::NUM_POSTS {
            if input.goal_percept.posts[i].last_seen == input.frame.time {
                self.selected_observations
                    .push(Observation::new(ObservationKind::GoalPost, i));
            }
        }
        if self.selected_observations.is_empty() {
            for u in 0..GoalPercept::NUM_UNKNOWN_POSTS {
                if input.goal_percept.unknown_posts[u].last_seen == input.frame.time {
                    self.selected_observations.push(Observation::new(
                        ObservationKind::GoalPost,
                        GoalPercept::NUM_POSTS + u,
                    ));
                }
            }
        }
        if input.line_percept.circle.found {
            self.selected_observations
                .push(Observation::new(ObservationKind::CenterCircle, 0));
        }

        // Line endpoints and corners fill the remaining budget.
        self.observations.clear();
        for line_index in 0..input.line_percept.lines.len() {
            self.observations
                .push(Observation::new(ObservationKind::Point, 2 * line_index));
            self.observations
                .push(Observation::new(ObservationKind::Point, 2 * line_index + 1));
        }
        for corner_index in 0..input.line_percept.intersections.len() {
            self.observations
                .push(Observation::new(ObservationKind::Corner, corner_index));
        }

        if self.selected_observations.is_empty() && self.observations.is_empty() {
            return false;
        }

        while self.selected_observations.len() < self.config.population.number_of_observations {
            if self.observations.is_empty() {
                let index = self.rng.gen_index(self.selected_observations.len());
                let repeat = self.selected_observations[index];
                self.selected_observations.push(repeat);
            } else {
                let index = self.rng.gen_index(self.observations.len());
                self.selected_observations.push(self.observations[index]);
            }
        }

        let ctx = SensorContext {
            frame: &input.frame,
            field: &self.field,
            field_model: &self.field_model,
            goal_net: &self.goal_net,
            camera: &input.camera,
            goal_percept: input.goal_percept,
            line_percept: input.line_percept,
        };

        let mut applied = false;
        for model in self.sensor_models.iter_mut() {
            self.selected_indices.clear();
            for observation in &self.selected_observations {
                if observation.kind == model.kind() {
                    self.selected_indices.push(observation.index);
                }
            }
            let result = if self.selected_indices.is_empty() {
                SensorUpdate::None
            } else {
                model.compute_weightings(
                    &ctx,
                    &self.samples,
                    &self.selected_indices,
                    &mut self.weightings,
                )
            };
            match result {
                SensorUpdate::None => {}
                SensorUpdate::Full => {
                    for (i, sample) in self.samples.samples_mut().iter_mut().enumerate() {
                        sample.weighting *= self.weightings[i];
                    }
                    applied = true;
                }
                SensorUpdate::Partial => {
                    // Samples the model could not assess receive the mean of
                    // the assessed factors, never zero.
                    let mut sum = 0.0f64;
                    let mut valid = 0usize;
                    for &w in &self.weightings[..self.samples.len()] {
                        if w != NO_WEIGHTING {
                            sum += w;
                            valid += 1;
                        }
                    }
                    if valid == 0 {
                        log::warn!(
                            "sensor model claimed a partial update without any weighting"
                        );
                        continue;
                    }
                    let average = sum / valid as f64;
                    for (i, sample) in self.samples.samples_mut().iter_mut().enumerate() {
                        let w = self.weightings[i];
                        sample.weighting *= if w == NO_WEIGHTING { average } else { w };
                    }
                    applied = true;
                }
            }
        }
        applied
    }

    /// Track the average weighting with a slow and a fast exponential
    /// moving average; their ratio sizes the template injection.
    fn adapt_weightings(&mut self) {
        self.total_weighting = self.samples.total_weighting();
        if self.total_weighting == 0.0 {
            log::warn!("sensor update left the whole population at zero weighting");
            return;
        }
        let average = self.total_weighting / self.samples.len() as f64;
        if self.slow_weighting > 0.0 {
            self.slow_weighting +=
                self.config.resampling.alpha_slow * (average - self.slow_weighting);
            self.fast_weighting +=
                self.config.resampling.alpha_fast * (average - self.fast_weighting);
        } else {
            self.slow_weighting = average;
            if self.config.reset.known_start_pose {
                // With a trusted prior, a cold fast average would read as
                // "confidently wrong" and reinject everything on cycle one.
                self.fast_weighting = average;
            }
        }
    }

    /// Stochastic universal resampling with an additive survival threshold,
    /// plus adaptive template injection for the remainder.
    fn resampling(&mut self, input: &CycleInput) {
        let n = self.samples.len();
        let total = self.total_weighting;
        let templates_available = self.template_generator.templates_available();

        let injection_fraction = if templates_available && self.slow_weighting > 0.0 {
            (1.0 - self.fast_weighting / self.slow_weighting).max(0.0)
        } else {
            0.0
        };
        let number_resampled = if self.config.resampling.disable_sensor_resetting {
            n as f64
        } else {
            n as f64 * (1.0 - injection_fraction)
        };
        let threshold = self.config.resampling.resampling_threshold * total / n as f64;

        let mut filled = 0usize;
        {
            let (new_generation, old_generation) = self.samples.swap_generations();
            if number_resampled >= 1.0 {
                let step = (total + threshold * n as f64) / number_resampled;
                let mut next_position = self.rng.gen_f32() as f64 * step;
                let mut current_sum = 0.0f64;
                for old in old_generation.iter() {
                    current_sum += old.weighting + threshold;
                    while current_sum > next_position && filled < n {
                        new_generation[filled] = *old;
                        filled += 1;
                        next_position += step;
                    }
                }
            }

            if filled < n && templates_available {
                // Fill the quota with fresh observation-backed poses.
                while filled < n {
                    let pose = self.template_generator.new_template(
                        &input.odometry,
                        &self.field,
                        &mut self.rng,
                    );
                    let mut sample = Sample::from_pose(&pose);
                    sample.weighting = 0.0;
                    sample.cluster = self.calculator.new_cluster_index();
                    new_generation[filled] = sample;
                    filled += 1;
                }
            } else if filled < n && filled > 0 {
                // Rounding shortfall: duplicate already-drawn samples.
                while filled < n {
                    let duplicate = new_generation[self.rng.gen_index(filled)];
                    new_generation[filled] = duplicate;
                    filled += 1;
                }
            }
        }

        if filled == 0 {
            // No survivors and no templates. One consistent policy in every
            // build profile: report it and start over uniformly.
            log::error!("resampling produced no survivors, reinitializing uniformly");
            for sample in self.samples.samples_mut() {
                let pose = self.field.random_pose_on_field(&mut self.rng);
                *sample = Sample::from_pose(&pose);
            }
            self.calculator.init(&mut self.samples);
        }
    }
}
