//! Pose extraction: particle lineage clustering with hysteresis.
//!
//! Every sample carries a cluster id that survives resampling, so clusters
//! are lineages: they grow when their samples get duplicated and die when
//! the last member is resampled away. Freshly injected template samples
//! found new lineages. Ids are a bounded resource managed through a
//! free-list arena: an id whose membership drops to zero is recycled.

use serde::{Deserialize, Serialize};

use crate::core::rng::{Rng, SimpleRng};
use crate::core::types::pose::{
    Covariance2D, Point2D, Pose2D, RobotPose, RobotPoseHypotheses, RobotPoseHypothesis,
};

use super::super::localization::sample_set::{Sample, SampleSet};
use super::PoseCalculator;

/// How split clusters representing one real mode get consolidated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergingStrategy {
    /// No consolidation.
    None,
    /// Try to merge one randomly picked cluster into the largest one.
    MergeRandomToLargest,
    /// Try to merge the second largest cluster into the largest one.
    MergeTwoLargest,
    /// Move one randomly picked sample over to the largest cluster when it
    /// already lies inside that cluster's bounding box.
    ParticleBleeding,
}

impl Default for MergingStrategy {
    fn default() -> Self {
        MergingStrategy::ParticleBleeding
    }
}

/// Membership count sentinel for a recyclable id.
const FREE: i32 = -1;

pub struct ParticleHistoryCalculator {
    /// Membership count per cluster id; [`FREE`] marks recyclable ids.
    cluster_count: Vec<i32>,
    /// Ids available for new lineages.
    free_indices: Vec<usize>,
    /// The (id, size) list of live clusters from the last `calc_pose`.
    clusters: Vec<(usize, i32)>,
    max_cluster: usize,
    last_cluster: usize,
    switch_percentage: u32,
    merging_strategy: MergingStrategy,
    rng: SimpleRng,
}

impl ParticleHistoryCalculator {
    pub fn new(switch_percentage: u32, merging_strategy: MergingStrategy, seed: u64) -> Self {
        Self {
            cluster_count: Vec::new(),
            free_indices: Vec::new(),
            clusters: Vec::new(),
            max_cluster: 0,
            last_cluster: 0,
            switch_percentage,
            merging_strategy,
            rng: SimpleRng::new(seed),
        }
    }

    /// The clusters found in the last cycle, as (id, size) pairs.
    pub fn clusters(&self) -> &[(usize, i32)] {
        &self.clusters
    }

    fn calc_pose_of_cluster(&self, samples: &SampleSet, cluster: usize) -> Option<RobotPose> {
        let size = *self.cluster_count.get(cluster)?;
        if size <= 0 {
            return None;
        }
        let mut x_sum = 0.0f64;
        let mut y_sum = 0.0f64;
        let mut cos_sum = 0.0f64;
        let mut sin_sum = 0.0f64;
        for sample in samples.samples() {
            if sample.cluster == cluster {
                x_sum += sample.position.x as f64;
                y_sum += sample.position.y as f64;
                cos_sum += sample.dir_cos as f64;
                sin_sum += sample.dir_sin as f64;
            }
        }
        Some(RobotPose {
            pose: Pose2D::new(
                (x_sum / size as f64) as f32,
                (y_sum / size as f64) as f32,
                sin_sum.atan2(cos_sum) as f32,
            ),
            validity: size as f32 / samples.len() as f32,
        })
    }

    fn bounding_box(&self, samples: &SampleSet, cluster: usize) -> Option<(Point2D, Point2D)> {
        let mut min = Point2D::new(f32::MAX, f32::MAX);
        let mut max = Point2D::new(f32::MIN, f32::MIN);
        let mut any = false;
        for sample in samples.samples() {
            if sample.cluster == cluster {
                min.x = min.x.min(sample.position.x);
                min.y = min.y.min(sample.position.y);
                max.x = max.x.max(sample.position.x);
                max.y = max.y.max(sample.position.y);
                any = true;
            }
        }
        any.then_some((min, max))
    }

    fn free_id(&mut self, id: usize) {
        self.cluster_count[id] = FREE;
        self.free_indices.push(id);
    }

    fn merge_cluster_into(&mut self, samples: &mut SampleSet, target: usize, source: usize) {
        for sample in samples.samples_mut() {
            if sample.cluster == source {
                sample.cluster = target;
            }
        }
        self.cluster_count[target] += self.cluster_count[source];
        self.free_id(source);
    }

    /// Source fits into target when every source member lies inside the
    /// target's bounding box.
    fn compatible(&self, samples: &SampleSet, target: usize, source: usize) -> bool {
        let Some((min, max)) = self.bounding_box(samples, target) else {
            return false;
        };
        samples
            .samples()
            .iter()
            .filter(|s| s.cluster == source)
            .all(|s| {
                s.position.x >= min.x
                    && s.position.y >= min.y
                    && s.position.x <= max.x
                    && s.position.y <= max.y
            })
    }

    fn merge_random_to_largest(&mut self, samples: &mut SampleSet) {
        let n = self.cluster_count.len();
        let start = self.rng.gen_index(n);
        let mut candidate = (start + 1) % n;
        while candidate != start {
            if self.cluster_count[candidate] >= 1 && candidate != self.max_cluster {
                break;
            }
            candidate = (candidate + 1) % n;
        }
        if candidate == start {
            return;
        }
        if self.compatible(samples, self.max_cluster, candidate) {
            self.merge_cluster_into(samples, self.max_cluster, candidate);
        }
    }

    fn merge_two_largest(&mut self, samples: &mut SampleSet) {
        let mut second: Option<usize> = None;
        let mut second_size = 0;
        for (id, &count) in self.cluster_count.iter().enumerate() {
            if id != self.max_cluster && count > second_size {
                second_size = count;
                second = Some(id);
            }
        }
        let Some(second) = second else { return };
        if self.compatible(samples, self.max_cluster, second) {
            self.merge_cluster_into(samples, self.max_cluster, second);
        }
    }

    fn particle_bleeding(&mut self, samples: &mut SampleSet) {
        let index = self.rng.gen_index(samples.len());
        let picked: Sample = samples.samples()[index];
        if picked.cluster == self.max_cluster {
            return;
        }
        let Some((min, max)) = self.bounding_box(samples, self.max_cluster) else {
            return;
        };
        let inside = picked.position.x > min.x
            && picked.position.y > min.y
            && picked.position.x < max.x
            && picked.position.y < max.y;
        if !inside {
            return;
        }
        let old = picked.cluster;
        samples.samples_mut()[index].cluster = self.max_cluster;
        self.cluster_count[self.max_cluster] += 1;
        self.cluster_count[old] -= 1;
        if self.cluster_count[old] == 0 {
            self.free_id(old);
        }
    }
}

impl PoseCalculator for ParticleHistoryCalculator {
    fn calc_pose(&mut self, samples: &mut SampleSet, pose: &mut RobotPose) {
        // Recount memberships from scratch.
        for count in &mut self.cluster_count {
            if *count > 0 {
                *count = 0;
            }
        }
        self.clusters.clear();
        for sample in samples.samples() {
            self.cluster_count[sample.cluster] += 1;
        }

        // Ids that ran empty go back on the free list; everything still
        // populated makes up this cycle's cluster list.
        for id in 0..self.cluster_count.len() {
            match self.cluster_count[id] {
                0 => self.free_id(id),
                FREE => {}
                count => self.clusters.push((id, count)),
            }
        }

        self.max_cluster = 0;
        for id in 1..self.cluster_count.len() {
            if self.cluster_count[id] > self.cluster_count[self.max_cluster] {
                self.max_cluster = id;
            }
        }

        match self.merging_strategy {
            MergingStrategy::None => {}
            MergingStrategy::MergeRandomToLargest => self.merge_random_to_largest(samples),
            MergingStrategy::MergeTwoLargest => self.merge_two_largest(samples),
            MergingStrategy::ParticleBleeding => self.particle_bleeding(samples),
        }

        // Hysteresis: only switch away from the previously selected cluster
        // when the new maximum beats it by the configured margin.
        let max_size = self.cluster_count[self.max_cluster];
        let last_size = self.cluster_count[self.last_cluster];
        if last_size != FREE && self.last_cluster != self.max_cluster {
            let max_scaled = max_size as i64 * 100;
            let last_scaled = last_size as i64 * (100 + self.switch_percentage as i64);
            if max_scaled < last_scaled {
                self.max_cluster = self.last_cluster;
            }
        }
        self.last_cluster = self.max_cluster;

        if let Some(result) = self.calc_pose_of_cluster(samples, self.max_cluster) {
            *pose = result;
        } else {
            pose.validity = 0.0;
        }
    }

    fn init(&mut self, samples: &mut SampleSet) {
        let n = samples.len();
        self.cluster_count = vec![FREE; n * 2];
        self.free_indices.clear();
        self.clusters.clear();
        for (i, sample) in samples.samples_mut().iter_mut().enumerate() {
            sample.cluster = i;
            self.cluster_count[i] = 1;
            self.free_indices.push(i + n);
        }
        self.max_cluster = 0;
        self.last_cluster = 0;
    }

    fn new_cluster_index(&mut self) -> usize {
        match self.free_indices.pop() {
            Some(id) => {
                self.cluster_count[id] = 1;
                id
            }
            None => {
                // Bounded by construction (2N ids, at most N live clusters
                // plus N injections per cycle); reaching this means the
                // bookkeeping is broken.
                debug_assert!(false, "cluster id arena exhausted");
                0
            }
        }
    }

    fn index_of_best_cluster(&self) -> Option<usize> {
        Some(self.max_cluster)
    }

    fn hypotheses(&self, samples: &SampleSet, hypotheses: &mut RobotPoseHypotheses) {
        hypotheses.hypotheses.clear();
        let mut sorted = self.clusters.clone();
        sorted.sort_by(|a, b| b.1.cmp(&a.1));
        for &(id, size) in sorted
            .iter()
            .take(RobotPoseHypotheses::MAX_HYPOTHESES)
        {
            // No mini clusters.
            if size <= 3 {
                break;
            }
            let Some(mean) = self.calc_pose_of_cluster(samples, id) else {
                continue;
            };
            // Bessel-corrected scatter of the member positions.
            let mut var_x = 0.0f64;
            let mut var_y = 0.0f64;
            let mut cov_xy = 0.0f64;
            for sample in samples.samples() {
                if sample.cluster == id {
                    let dx = (sample.position.x - mean.pose.x) as f64;
                    let dy = (sample.position.y - mean.pose.y) as f64;
                    var_x += dx * dx;
                    var_y += dy * dy;
                    cov_xy += dx * dy;
                }
            }
            let denom = (size - 1) as f64;
            hypotheses.hypotheses.push(RobotPoseHypothesis {
                pose: mean.pose,
                position_covariance: Covariance2D::new(
                    (var_x / denom) as f32,
                    (cov_xy / denom) as f32,
                    (var_y / denom) as f32,
                ),
                validity: mean.validity,
            });
        }
    }

    fn supports_hypotheses(&self) -> bool {
        true
    }
}
