//! Pose extraction: k-means clustering of sample positions.

use crate::core::rng::{Rng, SimpleRng};
use crate::core::types::pose::{
    Covariance2D, Point2D, Pose2D, RobotPose, RobotPoseHypotheses, RobotPoseHypothesis,
};

use super::super::localization::sample_set::SampleSet;
use super::PoseCalculator;

/// Number of clusters attempted per cycle.
const K: usize = 5;
/// Minimum pairwise seed separation in millimeters.
const MIN_SEED_DISTANCE: f32 = 1000.0;
/// Upper bound on assign/reposition rounds. The fixed point is normally
/// reached within a handful of rounds; the cap only stops oscillation.
const MAX_ITERATIONS: usize = 20;

#[derive(Debug, Clone, Copy, Default)]
struct Cluster {
    position: Point2D,
    count: usize,
}

/// Re-clusters the population from scratch every cycle: the previous output
/// pose seeds the first cluster, further seeds are samples kept at pairwise
/// distance, then Lloyd iterations run to a fixed point.
pub struct KMeansCalculator {
    clusters: [Cluster; K],
    real_k: usize,
    rng: SimpleRng,
}

impl KMeansCalculator {
    pub fn new(seed: u64) -> Self {
        Self {
            clusters: [Cluster::default(); K],
            real_k: 0,
            rng: SimpleRng::new(seed),
        }
    }

    fn seed_clusters(&mut self, samples: &mut SampleSet, previous: &RobotPose) {
        self.real_k = K;
        self.clusters[0] = Cluster {
            position: previous.pose.position(),
            count: 0,
        };
        let mut filled = 1;

        // Further seeds by rejection sampling over the population: accept a
        // sample position only if it keeps its distance from every seed so
        // far. One sweep over the set; if it runs dry we settle for fewer
        // clusters.
        let n = samples.len();
        let start = self.rng.gen_index(n);
        let mut index = (start + 1) % n;
        while filled < self.real_k && index != start {
            let candidate = samples.samples()[index].position;
            index = (index + 1) % n;
            let well_separated = self.clusters[..filled]
                .iter()
                .all(|c| c.position.distance(&candidate) >= MIN_SEED_DISTANCE);
            if !well_separated {
                continue;
            }
            self.clusters[filled] = Cluster {
                position: candidate,
                count: 0,
            };
            filled += 1;
        }
        self.real_k = filled;

        // Start with every sample unassigned.
        for sample in samples.samples_mut() {
            sample.cluster = self.real_k + 1;
        }
    }

    fn assign_samples(&mut self, samples: &mut SampleSet) -> bool {
        let mut changed = false;
        for sample in samples.samples_mut() {
            let mut closest = 0;
            let mut closest_dist = sample.position.distance_squared(&self.clusters[0].position);
            for (k, cluster) in self.clusters[..self.real_k].iter().enumerate().skip(1) {
                let dist = sample.position.distance_squared(&cluster.position);
                if dist < closest_dist {
                    closest = k;
                    closest_dist = dist;
                }
            }
            if closest != sample.cluster {
                sample.cluster = closest;
                changed = true;
            }
        }
        changed
    }

    fn move_clusters(&mut self, samples: &SampleSet) {
        for (k, cluster) in self.clusters[..self.real_k].iter_mut().enumerate() {
            let mut count = 0usize;
            let mut x_sum = 0.0f64;
            let mut y_sum = 0.0f64;
            for sample in samples.samples() {
                if sample.cluster == k {
                    count += 1;
                    x_sum += sample.position.x as f64;
                    y_sum += sample.position.y as f64;
                }
            }
            if count > 0 {
                cluster.position =
                    Point2D::new((x_sum / count as f64) as f32, (y_sum / count as f64) as f32);
            }
            cluster.count = count;
        }
    }

    fn cluster_pose(&self, samples: &SampleSet, k: usize) -> Pose2D {
        let mut cos_sum = 0.0f64;
        let mut sin_sum = 0.0f64;
        for sample in samples.samples() {
            if sample.cluster == k {
                cos_sum += sample.dir_cos as f64;
                sin_sum += sample.dir_sin as f64;
            }
        }
        Pose2D::new(
            self.clusters[k].position.x,
            self.clusters[k].position.y,
            sin_sum.atan2(cos_sum) as f32,
        )
    }
}

impl PoseCalculator for KMeansCalculator {
    fn calc_pose(&mut self, samples: &mut SampleSet, pose: &mut RobotPose) {
        self.seed_clusters(samples, pose);
        for _ in 0..MAX_ITERATIONS {
            let changed = self.assign_samples(samples);
            self.move_clusters(samples);
            if !changed {
                break;
            }
        }

        let mut largest = 0;
        for k in 1..self.real_k {
            if self.clusters[k].count > self.clusters[largest].count {
                largest = k;
            }
        }
        pose.pose = self.cluster_pose(samples, largest);
        pose.validity = self.clusters[largest].count as f32 / samples.len() as f32;
    }

    fn hypotheses(&self, samples: &SampleSet, hypotheses: &mut RobotPoseHypotheses) {
        hypotheses.hypotheses.clear();
        for k in 0..self.real_k {
            let validity = self.clusters[k].count as f32 / samples.len() as f32;
            if validity <= 0.0 {
                continue;
            }
            hypotheses.hypotheses.push(RobotPoseHypothesis {
                pose: self.cluster_pose(samples, k),
                // TODO: derive the covariance from member scatter; consumers
                // currently rely on this constant, so changing it means
                // retuning them.
                position_covariance: Covariance2D::new(0.1, 0.1, 0.1),
                validity,
            });
        }
    }

    fn supports_hypotheses(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::localization::sample_set::Sample;

    fn bimodal_set() -> SampleSet {
        let mut samples = SampleSet::new(100);
        for (i, s) in samples.samples_mut().iter_mut().enumerate() {
            let pose = if i < 70 {
                Pose2D::new(1500.0 + (i % 5) as f32 * 10.0, 800.0, 0.5)
            } else {
                Pose2D::new(-2000.0, -1000.0 + (i % 5) as f32 * 10.0, -1.0)
            };
            *s = Sample::from_pose(&pose);
        }
        samples
    }

    #[test]
    fn test_largest_cluster_wins() {
        let mut samples = bimodal_set();
        let mut pose = RobotPose::default();
        let mut calc = KMeansCalculator::new(42);
        calc.calc_pose(&mut samples, &mut pose);
        assert!(
            (pose.pose.x - 1500.0).abs() < 200.0,
            "major mode at x=1500, got {}",
            pose.pose.x
        );
        assert!(pose.validity >= 0.65, "validity {}", pose.validity);
    }

    #[test]
    fn test_every_sample_assigned_to_active_cluster() {
        let mut samples = bimodal_set();
        let mut pose = RobotPose::default();
        let mut calc = KMeansCalculator::new(7);
        calc.calc_pose(&mut samples, &mut pose);
        for sample in samples.samples() {
            assert!(
                sample.cluster < calc.real_k,
                "orphaned assignment: cluster {} of {}",
                sample.cluster,
                calc.real_k
            );
        }
    }

    #[test]
    fn test_tight_population_falls_back_to_fewer_clusters() {
        let mut samples = SampleSet::new(50);
        for s in samples.samples_mut() {
            *s = Sample::from_pose(&Pose2D::new(100.0, 100.0, 0.0));
        }
        let mut pose = RobotPose {
            pose: Pose2D::new(100.0, 100.0, 0.0),
            validity: 1.0,
        };
        let mut calc = KMeansCalculator::new(3);
        calc.calc_pose(&mut samples, &mut pose);
        assert!(
            calc.real_k < K,
            "no well-separated seeds exist, real_k was {}",
            calc.real_k
        );
        assert!(pose.validity > 0.99);
    }

    #[test]
    fn test_hypotheses_report_nonzero_clusters() {
        let mut samples = bimodal_set();
        let mut pose = RobotPose::default();
        let mut calc = KMeansCalculator::new(42);
        calc.calc_pose(&mut samples, &mut pose);
        let mut hypotheses = RobotPoseHypotheses::default();
        calc.hypotheses(&samples, &mut hypotheses);
        assert!(!hypotheses.hypotheses.is_empty());
        let total: f32 = hypotheses.hypotheses.iter().map(|h| h.validity).sum();
        assert!(total <= 1.0 + 1e-5, "shares must not exceed 1: {}", total);
        for h in &hypotheses.hypotheses {
            assert_eq!(h.position_covariance, Covariance2D::new(0.1, 0.1, 0.1));
        }
    }
}
