//! Deterministic random number generation.
//!
//! The filter must be reproducible under a fixed seed, both for tests and
//! for replaying logged games, so all stochastic steps draw from this
//! seedable generator instead of a global one.

/// Trait for random number generation (abstracted for testing).
pub trait Rng {
    /// Generate a random f32 in [0, 1).
    fn gen_f32(&mut self) -> f32;

    /// Generate a random index in [0, n).
    fn gen_index(&mut self, n: usize) -> usize {
        debug_assert!(n > 0);
        let i = (self.gen_f32() * n as f32) as usize;
        i.min(n - 1)
    }

    /// Generate a random f32 in [-1, 1).
    fn gen_signed(&mut self) -> f32 {
        self.gen_f32() * 2.0 - 1.0
    }

    /// Sample from a triangular distribution on [-sigma, sigma].
    ///
    /// The sum of two uniform draws gives a triangle-shaped density with
    /// its mode at zero. Used for spreading samples around prior poses.
    fn gen_triangular(&mut self, sigma: f32) -> f32 {
        sigma * (self.gen_f32() + self.gen_f32() - 1.0)
    }

    /// Generate a random f32 from the standard normal distribution.
    fn gen_standard_normal(&mut self) -> f32 {
        // Box-Muller transform
        let u1 = self.gen_f32().max(1e-10);
        let u2 = self.gen_f32();
        let r = (-2.0 * u1.ln()).sqrt();
        let theta = 2.0 * std::f32::consts::PI * u2;
        r * theta.cos()
    }
}

/// Simple LCG-based RNG, deterministic under a fixed seed.
#[derive(Debug, Clone)]
pub struct SimpleRng {
    state: u64,
}

impl SimpleRng {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_u64(&mut self) -> u64 {
        // LCG parameters from Numerical Recipes
        self.state = self.state.wrapping_mul(6364136223846793005).wrapping_add(1);
        self.state
    }
}

impl Rng for SimpleRng {
    fn gen_f32(&mut self) -> f32 {
        (self.next_u64() >> 40) as f32 / (1u64 << 24) as f32
    }
}
