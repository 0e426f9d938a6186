//! Precomputed Gaussian lookup for the line and corner sensor models.
//!
//! The inner loop of those models runs samples × observations times per
//! cycle; a table lookup replaces the `exp` call there. Displacements are
//! scored as dimensionless ratios scaled by [`RELATIVE_SCALE`], so the
//! standard deviation is expressed in the same scaled units.

/// Scale applied to relative displacement ratios before table lookup.
pub const RELATIVE_SCALE: f32 = 1024.0;

/// Soft floor added to the forward distance when normalizing near-axis
/// displacements, so very close observations do not blow up the ratio.
pub const NEAR_OFFSET: f32 = 450.0;

const TABLE_SIZE: usize = 2048;

/// A table of `exp(-0.5 (i/σ)²)` for integer scaled displacements.
#[derive(Debug, Clone)]
pub struct GaussianTable {
    values: Vec<f64>,
    sigma: f32,
}

impl GaussianTable {
    pub fn new(sigma: f32) -> Self {
        let sigma = sigma.max(1.0);
        let values = (0..TABLE_SIZE)
            .map(|i| {
                let e = i as f64 / sigma as f64;
                (-0.5 * e * e).exp()
            })
            .collect();
        Self { values, sigma }
    }

    pub fn sigma(&self) -> f32 {
        self.sigma
    }

    /// The Gaussian factor for a scaled displacement.
    ///
    /// Inputs beyond the table range clamp to the last entry, which is
    /// effectively zero for any realistic standard deviation.
    #[inline]
    pub fn value(&self, scaled_displacement: f32) -> f64 {
        let index = scaled_displacement.abs() as usize;
        self.values[index.min(TABLE_SIZE - 1)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_peak_at_zero() {
        let table = GaussianTable::new(200.0);
        assert_relative_eq!(table.value(0.0), 1.0);
    }

    #[test]
    fn test_matches_exp() {
        let table = GaussianTable::new(200.0);
        for x in [50.0f32, 200.0, 500.0, 1000.0] {
            let expected = (-0.5 * (x as f64 / 200.0) * (x as f64 / 200.0)).exp();
            assert_relative_eq!(table.value(x), expected, epsilon = 1e-2);
        }
    }

    #[test]
    fn test_clamps_out_of_range() {
        let table = GaussianTable::new(200.0);
        let far = table.value(1e9);
        assert!(far < 1e-10, "far displacement should score ~0: {}", far);
    }

    #[test]
    fn test_monotonically_decreasing() {
        let table = GaussianTable::new(150.0);
        let mut last = f64::MAX;
        for x in (0..2000).step_by(100) {
            let v = table.value(x as f32);
            assert!(v <= last);
            last = v;
        }
    }
}
