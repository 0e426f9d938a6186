//! Mathematical primitives for 2D localization.
//!
//! Functions for angle normalization, angular arithmetic and the Gaussian
//! weighting factors used by the sensor models.

use std::f32::consts::PI;

/// Normalize angle to [-π, π].
///
/// # Example
/// ```
/// use maidan_loc::core::math::normalize_angle;
/// use std::f32::consts::PI;
///
/// assert!((normalize_angle(3.0 * PI) - PI).abs() < 1e-6);
/// assert!((normalize_angle(-3.0 * PI) - (-PI)).abs() < 1e-6);
/// ```
#[inline]
pub fn normalize_angle(angle: f32) -> f32 {
    let mut a = angle % (2.0 * PI);
    if a > PI {
        a -= 2.0 * PI;
    } else if a < -PI {
        a += 2.0 * PI;
    }
    a
}

/// Shortest angular difference from angle `a` to angle `b`.
///
/// Returns the signed angle you need to add to `a` to reach `b`,
/// taking the shortest path around the circle.
#[inline]
pub fn angle_diff(a: f32, b: f32) -> f32 {
    normalize_angle(b - a)
}

/// Gaussian weighting factor for an error value.
///
/// This is the zero-mean Gaussian density at `error`, normalized by the
/// density at zero, so the result is in (0, 1] with 1 at a perfect match.
#[inline]
pub fn gaussian_factor(error: f32, sigma: f32) -> f64 {
    if sigma <= 0.0 {
        return if error == 0.0 { 1.0 } else { 0.0 };
    }
    let e = error as f64 / sigma as f64;
    (-0.5 * e * e).exp()
}

/// Distance expressed as a viewing angle.
///
/// Maps a ground distance to the angle between the vertical axis through
/// the camera and the ray to the observed point. Distance estimates from
/// bearings have errors that scale with this angle rather than with the
/// raw distance, so distance likelihoods are evaluated in this space.
#[inline]
pub fn distance_as_angle(ground_distance: f32, camera_height: f32) -> f32 {
    std::f32::consts::FRAC_PI_2 - camera_height.atan2(ground_distance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_normalize_angle_zero() {
        assert_relative_eq!(normalize_angle(0.0), 0.0);
    }

    #[test]
    fn test_normalize_angle_wrap() {
        assert_relative_eq!(normalize_angle(2.0 * PI), 0.0, epsilon = 1e-6);
        assert_relative_eq!(normalize_angle(3.0 * PI), PI, epsilon = 1e-6);
        assert_relative_eq!(normalize_angle(-3.0 * PI), -PI, epsilon = 1e-6);
    }

    #[test]
    fn test_angle_diff_crossing_pi() {
        assert_relative_eq!(angle_diff(PI - 0.1, -PI + 0.1), 0.2, epsilon = 1e-6);
        assert_relative_eq!(angle_diff(-PI + 0.1, PI - 0.1), -0.2, epsilon = 1e-6);
    }

    #[test]
    fn test_gaussian_factor_peak() {
        assert_relative_eq!(gaussian_factor(0.0, 0.2), 1.0);
    }

    #[test]
    fn test_gaussian_factor_monotonic() {
        let near = gaussian_factor(0.05, 0.2);
        let far = gaussian_factor(0.3, 0.2);
        assert!(near > far, "near {} should outweigh far {}", near, far);
        assert!(near < 1.0 && near > 0.0);
    }

    #[test]
    fn test_gaussian_factor_degenerate_sigma() {
        assert_eq!(gaussian_factor(0.0, 0.0), 1.0);
        assert_eq!(gaussian_factor(0.1, 0.0), 0.0);
    }

    #[test]
    fn test_distance_as_angle() {
        // Point directly below the camera: angle 0.
        assert_relative_eq!(distance_as_angle(0.0, 500.0), 0.0);
        // Far away: approaches π/2.
        let far = distance_as_angle(100_000.0, 500.0);
        assert!(far > 1.5, "far distance should be near π/2: {}", far);
        // Monotonically increasing in distance.
        assert!(distance_as_angle(2000.0, 500.0) > distance_as_angle(1000.0, 500.0));
    }
}
