//! Exterior distance estimation for the quadratic Mandelbrot and Julia sets.

use fractalexplorer_core::Complex;

/// Bailout for distance estimation, compared against `|z|²`.
const DISTANCE_BAILOUT: f64 = 1e10;

/// Distance from a point to the set boundary, from `|z| ln|z| / |dz|`.
pub struct DistanceEstimator;

impl DistanceEstimator {
    /// Estimate for the Mandelbrot set at `c`. Interior points yield 0.
    pub fn estimate(c: Complex, max_iterations: u32) -> f64 {
        Self::iterate(Complex::ZERO, Complex::ZERO, c, max_iterations, 1.0)
    }

    /// Estimate for the Julia set of `c` at `z`. Interior points yield 0.
    pub fn estimate_julia(z: Complex, c: Complex, max_iterations: u32) -> f64 {
        Self::iterate(z, Complex::ONE, c, max_iterations, 0.0)
    }

    /// Whether a pixel straddles the boundary and deserves extra samples.
    pub fn needs_more_samples(distance: f64, pixel_size: f64) -> bool {
        distance > 0.0 && distance < pixel_size * 2.0
    }

    // dz <- 2 z dz + offset, with offset 1 for parameter space and 0 for Julia sets
    fn iterate(mut z: Complex, mut dz: Complex, c: Complex, max_iterations: u32, offset: f64) -> f64 {
        for _ in 0..max_iterations {
            dz = (z * dz).scale(2.0) + Complex::new(offset, 0.0);
            z = z.square() + c;

            let norm_sqr = z.norm_sqr();
            if norm_sqr > DISTANCE_BAILOUT {
                let mag = norm_sqr.sqrt();
                let dz_mag = dz.norm();
                return if dz_mag > 0.0 {
                    mag * mag.ln() / dz_mag
                } else {
                    0.0
                };
            }
        }
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interior_point_has_zero_distance() {
        assert_eq!(DistanceEstimator::estimate(Complex::new(-0.5, 0.0), 500), 0.0);
        assert_eq!(
            DistanceEstimator::estimate_julia(Complex::ZERO, Complex::new(-0.5, 0.0), 500),
            0.0
        );
    }

    #[test]
    fn distance_grows_away_from_the_set() {
        let near = DistanceEstimator::estimate(Complex::new(0.3, 0.0), 500);
        let far = DistanceEstimator::estimate(Complex::new(1.5, 0.0), 500);
        assert!(near > 0.0);
        assert!(far > near);
    }

    #[test]
    fn estimate_is_within_factor_of_true_distance() {
        // The set meets the positive real axis at 0.25
        let d = DistanceEstimator::estimate(Complex::new(0.5, 0.0), 1000);
        assert!(d > 0.25 / 8.0 && d < 0.25 * 4.0, "d = {}", d);
    }

    #[test]
    fn needs_more_samples_only_near_boundary() {
        assert!(DistanceEstimator::needs_more_samples(0.001, 0.01));
        assert!(!DistanceEstimator::needs_more_samples(0.05, 0.01));
        assert!(!DistanceEstimator::needs_more_samples(0.0, 0.01));
    }
}
