//! Reference orbit computation for perturbation rendering.
//!
//! Computes the orbit of one anchor point at high precision using BigFloat,
//! storing the results as f64 for fast delta iterations.

use fractalexplorer_core::{digits_to_bits, BigFloat};

/// Hard cap on stored orbit points.
pub const MAX_ORBIT_LEN: usize = 500_000;

/// Reference iteration stops after storing a point with `|Z|²` above this.
const REFERENCE_ESCAPE_NORM_SQR: f64 = 1e10;

/// A pre-computed reference orbit for perturbation rendering.
///
/// Immutable after construction; renders share it through `Arc`.
#[derive(Clone, Debug)]
pub struct ReferenceOrbit {
    anchor: (BigFloat, BigFloat),
    anchor_f64: (f64, f64),
    /// Orbit values Z_n as f64, starting with Z_0 = 0
    orbit: Vec<(f64, f64)>,
    precision_digits: usize,
    precision_bits: usize,
    /// Index of the first stored point beyond the escape radius
    escaped_at: Option<u32>,
}

impl ReferenceOrbit {
    /// Compute the orbit of `anchor` with `digits` decimal digits of precision.
    ///
    /// Stores at most `min(max_iterations + 1, 500_000)` points.
    pub fn compute(anchor: &(BigFloat, BigFloat), max_iterations: u32, digits: usize) -> Self {
        Self::compute_capped(anchor, max_iterations, digits, MAX_ORBIT_LEN)
    }

    /// Same as [`compute`](Self::compute) with a caller-supplied length cap.
    pub fn compute_capped(
        anchor: &(BigFloat, BigFloat),
        max_iterations: u32,
        digits: usize,
        max_len: usize,
    ) -> Self {
        let precision = digits_to_bits(digits);
        let anchor = (anchor.0.to_precision(precision), anchor.1.to_precision(precision));
        let len_cap = (max_iterations as usize).saturating_add(1).min(max_len.max(1));
        let mut orbit = Vec::with_capacity(len_cap);

        let mut x = BigFloat::zero(precision);
        let mut y = BigFloat::zero(precision);
        let mut escaped_at = None;

        for n in 0..len_cap {
            let point = (x.to_f64(), y.to_f64());
            orbit.push(point);

            if point.0 * point.0 + point.1 * point.1 > REFERENCE_ESCAPE_NORM_SQR {
                escaped_at = Some(n as u32);
                break;
            }

            // z = z^2 + c
            let x_sq = x.mul(&x);
            let y_sq = y.mul(&y);
            let new_y = x.mul(&y).mul_f64(2.0).add(&anchor.1);
            x = x_sq.sub(&y_sq).add(&anchor.0);
            y = new_y;
        }

        log::debug!(
            "Reference orbit: {} points at {} digits, escaped at {:?}",
            orbit.len(),
            digits,
            escaped_at
        );

        Self {
            anchor_f64: (anchor.0.to_f64(), anchor.1.to_f64()),
            anchor,
            orbit,
            precision_digits: digits,
            precision_bits: precision,
            escaped_at,
        }
    }

    pub fn len(&self) -> usize {
        self.orbit.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orbit.is_empty()
    }

    /// Z_n as f64, or 0 outside the orbit.
    #[inline]
    pub fn point(&self, n: usize) -> (f64, f64) {
        self.orbit.get(n).copied().unwrap_or((0.0, 0.0))
    }

    pub fn points(&self) -> &[(f64, f64)] {
        &self.orbit
    }

    pub fn anchor(&self) -> &(BigFloat, BigFloat) {
        &self.anchor
    }

    pub fn anchor_f64(&self) -> (f64, f64) {
        self.anchor_f64
    }

    pub fn precision_digits(&self) -> usize {
        self.precision_digits
    }

    pub fn precision_bits(&self) -> usize {
        self.precision_bits
    }

    pub fn escaped(&self) -> bool {
        self.escaped_at.is_some()
    }

    pub fn escape_iteration(&self) -> Option<u32> {
        self.escaped_at
    }
}
