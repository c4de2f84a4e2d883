//! Generic perturbation pixel computation.
//!
//! Provides a single implementation for f64 and BigFloat delta types via the
//! `ComplexDelta` trait.

use super::{ReferenceOrbit, PERTURBATION_BAILOUT};
use crate::iteration::smooth_iteration;
use fractalexplorer_core::{ComplexDelta, PixelSample};

/// Perturbation iteration for any ComplexDelta type.
///
/// Iterates `δ' = 2·Z_n·δ + δ² + δc` against the reference orbit. A pixel is
/// flagged glitched when `|δ|²` exceeds `|Z_n|²·glitch_threshold`; iteration
/// carries on so the flagged value stays usable as a fallback.
pub fn compute_pixel_perturbation<D: ComplexDelta>(
    orbit: &ReferenceOrbit,
    delta_c: D,
    max_iterations: u32,
    glitch_threshold: f64,
) -> PixelSample {
    let orbit_len = orbit.len();
    if orbit_len == 0 {
        return PixelSample::glitched(max_iterations as f64);
    }

    let limit = (max_iterations as usize).min(orbit_len - 1);
    let mut dz = delta_c.zero();
    let mut glitched = false;
    let sample = |value: f64, glitched: bool| {
        if glitched {
            PixelSample::glitched(value)
        } else {
            PixelSample::new(value)
        }
    };

    for n in 0..limit {
        let z_n = orbit.point(n);
        let z_n_complex = D::from_f64_pair(z_n.0, z_n.1);

        // Escape check on the full value Z_n + δ_n
        let z = z_n_complex.add(&dz);
        let z_norm_sq = z.norm_sq();
        if z_norm_sq > PERTURBATION_BAILOUT {
            return sample(smooth_iteration(n as u32, z_norm_sq, 2.0), glitched);
        }

        let dz_norm_sq = dz.norm_sq();
        if !dz_norm_sq.is_finite() {
            return PixelSample::new(n as f64);
        }

        let z_n_norm_sq = z_n.0 * z_n.0 + z_n.1 * z_n.1;
        if z_n_norm_sq > 0.0 && dz_norm_sq > z_n_norm_sq * glitch_threshold {
            glitched = true;
        }

        // δz' = 2·Z_n·δz + δz² + δc
        dz = z_n_complex.mul(&dz).scale(2.0).add(&dz.square()).add(&delta_c);
    }

    if limit == max_iterations as usize || !orbit.escaped() {
        return sample(max_iterations as f64, glitched);
    }

    // Reference escaped first: continue directly in f64 from Z_last + δ
    let (last_re, last_im) = orbit.point(limit);
    let (dz_re, dz_im) = dz.to_f64_pair();
    let (dc_re, dc_im) = delta_c.to_f64_pair();
    let (anchor_re, anchor_im) = orbit.anchor_f64();
    let (c_re, c_im) = (anchor_re + dc_re, anchor_im + dc_im);
    let (mut z_re, mut z_im) = (last_re + dz_re, last_im + dz_im);

    for n in limit..max_iterations as usize {
        let norm_sq = z_re * z_re + z_im * z_im;
        if norm_sq > PERTURBATION_BAILOUT {
            return sample(smooth_iteration(n as u32, norm_sq, 2.0), glitched);
        }
        let new_re = z_re * z_re - z_im * z_im + c_re;
        z_im = 2.0 * z_re * z_im + c_im;
        z_re = new_re;
        if !z_re.is_finite() || !z_im.is_finite() {
            return PixelSample::new(n as f64);
        }
    }

    sample(max_iterations as f64, glitched)
}
