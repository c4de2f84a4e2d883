//! Perturbation theory computation for deep Mandelbrot zoom.
//!
//! Computes one reference orbit at high precision, then uses fast delta
//! iterations for individual pixels. Pixels where the delta outgrows the
//! reference are flagged and recomputed by the glitch rebaser.

mod glitch;
mod pixel;
mod reference_orbit;

pub use glitch::{compute_direct, GlitchRebaser, GlitchedPixel, RebaseReport, RebaseStrategy};
pub use pixel::compute_pixel_perturbation;
pub use reference_orbit::{ReferenceOrbit, MAX_ORBIT_LEN};

/// Default ratio `|δ|² / |Z|²` above which a pixel is flagged glitched.
pub const DEFAULT_GLITCH_THRESHOLD: f64 = 1e3;

/// Pixel bailout, compared against `|z|²`.
pub(crate) const PERTURBATION_BAILOUT: f64 = 256.0;

#[cfg(test)]
mod tests;
