//! Glitch rebasing: recompute pixels whose perturbation result is unreliable.

use super::{compute_pixel_perturbation, ReferenceOrbit, PERTURBATION_BAILOUT};
use crate::cancellation::CancellationChecker;
use crate::iteration::smooth_iteration;
use fractalexplorer_core::{BigFloat, Complex, PixelSample};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How glitched pixels are recomputed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RebaseStrategy {
    /// Full arbitrary-precision iteration per pixel.
    #[default]
    Direct,
    /// One new reference orbit per square cell of `cell_size` pixels.
    LocalReference { cell_size: u32 },
}

/// A pixel flagged by the perturbation pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GlitchedPixel {
    pub x: u32,
    pub y: u32,
    /// Offset of the pixel from the orbit anchor
    pub delta: (f64, f64),
}

/// Summary of one rebasing pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RebaseReport {
    pub glitched: usize,
    pub corrected: usize,
    /// Pixels the local references could not fix, recomputed directly
    pub direct_fallbacks: usize,
    /// Too many glitches; nothing was recomputed
    pub skipped: bool,
}

/// Recomputes glitched pixels of one deep-zoom render.
pub struct GlitchRebaser<'a> {
    orbit: &'a ReferenceOrbit,
    max_iterations: u32,
    glitch_threshold: f64,
    strategy: RebaseStrategy,
}

impl<'a> GlitchRebaser<'a> {
    pub fn new(
        orbit: &'a ReferenceOrbit,
        max_iterations: u32,
        glitch_threshold: f64,
        strategy: RebaseStrategy,
    ) -> Self {
        Self {
            orbit,
            max_iterations,
            glitch_threshold,
            strategy,
        }
    }

    /// Recompute `glitched` in parallel on the current rayon pool.
    ///
    /// `commit` receives every corrected pixel. Nothing happens when the list is
    /// empty; when at least half of `total_pixels` are glitched the pass is
    /// skipped. Cancelled pixels are not committed.
    pub fn rebase<C, F>(
        &self,
        glitched: &[GlitchedPixel],
        total_pixels: usize,
        cancel: &C,
        commit: F,
    ) -> RebaseReport
    where
        C: CancellationChecker,
        F: Fn(&GlitchedPixel, PixelSample) + Sync,
    {
        let mut report = RebaseReport {
            glitched: glitched.len(),
            ..RebaseReport::default()
        };
        if glitched.is_empty() {
            return report;
        }
        if glitched.len() * 2 >= total_pixels {
            log::warn!(
                "Skipping glitch rebasing: {} of {} pixels glitched",
                glitched.len(),
                total_pixels
            );
            report.skipped = true;
            return report;
        }

        log::debug!(
            "Rebasing {} glitched pixels with {:?}",
            glitched.len(),
            self.strategy
        );

        match self.strategy {
            RebaseStrategy::Direct => {
                report.corrected = glitched
                    .par_iter()
                    .filter(|pixel| {
                        if cancel.is_cancelled() {
                            return false;
                        }
                        commit(*pixel, self.direct(pixel.delta));
                        true
                    })
                    .count();
            }
            RebaseStrategy::LocalReference { cell_size } => {
                let cells = group_into_cells(glitched, cell_size.max(1));
                let (corrected, fallbacks) = cells
                    .par_iter()
                    .map(|cell| self.rebase_cell(cell, cancel, &commit))
                    .reduce(|| (0, 0), |a, b| (a.0 + b.0, a.1 + b.1));
                report.corrected = corrected;
                report.direct_fallbacks = fallbacks;
            }
        }
        report
    }

    /// Arbitrary-precision value of the pixel at `delta` from the anchor.
    pub fn direct(&self, delta: (f64, f64)) -> PixelSample {
        compute_direct(self.orbit.anchor(), delta, self.max_iterations, self.orbit.precision_bits())
    }

    // Returns (corrected, direct fallbacks)
    fn rebase_cell<C, F>(&self, cell: &[GlitchedPixel], cancel: &C, commit: &F) -> (usize, usize)
    where
        C: CancellationChecker,
        F: Fn(&GlitchedPixel, PixelSample) + Sync,
    {
        if cancel.is_cancelled() {
            return (0, 0);
        }
        let Some(reference) = nearest_to_centroid(cell) else {
            return (0, 0);
        };

        let bits = self.orbit.precision_bits();
        let anchor = self.orbit.anchor();
        let local_anchor = (
            anchor.0.add(&BigFloat::with_precision(reference.delta.0, bits)),
            anchor.1.add(&BigFloat::with_precision(reference.delta.1, bits)),
        );
        let local_orbit =
            ReferenceOrbit::compute(&local_anchor, self.max_iterations, self.orbit.precision_digits());

        let mut corrected = 0;
        let mut fallbacks = 0;
        for pixel in cell {
            if cancel.is_cancelled() {
                break;
            }
            let delta = Complex::new(
                pixel.delta.0 - reference.delta.0,
                pixel.delta.1 - reference.delta.1,
            );
            let mut sample = compute_pixel_perturbation(
                &local_orbit,
                delta,
                self.max_iterations,
                self.glitch_threshold,
            );
            if sample.glitched {
                sample = self.direct(pixel.delta);
                fallbacks += 1;
            }
            commit(pixel, sample);
            corrected += 1;
        }
        (corrected, fallbacks)
    }
}

/// Iterate `z <- z² + c` at `c = anchor + delta` in BigFloat arithmetic.
///
/// Bailout `|z|² > 256`; escaping pixels get the smooth iteration count.
pub fn compute_direct(
    anchor: &(BigFloat, BigFloat),
    delta: (f64, f64),
    max_iterations: u32,
    precision_bits: usize,
) -> PixelSample {
    let c_re = anchor.0.add(&BigFloat::with_precision(delta.0, precision_bits));
    let c_im = anchor.1.add(&BigFloat::with_precision(delta.1, precision_bits));
    let mut x = BigFloat::zero(precision_bits);
    let mut y = BigFloat::zero(precision_bits);

    for n in 0..max_iterations {
        let x_sq = x.mul(&x);
        let y_sq = y.mul(&y);
        let norm_sq = x_sq.add(&y_sq).to_f64();
        if norm_sq > PERTURBATION_BAILOUT {
            return PixelSample::new(smooth_iteration(n, norm_sq, 2.0));
        }
        let new_y = x.mul(&y).mul_f64(2.0).add(&c_im);
        x = x_sq.sub(&y_sq).add(&c_re);
        y = new_y;
    }
    PixelSample::new(max_iterations as f64)
}

/// Group pixels into square cells, ordered by cell for determinism.
fn group_into_cells(pixels: &[GlitchedPixel], cell_size: u32) -> Vec<Vec<GlitchedPixel>> {
    let mut cells: HashMap<(u32, u32), Vec<GlitchedPixel>> = HashMap::new();
    for pixel in pixels {
        cells
            .entry((pixel.x / cell_size, pixel.y / cell_size))
            .or_default()
            .push(*pixel);
    }
    let mut grouped: Vec<_> = cells.into_iter().collect();
    grouped.sort_by_key(|(key, _)| (key.1, key.0));
    grouped.into_iter().map(|(_, cell)| cell).collect()
}

/// The pixel closest to the centroid of the cell's pixels.
fn nearest_to_centroid(cell: &[GlitchedPixel]) -> Option<GlitchedPixel> {
    let n = cell.len() as f64;
    let cx = cell.iter().map(|p| p.x as f64).sum::<f64>() / n;
    let cy = cell.iter().map(|p| p.y as f64).sum::<f64>() / n;
    let distance = |p: &GlitchedPixel| {
        let dx = p.x as f64 - cx;
        let dy = p.y as f64 - cy;
        dx * dx + dy * dy
    };
    cell.iter()
        .copied()
        .min_by(|a, b| distance(a).total_cmp(&distance(b)))
}
