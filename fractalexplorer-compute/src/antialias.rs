//! Pixel shading with optional supersampling.

use crate::config::AntiAlias;
use crate::distance::DistanceEstimator;
use crate::iteration::PointEvaluator;
use crate::palette::{average_colors, Palette};
use fractalexplorer_core::{Complex, FractalKind, ViewBounds};

/// Turns pixel positions into colours for one render.
pub struct PixelShader<'a> {
    evaluator: &'a PointEvaluator,
    bounds: ViewBounds,
    palette: &'a dyn Palette,
    anti_alias: AntiAlias,
}

impl<'a> PixelShader<'a> {
    pub fn new(
        evaluator: &'a PointEvaluator,
        bounds: ViewBounds,
        palette: &'a dyn Palette,
        anti_alias: AntiAlias,
    ) -> Self {
        Self {
            evaluator,
            bounds,
            palette,
            anti_alias,
        }
    }

    /// Iteration value at a fractional pixel position.
    #[inline]
    pub fn value_at(&self, px: f64, py: f64) -> f64 {
        let (x, y) = self.bounds.pixel_to_world(px, py);
        self.evaluator.evaluate(x, y)
    }

    /// Single sample at the pixel position, as used by preview passes.
    #[inline]
    pub fn sample(&self, px: u32, py: u32) -> u32 {
        let value = self.value_at(px as f64, py as f64);
        self.palette.color_value(value, self.evaluator.max_iterations())
    }

    /// Final colour of a pixel, supersampled when anti-aliasing asks for it.
    pub fn shade(&self, px: u32, py: u32) -> u32 {
        match self.anti_alias {
            AntiAlias::Off => self.sample(px, py),
            AntiAlias::Supersample(n) if n > 1 => self.supersample(px, py, n),
            AntiAlias::Adaptive(n) if n > 1 && self.on_boundary(px, py) => {
                self.supersample(px, py, n)
            }
            _ => self.sample(px, py),
        }
    }

    fn supersample(&self, px: u32, py: u32, level: u32) -> u32 {
        let max_iterations = self.evaluator.max_iterations();
        let mut colors = Vec::with_capacity((level * level) as usize);
        for sy in 0..level {
            for sx in 0..level {
                let ox = (sx as f64 + 0.5) / level as f64 - 0.5;
                let oy = (sy as f64 + 0.5) / level as f64 - 0.5;
                let value = self.value_at(px as f64 + ox, py as f64 + oy);
                colors.push(self.palette.color_value(value, max_iterations));
            }
        }
        average_colors(&colors)
    }

    // Only quadratic Mandelbrot and its Julia sets have a distance estimate
    fn on_boundary(&self, px: u32, py: u32) -> bool {
        let params = self.evaluator.params();
        if params.kind != FractalKind::Mandelbrot {
            return false;
        }
        let (x, y) = self.bounds.pixel_to_world(px as f64, py as f64);
        let seed = params.seed(Complex::new(x, y));
        let max_iterations = self.evaluator.max_iterations();
        let distance = if params.is_julia() {
            DistanceEstimator::estimate_julia(seed.z0, seed.c, max_iterations)
        } else {
            DistanceEstimator::estimate(seed.c, max_iterations)
        };
        DistanceEstimator::needs_more_samples(distance, self.bounds.pixel_size())
    }
}
