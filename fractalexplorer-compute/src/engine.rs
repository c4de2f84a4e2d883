//! Synchronous point queries against the current view.

use crate::cache::{CacheKey, ValueCache};
use crate::formula::FormulaCache;
use crate::iteration::PointEvaluator;
use crate::orbit::compute_orbit;
use fractalexplorer_core::{Complex, FractalParams, Viewport};
use std::sync::Arc;

/// Result of classifying one world point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Classification {
    pub value: f64,
    pub in_set: bool,
}

/// Answers `classify` and `orbit` queries for the view the caller is looking at.
///
/// Classification uses the same evaluator as bulk rendering and memoises values
/// until the view changes.
#[derive(Debug)]
pub struct FractalEngine {
    formulas: Arc<FormulaCache>,
    values: ValueCache,
    evaluator: PointEvaluator,
}

impl Default for FractalEngine {
    fn default() -> Self {
        Self::new(Arc::new(FormulaCache::new()))
    }
}

impl FractalEngine {
    /// Default Mandelbrot view at 256 iterations.
    pub fn new(formulas: Arc<FormulaCache>) -> Self {
        let params = FractalParams::default();
        let evaluator = PointEvaluator::new(&params, 256, &formulas);
        Self {
            formulas,
            values: ValueCache::new(),
            evaluator,
        }
    }

    /// Switch to a new view. Cached values survive only if nothing changed.
    pub fn set_view(&mut self, viewport: &Viewport, params: &FractalParams, max_iterations: u32) {
        let key = CacheKey {
            center: viewport.center_f64(),
            zoom: viewport.zoom,
            max_iterations,
            params: params.clone(),
        };
        if self.values.validate(&key) {
            self.evaluator = PointEvaluator::new(params, max_iterations, &self.formulas);
        }
    }

    pub fn params(&self) -> &FractalParams {
        self.evaluator.params()
    }

    pub fn max_iterations(&self) -> u32 {
        self.evaluator.max_iterations()
    }

    /// Iteration value of a world point and whether it lies in the set.
    pub fn classify(&self, world_x: f64, world_y: f64) -> Classification {
        let value = self
            .values
            .get_or_insert_with(world_x, world_y, || self.evaluator.evaluate(world_x, world_y));
        Classification {
            value,
            in_set: value >= self.evaluator.max_iterations() as f64 - 0.5,
        }
    }

    /// Iterates of a world point under `params`, in screen orientation.
    pub fn orbit(
        &self,
        world_x: f64,
        world_y: f64,
        params: &FractalParams,
        max_points: usize,
    ) -> Vec<Complex> {
        compute_orbit(world_x, world_y, params, max_points, &self.formulas)
    }

    pub fn formula_cache(&self) -> &Arc<FormulaCache> {
        &self.formulas
    }

    pub fn cached_values(&self) -> usize {
        self.values.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fractalexplorer_core::FractalKind;

    fn engine_at(kind: FractalKind, max_iterations: u32) -> FractalEngine {
        let mut engine = FractalEngine::default();
        engine.set_view(
            &Viewport::from_f64(-0.5, 0.0, 1.0, 64),
            &FractalParams::new(kind),
            max_iterations,
        );
        engine
    }

    #[test]
    fn classifies_inside_and_outside() {
        let engine = engine_at(FractalKind::Mandelbrot, 256);
        let centre = engine.classify(-0.5, 0.0);
        assert!(centre.in_set);
        assert!(centre.value >= 255.5);

        let far = engine.classify(2.0, 2.0);
        assert!(!far.in_set);
        assert!(far.value < 1.5);
    }

    #[test]
    fn repeated_queries_hit_the_cache() {
        let engine = engine_at(FractalKind::Mandelbrot, 64);
        let first = engine.classify(0.3, 0.5);
        assert_eq!(engine.cached_values(), 1);
        assert_eq!(engine.classify(0.3, 0.5), first);
        assert_eq!(engine.cached_values(), 1);
    }

    #[test]
    fn view_change_resets_cache_and_evaluator() {
        let mut engine = engine_at(FractalKind::Mandelbrot, 64);
        engine.classify(0.3, 0.5);
        engine.set_view(
            &Viewport::from_f64(-0.5, 0.0, 1.0, 64),
            &FractalParams::new(FractalKind::Mandelbrot),
            64,
        );
        assert_eq!(engine.cached_values(), 1);

        engine.set_view(
            &Viewport::from_f64(-0.5, 0.0, 1.0, 64),
            &FractalParams::new(FractalKind::Mandelbrot),
            500,
        );
        assert_eq!(engine.cached_values(), 0);
        assert_eq!(engine.max_iterations(), 500);
    }

    #[test]
    fn matches_the_point_evaluator() {
        let engine = engine_at(FractalKind::Tricorn, 200);
        let evaluator = PointEvaluator::new(&FractalParams::new(FractalKind::Tricorn), 200, &FormulaCache::new());
        for (x, y) in [(0.1, 0.2), (-1.3, 0.4), (0.8, -0.8)] {
            assert_eq!(engine.classify(x, y).value, evaluator.evaluate(x, y));
        }
    }

    #[test]
    fn deep_views_do_not_merge_neighbouring_pixels() {
        let (cx, cy) = (-0.7436438870371587, 0.13182590420531198);
        let viewport = Viewport::from_f64(cx, cy, 1e11, 128);
        let params = FractalParams::new(FractalKind::Mandelbrot);
        let mut engine = FractalEngine::default();
        engine.set_view(&viewport, &params, 2000);

        let evaluator = PointEvaluator::new(&params, 2000, &FormulaCache::new());
        let pixel = viewport.bounds(64, 48).pixel_size();
        for i in 0..8 {
            let x = cx + i as f64 * pixel;
            assert_eq!(engine.classify(x, cy).value, evaluator.evaluate(x, cy));
        }
        assert_eq!(engine.cached_values(), 8);
    }

    #[test]
    fn orbit_query_is_capped() {
        let engine = FractalEngine::default();
        let points = engine.orbit(-0.1, 0.1, &FractalParams::new(FractalKind::Mandelbrot), 1000);
        assert_eq!(points.len(), 201);
    }
}
