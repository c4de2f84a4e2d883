//! Orbit query for visualising the iterates of a single point.

use crate::formula::FormulaCache;
use crate::iteration::Stepper;
use fractalexplorer_core::{Complex, FractalParams};

/// Upper bound on iteration steps returned by one query.
pub const MAX_ORBIT_STEPS: usize = 200;

/// Orbits stop once `|z|²` exceeds this.
const ORBIT_ESCAPE_NORM_SQR: f64 = 1000.0;

/// Iterates of the point at `(world_x, world_y)`, in screen orientation.
///
/// The starting point is included, so at most `min(max_points, 200) + 1`
/// points are returned. Iteration stops after the first point with
/// `|z|² > 1000` or on a degenerate step.
pub fn compute_orbit(
    world_x: f64,
    world_y: f64,
    params: &FractalParams,
    max_points: usize,
    formula_cache: &FormulaCache,
) -> Vec<Complex> {
    if !world_x.is_finite() || !world_y.is_finite() {
        return Vec::new();
    }

    let stepper = Stepper::new(params, formula_cache);
    let seed = params.seed(Complex::new(world_x, world_y));
    let steps = max_points.min(MAX_ORBIT_STEPS);

    let mut z = stepper.initial(&seed);
    let mut prev = Complex::ZERO;
    let mut points = Vec::with_capacity(steps + 1);
    points.push(params.to_screen(z));

    for _ in 0..steps {
        if z.norm_sqr() > ORBIT_ESCAPE_NORM_SQR {
            break;
        }
        let Some(next) = stepper.step(z, prev, seed.c) else {
            break;
        };
        if !next.is_finite() {
            break;
        }
        prev = z;
        z = next;
        points.push(params.to_screen(z));
    }

    points
}
