//! Escape-time kernels for every fractal family in double precision.
//!
//! [`Stepper`] advances one iterate for a family and is shared by bulk
//! rendering, point classification and orbit queries. [`PointEvaluator`]
//! drives it to a smooth iteration value.

use crate::formula::{CompiledFormula, FormulaCache};
use fractalexplorer_core::{Complex, FractalKind, FractalParams, Seed};
use std::sync::Arc;

/// Weight of the previous iterate in the Phoenix recurrence.
pub const PHOENIX_P: f64 = 0.5667;

/// Brent checkpoint distance below which an orbit counts as periodic.
const PERIODICITY_EPSILON: f64 = 1e-18;

/// Longest checkpoint interval of the periodicity check.
const MAX_PERIOD: u32 = 512;

/// Magnet denominators smaller than this end the orbit as interior.
const MAGNET_DEGENERATE: f64 = 1e-10;

/// Custom formula iterates beyond this bound terminate the orbit.
const CUSTOM_DIVERGENCE: f64 = 1e20;

/// Map parameters closer to zero than this use the family default.
const MAP_PARAM_EPSILON: f64 = 0.01;

/// Smooth (fractional) iteration count at escape.
///
/// `n + 1 - ln(ln|z| / ln p) / ln p` with `p = max(1.1, |power|)`. Returns `n`
/// when `|z|² <= 1` or any intermediate is not usable.
pub fn smooth_iteration(n: u32, norm_sqr: f64, power: f64) -> f64 {
    let n_f = n as f64;
    if !(norm_sqr > 1.0) {
        return n_f;
    }
    let log_power = power.abs().max(1.1).ln();
    let log_zn = norm_sqr.ln() / 2.0;
    if !(log_zn > 0.0) || !log_zn.is_finite() {
        return n_f;
    }
    let ratio = log_zn / log_power;
    if !(ratio > 0.0) {
        return n_f;
    }
    let result = n_f + 1.0 - ratio.ln() / log_power;
    if result.is_finite() {
        result
    } else {
        n_f
    }
}

/// Value of a point that never escaped after `steps` iterations.
///
/// The fractional part encodes the mean orbit magnitude, capped below one.
pub fn interior_value(max_iterations: u32, sum_norm_sqr: f64, steps: u32) -> f64 {
    let complexity = (sum_norm_sqr / steps.max(1) as f64).sqrt() / 4.0;
    max_iterations as f64 + complexity.min(0.99)
}

#[inline]
fn param_or(value: f64, default: f64) -> f64 {
    if value.abs() < MAP_PARAM_EPSILON {
        default
    } else {
        value
    }
}

/// One-step iteration rule of a fractal family.
#[derive(Clone, Debug)]
pub struct Stepper {
    kind: FractalKind,
    formula: Option<Arc<CompiledFormula>>,
    power: f64,
    escape_radius: f64,
}

impl Stepper {
    /// Resolve the rule for `params`. A custom family without formula text
    /// iterates as Mandelbrot.
    pub fn new(params: &FractalParams, cache: &FormulaCache) -> Self {
        let formula = match (params.kind, params.formula.as_deref()) {
            (FractalKind::Custom, Some(text)) if !text.trim().is_empty() => Some(cache.get(text)),
            _ => None,
        };
        let kind = match (params.kind, &formula) {
            (FractalKind::Custom, None) => FractalKind::Mandelbrot,
            (kind, _) => kind,
        };
        let info = kind.info();
        let power = formula.as_ref().map_or(info.power, |f| f.power());
        Self {
            kind,
            formula,
            power,
            escape_radius: info.escape_radius,
        }
    }

    /// Family actually iterated.
    pub fn kind(&self) -> FractalKind {
        self.kind
    }

    /// Exponent used for smoothing.
    pub fn power(&self) -> f64 {
        self.power
    }

    /// Whether the Brent periodicity check applies.
    pub fn detects_periodicity(&self) -> bool {
        matches!(self.kind, FractalKind::Mandelbrot | FractalKind::Custom)
    }

    /// First iterate for a seed. Custom formulas that never add `c` start at `c`.
    pub fn initial(&self, seed: &Seed) -> Complex {
        match &self.formula {
            Some(f) if !f.adds_c() && seed.z0.norm_sqr() < 1e-20 => seed.c,
            _ => seed.z0,
        }
    }

    /// Whether `z` is outside the family's bailout region.
    #[inline]
    pub fn escaped(&self, z: Complex) -> bool {
        match self.kind {
            FractalKind::Sine => z.norm_sqr() > self.escape_radius || z.im.abs() > self.escape_radius,
            FractalKind::Cosh => z.re.abs() > self.escape_radius || z.im.abs() > self.escape_radius,
            _ => z.norm_sqr() > self.escape_radius,
        }
    }

    /// Next iterate, or `None` when the step is degenerate (Magnet pole).
    #[inline]
    pub fn step(&self, z: Complex, prev: Complex, c: Complex) -> Option<Complex> {
        let (zr, zi) = (z.re, z.im);
        let next = match self.kind {
            FractalKind::Mandelbrot => z.square() + c,
            FractalKind::BurningShip => Complex::new(zr.abs(), zi.abs()).square() + c,
            FractalKind::Tricorn => z.conj().square() + c,
            FractalKind::Buffalo => Complex::new(zr.abs(), zi).square() + c,
            FractalKind::Celtic => {
                let sq = z.square();
                Complex::new(sq.re.abs() + c.re, sq.im + c.im)
            }
            FractalKind::Perpendicular => Complex::new(zr, zi.abs()).square() + c,
            FractalKind::PerpendicularCeltic => {
                let azi = zi.abs();
                Complex::new((zr * zr - azi * azi).abs() + c.re, 2.0 * zr * azi + c.im)
            }
            FractalKind::Phoenix => z.square() + c + prev.scale(PHOENIX_P),
            FractalKind::Plume => z.square().scale(1.0 / (1.0 + z.norm())) + c,
            FractalKind::Sine => z.sin() + c,
            FractalKind::Magnet => {
                let num = z.square() + c - Complex::ONE;
                let den = z.scale(2.0) + c - Complex::new(2.0, 0.0);
                if den.norm_sqr() < MAGNET_DEGENERATE {
                    return None;
                }
                num.div(den).square()
            }
            FractalKind::Cosh => z.cosh() + c,
            FractalKind::Sfx => z.scale(z.norm_sqr()) - z * c.square(),
            FractalKind::Henon => {
                let b = param_or(c.im, 0.3);
                Complex::new(1.0 - c.re * zr * zr + zi, b * zr)
            }
            FractalKind::Duffing => {
                let a = param_or(c.re, 2.75);
                let b = param_or(c.im, 0.2);
                Complex::new(zi, -b * zr + a * zi - zi * zi * zi)
            }
            FractalKind::Ikeda => {
                let u = param_or(c.re, 0.9);
                let t = 0.4 - 6.0 / (1.0 + z.norm_sqr());
                let (sin_t, cos_t) = t.sin_cos();
                Complex::new(1.0 + u * (zr * cos_t - zi * sin_t), u * (zr * sin_t + zi * cos_t))
            }
            FractalKind::Chirikov => {
                let k = param_or(c.re, 0.9);
                let y = zi + k * zr.sin();
                Complex::new(zr + y, y)
            }
            FractalKind::Custom => match &self.formula {
                Some(formula) => formula.evaluate(z, c),
                None => z.square() + c,
            },
        };
        Some(next)
    }
}

/// Evaluates world points to smooth iteration values.
#[derive(Clone, Debug)]
pub struct PointEvaluator {
    params: FractalParams,
    stepper: Stepper,
    max_iterations: u32,
}

impl PointEvaluator {
    pub fn new(params: &FractalParams, max_iterations: u32, formula_cache: &FormulaCache) -> Self {
        Self {
            params: params.clone(),
            stepper: Stepper::new(params, formula_cache),
            max_iterations,
        }
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    pub fn params(&self) -> &FractalParams {
        &self.params
    }

    pub fn stepper(&self) -> &Stepper {
        &self.stepper
    }

    /// Smooth iteration value of a world point. Non-finite points yield 0.
    pub fn evaluate(&self, world_x: f64, world_y: f64) -> f64 {
        if !world_x.is_finite() || !world_y.is_finite() {
            return 0.0;
        }
        let seed = self.params.seed(Complex::new(world_x, world_y));
        self.evaluate_seed(&seed)
    }

    /// Iterate from an explicit seed (already in iteration orientation).
    pub fn evaluate_seed(&self, seed: &Seed) -> f64 {
        let stepper = &self.stepper;
        let max_iter = self.max_iterations;
        let custom = stepper.kind() == FractalKind::Custom;
        let periodic = stepper.detects_periodicity();

        let c = seed.c;
        let mut z = stepper.initial(seed);
        let mut prev = Complex::ZERO;
        let mut sum_norm_sqr = 0.0;

        let mut checkpoint = z;
        let mut period = 1;
        let mut steps_taken = 0;

        for n in 0..max_iter {
            let norm_sqr = z.norm_sqr();
            sum_norm_sqr += norm_sqr;

            if stepper.escaped(z) {
                return smooth_iteration(n, norm_sqr, stepper.power());
            }
            if custom && !(norm_sqr <= CUSTOM_DIVERGENCE) {
                return n as f64;
            }

            let next = match stepper.step(z, prev, c) {
                Some(next) => next,
                None => return interior_value(max_iter, sum_norm_sqr, n + 1),
            };
            if !next.is_finite()
                || (custom && (next.re.abs() > CUSTOM_DIVERGENCE || next.im.abs() > CUSTOM_DIVERGENCE))
            {
                return n as f64;
            }
            prev = z;
            z = next;

            if periodic {
                if (z - checkpoint).norm_sqr() < PERIODICITY_EPSILON {
                    return interior_value(max_iter, sum_norm_sqr, n + 1);
                }
                steps_taken += 1;
                if steps_taken >= period {
                    checkpoint = z;
                    steps_taken = 0;
                    period = (period * 2).min(MAX_PERIOD);
                }
            }
        }

        interior_value(max_iter, sum_norm_sqr, max_iter)
    }
}
