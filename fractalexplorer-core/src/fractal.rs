//! Fractal registry.
//!
//! Every supported fractal family with its static metadata, plus the caller's
//! choice of family, Julia constant and custom formula. The Y-flip rule that
//! keeps the abs-based families right side up lives here so that rendering,
//! point classification and orbit queries agree on it.

use crate::Complex;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FractalKind {
    #[default]
    Mandelbrot,
    BurningShip,
    Tricorn,
    Buffalo,
    Celtic,
    Perpendicular,
    PerpendicularCeltic,
    Phoenix,
    Plume,
    Sine,
    Magnet,
    Cosh,
    Sfx,
    Henon,
    Duffing,
    Ikeda,
    Chirikov,
    Custom,
}

/// Static metadata for a fractal family.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FractalInfo {
    /// Human-readable name for UI display
    pub display_name: &'static str,
    /// Formula text for UI display
    pub formula: &'static str,
    /// Exponent used for smooth iteration counts
    pub power: f64,
    /// Escape threshold, compared against |z|²
    pub escape_radius: f64,
    pub default_center: (f64, f64),
    pub default_zoom: f64,
    /// Iterates on the conjugated point so the figure renders right side up
    pub needs_y_flip: bool,
    /// Two-dimensional map (strange attractor) rather than a polynomial iteration
    pub is_map: bool,
    /// Hausdorff dimension of the boundary or attractor
    pub hausdorff_dimension: f64,
}

const fn escape_time(
    display_name: &'static str,
    formula: &'static str,
    hausdorff_dimension: f64,
) -> FractalInfo {
    FractalInfo {
        display_name,
        formula,
        power: 2.0,
        escape_radius: 256.0,
        default_center: (-0.5, 0.0),
        default_zoom: 0.5,
        needs_y_flip: false,
        is_map: false,
        hausdorff_dimension,
    }
}

const fn map(display_name: &'static str, formula: &'static str, hausdorff_dimension: f64) -> FractalInfo {
    FractalInfo {
        display_name,
        formula,
        power: 2.0,
        escape_radius: 1000.0,
        default_center: (0.0, 0.0),
        default_zoom: 0.15,
        needs_y_flip: false,
        is_map: true,
        hausdorff_dimension,
    }
}

const MANDELBROT: FractalInfo = escape_time("Mandelbrot", "z² + c", 2.0);
const BURNING_SHIP: FractalInfo = FractalInfo {
    needs_y_flip: true,
    ..escape_time("Burning Ship", "(|Re|+i|Im|)² + c", 2.0)
};
const TRICORN: FractalInfo = escape_time("Tricorn", "conj(z)² + c", 2.0);
const BUFFALO: FractalInfo = escape_time("Buffalo", "(|Re|+iIm)² + c", 2.0);
const CELTIC: FractalInfo = escape_time("Celtic", "|Re(z²)|+iIm(z²) + c", 2.0);
const PERPENDICULAR: FractalInfo = FractalInfo {
    needs_y_flip: true,
    ..escape_time("Perpendicular", "(Re+i|Im|)² + c", 2.0)
};
const PERPENDICULAR_CELTIC: FractalInfo = FractalInfo {
    needs_y_flip: true,
    ..escape_time("Perp Celtic", "Perp + Celtic", 2.0)
};
const PHOENIX: FractalInfo = escape_time("Phoenix", "z² + c + p·z_prev", 2.0);
const PLUME: FractalInfo = FractalInfo {
    escape_radius: 100.0,
    default_center: (0.0, 0.0),
    default_zoom: 0.15,
    ..escape_time("Plume", "z²/(1+|z|) + c", 1.9)
};
const SINE: FractalInfo = FractalInfo {
    escape_radius: 50.0,
    ..escape_time("Sine", "sin(z) + c", 2.0)
};
const MAGNET: FractalInfo = FractalInfo {
    escape_radius: 100.0,
    default_center: (1.5, 0.0),
    default_zoom: 0.2,
    ..escape_time("Magnet", "((z²+c-1)/(2z+c-2))²", 2.0)
};
const COSH: FractalInfo = FractalInfo {
    escape_radius: 50.0,
    default_center: (0.0, 0.0),
    ..escape_time("Cosh", "cosh(z) + c", 2.0)
};
const SFX: FractalInfo = FractalInfo {
    power: 3.0,
    escape_radius: 100.0,
    default_center: (0.0, 0.0),
    default_zoom: 0.3,
    ..escape_time("SFX", "z·|z|² - z·c²", 1.8)
};
const HENON: FractalInfo = map("Hénon", "x→1-cx²+y, y→bx", 1.261);
const DUFFING: FractalInfo = map("Duffing", "x→y, y→-bx+ay-y³", 1.4);
const IKEDA: FractalInfo = map("Ikeda", "rotation map", 1.7);
const CHIRIKOV: FractalInfo = map("Chirikov", "y→y+k·sin(x), x→x+y", 1.5);
const CUSTOM: FractalInfo = escape_time("Custom", "User defined", 2.0);

impl FractalKind {
    pub const ALL: [FractalKind; 18] = [
        FractalKind::Mandelbrot,
        FractalKind::BurningShip,
        FractalKind::Tricorn,
        FractalKind::Buffalo,
        FractalKind::Celtic,
        FractalKind::Perpendicular,
        FractalKind::PerpendicularCeltic,
        FractalKind::Phoenix,
        FractalKind::Plume,
        FractalKind::Sine,
        FractalKind::Magnet,
        FractalKind::Cosh,
        FractalKind::Sfx,
        FractalKind::Henon,
        FractalKind::Duffing,
        FractalKind::Ikeda,
        FractalKind::Chirikov,
        FractalKind::Custom,
    ];

    pub fn info(self) -> &'static FractalInfo {
        match self {
            FractalKind::Mandelbrot => &MANDELBROT,
            FractalKind::BurningShip => &BURNING_SHIP,
            FractalKind::Tricorn => &TRICORN,
            FractalKind::Buffalo => &BUFFALO,
            FractalKind::Celtic => &CELTIC,
            FractalKind::Perpendicular => &PERPENDICULAR,
            FractalKind::PerpendicularCeltic => &PERPENDICULAR_CELTIC,
            FractalKind::Phoenix => &PHOENIX,
            FractalKind::Plume => &PLUME,
            FractalKind::Sine => &SINE,
            FractalKind::Magnet => &MAGNET,
            FractalKind::Cosh => &COSH,
            FractalKind::Sfx => &SFX,
            FractalKind::Henon => &HENON,
            FractalKind::Duffing => &DUFFING,
            FractalKind::Ikeda => &IKEDA,
            FractalKind::Chirikov => &CHIRIKOV,
            FractalKind::Custom => &CUSTOM,
        }
    }

    /// Look up a family by display name. Unknown names yield Mandelbrot.
    pub fn from_display_name(name: &str) -> Self {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.info().display_name == name)
            .unwrap_or(FractalKind::Mandelbrot)
    }

    /// Display names for a family picker. Custom is excluded.
    pub fn display_names() -> Vec<&'static str> {
        Self::ALL
            .iter()
            .filter(|kind| **kind != FractalKind::Custom)
            .map(|kind| kind.info().display_name)
            .collect()
    }

    pub fn is_map(self) -> bool {
        self.info().is_map
    }

    pub fn needs_y_flip(self) -> bool {
        self.info().needs_y_flip
    }
}

/// Starting state of one iteration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Seed {
    pub z0: Complex,
    pub c: Complex,
}

/// The caller's fractal selection.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FractalParams {
    pub kind: FractalKind,
    /// Julia constant; `Some` selects Julia mode
    #[serde(default)]
    pub julia: Option<Complex>,
    /// Formula text for `FractalKind::Custom`
    #[serde(default)]
    pub formula: Option<String>,
}

impl FractalParams {
    pub fn new(kind: FractalKind) -> Self {
        Self {
            kind,
            julia: None,
            formula: None,
        }
    }

    pub fn julia(kind: FractalKind, c: Complex) -> Self {
        Self {
            kind,
            julia: Some(c),
            formula: None,
        }
    }

    pub fn custom(formula: impl Into<String>) -> Self {
        Self {
            kind: FractalKind::Custom,
            julia: None,
            formula: Some(formula.into()),
        }
    }

    pub fn is_julia(&self) -> bool {
        self.julia.is_some()
    }

    /// Convert a world point into the iteration's starting state.
    ///
    /// Standard mode iterates from `z0 = 0` with `c = point`; SFX and the maps
    /// start at the point itself. Julia mode starts at the point with the Julia
    /// constant as `c`. Y-flipped families see the conjugated point. Custom
    /// formulas that do not add `c` start at `c`; that choice is left to the
    /// formula evaluator, which knows the formula.
    pub fn seed(&self, world: Complex) -> Seed {
        let point = self.to_screen(world);
        match self.julia {
            Some(c) => Seed { z0: point, c },
            None => {
                let z0 = if self.kind == FractalKind::Sfx || self.kind.is_map() {
                    point
                } else {
                    Complex::ZERO
                };
                Seed { z0, c: point }
            }
        }
    }

    /// Map an iterate back into screen orientation.
    ///
    /// Conjugation is its own inverse, so the same function maps screen points
    /// into iteration space.
    pub fn to_screen(&self, z: Complex) -> Complex {
        if self.kind.needs_y_flip() {
            z.conj()
        } else {
            z
        }
    }
}
