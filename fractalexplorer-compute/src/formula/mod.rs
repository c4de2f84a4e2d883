//! Runtime formula evaluator for custom iteration functions.
//!
//! A formula is compiled once into either a closed-form fast path or an
//! expression tree. Compiled formulas are immutable and shared between worker
//! threads through [`FormulaCache`]. Evaluation never fails: malformed
//! formulas and invalid results fall back to `z² + c`.

mod fast_path;
mod functions;
mod normalize;
mod parser;

use fractalexplorer_core::Complex;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use thiserror::Error;

pub use fast_path::FastPath;
pub use functions::Func;
pub use normalize::{adds_c, extract_power, normalize, preprocess_fractal_names};
pub use parser::{parse, BinOp, Expr, Var};

/// Results with a component magnitude above this are rejected.
const MAX_RESULT_MAGNITUDE: f64 = 1e50;

/// Cache size at which every entry is evicted.
const MAX_CACHED_FORMULAS: usize = 64;

/// Sample points used to validate a formula.
const VALIDATION_Z: [Complex; 4] = [
    Complex::new(0.5, 0.3),
    Complex::new(-0.2, 0.7),
    Complex::new(0.1, -0.1),
    Complex::new(1.0, 0.0),
];
const VALIDATION_C: Complex = Complex::new(-0.4, 0.6);

/// Reasons a formula fails to compile.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormulaError {
    #[error("Formula is empty")]
    Empty,

    #[error("Unexpected character {found:?} at position {pos}")]
    UnexpectedChar { pos: usize, found: char },

    #[error("Unexpected end of formula")]
    UnexpectedEnd,

    #[error("Unbalanced parentheses")]
    UnbalancedParens,

    #[error("Unknown identifier: {0}")]
    UnknownIdentifier(String),

    #[error("Division by literal zero")]
    DivisionByZeroLiteral,

    #[error("Unexpected input at position {0}")]
    TrailingInput(usize),

    #[error("Invalid number: {0}")]
    InvalidNumber(String),
}

#[derive(Clone, Debug, PartialEq)]
enum Program {
    Fast(FastPath),
    Tree(Expr),
    Fallback,
}

/// A formula ready for evaluation.
#[derive(Clone, Debug)]
pub struct CompiledFormula {
    source: String,
    normalized: String,
    program: Program,
    power: f64,
    adds_c: bool,
}

impl CompiledFormula {
    /// Compile a formula, failing on malformed input.
    pub fn try_compile(source: &str) -> Result<Self, FormulaError> {
        let expanded = preprocess_fractal_names(source);
        let normalized = normalize(&expanded);
        if normalized.is_empty() {
            return Err(FormulaError::Empty);
        }
        let program = match FastPath::identify(&normalized) {
            Some(path) => Program::Fast(path),
            None => Program::Tree(parse(&normalized)?),
        };
        Ok(Self {
            source: source.to_string(),
            power: extract_power(&normalized),
            adds_c: adds_c(&normalized),
            normalized,
            program,
        })
    }

    /// Compile a formula; malformed input compiles to `z² + c`.
    pub fn compile(source: &str) -> Self {
        Self::try_compile(source).unwrap_or_else(|err| {
            log::warn!("Formula {:?} falls back to z**2+c: {}", source, err);
            Self {
                source: source.to_string(),
                normalized: FastPath::Square.formula().to_string(),
                program: Program::Fallback,
                power: 2.0,
                adds_c: true,
            }
        })
    }

    /// Next iterate. Never panics; invalid results become `z² + c`.
    #[inline]
    pub fn evaluate(&self, z: Complex, c: Complex) -> Complex {
        let next = self.evaluate_unchecked(z, c);
        if is_valid_result(next) {
            next
        } else {
            z.square() + c
        }
    }

    #[inline]
    fn evaluate_unchecked(&self, z: Complex, c: Complex) -> Complex {
        match &self.program {
            Program::Fast(path) => path.eval(z, c),
            Program::Tree(expr) => expr.eval(z, c),
            Program::Fallback => z.square() + c,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Text after name expansion and normalization.
    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    /// Exponent used for smooth iteration counts.
    pub fn power(&self) -> f64 {
        self.power
    }

    /// Whether the formula adds `c`; otherwise iteration starts at `c`.
    pub fn adds_c(&self) -> bool {
        self.adds_c
    }

    pub fn fast_path(&self) -> Option<FastPath> {
        match self.program {
            Program::Fast(path) => Some(path),
            _ => None,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.program == Program::Fallback
    }
}

#[inline]
fn is_valid_result(v: Complex) -> bool {
    v.is_finite() && v.re.abs() <= MAX_RESULT_MAGNITUDE && v.im.abs() <= MAX_RESULT_MAGNITUDE
}

/// Whether a formula compiles and yields bounded values at the sample points.
pub fn is_valid_formula(formula: &str) -> bool {
    match CompiledFormula::try_compile(formula) {
        Ok(compiled) => VALIDATION_Z
            .iter()
            .all(|z| is_valid_result(compiled.evaluate_unchecked(*z, VALIDATION_C))),
        Err(_) => false,
    }
}

/// Shared cache of compiled formulas keyed by the raw formula text.
#[derive(Debug, Default)]
pub struct FormulaCache {
    entries: RwLock<HashMap<String, Arc<CompiledFormula>>>,
}

impl FormulaCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiled form of `formula`, compiling on first use.
    pub fn get(&self, formula: &str) -> Arc<CompiledFormula> {
        {
            let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
            if let Some(compiled) = entries.get(formula) {
                return Arc::clone(compiled);
            }
        }

        let compiled = Arc::new(CompiledFormula::compile(formula));
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        if entries.len() >= MAX_CACHED_FORMULAS {
            log::debug!("Formula cache full, evicting {} entries", entries.len());
            entries.clear();
        }
        Arc::clone(
            entries
                .entry(formula.to_string())
                .or_insert_with(|| Arc::clone(&compiled)),
        )
    }

    /// Evaluate `formula` once. Prefer holding the result of [`get`](Self::get)
    /// inside loops.
    pub fn evaluate(&self, formula: &str, z: Complex, c: Complex) -> Complex {
        self.get(formula).evaluate(z, c)
    }

    pub fn len(&self) -> usize {
        self.entries.read().map_or(0, |e| e.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}
