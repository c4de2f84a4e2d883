//! Complex delta types for perturbation arithmetic.
//!
//! Provides a trait abstraction over f64 and BigFloat complex numbers,
//! enabling a single generic perturbation function with zero runtime overhead.

use crate::{BigFloat, Complex};

/// Complex number type for perturbation delta arithmetic.
///
/// Abstracts operations needed for perturbation iteration, enabling
/// a single generic implementation for f64 and BigFloat deltas.
pub trait ComplexDelta: Clone + Sized {
    /// Returns the additive identity (zero) with the same precision as self.
    fn zero(&self) -> Self;

    /// Construct from f64 real/imaginary components.
    fn from_f64_pair(re: f64, im: f64) -> Self;

    /// Extract as f64 pair for output and comparisons.
    fn to_f64_pair(&self) -> (f64, f64);

    /// Complex addition.
    fn add(&self, other: &Self) -> Self;

    /// Complex subtraction.
    fn sub(&self, other: &Self) -> Self;

    /// Complex multiplication.
    fn mul(&self, other: &Self) -> Self;

    /// Multiply by f64 scalar.
    fn scale(&self, factor: f64) -> Self;

    /// Complex square (optimized).
    fn square(&self) -> Self;

    /// Magnitude squared as f64 (for escape/rebase checks).
    fn norm_sq(&self) -> f64;
}

impl ComplexDelta for Complex {
    #[inline]
    fn zero(&self) -> Self {
        Complex::ZERO
    }

    #[inline]
    fn from_f64_pair(re: f64, im: f64) -> Self {
        Complex::new(re, im)
    }

    #[inline]
    fn to_f64_pair(&self) -> (f64, f64) {
        (self.re, self.im)
    }

    #[inline]
    fn add(&self, other: &Self) -> Self {
        Complex::add(*self, *other)
    }

    #[inline]
    fn sub(&self, other: &Self) -> Self {
        Complex::sub(*self, *other)
    }

    #[inline]
    fn mul(&self, other: &Self) -> Self {
        Complex::mul(*self, *other)
    }

    #[inline]
    fn scale(&self, factor: f64) -> Self {
        Complex::scale(*self, factor)
    }

    #[inline]
    fn square(&self) -> Self {
        Complex::square(*self)
    }

    #[inline]
    fn norm_sq(&self) -> f64 {
        self.norm_sqr()
    }
}

/// Arbitrary precision complex number.
///
/// Both components share one precision, fixed when the value is built.
#[derive(Clone, Debug, PartialEq)]
pub struct BigComplex {
    pub re: BigFloat,
    pub im: BigFloat,
}

impl BigComplex {
    /// Create a new BigComplex from BigFloat components.
    pub fn new(re: BigFloat, im: BigFloat) -> Self {
        Self { re, im }
    }

    /// Zero at the given precision.
    pub fn zero_with_precision(precision_bits: usize) -> Self {
        Self {
            re: BigFloat::zero(precision_bits),
            im: BigFloat::zero(precision_bits),
        }
    }

    /// Lift an f64 complex to the given precision.
    pub fn from_complex(z: Complex, precision_bits: usize) -> Self {
        Self {
            re: BigFloat::with_precision(z.re, precision_bits),
            im: BigFloat::with_precision(z.im, precision_bits),
        }
    }

    pub fn precision_bits(&self) -> usize {
        self.re.precision_bits().max(self.im.precision_bits())
    }

    /// Squared magnitude at full precision.
    pub fn norm_sqr(&self) -> BigFloat {
        self.re.mul(&self.re).add(&self.im.mul(&self.im))
    }

    pub fn to_complex(&self) -> Complex {
        Complex::new(self.re.to_f64(), self.im.to_f64())
    }
}

impl ComplexDelta for BigComplex {
    fn zero(&self) -> Self {
        let precision = self.re.precision_bits();
        Self {
            re: BigFloat::zero(precision),
            im: BigFloat::zero(precision),
        }
    }

    fn from_f64_pair(re: f64, im: f64) -> Self {
        // 128 bits here; perturbation builds deltas from zero() at the orbit precision
        Self {
            re: BigFloat::with_precision(re, 128),
            im: BigFloat::with_precision(im, 128),
        }
    }

    fn to_f64_pair(&self) -> (f64, f64) {
        (self.re.to_f64(), self.im.to_f64())
    }

    fn add(&self, other: &Self) -> Self {
        Self {
            re: self.re.add(&other.re),
            im: self.im.add(&other.im),
        }
    }

    fn sub(&self, other: &Self) -> Self {
        Self {
            re: self.re.sub(&other.re),
            im: self.im.sub(&other.im),
        }
    }

    fn mul(&self, other: &Self) -> Self {
        Self {
            re: self.re.mul(&other.re).sub(&self.im.mul(&other.im)),
            im: self.re.mul(&other.im).add(&self.im.mul(&other.re)),
        }
    }

    fn scale(&self, factor: f64) -> Self {
        let precision = self.re.precision_bits();
        let scale = BigFloat::with_precision(factor, precision);
        Self {
            re: self.re.mul(&scale),
            im: self.im.mul(&scale),
        }
    }

    fn square(&self) -> Self {
        Self {
            re: self.re.mul(&self.re).sub(&self.im.mul(&self.im)),
            im: self
                .re
                .mul(&self.im)
                .mul_f64(2.0),
        }
    }

    fn norm_sq(&self) -> f64 {
        self.norm_sqr().to_f64()
    }
}
