//! Fixed precision complex arithmetic.
//!
//! `Complex` is the f64 kernel shared by the escape-time iteration, the formula
//! evaluator and the perturbation delta path. Operations that can divide by a
//! vanishing quantity return zero instead of producing infinities.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Neg, Sub};

/// Squared magnitude below which a divisor counts as zero.
const DIV_EPSILON: f64 = 1e-20;

/// Magnitude of the tan/tanh denominator below which the result is zero.
const TRIG_POLE_EPSILON: f64 = 1e-10;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Complex {
    pub re: f64,
    pub im: f64,
}

impl Complex {
    pub const ZERO: Complex = Complex { re: 0.0, im: 0.0 };
    pub const ONE: Complex = Complex { re: 1.0, im: 0.0 };
    pub const I: Complex = Complex { re: 0.0, im: 1.0 };

    #[inline]
    pub const fn new(re: f64, im: f64) -> Self {
        Self { re, im }
    }

    #[inline]
    pub fn add(self, other: Self) -> Self {
        Self::new(self.re + other.re, self.im + other.im)
    }

    #[inline]
    pub fn sub(self, other: Self) -> Self {
        Self::new(self.re - other.re, self.im - other.im)
    }

    #[inline]
    pub fn mul(self, other: Self) -> Self {
        Self::new(
            self.re * other.re - self.im * other.im,
            self.re * other.im + self.im * other.re,
        )
    }

    /// Complex division. Returns zero when `|other|² < 1e-20`.
    #[inline]
    pub fn div(self, other: Self) -> Self {
        let denom = other.norm_sqr();
        if denom < DIV_EPSILON {
            return Self::ZERO;
        }
        Self::new(
            (self.re * other.re + self.im * other.im) / denom,
            (self.im * other.re - self.re * other.im) / denom,
        )
    }

    #[inline]
    pub fn scale(self, factor: f64) -> Self {
        Self::new(self.re * factor, self.im * factor)
    }

    #[inline]
    pub fn neg(self) -> Self {
        Self::new(-self.re, -self.im)
    }

    #[inline]
    pub fn conj(self) -> Self {
        Self::new(self.re, -self.im)
    }

    #[inline]
    pub fn norm_sqr(self) -> f64 {
        self.re * self.re + self.im * self.im
    }

    #[inline]
    pub fn norm(self) -> f64 {
        self.norm_sqr().sqrt()
    }

    #[inline]
    pub fn arg(self) -> f64 {
        self.im.atan2(self.re)
    }

    #[inline]
    pub fn square(self) -> Self {
        Self::new(
            self.re * self.re - self.im * self.im,
            2.0 * self.re * self.im,
        )
    }

    #[inline]
    pub fn cube(self) -> Self {
        let re2 = self.re * self.re;
        let im2 = self.im * self.im;
        Self::new(self.re * (re2 - 3.0 * im2), self.im * (3.0 * re2 - im2))
    }

    /// Integer power by binary exponentiation.
    pub fn powi(self, n: i32) -> Self {
        if n == 0 {
            return Self::ONE;
        }
        let mut base = self;
        let mut exp = n.unsigned_abs();
        let mut result = Self::ONE;
        while exp > 0 {
            if exp & 1 == 1 {
                result = result.mul(base);
            }
            base = base.square();
            exp >>= 1;
        }
        if n < 0 {
            Self::ONE.div(result)
        } else {
            result
        }
    }

    /// Real power in polar form. Zero for a near-zero base.
    pub fn powf(self, p: f64) -> Self {
        if self.norm_sqr() < DIV_EPSILON {
            return Self::ZERO;
        }
        let r = self.norm().powf(p);
        let theta = self.arg() * p;
        Self::new(r * theta.cos(), r * theta.sin())
    }

    pub fn sin(self) -> Self {
        Self::new(
            self.re.sin() * self.im.cosh(),
            self.re.cos() * self.im.sinh(),
        )
    }

    pub fn cos(self) -> Self {
        Self::new(
            self.re.cos() * self.im.cosh(),
            -self.re.sin() * self.im.sinh(),
        )
    }

    pub fn tan(self) -> Self {
        let re2 = 2.0 * self.re;
        let im2 = 2.0 * self.im;
        let denom = re2.cos() + im2.cosh();
        if denom.abs() < TRIG_POLE_EPSILON {
            return Self::ZERO;
        }
        Self::new(re2.sin() / denom, im2.sinh() / denom)
    }

    pub fn sinh(self) -> Self {
        Self::new(
            self.re.sinh() * self.im.cos(),
            self.re.cosh() * self.im.sin(),
        )
    }

    pub fn cosh(self) -> Self {
        Self::new(
            self.re.cosh() * self.im.cos(),
            self.re.sinh() * self.im.sin(),
        )
    }

    pub fn tanh(self) -> Self {
        let re2 = 2.0 * self.re;
        let im2 = 2.0 * self.im;
        let denom = re2.cosh() + im2.cos();
        if denom.abs() < TRIG_POLE_EPSILON {
            return Self::ZERO;
        }
        Self::new(re2.sinh() / denom, im2.sin() / denom)
    }

    pub fn exp(self) -> Self {
        let r = self.re.exp();
        Self::new(r * self.im.cos(), r * self.im.sin())
    }

    /// Principal natural logarithm. `ln(0)` has a real part of -inf.
    pub fn ln(self) -> Self {
        Self::new(self.norm().ln(), self.arg())
    }

    /// Principal square root.
    pub fn sqrt(self) -> Self {
        let r = self.norm();
        if r == 0.0 {
            return Self::ZERO;
        }
        let root = r.sqrt();
        let half_theta = self.arg() / 2.0;
        Self::new(root * half_theta.cos(), root * half_theta.sin())
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.re.is_finite() && self.im.is_finite()
    }
}

impl Add for Complex {
    type Output = Complex;

    #[inline]
    fn add(self, rhs: Complex) -> Complex {
        Complex::add(self, rhs)
    }
}

impl Sub for Complex {
    type Output = Complex;

    #[inline]
    fn sub(self, rhs: Complex) -> Complex {
        Complex::sub(self, rhs)
    }
}

impl Mul for Complex {
    type Output = Complex;

    #[inline]
    fn mul(self, rhs: Complex) -> Complex {
        Complex::mul(self, rhs)
    }
}

impl Neg for Complex {
    type Output = Complex;

    #[inline]
    fn neg(self) -> Complex {
        Complex::neg(self)
    }
}

impl From<(f64, f64)> for Complex {
    fn from((re, im): (f64, f64)) -> Self {
        Self::new(re, im)
    }
}
