//! Named functions available inside formulas.

use fractalexplorer_core::Complex;

/// Squared magnitude below which a logarithm argument counts as zero.
pub(crate) const LOG_EPSILON: f64 = 1e-30;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Func {
    Sin,
    Cos,
    Tan,
    Sec,
    Csc,
    Cot,
    Asin,
    Acos,
    Atan,
    Sinh,
    Cosh,
    Tanh,
    Sech,
    Csch,
    Coth,
    Asinh,
    Acosh,
    Atanh,
    Exp,
    Ln,
    Log10,
    Log2,
    Sqrt,
    Cbrt,
    Abs,
    Arg,
    Conj,
    Re,
    Im,
    Floor,
    Ceil,
    Round,
    Sign,
    Step,
}

/// Function names, longest first so that prefixes never shadow longer names.
pub(crate) const FUNCTION_NAMES: &[(&str, Func)] = &[
    ("log10", Func::Log10),
    ("asinh", Func::Asinh),
    ("acosh", Func::Acosh),
    ("atanh", Func::Atanh),
    ("floor", Func::Floor),
    ("round", Func::Round),
    ("sinh", Func::Sinh),
    ("cosh", Func::Cosh),
    ("tanh", Func::Tanh),
    ("sech", Func::Sech),
    ("csch", Func::Csch),
    ("coth", Func::Coth),
    ("asin", Func::Asin),
    ("acos", Func::Acos),
    ("atan", Func::Atan),
    ("sqrt", Func::Sqrt),
    ("cbrt", Func::Cbrt),
    ("log2", Func::Log2),
    ("norm", Func::Abs),
    ("conj", Func::Conj),
    ("real", Func::Re),
    ("imag", Func::Im),
    ("ceil", Func::Ceil),
    ("sign", Func::Sign),
    ("step", Func::Step),
    ("sin", Func::Sin),
    ("cos", Func::Cos),
    ("tan", Func::Tan),
    ("sec", Func::Sec),
    ("csc", Func::Csc),
    ("cot", Func::Cot),
    ("exp", Func::Exp),
    ("log", Func::Ln),
    ("abs", Func::Abs),
    ("arg", Func::Arg),
    ("ln", Func::Ln),
    ("re", Func::Re),
    ("im", Func::Im),
];

impl Func {
    pub fn apply(self, z: Complex) -> Complex {
        match self {
            Func::Sin => z.sin(),
            Func::Cos => z.cos(),
            Func::Tan => z.tan(),
            Func::Sec => Complex::ONE.div(z.cos()),
            Func::Csc => Complex::ONE.div(z.sin()),
            Func::Cot => Complex::ONE.div(z.tan()),
            Func::Asin => asin(z),
            Func::Acos => acos(z),
            Func::Atan => atan(z),
            Func::Sinh => z.sinh(),
            Func::Cosh => z.cosh(),
            Func::Tanh => z.tanh(),
            Func::Sech => Complex::ONE.div(z.cosh()),
            Func::Csch => Complex::ONE.div(z.sinh()),
            Func::Coth => Complex::ONE.div(z.tanh()),
            Func::Asinh => asinh(z),
            Func::Acosh => acosh(z),
            Func::Atanh => atanh(z),
            Func::Exp => z.exp(),
            Func::Ln => ln(z),
            Func::Log10 => ln(z).scale(std::f64::consts::LOG10_E),
            Func::Log2 => ln(z).scale(std::f64::consts::LOG2_E),
            Func::Sqrt => z.sqrt(),
            Func::Cbrt => z.powf(1.0 / 3.0),
            Func::Abs => Complex::new(z.norm(), 0.0),
            Func::Arg => Complex::new(z.arg(), 0.0),
            Func::Conj => z.conj(),
            Func::Re => Complex::new(z.re, 0.0),
            Func::Im => Complex::new(z.im, 0.0),
            Func::Floor => Complex::new(z.re.floor(), z.im.floor()),
            Func::Ceil => Complex::new(z.re.ceil(), z.im.ceil()),
            Func::Round => Complex::new(z.re.round(), z.im.round()),
            Func::Sign => Complex::new(signum(z.re), signum(z.im)),
            Func::Step => Complex::new(step(z.re), step(z.im)),
        }
    }
}

/// Sign with `sign(0) = 0`.
#[inline]
fn signum(v: f64) -> f64 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        v
    }
}

#[inline]
fn step(v: f64) -> f64 {
    if v >= 0.0 {
        1.0
    } else {
        0.0
    }
}

/// Natural logarithm, zero for a near-zero argument.
#[inline]
pub(crate) fn ln(z: Complex) -> Complex {
    if z.norm_sqr() < LOG_EPSILON {
        Complex::ZERO
    } else {
        z.ln()
    }
}

/// ln(w) scaled by `factor`, zero for a near-zero `w`.
#[inline]
fn scaled_ln(w: Complex, factor: Complex) -> Complex {
    if w.norm_sqr() < LOG_EPSILON {
        Complex::ZERO
    } else {
        factor * w.ln()
    }
}

// asin(z) = -i ln(iz + sqrt(1 - z²))
fn asin(z: Complex) -> Complex {
    let sum = Complex::I * z + (Complex::ONE - z.square()).sqrt();
    scaled_ln(sum, -Complex::I)
}

// acos(z) = -i ln(z + sqrt(z² - 1))
fn acos(z: Complex) -> Complex {
    let sum = z + (z.square() - Complex::ONE).sqrt();
    scaled_ln(sum, -Complex::I)
}

// atan(z) = i/2 ln((1 - iz) / (1 + iz))
fn atan(z: Complex) -> Complex {
    let iz = Complex::I * z;
    let den = Complex::ONE + iz;
    if den.norm_sqr() < LOG_EPSILON {
        return Complex::ZERO;
    }
    scaled_ln((Complex::ONE - iz).div(den), Complex::new(0.0, 0.5))
}

// asinh(z) = ln(z + sqrt(z² + 1))
fn asinh(z: Complex) -> Complex {
    ln(z + (z.square() + Complex::ONE).sqrt())
}

// acosh(z) = ln(z + sqrt(z² - 1))
fn acosh(z: Complex) -> Complex {
    ln(z + (z.square() - Complex::ONE).sqrt())
}

// atanh(z) = 1/2 ln((1 + z) / (1 - z))
fn atanh(z: Complex) -> Complex {
    let den = Complex::ONE - z;
    if den.norm_sqr() < LOG_EPSILON {
        return Complex::ZERO;
    }
    scaled_ln((Complex::ONE + z).div(den), Complex::new(0.5, 0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Complex, b: Complex) -> bool {
        (a.re - b.re).abs() < 1e-10 && (a.im - b.im).abs() < 1e-10
    }

    #[test]
    fn names_are_sorted_longest_first() {
        for pair in FUNCTION_NAMES.windows(2) {
            assert!(pair[0].0.len() >= pair[1].0.len(), "{:?}", pair);
        }
    }

    #[test]
    fn inverse_trig_undoes_forward() {
        let z = Complex::new(0.3, 0.2);
        assert!(close(Func::Sin.apply(Func::Asin.apply(z)), z));
        assert!(close(Func::Cos.apply(Func::Acos.apply(z)), z));
        assert!(close(Func::Tan.apply(Func::Atan.apply(z)), z));
    }

    #[test]
    fn inverse_hyperbolic_undoes_forward() {
        let z = Complex::new(0.4, -0.1);
        assert!(close(Func::Sinh.apply(Func::Asinh.apply(z)), z));
        assert!(close(Func::Tanh.apply(Func::Atanh.apply(z)), z));
        let w = Complex::new(1.5, 0.2);
        assert!(close(Func::Cosh.apply(Func::Acosh.apply(w)), w));
    }

    #[test]
    fn logs_of_zero_are_zero() {
        assert_eq!(Func::Ln.apply(Complex::ZERO), Complex::ZERO);
        assert_eq!(Func::Log10.apply(Complex::ZERO), Complex::ZERO);
        assert_eq!(Func::Log2.apply(Complex::ZERO), Complex::ZERO);
    }

    #[test]
    fn log_bases_scale_natural_log() {
        let v = Func::Log10.apply(Complex::new(1000.0, 0.0));
        assert!((v.re - 3.0).abs() < 1e-12);
        let w = Func::Log2.apply(Complex::new(8.0, 0.0));
        assert!((w.re - 3.0).abs() < 1e-12);
    }

    #[test]
    fn atanh_at_pole_is_zero() {
        assert_eq!(Func::Atanh.apply(Complex::ONE), Complex::ZERO);
    }

    #[test]
    fn componentwise_rounding() {
        let z = Complex::new(1.6, -2.4);
        assert_eq!(Func::Floor.apply(z), Complex::new(1.0, -3.0));
        assert_eq!(Func::Ceil.apply(z), Complex::new(2.0, -2.0));
        assert_eq!(Func::Round.apply(z), Complex::new(2.0, -2.0));
        assert_eq!(Func::Sign.apply(z), Complex::new(1.0, -1.0));
        assert_eq!(Func::Step.apply(z), Complex::new(1.0, 0.0));
    }

    #[test]
    fn abs_and_arg_are_real() {
        let z = Complex::new(3.0, 4.0);
        assert_eq!(Func::Abs.apply(z), Complex::new(5.0, 0.0));
        assert_eq!(Func::Arg.apply(Complex::I).re, std::f64::consts::FRAC_PI_2);
    }

    #[test]
    fn reciprocal_trig_matches_division() {
        let z = Complex::new(0.7, 0.1);
        assert!(close(Func::Sec.apply(z), Complex::ONE.div(z.cos())));
        assert!(close(Func::Coth.apply(z), Complex::ONE.div(z.tanh())));
    }
}
