use crate::CoreError;
use dashu_base::{Abs, Approximation};
use dashu_float::{DBig, FBig};
use serde::{Deserialize, Serialize};

/// Arbitrary precision floating point with explicit precision enforcement
///
/// Uses f64 internally when precision_bits <= 64, FBig otherwise.
/// Every value carries its own precision; there is no process-wide context.
#[derive(Clone, Debug)]
pub struct BigFloat {
    value: BigFloatValue,
    precision_bits: usize,
}

#[derive(Clone, Debug)]
pub enum BigFloatValue {
    F64(f64),
    Arbitrary(FBig),
}

/// Number of mantissa bits needed to hold `digits` significant decimal digits.
pub fn bits_for_digits(digits: usize) -> usize {
    ((digits as f64) * std::f64::consts::LOG2_10).ceil() as usize
}

fn fbig_from_f64(val: f64, precision_bits: usize) -> FBig {
    // Non-finite input has no FBig representation; callers that care use try_from_f64
    let base = if val == 0.0 || !val.is_finite() {
        FBig::ZERO
    } else {
        FBig::try_from(val).unwrap_or(FBig::ZERO)
    };
    base.with_precision(precision_bits).value()
}

impl BigFloat {
    /// Create BigFloat from f64 with explicit precision
    ///
    /// NO DEFAULT - precision must always be specified.
    /// Non-finite input becomes zero; use [`BigFloat::try_from_f64`] to reject it.
    pub fn with_precision(val: f64, precision_bits: usize) -> Self {
        let value = if precision_bits <= 64 {
            BigFloatValue::F64(val)
        } else {
            BigFloatValue::Arbitrary(fbig_from_f64(val, precision_bits))
        };

        Self {
            value,
            precision_bits,
        }
    }

    /// Create BigFloat from f64, rejecting NaN and infinities.
    pub fn try_from_f64(val: f64, precision_bits: usize) -> Result<Self, CoreError> {
        if !val.is_finite() {
            return Err(CoreError::NonFinite("BigFloat input"));
        }
        Ok(Self::with_precision(val, precision_bits))
    }

    /// Create zero with explicit precision
    pub fn zero(precision_bits: usize) -> Self {
        Self::with_precision(0.0, precision_bits)
    }

    /// Create one with explicit precision
    pub fn one(precision_bits: usize) -> Self {
        Self::with_precision(1.0, precision_bits)
    }

    /// Get precision in bits
    pub fn precision_bits(&self) -> usize {
        self.precision_bits
    }

    /// Convert to f64 (for display, colouring and delta arithmetic)
    /// May lose precision for values requiring > 64 bits
    pub fn to_f64(&self) -> f64 {
        match &self.value {
            BigFloatValue::F64(v) => *v,
            BigFloatValue::Arbitrary(v) => v.to_f64().value(),
        }
    }

    /// Create BigFloat from a decimal string with explicit precision
    ///
    /// Allows creating values beyond f64 range and resolution (e.g. "1e-1000").
    /// Conversion to binary happens in one step at the target precision.
    pub fn from_string(val: &str, precision_bits: usize) -> Result<Self, CoreError> {
        if precision_bits == 0 {
            return Err(CoreError::InvalidPrecision(precision_bits));
        }
        let trimmed = val.trim();
        let parse_err = |reason: String| CoreError::Parse {
            input: trimmed.to_string(),
            reason,
        };

        if precision_bits <= 64 {
            let f = trimmed
                .parse::<f64>()
                .map_err(|e| parse_err(e.to_string()))?;
            return Self::try_from_f64(f, precision_bits);
        }

        let dbig = trimmed
            .parse::<DBig>()
            .map_err(|e| parse_err(e.to_string()))?;
        let fbig_halfaway = match dbig.with_base_and_precision::<2>(precision_bits) {
            Approximation::Exact(v) => v,
            Approximation::Inexact(v, _) => v,
        };
        // FBig's default rounding mode is toward zero
        let fbig = fbig_halfaway.with_rounding::<dashu_float::round::mode::Zero>();
        Ok(Self {
            value: BigFloatValue::Arbitrary(fbig),
            precision_bits,
        })
    }

    /// Re-round this value to a different precision.
    pub fn to_precision(&self, precision_bits: usize) -> Self {
        if precision_bits <= 64 {
            return Self::with_precision(self.to_f64(), precision_bits);
        }
        Self {
            value: BigFloatValue::Arbitrary(self.to_fbig().with_precision(precision_bits).value()),
            precision_bits,
        }
    }

    fn binary_op(
        &self,
        other: &Self,
        fast: impl Fn(f64, f64) -> f64,
        slow: impl Fn(&FBig, &FBig) -> FBig,
    ) -> Self {
        let result_precision = self.precision_bits.max(other.precision_bits);

        let value = match (&self.value, &other.value) {
            (BigFloatValue::F64(a), BigFloatValue::F64(b)) if result_precision <= 64 => {
                BigFloatValue::F64(fast(*a, *b))
            }
            _ => BigFloatValue::Arbitrary(slow(&self.to_fbig(), &other.to_fbig())),
        };

        Self {
            value,
            precision_bits: result_precision,
        }
    }

    /// Add two BigFloats, preserving max precision
    pub fn add(&self, other: &Self) -> Self {
        self.binary_op(other, |a, b| a + b, |a, b| a + b)
    }

    /// Subtract two BigFloats, preserving max precision
    pub fn sub(&self, other: &Self) -> Self {
        self.binary_op(other, |a, b| a - b, |a, b| a - b)
    }

    /// Multiply two BigFloats, preserving max precision
    pub fn mul(&self, other: &Self) -> Self {
        self.binary_op(other, |a, b| a * b, |a, b| a * b)
    }

    /// Divide two BigFloats, preserving max precision.
    ///
    /// Division by zero yields zero instead of panicking inside FBig.
    pub fn div(&self, other: &Self) -> Self {
        if other.is_zero() {
            return Self::zero(self.precision_bits.max(other.precision_bits));
        }
        self.binary_op(other, |a, b| a / b, |a, b| a / b)
    }

    /// Multiply by a small integer factor (2 for the doubling in z²).
    pub fn mul_f64(&self, factor: f64) -> Self {
        self.mul(&Self::with_precision(factor, self.precision_bits))
    }

    /// Negation
    pub fn neg(&self) -> Self {
        let value = match &self.value {
            BigFloatValue::F64(v) => BigFloatValue::F64(-v),
            BigFloatValue::Arbitrary(v) => BigFloatValue::Arbitrary(-v.clone()),
        };
        Self {
            value,
            precision_bits: self.precision_bits,
        }
    }

    /// Absolute value
    pub fn abs(&self) -> Self {
        let value = match &self.value {
            BigFloatValue::F64(v) => BigFloatValue::F64(v.abs()),
            BigFloatValue::Arbitrary(v) => BigFloatValue::Arbitrary(v.clone().abs()),
        };
        Self {
            value,
            precision_bits: self.precision_bits,
        }
    }

    pub fn is_zero(&self) -> bool {
        match &self.value {
            BigFloatValue::F64(v) => *v == 0.0,
            BigFloatValue::Arbitrary(v) => *v == <FBig>::ZERO,
        }
    }

    /// Convert to FBig for arbitrary precision operations
    fn to_fbig(&self) -> FBig {
        match &self.value {
            BigFloatValue::F64(v) => fbig_from_f64(*v, self.precision_bits.max(1)),
            BigFloatValue::Arbitrary(v) => v.clone(),
        }
    }
}

impl PartialEq for BigFloat {
    fn eq(&self, other: &Self) -> bool {
        match (&self.value, &other.value) {
            (BigFloatValue::F64(a), BigFloatValue::F64(b)) => a == b,
            _ => self.to_fbig() == other.to_fbig(),
        }
    }
}

impl PartialOrd for BigFloat {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        match (&self.value, &other.value) {
            (BigFloatValue::F64(a), BigFloatValue::F64(b)) => a.partial_cmp(b),
            _ => self.to_fbig().partial_cmp(&other.to_fbig()),
        }
    }
}

impl std::fmt::Display for BigFloat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.value {
            BigFloatValue::F64(v) => write!(f, "{}", v),
            BigFloatValue::Arbitrary(v) => write!(f, "{}", v),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct BigFloatSerde {
    value: String,
    precision_bits: usize,
}

impl Serialize for BigFloat {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        BigFloatSerde {
            value: self.to_string(),
            precision_bits: self.precision_bits,
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for BigFloat {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let serde = BigFloatSerde::deserialize(deserializer)?;

        let value = if serde.precision_bits <= 64 {
            let f = serde
                .value
                .parse::<f64>()
                .map_err(|e| serde::de::Error::custom(format!("Failed to parse f64: {}", e)))?;
            BigFloatValue::F64(f)
        } else {
            let fbig = serde
                .value
                .parse::<FBig>()
                .map_err(|e| serde::de::Error::custom(format!("Failed to parse FBig: {}", e)))?;
            BigFloatValue::Arbitrary(fbig)
        };

        Ok(BigFloat {
            value,
            precision_bits: serde.precision_bits,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bits_for_fifty_digits() {
        // 50 * log2(10) = 166.09
        assert_eq!(bits_for_digits(50), 167);
        assert_eq!(bits_for_digits(500), 1661);
    }

    #[test]
    fn abs_returns_positive_for_negative_value() {
        let neg = BigFloat::with_precision(-5.0, 64);
        assert_eq!(neg.abs().to_f64(), 5.0);
    }

    #[test]
    fn abs_preserves_precision() {
        let neg = BigFloat::with_precision(-5.0, 256);
        assert_eq!(neg.abs().precision_bits(), 256);
    }

    #[test]
    fn neg_flips_sign_at_arbitrary_precision() {
        let v = BigFloat::from_string("0.125", 256).unwrap();
        assert_eq!(v.neg().to_f64(), -0.125);
    }

    #[test]
    fn from_string_resolves_offsets_below_f64_epsilon() {
        let a = BigFloat::from_string("-0.75000000000000000000001", 256).unwrap();
        let b = BigFloat::from_string("-0.75", 256).unwrap();
        let diff = a.sub(&b).to_f64();
        assert!((diff + 1e-23).abs() < 1e-30, "diff = {}", diff);
    }

    #[test]
    fn from_string_rejects_garbage() {
        let err = BigFloat::from_string("not-a-number", 256).unwrap_err();
        assert!(matches!(err, CoreError::Parse { .. }));
    }

    #[test]
    fn from_string_rejects_zero_precision() {
        assert_eq!(
            BigFloat::from_string("1.0", 0).unwrap_err(),
            CoreError::InvalidPrecision(0)
        );
    }

    #[test]
    fn try_from_f64_rejects_nan() {
        assert!(BigFloat::try_from_f64(f64::NAN, 128).is_err());
        assert!(BigFloat::try_from_f64(1.5, 128).is_ok());
    }

    #[test]
    fn with_precision_maps_non_finite_to_zero() {
        let v = BigFloat::with_precision(f64::INFINITY, 256);
        assert!(v.is_zero());
    }

    #[test]
    fn div_by_zero_yields_zero() {
        let one = BigFloat::one(256);
        let zero = BigFloat::zero(256);
        assert!(one.div(&zero).is_zero());
    }

    #[test]
    fn arithmetic_keeps_widest_precision() {
        let a = BigFloat::with_precision(1.5, 128);
        let b = BigFloat::with_precision(2.0, 512);
        let sum = a.add(&b);
        assert_eq!(sum.precision_bits(), 512);
        assert_eq!(sum.to_f64(), 3.5);
    }

    #[test]
    fn ordering_works_across_representations() {
        let small = BigFloat::with_precision(1.0, 64);
        let big = BigFloat::with_precision(2.0, 256);
        assert!(small < big);
        assert!(big.mul_f64(2.0) > big);
    }

    #[test]
    fn serde_roundtrip_preserves_value() {
        let v = BigFloat::from_string("0.1", 256).unwrap();
        let json = serde_json::to_string(&v).unwrap();
        let back: BigFloat = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v);
        assert_eq!(back.precision_bits(), 256);
    }
}
