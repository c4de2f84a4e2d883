use crate::perturbation::{compute_direct, DEFAULT_GLITCH_THRESHOLD};
use fractalexplorer_core::{digits_to_bits, BigFloat, PixelSample};

/// Glitch threshold used by the perturbation tests
pub const TEST_GLITCH_THRESHOLD: f64 = DEFAULT_GLITCH_THRESHOLD;

/// Precision used by tests that do not exercise deep zoom
pub const TEST_DIGITS: usize = 50;

/// Anchor from f64 coordinates at test precision
pub fn anchor(re: f64, im: f64) -> (BigFloat, BigFloat) {
    let bits = digits_to_bits(TEST_DIGITS);
    (
        BigFloat::with_precision(re, bits),
        BigFloat::with_precision(im, bits),
    )
}

/// Anchor from decimal strings, for coordinates beyond f64
pub fn anchor_str(re: &str, im: &str, digits: usize) -> (BigFloat, BigFloat) {
    let bits = digits_to_bits(digits);
    (
        BigFloat::from_string(re, bits).unwrap(),
        BigFloat::from_string(im, bits).unwrap(),
    )
}

/// Arbitrary-precision value of the pixel at `delta` from `anchor`
pub fn direct(anchor: &(BigFloat, BigFloat), delta: (f64, f64), max_iter: u32) -> PixelSample {
    let bits = anchor.0.precision_bits();
    compute_direct(anchor, delta, max_iter, bits)
}
