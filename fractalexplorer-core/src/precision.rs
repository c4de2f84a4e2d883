//! Precision selection for deep zoom rendering.
//!
//! Maps a zoom factor to the number of decimal digits the reference orbit
//! needs, and decides when double precision stops being sufficient.

use crate::bigfloat::bits_for_digits;

/// Zoom factor at and above which rendering switches to perturbation.
pub const PRECISION_THRESHOLD: f64 = 1e12;

/// Lower bound on reference orbit precision, in decimal digits.
pub const MIN_PRECISION_DIGITS: usize = 50;

/// Upper bound on reference orbit precision, in decimal digits. Every finite
/// f64 zoom maps below it.
pub const MAX_PRECISION_DIGITS: usize = 500;

/// Extra digits on top of the zoom magnitude.
const GUARD_DIGITS: f64 = 30.0;

/// Decimal digits needed to resolve pixels at `zoom`.
///
/// `clamp(floor(log10(zoom)) + 30, 50, 500)`. Non-finite or non-positive
/// zoom yields the minimum.
pub fn precision_digits_for_zoom(zoom: f64) -> usize {
    if !zoom.is_finite() || zoom <= 0.0 {
        return MIN_PRECISION_DIGITS;
    }
    let digits = zoom.log10().floor() + GUARD_DIGITS;
    if digits > MAX_PRECISION_DIGITS as f64 {
        log::debug!("Precision clamped to {} digits at zoom {:e}", MAX_PRECISION_DIGITS, zoom);
        return MAX_PRECISION_DIGITS;
    }
    (digits.max(0.0) as usize).max(MIN_PRECISION_DIGITS)
}

/// Mantissa bits for `digits` decimal digits.
pub fn digits_to_bits(digits: usize) -> usize {
    bits_for_digits(digits)
}

/// Whether `zoom` is beyond what f64 coordinates can resolve.
pub fn needs_arbitrary_precision(zoom: f64) -> bool {
    zoom >= PRECISION_THRESHOLD
}
