use crate::precision::{digits_to_bits, MIN_PRECISION_DIGITS};
use crate::{BigFloat, CoreError, FractalKind};
use serde::{Deserialize, Serialize};

/// Smallest zoom a sanitized viewport accepts.
pub const MIN_ZOOM: f64 = 0.1;

/// Largest zoom a sanitized viewport accepts.
pub const MAX_ZOOM: f64 = 1e300;

/// View state in fractal space
///
/// - `center`: Center point (x, y) with BigFloat precision
/// - `zoom`: Magnification; the visible half-height is `2 / zoom`
///
/// At deep zoom the center carries more digits than f64 can hold, while the
/// zoom itself stays comfortably inside f64 range.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub center: (BigFloat, BigFloat),
    pub zoom: f64,
}

impl Viewport {
    /// Create new viewport with BigFloat center coordinates
    pub fn with_bigfloat(center_x: BigFloat, center_y: BigFloat, zoom: f64) -> Self {
        Self {
            center: (center_x, center_y),
            zoom,
        }
    }

    /// Create new viewport from f64 values with explicit precision
    pub fn from_f64(center_x: f64, center_y: f64, zoom: f64, precision_bits: usize) -> Self {
        Self {
            center: (
                BigFloat::with_precision(center_x, precision_bits),
                BigFloat::with_precision(center_y, precision_bits),
            ),
            zoom,
        }
    }

    /// Create viewport from string coordinates (for positions beyond f64 precision)
    ///
    /// Returns an error if either coordinate cannot be parsed.
    pub fn from_strings(
        center_x: &str,
        center_y: &str,
        zoom: f64,
        precision_bits: usize,
    ) -> Result<Self, CoreError> {
        Ok(Self {
            center: (
                BigFloat::from_string(center_x, precision_bits)?,
                BigFloat::from_string(center_y, precision_bits)?,
            ),
            zoom,
        })
    }

    /// Default view of a fractal family.
    pub fn default_for(kind: FractalKind) -> Self {
        let info = kind.info();
        Self::from_f64(
            info.default_center.0,
            info.default_center.1,
            info.default_zoom,
            digits_to_bits(MIN_PRECISION_DIGITS),
        )
    }

    /// Get the precision bits of the center coordinates
    pub fn precision_bits(&self) -> usize {
        self.center.0.precision_bits().max(self.center.1.precision_bits())
    }

    pub fn center_f64(&self) -> (f64, f64) {
        (self.center.0.to_f64(), self.center.1.to_f64())
    }

    /// Whether the center and zoom are usable for rendering.
    pub fn is_finite(&self) -> bool {
        let (cx, cy) = self.center_f64();
        cx.is_finite() && cy.is_finite() && self.zoom.is_finite() && self.zoom > 0.0
    }

    /// Replace NaN state with the family's default view and clamp zoom to
    /// `[MIN_ZOOM, MAX_ZOOM]`.
    pub fn sanitized(&self, kind: FractalKind) -> Self {
        let (cx, cy) = self.center_f64();
        if cx.is_nan() || cy.is_nan() || self.zoom.is_nan() {
            log::warn!("Viewport contains NaN, resetting to default view");
            return Self::default_for(kind);
        }
        if cx.is_infinite() || cy.is_infinite() {
            log::warn!("Viewport center is infinite, resetting to default view");
            return Self::default_for(kind);
        }
        Self {
            center: self.center.clone(),
            zoom: self.zoom.clamp(MIN_ZOOM, MAX_ZOOM),
        }
    }

    /// Half-height of the visible region in fractal units.
    pub fn scale(&self) -> f64 {
        2.0 / self.zoom
    }

    /// Visible rectangle for a `width x height` image.
    pub fn bounds(&self, width: u32, height: u32) -> ViewBounds {
        let (cx, cy) = self.center_f64();
        let scale = self.scale();
        let aspect = width as f64 / height.max(1) as f64;
        ViewBounds {
            x_min: cx - scale * aspect,
            x_max: cx + scale * aspect,
            y_min: cy - scale,
            y_max: cy + scale,
            width,
            height,
            scale,
            aspect,
        }
    }
}

/// Visible rectangle of a viewport at a given image size, in f64.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewBounds {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
    pub width: u32,
    pub height: u32,
    pub scale: f64,
    pub aspect: f64,
}

impl ViewBounds {
    /// World coordinates of a (possibly fractional) pixel position.
    ///
    /// Screen rows grow downwards, world y grows upwards.
    #[inline]
    pub fn pixel_to_world(&self, px: f64, py: f64) -> (f64, f64) {
        let span_x = (self.width.max(2) - 1) as f64;
        let span_y = (self.height.max(2) - 1) as f64;
        (
            self.x_min + (self.x_max - self.x_min) * px / span_x,
            self.y_max - (self.y_max - self.y_min) * py / span_y,
        )
    }

    /// Pixel position of a world point (inverse of `pixel_to_world`).
    pub fn world_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        let span_x = (self.width.max(2) - 1) as f64;
        let span_y = (self.height.max(2) - 1) as f64;
        (
            (x - self.x_min) / (self.x_max - self.x_min) * span_x,
            (self.y_max - y) / (self.y_max - self.y_min) * span_y,
        )
    }

    /// Offset of a pixel from the view center, used as `δc` at deep zoom.
    ///
    /// Equal to `pixel_to_world(px, py) - center`, evaluated relative to the
    /// center so the offset keeps full f64 precision at any zoom.
    #[inline]
    pub fn pixel_delta(&self, px: f64, py: f64) -> (f64, f64) {
        let span_x = (self.width.max(2) - 1) as f64;
        let span_y = (self.height.max(2) - 1) as f64;
        (
            self.scale * self.aspect * (2.0 * px / span_x - 1.0),
            self.scale * (1.0 - 2.0 * py / span_y),
        )
    }

    /// Width of one pixel in fractal units.
    pub fn pixel_size(&self) -> f64 {
        (self.x_max - self.x_min) / self.width.max(1) as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ============================================================================
    // Constructor tests
    // ============================================================================

    #[test]
    fn with_bigfloat_stores_center_coordinates() {
        let center_x = BigFloat::with_precision(-0.5, 256);
        let center_y = BigFloat::with_precision(0.3, 256);

        let viewport = Viewport::with_bigfloat(center_x.clone(), center_y.clone(), 4.0);

        assert_eq!(viewport.center.0, center_x);
        assert_eq!(viewport.center.1, center_y);
        assert_eq!(viewport.zoom, 4.0);
    }

    #[test]
    fn from_f64_sets_requested_precision() {
        let viewport = Viewport::from_f64(0.0, 0.0, 1.0, 7000);

        assert_eq!(viewport.center.0.precision_bits(), 7000);
        assert_eq!(viewport.center.1.precision_bits(), 7000);
    }

    #[test]
    fn from_strings_handles_coordinates_beyond_f64() {
        let viewport = Viewport::from_strings(
            "-0.743643887037158704752191506114774",
            "0.131825904205311970493132056385139",
            1e20,
            512,
        )
        .unwrap();

        assert_eq!(viewport.precision_bits(), 512);
        let (cx, cy) = viewport.center_f64();
        assert!((cx + 0.7436438870371587).abs() < 1e-15);
        assert!((cy - 0.13182590420531197).abs() < 1e-15);
    }

    #[test]
    fn from_strings_returns_error_on_invalid_input() {
        let result = Viewport::from_strings("not_a_number", "0.0", 1.0, 128);
        assert!(matches!(result, Err(CoreError::Parse { .. })));
    }

    #[test]
    fn default_for_uses_family_metadata() {
        let viewport = Viewport::default_for(FractalKind::Magnet);
        assert_eq!(viewport.center_f64(), (1.5, 0.0));
        assert_eq!(viewport.zoom, 0.2);
    }

    // ============================================================================
    // Sanitizing tests
    // ============================================================================

    #[test]
    fn sanitized_clamps_zoom() {
        let tiny = Viewport::from_f64(0.0, 0.0, 0.001, 64).sanitized(FractalKind::Mandelbrot);
        assert_eq!(tiny.zoom, MIN_ZOOM);

        let huge = Viewport::from_f64(0.0, 0.0, f64::INFINITY, 64).sanitized(FractalKind::Mandelbrot);
        assert_eq!(huge.zoom, MAX_ZOOM);
    }

    #[test]
    fn sanitized_replaces_nan_with_default_view() {
        let broken = Viewport::from_f64(f64::NAN, 0.0, 10.0, 64);
        let fixed = broken.sanitized(FractalKind::Mandelbrot);
        assert_eq!(fixed.center_f64(), (-0.5, 0.0));
        assert_eq!(fixed.zoom, 0.5);

        let nan_zoom = Viewport::from_f64(0.1, 0.2, f64::NAN, 64).sanitized(FractalKind::Cosh);
        assert_eq!(nan_zoom.center_f64(), (0.0, 0.0));
    }

    #[test]
    fn is_finite_rejects_bad_zoom() {
        assert!(Viewport::from_f64(0.0, 0.0, 1.0, 64).is_finite());
        assert!(!Viewport::from_f64(0.0, 0.0, 0.0, 64).is_finite());
        assert!(!Viewport::from_f64(0.0, 0.0, f64::NAN, 64).is_finite());
    }

    // ============================================================================
    // Bounds and pixel mapping tests
    // ============================================================================

    #[test]
    fn bounds_scale_with_aspect() {
        let viewport = Viewport::from_f64(-0.5, 0.0, 1.0, 64);
        let b = viewport.bounds(200, 100);

        assert_eq!(b.x_min, -4.5);
        assert_eq!(b.x_max, 3.5);
        assert_eq!(b.y_min, -2.0);
        assert_eq!(b.y_max, 2.0);
    }

    #[test]
    fn pixel_to_world_maps_corners() {
        let viewport = Viewport::from_f64(0.0, 0.0, 1.0, 64);
        let b = viewport.bounds(101, 101);

        assert_eq!(b.pixel_to_world(0.0, 0.0), (b.x_min, b.y_max));
        assert_eq!(b.pixel_to_world(100.0, 100.0), (b.x_max, b.y_min));
        assert_eq!(b.pixel_to_world(50.0, 50.0), (0.0, 0.0));
    }

    #[test]
    fn world_to_pixel_inverts_pixel_to_world() {
        let viewport = Viewport::from_f64(-0.75, 0.1, 3.0, 64);
        let b = viewport.bounds(640, 480);
        let (x, y) = b.pixel_to_world(123.0, 456.0);
        let (px, py) = b.world_to_pixel(x, y);
        assert!((px - 123.0).abs() < 1e-9);
        assert!((py - 456.0).abs() < 1e-9);
    }

    #[test]
    fn pixel_delta_spans_view() {
        let viewport = Viewport::from_f64(0.0, 0.0, 2.0, 64);
        let b = viewport.bounds(101, 51);

        // scale = 1, aspect = 101 / 51
        assert_eq!(b.pixel_delta(0.0, 0.0), (-b.aspect, 1.0));
        assert_eq!(b.pixel_delta(100.0, 50.0), (b.aspect, -1.0));
        assert_eq!(b.pixel_delta(50.0, 25.0), (0.0, 0.0));
    }

    #[test]
    fn pixel_delta_is_offset_of_pixel_to_world() {
        let viewport = Viewport::from_f64(-0.7436438870371587, 0.13182590420531198, 1e6, 64);
        let b = viewport.bounds(64, 48);
        let (cx, cy) = viewport.center_f64();
        let pixel = b.pixel_size();

        for (px, py) in [(0.0, 0.0), (63.0, 47.0), (31.0, 24.0), (10.5, 40.25)] {
            let (x, y) = b.pixel_to_world(px, py);
            let (dx, dy) = b.pixel_delta(px, py);
            assert!((cx + dx - x).abs() < pixel * 1e-6, "x at ({}, {})", px, py);
            assert!((cy + dy - y).abs() < pixel * 1e-6, "y at ({}, {})", px, py);
        }
    }

    #[test]
    fn pixel_delta_keeps_precision_at_deep_zoom() {
        let viewport = Viewport::from_f64(-0.75, 0.1, 1e200, 64);
        let b = viewport.bounds(64, 48);
        let (dx0, _) = b.pixel_delta(0.0, 0.0);
        let (dx1, _) = b.pixel_delta(1.0, 0.0);
        let spacing = 2.0 * b.scale * b.aspect / 63.0;
        assert!(((dx1 - dx0) - spacing).abs() < spacing * 1e-9);
    }

    #[test]
    fn single_pixel_image_does_not_divide_by_zero() {
        let viewport = Viewport::from_f64(0.0, 0.0, 1.0, 64);
        let b = viewport.bounds(1, 1);
        let (x, y) = b.pixel_to_world(0.0, 0.0);
        assert!(x.is_finite() && y.is_finite());
    }

    // ============================================================================
    // Serialization round-trip tests
    // ============================================================================

    #[test]
    fn serialization_roundtrip_preserves_values() {
        let original = Viewport::from_strings("-0.75000000000000000000001", "0.1", 1e15, 256).unwrap();

        let json = serde_json::to_string(&original).unwrap();
        let restored: Viewport = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.center.0, original.center.0);
        assert_eq!(restored.center.1, original.center.1);
        assert_eq!(restored.zoom, 1e15);
        assert_eq!(restored.precision_bits(), 256);
    }
}
