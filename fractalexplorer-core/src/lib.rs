pub mod bigfloat;
pub mod complex;
pub mod complex_delta;
pub mod compute_data;
pub mod error;
pub mod fractal;
pub mod pixel_rect;
pub mod precision;
pub mod viewport;

pub use bigfloat::BigFloat;
pub use complex::Complex;
pub use complex_delta::{BigComplex, ComplexDelta};
pub use compute_data::PixelSample;
pub use error::CoreError;
pub use fractal::{FractalInfo, FractalKind, FractalParams, Seed};
pub use pixel_rect::PixelRect;
pub use precision::{
    digits_to_bits, needs_arbitrary_precision, precision_digits_for_zoom, PRECISION_THRESHOLD,
};
pub use viewport::{ViewBounds, Viewport};
