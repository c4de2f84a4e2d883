use serde::{Deserialize, Serialize};

/// Result of evaluating one pixel.
///
/// `value` is a smooth iteration count for escaping points, or
/// `max_iterations` plus a small interior term for points that never escape.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PixelSample {
    pub value: f64,
    /// Perturbation lost precision for this pixel; it needs recomputation.
    #[serde(default)]
    pub glitched: bool,
}

impl PixelSample {
    pub fn new(value: f64) -> Self {
        Self {
            value: Self::sanitize(value),
            glitched: false,
        }
    }

    pub fn glitched(value: f64) -> Self {
        Self {
            value: Self::sanitize(value),
            glitched: true,
        }
    }

    /// Whether the sample counts as inside the set.
    pub fn in_set(&self, max_iterations: u32) -> bool {
        self.value >= max_iterations as f64 - 0.5
    }

    /// Replace NaN or Infinity with zero so serialized samples stay valid JSON.
    #[inline]
    fn sanitize(value: f64) -> f64 {
        if value.is_finite() {
            value
        } else {
            0.0
        }
    }
}
