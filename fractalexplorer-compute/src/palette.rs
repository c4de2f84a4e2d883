//! Numeric colour contract: iteration value to colour index to ARGB.

/// Where an iteration value falls in the colour scheme.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ColorIndex {
    /// Point inside the set, with the interior complexity in `[0, 1)`.
    Interior { complexity: f64 },
    /// Escaped point, with the position `t` in `[0, 1)` along a 256-step cycle.
    Exterior(f64),
}

/// Classify an iteration value for colouring.
pub fn color_index(value: f64, max_iterations: u32) -> ColorIndex {
    let max = max_iterations as f64;
    if value >= max - 0.5 {
        let complexity = if value > max { value - max } else { 0.0 };
        return ColorIndex::Interior { complexity };
    }
    let t = value.max(0.0).rem_euclid(256.0) / 256.0;
    ColorIndex::Exterior(if t.is_finite() { t } else { 0.0 })
}

/// Maps colour indices to packed `0xAARRGGBB` colours.
pub trait Palette: Send + Sync {
    fn color(&self, index: ColorIndex) -> u32;

    /// Colour of an iteration value.
    fn color_value(&self, value: f64, max_iterations: u32) -> u32 {
        self.color(color_index(value, max_iterations))
    }
}

/// Black interior with a grey ramp outside.
#[derive(Clone, Copy, Debug, Default)]
pub struct GrayscalePalette;

impl Palette for GrayscalePalette {
    fn color(&self, index: ColorIndex) -> u32 {
        match index {
            ColorIndex::Interior { .. } => argb(0, 0, 0),
            ColorIndex::Exterior(t) => {
                let v = (t * 255.0).round().clamp(0.0, 255.0) as u8;
                argb(v, v, v)
            }
        }
    }
}

/// Pack an opaque colour.
#[inline]
pub fn argb(r: u8, g: u8, b: u8) -> u32 {
    0xFF00_0000 | (r as u32) << 16 | (g as u32) << 8 | b as u32
}

/// Split a packed colour into `[a, r, g, b]`.
#[inline]
pub fn channels(color: u32) -> [u8; 4] {
    color.to_be_bytes()
}

/// Per-channel mean of packed colours.
pub fn average_colors(colors: &[u32]) -> u32 {
    if colors.is_empty() {
        return 0;
    }
    let mut sums = [0u32; 4];
    for &color in colors {
        for (sum, channel) in sums.iter_mut().zip(channels(color)) {
            *sum += channel as u32;
        }
    }
    let n = colors.len() as u32;
    u32::from_be_bytes(sums.map(|s| ((s + n / 2) / n) as u8))
}
