use serde::{Deserialize, Serialize};

/// Rectangle in pixel space (always u32 coordinates)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle covering a whole `width x height` image.
    pub fn full(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Exclusive right edge.
    pub fn right(&self) -> u32 {
        self.x.saturating_add(self.width)
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.height)
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn contains(&self, px: u32, py: u32) -> bool {
        px >= self.x && px < self.right() && py >= self.y && py < self.bottom()
    }

    /// Part of the rectangle inside a `width x height` image.
    pub fn clipped(&self, width: u32, height: u32) -> Self {
        let x = self.x.min(width);
        let y = self.y.min(height);
        Self::new(x, y, self.right().min(width) - x, self.bottom().min(height) - y)
    }

    /// Center in fractional pixel coordinates.
    pub fn center(&self) -> (f64, f64) {
        (
            self.x as f64 + self.width as f64 / 2.0,
            self.y as f64 + self.height as f64 / 2.0,
        )
    }

    /// Squared distance from the rectangle center to `(cx, cy)`.
    pub fn distance_sq_to(&self, cx: f64, cy: f64) -> f64 {
        let (x, y) = self.center();
        (x - cx) * (x - cx) + (y - cy) * (y - cy)
    }

    /// Pixel coordinates in row-major order.
    pub fn pixels(&self) -> impl Iterator<Item = (u32, u32)> {
        let rect = *self;
        (rect.y..rect.bottom()).flat_map(move |py| (rect.x..rect.right()).map(move |px| (px, py)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_rect_edges_and_area() {
        let rect = PixelRect::new(10, 20, 100, 50);

        assert_eq!(rect.right(), 110);
        assert_eq!(rect.bottom(), 70);
        assert_eq!(rect.area(), 5000);
        assert!(!rect.is_empty());
        assert!(PixelRect::new(3, 3, 0, 9).is_empty());
    }

    #[test]
    fn test_pixel_rect_contains_point() {
        let rect = PixelRect::new(10, 20, 100, 50);

        assert!(rect.contains(10, 20)); // Top-left corner
        assert!(rect.contains(109, 69)); // Bottom-right corner
        assert!(!rect.contains(110, 70)); // Just outside
        assert!(!rect.contains(9, 20));
        assert!(!rect.contains(50, 19));
    }

    #[test]
    fn test_pixel_rect_clipped_to_image() {
        let rect = PixelRect::new(60, 40, 64, 64);
        assert_eq!(rect.clipped(100, 80), PixelRect::new(60, 40, 40, 40));

        let outside = PixelRect::new(200, 200, 10, 10).clipped(100, 80);
        assert!(outside.is_empty());
    }

    #[test]
    fn test_pixel_rect_center_distance() {
        let rect = PixelRect::new(0, 0, 64, 64);
        assert_eq!(rect.center(), (32.0, 32.0));
        assert_eq!(rect.distance_sq_to(32.0, 36.0), 16.0);
    }

    #[test]
    fn test_pixel_rect_pixels_row_major() {
        let rect = PixelRect::new(2, 5, 2, 2);
        let pixels: Vec<_> = rect.pixels().collect();
        assert_eq!(pixels, vec![(2, 5), (3, 5), (2, 6), (3, 6)]);
        assert_eq!(PixelRect::new(0, 0, 0, 4).pixels().count(), 0);
    }

    #[test]
    fn test_pixel_rect_serialization_roundtrip() {
        let original = PixelRect::full(640, 480);

        let json = serde_json::to_string(&original).unwrap();
        let restored: PixelRect = serde_json::from_str(&json).unwrap();

        assert_eq!(restored, original);
    }
}
