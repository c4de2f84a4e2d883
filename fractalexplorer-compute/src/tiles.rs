use fractalexplorer_core::PixelRect;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Default edge length of a full-resolution tile in pixels.
pub const DEFAULT_TILE_SIZE: u32 = 64;

/// Order in which full-resolution tiles are handed to workers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TileOrder {
    /// Walk the tile grid in a square spiral starting at the centre tile.
    #[default]
    Spiral,
    /// Sort tiles by distance of their centre from the image centre.
    Distance,
}

/// Generate tiles covering the image in the given order.
///
/// Edge tiles are clipped, so the tiles partition the image exactly.
pub fn generate_tiles(width: u32, height: u32, tile_size: u32, order: TileOrder) -> Vec<PixelRect> {
    if width == 0 || height == 0 {
        return Vec::new();
    }
    let tile_size = tile_size.max(1);
    match order {
        TileOrder::Spiral => spiral_tiles(width, height, tile_size),
        TileOrder::Distance => distance_tiles(width, height, tile_size),
    }
}

fn grid_tile(col: u32, row: u32, width: u32, height: u32, tile_size: u32) -> PixelRect {
    PixelRect::new(col * tile_size, row * tile_size, tile_size, tile_size).clipped(width, height)
}

fn distance_tiles(width: u32, height: u32, tile_size: u32) -> Vec<PixelRect> {
    let mut tiles = Vec::new();
    for y_start in (0..height).step_by(tile_size as usize) {
        for x_start in (0..width).step_by(tile_size as usize) {
            let w = tile_size.min(width - x_start);
            let h = tile_size.min(height - y_start);
            tiles.push(PixelRect::new(x_start, y_start, w, h));
        }
    }

    let center_x = width as f64 / 2.0;
    let center_y = height as f64 / 2.0;
    tiles.sort_by(|a, b| {
        a.distance_sq_to(center_x, center_y)
            .total_cmp(&b.distance_sq_to(center_x, center_y))
    });
    tiles
}

fn spiral_tiles(width: u32, height: u32, tile_size: u32) -> Vec<PixelRect> {
    let cols = width.div_ceil(tile_size) as i64;
    let rows = height.div_ceil(tile_size) as i64;
    let total = (cols * rows) as usize;
    let mut tiles = Vec::with_capacity(total);

    // Tile containing the image centre
    let mut col = ((width / 2) / tile_size) as i64;
    let mut row = ((height / 2) / tile_size) as i64;

    // right, down, left, up with run lengths 1, 1, 2, 2, 3, 3, ...
    const DIRECTIONS: [(i64, i64); 4] = [(1, 0), (0, 1), (-1, 0), (0, -1)];
    let mut run = 1;
    let mut direction = 0;

    let visit = |col: i64, row: i64, tiles: &mut Vec<PixelRect>| {
        if (0..cols).contains(&col) && (0..rows).contains(&row) {
            tiles.push(grid_tile(col as u32, row as u32, width, height, tile_size));
        }
    };

    visit(col, row, &mut tiles);
    while tiles.len() < total {
        for _ in 0..2 {
            let (dc, dr) = DIRECTIONS[direction];
            for _ in 0..run {
                col += dc;
                row += dr;
                visit(col, row, &mut tiles);
            }
            direction = (direction + 1) % 4;
        }
        run += 1;
    }
    tiles
}

/// Shared work queue: workers claim tiles with a single atomic fetch-add.
#[derive(Debug)]
pub struct TileQueue {
    tiles: Vec<PixelRect>,
    next: AtomicUsize,
    completed: AtomicUsize,
}

impl TileQueue {
    pub fn new(tiles: Vec<PixelRect>) -> Self {
        Self {
            tiles,
            next: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
        }
    }

    /// Next unclaimed tile, or `None` when the queue is drained.
    pub fn claim(&self) -> Option<PixelRect> {
        let index = self.next.fetch_add(1, Ordering::Relaxed);
        self.tiles.get(index).copied()
    }

    /// Mark one claimed tile as done; returns the number completed so far.
    pub fn complete(&self) -> usize {
        self.completed.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Acquire)
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn assert_partition(tiles: &[PixelRect], width: u32, height: u32) {
        let total_area: u64 = tiles.iter().map(|t| t.area()).sum();
        assert_eq!(total_area, width as u64 * height as u64);

        let mut seen = HashSet::new();
        for tile in tiles {
            for pixel in tile.pixels() {
                assert!(seen.insert(pixel), "pixel {:?} covered twice", pixel);
            }
        }
    }

    #[test]
    fn spiral_covers_image_exactly() {
        for (w, h) in [(256, 256), (100, 37), (640, 64), (1, 300), (65, 65)] {
            let tiles = generate_tiles(w, h, 64, TileOrder::Spiral);
            assert_partition(&tiles, w, h);
        }
    }

    #[test]
    fn distance_covers_image_exactly() {
        let tiles = generate_tiles(100, 100, 64, TileOrder::Distance);
        assert_eq!(tiles.len(), 4);
        assert_partition(&tiles, 100, 100);
        assert!(tiles.iter().any(|t| t.width == 36));
    }

    #[test]
    fn spiral_starts_at_centre_tile() {
        let tiles = generate_tiles(320, 320, 64, TileOrder::Spiral);
        assert_eq!(tiles.len(), 25);
        assert_eq!((tiles[0].x, tiles[0].y), (128, 128));
        // first ring comes before any tile of the outer ring
        for tile in &tiles[1..9] {
            assert!(tile.x >= 64 && tile.x <= 192 && tile.y >= 64 && tile.y <= 192);
        }
    }

    #[test]
    fn spiral_handles_wide_images() {
        let tiles = generate_tiles(1024, 64, 64, TileOrder::Spiral);
        assert_eq!(tiles.len(), 16);
        assert_eq!(tiles[0].x, 512);
        assert_partition(&tiles, 1024, 64);
    }

    #[test]
    fn distance_order_is_centre_out() {
        let tiles = generate_tiles(256, 256, 64, TileOrder::Distance);
        let first = tiles[0].distance_sq_to(128.0, 128.0);
        let last = tiles[tiles.len() - 1].distance_sq_to(128.0, 128.0);
        assert!(first < last);
    }

    #[test]
    fn empty_image_has_no_tiles() {
        assert!(generate_tiles(0, 10, 64, TileOrder::Spiral).is_empty());
        assert!(generate_tiles(10, 0, 64, TileOrder::Distance).is_empty());
    }

    #[test]
    fn queue_hands_out_each_tile_once() {
        let queue = TileQueue::new(generate_tiles(256, 256, 64, TileOrder::Spiral));
        let claimed: Vec<_> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    s.spawn(|| {
                        let mut mine = Vec::new();
                        while let Some(tile) = queue.claim() {
                            mine.push((tile.x, tile.y));
                            queue.complete();
                        }
                        mine
                    })
                })
                .collect();
            handles.into_iter().flat_map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(claimed.len(), 16);
        assert_eq!(claimed.iter().collect::<HashSet<_>>().len(), 16);
        assert_eq!(queue.completed(), 16);
        assert!(queue.claim().is_none());
    }
}
