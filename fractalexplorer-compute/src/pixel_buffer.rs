//! Shared output image with per-pixel render levels.
//!
//! Each cell packs `(level << 32) | argb` into one `AtomicU64`, so a colour and
//! its level are always committed together. A cell's level never decreases.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// How finely a pixel has been computed.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[repr(u8)]
pub enum RenderLevel {
    #[default]
    None = 0,
    Coarse = 1,
    Medium = 2,
    Fine = 3,
    Full = 4,
}

impl RenderLevel {
    pub const ALL: [RenderLevel; 5] = [
        RenderLevel::None,
        RenderLevel::Coarse,
        RenderLevel::Medium,
        RenderLevel::Fine,
        RenderLevel::Full,
    ];

    fn from_bits(bits: u64) -> Self {
        match bits {
            0 => RenderLevel::None,
            1 => RenderLevel::Coarse,
            2 => RenderLevel::Medium,
            3 => RenderLevel::Fine,
            _ => RenderLevel::Full,
        }
    }
}

#[inline]
fn pack(argb: u32, level: RenderLevel) -> u64 {
    (level as u64) << 32 | argb as u64
}

#[inline]
fn unpack(cell: u64) -> (u32, RenderLevel) {
    (cell as u32, RenderLevel::from_bits(cell >> 32))
}

/// Lock-free `width x height` ARGB image.
#[derive(Debug)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    cells: Vec<AtomicU64>,
}

impl PixelBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        let len = width as usize * height as usize;
        Self {
            width,
            height,
            cells: (0..len).map(|_| AtomicU64::new(0)).collect(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> Option<usize> {
        if x < self.width && y < self.height {
            Some(y as usize * self.width as usize + x as usize)
        } else {
            None
        }
    }

    /// Commit a colour unless the cell already holds a higher level.
    ///
    /// Returns whether the write was applied. Out of bounds is a no-op.
    #[inline]
    pub fn set_pixel(&self, x: u32, y: u32, argb: u32, level: RenderLevel) -> bool {
        let Some(index) = self.index(x, y) else {
            return false;
        };
        let packed = pack(argb, level);
        self.cells[index]
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                if unpack(current).1 <= level {
                    Some(packed)
                } else {
                    None
                }
            })
            .is_ok()
    }

    /// `set_pixel` on every in-bounds cell of the block.
    pub fn fill_block(&self, x: u32, y: u32, w: u32, h: u32, argb: u32, level: RenderLevel) {
        let x_end = x.saturating_add(w).min(self.width);
        let y_end = y.saturating_add(h).min(self.height);
        for py in y..y_end {
            for px in x..x_end {
                self.set_pixel(px, py, argb, level);
            }
        }
    }

    /// Level of a cell. Out-of-bounds cells report `Full`.
    #[inline]
    pub fn render_level(&self, x: u32, y: u32) -> RenderLevel {
        match self.index(x, y) {
            Some(index) => unpack(self.cells[index].load(Ordering::Acquire)).1,
            None => RenderLevel::Full,
        }
    }

    /// Whether a write at `level` would improve the cell.
    #[inline]
    pub fn needs_render(&self, x: u32, y: u32, level: RenderLevel) -> bool {
        self.index(x, y).is_some() && self.render_level(x, y) < level
    }

    /// Colour of a cell, 0 out of bounds.
    pub fn color(&self, x: u32, y: u32) -> u32 {
        self.index(x, y)
            .map_or(0, |index| unpack(self.cells[index].load(Ordering::Acquire)).0)
    }

    /// Number of cells at each level, indexed by `RenderLevel as usize`.
    pub fn level_counts(&self) -> [usize; 5] {
        let mut counts = [0; 5];
        for cell in &self.cells {
            counts[unpack(cell.load(Ordering::Relaxed)).1 as usize] += 1;
        }
        counts
    }

    /// Share of cells at `Full`, in percent.
    pub fn full_resolution_percent(&self) -> f64 {
        if self.cells.is_empty() {
            return 100.0;
        }
        self.level_counts()[RenderLevel::Full as usize] as f64 * 100.0 / self.cells.len() as f64
    }

    /// Reset every cell to level `None`.
    pub fn clear(&self) {
        for cell in &self.cells {
            cell.store(0, Ordering::Release);
        }
    }

    /// Row-major copy of the colours.
    pub fn snapshot(&self) -> Vec<u32> {
        self.cells
            .iter()
            .map(|cell| unpack(cell.load(Ordering::Acquire)).0)
            .collect()
    }
}
