//! Scheduler configuration.

use crate::perturbation::{RebaseStrategy, DEFAULT_GLITCH_THRESHOLD, MAX_ORBIT_LEN};
use crate::tiles::{TileOrder, DEFAULT_TILE_SIZE};
use fractalexplorer_core::PRECISION_THRESHOLD;
use serde::{Deserialize, Serialize};

/// Render scheduler configuration.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Worker threads; `None` uses one per logical CPU.
    pub threads: Option<usize>,
    /// Edge length of full-resolution tiles in pixels.
    pub tile_size: u32,
    pub tile_order: TileOrder,
    pub deep_zoom: DeepZoomConfig,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            threads: None,
            tile_size: DEFAULT_TILE_SIZE,
            tile_order: TileOrder::default(),
            deep_zoom: DeepZoomConfig::default(),
        }
    }
}

impl SchedulerConfig {
    /// Thread count the pool is built with.
    pub fn thread_count(&self) -> usize {
        self.threads.unwrap_or_else(num_cpus::get).max(1)
    }
}

/// Tunables of the perturbation path.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeepZoomConfig {
    /// Zoom at which Mandelbrot renders switch to perturbation.
    pub precision_threshold: f64,
    /// Ratio `|δ|² / |Z|²` above which a pixel counts as glitched.
    pub glitch_threshold: f64,
    pub rebase_strategy: RebaseStrategy,
    /// Cap on stored reference orbit points.
    pub max_orbit_len: usize,
}

impl Default for DeepZoomConfig {
    fn default() -> Self {
        Self {
            precision_threshold: PRECISION_THRESHOLD,
            glitch_threshold: DEFAULT_GLITCH_THRESHOLD,
            rebase_strategy: RebaseStrategy::default(),
            max_orbit_len: MAX_ORBIT_LEN,
        }
    }
}

/// Anti-aliasing of the full-resolution pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AntiAlias {
    #[default]
    Off,
    /// `n x n` samples for every pixel.
    Supersample(u32),
    /// `n x n` samples only near the set boundary.
    Adaptive(u32),
}

impl AntiAlias {
    /// Samples per axis; 1 when disabled.
    pub fn level(self) -> u32 {
        match self {
            AntiAlias::Off => 1,
            AntiAlias::Supersample(n) | AntiAlias::Adaptive(n) => n.max(1),
        }
    }

    pub fn is_enabled(self) -> bool {
        self.level() > 1
    }
}
