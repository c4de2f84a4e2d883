pub mod antialias;
pub mod cache;
pub mod cancellation;
pub mod config;
pub mod distance;
pub mod engine;
pub mod formula;
pub mod iteration;
pub mod orbit;
pub mod palette;
pub mod passes;
pub mod perturbation;
pub mod pixel_buffer;
pub mod progress;
pub mod scheduler;
pub mod tiles;

pub use antialias::PixelShader;
pub use cache::{CacheKey, ValueCache};
pub use cancellation::{CancelToken, CancellationChecker, NeverCancel};
pub use config::{AntiAlias, DeepZoomConfig, SchedulerConfig};
pub use distance::DistanceEstimator;
pub use engine::{Classification, FractalEngine};
pub use formula::{is_valid_formula, CompiledFormula, FastPath, FormulaCache, FormulaError};
pub use iteration::{smooth_iteration, PointEvaluator, Stepper};
pub use orbit::compute_orbit;
pub use palette::{argb, average_colors, color_index, ColorIndex, GrayscalePalette, Palette};
pub use passes::{PassPlan, RenderPass};
pub use perturbation::{
    compute_direct, compute_pixel_perturbation, GlitchRebaser, GlitchedPixel, RebaseReport,
    RebaseStrategy, ReferenceOrbit, DEFAULT_GLITCH_THRESHOLD,
};
pub use pixel_buffer::{PixelBuffer, RenderLevel};
pub use progress::ProgressTracker;
pub use scheduler::{
    RenderCallbacks, RenderError, RenderHandle, RenderOutcome, RenderRequest, RenderScheduler,
    RenderState, RenderStatus, RenderTarget,
};
pub use tiles::{generate_tiles, TileOrder, TileQueue};

// Re-export core types for convenience
pub use fractalexplorer_core::*;
