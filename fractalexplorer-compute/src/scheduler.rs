//! Multi-threaded progressive render scheduler.
//!
//! Every render runs on its own coordinator thread and fans its passes out to
//! the scheduler's rayon pool. Workers claim tiles (full resolution) or block
//! rows (previews) and commit colours straight into the shared
//! [`PixelBuffer`]; render levels keep late preview writes from overwriting
//! finished pixels.

use crate::antialias::PixelShader;
use crate::cancellation::{CancelToken, CancellationChecker};
use crate::config::{AntiAlias, SchedulerConfig};
use crate::formula::FormulaCache;
use crate::iteration::PointEvaluator;
use crate::palette::{GrayscalePalette, Palette};
use crate::passes::{PassPlan, RenderPass};
use crate::perturbation::{compute_pixel_perturbation, GlitchRebaser, GlitchedPixel, ReferenceOrbit};
use crate::pixel_buffer::{PixelBuffer, RenderLevel};
use crate::progress::{deep_zoom_percent, should_notify, ProgressTracker};
use crate::tiles::{generate_tiles, TileQueue};
use fractalexplorer_core::{
    digits_to_bits, precision_digits_for_zoom, Complex, CoreError, FractalKind, FractalParams,
    Viewport,
};
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Instant;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("invalid render request: {0}")]
    InvalidRequest(String),
    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("failed to spawn render thread: {0}")]
    Spawn(#[from] std::io::Error),
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Identifies the surface a render draws into. A new render for the same
/// target cancels the previous one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RenderTarget(pub u32);

/// Lifecycle of one render.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum RenderState {
    Idle = 0,
    ModeSelection = 1,
    ProgressivePasses = 2,
    FullResolution = 3,
    DeepZoom = 4,
    Complete = 5,
    Cancelled = 6,
    Failed = 7,
}

impl RenderState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => RenderState::ModeSelection,
            2 => RenderState::ProgressivePasses,
            3 => RenderState::FullResolution,
            4 => RenderState::DeepZoom,
            5 => RenderState::Complete,
            6 => RenderState::Cancelled,
            7 => RenderState::Failed,
            _ => RenderState::Idle,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RenderState::Complete | RenderState::Cancelled | RenderState::Failed
        )
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RenderRequest {
    #[serde(default)]
    pub target: RenderTarget,
    pub viewport: Viewport,
    pub width: u32,
    pub height: u32,
    pub params: FractalParams,
    pub max_iterations: u32,
    #[serde(default)]
    pub anti_alias: AntiAlias,
    #[serde(default)]
    pub pass_plan: PassPlan,
}

impl RenderRequest {
    pub fn new(
        viewport: Viewport,
        width: u32,
        height: u32,
        params: FractalParams,
        max_iterations: u32,
    ) -> Self {
        Self {
            target: RenderTarget::default(),
            viewport,
            width,
            height,
            params,
            max_iterations,
            anti_alias: AntiAlias::default(),
            pass_plan: PassPlan::default(),
        }
    }

    /// Request centred on decimal coordinates, parsed at the precision the
    /// zoom needs.
    pub fn at(
        center_x: &str,
        center_y: &str,
        zoom: f64,
        width: u32,
        height: u32,
        params: FractalParams,
        max_iterations: u32,
    ) -> Result<Self, RenderError> {
        let bits = digits_to_bits(precision_digits_for_zoom(zoom));
        let viewport = Viewport::from_strings(center_x, center_y, zoom, bits)?;
        Ok(Self::new(viewport, width, height, params, max_iterations))
    }

    fn validate(&self) -> Result<(), RenderError> {
        if self.width == 0 || self.height == 0 {
            return Err(RenderError::InvalidRequest(format!(
                "image size {}x{} is empty",
                self.width, self.height
            )));
        }
        if !self.viewport.is_finite() {
            return Err(RenderError::InvalidRequest(
                "viewport centre and zoom must be finite".to_string(),
            ));
        }
        if self.max_iterations == 0 {
            return Err(RenderError::InvalidRequest(
                "max_iterations must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum RenderStatus {
    Complete,
    Cancelled,
    Failed(String),
}

#[derive(Clone, Debug)]
pub struct RenderOutcome {
    pub status: RenderStatus,
    pub elapsed_ms: f64,
    /// Reference orbit precision of a deep-zoom render
    pub precision_digits: Option<usize>,
    pub buffer: Arc<PixelBuffer>,
}

type ProgressFn = dyn Fn(&PixelBuffer, f64) + Send + Sync;
type CompleteFn = dyn Fn(&RenderOutcome) + Send + Sync;

/// Optional hooks invoked while a render runs.
///
/// `on_progress` is called from worker threads.
#[derive(Default)]
pub struct RenderCallbacks {
    on_progress: Option<Box<ProgressFn>>,
    on_complete: Option<Box<CompleteFn>>,
}

impl RenderCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_progress(mut self, f: impl Fn(&PixelBuffer, f64) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Box::new(f));
        self
    }

    pub fn on_complete(mut self, f: impl Fn(&RenderOutcome) + Send + Sync + 'static) -> Self {
        self.on_complete = Some(Box::new(f));
        self
    }
}

impl std::fmt::Debug for RenderCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderCallbacks")
            .field("on_progress", &self.on_progress.is_some())
            .field("on_complete", &self.on_complete.is_some())
            .finish()
    }
}

type Completion = (Mutex<Option<RenderOutcome>>, Condvar);

/// Caller's view of a running render.
#[derive(Clone, Debug)]
pub struct RenderHandle {
    id: u64,
    cancel: CancelToken,
    buffer: Arc<PixelBuffer>,
    progress: Arc<ProgressTracker>,
    state: Arc<AtomicU8>,
    done: Arc<Completion>,
}

impl RenderHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Ask the render to stop. Idempotent.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        lock(&self.done.0).is_some()
    }

    pub fn state(&self) -> RenderState {
        RenderState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Block until the render has finished.
    pub fn wait(&self) -> RenderOutcome {
        let (outcome, finished) = &*self.done;
        let mut guard = lock(outcome);
        loop {
            if let Some(outcome) = guard.as_ref() {
                return outcome.clone();
            }
            guard = finished.wait(guard).unwrap_or_else(|e| e.into_inner());
        }
    }

    pub fn buffer(&self) -> &Arc<PixelBuffer> {
        &self.buffer
    }

    /// Published progress in percent.
    pub fn progress(&self) -> f64 {
        self.progress.percent()
    }
}

type ActiveRenders = Mutex<HashMap<RenderTarget, RenderHandle>>;

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Owns the worker pool and the active render of every target.
pub struct RenderScheduler {
    config: SchedulerConfig,
    pool: Arc<ThreadPool>,
    formulas: Arc<FormulaCache>,
    palette: Arc<dyn Palette>,
    active: Arc<ActiveRenders>,
    next_id: AtomicU64,
}

impl RenderScheduler {
    pub fn new(config: SchedulerConfig) -> Result<Self, RenderError> {
        let threads = config.thread_count();
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("fractal-worker-{}", i))
            .build()?;
        log::debug!("Render scheduler started with {} workers", threads);
        Ok(Self {
            config,
            pool: Arc::new(pool),
            formulas: Arc::new(FormulaCache::new()),
            palette: Arc::new(GrayscalePalette),
            active: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn with_palette(mut self, palette: Arc<dyn Palette>) -> Self {
        self.palette = palette;
        self
    }

    /// Share a formula cache with other components.
    pub fn with_formula_cache(mut self, formulas: Arc<FormulaCache>) -> Self {
        self.formulas = formulas;
        self
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn formula_cache(&self) -> &Arc<FormulaCache> {
        &self.formulas
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Start a render and return immediately.
    ///
    /// Any render still running for the same target is cancelled first.
    pub fn render(
        &self,
        mut request: RenderRequest,
        callbacks: RenderCallbacks,
    ) -> Result<RenderHandle, RenderError> {
        request.validate()?;
        request.viewport = request.viewport.sanitized(request.params.kind);

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let buffer = Arc::new(PixelBuffer::new(request.width, request.height));
        let handle = RenderHandle {
            id,
            cancel: CancelToken::new(),
            buffer: Arc::clone(&buffer),
            progress: Arc::new(ProgressTracker::new(request.pass_plan.passes().len() as u32)),
            state: Arc::new(AtomicU8::new(RenderState::Idle as u8)),
            done: Arc::new((Mutex::new(None), Condvar::new())),
        };

        let target = request.target;
        if let Some(previous) = lock(&self.active).insert(target, handle.clone()) {
            previous.cancel();
        }

        let job = RenderJob {
            id,
            request,
            config: self.config,
            pool: Arc::clone(&self.pool),
            formulas: Arc::clone(&self.formulas),
            palette: Arc::clone(&self.palette),
            buffer,
            cancel: handle.cancel.clone(),
            progress: Arc::clone(&handle.progress),
            state: Arc::clone(&handle.state),
            callbacks,
            last_notified: Mutex::new(0.0),
            target,
            active: Arc::clone(&self.active),
        };
        let done = Arc::clone(&handle.done);

        let spawned = std::thread::Builder::new()
            .name(format!("fractal-render-{}", id))
            .spawn(move || job.run_to_completion(&done));
        if let Err(err) = spawned {
            lock(&self.active).remove(&target);
            return Err(err.into());
        }
        Ok(handle)
    }

    /// Cancel the active render of `target`, if any.
    pub fn cancel(&self, target: RenderTarget) {
        if let Some(handle) = lock(&self.active).get(&target) {
            handle.cancel();
        }
    }

    pub fn cancel_all(&self) {
        for handle in lock(&self.active).values() {
            handle.cancel();
        }
    }

    /// Renders started and not yet finished.
    pub fn active_renders(&self) -> usize {
        lock(&self.active).len()
    }
}

impl Drop for RenderScheduler {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

impl std::fmt::Debug for RenderScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderScheduler")
            .field("config", &self.config)
            .field("threads", &self.threads())
            .finish()
    }
}

/// Everything one render thread needs.
struct RenderJob {
    id: u64,
    request: RenderRequest,
    config: SchedulerConfig,
    pool: Arc<ThreadPool>,
    formulas: Arc<FormulaCache>,
    palette: Arc<dyn Palette>,
    buffer: Arc<PixelBuffer>,
    cancel: CancelToken,
    progress: Arc<ProgressTracker>,
    state: Arc<AtomicU8>,
    callbacks: RenderCallbacks,
    // last percentage handed to on_progress; serialises callbacks
    last_notified: Mutex<f64>,
    target: RenderTarget,
    active: Arc<ActiveRenders>,
}

/// How a render pass ended, plus the orbit precision when one was computed.
struct PassResult {
    cancelled: bool,
    precision_digits: Option<usize>,
}

impl RenderJob {
    fn run_to_completion(self, done: &Completion) {
        let start = Instant::now();
        let request = &self.request;
        log::info!(
            "Render {} started: {}x{} {:?} at zoom {:e}, {} iterations",
            self.id,
            request.width,
            request.height,
            request.params.kind,
            request.viewport.zoom,
            request.max_iterations
        );

        let result = catch_unwind(AssertUnwindSafe(|| self.run()));
        let (status, precision_digits) = match result {
            Ok(PassResult {
                cancelled: false,
                precision_digits,
            }) => (RenderStatus::Complete, precision_digits),
            Ok(PassResult {
                cancelled: true,
                precision_digits,
            }) => (RenderStatus::Cancelled, precision_digits),
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                log::warn!("Render {} failed: {}", self.id, message);
                (RenderStatus::Failed(message), None)
            }
        };

        let final_state = match status {
            RenderStatus::Complete => {
                self.progress.complete();
                self.notify(Some(100.0));
                RenderState::Complete
            }
            RenderStatus::Cancelled => RenderState::Cancelled,
            RenderStatus::Failed(_) => RenderState::Failed,
        };
        self.set_state(final_state);

        let outcome = RenderOutcome {
            status,
            elapsed_ms: start.elapsed().as_secs_f64() * 1000.0,
            precision_digits,
            buffer: Arc::clone(&self.buffer),
        };
        log::info!(
            "Render {} finished: {:?} in {:.1} ms{}",
            self.id,
            outcome.status,
            outcome.elapsed_ms,
            precision_digits.map_or(String::new(), |d| format!(", {} digits", d))
        );

        if let Some(on_complete) = &self.callbacks.on_complete {
            on_complete(&outcome);
        }
        self.retire();

        let (slot, finished) = done;
        *lock(slot) = Some(outcome);
        finished.notify_all();
    }

    /// Drop this render from the active map unless a newer render for the
    /// same target already replaced it.
    fn retire(&self) {
        let mut active = lock(&self.active);
        if active.get(&self.target).is_some_and(|handle| handle.id == self.id) {
            active.remove(&self.target);
        }
    }

    fn set_state(&self, state: RenderState) {
        self.state.store(state as u8, Ordering::Release);
    }

    fn notify(&self, percent: Option<f64>) {
        let (Some(percent), Some(on_progress)) = (percent, &self.callbacks.on_progress) else {
            return;
        };
        let mut last = lock(&self.last_notified);
        if percent > *last {
            *last = percent;
            on_progress(&self.buffer, percent);
        }
    }

    fn run(&self) -> PassResult {
        self.set_state(RenderState::ModeSelection);
        let request = &self.request;
        let deep_zoom = request.viewport.zoom >= self.config.deep_zoom.precision_threshold
            && request.params.kind == FractalKind::Mandelbrot
            && !request.params.is_julia();

        if deep_zoom {
            self.set_state(RenderState::DeepZoom);
            self.run_deep_zoom()
        } else {
            PassResult {
                cancelled: self.run_progressive(),
                precision_digits: None,
            }
        }
    }

    // Returns true when cancelled
    fn run_progressive(&self) -> bool {
        let request = &self.request;
        let evaluator = PointEvaluator::new(&request.params, request.max_iterations, &self.formulas);
        let bounds = request.viewport.bounds(request.width, request.height);
        let shader = PixelShader::new(&evaluator, bounds, &*self.palette, request.anti_alias);

        let passes = request.pass_plan.passes();
        self.set_state(RenderState::ProgressivePasses);
        for (k, pass) in request.pass_plan.previews().iter().enumerate() {
            if self.cancel.is_cancelled() {
                return true;
            }
            let start = Instant::now();
            self.preview_pass(k as u32, pass, &shader);
            log::debug!(
                "Render {}: {:?} pass (step {}) in {:.1} ms",
                self.id,
                pass.level,
                pass.step,
                start.elapsed().as_secs_f64() * 1000.0
            );
        }

        if self.cancel.is_cancelled() {
            return true;
        }
        self.set_state(RenderState::FullResolution);
        let start = Instant::now();
        self.full_pass(passes.len() as u32 - 1, &shader);
        log::debug!(
            "Render {}: full pass in {:.1} ms",
            self.id,
            start.elapsed().as_secs_f64() * 1000.0
        );
        self.cancel.is_cancelled()
    }

    /// Sample one point per `step x step` block, block rows round-robin
    /// across workers.
    fn preview_pass(&self, k: u32, pass: &RenderPass, shader: &PixelShader<'_>) {
        let (width, height) = (self.request.width, self.request.height);
        let step = pass.step.max(1);
        let block_rows = height.div_ceil(step) as usize;
        let workers = self.pool.current_num_threads().max(1);
        let rows_done = AtomicUsize::new(0);

        self.pool.scope(|s| {
            for worker in 0..workers {
                let rows_done = &rows_done;
                s.spawn(move |_| {
                    for block_row in (worker..block_rows).step_by(workers) {
                        let py = block_row as u32 * step;
                        for px in (0..width).step_by(step as usize) {
                            if self.cancel.is_cancelled() {
                                return;
                            }
                            if !self.buffer.needs_render(px, py, pass.level) {
                                continue;
                            }
                            let color = shader.sample(px, py);
                            self.buffer.fill_block(px, py, step, step, color, pass.level);
                        }
                        let done = rows_done.fetch_add(1, Ordering::AcqRel) + 1;
                        if should_notify(done, block_rows) {
                            self.notify(self.progress.report(k, done as f64 / block_rows as f64));
                        }
                    }
                });
            }
        });
    }

    /// Every pixel at level Full, tile by tile.
    fn full_pass(&self, k: u32, shader: &PixelShader<'_>) {
        let request = &self.request;
        let queue = TileQueue::new(generate_tiles(
            request.width,
            request.height,
            self.config.tile_size,
            self.config.tile_order,
        ));
        let total = queue.len();
        let workers = self.pool.current_num_threads().max(1);

        self.pool.scope(|s| {
            for _ in 0..workers {
                let queue = &queue;
                s.spawn(move |_| {
                    while let Some(tile) = queue.claim() {
                        for (px, py) in tile.pixels() {
                            if self.cancel.is_cancelled() {
                                return;
                            }
                            if self.buffer.render_level(px, py) >= RenderLevel::Full {
                                continue;
                            }
                            self.buffer
                                .set_pixel(px, py, shader.shade(px, py), RenderLevel::Full);
                        }
                        let done = queue.complete();
                        if should_notify(done, total) {
                            self.notify(self.progress.report(k, done as f64 / total as f64));
                        }
                    }
                });
            }
        });
    }

    fn run_deep_zoom(&self) -> PassResult {
        let request = &self.request;
        let deep = &self.config.deep_zoom;
        let digits = precision_digits_for_zoom(request.viewport.zoom);
        let max_iterations = request.max_iterations;

        let start = Instant::now();
        let orbit = Arc::new(ReferenceOrbit::compute_capped(
            &request.viewport.center,
            max_iterations,
            digits,
            deep.max_orbit_len,
        ));
        log::debug!(
            "Render {}: reference orbit of {} points in {:.1} ms",
            self.id,
            orbit.len(),
            start.elapsed().as_secs_f64() * 1000.0
        );

        let result = |cancelled| PassResult {
            cancelled,
            precision_digits: Some(digits),
        };
        if self.cancel.is_cancelled() {
            return result(true);
        }

        let bounds = request.viewport.bounds(request.width, request.height);
        let queue = TileQueue::new(generate_tiles(
            request.width,
            request.height,
            self.config.tile_size,
            self.config.tile_order,
        ));
        let total = queue.len();
        let workers = self.pool.current_num_threads().max(1);
        let glitched = Mutex::new(Vec::new());

        let start = Instant::now();
        self.pool.scope(|s| {
            for _ in 0..workers {
                let (queue, orbit, glitched) = (&queue, &orbit, &glitched);
                s.spawn(move |_| {
                    while let Some(tile) = queue.claim() {
                        let mut tile_glitches = Vec::new();
                        for (px, py) in tile.pixels() {
                            if self.cancel.is_cancelled() {
                                return;
                            }
                            let delta = bounds.pixel_delta(px as f64, py as f64);
                            let sample = compute_pixel_perturbation(
                                orbit,
                                Complex::new(delta.0, delta.1),
                                max_iterations,
                                deep.glitch_threshold,
                            );
                            let color = self.palette.color_value(sample.value, max_iterations);
                            self.buffer.set_pixel(px, py, color, RenderLevel::Full);
                            if sample.glitched {
                                tile_glitches.push(GlitchedPixel { x: px, y: py, delta });
                            }
                        }
                        lock(glitched).extend(tile_glitches);
                        let done = queue.complete();
                        if should_notify(done, total) {
                            let fraction = done as f64 / total as f64;
                            self.notify(self.progress.publish(deep_zoom_percent(fraction, 0.0)));
                        }
                    }
                });
            }
        });
        log::debug!(
            "Render {}: perturbation pass in {:.1} ms",
            self.id,
            start.elapsed().as_secs_f64() * 1000.0
        );

        if self.cancel.is_cancelled() {
            return result(true);
        }

        let mut glitched = glitched.into_inner().unwrap_or_else(|e| e.into_inner());
        glitched.sort_by_key(|p| (p.y, p.x));
        log::debug!("Render {}: {} glitched pixels", self.id, glitched.len());

        let rebaser = GlitchRebaser::new(&orbit, max_iterations, deep.glitch_threshold, deep.rebase_strategy);
        let total_glitched = glitched.len();
        let committed = AtomicUsize::new(0);
        let report = self.pool.install(|| {
            rebaser.rebase(
                &glitched,
                request.width as usize * request.height as usize,
                &self.cancel,
                |pixel, sample| {
                    let color = self.palette.color_value(sample.value, max_iterations);
                    self.buffer.set_pixel(pixel.x, pixel.y, color, RenderLevel::Full);
                    let done = committed.fetch_add(1, Ordering::AcqRel) + 1;
                    if should_notify(done, total_glitched) {
                        let fraction = done as f64 / total_glitched as f64;
                        self.notify(self.progress.publish(deep_zoom_percent(1.0, fraction)));
                    }
                },
            )
        });
        log::debug!("Render {}: rebasing {:?}", self.id, report);

        result(self.cancel.is_cancelled())
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "render panicked".to_string()
    }
}
