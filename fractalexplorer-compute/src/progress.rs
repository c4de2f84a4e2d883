use std::sync::atomic::{AtomicU64, Ordering};

/// Progress callbacks fire at most once per this many finished tiles or rows.
pub const PROGRESS_INTERVAL: usize = 5;

/// Monotonic completion percentage shared between workers.
///
/// A render is split into `passes` equal segments. Progress never moves
/// backwards: a report lower than the published value is dropped.
#[derive(Debug)]
pub struct ProgressTracker {
    passes: u32,
    // percent scaled by 1e6, so fetch_max works on integers
    published: AtomicU64,
}

const SCALE: f64 = 1e6;

impl ProgressTracker {
    pub fn new(passes: u32) -> Self {
        Self {
            passes: passes.max(1),
            published: AtomicU64::new(0),
        }
    }

    /// Overall percentage for pass `k` at fraction `f` of that pass.
    pub fn percent_for(&self, pass: u32, fraction: f64) -> f64 {
        let fraction = fraction.clamp(0.0, 1.0);
        ((pass as f64 + fraction) / self.passes as f64 * 100.0).clamp(0.0, 100.0)
    }

    /// Publish progress for pass `k` at fraction `f`.
    ///
    /// Returns the new percentage when it moved forward.
    pub fn report(&self, pass: u32, fraction: f64) -> Option<f64> {
        self.publish(self.percent_for(pass, fraction))
    }

    /// Publish an absolute percentage.
    pub fn publish(&self, percent: f64) -> Option<f64> {
        let scaled = (percent.clamp(0.0, 100.0) * SCALE) as u64;
        let previous = self.published.fetch_max(scaled, Ordering::AcqRel);
        (scaled > previous).then_some(scaled as f64 / SCALE)
    }

    pub fn percent(&self) -> f64 {
        self.published.load(Ordering::Acquire) as f64 / SCALE
    }

    pub fn complete(&self) {
        self.publish(100.0);
    }
}

/// Deep-zoom progress: perturbation covers 0-80%, rebasing 80-100%.
pub fn deep_zoom_percent(perturbation_fraction: f64, rebase_fraction: f64) -> f64 {
    const PERTURBATION_SHARE: f64 = 80.0;
    let perturbation = perturbation_fraction.clamp(0.0, 1.0) * PERTURBATION_SHARE;
    let rebase = rebase_fraction.clamp(0.0, 1.0) * (100.0 - PERTURBATION_SHARE);
    perturbation + rebase
}

/// Whether the `completed`-th unit of work should trigger a callback.
#[inline]
pub fn should_notify(completed: usize, total: usize) -> bool {
    completed % PROGRESS_INTERVAL == 0 || completed == total
}
