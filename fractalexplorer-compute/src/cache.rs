//! Memo of point values for interactive queries.

use fractalexplorer_core::FractalParams;
use std::collections::HashMap;
use std::sync::RwLock;

/// Coarsest grid coordinates are bucketed to before lookup.
pub const CACHE_QUANTUM: f64 = 1e-10;

/// Grid cells per unit of view scale once the view is too deep for
/// [`CACHE_QUANTUM`] to separate neighbouring pixels.
const CELLS_PER_SCALE: f64 = 1e6;

/// Largest bucket index that f64 division still resolves exactly.
const MAX_BUCKET: f64 = 9_007_199_254_740_992.0;

/// Entry cap; the cache starts over once it is reached.
pub const MAX_CACHE_ENTRIES: usize = 500_000;

/// What cached values were computed for.
#[derive(Clone, Debug, PartialEq)]
pub struct CacheKey {
    pub center: (f64, f64),
    pub zoom: f64,
    pub max_iterations: u32,
    pub params: FractalParams,
}

#[derive(Debug)]
struct CacheState {
    key: Option<CacheKey>,
    // grid origin and spacing for the current key
    origin: (f64, f64),
    quantum: f64,
    values: HashMap<(i64, i64), f64>,
}

impl Default for CacheState {
    fn default() -> Self {
        Self {
            key: None,
            origin: (0.0, 0.0),
            quantum: CACHE_QUANTUM,
            values: HashMap::new(),
        }
    }
}

impl CacheState {
    /// Bucket of a point, or None when the grid cannot tell it apart from
    /// its neighbours.
    fn bucket(&self, x: f64, y: f64) -> Option<(i64, i64)> {
        let bx = ((x - self.origin.0) / self.quantum).round();
        let by = ((y - self.origin.1) / self.quantum).round();
        if bx.abs() < MAX_BUCKET && by.abs() < MAX_BUCKET {
            Some((bx as i64, by as i64))
        } else {
            None
        }
    }
}

/// Concurrent map from quantised world coordinates to iteration values.
#[derive(Debug, Default)]
pub struct ValueCache {
    state: RwLock<CacheState>,
}

/// Grid spacing for a view at `zoom`: [`CACHE_QUANTUM`], refined for deep
/// views so that distinct pixels never share a bucket.
pub fn cache_quantum(zoom: f64) -> f64 {
    let scale = 2.0 / zoom;
    if scale.is_finite() && scale > 0.0 {
        CACHE_QUANTUM.min(scale / CELLS_PER_SCALE)
    } else {
        CACHE_QUANTUM
    }
}

impl ValueCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `key` current, dropping every value computed for another key.
    ///
    /// The bucket grid is centred on the key's view and its spacing follows
    /// the zoom. Points the grid cannot resolve are never cached. Returns
    /// true when the cache was invalidated.
    pub fn validate(&self, key: &CacheKey) -> bool {
        {
            let state = self.state.read().unwrap_or_else(|e| e.into_inner());
            if state.key.as_ref() == Some(key) {
                return false;
            }
        }
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        if state.key.as_ref() == Some(key) {
            return false;
        }
        log::debug!("Value cache invalidated ({} entries)", state.values.len());
        state.values.clear();
        state.origin = key.center;
        state.quantum = cache_quantum(key.zoom);
        state.key = Some(key.clone());
        true
    }

    pub fn get(&self, x: f64, y: f64) -> Option<f64> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        let bucket = state.bucket(x, y)?;
        state.values.get(&bucket).copied()
    }

    pub fn insert(&self, x: f64, y: f64, value: f64) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        let Some(bucket) = state.bucket(x, y) else {
            return;
        };
        if state.values.len() >= MAX_CACHE_ENTRIES {
            state.values.clear();
        }
        state.values.insert(bucket, value);
    }

    /// Cached value, or `compute` it and remember the result.
    pub fn get_or_insert_with(&self, x: f64, y: f64, compute: impl FnOnce() -> f64) -> f64 {
        if let Some(value) = self.get(x, y) {
            return value;
        }
        let value = compute();
        self.insert(x, y, value);
        value
    }

    pub fn len(&self) -> usize {
        self.state.read().map_or(0, |s| s.values.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        *state = CacheState::default();
    }
}
