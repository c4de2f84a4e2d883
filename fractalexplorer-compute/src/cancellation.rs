use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Polled by render loops before every pixel commit.
pub trait CancellationChecker: Clone + Send + Sync {
    /// Returns true if computation should stop
    fn is_cancelled(&self) -> bool;
}

/// Never cancels - for synchronous queries and tests
#[derive(Clone, Copy, Debug, Default)]
pub struct NeverCancel;

impl CancellationChecker for NeverCancel {
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Shared cancellation flag of one render.
///
/// Clones observe the same flag. Cancelling is idempotent and cannot be undone.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing flag.
    pub fn from_flag(flag: Arc<AtomicBool>) -> Self {
        Self { flag }
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }
}

impl CancellationChecker for CancelToken {
    #[inline]
    fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_never_cancel_always_returns_false() {
        let checker = NeverCancel;
        assert!(!checker.is_cancelled());
    }

    #[test]
    fn test_cancel_token_is_sticky_and_idempotent() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());

        token.cancel();
        token.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_cancel_token_clones_share_flag() {
        let token = CancelToken::new();
        let worker_view = token.clone();

        token.cancel();
        assert!(worker_view.is_cancelled());
    }

    #[test]
    fn test_cancel_token_reads_external_flag() {
        let flag = Arc::new(AtomicBool::new(false));
        let token = CancelToken::from_flag(Arc::clone(&flag));

        flag.store(true, Ordering::Release);
        assert!(token.is_cancelled());
    }
}
