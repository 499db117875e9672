//! Progress reporting for simplification runs.
//!
//! The engine emits one status tuple before each pass. The callback receives
//! the pass index, the triangle count the run started from, the current live
//! triangle count, and the target count (`-1` in lossless mode, where no
//! target exists).
//!
//! # Example
//!
//! ```ignore
//! use whittle::simplify::Progress;
//!
//! let progress = Progress::new(|iteration, original, current, target| {
//!     eprintln!("pass {}: {}/{} triangles (target {})", iteration, current, original, target);
//! });
//!
//! simplifier.set_progress(progress);
//! ```

/// A progress callback invoked before each simplification pass.
///
/// The callback must not call back into the engine; it may only observe the
/// reported values.
pub struct Progress {
    callback: Box<dyn Fn(usize, usize, usize, i64) + Send + Sync>,
}

impl Progress {
    /// Create a new progress reporter with the given callback.
    ///
    /// The callback arguments are `(iteration, original_triangles,
    /// current_triangles, target_triangles)`; `target_triangles` is `-1`
    /// during lossless decimation.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(usize, usize, usize, i64) + Send + Sync + 'static,
    {
        Self {
            callback: Box::new(callback),
        }
    }

    /// Report a pass about to start.
    #[inline]
    pub fn report(&self, iteration: usize, original: usize, current: usize, target: i64) {
        (self.callback)(iteration, original, current, target);
    }

    /// Create a no-op progress reporter that discards all updates.
    pub fn none() -> Self {
        Self::new(|_, _, _, _| {})
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::none()
    }
}

impl std::fmt::Debug for Progress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Progress").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_report_invokes_callback() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);

        let progress = Progress::new(move |iteration, original, current, target| {
            seen.fetch_add(1, Ordering::Relaxed);
            assert_eq!(iteration, 2);
            assert_eq!(original, 100);
            assert_eq!(current, 60);
            assert_eq!(target, -1);
        });

        progress.report(2, 100, 60, -1);
        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_none_discards() {
        let progress = Progress::none();
        progress.report(0, 10, 10, 5);
    }
}
