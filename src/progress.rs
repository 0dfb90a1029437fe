//! Progress reporting for long-running passes.
//!
//! Reporters are shared between the two selection streams, which may run on different
//! rayon workers, so every method takes `&self`.

use std::sync::atomic::{AtomicUsize, Ordering};

pub trait ProgressReporter: Sync {
    /// A task with `total` units of work begins.
    fn start(&self, _total: usize) {}

    /// `completed` more units of work finished.
    fn advance(&self, _completed: usize) {}

    fn finish(&self) {}
}

/// Reporter that ignores all progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {}

/// Reporter that keeps running totals, readable from another thread.
#[derive(Debug, Default)]
pub struct ProgressCounter {
    total: AtomicUsize,
    completed: AtomicUsize,
    finished: AtomicUsize,
}

impl ProgressCounter {
    pub fn new() -> Self {
        ProgressCounter::default()
    }

    pub fn total(&self) -> usize {
        self.total.load(Ordering::Relaxed)
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Relaxed)
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Relaxed) > 0
    }

    /// Completed fraction in `[0, 1]`; zero when no task has started.
    pub fn fraction(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        (self.completed() as f64 / total as f64).min(1.0)
    }
}

impl ProgressReporter for ProgressCounter {
    fn start(&self, total: usize) {
        self.total.store(total, Ordering::Relaxed);
        self.completed.store(0, Ordering::Relaxed);
        self.finished.store(0, Ordering::Relaxed);
    }

    fn advance(&self, completed: usize) {
        self.completed.fetch_add(completed, Ordering::Relaxed);
    }

    fn finish(&self) {
        self.finished.fetch_add(1, Ordering::Relaxed);
    }
}
