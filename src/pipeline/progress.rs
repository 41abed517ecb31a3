//! Lock-free progress tracking for pipeline stages.
//!
//! Fan-out workers tick an atomic counter per processed unit; the driving
//! caller reads fractions without ever touching the data pools. Background
//! stages expose a completion flag instead, set once the state machine
//! observes their task ready.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// A cloneable handle to one fan-out stage's completion counter.
#[derive(Debug, Clone, Default)]
pub struct StageProgress(Arc<AtomicUsize>);

impl StageProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `n` completed units of work.
    pub fn add(&self, n: usize) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    /// Units completed so far.
    pub fn completed(&self) -> usize {
        self.0.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.0.store(0, Ordering::Relaxed);
    }

    /// Completed fraction in `[0, 1]`; 0.0 when `total` is zero.
    pub fn fraction(&self, total: usize) -> f32 {
        if total == 0 {
            0.0
        } else {
            self.completed() as f32 / total as f32
        }
    }
}

/// Progress counters for every stage of one pipeline run.
#[derive(Debug, Default)]
pub struct ProgressTracker {
    pub loaded: StageProgress,
    pub preprocessed: StageProgress,
    pub features_extracted: StageProgress,
    clustering_done: AtomicBool,
    reduction_done: AtomicBool,
    total: AtomicUsize,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the input size all fractions are measured against.
    pub fn set_total(&self, total: usize) {
        self.total.store(total, Ordering::Relaxed);
    }

    pub fn total(&self) -> usize {
        self.total.load(Ordering::Relaxed)
    }

    pub fn mark_clustering_done(&self) {
        self.clustering_done.store(true, Ordering::Relaxed);
    }

    pub fn mark_reduction_done(&self) {
        self.reduction_done.store(true, Ordering::Relaxed);
    }

    /// Zero every counter and flag.
    pub fn reset(&self) {
        self.loaded.reset();
        self.preprocessed.reset();
        self.features_extracted.reset();
        self.clustering_done.store(false, Ordering::Relaxed);
        self.reduction_done.store(false, Ordering::Relaxed);
        self.total.store(0, Ordering::Relaxed);
    }

    /// Snapshot of current progress, safe to take while workers run.
    pub fn snapshot(&self) -> Progress {
        let total = self.total();
        Progress {
            loaded: self.loaded.fraction(total),
            preprocessed: self.preprocessed.fraction(total),
            features_extracted: self.features_extracted.fraction(total),
            clustering_done: self.clustering_done.load(Ordering::Relaxed),
            reduction_done: self.reduction_done.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time progress report.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    pub loaded: f32,
    pub preprocessed: f32,
    pub features_extracted: f32,
    pub clustering_done: bool,
    pub reduction_done: bool,
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn flag(done: bool) -> &'static str {
            if done {
                "done"
            } else {
                "pending"
            }
        }

        write!(
            f,
            "loaded {:.0}% | preprocessed {:.0}% | features {:.0}% | clustering {} | reduction {}",
            self.loaded * 100.0,
            self.preprocessed * 100.0,
            self.features_extracted * 100.0,
            flag(self.clustering_done),
            flag(self.reduction_done),
        )
    }
}
