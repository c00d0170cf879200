//! Progress reporting capability for long-running operations.
//!
//! Hosts hand a [`ProgressSink`] into file loading, concatenation, group
//! parsing, and database joins. The sink is write-only from the core's side;
//! cancellation is cooperative and polled at record boundaries.
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use indicatif::ProgressBar;

use crate::helper::utils;

pub trait ProgressSink: Sync {
    /// Describe the stage currently running.
    fn set_stage(&self, stage: &str);
    /// Report the number of processed records.
    fn set_progress(&self, progress: usize);
    /// Report the total number of records, when known upfront.
    fn set_total(&self, total: usize);
    /// Polled at each record; a true return aborts with `Cancelled`.
    fn cancelled(&self) -> bool;
}

/// Sink that swallows every report. Useful for tests and batch callers.
#[derive(Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn set_stage(&self, _stage: &str) {}
    fn set_progress(&self, _progress: usize) {}
    fn set_total(&self, _total: usize) {}
    fn cancelled(&self) -> bool {
        false
    }
}

/// Terminal spinner sink.
pub struct SpinnerProgress {
    spinner: ProgressBar,
    cancelled: AtomicBool,
}

impl Default for SpinnerProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl SpinnerProgress {
    pub fn new() -> Self {
        Self {
            spinner: utils::set_spinner(),
            cancelled: AtomicBool::new(false),
        }
    }

    /// Request cooperative cancellation from another thread.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn finish(&self, msg: &str) {
        self.spinner.finish_with_message(msg.to_string());
    }
}

impl ProgressSink for SpinnerProgress {
    fn set_stage(&self, stage: &str) {
        self.spinner.set_message(stage.to_string());
    }

    fn set_progress(&self, progress: usize) {
        self.spinner.set_position(progress as u64);
    }

    fn set_total(&self, total: usize) {
        self.spinner.set_length(total as u64);
    }

    fn cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// Counting sink used by in-process hosts that poll state themselves.
#[derive(Default)]
pub struct SharedProgress {
    progress: AtomicUsize,
    total: AtomicUsize,
    cancelled: AtomicBool,
}

impl SharedProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn progress(&self) -> usize {
        self.progress.load(Ordering::Relaxed)
    }

    pub fn total(&self) -> usize {
        self.total.load(Ordering::Relaxed)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }
}

impl ProgressSink for SharedProgress {
    fn set_stage(&self, _stage: &str) {}

    fn set_progress(&self, progress: usize) {
        self.progress.store(progress, Ordering::Relaxed);
    }

    fn set_total(&self, total: usize) {
        self.total.store(total, Ordering::Relaxed);
    }

    fn cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_shared_progress() {
        let sink = SharedProgress::new();
        sink.set_total(10);
        sink.set_progress(3);
        assert_eq!(10, sink.total());
        assert_eq!(3, sink.progress());
        assert!(!sink.cancelled());
        sink.cancel();
        assert!(sink.cancelled());
    }
}
