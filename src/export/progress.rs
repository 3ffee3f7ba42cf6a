//! Progress tracking for export runs
//!
//! The total number of documents is not known up front, so progress is shown
//! as a spinner with the running document count and throughput.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};

/// Progress tracker for export runs
pub struct ProgressTracker {
    /// Number of documents exported so far
    processed: AtomicU64,
    /// Start time of the run
    start_time: Instant,
    /// Spinner (optional, disabled for unattended runs)
    bar: Option<ProgressBar>,
}

impl ProgressTracker {
    /// Create a new progress tracker
    ///
    /// # Arguments
    /// * `enable_bar` - Whether to display a spinner on stderr
    pub fn new(enable_bar: bool) -> Self {
        let bar = enable_bar.then(|| {
            let bar = ProgressBar::new_spinner();
            if let Ok(style) =
                ProgressStyle::default_spinner().template("{spinner:.green} {pos} documents {msg}")
            {
                bar.set_style(style);
            }
            bar
        });

        Self {
            processed: AtomicU64::new(0),
            start_time: Instant::now(),
            bar,
        }
    }

    /// Update progress after a batch
    ///
    /// # Arguments
    /// * `total` - Documents exported so far
    /// * `batch` - Number of batches exported so far
    pub fn update(&self, total: u64, batch: u64) {
        self.processed.store(total, Ordering::Relaxed);

        if let Some(ref bar) = self.bar {
            bar.set_position(total);

            let elapsed = self.start_time.elapsed().as_secs_f64();
            if elapsed > 0.0 {
                let speed = total as f64 / elapsed;
                bar.set_message(format!("in {} batches ({:.0} docs/sec)", batch, speed));
            }
        }
    }

    /// Documents recorded by the last update
    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    /// Finish and clear the spinner
    pub fn finish(&self) {
        if let Some(ref bar) = self.bar {
            bar.finish_and_clear();
        }
    }
}
