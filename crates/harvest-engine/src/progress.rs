use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::info;

/// Shared progress counter for human-readable reporting.
///
/// The only state written by concurrent sessions; updates are atomic.
#[derive(Debug)]
pub struct ProgressCounter {
    label: &'static str,
    total: usize,
    done: AtomicUsize,
}

impl ProgressCounter {
    pub fn new(label: &'static str, total: usize) -> Self {
        Self {
            label,
            total,
            done: AtomicUsize::new(0),
        }
    }

    /// Marks one target finished and returns the new count.
    pub fn item_done(&self, address: &str) -> usize {
        let done = self.done.fetch_add(1, Ordering::Relaxed) + 1;
        info!("[{}/{}] {} finished {}", done, self.total, self.label, address);
        done
    }

    pub fn done(&self) -> usize {
        self.done.load(Ordering::Relaxed)
    }

    pub fn total(&self) -> usize {
        self.total
    }
}
