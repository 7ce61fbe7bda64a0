use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Progress reporting and cooperative cancellation for long running operations.
///
/// The synchronizer polls `is_canceled` before each remote query, before each visited path,
/// between hashed chunks and before each deletion candidate or pending change it examines.
/// All reporting methods default to doing nothing.
pub trait TaskMonitor {
    fn is_canceled(&self) -> bool;

    /// Called when a new (sub-)task starts with the given amount of work units.
    fn begin(&self, _task: &str, _total_work: usize) {}
    fn set_current_work_description(&self, _description: &str) {}
    fn worked(&self, _amount: usize) {}
    fn done(&self) {}
}

/// A monitor that never cancels and ignores all progress.
pub struct NoProgress;

impl TaskMonitor for NoProgress {
    fn is_canceled(&self) -> bool {
        false
    }
}

/// A cancellation flag that can be shared with another thread (e.g. a UI) to stop a scan.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    canceled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.canceled.store(true, Ordering::SeqCst);
    }
}

impl TaskMonitor for CancellationToken {
    fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::SeqCst)
    }
}
