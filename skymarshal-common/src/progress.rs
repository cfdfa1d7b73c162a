/// Progress sink shared by the fetchers and the search engine. Both the CLI
/// (terminal spinner) and the HTTP facade (SSE emit) provide their own
/// implementation.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, operation: &str, current: usize, total: usize);
}

/// Discards all progress updates.
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _operation: &str, _current: usize, _total: usize) {}
}

/// Writes progress to the log stream.
pub struct LogProgress;

impl ProgressReporter for LogProgress {
    fn report(&self, operation: &str, current: usize, total: usize) {
        tracing::info!("{operation}: {current}/{total}");
    }
}
