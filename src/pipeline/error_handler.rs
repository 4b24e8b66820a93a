use thiserror::Error;

use crate::CopyFailure;
use crate::engine::limiter::LimiterError;
use crate::utils::Sink;

/// Faults of the engine itself. Root problems and per-file failures are not errors: they
/// end up in the [`RunReport`](crate::RunReport).
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Limiter(#[from] LimiterError),
    #[error("invalid exclude pattern: {0}")]
    InvalidPattern(#[from] globset::Error),
    #[error("{0} thread panicked")]
    ThreadPanicked(&'static str),
}

/// Summarize traversal errors after the walk joined. Each one was already reported as it
/// happened; this adds the count so it is not lost in a long log.
pub fn report_skipped_paths(errors: &[CopyFailure], sink: &dyn Sink) {
    if errors.is_empty() {
        return;
    }
    sink.warn(&format!(
        "Skipped {} paths due to permission errors or access issues",
        errors.len()
    ));
    for e in errors {
        sink.debug(&format!("  skipped: {}", e.path.display()));
    }
}
