//! Bucketer: copy a directory tree into one folder per file extension, with bounded concurrency

pub mod engine;
pub mod pipeline;
pub mod report;
pub mod types;
pub mod utils;

/// Re-export types for API
pub use types::*;

pub use pipeline::RunError;
pub use report::{RunReport, RunReportBuilder};
pub use utils::{LogSink, MemorySink, Sink};

use std::path::Path;

/// Copy every regular file under `source` into `output/<bucket>/<file name>`.
///
/// Per-file failures and unreadable subtrees do not stop the run; they are listed in the
/// returned [`RunReport`]. A missing or non-directory `source` is reported as
/// [`RunStatus::RootInvalid`] and nothing is created. `Err` is reserved for faults of the
/// engine itself (bad exclude pattern, zero limit, a panicked thread).
pub fn sort_dir(
    source: &Path,
    output: &Path,
    opts: &SortOpts,
    sink: &dyn Sink,
) -> Result<RunReport, RunError> {
    pipeline::run_sort(source, output, opts, sink, None::<fn(&CopyOutcome)>)
}

/// Like [`sort_dir`], calling `on_outcome` for each finished copy as it arrives (on the
/// calling thread, in completion order). Keep it fast: it runs between outcomes.
pub fn sort_dir_with<F>(
    source: &Path,
    output: &Path,
    opts: &SortOpts,
    sink: &dyn Sink,
    on_outcome: Option<F>,
) -> Result<RunReport, RunError>
where
    F: FnMut(&CopyOutcome),
{
    pipeline::run_sort(source, output, opts, sink, on_outcome)
}
