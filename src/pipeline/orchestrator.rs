//! Run coordinator: validate roots, drive walk → scheduler, fold outcomes into the report.

use log::debug;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::engine::copier::CopyParams;
use crate::engine::limiter::ConcurrencyLimiter;
use crate::engine::tools::{ExcludeSet, ensure_dir};
use crate::pipeline::{
    self, CopyContext, CopyScheduler, PipelineTuning, RunError, WalkContext, WalkSummary,
};
use crate::report::{RunReport, RunReportBuilder};
use crate::utils::Sink;
use crate::{CopyOutcome, RunStatus, SortOpts};

/// Per-run lifecycle. `FailedFast` is reachable only from `Unvalidated`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    Unvalidated,
    Validated,
    Walking,
    Copying,
    Reported,
    FailedFast,
}

fn transition(state: &mut RunState, next: RunState) {
    debug!("run state {:?} -> {:?}", state, next);
    *state = next;
}

/// Check that `source` exists and is a directory. Returns its canonical path, or the reason.
pub fn validate_source(source: &Path) -> Result<PathBuf, String> {
    match fs::metadata(source) {
        Ok(meta) if meta.is_dir() => source
            .canonicalize()
            .map_err(|e| format!("no access {}: {}", source.display(), e)),
        Ok(_) => Err(format!("not a folder: {}", source.display())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            Err(format!("folder not exist: {}", source.display()))
        }
        Err(e) => Err(format!("no access {}: {}", source.display(), e)),
    }
}

/// Create the output root if missing. Returns its canonical path, or the reason.
pub fn prepare_output(output: &Path) -> Result<PathBuf, String> {
    ensure_dir(output)
        .and_then(|()| output.canonicalize())
        .map_err(|e| format!("cannot create output folder {}: {}", output.display(), e))
}

/// Sort every regular file under `source` into `output/<bucket>/`. See [`crate::sort_dir`].
pub fn run_sort<F>(
    source: &Path,
    output: &Path,
    opts: &SortOpts,
    sink: &dyn Sink,
    mut on_outcome: Option<F>,
) -> Result<RunReport, RunError>
where
    F: FnMut(&CopyOutcome),
{
    let mut state = RunState::Unvalidated;

    let source = match validate_source(source) {
        Ok(p) => p,
        Err(reason) => {
            sink.error(&reason);
            transition(&mut state, RunState::FailedFast);
            return Ok(RunReport::root_invalid(reason));
        }
    };
    // Option errors surface before anything is written under the output root.
    let exclude = ExcludeSet::new(&opts.exclude)?;
    let tuning = PipelineTuning::from_opts(opts, sink);
    let limiter = ConcurrencyLimiter::new(tuning.limit)?;
    let output = match prepare_output(output) {
        Ok(p) => p,
        Err(reason) => {
            sink.error(&reason);
            transition(&mut state, RunState::FailedFast);
            return Ok(RunReport::root_invalid(reason));
        }
    };
    transition(&mut state, RunState::Validated);

    debug!(
        "limit {} (channel cap {}), {} walk",
        tuning.limit,
        tuning.channel_cap,
        if tuning.parallel_walk { "parallel" } else { "serial" }
    );
    let walk_ctx = WalkContext::new(&source, &output, exclude, opts, sink);
    let copy_ctx = CopyContext {
        output: output.clone(),
        params: CopyParams::from(opts),
        sink,
    };
    let scheduler = CopyScheduler::new(&limiter, &copy_ctx, tuning.channel_cap);

    let mut builder = RunReportBuilder::new();
    transition(&mut state, RunState::Walking);
    let parallel_walk = tuning.parallel_walk;
    let (walk, received) = scheduler.run(
        |entry_tx| {
            let iter = if parallel_walk {
                pipeline::jwalk_iter(&walk_ctx)
            } else {
                pipeline::tree_walker_iter(&walk_ctx)
            };
            pipeline::run_walk_loop(entry_tx, &walk_ctx, iter)
        },
        |outcome| {
            if state == RunState::Walking {
                transition(&mut state, RunState::Copying);
            }
            if let Some(f) = on_outcome.as_mut() {
                f(&outcome);
            }
            builder.add_outcome(outcome, sink);
        },
    )?;
    let WalkSummary {
        files,
        errors,
        cancelled,
    } = walk;
    debug!("walk sent {} files, {} outcomes received", files, received);

    pipeline::report_skipped_paths(&errors, sink);
    let status = if cancelled {
        sink.warn("cancelled by user");
        RunStatus::Cancelled
    } else if files == 0 {
        sink.warn(&format!("no files in the folder {}", source.display()));
        RunStatus::EmptyTree
    } else {
        RunStatus::Completed
    };

    let report = builder.build(
        status,
        files as u64,
        errors,
        limiter.capacity(),
        limiter.peak(),
    );
    transition(&mut state, RunState::Reported);
    Ok(report)
}
