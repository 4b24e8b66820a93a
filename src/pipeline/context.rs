//! Pipeline context and tuning: shared data passed into the walk thread and the copy workers.

use crossbeam_channel::{Receiver, Sender, bounded};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::engine::copier::CopyParams;
use crate::engine::tools::{ExcludeSet, nested_output};
use crate::utils::Sink;
use crate::utils::config::StreamingChannelCap;
use crate::utils::fd_limit::cap_limit_by_fds;
use crate::{CopyOutcome, FileEntry, SortOpts};

/// Tuning derived from the requested limit and the FD limit.
#[derive(Clone, Debug)]
pub struct PipelineTuning {
    /// Limiter capacity and worker count. Zero is passed through so the limiter rejects it.
    pub limit: usize,
    /// Capacity of the entry channel (walk → workers) and the outcome channel.
    pub channel_cap: usize,
    pub parallel_walk: bool,
}

impl PipelineTuning {
    pub fn from_opts(opts: &SortOpts, sink: &dyn Sink) -> Self {
        let requested = opts.limit;
        let limit = if opts.cap_by_fd_limit {
            let (effective, capped) = cap_limit_by_fds(requested);
            if capped {
                sink.warn(&format!(
                    "limit {} exceeds what the open file limit allows; using {}",
                    requested, effective
                ));
            }
            effective
        } else {
            requested
        };
        Self {
            limit,
            channel_cap: StreamingChannelCap::for_limit(limit),
            parallel_walk: opts.parallel_walk,
        }
    }
}

/// Shared context for the walk thread: root, filters, sink and cancellation.
pub struct WalkContext<'a> {
    pub root: PathBuf,
    /// Output root, when it is nested in the source and must not be walked.
    pub skip_dir: Option<PathBuf>,
    pub exclude: ExcludeSet,
    pub follow_links: bool,
    pub sink: &'a dyn Sink,
    pub cancel: Option<Arc<AtomicBool>>,
}

impl<'a> WalkContext<'a> {
    pub fn new(
        root: &Path,
        output: &Path,
        exclude: ExcludeSet,
        opts: &SortOpts,
        sink: &'a dyn Sink,
    ) -> Self {
        Self {
            root: root.to_path_buf(),
            skip_dir: nested_output(root, output),
            exclude,
            follow_links: opts.follow_links,
            sink,
            cancel: opts.cancel.clone(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|c| c.load(Ordering::Relaxed))
    }
}

/// Shared context for copy workers.
pub struct CopyContext<'a> {
    pub output: PathBuf,
    pub params: CopyParams,
    pub sink: &'a dyn Sink,
}

/// Channels for one run. Walk thread gets `entry_tx`; workers get `entry_rx` and `outcome_tx`;
/// the coordinator keeps `outcome_rx`.
pub struct PipelineChannels {
    pub entry_tx: Sender<FileEntry>,
    pub entry_rx: Receiver<FileEntry>,
    pub outcome_tx: Sender<CopyOutcome>,
    pub outcome_rx: Receiver<CopyOutcome>,
}

pub fn create_pipeline_channels(channel_cap: usize) -> PipelineChannels {
    let (entry_tx, entry_rx) = bounded::<FileEntry>(channel_cap);
    let (outcome_tx, outcome_rx) = bounded::<CopyOutcome>(channel_cap);
    PipelineChannels {
        entry_tx,
        entry_rx,
        outcome_tx,
        outcome_rx,
    }
}
