//! Pipeline components: context, walk loop, scheduler, coordinator, error handling.

pub mod context;
pub mod error_handler;
pub mod orchestrator;
pub mod scheduler;
pub mod walk;

pub use context::{
    CopyContext, PipelineChannels, PipelineTuning, WalkContext, create_pipeline_channels,
};
pub use error_handler::{RunError, report_skipped_paths};
pub use orchestrator::{RunState, prepare_output, run_sort, validate_source};
pub use scheduler::{CopyScheduler, spawn_copy_workers};
pub use walk::{
    TreeWalker, WalkOutcome, WalkSummary, jwalk_iter, run_walk_loop, to_outcome_jwalk,
    tree_walker_iter,
};
