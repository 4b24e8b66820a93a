//! Public and internal types for the bucketer API and pipeline.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use crate::utils::config::CopyConsts;

/// A regular file discovered during the walk. Absolute path; consumed once by the scheduler.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileEntry {
    pub path: PathBuf,
}

impl FileEntry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

/// What went wrong for one file or directory entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// A directory entry could not be listed or stat'd during the walk.
    TraversalAccess,
    /// The bucket directory could not be created.
    CreateBucket,
    /// The source file could not be opened for reading.
    OpenSource,
    /// The destination file could not be created.
    CreateDestination,
    Read,
    Write,
    /// Destination bytes did not hash to the same value as the source.
    Verify,
    /// The run was interrupted before or during this copy.
    Cancelled,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::TraversalAccess => "traversal access",
            FailureKind::CreateBucket => "create bucket",
            FailureKind::OpenSource => "open source",
            FailureKind::CreateDestination => "create destination",
            FailureKind::Read => "read",
            FailureKind::Write => "write",
            FailureKind::Verify => "verify",
            FailureKind::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One path-scoped failure: the offending path, the classification and the error text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CopyFailure {
    pub path: PathBuf,
    /// Destination the copy was headed for, when one had been computed.
    pub destination: Option<PathBuf>,
    pub kind: FailureKind,
    pub message: String,
}

impl fmt::Display for CopyFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.destination {
            Some(dest) => write!(
                f,
                "{} error {} -> {}: {}",
                self.kind,
                self.path.display(),
                dest.display(),
                self.message
            ),
            None => write!(f, "{} error {}: {}", self.kind, self.path.display(), self.message),
        }
    }
}

/// Result of copying one [`FileEntry`]. Never mutated after the copier returns it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CopyOutcome {
    Success {
        source: PathBuf,
        destination: PathBuf,
        bytes: u64,
    },
    Failure(CopyFailure),
}

impl CopyOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CopyOutcome::Success { .. })
    }
}

/// Terminal state of one run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunStatus {
    /// Every discovered file produced an outcome (some may be failures).
    #[default]
    Completed,
    /// The source exists but holds no regular files. Not an error.
    EmptyTree,
    /// The source (or output root) was unusable; nothing was copied.
    RootInvalid { reason: String },
    /// An interrupt stopped the run early.
    Cancelled,
}

/// Options for one [`sort_dir`](crate::sort_dir) run.
#[derive(Clone, Debug)]
pub struct SortOpts {
    /// Concurrency limiter capacity (max copies in flight). Must be >= 1.
    pub limit: usize,
    /// Read/write chunk size for the streamed copy, in bytes.
    pub chunk_size: usize,
    /// Follow symbolic links to files and directories.
    pub follow_links: bool,
    /// Exclude patterns (glob syntax), matched against file name and full path.
    pub exclude: Vec<String>,
    /// Walk with jwalk's parallel directory reader instead of the serial walker.
    pub parallel_walk: bool,
    /// Hash source and destination with blake3 and fail the copy on mismatch.
    pub verify: bool,
    /// Cap `limit` by the process file descriptor limit.
    pub cap_by_fd_limit: bool,
    /// Raised from outside (e.g. Ctrl+C) to stop the run.
    pub cancel: Option<Arc<AtomicBool>>,
}

impl Default for SortOpts {
    fn default() -> Self {
        Self {
            limit: CopyConsts::DEFAULT_LIMIT,
            chunk_size: CopyConsts::DEFAULT_CHUNK_SIZE,
            follow_links: false,
            exclude: Vec::new(),
            parallel_walk: false,
            verify: false,
            cap_by_fd_limit: true,
            cancel: None,
        }
    }
}
