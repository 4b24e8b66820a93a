//! Run report model and the builder that folds outcomes into it.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::PathBuf;

use crate::utils::Sink;
use crate::{CopyFailure, CopyOutcome, FailureKind, RunStatus};

/// Aggregate outcome of one traversal-and-copy run.
#[derive(Clone, Debug, Default, Serialize)]
pub struct RunReport {
    #[serde(flatten)]
    pub status: RunStatus,
    /// Regular files the walk handed to the scheduler.
    pub files_found: u64,
    pub copied: u64,
    pub failed: u64,
    pub bytes_copied: u64,
    /// Per-file copy failures (including cancelled copies).
    pub failures: Vec<CopyFailure>,
    /// Entries the walk could not list or stat.
    pub traversal_errors: Vec<CopyFailure>,
    /// Destinations written by more than one source file (last writer wins).
    pub collisions: Vec<PathBuf>,
    /// Effective limiter capacity.
    pub limit: usize,
    /// Most copies that held a limiter slot at the same time.
    pub peak_in_flight: usize,
}

impl RunReport {
    /// Report for a run that failed before any work started.
    pub fn root_invalid(reason: String) -> Self {
        Self {
            status: RunStatus::RootInvalid { reason },
            ..Self::default()
        }
    }

    pub fn is_root_invalid(&self) -> bool {
        matches!(self.status, RunStatus::RootInvalid { .. })
    }

    /// True when any file failed to copy or any entry could not be walked.
    pub fn has_failures(&self) -> bool {
        self.failed > 0 || !self.traversal_errors.is_empty()
    }

    /// Failures of one kind, e.g. everything that failed on write.
    pub fn failures_of(&self, kind: FailureKind) -> impl Iterator<Item = &CopyFailure> {
        self.failures.iter().filter(move |f| f.kind == kind)
    }

    /// Machine-readable counters.
    pub fn to_dict(&self) -> BTreeMap<String, u64> {
        let mut dict_counts = BTreeMap::new();
        dict_counts.insert("files_found".to_string(), self.files_found);
        dict_counts.insert("copied".to_string(), self.copied);
        dict_counts.insert("failed".to_string(), self.failed);
        dict_counts.insert("bytes_copied".to_string(), self.bytes_copied);
        dict_counts.insert(
            "traversal_errors".to_string(),
            self.traversal_errors.len() as u64,
        );
        dict_counts.insert("collisions".to_string(), self.collisions.len() as u64);
        dict_counts
    }

    /// Human-readable one-line summary.
    pub fn format(&self, prefix: &str) -> String {
        let status = match &self.status {
            RunStatus::Completed => "completed".to_string(),
            RunStatus::EmptyTree => "empty".to_string(),
            RunStatus::RootInvalid { reason } => format!("root invalid ({reason})"),
            RunStatus::Cancelled => "cancelled".to_string(),
        };
        format!(
            "{prefix} {status}: found={} copied={} failed={} bytes={} traversal_errors={} collisions={}",
            self.files_found,
            self.copied,
            self.failed,
            self.bytes_copied,
            self.traversal_errors.len(),
            self.collisions.len()
        )
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format("[SORT]"))
    }
}

/// Mutable accumulator: outcomes are folded in as they arrive, then finalized once.
#[derive(Debug, Default)]
pub struct RunReportBuilder {
    copied: u64,
    failed: u64,
    bytes_copied: u64,
    failures: Vec<CopyFailure>,
    /// Destination -> source of the last successful copy there.
    written: HashMap<PathBuf, PathBuf>,
    collisions: Vec<PathBuf>,
}

impl RunReportBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one outcome. A second success at the same destination is a collision: logged as
    /// a warning and recorded, the newer bytes stay on disk.
    pub fn add_outcome(&mut self, outcome: CopyOutcome, sink: &dyn Sink) {
        match outcome {
            CopyOutcome::Success {
                source,
                destination,
                bytes,
            } => {
                self.copied += 1;
                self.bytes_copied += bytes;
                if let Some(previous) = self.written.insert(destination.clone(), source.clone())
                    && previous != source
                {
                    sink.warn(&format!(
                        "destination collision: {} from {} overwritten by {}",
                        destination.display(),
                        previous.display(),
                        source.display()
                    ));
                    if !self.collisions.contains(&destination) {
                        self.collisions.push(destination);
                    }
                }
            }
            CopyOutcome::Failure(failure) => {
                self.failed += 1;
                self.failures.push(failure);
            }
        }
    }

    pub fn copied(&self) -> u64 {
        self.copied
    }

    pub fn failed(&self) -> u64 {
        self.failed
    }

    /// Finalize into the immutable report.
    pub fn build(
        self,
        status: RunStatus,
        files_found: u64,
        traversal_errors: Vec<CopyFailure>,
        limit: usize,
        peak_in_flight: usize,
    ) -> RunReport {
        RunReport {
            status,
            files_found,
            copied: self.copied,
            failed: self.failed,
            bytes_copied: self.bytes_copied,
            failures: self.failures,
            traversal_errors,
            collisions: self.collisions,
            limit,
            peak_in_flight,
        }
    }
}
