//! Single-file copy: bucket directory, streamed chunks, per-file outcome.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use blake3::Hasher;
use tempfile::NamedTempFile;

use crate::engine::bucket::destination_path;
use crate::engine::hashing::{hash_file, hash_hex};
use crate::engine::tools::{ensure_dir, same_file};
use crate::utils::Sink;
use crate::utils::config::CopyConsts;
use crate::{CopyFailure, CopyOutcome, FailureKind, FileEntry, SortOpts};

/// Per-run settings every copy shares.
#[derive(Clone, Debug)]
pub struct CopyParams {
    pub chunk_size: usize,
    pub verify: bool,
    pub cancel: Option<Arc<AtomicBool>>,
}

impl CopyParams {
    pub fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|c| c.load(Ordering::Relaxed))
    }
}

impl From<&SortOpts> for CopyParams {
    fn from(o: &SortOpts) -> Self {
        CopyParams {
            chunk_size: o.chunk_size.max(1),
            verify: o.verify,
            cancel: o.cancel.clone(),
        }
    }
}

/// Failure inside `stream_copy`. The in-progress file, if any, is already gone.
struct StepError {
    kind: FailureKind,
    message: String,
}

impl StepError {
    fn io(kind: FailureKind, err: io::Error) -> Self {
        Self {
            kind,
            message: err.to_string(),
        }
    }
}

/// Copy `entry` to `output_root/<bucket>/<name>`.
///
/// Bytes go to a uniquely named file in the bucket directory that is renamed over the
/// destination only once complete (and verified), so the destination is never seen half
/// written and concurrent copies to the same name resolve to whichever finished last.
/// No IO error escapes this function: every failure becomes a [`CopyOutcome::Failure`],
/// logged at error through `sink`. A source that already is its destination is left alone.
pub fn copy_file(
    entry: &FileEntry,
    output_root: &Path,
    params: &CopyParams,
    sink: &dyn Sink,
) -> CopyOutcome {
    let source = entry.path.as_path();
    let destination = destination_path(source, output_root);

    let failure = |kind: FailureKind, message: String| {
        let failure = CopyFailure {
            path: source.to_path_buf(),
            destination: Some(destination.clone()),
            kind,
            message,
        };
        sink.error(&failure.to_string());
        CopyOutcome::Failure(failure)
    };

    if params.is_cancelled() {
        return failure(FailureKind::Cancelled, "run cancelled before copy".to_string());
    }

    let bucket_dir = destination.parent().unwrap_or(output_root);
    if let Err(e) = ensure_dir(bucket_dir) {
        return failure(FailureKind::CreateBucket, e.to_string());
    }

    if same_file(source, &destination) {
        sink.info(&format!(
            "OK: {} -> {} (already in place)",
            source.display(),
            destination.display()
        ));
        return CopyOutcome::Success {
            source: source.to_path_buf(),
            destination,
            bytes: 0,
        };
    }

    let (temp, bytes, source_hash) = match stream_copy(source, bucket_dir, params) {
        Ok(v) => v,
        Err(step) => return failure(step.kind, step.message),
    };

    if let Some(expected) = source_hash {
        match hash_file(temp.path()) {
            Ok(actual) if actual == expected => {}
            Ok(actual) => {
                return failure(
                    FailureKind::Verify,
                    format!(
                        "hash mismatch (source {}, destination {})",
                        hash_hex(&expected),
                        hash_hex(&actual)
                    ),
                );
            }
            Err(e) => return failure(FailureKind::Verify, e.to_string()),
        }
    }

    if let Err(e) = temp.persist(&destination) {
        return failure(FailureKind::CreateDestination, e.error.to_string());
    }

    sink.info(&format!("OK: {} -> {}", source.display(), destination.display()));
    CopyOutcome::Success {
        source: source.to_path_buf(),
        destination,
        bytes,
    }
}

/// Stream `source` into a new temp file in `bucket_dir` in `chunk_size` pieces. Returns the
/// temp file, bytes written and, when verifying, the blake3 hash of what was read. The temp
/// file is deleted when dropped, so every early return cleans up after itself.
fn stream_copy(
    source: &Path,
    bucket_dir: &Path,
    params: &CopyParams,
) -> Result<(NamedTempFile, u64, Option<[u8; 32]>), StepError> {
    let mut reader =
        File::open(source).map_err(|e| StepError::io(FailureKind::OpenSource, e))?;
    let permissions = reader
        .metadata()
        .map_err(|e| StepError::io(FailureKind::OpenSource, e))?
        .permissions();
    // Temp files default to owner-only; the copy keeps the source's mode instead.
    let mut temp = tempfile::Builder::new()
        .prefix(CopyConsts::TEMP_PREFIX)
        .suffix(CopyConsts::TEMP_SUFFIX)
        .permissions(permissions)
        .tempfile_in(bucket_dir)
        .map_err(|e| StepError::io(FailureKind::CreateDestination, e))?;

    let mut hasher = params.verify.then(Hasher::new);
    let mut buffer = vec![0u8; params.chunk_size.max(1)];
    let mut total = 0_u64;
    let writer = temp.as_file_mut();
    loop {
        if params.is_cancelled() {
            return Err(StepError {
                kind: FailureKind::Cancelled,
                message: "run cancelled mid-copy".to_string(),
            });
        }
        let n = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(StepError::io(FailureKind::Read, e)),
        };
        writer
            .write_all(&buffer[..n])
            .map_err(|e| StepError::io(FailureKind::Write, e))?;
        if let Some(h) = hasher.as_mut() {
            h.update(&buffer[..n]);
        }
        total += n as u64;
    }
    writer
        .flush()
        .map_err(|e| StepError::io(FailureKind::Write, e))?;

    Ok((temp, total, hasher.map(|h| *h.finalize().as_bytes())))
}
