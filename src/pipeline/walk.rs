//! Tree walk: lazy stream of regular files, with per-entry access errors kept local.
//!
//! [`TreeWalker`] is the serial walker: an explicit stack of pending directories, each read
//! once and turned into a tagged result at that node, so a directory that cannot be listed
//! costs only its own subtree. The parallel mode wraps jwalk and converts its results into
//! the same [`WalkOutcome`] shape. [`run_walk_loop`] is shared by both.

use crossbeam_channel::Sender;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::vec;

use crate::engine::tools::{ExcludeSet, should_include_in_walk};
use crate::{CopyFailure, FailureKind, FileEntry};

use super::context::WalkContext;

/// One result from a directory walk: a regular file, or an access error with optional path.
#[derive(Debug)]
pub enum WalkOutcome {
    Ok(FileEntry),
    Err { msg: String, path: Option<PathBuf> },
}

impl WalkOutcome {
    fn access_error(path: &Path, err: &io::Error) -> Self {
        WalkOutcome::Err {
            msg: format!("access error {}: {}", path.display(), err),
            path: Some(path.to_path_buf()),
        }
    }
}

/// What the walk thread hands back once its sequence is exhausted.
#[derive(Debug, Default)]
pub struct WalkSummary {
    /// Files sent to the scheduler.
    pub files: usize,
    pub errors: Vec<CopyFailure>,
    /// True when the walk stopped early on cancellation.
    pub cancelled: bool,
}

/// A directory whose children are still being handed out.
struct PendingDir {
    children: vec::IntoIter<io::Result<PathBuf>>,
}

impl PendingDir {
    /// List `dir` eagerly (names only, sorted) so the handle is closed before descending.
    fn read(dir: &Path) -> io::Result<Self> {
        let mut names = Vec::new();
        let mut errors = Vec::new();
        for entry in fs::read_dir(dir)? {
            match entry {
                Ok(e) => names.push(e.path()),
                Err(e) => errors.push(e),
            }
        }
        names.sort();
        let children: Vec<io::Result<PathBuf>> = errors
            .into_iter()
            .map(Err)
            .chain(names.into_iter().map(Ok))
            .collect();
        Ok(Self {
            children: children.into_iter(),
        })
    }
}

/// Serial depth-first walker over regular files. Finite and single-use.
pub struct TreeWalker {
    root: PathBuf,
    follow_links: bool,
    skip_dir: Option<PathBuf>,
    exclude: ExcludeSet,
    stack: Vec<(PathBuf, PendingDir)>,
    visited: HashSet<PathBuf>,
    started: bool,
}

impl TreeWalker {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            follow_links: false,
            skip_dir: None,
            exclude: ExcludeSet::empty(),
            stack: Vec::new(),
            visited: HashSet::new(),
            started: false,
        }
    }

    pub fn follow_links(mut self, yes: bool) -> Self {
        self.follow_links = yes;
        self
    }

    /// Directory never entered (the output root when nested in the source).
    pub fn skip_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.skip_dir = dir;
        self
    }

    pub fn exclude(mut self, exclude: ExcludeSet) -> Self {
        self.exclude = exclude;
        self
    }

    /// Push `dir` for later listing. Returns an outcome only when the listing failed.
    fn enter_dir(&mut self, dir: PathBuf) -> Option<WalkOutcome> {
        if self.follow_links {
            match fs::canonicalize(&dir) {
                Ok(canonical) => {
                    if !self.visited.insert(canonical) {
                        log::debug!("skipping already visited directory {}", dir.display());
                        return None;
                    }
                }
                Err(e) => return Some(WalkOutcome::access_error(&dir, &e)),
            }
        }
        match PendingDir::read(&dir) {
            Ok(pending) => {
                self.stack.push((dir, pending));
                None
            }
            Err(e) => Some(WalkOutcome::access_error(&dir, &e)),
        }
    }

    fn start(&mut self) -> Option<WalkOutcome> {
        self.started = true;
        let root = self.root.clone();
        match fs::metadata(&root) {
            Ok(meta) if meta.is_dir() => self.enter_dir(root),
            Ok(_) => Some(WalkOutcome::Err {
                msg: format!("not a folder: {}", root.display()),
                path: Some(root),
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Some(WalkOutcome::Err {
                msg: format!("folder not exist: {}", root.display()),
                path: Some(root),
            }),
            Err(e) => Some(WalkOutcome::Err {
                msg: format!("no access {}: {}", root.display(), e),
                path: Some(root),
            }),
        }
    }

    /// Classify one child. `None` means "nothing to yield, keep going".
    fn visit(&mut self, path: PathBuf) -> Option<WalkOutcome> {
        if !should_include_in_walk(&path, &self.root, &self.skip_dir, &self.exclude) {
            return None;
        }
        let meta = match fs::symlink_metadata(&path) {
            Ok(m) => m,
            Err(e) => return Some(WalkOutcome::access_error(&path, &e)),
        };
        let ft = meta.file_type();
        if ft.is_dir() {
            return self.enter_dir(path);
        }
        if ft.is_file() {
            return Some(WalkOutcome::Ok(FileEntry::new(path)));
        }
        if ft.is_symlink() && self.follow_links {
            return match fs::metadata(&path) {
                Ok(target) if target.is_dir() => self.enter_dir(path),
                Ok(target) if target.is_file() => Some(WalkOutcome::Ok(FileEntry::new(path))),
                Ok(_) => None,
                Err(e) => Some(WalkOutcome::access_error(&path, &e)),
            };
        }
        log::debug!("skipping non-regular entry {}", path.display());
        None
    }
}

impl Iterator for TreeWalker {
    type Item = WalkOutcome;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.started
            && let Some(outcome) = self.start()
        {
            return Some(outcome);
        }
        loop {
            let (dir, pending) = self.stack.last_mut()?;
            let child = match pending.children.next() {
                Some(c) => c,
                None => {
                    self.stack.pop();
                    continue;
                }
            };
            let outcome = match child {
                Ok(path) => self.visit(path),
                Err(e) => {
                    let dir = dir.clone();
                    Some(WalkOutcome::access_error(&dir, &e))
                }
            };
            if outcome.is_some() {
                return outcome;
            }
        }
    }
}

type JwalkEntry = jwalk::DirEntry<((), ())>;

/// Convert a jwalk result into [`WalkOutcome`]. Directories and non-regular entries map to `None`,
/// except a directory whose listing failed: jwalk yields it as `Ok` with `read_children_error`
/// set, and that becomes an access error for the directory.
/// With `follow_links`, jwalk reports a symlink's target type, so linked files pass through.
pub fn to_outcome_jwalk(r: Result<JwalkEntry, jwalk::Error>) -> Option<WalkOutcome> {
    match r {
        Ok(mut entry) => {
            if let Some(err) = entry.read_children_error.take() {
                let path = entry.path();
                return Some(WalkOutcome::Err {
                    msg: format!("access error {}: {}", path.display(), err),
                    path: Some(path),
                });
            }
            entry
                .file_type()
                .is_file()
                .then(|| WalkOutcome::Ok(FileEntry::new(entry.path())))
        }
        Err(err) => Some(WalkOutcome::Err {
            msg: format!("access error: {}", err),
            path: err.path().map(PathBuf::from),
        }),
    }
}

/// Parallel walk via jwalk on rayon's default pool. Excluded entries are pruned before descent.
pub fn jwalk_iter(ctx: &WalkContext) -> Box<dyn Iterator<Item = WalkOutcome>> {
    use jwalk::Parallelism;
    use std::time::Duration;

    let root = ctx.root.clone();
    let skip_dir = ctx.skip_dir.clone();
    let exclude = ctx.exclude.clone();
    Box::new(
        jwalk::WalkDir::new(&ctx.root)
            .follow_links(ctx.follow_links)
            .skip_hidden(false)
            .parallelism(Parallelism::RayonDefaultPool {
                busy_timeout: Duration::from_secs(60),
            })
            .process_read_dir(move |_depth, _dir, _state, children| {
                // The first call lists the root entry itself (depth 0); it must survive.
                children.retain(|child| match child {
                    Ok(e) if e.depth() == 0 => true,
                    Ok(e) => should_include_in_walk(&e.path(), &root, &skip_dir, &exclude),
                    Err(_) => true,
                });
            })
            .into_iter()
            .filter_map(to_outcome_jwalk),
    )
}

pub fn tree_walker_iter(ctx: &WalkContext) -> Box<dyn Iterator<Item = WalkOutcome>> {
    Box::new(
        TreeWalker::new(&ctx.root)
            .follow_links(ctx.follow_links)
            .skip_dir(ctx.skip_dir.clone())
            .exclude(ctx.exclude.clone()),
    )
}

/// Run the common walk loop: consume `iter`, send files to `entry_tx`, report errors through
/// the sink and collect them. Drops `entry_tx` when done so workers see the channel close.
pub fn run_walk_loop<I>(entry_tx: Sender<FileEntry>, ctx: &WalkContext, iter: I) -> WalkSummary
where
    I: Iterator<Item = WalkOutcome>,
{
    let mut summary = WalkSummary::default();
    for outcome in iter {
        if ctx.is_cancelled() {
            summary.cancelled = true;
            break;
        }
        match outcome {
            WalkOutcome::Ok(entry) => {
                if entry_tx.send(entry).is_err() {
                    break;
                }
                summary.files += 1;
            }
            WalkOutcome::Err { msg, path } => {
                ctx.sink.error(&msg);
                summary.errors.push(CopyFailure {
                    path: path.unwrap_or_else(|| PathBuf::from("<no-path>")),
                    destination: None,
                    kind: FailureKind::TraversalAccess,
                    message: msg,
                });
            }
        }
    }
    if !summary.cancelled && ctx.is_cancelled() {
        summary.cancelled = true;
    }
    drop(entry_tx);
    summary
}
