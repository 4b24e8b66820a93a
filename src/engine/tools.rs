//! Path and filter utilities

use globset::{Glob, GlobSet, GlobSetBuilder};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::utils::config::CopyConsts;

/// Create `dir` and any missing parents. Succeeds when another thread or process created it
/// first; fails only if it cannot exist as a directory.
pub fn ensure_dir(dir: &Path) -> io::Result<()> {
    match fs::create_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists && dir.is_dir() => Ok(()),
        Err(e) => Err(e),
    }
}

/// Absolute form of `path`: canonical when it exists, else joined onto the working directory.
pub fn absolutize(path: &Path) -> PathBuf {
    if let Ok(resolved) = path.canonicalize() {
        return resolved;
    }
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Returns the output root when it lies strictly inside the source root (so the walk must skip it).
pub fn nested_output(source: &Path, output: &Path) -> Option<PathBuf> {
    let source = absolutize(source);
    let output = absolutize(output);
    (output != source && output.starts_with(&source)).then_some(output)
}

/// Compiled exclude patterns, matched against an entry's file name and its full path.
#[derive(Clone, Debug)]
pub struct ExcludeSet {
    set: GlobSet,
    empty: bool,
}

impl ExcludeSet {
    pub fn new(patterns: &[String]) -> Result<Self, globset::Error> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            builder.add(Glob::new(pattern)?);
        }
        Ok(Self {
            set: builder.build()?,
            empty: patterns.is_empty(),
        })
    }

    pub fn empty() -> Self {
        Self {
            set: GlobSet::empty(),
            empty: true,
        }
    }

    pub fn is_excluded(&self, path: &Path) -> bool {
        if self.empty {
            return false;
        }
        if let Some(name) = path.file_name()
            && self.set.is_match(name)
        {
            return true;
        }
        self.set.is_match(path)
    }
}

/// Returns true if the path should be included in the walk (not excluded).
pub fn should_include_in_walk(
    path: &Path,
    root: &Path,
    skip_dir: &Option<PathBuf>,
    exclude: &ExcludeSet,
) -> bool {
    if path == root {
        return false;
    }
    if let Some(skip) = skip_dir
        && path == skip.as_path()
    {
        return false;
    }
    if let Some(name) = path.file_name().and_then(|n| n.to_str())
        && CopyConsts::is_temp_name(name)
    {
        return false;
    }
    !exclude.is_excluded(path)
}

/// True when `a` and `b` name the same existing file (same device and inode on Unix,
/// same canonical path elsewhere). False if either cannot be stat'd.
#[cfg(unix)]
pub fn same_file(a: &Path, b: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;
    match (fs::metadata(a), fs::metadata(b)) {
        (Ok(ma), Ok(mb)) => ma.dev() == mb.dev() && ma.ino() == mb.ino(),
        _ => false,
    }
}

#[cfg(not(unix))]
pub fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(ca), Ok(cb)) => ca == cb,
        _ => false,
    }
}

/// True if the process is running with effective uid 0 (e.g. via sudo).
#[cfg(unix)]
pub fn running_as_root() -> bool {
    unsafe { libc::geteuid() == 0 }
}

#[cfg(not(unix))]
pub fn running_as_root() -> bool {
    false
}
