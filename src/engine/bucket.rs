//! Bucket and destination path derivation

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use crate::utils::config::NO_EXT_BUCKET;

/// Bucket name for a file name: lower-cased extension without the dot, or [`NO_EXT_BUCKET`].
///
/// Depends on the file name only. Dotfiles with no further dot (`.bashrc`) and names ending in
/// a dot (`notes.`) have no extension.
pub fn bucket_for_name(file_name: &OsStr) -> String {
    match Path::new(file_name).extension() {
        Some(ext) if !ext.is_empty() => ext.to_string_lossy().to_lowercase(),
        _ => NO_EXT_BUCKET.to_string(),
    }
}

/// Bucket for a path, using only its final component.
pub fn bucket_for(path: &Path) -> String {
    match path.file_name() {
        Some(name) => bucket_for_name(name),
        None => NO_EXT_BUCKET.to_string(),
    }
}

/// `output_root / bucket / file_name`. Defined for every path: one with no file name
/// component (`/`, `..`) is named [`NO_EXT_BUCKET`] so the result stays under `output_root`.
pub fn destination_path(source: &Path, output_root: &Path) -> PathBuf {
    let name = source.file_name().unwrap_or(OsStr::new(NO_EXT_BUCKET));
    output_root.join(bucket_for(source)).join(name)
}
