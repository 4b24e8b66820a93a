//! Load `.bucketer.toml` (CLI only). Lib does not use this; the consuming program injects config via SortOpts.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::engine::arg_parser::Cli;
use crate::utils::config::PackagePaths;

#[derive(Debug, Default, Deserialize)]
pub struct BucketerToml {
    #[serde(default)]
    settings: SettingsSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SettingsSection {
    source: Option<PathBuf>,
    output: Option<PathBuf>,
    limit: Option<u64>,
    chunk_size: Option<u64>,
    follow_links: Option<bool>,
    exclude: Option<Vec<String>>,
    parallel_walk: Option<bool>,
    verify: Option<bool>,
    progress: Option<bool>,
    json: Option<bool>,
    verbose: Option<bool>,
}

/// Parse a config file body.
pub fn parse_bucketer_toml(s: &str) -> Result<BucketerToml> {
    toml::from_str(s).context("parse config")
}

/// Load the config file. An explicit `path` must exist; otherwise `.bucketer.toml` in the
/// working directory is used when present.
pub fn load_bucketer_toml(path: Option<&Path>) -> Result<Option<BucketerToml>> {
    let (path, required) = match path {
        Some(p) => (p.to_path_buf(), true),
        None => (PathBuf::from(PackagePaths::get().config_filename()), false),
    };
    if !required && !path.is_file() {
        return Ok(None);
    }
    let s = std::fs::read_to_string(&path)
        .with_context(|| format!("read config {}", path.display()))?;
    let file = parse_bucketer_toml(&s).with_context(|| path.display().to_string())?;
    log::debug!("Loaded config from {}", path.display());
    Ok(Some(file))
}

/// Fill args from file when the CLI left them unset.
macro_rules! apply_file_opt {
    ($file:expr, $args:expr, $field:ident) => {
        if $args.$field.is_none() {
            $args.$field = $file.$field.clone();
        }
    };
}

/// Merge file config into args. CLI values win; `exclude` lists are concatenated (file first).
pub fn apply_file_to_args(file: &BucketerToml, args: &mut Cli) {
    let s = &file.settings;
    apply_file_opt!(s, args, source);
    apply_file_opt!(s, args, output);
    apply_file_opt!(s, args, limit);
    apply_file_opt!(s, args, chunk_size);
    apply_file_opt!(s, args, follow_links);
    apply_file_opt!(s, args, parallel_walk);
    apply_file_opt!(s, args, verify);
    apply_file_opt!(s, args, progress);
    apply_file_opt!(s, args, json);
    apply_file_opt!(s, args, verbose);
    if let Some(ref v) = s.exclude {
        let mut merged = v.clone();
        merged.append(&mut args.exclude);
        args.exclude = merged;
    }
}
