use clap::Parser;
use std::path::PathBuf;

use crate::SortOpts;
use crate::utils::config::CopyConsts;

/// Copy every file of a directory tree into per-extension buckets.
///
/// Most fields are `Option` so values from `.bucketer.toml` can fill in what the command line
/// left unset.
#[derive(Clone, Debug, Default, Parser)]
#[command(name = "bucketer")]
#[command(about = "Copy a directory tree into one folder per file extension.")]
pub struct Cli {
    /// Directory to read from (walked recursively).
    #[arg(long, short = 's', value_name = "DIR")]
    pub source: Option<PathBuf>,

    /// Directory to write buckets into. Created if missing.
    #[arg(long, short = 'o', value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Max copies in flight. Default: 64. Lowered if the open file limit is too small.
    #[arg(long, short = 'l', value_parser = clap::value_parser!(u64).range(1..))]
    pub limit: Option<u64>,

    /// Read/write chunk size in bytes. Default: 1 MiB.
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub chunk_size: Option<u64>,

    /// Follow symbolic links.
    #[arg(long, short = 'f', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub follow_links: Option<bool>,

    /// Exclude patterns (glob syntax). Can specify multiple: -e pattern1 pattern2 pattern3
    #[arg(long, short = 'e', num_args = 1..)]
    pub exclude: Vec<String>,

    /// Walk directories in parallel (jwalk). Output order of log lines is not stable.
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub parallel_walk: Option<bool>,

    /// Re-hash each destination with blake3 and fail the copy on mismatch.
    #[arg(long, short = 'c', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub verify: Option<bool>,

    /// Show a progress counter on stderr.
    #[arg(long, short = 'p', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub progress: Option<bool>,

    /// Print the run report as JSON on stdout.
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub json: Option<bool>,

    /// Verbose output.
    #[arg(long, short = 'v', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub verbose: Option<bool>,

    /// Config file. Default: `.bucketer.toml` in the working directory, if present.
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Cli {
    pub fn is_verbose(&self) -> bool {
        self.verbose.unwrap_or(false)
    }

    /// Library options for this invocation (after the config file has been merged).
    pub fn sort_opts(&self) -> SortOpts {
        SortOpts {
            limit: self
                .limit
                .map_or(CopyConsts::DEFAULT_LIMIT, |n| n as usize),
            chunk_size: self
                .chunk_size
                .map_or(CopyConsts::DEFAULT_CHUNK_SIZE, |n| n as usize),
            follow_links: self.follow_links.unwrap_or(false),
            exclude: self.exclude.clone(),
            parallel_walk: self.parallel_walk.unwrap_or(false),
            verify: self.verify.unwrap_or(false),
            ..SortOpts::default()
        }
    }
}
