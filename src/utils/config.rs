//! Application configuration constants.
//! Tuning and thresholds in one place.

use std::sync::OnceLock;

// ---- Package / paths (from CARGO_PKG_NAME, cached) ----

/// Package-derived names: built once from `CARGO_PKG_NAME`, then cached.
pub struct PackagePaths {
    pkg_name: &'static str,
    config_filename: String,
}

static PACKAGE_PATHS: OnceLock<PackagePaths> = OnceLock::new();

impl PackagePaths {
    /// Build and cache names from `CARGO_PKG_NAME`. Called once on first use.
    pub fn get() -> &'static PackagePaths {
        PACKAGE_PATHS.get_or_init(|| {
            let pkg = env!("CARGO_PKG_NAME");
            PackagePaths {
                pkg_name: pkg,
                config_filename: format!(".{pkg}.toml"),
            }
        })
    }

    pub fn pkg_name(&self) -> &str {
        self.pkg_name
    }

    /// Config file looked up in the working directory when `--config` is not given.
    pub fn config_filename(&self) -> &str {
        &self.config_filename
    }
}

// ---- Buckets ----

/// Bucket for files whose name has no extension.
pub const NO_EXT_BUCKET: &str = "_noext";

// ---- Copy ----

/// Copy engine defaults.
pub struct CopyConsts;

impl CopyConsts {
    /// Default concurrency limiter capacity.
    pub const DEFAULT_LIMIT: usize = 64;
    /// Chunk size for the streamed copy (bytes). 1 MiB.
    pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;
    /// Chunk size for re-reading the destination when verifying (bytes). 1 MiB.
    pub const VERIFY_READ_CHUNK_SIZE: usize = 1024 * 1024;
    /// Name prefix of in-progress copies inside a bucket directory.
    pub const TEMP_PREFIX: &'static str = ".bucketer-";
    /// Name suffix of in-progress copies.
    pub const TEMP_SUFFIX: &'static str = ".part";

    /// True for the name of an in-progress copy (never walked as a source file).
    pub fn is_temp_name(name: &str) -> bool {
        name.starts_with(Self::TEMP_PREFIX) && name.ends_with(Self::TEMP_SUFFIX)
    }
}

// ---- Streaming channel cap ----

/// Capacity of the entry and outcome channels between walk, workers and coordinator.
pub struct StreamingChannelCap;

impl StreamingChannelCap {
    /// Entries buffered per limiter slot before the walk blocks on send.
    pub const PER_SLOT: usize = 64;
    /// Lower bound so small limits still let the walk run ahead a little.
    pub const MIN: usize = 1_024;
    /// Upper bound (avoid huge allocation for very large limits).
    pub const MAX: usize = 100_000;

    /// Channel cap for a run with `limit` slots.
    pub fn for_limit(limit: usize) -> usize {
        limit
            .saturating_mul(Self::PER_SLOT)
            .clamp(Self::MIN, Self::MAX)
    }
}

// ---- Progress ----

/// Progress bar tuning.
pub struct ProgressConsts;

impl ProgressConsts {
    /// Finished copies between progress bar refreshes (reduce lock contention).
    pub const PROGRESS_UPDATE_BATCH_SIZE: usize = 32;
}
