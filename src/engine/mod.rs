//! Engine module: per-file copy primitives and the CLI layer around them

pub mod arg_parser;
pub mod bucket;
pub mod cli;
pub mod copier;
pub mod hashing;
pub mod limiter;
pub mod progress;
pub mod tools;

// Re-export commonly used functions
pub use arg_parser::Cli;
pub use bucket::{bucket_for, bucket_for_name, destination_path};
pub use cli::{exit_code_for, handle_run};
pub use copier::{CopyParams, copy_file};
pub use hashing::{hash_file, hash_hex};
pub use limiter::{ConcurrencyLimiter, LimiterError, LimiterPermit};
pub use tools::{ExcludeSet, ensure_dir, running_as_root};
