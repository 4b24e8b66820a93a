pub mod bucketer_toml;
pub mod config;
pub mod fd_limit;
pub mod logger;
pub mod sink;

pub use config::*;
pub use fd_limit::{FDS_PER_COPY, cap_limit_by_fds, max_copies_by_fd_limit, max_open_fds};
pub use logger::{Colors, setup_logging};
pub use sink::{LogSink, MemorySink, Sink};
