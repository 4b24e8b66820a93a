//! File descriptor limit detection for capping concurrent copies (Unix).

/// File descriptors held by one in-flight copy (source + destination).
pub const FDS_PER_COPY: usize = 2;

/// Fraction of the process FD limit to use (leave headroom for the walk, logging, stdio).
const FD_LIMIT_FRACTION: f64 = 0.8;

/// Returns the soft limit for max open file descriptors, or `None` if unavailable (e.g. Windows).
#[cfg(unix)]
pub fn max_open_fds() -> Option<u64> {
    let mut rlim = libc::rlimit {
        rlim_cur: 0,
        rlim_max: 0,
    };
    // SAFETY: `rlim` is a valid, writable rlimit for the duration of the call.
    if unsafe { libc::getrlimit(libc::RLIMIT_NOFILE, &mut rlim) } != 0 {
        return None;
    }
    // Unlimited (or absurdly large) soft limit: nothing to cap against.
    if rlim.rlim_cur == libc::RLIM_INFINITY || rlim.rlim_cur > i64::MAX as u64 {
        return None;
    }
    Some(rlim.rlim_cur)
}

#[cfg(not(unix))]
pub fn max_open_fds() -> Option<u64> {
    None
}

/// Max concurrent copies that stay under ~80% of the FD limit, or `None` if no limit is known.
pub fn max_copies_by_fd_limit() -> Option<usize> {
    let limit = max_open_fds()?;
    Some(copies_for_fd_limit(limit))
}

/// Copies that fit in `fd_limit` descriptors with headroom. Never less than 1.
pub fn copies_for_fd_limit(fd_limit: u64) -> usize {
    let usable = (fd_limit as f64 * FD_LIMIT_FRACTION) as usize;
    (usable / FDS_PER_COPY).max(1)
}

/// Lower `requested` to what the FD limit allows. Returns `(effective, was_capped)`.
pub fn cap_limit_by_fds(requested: usize) -> (usize, bool) {
    match max_copies_by_fd_limit() {
        Some(cap) if cap < requested => (cap, true),
        _ => (requested, false),
    }
}
