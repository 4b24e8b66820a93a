//! Progress bar utilities for displaying copy status

use kdam::{Bar, BarExt};
use std::sync::{Arc, Mutex};

use crate::CopyOutcome;
use crate::utils::config::ProgressConsts;

// Progress bar type alias
pub type ProgressBar = Arc<Mutex<Bar>>;

/// Create a counter for unknown total (shows count without percentage). The walk streams,
/// so the number of files is not known up front.
pub fn create_counter(desc: &'static str) -> ProgressBar {
    Arc::new(Mutex::new(kdam::tqdm!(
        total = 0,
        desc = desc,
        animation = kdam::Animation::Classic,
        position = 0,
        unit = " files"
    )))
}

/// Advance the bar by `n`. Blocks on the lock so no increment is dropped; only the
/// coordinator thread updates it.
pub fn update_progress_bar(pb: &ProgressBar, n: usize) {
    let mut pb = pb.lock().unwrap_or_else(|p| p.into_inner());
    let _ = pb.update(n);
}

/// Force a refresh of the bar (e.g. so counter shows "0 files" immediately).
pub fn refresh_bar(pb: &ProgressBar) {
    if let Ok(mut bar) = pb.try_lock() {
        let _ = bar.refresh();
    }
}

/// Outcome callback that advances `bar` every `PROGRESS_UPDATE_BATCH_SIZE` finished copies.
/// Returns the callback and a flush function for the remainder.
pub fn outcome_progress(bar: &ProgressBar) -> (impl FnMut(&CopyOutcome), impl FnOnce()) {
    let pending = Arc::new(Mutex::new(0_usize));
    let on_outcome = {
        let bar = Arc::clone(bar);
        let pending = Arc::clone(&pending);
        move |_outcome: &CopyOutcome| {
            let mut n = pending.lock().unwrap_or_else(|p| p.into_inner());
            *n += 1;
            if *n >= ProgressConsts::PROGRESS_UPDATE_BATCH_SIZE {
                update_progress_bar(&bar, *n);
                *n = 0;
            }
        }
    };
    let flush = {
        let bar = Arc::clone(bar);
        move || {
            let n = *pending.lock().unwrap_or_else(|p| p.into_inner());
            if n > 0 {
                update_progress_bar(&bar, n);
            }
            let mut b = bar.lock().unwrap_or_else(|p| p.into_inner());
            let _ = b.refresh();
            eprintln!();
        }
    };
    (on_outcome, flush)
}
