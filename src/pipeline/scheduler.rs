//! Copy scheduler: fan entries out to limiter-gated copy workers and join the whole batch.

use crossbeam_channel::{Receiver, Sender};
use log::debug;
use std::thread::{self, Scope, ScopedJoinHandle};

use crate::engine::copier::copy_file;
use crate::engine::limiter::ConcurrencyLimiter;
use crate::{CopyOutcome, FileEntry};

use super::context::{CopyContext, create_pipeline_channels};
use super::error_handler::RunError;

/// Single copy worker: take entries until the channel closes; each copy body runs while
/// holding a limiter permit, which is released when the permit drops whatever the outcome.
fn copy_worker_loop(
    entry_rx: Receiver<FileEntry>,
    outcome_tx: Sender<CopyOutcome>,
    limiter: &ConcurrencyLimiter,
    ctx: &CopyContext<'_>,
) -> usize {
    let mut done = 0_usize;
    while let Ok(entry) = entry_rx.recv() {
        let outcome = {
            let _permit = limiter.acquire();
            copy_file(&entry, &ctx.output, &ctx.params, ctx.sink)
        };
        if outcome_tx.send(outcome).is_err() {
            break;
        }
        done += 1;
    }
    done
}

/// Spawn `num_workers` copy workers inside `scope`. Caller must drop its own `outcome_tx`
/// afterwards so the outcome channel closes once the workers exit.
pub fn spawn_copy_workers<'scope, 'env>(
    scope: &'scope Scope<'scope, 'env>,
    entry_rx: Receiver<FileEntry>,
    outcome_tx: &Sender<CopyOutcome>,
    limiter: &'env ConcurrencyLimiter,
    ctx: &'env CopyContext<'env>,
    num_workers: usize,
) -> Vec<ScopedJoinHandle<'scope, usize>> {
    (0..num_workers.max(1))
        .map(|_| {
            let entry_rx = entry_rx.clone();
            let outcome_tx = outcome_tx.clone();
            scope.spawn(move || copy_worker_loop(entry_rx, outcome_tx, limiter, ctx))
        })
        .collect()
}

/// Bounded fan-out of copy tasks over one stream of entries.
pub struct CopyScheduler<'a> {
    limiter: &'a ConcurrencyLimiter,
    ctx: &'a CopyContext<'a>,
    channel_cap: usize,
}

impl<'a> CopyScheduler<'a> {
    pub fn new(limiter: &'a ConcurrencyLimiter, ctx: &'a CopyContext<'a>, channel_cap: usize) -> Self {
        Self {
            limiter,
            ctx,
            channel_cap: channel_cap.max(1),
        }
    }

    /// Run `produce` on its own thread to feed entries, copy each one under the limiter, and
    /// hand every outcome to `on_outcome` on the calling thread as it arrives.
    ///
    /// Returns `(produce's result, number of outcomes)` once the producer is done and every
    /// dispatched entry has an outcome. Failed copies do not stop the batch.
    pub fn run<P, R, F>(&self, produce: P, mut on_outcome: F) -> Result<(R, usize), RunError>
    where
        P: FnOnce(Sender<FileEntry>) -> R + Send,
        R: Send,
        F: FnMut(CopyOutcome),
    {
        let channels = create_pipeline_channels(self.channel_cap);
        let limiter = self.limiter;
        let ctx = self.ctx;
        thread::scope(|s| {
            let producer = s.spawn(move || produce(channels.entry_tx));
            let workers = spawn_copy_workers(
                s,
                channels.entry_rx,
                &channels.outcome_tx,
                limiter,
                ctx,
                limiter.capacity(),
            );
            // Dropping the last sender closes the channel once workers exit.
            drop(channels.outcome_tx);

            let mut received = 0_usize;
            while let Ok(outcome) = channels.outcome_rx.recv() {
                received += 1;
                on_outcome(outcome);
            }
            debug!("scheduler: outcome channel closed after {} outcomes", received);

            let produced = producer.join();
            let mut worker_panicked = false;
            for h in workers {
                worker_panicked |= h.join().is_err();
            }
            let produced = produced.map_err(|_| RunError::ThreadPanicked("walk"))?;
            if worker_panicked {
                return Err(RunError::ThreadPanicked("copy worker"));
            }
            Ok((produced, received))
        })
    }

    /// Copy a ready-made list of entries. Outcomes come back in completion order.
    pub fn run_entries(&self, entries: Vec<FileEntry>) -> Result<Vec<CopyOutcome>, RunError> {
        let mut outcomes = Vec::with_capacity(entries.len());
        self.run(
            move |tx| {
                for entry in entries {
                    if tx.send(entry).is_err() {
                        break;
                    }
                }
            },
            |o| outcomes.push(o),
        )?;
        Ok(outcomes)
    }
}
