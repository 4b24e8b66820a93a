//! Counting admission gate bounding how many copies run at once.
//!
//! Waiters are admitted in ticket order (FIFO), so once a slot frees up the longest waiter gets
//! it and nobody starves. Release is tied to [`LimiterPermit`]'s drop, so every exit path out
//! of a copy body (success, error, panic unwind) hands the slot back.

use std::sync::{Condvar, Mutex, MutexGuard};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LimiterError {
    #[error("concurrency limit must be at least 1")]
    ZeroCapacity,
}

#[derive(Debug, Default)]
struct GateState {
    /// Next ticket handed to a caller of `acquire`.
    next_ticket: u64,
    /// Ticket allowed to enter next.
    next_admit: u64,
    in_use: usize,
    peak: usize,
}

/// Semaphore of fixed capacity N >= 1. Capacity never changes after construction.
#[derive(Debug)]
pub struct ConcurrencyLimiter {
    capacity: usize,
    state: Mutex<GateState>,
    cond: Condvar,
}

impl ConcurrencyLimiter {
    pub fn new(capacity: usize) -> Result<Self, LimiterError> {
        if capacity == 0 {
            return Err(LimiterError::ZeroCapacity);
        }
        Ok(Self {
            capacity,
            state: Mutex::new(GateState::default()),
            cond: Condvar::new(),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Block until a slot is free and this caller is first in line, then take the slot.
    pub fn acquire(&self) -> LimiterPermit<'_> {
        let mut state = self.lock();
        let ticket = state.next_ticket;
        state.next_ticket += 1;
        while !(state.next_admit == ticket && state.in_use < self.capacity) {
            state = self
                .cond
                .wait(state)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
        state.next_admit += 1;
        state.in_use += 1;
        state.peak = state.peak.max(state.in_use);
        drop(state);
        // The next ticket may be admissible too if slots remain.
        self.cond.notify_all();
        LimiterPermit { limiter: self }
    }

    fn release(&self) {
        let mut state = self.lock();
        state.in_use = state.in_use.saturating_sub(1);
        drop(state);
        self.cond.notify_all();
    }

    /// Slots currently held.
    pub fn in_flight(&self) -> usize {
        self.lock().in_use
    }

    /// Highest number of slots held at the same time since construction.
    pub fn peak(&self) -> usize {
        self.lock().peak
    }

    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// One admitted slot. Dropping it releases the slot.
#[derive(Debug)]
#[must_use = "the slot is released as soon as the permit is dropped"]
pub struct LimiterPermit<'a> {
    limiter: &'a ConcurrencyLimiter,
}

impl Drop for LimiterPermit<'_> {
    fn drop(&mut self) {
        self.limiter.release();
    }
}
