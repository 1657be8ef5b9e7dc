//! Search progress counters and the resume watermark.
//!
//! [`SearchState`] is written only by the engine's coordinator and can be
//! read from anywhere (a progress display, a checkpoint writer) through
//! [`SearchState::snapshot`] without taking locks.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters for one search.
#[derive(Debug, Default)]
pub struct SearchState {
    issued: AtomicU64,
    completed: AtomicU64,
    available: AtomicU64,
    registered: AtomicU64,
    failed: AtomicU64,
    retries: AtomicU64,
    watermark: AtomicU64,
}

/// Point-in-time copy of [`SearchState`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchSnapshot {
    /// Distinct candidates taken from the generator
    pub issued: u64,
    /// Candidates with a terminal outcome
    pub completed: u64,
    /// Terminal `Available` outcomes
    pub available: u64,
    /// Terminal `Registered` outcomes
    pub registered: u64,
    /// Terminal `Indeterminate` outcomes
    pub failed: u64,
    /// Oracle calls that were retries of an earlier attempt
    pub retries: u64,
    /// Every candidate below this index has a terminal outcome
    pub watermark: u64,
}

impl SearchSnapshot {
    /// Candidates issued but not yet resolved.
    pub fn pending(&self) -> u64 {
        self.issued.saturating_sub(self.completed)
    }
}

impl SearchState {
    /// Counters for a search starting at generation index `start_index`.
    pub fn new(start_index: u64) -> Self {
        let state = Self::default();
        state.watermark.store(start_index, Ordering::Relaxed);
        state
    }

    /// Zero every counter and move the watermark to `start_index`.
    pub(crate) fn reset(&self, start_index: u64) {
        for counter in [
            &self.issued,
            &self.completed,
            &self.available,
            &self.registered,
            &self.failed,
            &self.retries,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
        self.watermark.store(start_index, Ordering::Release);
    }

    pub(crate) fn record_issued(&self) {
        self.issued.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_available(&self) {
        self.available.fetch_add(1, Ordering::Relaxed);
        self.completed.fetch_add(1, Ordering::Release);
    }

    pub(crate) fn record_registered(&self) {
        self.registered.fetch_add(1, Ordering::Relaxed);
        self.completed.fetch_add(1, Ordering::Release);
    }

    pub(crate) fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        self.completed.fetch_add(1, Ordering::Release);
    }

    pub(crate) fn set_watermark(&self, watermark: u64) {
        self.watermark.store(watermark, Ordering::Release);
    }

    pub fn watermark(&self) -> u64 {
        self.watermark.load(Ordering::Acquire)
    }

    pub fn snapshot(&self) -> SearchSnapshot {
        SearchSnapshot {
            completed: self.completed.load(Ordering::Acquire),
            issued: self.issued.load(Ordering::Relaxed),
            available: self.available.load(Ordering::Relaxed),
            registered: self.registered.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            watermark: self.watermark.load(Ordering::Acquire),
        }
    }
}

/// Tracks the lowest generation index without a terminal outcome.
///
/// Completions arrive out of order; indices above the watermark are held
/// until the gap below them closes.
#[derive(Debug, Clone)]
pub struct Watermark {
    next: u64,
    ahead: BTreeSet<u64>,
}

impl Watermark {
    pub fn new(start: u64) -> Self {
        Self {
            next: start,
            ahead: BTreeSet::new(),
        }
    }

    /// Current watermark.
    pub fn get(&self) -> u64 {
        self.next
    }

    /// Record a terminal outcome for `index` and return the new watermark.
    pub fn complete(&mut self, index: u64) -> u64 {
        if index == self.next {
            self.next += 1;
            while self.ahead.remove(&self.next) {
                self.next += 1;
            }
        } else if index > self.next {
            self.ahead.insert(index);
        }
        self.next
    }

    /// Completed indices still waiting on a gap below them.
    pub fn pending_above(&self) -> usize {
        self.ahead.len()
    }
}
