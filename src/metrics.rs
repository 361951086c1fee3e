//! Live counters and throughput statistics for the worker pool.
//!
//! Every counter in this module is a plain atomic. Workers, producers and the
//! sampler thread update them without taking any lock, so reading statistics
//! never pauses the hot per-item path.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use crate::pool::PoolState;

/// Number of one-second samples kept for the moving average.
pub const WINDOW_SIZE: usize = 10;

const QUEUED_ONE: u64 = 1 << 32;
const IN_FLIGHT_MASK: u64 = QUEUED_ONE - 1;

/// Queued and in-flight item counts packed into a single word.
///
/// The high half holds the number of admitted items that have not started, the
/// low half the number of items inside the callback. Moving an item from one
/// half to the other is a single `fetch_add`, so any reader sees a pair that
/// existed at some instant.
///
/// Each half is 32 bits wide, so at most `u32::MAX` items can be queued or in
/// flight at once. Only an unlimited pool can get near that.
#[derive(Debug, Default)]
pub(crate) struct Backlog(AtomicU64);

impl Backlog {
    /// Records an admitted item. Must happen before the item becomes poppable.
    pub(crate) fn admit(&self) {
        let prev = self.0.fetch_add(QUEUED_ONE, Ordering::AcqRel);
        debug_assert!(prev >> 32 < u64::from(u32::MAX), "queued count overflow");
    }

    /// Moves one item from queued to in-flight.
    pub(crate) fn begin(&self) {
        self.0
            .fetch_add(1u64.wrapping_sub(QUEUED_ONE), Ordering::AcqRel);
    }

    /// Removes one in-flight item.
    pub(crate) fn finish(&self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }

    /// Removes one queued item that will never run.
    pub(crate) fn discard(&self) {
        self.0.fetch_sub(QUEUED_ONE, Ordering::AcqRel);
    }

    /// Returns `(queued, in_flight)`.
    pub(crate) fn load(&self) -> (usize, usize) {
        let raw = self.0.load(Ordering::Acquire);
        ((raw >> 32) as usize, (raw & IN_FLIGHT_MASK) as usize)
    }

    fn reset(&self) {
        self.0.store(0, Ordering::Release);
    }
}

/// Circular buffer of per-interval processed counts.
///
/// Only the sampler thread writes the slots and the cursor; workers only bump
/// `current`.
#[derive(Debug, Default)]
pub(crate) struct RollingWindow {
    current: AtomicUsize,
    samples: [AtomicUsize; WINDOW_SIZE],
    cursor: AtomicUsize,
    filled: AtomicUsize,
}

impl RollingWindow {
    pub(crate) fn record(&self) {
        self.current.fetch_add(1, Ordering::Relaxed);
    }

    /// Closes the current interval and stores its count in the next slot.
    /// Returns the stored count.
    pub(crate) fn sample(&self) -> usize {
        let count = self.current.swap(0, Ordering::AcqRel);
        let cursor = self.cursor.load(Ordering::Acquire);
        self.samples[cursor].store(count, Ordering::Release);
        self.cursor
            .store((cursor + 1) % WINDOW_SIZE, Ordering::Release);
        if self.filled.load(Ordering::Acquire) < WINDOW_SIZE {
            self.filled.fetch_add(1, Ordering::AcqRel);
        }
        count
    }

    /// The most recent completed sample, or the live count before the first
    /// sample exists.
    pub(crate) fn last(&self) -> usize {
        if self.filled.load(Ordering::Acquire) == 0 {
            return self.current.load(Ordering::Acquire);
        }
        let cursor = self.cursor.load(Ordering::Acquire);
        self.samples[(cursor + WINDOW_SIZE - 1) % WINDOW_SIZE].load(Ordering::Acquire)
    }

    /// Mean of the non-zero samples, or the live count when there are none.
    pub(crate) fn average(&self) -> f64 {
        let (sum, count) = self
            .samples
            .iter()
            .map(|s| s.load(Ordering::Acquire))
            .filter(|&n| n > 0)
            .fold((0usize, 0usize), |(sum, count), n| (sum + n, count + 1));

        if count == 0 {
            self.current.load(Ordering::Acquire) as f64
        } else {
            sum as f64 / count as f64
        }
    }

    fn reset(&self) {
        self.current.store(0, Ordering::Release);
        for slot in &self.samples {
            slot.store(0, Ordering::Release);
        }
        self.cursor.store(0, Ordering::Release);
        self.filled.store(0, Ordering::Release);
    }
}

/// All counters shared between the pool handle, its workers and the sampler.
#[derive(Debug, Default)]
pub(crate) struct PoolMetrics {
    pub(crate) backlog: Backlog,
    pub(crate) throughput: RollingWindow,
    processed: AtomicUsize,
    failed: AtomicUsize,
    active_workers: AtomicUsize,
}

impl PoolMetrics {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn on_item_failed(&self) {
        self.failed.fetch_add(1, Ordering::AcqRel);
    }

    /// Records one finished attempt, successful or not.
    pub(crate) fn on_item_finished(&self) {
        self.processed.fetch_add(1, Ordering::AcqRel);
        self.throughput.record();
        self.backlog.finish();
    }

    pub(crate) fn on_worker_started(&self) {
        self.active_workers.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn on_worker_stopped(&self) {
        self.active_workers.fetch_sub(1, Ordering::AcqRel);
    }

    pub(crate) fn processed(&self) -> usize {
        self.processed.load(Ordering::Acquire)
    }

    pub(crate) fn failed(&self) -> usize {
        self.failed.load(Ordering::Acquire)
    }

    pub(crate) fn active_workers(&self) -> usize {
        self.active_workers.load(Ordering::Acquire)
    }

    /// Zeroes every counter except the live worker count.
    pub(crate) fn reset(&self) {
        self.backlog.reset();
        self.throughput.reset();
        self.processed.store(0, Ordering::Release);
        self.failed.store(0, Ordering::Release);
    }
}

/// A point-in-time view of the pool's counters.
///
/// `enqueued` and `currently_processing` are read together from one atomic
/// word, so their sum never exceeds the configured queue limit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoolStats {
    /// Lifecycle state when the snapshot was taken.
    pub state: PoolState,
    /// Admitted items that have not started yet.
    pub enqueued: usize,
    /// Items currently inside the callback.
    pub currently_processing: usize,
    /// Worker loops currently alive.
    pub workers: usize,
    /// Total attempts, successful or failed.
    pub processed: usize,
    /// Attempts whose callback returned an error or panicked.
    pub failed: usize,
    /// Items finished during the last completed sampling interval.
    pub processed_last_second: usize,
    /// Mean throughput over the rolling window.
    pub processed_per_second_average: f64,
    /// Configured queue limit, 0 when unlimited.
    pub queue_limit: usize,
}

impl PoolStats {
    /// Items admitted but not yet finished.
    pub fn outstanding(&self) -> usize {
        self.enqueued + self.currently_processing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backlog_moves_items_between_halves() {
        let backlog = Backlog::default();
        backlog.admit();
        backlog.admit();
        backlog.begin();
        assert_eq!(backlog.load(), (1, 1));

        backlog.finish();
        backlog.discard();
        assert_eq!(backlog.load(), (0, 0));
    }

    #[test]
    fn backlog_admit_up_to_queued_ceiling() {
        let backlog = Backlog(AtomicU64::new(u64::from(u32::MAX - 1) << 32));
        backlog.admit();
        assert_eq!(backlog.load(), (u32::MAX as usize, 0));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "queued count overflow")]
    fn backlog_admit_past_queued_ceiling_panics() {
        let backlog = Backlog(AtomicU64::new(u64::from(u32::MAX) << 32));
        backlog.admit();
    }

    #[test]
    fn window_falls_back_to_live_count_before_first_sample() {
        let window = RollingWindow::default();
        window.record();
        window.record();
        assert_eq!(window.last(), 2);
        assert_eq!(window.average(), 2.0);
    }

    #[test]
    fn window_averages_non_zero_samples() {
        let window = RollingWindow::default();
        for _ in 0..4 {
            window.record();
        }
        assert_eq!(window.sample(), 4);
        assert_eq!(window.sample(), 0);
        for _ in 0..2 {
            window.record();
        }
        window.sample();

        assert_eq!(window.last(), 2);
        assert_eq!(window.average(), 3.0);
    }

    #[test]
    fn window_wraps_after_window_size_samples() {
        let window = RollingWindow::default();
        for round in 1..=WINDOW_SIZE + 2 {
            for _ in 0..round {
                window.record();
            }
            window.sample();
        }
        assert_eq!(window.last(), WINDOW_SIZE + 2);
        // Slots now hold 3..=12.
        assert_eq!(window.average(), 7.5);
    }
}
