//! Readiness flags, waiter notification and completion-rate accounting.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use core::task::Waker;

use super::primitives::AtomicWaker;

/// Edge flags set by the completion handler plus the wakers it notifies.
///
/// The flags only record that a wake happened. Whether data or space is
/// really available is always recomputed from ring occupancy.
pub struct Readiness {
    readable: AtomicBool,
    writeable: AtomicBool,
    read_waker: AtomicWaker,
    write_waker: AtomicWaker,
}

impl Readiness {
    /// Both flags clear, no waiters
    pub const fn new() -> Self {
        Self {
            readable: AtomicBool::new(false),
            writeable: AtomicBool::new(false),
            read_waker: AtomicWaker::new(),
            write_waker: AtomicWaker::new(),
        }
    }

    /// Mark readable and wake a waiting reader
    pub fn signal_readable(&self) {
        self.readable.store(true, Ordering::Release);
        self.read_waker.wake();
    }

    /// Mark writeable and wake a waiting writer
    pub fn signal_writeable(&self) {
        self.writeable.store(true, Ordering::Release);
        self.write_waker.wake();
    }

    /// Take both edge flags, returning `(readable, writeable)`
    pub fn take(&self) -> (bool, bool) {
        (
            self.readable.swap(false, Ordering::AcqRel),
            self.writeable.swap(false, Ordering::AcqRel),
        )
    }

    /// Clear both flags
    pub fn clear(&self) {
        self.readable.store(false, Ordering::Release);
        self.writeable.store(false, Ordering::Release);
    }

    /// Register the reader's waker
    pub fn register_reader(&self, waker: &Waker) {
        self.read_waker.register(waker);
    }

    /// Register the writer's waker
    pub fn register_writer(&self, waker: &Waker) {
        self.write_waker.register(waker);
    }

    /// Wake both sides, e.g. on close
    pub fn wake_all(&self) {
        self.read_waker.wake();
        self.write_waker.wake();
    }
}

impl Default for Readiness {
    fn default() -> Self {
        Self::new()
    }
}

/// Bounds how many chunk completions may happen without the process side
/// acknowledging them.
///
/// The completion handler releases one unit per chunk. Once the limit is
/// reached it withholds the next refresh and marks the pipeline stalled, so
/// the programmed hardware run drains and stops. The next process-side read
/// or write acknowledges, which resets the count and reports the stall so the
/// caller can resume it.
pub struct CompletionSemaphore {
    count: AtomicU32,
    limit: u32,
    stalled: AtomicBool,
}

impl CompletionSemaphore {
    /// Semaphore allowing `limit` unacknowledged completions
    pub const fn new(limit: u32) -> Self {
        Self {
            count: AtomicU32::new(0),
            limit,
            stalled: AtomicBool::new(false),
        }
    }

    /// Record one completion. Saturates at the limit.
    pub fn release(&self) {
        let _ = self
            .count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < self.limit).then_some(n + 1)
            });
    }

    /// No credit left
    pub fn is_saturated(&self) -> bool {
        self.count.load(Ordering::Acquire) >= self.limit
    }

    /// Note that a refresh was withheld
    pub fn mark_stalled(&self) {
        self.stalled.store(true, Ordering::Release);
    }

    /// Reset the count. Returns `true` if a refresh was withheld and must be
    /// resumed by the caller.
    pub fn acknowledge(&self) -> bool {
        self.count.store(0, Ordering::Release);
        self.stalled.swap(false, Ordering::AcqRel)
    }

    /// Unacknowledged completions
    pub fn pending(&self) -> u32 {
        self.count.load(Ordering::Acquire)
    }

    /// Forget all state, used when a transfer is armed or stopped
    pub fn reset(&self) {
        self.count.store(0, Ordering::Release);
        self.stalled.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::primitives::tests::{WakeCounter, test_waker};

    #[test]
    fn readiness_flags_are_edges() {
        let ready = Readiness::new();
        assert_eq!(ready.take(), (false, false));

        ready.signal_readable();
        assert_eq!(ready.take(), (true, false));
        assert_eq!(ready.take(), (false, false));

        ready.signal_writeable();
        ready.clear();
        assert_eq!(ready.take(), (false, false));
    }

    #[test]
    fn readiness_wakes_registered_side_only() {
        let ready = Readiness::new();
        let reader = WakeCounter::new();
        let writer = WakeCounter::new();
        ready.register_reader(&test_waker(reader.clone()));
        ready.register_writer(&test_waker(writer.clone()));

        ready.signal_readable();
        assert_eq!(reader.count(), 1);
        assert_eq!(writer.count(), 0);

        ready.wake_all();
        assert_eq!(writer.count(), 1);
    }

    #[test]
    fn semaphore_saturates_at_limit() {
        let sem = CompletionSemaphore::new(3);
        for _ in 0..10 {
            sem.release();
        }
        assert_eq!(sem.pending(), 3);
        assert!(sem.is_saturated());
    }

    #[test]
    fn acknowledge_reports_withheld_refresh() {
        let sem = CompletionSemaphore::new(2);
        sem.release();
        sem.release();
        sem.mark_stalled();

        assert!(sem.acknowledge());
        assert_eq!(sem.pending(), 0);
        assert!(!sem.is_saturated());
        assert!(!sem.acknowledge());
    }

    #[test]
    fn reset_clears_stall() {
        let sem = CompletionSemaphore::new(1);
        sem.release();
        sem.mark_stalled();
        sem.reset();
        assert_eq!(sem.pending(), 0);
        assert!(!sem.acknowledge());
    }
}
