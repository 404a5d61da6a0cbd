//! Two-tier batching of streamed records.
//!
//! Records are buffered until the buffer reaches a threshold, at which
//! point a flush is scheduled for the next frame. A flush moves the whole
//! buffer into the cache in one update, so the map re-renders once per
//! batch instead of once per record.

use std::mem;

use crate::cache::RecordCache;
use crate::scheduler::FrameScheduler;

/// Buffers incoming records and flushes them into a [`RecordCache`].
#[derive(Debug)]
pub struct Accumulator<T, S> {
    buffer: Vec<T>,
    threshold: usize,
    scheduler: S,
    received: u64,
}

impl<T, S: FrameScheduler> Accumulator<T, S> {
    /// Creates an accumulator that schedules a flush once `threshold`
    /// records are buffered.
    #[must_use]
    pub fn new(threshold: usize, scheduler: S) -> Self {
        let threshold = threshold.max(1);
        Self {
            buffer: Vec::with_capacity(threshold),
            threshold,
            scheduler,
            received: 0,
        }
    }

    /// Buffers one record, scheduling a flush if the threshold is reached
    /// and none is pending.
    pub fn push(&mut self, record: T) {
        self.buffer.push(record);
        self.received += 1;
        if self.buffer.len() >= self.threshold && !self.scheduler.is_pending() {
            self.scheduler.schedule();
        }
    }

    /// Moves every buffered record into `cache`. Returns the number moved.
    pub fn flush(&mut self, cache: &mut RecordCache<T>) -> usize {
        self.scheduler.cancel();
        let count = self.buffer.len();
        if count > 0 {
            let batch = mem::replace(&mut self.buffer, Vec::with_capacity(self.threshold));
            cache.extend(batch);
            log::trace!("Flushed {count} records ({} cached)", cache.len());
        }
        count
    }

    /// Cancels any pending flush and flushes whatever is buffered, even
    /// below the threshold. Called once the stream has ended.
    pub fn finish(&mut self, cache: &mut RecordCache<T>) -> usize {
        self.scheduler.cancel();
        self.flush(cache)
    }

    /// Records currently buffered.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Records received since creation.
    #[must_use]
    pub const fn received(&self) -> u64 {
        self.received
    }

    /// The scheduler, so a driver can wait on it.
    pub const fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }
}
