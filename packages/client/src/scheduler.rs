//! Single-pending-task scheduling.
//!
//! Cache flushes are coalesced onto the display's refresh cadence: at most
//! one flush is pending at a time, and arrivals while one is pending do not
//! schedule another.

use std::time::Duration;

use tokio::time::Instant;

/// Frame period used when none is configured (about 60 Hz).
pub const DEFAULT_FRAME_PERIOD: Duration = Duration::from_millis(16);

/// Schedules a deferred task with at most one pending at a time.
pub trait FrameScheduler {
    /// Schedules the task for the next frame. Returns `false` if one was
    /// already pending.
    fn schedule(&mut self) -> bool;

    /// Cancels the pending task, if any.
    fn cancel(&mut self);

    /// Whether a task is pending.
    fn is_pending(&self) -> bool;
}

/// A [`FrameScheduler`] driven by the tokio timer.
#[derive(Debug, Clone)]
pub struct FrameClock {
    period: Duration,
    deadline: Option<Instant>,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(DEFAULT_FRAME_PERIOD)
    }
}

impl FrameClock {
    /// Creates a clock that fires one `period` after scheduling.
    #[must_use]
    pub const fn new(period: Duration) -> Self {
        Self {
            period,
            deadline: None,
        }
    }

    /// Resolves when the pending frame is due, then clears it. Never
    /// resolves if nothing is pending, so it can sit in a `select!`.
    ///
    /// Cancel-safe: dropping the future keeps the frame pending.
    pub async fn tick(&mut self) {
        match self.deadline {
            Some(deadline) => {
                tokio::time::sleep_until(deadline).await;
                self.deadline = None;
            }
            None => std::future::pending().await,
        }
    }
}

impl FrameScheduler for FrameClock {
    fn schedule(&mut self) -> bool {
        if self.deadline.is_some() {
            return false;
        }
        self.deadline = Some(Instant::now() + self.period);
        true
    }

    fn cancel(&mut self) {
        self.deadline = None;
    }

    fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }
}
