//! Debounce and periodic sync timers.
//!
//! Timers are plain deadlines; the host calls `poll` with its own clock, so
//! no runtime or thread is owned here.

use std::time::{Duration, Instant};

/// Work that became due on `poll`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduledAction {
    /// Debounced persistence is due.
    Persist,
    /// Periodic sync retry is due.
    Sync,
}

#[derive(Debug, Clone)]
pub struct PersistScheduler {
    debounce: Duration,
    sync_interval: Duration,
    persist_deadline: Option<Instant>,
    next_sync: Instant,
}

impl PersistScheduler {
    pub fn new(debounce: Duration, sync_interval: Duration, now: Instant) -> Self {
        Self {
            debounce,
            sync_interval,
            persist_deadline: None,
            next_sync: now + sync_interval,
        }
    }

    /// Schedules persistence after a mutation.
    ///
    /// Returns `true` when the caller must persist right away (`immediate`).
    /// Otherwise the first pending call fixes the deadline and later calls
    /// join it without pushing it back.
    pub fn mark_dirty(&mut self, immediate: bool, now: Instant) -> bool {
        if immediate {
            self.persist_deadline = None;
            return true;
        }
        if self.persist_deadline.is_none() {
            self.persist_deadline = Some(now + self.debounce);
        }
        false
    }

    /// Whether a debounced persist is waiting.
    pub fn is_dirty(&self) -> bool {
        self.persist_deadline.is_some()
    }

    /// Drops any waiting debounced persist.
    pub fn cancel_persist(&mut self) {
        self.persist_deadline = None;
    }

    /// Returns the actions due at `now` and re-arms the timers.
    pub fn poll(&mut self, now: Instant) -> Vec<ScheduledAction> {
        let mut due = Vec::new();
        if self.persist_deadline.is_some_and(|deadline| deadline <= now) {
            self.persist_deadline = None;
            due.push(ScheduledAction::Persist);
        }
        if self.next_sync <= now {
            // Missed periods collapse into one run.
            self.next_sync = now + self.sync_interval;
            due.push(ScheduledAction::Sync);
        }
        due
    }

    /// Earliest instant at which `poll` has work.
    pub fn next_deadline(&self) -> Instant {
        match self.persist_deadline {
            Some(deadline) => deadline.min(self.next_sync),
            None => self.next_sync,
        }
    }
}
