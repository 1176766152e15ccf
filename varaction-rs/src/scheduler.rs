//! In-process timer backend driven by `tokio::time`.
//!
//! [`TimerScheduler`] keeps the armed timers and knows when the next one is
//! due, for use as a `tokio::time::sleep_until` deadline.  The driving loop
//! collects expired ids with [`TimerScheduler::take_ready`] (or waits for
//! them with `wait_ready`) and reports each one to the evaluation context
//! before the next pass:
//!
//! ```rust,ignore
//! let sched = SharedScheduler::default();
//! let mut ctx = Context::new(Config::default()).with_timer_backend(Box::new(sched.clone()));
//! loop {
//!     for id in sched.wait_ready().await {
//!         ctx.timer_fired(id);
//!     }
//!     while ctx.next_timer_pass() != 0 {
//!         ctx.process_compound_statement(&mut store, action)?;
//!     }
//! }
//! ```

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use tokio::time::{sleep_until, Instant};

use crate::error::Result;
use crate::timer::{TimerBackend, TimerHandle, TimerSpec};

/// One armed timer.
#[derive(Debug, Clone)]
pub struct Scheduled {
    pub handle: TimerHandle,
    /// Timer id reported on expiry.
    pub id: u16,
    /// Zero for one-shot timers.
    pub interval: Duration,
    pub next_run: Instant,
}

impl Scheduled {
    /// Advance to the next interval.  Returns `false` for one-shots.
    pub fn tick(&mut self) -> bool {
        if self.interval.is_zero() {
            return false;
        }
        // Step from the scheduled time, not from now, so ticks do not drift.
        self.next_run += self.interval;
        true
    }
}

/// Armed timers ordered by deadline on demand.
#[derive(Debug, Default)]
pub struct TimerScheduler {
    timers: Vec<Scheduled>,
    next_handle: u64,
}

impl TimerScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Soonest deadline, or `None` when nothing is armed.
    pub fn next_wakeup(&self) -> Option<Instant> {
        self.timers.iter().map(|t| t.next_run).min()
    }

    /// Ids of every timer due at `now`, in deadline order.
    ///
    /// Ticks are rescheduled; one-shots are dropped.
    pub fn take_ready(&mut self, now: Instant) -> Vec<u16> {
        let (mut ready, pending): (Vec<Scheduled>, Vec<Scheduled>) =
            self.timers.drain(..).partition(|t| t.next_run <= now);
        self.timers = pending;
        ready.sort_by_key(|t| t.next_run);
        let ids = ready.iter().map(|t| t.id).collect();
        for mut t in ready {
            if t.tick() {
                self.timers.push(t);
            }
        }
        ids
    }

    /// Sleep until the next deadline and return the ids that fired.
    ///
    /// Returns immediately with nothing when no timer is armed.
    pub async fn wait_ready(&mut self) -> Vec<u16> {
        let Some(deadline) = self.next_wakeup() else {
            return Vec::new();
        };
        sleep_until(deadline).await;
        self.take_ready(Instant::now())
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Scheduled> {
        self.timers.iter()
    }
}

impl TimerBackend for TimerScheduler {
    /// A zero initial delay arms nothing, like an OS timer given a zero
    /// expiry.
    fn arm(&mut self, id: u16, spec: TimerSpec) -> Result<TimerHandle> {
        self.next_handle += 1;
        let handle = TimerHandle(self.next_handle);
        if !spec.delay.is_zero() {
            self.timers.push(Scheduled {
                handle,
                id,
                interval: spec.interval,
                next_run: Instant::now() + spec.delay,
            });
        }
        Ok(handle)
    }

    /// Disarming an expired or unknown handle is not an error.
    fn disarm(&mut self, handle: TimerHandle) -> Result<()> {
        self.timers.retain(|t| t.handle != handle);
        Ok(())
    }
}

// ── SharedScheduler ───────────────────────────────────────────────────────────

/// A [`TimerScheduler`] shared between an evaluation context (as its
/// backend) and the loop that waits on it.
#[derive(Debug, Clone, Default)]
pub struct SharedScheduler(Rc<RefCell<TimerScheduler>>);

impl SharedScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_wakeup(&self) -> Option<Instant> {
        self.0.borrow().next_wakeup()
    }

    pub fn take_ready(&self, now: Instant) -> Vec<u16> {
        self.0.borrow_mut().take_ready(now)
    }

    /// Like [`TimerScheduler::wait_ready`]; the scheduler is not borrowed
    /// across the sleep.
    pub async fn wait_ready(&self) -> Vec<u16> {
        let Some(deadline) = self.next_wakeup() else {
            return Vec::new();
        };
        sleep_until(deadline).await;
        self.take_ready(Instant::now())
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }
}

impl TimerBackend for SharedScheduler {
    fn arm(&mut self, id: u16, spec: TimerSpec) -> Result<TimerHandle> {
        self.0.borrow_mut().arm(id, spec)
    }

    fn disarm(&mut self, handle: TimerHandle) -> Result<()> {
        self.0.borrow_mut().disarm(handle)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
