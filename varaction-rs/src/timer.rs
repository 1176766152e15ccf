//! Timer slots and the active-timer id.
//!
//! Slots are indexed by id `1..max`; id 0 means "no timer".  Arming and
//! disarming go through a [`TimerBackend`], which delivers expirations back
//! to the caller out of band.  The caller reports each expiration with
//! [`TimerRegistry::fired`] between evaluation passes; the evaluator only
//! reads [`TimerRegistry::active`].

use std::collections::VecDeque;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Default slot count; valid ids are `1..DEFAULT_MAX_TIMERS`.
pub const DEFAULT_MAX_TIMERS: u16 = 255;

/// Initial delay and repeat interval of an armed timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerSpec {
    pub delay: Duration,
    /// Zero for one-shot timers.
    pub interval: Duration,
}

impl TimerSpec {
    /// Split `ms` into whole seconds and residual milliseconds.
    pub fn from_millis(ms: u32, repeating: bool) -> Self {
        let secs = u64::from(ms / 1000);
        let nanos = (ms % 1000) * 1_000_000;
        let delay = Duration::new(secs, nanos);
        TimerSpec {
            delay,
            interval: if repeating { delay } else { Duration::ZERO },
        }
    }

    pub fn is_repeating(&self) -> bool {
        !self.interval.is_zero()
    }
}

/// Backend-assigned identity of an armed timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(pub u64);

/// The timer facility the registry arms timers with.
pub trait TimerBackend {
    /// Arm a timer that reports `id` when it expires.
    fn arm(&mut self, id: u16, spec: TimerSpec) -> Result<TimerHandle>;

    fn disarm(&mut self, handle: TimerHandle) -> Result<()>;
}

/// Backend that arms nothing; timers never fire.
#[derive(Debug, Default)]
pub struct NullBackend {
    next: u64,
}

impl TimerBackend for NullBackend {
    fn arm(&mut self, _id: u16, _spec: TimerSpec) -> Result<TimerHandle> {
        self.next += 1;
        Ok(TimerHandle(self.next))
    }

    fn disarm(&mut self, _handle: TimerHandle) -> Result<()> {
        Ok(())
    }
}

// ── Active timer ──────────────────────────────────────────────────────────────

/// How firings are retained between evaluation passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimerMode {
    /// Only the most recent firing is kept.
    #[default]
    Latest,
    /// Firings queue up (bounded) and are consumed one per pass.
    Queued,
}

/// The active-timer id read by the evaluator, plus undelivered firings.
#[derive(Debug)]
pub struct ActiveTimer {
    mode: TimerMode,
    current: u16,
    pending: VecDeque<u16>,
    depth: usize,
}

impl ActiveTimer {
    pub fn new(mode: TimerMode, depth: usize) -> Self {
        let depth = match mode {
            TimerMode::Latest => 1,
            TimerMode::Queued => depth.max(1),
        };
        ActiveTimer {
            mode,
            current: 0,
            pending: VecDeque::with_capacity(depth),
            depth,
        }
    }

    pub fn get(&self) -> u16 {
        self.current
    }

    /// Overwrite the active id directly; 0 clears it.
    pub fn set(&mut self, id: u16) {
        self.current = id;
    }

    /// Record a firing.
    pub fn record(&mut self, id: u16) {
        if self.pending.len() == self.depth {
            if let Some(lost) = self.pending.pop_front() {
                if self.mode == TimerMode::Queued {
                    warn!(lost, depth = self.depth, "timer queue full; dropping oldest firing");
                }
            }
        }
        self.pending.push_back(id);
        if self.mode == TimerMode::Latest {
            self.current = id;
        }
    }

    /// Make the next undelivered firing active, returning it (0 when none).
    pub fn next_pass(&mut self) -> u16 {
        self.current = self.pending.pop_front().unwrap_or(0);
        self.current
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

// ── TimerRegistry ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
struct Armed {
    handle: TimerHandle,
    repeating: bool,
}

/// Fixed-size table of armed timers.
pub struct TimerRegistry {
    slots: Vec<Option<Armed>>,
    backend: Box<dyn TimerBackend>,
    active: ActiveTimer,
}

impl std::fmt::Debug for TimerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerRegistry")
            .field("slots", &self.slots)
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

impl TimerRegistry {
    pub fn new(max: u16, backend: Box<dyn TimerBackend>, active: ActiveTimer) -> Self {
        TimerRegistry {
            slots: vec![None; usize::from(max)],
            backend,
            active,
        }
    }

    /// Slot index for `id`, or not-found when out of range.
    fn slot(&self, id: u16) -> Result<usize> {
        let idx = usize::from(id);
        if id == 0 || idx >= self.slots.len() {
            return Err(Error::not_found(format!("timer id {id} out of range")));
        }
        Ok(idx)
    }

    /// Arm a one-shot timer (`repeating == false`) or a tick.
    ///
    /// An id that is already armed is disarmed first.
    pub fn create(&mut self, id: u16, ms: u32, repeating: bool) -> Result<()> {
        let idx = self.slot(id)?;
        if let Some(old) = self.slots[idx].take() {
            debug!(id, "replacing armed timer");
            if let Err(e) = self.backend.disarm(old.handle) {
                warn!(id, error = %e, "failed to disarm replaced timer");
            }
        }
        let spec = TimerSpec::from_millis(ms, repeating);
        let handle = self.backend.arm(id, spec)?;
        debug!(id, ms, repeating, "timer armed");
        self.slots[idx] = Some(Armed { handle, repeating });
        Ok(())
    }

    /// Disarm `id`.  Not-found when nothing is armed there.
    pub fn delete(&mut self, id: u16) -> Result<()> {
        let idx = self.slot(id)?;
        let armed = self.slots[idx]
            .take()
            .ok_or_else(|| Error::not_found(format!("timer {id} is not armed")))?;
        debug!(id, "timer disarmed");
        self.backend.disarm(armed.handle)
    }

    /// Record that `id` expired.  One-shot slots become free again.
    pub fn fired(&mut self, id: u16) {
        if let Ok(idx) = self.slot(id) {
            if matches!(self.slots[idx], Some(Armed { repeating: false, .. })) {
                self.slots[idx] = None;
            }
        }
        debug!(id, "timer fired");
        self.active.record(id);
    }

    pub fn is_armed(&self, id: u16) -> bool {
        self.slot(id).is_ok_and(|idx| self.slots[idx].is_some())
    }

    pub fn active(&self) -> u16 {
        self.active.get()
    }

    pub fn set_active(&mut self, id: u16) {
        self.active.set(id);
    }

    pub fn next_pass(&mut self) -> u16 {
        self.active.next_pass()
    }

    /// Exclusive upper bound on timer ids.
    pub fn max(&self) -> u16 {
        self.slots.len() as u16
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
