//! Tick scheduling state machine.
//!
//! Pure bookkeeping: no timers are created here. The state records which
//! deadline is armed and which tick is in flight, and the runner turns that
//! into real sleeps and futures. All transitions take `now` explicitly.

use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Target spacing between successful ticks.
pub const TICK_INTERVAL: Duration = Duration::from_millis(60_000);

/// Whether the page is being kept up to date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// A timer is armed, a tick is in flight, or the loop halted on a failure.
    #[default]
    Active,
    /// The page is hidden; nothing is armed.
    Suspended,
}

/// The single armed timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingTimer {
    pub deadline: Instant,
    pub delay: Duration,
    epoch: u64,
}

/// Proof that a tick was started; handed back on completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickTicket {
    epoch: u64,
}

/// What happened to a completed tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickDisposition {
    /// Success; the next tick is armed after the given delay.
    Rescheduled(Duration),
    /// Failure; nothing armed until the page becomes visible again.
    Halted,
    /// The tick belongs to an epoch that is no longer current.
    Discarded,
}

/// Delay before the next tick given the time since the last successful one.
///
/// `elapsed == interval` yields zero as well, through the subtraction.
pub fn next_delay(elapsed: Duration, interval: Duration) -> Duration {
    if elapsed > interval {
        Duration::ZERO
    } else {
        interval - elapsed
    }
}

/// Scheduler state owned by one runner for the page's lifetime.
///
/// Invariants: at most one pending timer; `Suspended` implies no pending
/// timer; every hidden transition starts a new epoch, so ticks started
/// before it are discarded on completion.
#[derive(Debug, Clone)]
pub struct SchedulerState {
    mode: Mode,
    last_tick_at: Option<Instant>,
    pending_timer: Option<PendingTimer>,
    in_flight: Option<TickTicket>,
    epoch: u64,
    interval: Duration,
}

impl Default for SchedulerState {
    fn default() -> Self {
        Self::new(TICK_INTERVAL)
    }
}

impl SchedulerState {
    pub fn new(interval: Duration) -> Self {
        Self {
            mode: Mode::Active,
            last_tick_at: None,
            pending_timer: None,
            in_flight: None,
            epoch: 0,
            interval,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn last_tick_at(&self) -> Option<Instant> {
        self.last_tick_at
    }

    pub fn pending_timer(&self) -> Option<&PendingTimer> {
        self.pending_timer.as_ref()
    }

    pub fn tick_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Active, but with nothing armed and nothing running: a failed tick
    /// stopped the loop.
    pub fn is_halted(&self) -> bool {
        self.mode == Mode::Active && self.pending_timer.is_none() && self.in_flight.is_none()
    }

    /// Initial load: arm an immediate tick.
    pub fn start(&mut self, now: Instant) -> Duration {
        self.mode = Mode::Active;
        self.arm(now, Duration::ZERO)
    }

    /// Page went to the background. Returns `false` if already suspended.
    pub fn page_hidden(&mut self) -> bool {
        if self.mode == Mode::Suspended {
            return false;
        }
        let cancelled = self.pending_timer.take().is_some();
        let abandoned = self.in_flight.take().is_some();
        self.mode = Mode::Suspended;
        self.epoch += 1;
        debug!(cancelled, abandoned, epoch = self.epoch, "scheduler suspended");
        true
    }

    /// Page came back. Arms the next tick and returns its delay, or `None`
    /// if the scheduler was not suspended.
    pub fn page_visible(&mut self, now: Instant) -> Option<Duration> {
        if self.mode != Mode::Suspended {
            return None;
        }
        self.mode = Mode::Active;
        // Never ticked: due immediately.
        let delay = match self.last_tick_at {
            Some(last) => next_delay(now.saturating_duration_since(last), self.interval),
            None => Duration::ZERO,
        };
        debug!(delay_ms = delay.as_millis() as u64, "scheduler resumed");
        Some(self.arm(now, delay))
    }

    /// The armed deadline passed. Consumes the timer and returns a ticket
    /// for the tick to run, or `None` if nothing is due.
    pub fn timer_fired(&mut self, now: Instant) -> Option<TickTicket> {
        if self.mode != Mode::Active {
            return None;
        }
        let timer = self.pending_timer?;
        if timer.deadline > now || timer.epoch != self.epoch {
            return None;
        }
        self.pending_timer = None;
        let ticket = TickTicket { epoch: self.epoch };
        self.in_flight = Some(ticket);
        Some(ticket)
    }

    /// Record the outcome of the tick identified by `ticket`.
    pub fn tick_completed(
        &mut self,
        ticket: TickTicket,
        succeeded: bool,
        now: Instant,
    ) -> TickDisposition {
        if self.mode != Mode::Active || self.in_flight != Some(ticket) {
            return TickDisposition::Discarded;
        }
        self.in_flight = None;

        if !succeeded {
            return TickDisposition::Halted;
        }
        self.last_tick_at = Some(now);
        TickDisposition::Rescheduled(self.arm(now, self.interval))
    }

    fn arm(&mut self, now: Instant, delay: Duration) -> Duration {
        self.pending_timer = Some(PendingTimer {
            deadline: now + delay,
            delay,
            epoch: self.epoch,
        });
        delay
    }
}
