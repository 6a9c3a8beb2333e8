//! Visibility-aware refresh scheduler.
//!
//! Keeps the forecast view current: one tick on load, then one per
//! interval while the page is visible. Failures stop the loop until the
//! page is hidden and shown again.

pub mod runner;
pub mod state;
pub mod tick;

pub use runner::{SchedulerSnapshot, TickRunner, Visibility};
pub use state::{Mode, SchedulerState, TICK_INTERVAL, next_delay};
pub use tick::{FetchOutcome, run_tick};
