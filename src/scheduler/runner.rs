//! Scheduler event loop.
//!
//! [`TickRunner`] owns the [`SchedulerState`] and the collaborators of a
//! tick, and drives them on a single task: visibility events, the armed
//! deadline and the in-flight tick are multiplexed with `tokio::select!`.
//! Nothing here is spawned; ticks never overlap.

use crate::bounds::{BoundingBox, NETHERLANDS};
use crate::fetcher::FragmentSource;
use crate::position::{MAX_POSITION_AGE, PositionSource};
use crate::reporter::ErrorReporter;
use crate::scheduler::state::{Mode, SchedulerState, TICK_INTERVAL, TickDisposition, TickTicket};
use crate::scheduler::tick::{FetchOutcome, run_tick};
use crate::view::ViewSurface;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Page visibility as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Hidden,
}

/// Public snapshot of the scheduler, published after every transition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulerSnapshot {
    pub mode: Mode,
    /// Delay the armed timer was set for; `None` when nothing is armed.
    pub armed_delay: Option<Duration>,
    /// A tick future is still being polled. After a hide this can stay
    /// `true` until the abandoned tick finishes and its outcome is discarded.
    pub tick_in_flight: bool,
    pub ticks_succeeded: u64,
    pub ticks_failed: u64,
    /// Outcomes dropped because the page was hidden while they ran.
    pub ticks_discarded: u64,
}

type TickFuture<'a> = Pin<Box<dyn Future<Output = FetchOutcome> + 'a>>;

/// Keeps a view refreshed while the page is visible.
pub struct TickRunner<P, F, V> {
    state: SchedulerState,
    source: P,
    fetcher: F,
    view: V,
    reporter: ErrorReporter,
    region: BoundingBox,
    max_position_age: Duration,
    snapshot_tx: watch::Sender<SchedulerSnapshot>,
}

impl<P, F, V> TickRunner<P, F, V>
where
    P: PositionSource,
    F: FragmentSource,
    V: ViewSurface,
{
    /// Create a runner with the default interval, staleness tolerance and region.
    pub fn new(source: P, fetcher: F, view: V) -> Self {
        let (snapshot_tx, _) = watch::channel(SchedulerSnapshot::default());
        Self {
            state: SchedulerState::new(TICK_INTERVAL),
            source,
            fetcher,
            view,
            reporter: ErrorReporter,
            region: NETHERLANDS,
            max_position_age: MAX_POSITION_AGE,
            snapshot_tx,
        }
    }

    /// Override the spacing between successful ticks.
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.state = SchedulerState::new(interval);
        self
    }

    /// Override how old a cached position reading may be.
    pub fn with_max_position_age(mut self, max_age: Duration) -> Self {
        self.max_position_age = max_age;
        self
    }

    /// Override the supported region.
    pub fn with_region(mut self, region: BoundingBox) -> Self {
        self.region = region;
        self
    }

    /// Watch scheduler snapshots.
    pub fn subscribe(&self) -> watch::Receiver<SchedulerSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Run until `cancel` fires.
    ///
    /// Ticks immediately on start. A closed `visibility` channel means the
    /// page stays in its current visibility for good; the loop keeps going.
    pub async fn run(self, mut visibility: mpsc::Receiver<Visibility>, cancel: CancellationToken) {
        let Self {
            mut state,
            source,
            fetcher,
            view,
            reporter,
            region,
            max_position_age,
            snapshot_tx,
        } = self;

        let mut counters = SchedulerSnapshot::default();
        let mut in_flight: Option<(TickTicket, TickFuture<'_>)> = None;
        let mut visibility_open = true;

        state.start(Instant::now());
        info!(
            interval_secs = state.interval().as_secs(),
            "refresh scheduler started"
        );

        loop {
            publish(&snapshot_tx, &state, &counters, in_flight.is_some());
            let deadline = state.pending_timer().map(|timer| timer.deadline);

            tokio::select! {
                () = cancel.cancelled() => {
                    info!("refresh scheduler stopped");
                    break;
                }
                event = visibility.recv(), if visibility_open => match event {
                    Some(Visibility::Hidden) => {
                        if state.page_hidden() {
                            info!("page hidden, refresh suspended");
                        }
                    }
                    Some(Visibility::Visible) => {
                        if let Some(delay) = state.page_visible(Instant::now()) {
                            info!(delay_ms = delay.as_millis() as u64, "page visible, refresh resumed");
                        }
                    }
                    None => {
                        debug!("visibility channel closed");
                        visibility_open = false;
                    }
                },
                () = wait_until(deadline) => {
                    if let Some(ticket) = state.timer_fired(Instant::now()) {
                        if in_flight.is_some() {
                            debug!("abandoning superseded tick");
                        }
                        debug!("tick started");
                        in_flight = Some((
                            ticket,
                            Box::pin(run_tick(&source, &fetcher, &region, max_position_age)),
                        ));
                    }
                }
                (ticket, outcome) = next_outcome(&mut in_flight) => {
                    in_flight = None;
                    match state.tick_completed(ticket, outcome.is_success(), Instant::now()) {
                        TickDisposition::Rescheduled(delay) => {
                            counters.ticks_succeeded += 1;
                            if let FetchOutcome::Success(html) = &outcome {
                                view.set_content(html);
                                view.clear_error();
                            }
                            info!(next_in_secs = delay.as_secs(), "forecast refreshed");
                        }
                        TickDisposition::Halted => {
                            counters.ticks_failed += 1;
                            let message = match &outcome {
                                FetchOutcome::Failure(err) => Some(err.to_string()),
                                FetchOutcome::Success(_) => None,
                            };
                            reporter.report(&view, message.as_deref());
                            info!("refresh halted until the page is shown again");
                        }
                        TickDisposition::Discarded => {
                            counters.ticks_discarded += 1;
                            debug!("discarded outcome of a superseded tick");
                        }
                    }
                }
            }
        }

        publish(&snapshot_tx, &state, &counters, in_flight.is_some());
    }
}

fn publish(
    snapshot_tx: &watch::Sender<SchedulerSnapshot>,
    state: &SchedulerState,
    counters: &SchedulerSnapshot,
    tick_in_flight: bool,
) {
    let next = SchedulerSnapshot {
        mode: state.mode(),
        armed_delay: state.pending_timer().map(|timer| timer.delay),
        tick_in_flight,
        ..counters.clone()
    };
    snapshot_tx.send_if_modified(|current| {
        if *current == next {
            return false;
        }
        *current = next;
        true
    });
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn next_outcome(in_flight: &mut Option<(TickTicket, TickFuture<'_>)>) -> (TickTicket, FetchOutcome) {
    match in_flight {
        Some((ticket, tick)) => (*ticket, tick.await),
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::error::{GeolocationError, RefreshError};
    use crate::position::{FixedPosition, Position};
    use crate::view::MemoryView;
    use std::sync::Mutex;

    const SECOND: Duration = Duration::from_secs(1);

    /// Records when each fetch happened; answers with `X` or a status.
    struct RecordingFetcher {
        calls: Mutex<Vec<Instant>>,
        status: Option<u16>,
        delay: Duration,
    }

    impl RecordingFetcher {
        fn ok() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                status: None,
                delay: Duration::ZERO,
            }
        }

        fn failing(status: u16) -> Self {
            Self {
                status: Some(status),
                ..Self::ok()
            }
        }

        fn slow(delay: Duration) -> Self {
            Self {
                delay,
                ..Self::ok()
            }
        }

        fn calls(&self) -> Vec<Instant> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl FragmentSource for RecordingFetcher {
        async fn fetch_fragment(&self, _position: &Position) -> Result<String, RefreshError> {
            self.calls.lock().unwrap().push(Instant::now());
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            match self.status {
                Some(status) => Err(RefreshError::Remote { status }),
                None => Ok("X".to_owned()),
            }
        }
    }

    struct Denied;

    impl PositionSource for Denied {
        async fn current_position(
            &self,
            _max_age: Duration,
        ) -> Result<Position, GeolocationError> {
            Err(GeolocationError::PermissionDenied("blocked".into()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn success_rearms_one_timer_for_interval() {
        let fetcher = RecordingFetcher::ok();
        let view = MemoryView::new();
        let runner = TickRunner::new(FixedPosition::new(52.0, 5.0), &fetcher, view.clone());
        let mut snapshots = runner.subscribe();
        let (_visibility_tx, visibility_rx) = mpsc::channel(4);
        let cancel = CancellationToken::new();

        let script = async {
            let snap = snapshots
                .wait_for(|s| s.ticks_succeeded == 1)
                .await
                .unwrap()
                .clone();
            assert_eq!(snap.armed_delay, Some(TICK_INTERVAL));
            assert_eq!(snap.mode, Mode::Active);
            assert_eq!(view.content(), "X");
            assert!(view.error().is_empty());
            cancel.cancel();
        };

        tokio::join!(runner.run(visibility_rx, cancel.clone()), script);
        assert_eq!(fetcher.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_repeat_every_interval() {
        let fetcher = RecordingFetcher::ok();
        let runner = TickRunner::new(FixedPosition::new(52.0, 5.0), &fetcher, MemoryView::new());
        let mut snapshots = runner.subscribe();
        let (_visibility_tx, visibility_rx) = mpsc::channel(4);
        let cancel = CancellationToken::new();

        let script = async {
            snapshots.wait_for(|s| s.ticks_succeeded == 3).await.unwrap();
            cancel.cancel();
        };

        tokio::join!(runner.run(visibility_rx, cancel.clone()), script);
        let calls = fetcher.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[1] - calls[0], 60 * SECOND);
        assert_eq!(calls[2] - calls[1], 60 * SECOND);
    }

    #[tokio::test(start_paused = true)]
    async fn remote_failure_halts_loop() {
        let fetcher = RecordingFetcher::failing(503);
        let view = MemoryView::with_content("previous");
        let runner = TickRunner::new(FixedPosition::new(52.0, 5.0), &fetcher, view.clone());
        let mut snapshots = runner.subscribe();
        let (_visibility_tx, visibility_rx) = mpsc::channel(4);
        let cancel = CancellationToken::new();

        let script = async {
            let snap = snapshots
                .wait_for(|s| s.ticks_failed == 1)
                .await
                .unwrap()
                .clone();
            assert_eq!(snap.armed_delay, None);
            assert!(!snap.tick_in_flight);
            // Nothing else happens however long we wait.
            tokio::time::sleep(10 * TICK_INTERVAL).await;
            cancel.cancel();
        };

        tokio::join!(runner.run(visibility_rx, cancel.clone()), script);
        assert_eq!(fetcher.calls().len(), 1);
        assert_eq!(view.error(), "Error: forecast server responded with status 503");
        assert_eq!(view.content(), "previous");
    }

    #[tokio::test(start_paused = true)]
    async fn out_of_region_reports_without_fetching() {
        let fetcher = RecordingFetcher::ok();
        let view = MemoryView::new();
        let runner = TickRunner::new(FixedPosition::new(10.0, 5.0), &fetcher, view.clone());
        let mut snapshots = runner.subscribe();
        let (_visibility_tx, visibility_rx) = mpsc::channel(4);
        let cancel = CancellationToken::new();

        let script = async {
            let snap = snapshots
                .wait_for(|s| s.ticks_failed == 1)
                .await
                .unwrap()
                .clone();
            assert_eq!(snap.armed_delay, None);
            cancel.cancel();
        };

        tokio::join!(runner.run(visibility_rx, cancel.clone()), script);
        assert!(fetcher.calls().is_empty());
        assert!(view.error().contains("outside supported region"));
    }

    #[tokio::test(start_paused = true)]
    async fn denied_position_is_reported() {
        let fetcher = RecordingFetcher::ok();
        let view = MemoryView::new();
        let runner = TickRunner::new(Denied, &fetcher, view.clone());
        let mut snapshots = runner.subscribe();
        let (_visibility_tx, visibility_rx) = mpsc::channel(4);
        let cancel = CancellationToken::new();

        let script = async {
            snapshots.wait_for(|s| s.ticks_failed == 1).await.unwrap();
            cancel.cancel();
        };

        tokio::join!(runner.run(visibility_rx, cancel.clone()), script);
        assert_eq!(view.error(), "Error: location permission denied: blocked");
    }

    #[tokio::test(start_paused = true)]
    async fn hidden_cancels_timer_and_long_absence_ticks_immediately() {
        let fetcher = RecordingFetcher::ok();
        let runner = TickRunner::new(FixedPosition::new(52.0, 5.0), &fetcher, MemoryView::new());
        let mut snapshots = runner.subscribe();
        let (visibility_tx, visibility_rx) = mpsc::channel(4);
        let cancel = CancellationToken::new();

        let script = async {
            snapshots.wait_for(|s| s.ticks_succeeded == 1).await.unwrap();

            visibility_tx.send(Visibility::Hidden).await.unwrap();
            let snap = snapshots
                .wait_for(|s| s.mode == Mode::Suspended)
                .await
                .unwrap()
                .clone();
            assert_eq!(snap.armed_delay, None);

            tokio::time::advance(125 * SECOND).await;
            let shown_at = Instant::now();
            visibility_tx.send(Visibility::Visible).await.unwrap();
            snapshots.wait_for(|s| s.ticks_succeeded == 2).await.unwrap();
            cancel.cancel();
            shown_at
        };

        let ((), shown_at) = tokio::join!(runner.run(visibility_rx, cancel.clone()), script);
        let calls = fetcher.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1], shown_at);
    }

    #[tokio::test(start_paused = true)]
    async fn short_absence_waits_out_the_interval() {
        let fetcher = RecordingFetcher::ok();
        let runner = TickRunner::new(FixedPosition::new(52.0, 5.0), &fetcher, MemoryView::new());
        let mut snapshots = runner.subscribe();
        let (visibility_tx, visibility_rx) = mpsc::channel(4);
        let cancel = CancellationToken::new();

        let script = async {
            snapshots.wait_for(|s| s.ticks_succeeded == 1).await.unwrap();
            visibility_tx.send(Visibility::Hidden).await.unwrap();
            snapshots.wait_for(|s| s.mode == Mode::Suspended).await.unwrap();

            tokio::time::advance(20 * SECOND).await;
            visibility_tx.send(Visibility::Visible).await.unwrap();
            let snap = snapshots
                .wait_for(|s| s.mode == Mode::Active)
                .await
                .unwrap()
                .clone();
            assert_eq!(snap.armed_delay, Some(40 * SECOND));

            snapshots.wait_for(|s| s.ticks_succeeded == 2).await.unwrap();
            cancel.cancel();
        };

        tokio::join!(runner.run(visibility_rx, cancel.clone()), script);
        let calls = fetcher.calls();
        assert_eq!(calls[1] - calls[0], 60 * SECOND);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_loop_resumes_on_visibility() {
        let fetcher = RecordingFetcher::failing(500);
        let runner = TickRunner::new(FixedPosition::new(52.0, 5.0), &fetcher, MemoryView::new());
        let mut snapshots = runner.subscribe();
        let (visibility_tx, visibility_rx) = mpsc::channel(4);
        let cancel = CancellationToken::new();

        let script = async {
            snapshots.wait_for(|s| s.ticks_failed == 1).await.unwrap();
            visibility_tx.send(Visibility::Hidden).await.unwrap();
            visibility_tx.send(Visibility::Visible).await.unwrap();
            snapshots.wait_for(|s| s.ticks_failed == 2).await.unwrap();
            cancel.cancel();
        };

        tokio::join!(runner.run(visibility_rx, cancel.clone()), script);
        assert_eq!(fetcher.calls().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn outcome_arriving_after_hide_is_discarded() {
        let fetcher = RecordingFetcher::slow(5 * SECOND);
        let view = MemoryView::with_content("before");
        let runner = TickRunner::new(FixedPosition::new(52.0, 5.0), &fetcher, view.clone());
        let mut snapshots = runner.subscribe();
        let (visibility_tx, visibility_rx) = mpsc::channel(4);
        let cancel = CancellationToken::new();

        let script = async {
            snapshots.wait_for(|s| s.tick_in_flight).await.unwrap();
            visibility_tx.send(Visibility::Hidden).await.unwrap();
            let snap = snapshots
                .wait_for(|s| s.mode == Mode::Suspended)
                .await
                .unwrap()
                .clone();
            // The abandoned tick keeps running until it finishes.
            assert!(snap.tick_in_flight);

            let snap = snapshots
                .wait_for(|s| s.ticks_discarded == 1)
                .await
                .unwrap()
                .clone();
            assert_eq!(snap.mode, Mode::Suspended);
            assert_eq!(snap.armed_delay, None);
            assert!(!snap.tick_in_flight);
            assert_eq!(snap.ticks_succeeded, 0);
            cancel.cancel();
        };

        tokio::join!(runner.run(visibility_rx, cancel.clone()), script);
        assert_eq!(view.content(), "before");
        assert_eq!(view.snapshot().content_writes, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn closed_visibility_channel_keeps_ticking() {
        let fetcher = RecordingFetcher::ok();
        let runner = TickRunner::new(FixedPosition::new(52.0, 5.0), &fetcher, MemoryView::new());
        let mut snapshots = runner.subscribe();
        let (visibility_tx, visibility_rx) = mpsc::channel(4);
        drop(visibility_tx);
        let cancel = CancellationToken::new();

        let script = async {
            snapshots.wait_for(|s| s.ticks_succeeded == 2).await.unwrap();
            cancel.cancel();
        };

        tokio::join!(runner.run(visibility_rx, cancel.clone()), script);
    }
}
