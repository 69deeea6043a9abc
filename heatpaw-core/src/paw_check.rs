//! Paw safety checks.
//!
//! Two measurement modes exist. The timed hold test is a small state machine
//! advanced by an external [`Ticker`]: the walker holds the back of a hand on
//! the pavement, and stopping before the threshold means the surface is too
//! hot. The direct reading parses a thermometer value typed in by the walker.

use std::{future::Future, time::Duration};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::{
    sync::{oneshot, watch},
    task::JoinHandle,
    time::{Instant, Interval, MissedTickBehavior, interval_at},
};
use tracing::{debug, info, warn};

use crate::error::InputError;

/// Ticks the walker must hold out for the surface to count as safe.
pub const HOLD_THRESHOLD: u32 = 7;
/// Surface readings at or above this are too hot for paws.
pub const SAFE_SURFACE_LIMIT_F: f64 = 125.0;
/// Proxy surface temperature reported when the hold test is passed.
pub const HELD_PROXY_F: f64 = 120.0;
/// Proxy surface temperature reported when the hold test is aborted.
pub const ABORTED_PROXY_F: f64 = 130.0;
pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PawMethod {
    TimedHoldTest,
    DirectReading,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PawVerdict {
    pub surface_temp_f: f64,
    pub method: PawMethod,
    pub is_safe: bool,
}

impl PawVerdict {
    pub fn hold_passed() -> Self {
        Self { surface_temp_f: HELD_PROXY_F, method: PawMethod::TimedHoldTest, is_safe: true }
    }

    pub fn hold_aborted() -> Self {
        Self { surface_temp_f: ABORTED_PROXY_F, method: PawMethod::TimedHoldTest, is_safe: false }
    }

    pub fn from_reading(surface_temp_f: f64) -> Self {
        Self {
            surface_temp_f,
            method: PawMethod::DirectReading,
            is_safe: surface_temp_f < SAFE_SURFACE_LIMIT_F,
        }
    }

    pub fn message(&self) -> String {
        if self.is_safe {
            format!("Surface temperature is {}°F - Safe for walking!", self.surface_temp_f)
        } else {
            format!(
                "Surface temperature is {}°F - Too hot for paws! Wait for cooler conditions.",
                self.surface_temp_f
            )
        }
    }
}

/// Parse a thermometer reading into a verdict.
pub fn submit_reading(raw: &str) -> Result<PawVerdict, InputError> {
    let trimmed = raw.trim();
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(PawVerdict::from_reading(value)),
        _ => Err(InputError::Unparsable(trimmed.to_string())),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldState {
    Idle,
    Running { count: u32 },
    Completed,
    Aborted,
}

/// State machine for the timed hold test.
#[derive(Debug)]
pub struct HoldTest {
    state: HoldState,
}

impl Default for HoldTest {
    fn default() -> Self {
        Self::new()
    }
}

impl HoldTest {
    pub fn new() -> Self {
        Self { state: HoldState::Idle }
    }

    pub fn state(&self) -> HoldState {
        self.state
    }

    pub fn count(&self) -> u32 {
        match self.state {
            HoldState::Running { count } => count,
            _ => 0,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.state, HoldState::Completed | HoldState::Aborted)
    }

    /// Begin a fresh run from zero. Returns false if a run is already going.
    pub fn start(&mut self) -> bool {
        if let HoldState::Running { .. } = self.state {
            return false;
        }
        self.state = HoldState::Running { count: 0 };
        true
    }

    /// Advance one tick. Yields the verdict on the tick that reaches the threshold.
    pub fn tick(&mut self) -> Option<PawVerdict> {
        let HoldState::Running { count } = self.state else {
            return None;
        };

        let count = count + 1;
        if count >= HOLD_THRESHOLD {
            self.state = HoldState::Completed;
            Some(PawVerdict::hold_passed())
        } else {
            self.state = HoldState::Running { count };
            None
        }
    }

    /// Stop a running test: the surface was too hot to hold.
    pub fn abort(&mut self) -> Option<PawVerdict> {
        match self.state {
            HoldState::Running { count } => {
                debug!(count, "hold test aborted");
                self.state = HoldState::Aborted;
                Some(PawVerdict::hold_aborted())
            }
            _ => None,
        }
    }
}

/// Clock abstraction driving the hold test.
#[async_trait]
pub trait Ticker: Send {
    /// Resolves once per period. Each call yields exactly one tick.
    async fn tick(&mut self);
}

/// Production ticker backed by the tokio timer.
pub struct IntervalTicker {
    interval: Interval,
}

impl IntervalTicker {
    pub fn every(period: Duration) -> Self {
        // The first tick lands one full period after start, not immediately.
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval }
    }
}

#[async_trait]
impl Ticker for IntervalTicker {
    async fn tick(&mut self) {
        self.interval.tick().await;
    }
}

/// Run a hold test to its verdict, racing the ticker against `abort`.
///
/// `on_tick` sees the running count after every tick that did not finish the
/// test.
pub async fn run_hold_test<T, A, F>(
    test: &mut HoldTest,
    ticker: &mut T,
    abort: A,
    mut on_tick: F,
) -> PawVerdict
where
    T: Ticker + ?Sized,
    A: Future<Output = ()>,
    F: FnMut(u32),
{
    test.start();
    tokio::pin!(abort);

    loop {
        tokio::select! {
            biased;
            _ = &mut abort => {
                return test.abort().unwrap_or_else(PawVerdict::hold_aborted);
            }
            _ = ticker.tick() => {
                if let Some(verdict) = test.tick() {
                    return verdict;
                }
                on_tick(test.count());
            }
        }
    }
}

/// A hold test running on its own task.
pub struct HoldTestHandle {
    task: JoinHandle<PawVerdict>,
    progress: watch::Receiver<u32>,
}

impl HoldTestHandle {
    /// Running count, updated once per tick.
    pub fn progress(&self) -> watch::Receiver<u32> {
        self.progress.clone()
    }

    pub async fn verdict(self) -> PawVerdict {
        match self.task.await {
            Ok(verdict) => verdict,
            Err(err) => {
                warn!(error = %err, "hold test task ended abnormally, treating surface as too hot");
                PawVerdict::hold_aborted()
            }
        }
    }
}

enum ActiveCheck {
    Timed { abort: oneshot::Sender<()> },
    Direct,
}

/// Session-level evaluator: one mode at a time, selected before starting.
pub struct PawCheckEvaluator {
    tick_period: Duration,
    active: Option<ActiveCheck>,
}

impl Default for PawCheckEvaluator {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_PERIOD)
    }
}

impl PawCheckEvaluator {
    pub fn new(tick_period: Duration) -> Self {
        Self { tick_period, active: None }
    }

    /// Select a mode and start it. A timed test starts counting immediately
    /// and its handle is returned. Starting replaces any previous check; a
    /// replaced timed test resolves as aborted.
    ///
    /// # Panics
    ///
    /// Starting a [`PawMethod::TimedHoldTest`] spawns a task and arms a timer,
    /// so it panics when called outside a Tokio runtime. Direct readings need
    /// no runtime.
    pub fn start(&mut self, method: PawMethod) -> Option<HoldTestHandle> {
        info!(?method, "paw check started");
        match method {
            PawMethod::TimedHoldTest => {
                let (abort_tx, abort_rx) = oneshot::channel::<()>();
                let (progress_tx, progress_rx) = watch::channel(0u32);
                let mut ticker = IntervalTicker::every(self.tick_period);

                let task = tokio::spawn(async move {
                    let mut test = HoldTest::new();
                    let abort = async move {
                        let _ = abort_rx.await;
                    };
                    run_hold_test(&mut test, &mut ticker, abort, |count| {
                        let _ = progress_tx.send(count);
                    })
                    .await
                });

                self.active = Some(ActiveCheck::Timed { abort: abort_tx });
                Some(HoldTestHandle { task, progress: progress_rx })
            }
            PawMethod::DirectReading => {
                self.active = Some(ActiveCheck::Direct);
                None
            }
        }
    }

    /// Signal "too hot" to a running timed test. Returns false when there is
    /// nothing left to abort.
    pub fn abort(&mut self) -> bool {
        match self.active.take() {
            Some(ActiveCheck::Timed { abort }) => abort.send(()).is_ok(),
            other => {
                self.active = other;
                false
            }
        }
    }

    /// Submit a thermometer reading for the active direct-reading check.
    pub fn submit(&mut self, raw: &str) -> Result<PawVerdict, InputError> {
        if !matches!(self.active, Some(ActiveCheck::Direct)) {
            return Err(InputError::NoActiveCheck);
        }
        let verdict = submit_reading(raw)?;
        self.active = None;
        Ok(verdict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    };

    /// Ticker that fires immediately and counts deliveries.
    struct CountingTicker {
        fired: Arc<AtomicU32>,
    }

    #[async_trait]
    impl Ticker for CountingTicker {
        async fn tick(&mut self) {
            self.fired.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
        }
    }

    #[test]
    fn seven_ticks_pass_the_test() {
        let mut test = HoldTest::new();
        assert!(test.start());
        for _ in 0..6 {
            assert_eq!(test.tick(), None);
        }
        assert_eq!(test.count(), 6);

        let verdict = test.tick().expect("seventh tick completes");
        assert!(verdict.is_safe);
        assert_eq!(verdict.surface_temp_f, 120.0);
        assert_eq!(verdict.method, PawMethod::TimedHoldTest);
        assert_eq!(test.state(), HoldState::Completed);
        assert!(test.is_terminal());
        assert_eq!(test.count(), 0);
    }

    #[test]
    fn abort_at_three_fails_the_test() {
        let mut test = HoldTest::new();
        test.start();
        for _ in 0..3 {
            test.tick();
        }
        assert_eq!(test.count(), 3);

        let verdict = test.abort().expect("abort while running yields a verdict");
        assert!(!verdict.is_safe);
        assert_eq!(verdict.surface_temp_f, 130.0);
        assert_eq!(test.state(), HoldState::Aborted);
        assert_eq!(test.count(), 0);
    }

    #[test]
    fn terminal_states_ignore_further_input() {
        let mut test = HoldTest::new();
        test.start();
        test.abort();
        assert_eq!(test.abort(), None);
        assert_eq!(test.tick(), None);
        assert_eq!(test.state(), HoldState::Aborted);
        assert!(test.is_terminal());
    }

    #[test]
    fn idle_ignores_ticks_and_aborts() {
        let mut test = HoldTest::new();
        assert_eq!(test.tick(), None);
        assert_eq!(test.abort(), None);
        assert_eq!(test.state(), HoldState::Idle);
        assert!(!test.is_terminal());
    }

    #[test]
    fn start_while_running_is_rejected() {
        let mut test = HoldTest::new();
        assert!(test.start());
        test.tick();
        assert!(!test.start());
        assert_eq!(test.count(), 1);
    }

    #[test]
    fn direct_readings() {
        assert!(!submit_reading("140").unwrap().is_safe);
        assert!(submit_reading("100").unwrap().is_safe);
        assert!(!submit_reading("125").unwrap().is_safe);
        assert!(submit_reading(" 124.5 ").unwrap().is_safe);
        assert_eq!(submit_reading("abc"), Err(InputError::Unparsable("abc".into())));
        assert!(submit_reading("NaN").is_err());
        assert!(submit_reading("inf").is_err());
        assert!(submit_reading("").is_err());
    }

    #[test]
    fn verdict_messages() {
        assert!(PawVerdict::from_reading(100.0).message().contains("Safe for walking"));
        assert!(PawVerdict::from_reading(140.0).message().contains("Too hot for paws"));
    }

    #[tokio::test]
    async fn driver_delivers_one_transition_per_tick() {
        let fired = Arc::new(AtomicU32::new(0));
        let mut ticker = CountingTicker { fired: fired.clone() };
        let mut test = HoldTest::new();
        let mut seen = Vec::new();

        let verdict = run_hold_test(&mut test, &mut ticker, std::future::pending(), |c| {
            seen.push(c)
        })
        .await;

        assert!(verdict.is_safe);
        assert_eq!(fired.load(Ordering::SeqCst), HOLD_THRESHOLD);
        assert_eq!(seen, vec![1, 2, 3, 4, 5, 6]);
    }

    #[tokio::test(start_paused = true)]
    async fn evaluator_times_out_to_a_pass() {
        let mut evaluator = PawCheckEvaluator::default();
        let handle = evaluator.start(PawMethod::TimedHoldTest).expect("timed test has a handle");

        let verdict = handle.verdict().await;
        assert_eq!(verdict, PawVerdict::hold_passed());
        assert!(!evaluator.abort(), "nothing to abort after completion");
    }

    #[tokio::test(start_paused = true)]
    async fn evaluator_abort_after_three_seconds() {
        let mut evaluator = PawCheckEvaluator::default();
        let handle = evaluator.start(PawMethod::TimedHoldTest).expect("timed test has a handle");
        let mut progress = handle.progress();

        while *progress.borrow_and_update() < 3 {
            progress.changed().await.expect("test still running");
        }
        assert!(evaluator.abort());

        assert_eq!(handle.verdict().await, PawVerdict::hold_aborted());
    }

    #[test]
    fn submit_requires_direct_mode() {
        let mut evaluator = PawCheckEvaluator::default();
        assert_eq!(evaluator.submit("100"), Err(InputError::NoActiveCheck));

        assert!(evaluator.start(PawMethod::DirectReading).is_none());
        assert!(evaluator.submit("abc").is_err());
        // a bad reading keeps the check open
        assert!(evaluator.submit("100").unwrap().is_safe);
        assert_eq!(evaluator.submit("100"), Err(InputError::NoActiveCheck));
    }

    #[test]
    #[should_panic]
    fn timed_test_needs_a_runtime() {
        let mut evaluator = PawCheckEvaluator::default();
        let _ = evaluator.start(PawMethod::TimedHoldTest);
    }
}
