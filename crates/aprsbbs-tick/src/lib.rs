//! Fixed-interval timer for aprsbbs background loops.
//!
//! The gateway runs two timers beside its receive loop: the ACK retry
//! scan and the object beacon. Both are a [`TickScheduler`] sitting in a
//! `tokio::select!` next to a stop signal:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         _ = stop.changed() => break,
//!         info = scheduler.wait_for_tick() => {
//!             resend_due(info.tick).await;
//!         }
//!     }
//! }
//! ```
//!
//! # Idle mode
//!
//! When `period` is `None`, [`TickScheduler::wait_for_tick`] pends
//! forever. A disabled beacon uses this so its loop only ever wakes for
//! the stop signal.

use std::time::Duration;

use rand::Rng;
use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for a [`TickScheduler`].
#[derive(Debug, Clone)]
pub struct TickConfig {
    /// Time between ticks. `None` = idle (never fires).
    pub period: Option<Duration>,
    /// Delay before the first tick. Defaults to one full period.
    pub initial_delay: Option<Duration>,
    /// Random extra delay (0 to max) added to the first tick only.
    pub initial_jitter: Duration,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            period: None,
            initial_delay: None,
            initial_jitter: Duration::ZERO,
        }
    }
}

impl TickConfig {
    /// Shortest accepted period. Shorter values are clamped.
    pub const MIN_PERIOD: Duration = Duration::from_millis(10);

    /// Ticks every `period`, first tick one period from now.
    pub fn every(period: Duration) -> Self {
        Self {
            period: Some(period),
            ..Default::default()
        }
    }

    /// A scheduler config that never fires.
    pub fn idle() -> Self {
        Self::default()
    }

    /// Fire the first tick immediately instead of after one period.
    pub fn immediate(mut self) -> Self {
        self.initial_delay = Some(Duration::ZERO);
        self
    }

    /// Pushes the first tick back by a random amount up to `jitter`, so
    /// loops started together do not fire in lockstep.
    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.initial_jitter = jitter;
        self
    }

    /// Clamps out-of-range values. Called by [`TickScheduler::new`].
    pub fn validated(mut self) -> Self {
        if let Some(period) = self.period.filter(|p| *p < Self::MIN_PERIOD) {
            warn!(
                period_ms = period.as_millis() as u64,
                min_ms = Self::MIN_PERIOD.as_millis() as u64,
                "tick period below minimum, clamping"
            );
            self.period = Some(Self::MIN_PERIOD);
        }
        self
    }
}

// ---------------------------------------------------------------------------
// TickInfo
// ---------------------------------------------------------------------------

/// Returned by [`TickScheduler::wait_for_tick`] for each fired tick.
#[derive(Debug, Clone)]
pub struct TickInfo {
    /// Monotonically increasing tick number (starts at 1).
    pub tick: u64,
    /// `true` if the tick fired more than 10% of a period late.
    pub overrun: bool,
    /// Whole periods that passed without a tick (0 in normal operation).
    pub ticks_skipped: u64,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Fixed-interval tick scheduler. One per background loop.
pub struct TickScheduler {
    config: TickConfig,
    tick_count: u64,
    next_tick: Option<Instant>,
}

impl TickScheduler {
    /// Creates a scheduler and arms its first tick.
    pub fn new(config: TickConfig) -> Self {
        let config = config.validated();

        let next_tick = config.period.map(|period| {
            let jitter = if config.initial_jitter.is_zero() {
                Duration::ZERO
            } else {
                let max = config.initial_jitter.as_millis().max(1) as u64;
                Duration::from_millis(rand::rng().random_range(0..max))
            };
            Instant::now() + config.initial_delay.unwrap_or(period) + jitter
        });

        match config.period {
            Some(period) => debug!(
                period_ms = period.as_millis() as u64,
                jitter_ms = config.initial_jitter.as_millis() as u64,
                "tick scheduler created"
            ),
            None => debug!("tick scheduler created idle"),
        }

        Self {
            config,
            tick_count: 0,
            next_tick,
        }
    }

    /// Shorthand for `TickScheduler::new(TickConfig::every(period))`.
    pub fn every(period: Duration) -> Self {
        Self::new(TickConfig::every(period))
    }

    /// Waits until the next tick is due.
    ///
    /// Pends forever in idle mode, leaving `select!` to its other
    /// branches.
    pub async fn wait_for_tick(&mut self) -> TickInfo {
        let (next, period) = match (self.next_tick, self.config.period) {
            (Some(next), Some(period)) => (next, period),
            _ => std::future::pending().await,
        };

        time::sleep_until(next).await;

        let now = Instant::now();
        self.tick_count += 1;

        let late_by = now.saturating_duration_since(next);
        let overrun = late_by > period / 10;
        let ticks_skipped = if overrun {
            (late_by.as_nanos() / period.as_nanos()) as u64
        } else {
            0
        };

        if ticks_skipped > 0 {
            warn!(
                tick = self.tick_count,
                skipped = ticks_skipped,
                late_ms = late_by.as_millis() as u64,
                "tick overrun, skipping ahead"
            );
        }
        self.next_tick = Some(now + period);

        trace!(tick = self.tick_count, overrun, "tick fired");

        TickInfo {
            tick: self.tick_count,
            overrun,
            ticks_skipped,
        }
    }

    /// Whether this scheduler never fires.
    pub fn is_idle(&self) -> bool {
        self.config.period.is_none()
    }

    /// Ticks fired so far.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn period(&self) -> Option<Duration> {
        self.config.period
    }
}
