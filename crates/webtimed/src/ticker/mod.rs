//! Clock ticker: the single producer behind every subscription.
//!
//! The [`ValueUpdater`] owns the authoritative [`Tick`]. Once per interval
//! it asks its [`TickSource`] for a new value, writes it under exclusive
//! access and wakes every waiter. Readers go through [`SharedValue`].
//!
//! ```text
//! ┌─────────────────┐  send_modify   ┌─────────────────┐
//! │  ValueUpdater   │───────────────▶│  watch channel  │
//! │ (interval loop) │                │ (Tick + version)│
//! └─────────────────┘                └────────┬────────┘
//!                                             │ changed()
//!                                             ▼
//!                                    ┌─────────────────┐
//!                                    │  SharedValue /  │
//!                                    │  observer tasks │
//!                                    └─────────────────┘
//! ```
//!
//! # Panic-Free Guarantees
//!
//! This module follows the crate's panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - A zero interval is clamped instead of reaching `tokio::time::interval`
//! - Render failures are logged and the tick is skipped

mod shared;

pub use shared::SharedValue;

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use webtime_core::{Tick, TickSource};

/// Default tick interval.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Smallest interval the updater will run with.
pub const MIN_TICK_INTERVAL: Duration = Duration::from_millis(1);

/// Owns the current value and republishes it on a fixed interval.
pub struct ValueUpdater<S> {
    /// Time between updates
    interval: Duration,

    /// Produces the value for each tick
    source: S,

    /// Write side of the shared value
    publisher: watch::Sender<Tick>,
}

impl<S: TickSource> ValueUpdater<S> {
    /// Creates an updater holding [`Tick::initial`].
    pub fn new(interval: Duration, source: S) -> Self {
        let (publisher, _) = watch::channel(Tick::initial());
        Self {
            interval: interval.max(MIN_TICK_INTERVAL),
            source,
            publisher,
        }
    }

    /// Returns a read handle that stays valid after the updater stops.
    pub fn shared(&self) -> SharedValue {
        SharedValue::new(self.publisher.subscribe())
    }

    /// Returns the effective tick interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Runs the update loop until `cancel` fires.
    ///
    /// The first update lands one full interval after the call; late
    /// ticks are skipped rather than fired in a burst. Dropping the
    /// updater on return closes the shared value, which every observer
    /// treats as the end of its subscription.
    pub async fn run(mut self, cancel: CancellationToken) {
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            interval_ms = self.interval.as_millis() as u64,
            "Ticker started"
        );

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    info!("Ticker shutting down");
                    break;
                }

                _ = ticker.tick() => {
                    self.apply_tick();
                }
            }
        }

        debug!(
            last_seq = self.publisher.borrow().seq,
            waiters = self.publisher.receiver_count(),
            "Ticker stopped"
        );
    }

    /// Recomputes the value and broadcasts it.
    ///
    /// Returns false when the source failed and nothing was published.
    fn apply_tick(&mut self) -> bool {
        let seq = self.publisher.borrow().seq.saturating_add(1);

        match self.source.render(seq) {
            Ok(time) => {
                // Write and wake happen together: waiters only ever see whole ticks
                self.publisher.send_modify(|tick| *tick = tick.next(time));
                trace!(seq, "Tick applied");
                true
            }
            Err(e) => {
                warn!(seq, error = %e, "Failed to render tick, skipping");
                false
            }
        }
    }
}

/// Spawns a ticker task and returns its read handle.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use tokio_util::sync::CancellationToken;
/// use webtime_core::WallClock;
/// use webtimed::ticker::spawn_ticker;
///
/// #[tokio::main]
/// async fn main() {
///     let cancel = CancellationToken::new();
///     let (shared, task) = spawn_ticker(Duration::from_secs(1), WallClock::default(), cancel.clone());
///
///     tokio::time::sleep(Duration::from_millis(1500)).await;
///     println!("now: {}", shared.current().time);
///
///     cancel.cancel();
///     let _ = task.await;
/// }
/// ```
pub fn spawn_ticker<S: TickSource>(
    interval: Duration,
    source: S,
    cancel: CancellationToken,
) -> (SharedValue, JoinHandle<()>) {
    let updater = ValueUpdater::new(interval, source);
    let shared = updater.shared();
    let handle = tokio::spawn(updater.run(cancel));
    (shared, handle)
}
