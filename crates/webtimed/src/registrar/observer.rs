//! Per-subscription observer task.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use webtime_core::Tick;

/// Identifier assigned to each subscription, used in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Why an observer stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The subscriber's own cancellation token fired
    Cancelled,
    /// The registrar was shut down
    Shutdown,
    /// The ticker stopped and no further values will be published
    TickerStopped,
    /// The consumer dropped its subscription
    ConsumerGone,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Cancelled => "cancelled",
            Self::Shutdown => "registrar shutdown",
            Self::TickerStopped => "ticker stopped",
            Self::ConsumerGone => "consumer gone",
        };
        f.write_str(s)
    }
}

/// Counts itself as an active subscription for as long as it lives.
pub(crate) struct ActiveGuard {
    active: Arc<AtomicUsize>,
}

impl ActiveGuard {
    pub(crate) fn new(active: &Arc<AtomicUsize>) -> Self {
        active.fetch_add(1, Ordering::SeqCst);
        Self {
            active: Arc::clone(active),
        }
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Bridges ticker wake-ups to one subscriber's output slot.
///
/// The observer is the sole owner of the output sender; dropping it is
/// what closes the subscription.
pub(crate) struct Observer {
    // Declared first so the count drops before the channel closes
    _active: ActiveGuard,

    id: SubscriptionId,

    /// Wakes on every applied tick
    updates: watch::Receiver<Tick>,

    /// Single-value output slot read by the subscriber
    out: watch::Sender<Tick>,

    /// Subscriber-controlled cancellation
    cancel: CancellationToken,

    /// Registrar-wide cancellation
    shutdown: CancellationToken,
}

impl Observer {
    pub(crate) fn new(
        id: SubscriptionId,
        updates: watch::Receiver<Tick>,
        out: watch::Sender<Tick>,
        cancel: CancellationToken,
        shutdown: CancellationToken,
        active: ActiveGuard,
    ) -> Self {
        Self {
            _active: active,
            id,
            updates,
            out,
            cancel,
            shutdown,
        }
    }

    /// Runs until a terminal condition is observed.
    ///
    /// Cancellation is polled before every wait, so at most one value
    /// can slip out after it fires. Sends never block: a tick the
    /// subscriber has not read yet is overwritten by the newer one.
    pub(crate) async fn run(mut self) -> CloseReason {
        let reason = loop {
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => break CloseReason::Cancelled,

                _ = self.shutdown.cancelled() => break CloseReason::Shutdown,

                _ = self.out.closed() => break CloseReason::ConsumerGone,

                changed = self.updates.changed() => {
                    if changed.is_err() {
                        break CloseReason::TickerStopped;
                    }

                    let tick = self.updates.borrow_and_update().clone();
                    let seq = tick.seq;

                    if self.out.send(tick).is_err() {
                        break CloseReason::ConsumerGone;
                    }
                    trace!(subscription = %self.id, seq, "Delivered tick");
                }
            }
        };

        debug!(subscription = %self.id, reason = %reason, "Subscription closed");
        reason
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registrar::Subscription;

    #[test]
    fn test_subscription_id_display() {
        assert_eq!(SubscriptionId(12).to_string(), "sub-12");
    }

    #[test]
    fn test_close_reason_display() {
        assert_eq!(CloseReason::Cancelled.to_string(), "cancelled");
        assert_eq!(CloseReason::ConsumerGone.to_string(), "consumer gone");
    }

    #[test]
    fn test_active_guard_counts() {
        let active = Arc::new(AtomicUsize::new(0));
        let a = ActiveGuard::new(&active);
        let b = ActiveGuard::new(&active);
        assert_eq!(active.load(Ordering::SeqCst), 2);

        drop(a);
        assert_eq!(active.load(Ordering::SeqCst), 1);
        drop(b);
        assert_eq!(active.load(Ordering::SeqCst), 0);
    }

    fn observer_parts() -> (
        watch::Sender<Tick>,
        Subscription,
        CancellationToken,
        Observer,
    ) {
        let (tick_tx, tick_rx) = watch::channel(Tick::initial());
        let (out_tx, out_rx) = watch::channel(Tick::initial());
        let cancel = CancellationToken::new();
        let active = Arc::new(AtomicUsize::new(0));
        let observer = Observer::new(
            SubscriptionId(1),
            tick_rx,
            out_tx,
            cancel.clone(),
            CancellationToken::new(),
            ActiveGuard::new(&active),
        );
        (tick_tx, Subscription::new(SubscriptionId(1), out_rx), cancel, observer)
    }

    /// Gives the spawned observer a chance to run.
    async fn settle() {
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_cancel_before_any_tick() {
        let (_tick_tx, mut sub, cancel, observer) = observer_parts();
        cancel.cancel();

        assert_eq!(observer.run().await, CloseReason::Cancelled);
        assert!(sub.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_ticker_drop_ends_observer() {
        let (tick_tx, mut sub, _cancel, observer) = observer_parts();
        drop(tick_tx);

        assert_eq!(observer.run().await, CloseReason::TickerStopped);
        assert!(sub.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_dropped_subscription_ends_observer_without_tick() {
        let (_tick_tx, sub, _cancel, observer) = observer_parts();
        drop(sub);

        assert_eq!(observer.run().await, CloseReason::ConsumerGone);
    }

    #[tokio::test]
    async fn test_unread_tick_is_overwritten() {
        let (tick_tx, mut sub, cancel, observer) = observer_parts();
        let task = tokio::spawn(observer.run());

        tick_tx.send_replace(Tick::new(1, "a"));
        settle().await;
        tick_tx.send_replace(Tick::new(2, "b"));
        settle().await;

        // Tick 1 was never read, so tick 2 took its place
        assert_eq!(sub.recv().await, Some(Tick::new(2, "b")));
        assert!(sub.try_recv().is_none());

        cancel.cancel();
        assert_eq!(task.await.unwrap(), CloseReason::Cancelled);
        assert!(sub.recv().await.is_none());
    }
}
