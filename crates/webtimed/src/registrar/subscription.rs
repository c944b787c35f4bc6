//! Consumer end of a subscription.

use futures_util::FutureExt;
use tokio::sync::watch;

use webtime_core::Tick;

use super::observer::SubscriptionId;

/// Receives the ticks one observer delivers.
///
/// The underlying slot holds a single value. A tick the consumer has not
/// read yet is replaced by the next one, so a consumer that falls behind
/// resumes at the latest value instead of working through a backlog.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    rx: watch::Receiver<Tick>,
}

impl Subscription {
    /// Wraps the receiving side of an observer's output slot.
    ///
    /// The slot's initial value counts as already read.
    pub(crate) fn new(id: SubscriptionId, rx: watch::Receiver<Tick>) -> Self {
        Self { id, rx }
    }

    /// Returns the identifier used for this subscription in logs.
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Waits for the next unread tick.
    ///
    /// Returns `None` once the observer has stopped and its last delivered
    /// value has been read.
    pub async fn recv(&mut self) -> Option<Tick> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Returns the pending tick, if one was delivered and not yet read.
    pub fn try_recv(&mut self) -> Option<Tick> {
        self.rx.changed().now_or_never()?.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> (watch::Sender<Tick>, Subscription) {
        let (tx, rx) = watch::channel(Tick::initial());
        (tx, Subscription::new(SubscriptionId(3), rx))
    }

    #[test]
    fn test_initial_value_is_not_delivered() {
        let (_tx, mut sub) = pair();
        assert!(sub.try_recv().is_none());
        assert_eq!(sub.id(), SubscriptionId(3));
    }

    #[test]
    fn test_newer_value_replaces_unread_one() {
        let (tx, mut sub) = pair();
        tx.send_replace(Tick::new(1, "a"));
        tx.send_replace(Tick::new(2, "b"));

        assert_eq!(sub.try_recv(), Some(Tick::new(2, "b")));
        assert!(sub.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_last_value_survives_close() {
        let (tx, mut sub) = pair();
        tx.send_replace(Tick::new(7, "x"));
        drop(tx);

        assert_eq!(sub.recv().await, Some(Tick::new(7, "x")));
        assert!(sub.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_recv_ends_when_sender_dropped() {
        let (tx, mut sub) = pair();
        drop(tx);
        assert!(sub.recv().await.is_none());
    }
}
