//! Read-side handle over the ticker's current value.

use tokio::sync::watch;

use webtime_core::Tick;

/// Cloneable read handle over the single current [`Tick`].
///
/// The value lives in a `watch` channel: writes happen under its
/// exclusive lock and bump a version counter before waking waiters, so
/// a reader either sees the previous tick or the next one, never a
/// partial write. Comparing versions on wake closes the window between
/// "check the value" and "wait for the next change".
#[derive(Debug, Clone)]
pub struct SharedValue {
    rx: watch::Receiver<Tick>,
}

impl SharedValue {
    pub(crate) fn new(rx: watch::Receiver<Tick>) -> Self {
        Self { rx }
    }

    /// Returns a copy of the latest tick under shared access.
    pub fn current(&self) -> Tick {
        self.rx.borrow().clone()
    }

    /// Returns the sequence number of the latest tick.
    pub fn seq(&self) -> u64 {
        self.rx.borrow().seq
    }

    /// Returns a receiver that only wakes for ticks applied after this call.
    ///
    /// The value present right now counts as already seen, so a new
    /// subscriber never replays history.
    pub fn watch(&self) -> watch::Receiver<Tick> {
        let mut rx = self.rx.clone();
        rx.borrow_and_update();
        rx
    }

    /// Returns true once the owning updater has stopped.
    pub fn is_closed(&self) -> bool {
        self.rx.has_changed().is_err()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_reads_latest() {
        let (tx, rx) = watch::channel(Tick::initial());
        let shared = SharedValue::new(rx);
        assert!(shared.current().is_initial());

        tx.send_replace(Tick::new(1, "a"));
        assert_eq!(shared.current(), Tick::new(1, "a"));
        assert_eq!(shared.seq(), 1);
    }

    #[test]
    fn test_watch_skips_present_value() {
        let (tx, rx) = watch::channel(Tick::initial());
        let shared = SharedValue::new(rx);

        tx.send_replace(Tick::new(1, "a"));
        let watcher = shared.watch();
        assert!(!watcher.has_changed().unwrap());

        tx.send_replace(Tick::new(2, "b"));
        assert!(watcher.has_changed().unwrap());
    }

    #[test]
    fn test_closed_after_sender_dropped() {
        let (tx, rx) = watch::channel(Tick::initial());
        let shared = SharedValue::new(rx);
        assert!(!shared.is_closed());

        tx.send_replace(Tick::new(5, "last"));
        drop(tx);

        assert!(shared.is_closed());
        // Last value stays readable
        assert_eq!(shared.seq(), 5);
    }
}
