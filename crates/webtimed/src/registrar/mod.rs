//! Subscription registrar: one observer task per consumer.
//!
//! Each call to [`SubscriptionRegistrar::subscribe`] spawns an observer
//! that waits for the ticker's next broadcast, reads the current value
//! and offers it to the consumer without blocking. Each subscription
//! holds one value at most: an unread tick is replaced by the next, and
//! the [`Subscription`] closes when the observer ends.
//!
//! # Architecture
//!
//! ```text
//!                   ┌──────────────┐
//!                   │ SharedValue  │
//!                   └──────┬───────┘
//!           changed()      │      changed()
//!        ┌─────────────────┼─────────────────┐
//!        ▼                 ▼                 ▼
//! ┌─────────────┐   ┌─────────────┐   ┌─────────────┐
//! │ Observer 0  │   │ Observer 1  │   │ Observer N  │
//! └──────┬──────┘   └──────┬──────┘   └──────┬──────┘
//!        │ send            │ send            │ send
//!        ▼                 ▼                 ▼
//!   Subscription      Subscription      Subscription
//!   (connection)      (connection)      (connection)
//! ```
//!
//! # Subscription lifecycle
//!
//! Created → Waiting ⇄ Delivering → Closed. Closed is reached from any
//! of: the subscriber's token, [`SubscriptionRegistrar::shutdown`], the
//! ticker stopping, or the consumer dropping its subscription.
//!
//! # Panic-Free Guarantees
//!
//! This module follows the crate's panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - `subscribe` never fails; delivery problems only ever drop a tick

mod observer;
mod subscription;

pub use observer::{CloseReason, SubscriptionId};
pub use subscription::Subscription;

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use webtime_core::Tick;

use crate::ticker::SharedValue;
use observer::{ActiveGuard, Observer};

/// Creates and tracks subscriptions to the ticker's value.
///
/// Cheap to clone; clones share the same shutdown token and counters.
#[derive(Debug, Clone)]
pub struct SubscriptionRegistrar {
    /// Read handle over the ticker's value
    shared: SharedValue,

    /// Cancels every subscription created by this registrar
    shutdown: CancellationToken,

    /// Number of live observer tasks
    active: Arc<AtomicUsize>,

    /// Counter for generating subscription IDs
    next_id: Arc<AtomicU64>,
}

impl SubscriptionRegistrar {
    /// Creates a registrar over the given shared value.
    pub fn new(shared: SharedValue) -> Self {
        Self {
            shared,
            shutdown: CancellationToken::new(),
            active: Arc::new(AtomicUsize::new(0)),
            next_id: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Uses `token` as the registrar-wide shutdown signal.
    ///
    /// Cancelling it has the same effect as [`Self::shutdown`].
    pub fn with_shutdown_token(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    /// Subscribes to future ticks.
    ///
    /// Spawns one observer task, so this must be called from within a
    /// tokio runtime. The returned subscription yields the latest tick
    /// after each broadcast and closes once the observer ends. Values
    /// published before this call are never replayed, and ticks the
    /// consumer was too slow to read are never queued.
    pub fn subscribe(&self, cancel: CancellationToken) -> Subscription {
        let (tx, rx) = watch::channel(Tick::initial());
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));

        let observer = Observer::new(
            id,
            self.shared.watch(),
            tx,
            cancel,
            self.shutdown.clone(),
            ActiveGuard::new(&self.active),
        );
        tokio::spawn(observer.run());

        debug!(
            subscription = %id,
            active = self.active_count(),
            "Subscription created"
        );
        Subscription::new(id, rx)
    }

    /// Returns the number of subscriptions whose observer is still running.
    pub fn active_count(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Closes every subscription, current and future.
    pub fn shutdown(&self) {
        if !self.shutdown.is_cancelled() {
            debug!(active = self.active_count(), "Shutting down subscription registrar");
        }
        self.shutdown.cancel();
    }

    /// Returns true once [`Self::shutdown`] has been called.
    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Returns the read handle this registrar observes.
    pub fn shared(&self) -> &SharedValue {
        &self.shared
    }
}
