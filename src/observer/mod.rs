//! Value Observer
//!
//! Keeps one entry's current value up to date for a UI binding or any other
//! consumer that wants "the value of `name`, always".
//!
//! ## Lifecycle
//!
//! ```text
//!   Unmounted ──mount(name)──▶ Subscribed ──unmount()──▶ Unmounted
//!                               │      ▲
//!                               └──────┘
//!                        mount(other): unmount, then mount
//! ```
//!
//! Entering `Subscribed` reads the entry once, then a background task
//! re-reads it after every notification on either channel. There is no
//! debouncing and no filtering by name: an event about any key causes a
//! fresh read. Leaving `Subscribed` stops the task, which drops both channel
//! subscriptions.
//!
//! Because the re-read is an ordinary [`EntryStore::read`], an observer can
//! be the one that finds an entry expired and purges it.

use crate::notify::ChangeStream;
use crate::storage::EntryStore;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// A live view of one entry. Dropping it unsubscribes.
pub struct Subscription {
    name: String,
    value: watch::Receiver<Option<String>>,
    reads: Arc<AtomicU64>,
    shutdown_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("name", &self.name)
            .field("value", &*self.value.borrow())
            .field("reads", &self.reads())
            .finish()
    }
}

impl Subscription {
    /// Reads `name` now and spawns the re-read task.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    pub(crate) fn start(store: EntryStore, name: &str) -> Self {
        // Listen before the initial read so no change slips in between.
        let changes = store.changes();
        let initial = read_value(&store, name);

        let reads = Arc::new(AtomicU64::new(1));
        let (value_tx, value) = watch::channel(initial);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(observe_loop(
            store,
            name.to_string(),
            changes,
            value_tx,
            Arc::clone(&reads),
            shutdown_rx,
        ));
        debug!(name = name, "Subscribed to entry");

        Self {
            name: name.to_string(),
            value,
            reads,
            shutdown_tx,
            task: Some(task),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The most recently read value.
    pub fn current(&self) -> Option<String> {
        self.value.borrow().clone()
    }

    /// How many times the entry has been read, including the initial read.
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    /// Waits for the next re-read. Returns `false` once the subscription has stopped.
    pub async fn changed(&mut self) -> bool {
        self.value.changed().await.is_ok()
    }

    /// A receiver for bindings that want to hold the value themselves.
    pub fn watch(&self) -> watch::Receiver<Option<String>> {
        self.value.clone()
    }

    /// Stops the re-read task and waits for it to finish.
    ///
    /// Once this returns, no further reads happen for this subscription.
    pub async fn unsubscribe(mut self) {
        self.stop();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }

    fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.stop();
        trace!(name = %self.name, "Subscription dropped");
    }
}

fn read_value(store: &EntryStore, name: &str) -> Option<String> {
    // An empty name can never hold a value; skip the rejected-input log.
    if name.is_empty() {
        return None;
    }
    store.read(name)
}

async fn observe_loop(
    store: EntryStore,
    name: String,
    mut changes: ChangeStream,
    value_tx: watch::Sender<Option<String>>,
    reads: Arc<AtomicU64>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            biased;

            result = shutdown_rx.changed() => {
                if result.is_err() || *shutdown_rx.borrow() {
                    debug!(name = %name, "Unsubscribed from entry");
                    return;
                }
            }
            event = changes.next() => {
                let Some(channel) = event else {
                    return;
                };
                let value = read_value(&store, &name);
                reads.fetch_add(1, Ordering::Relaxed);
                trace!(name = %name, channel = ?channel, present = value.is_some(), "Re-read entry");
                value_tx.send_replace(value);
            }
        }
    }
}

/// Where a [`ValueObserver`] is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserverState {
    Unmounted,
    Subscribed,
}

/// Mount/unmount wrapper around [`Subscription`] for UI-style bindings.
#[derive(Debug)]
pub struct ValueObserver {
    store: EntryStore,
    subscription: Option<Subscription>,
}

impl ValueObserver {
    pub fn new(store: EntryStore) -> Self {
        Self {
            store,
            subscription: None,
        }
    }

    /// Starts observing `name` and returns its current value.
    ///
    /// Mounting the name already observed keeps the existing subscription.
    /// Mounting a different name unsubscribes first.
    pub fn mount(&mut self, name: &str) -> Option<String> {
        if let Some(sub) = &self.subscription {
            if sub.name() == name {
                return sub.current();
            }
        }

        self.unmount();
        let sub = self.store.subscribe(name);
        let value = sub.current();
        self.subscription = Some(sub);
        value
    }

    /// Stops observing. No-op when already unmounted.
    ///
    /// The re-read task is signalled but not awaited: on a multi-threaded
    /// runtime a read already in progress may still finish after this
    /// returns. Use [`unmount_and_wait`](Self::unmount_and_wait) when no
    /// read may happen afterwards.
    pub fn unmount(&mut self) {
        if let Some(sub) = self.subscription.take() {
            debug!(name = %sub.name(), "Unmounting observer");
        }
    }

    /// Stops observing and waits for the re-read task to exit.
    ///
    /// Once this returns, no further reads happen for the old name.
    pub async fn unmount_and_wait(&mut self) {
        if let Some(sub) = self.subscription.take() {
            debug!(name = %sub.name(), "Unmounting observer");
            sub.unsubscribe().await;
        }
    }

    pub fn state(&self) -> ObserverState {
        match self.subscription {
            Some(_) => ObserverState::Subscribed,
            None => ObserverState::Unmounted,
        }
    }

    /// The observed name while subscribed.
    pub fn name(&self) -> Option<&str> {
        self.subscription.as_ref().map(Subscription::name)
    }

    /// The current value; `None` while unmounted.
    pub fn value(&self) -> Option<String> {
        self.subscription.as_ref().and_then(Subscription::current)
    }

    /// Waits for the next re-read. Returns `false` immediately while unmounted.
    pub async fn changed(&mut self) -> bool {
        match self.subscription.as_mut() {
            Some(sub) => sub.changed().await,
            None => false,
        }
    }

    pub fn subscription(&self) -> Option<&Subscription> {
        self.subscription.as_ref()
    }
}
