//! Change Notifier
//!
//! Two channels tell observers that something may have changed:
//!
//! - **Local**: fired by the entry store after every mutating call in this
//!   context (write, delete, clear, and reads that purge an expired entry).
//! - **Cross-context**: storage events raised by the byte store when some
//!   *other* context changes it. This crate only consumes them.
//!
//! Notifications carry no payload. Subscribers always re-read the store, so
//! spurious, duplicated, coalesced, or lagged wake-ups are harmless, and so
//! are events about unrelated keys.

use crate::storage::origin::StorageEvents;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast::{
    self,
    error::{RecvError, TryRecvError},
};
use tracing::trace;

/// Which channel delivered a wake-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Local,
    CrossContext,
}

/// Same-context broadcaster owned by one entry store.
pub struct Notifier {
    local: broadcast::Sender<()>,
    sent: AtomicU64,
}

impl fmt::Debug for Notifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier")
            .field("sent", &self.sent())
            .field("listeners", &self.listeners())
            .finish()
    }
}

impl Notifier {
    pub fn new(capacity: usize) -> Self {
        let (local, _) = broadcast::channel(capacity.max(1));
        Self {
            local,
            sent: AtomicU64::new(0),
        }
    }

    /// Fires the same-context channel once.
    pub fn notify_local(&self) {
        self.sent.fetch_add(1, Ordering::Relaxed);
        // Err only means nobody is subscribed right now.
        let delivered = self.local.send(()).unwrap_or(0);
        trace!(listeners = delivered, "Local change notification");
    }

    /// Total local notifications fired so far.
    pub fn sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }

    /// Number of live local subscriptions.
    pub fn listeners(&self) -> usize {
        self.local.receiver_count()
    }

    /// Listens on the local channel and, if given, on foreign storage events.
    pub fn subscribe(&self, external: Option<StorageEvents>) -> ChangeStream {
        ChangeStream {
            local: self.local.subscribe(),
            external,
        }
    }
}

/// A merged view of both channels for one subscriber.
#[derive(Debug)]
pub struct ChangeStream {
    local: broadcast::Receiver<()>,
    external: Option<StorageEvents>,
}

impl ChangeStream {
    /// Waits for the next wake-up on either channel.
    ///
    /// Returns `None` once the local channel is closed.
    pub async fn next(&mut self) -> Option<Channel> {
        loop {
            let Some(external) = self.external.as_mut() else {
                return local_event(self.local.recv().await);
            };

            let foreign = tokio::select! {
                local = self.local.recv() => return local_event(local),
                foreign = external.recv() => foreign,
            };

            match foreign {
                Some(_) => return Some(Channel::CrossContext),
                // Origin is gone; keep listening locally.
                None => self.external = None,
            }
        }
    }

    /// Returns a pending wake-up without waiting. Local events come first.
    pub fn try_next(&mut self) -> Option<Channel> {
        match self.local.try_recv() {
            Ok(()) | Err(TryRecvError::Lagged(_)) => return Some(Channel::Local),
            Err(TryRecvError::Empty | TryRecvError::Closed) => {}
        }
        self.external
            .as_mut()
            .and_then(|external| external.try_recv())
            .map(|_| Channel::CrossContext)
    }

    /// Whether foreign storage events are part of this stream.
    pub fn has_cross_context(&self) -> bool {
        self.external.is_some()
    }
}

fn local_event(result: Result<(), RecvError>) -> Option<Channel> {
    match result {
        Ok(()) | Err(RecvError::Lagged(_)) => Some(Channel::Local),
        Err(RecvError::Closed) => None,
    }
}
