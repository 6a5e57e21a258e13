//! Expiry Evaluator
//!
//! An entry is valid while `now < created_at + ttl_seconds`. Validity is
//! recomputed on every access; nothing is cached and nothing runs in the
//! background. Expired entries stay in the persisted collection until a
//! read or a listing runs into them and purges them (lazy expiry).
//!
//! TTLs are not validated. A negative TTL is expired from the moment it is
//! written, and a TTL too large to add to the creation time never expires.

use crate::codec::Entry;
use chrono::{DateTime, SubsecRound, TimeDelta, Utc};
use parking_lot::Mutex;
use std::sync::Arc;

/// Source of wall-clock time for the entry store.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// Jumps to `at`, which may be in the past.
    pub fn set(&self, at: DateTime<Utc>) {
        *self.now.lock() = at;
    }

    pub fn advance(&self, by: TimeDelta) {
        let mut now = self.now.lock();
        *now += by;
    }

    pub fn advance_secs(&self, secs: i64) {
        self.advance(TimeDelta::seconds(secs));
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(DateTime::<Utc>::default())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// Timestamp recorded on write.
///
/// The blob keeps milliseconds, so the in-memory stamp is cut to match.
pub fn creation_stamp(now: DateTime<Utc>) -> DateTime<Utc> {
    now.trunc_subsecs(3)
}

/// The first instant at which `entry` is no longer valid.
///
/// `None` when `created_at + ttl_seconds` is outside the representable range.
pub fn expires_at(entry: &Entry) -> Option<DateTime<Utc>> {
    TimeDelta::try_seconds(entry.ttl_seconds)
        .and_then(|ttl| entry.created_at.checked_add_signed(ttl))
}

/// Returns `true` iff `now < created_at + ttl_seconds`.
#[inline]
pub fn is_valid(entry: &Entry, now: DateTime<Utc>) -> bool {
    match expires_at(entry) {
        Some(deadline) => now < deadline,
        None => entry.ttl_seconds > 0,
    }
}

/// Time left before `entry` expires, or `None` if it already has.
pub fn remaining(entry: &Entry, now: DateTime<Utc>) -> Option<TimeDelta> {
    if !is_valid(entry, now) {
        return None;
    }
    Some(expires_at(entry).map_or(TimeDelta::MAX, |deadline| deadline - now))
}
