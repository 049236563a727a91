//! Subscriber identities and dependency locations.
//!
//! A subscriber is any reader context (an effect, a render function) that
//! depends on structural reads. A dependency location names the slot it read:
//! a target object plus a tracked key.

use std::sync::atomic::{AtomicU64, Ordering};

use super::TrackKey;
use crate::value::ObjectId;

/// Unique identifier for a subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

/// A `(target, key)` slot a subscriber depends on.
///
/// Holds the target by id so a recorded edge never keeps the target alive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DepLocation {
    pub target: ObjectId,
    pub key: TrackKey,
}

impl DepLocation {
    pub fn new(target: ObjectId, key: TrackKey) -> Self {
        Self { target, key }
    }
}
