//! Dependency Tracking
//!
//! This module implements the read/write signal stream consumed by the proxy
//! layer: `track` records that the running reader depends on a slot of a raw
//! target, and `trigger` schedules every reader of the slots a write affects.
//!
//! # Concepts
//!
//! ## Slots
//!
//! A slot is a `(target, key)` pair. Property reads track the property key;
//! collection reads track the entry's key identity; enumeration tracks one of
//! two synthetic sentinels ([`TrackKey::Iterate`] and
//! [`TrackKey::MapKeyIterate`]) or, for arrays, `length`.
//!
//! ## Readers
//!
//! A reader is anything implementing [`Reactive`]. [`Effect`] is the reader
//! shipped here; the rendering layer brings its own.
//!
//! # Implementation Notes
//!
//! Everything is thread-local and synchronous. Readers scheduled by a write
//! run before `trigger` returns, and a running reader is never re-entered by
//! its own writes unless it opts into recursion.

mod context;
mod effect;
mod runtime;
mod subscriber;

pub use context::{enable_tracking, is_tracking, pause_tracking, should_track, ReactiveContext, TrackingGuard};
pub use effect::{DebuggerHook, Effect, EffectOptions};
pub use runtime::{Reactive, ReactiveHandle, Runtime};
pub use subscriber::{DepLocation, SubscriberId};

use std::fmt;

use indexmap::IndexSet;
use serde::Serialize;
use smallvec::SmallVec;
use tracing::trace;

use crate::value::{KeyIdentity, Obj, ObjectId, ObjectKind, PropertyKey, Value};

/// The kind of read being tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackOpType {
    Get,
    Has,
    Iterate,
}

/// The kind of write being triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerOpType {
    Set,
    Add,
    Delete,
    Clear,
}

/// The key half of a tracked slot.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum TrackKey {
    /// A property of a record or array.
    Prop(PropertyKey),
    /// An entry of a map or set, by key identity.
    Entry(KeyIdentity),
    /// The key set of a record, or the contents of a collection.
    Iterate,
    /// The key set of a map.
    MapKeyIterate,
}

impl TrackKey {
    /// The `length` key of arrays.
    pub fn length() -> Self {
        TrackKey::Prop(PropertyKey::from("length"))
    }

    fn index(&self) -> Option<u32> {
        match self {
            TrackKey::Prop(key) => key.as_index(),
            _ => None,
        }
    }
}

impl From<PropertyKey> for TrackKey {
    fn from(key: PropertyKey) -> Self {
        TrackKey::Prop(key)
    }
}

impl From<&PropertyKey> for TrackKey {
    fn from(key: &PropertyKey) -> Self {
        TrackKey::Prop(key.clone())
    }
}

impl From<&str> for TrackKey {
    fn from(key: &str) -> Self {
        TrackKey::Prop(PropertyKey::from(key))
    }
}

impl fmt::Debug for TrackKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackKey::Prop(key) => write!(f, "{:?}", key),
            TrackKey::Entry(identity) => write!(f, "entry {:?}", identity),
            TrackKey::Iterate => f.write_str("<iterate>"),
            TrackKey::MapKeyIterate => f.write_str("<map key iterate>"),
        }
    }
}

/// What a debugger hook is being told about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebuggerOp {
    Track(TrackOpType),
    Trigger(TriggerOpType),
}

/// Payload of the `on_track` / `on_trigger` hooks.
#[derive(Debug, Clone)]
pub struct DebuggerEvent {
    /// The reader being told.
    pub effect: SubscriberId,
    /// The raw target.
    pub target: Obj,
    pub op: DebuggerOp,
    pub key: Option<TrackKey>,
    pub new_value: Option<Value>,
    pub old_value: Option<Value>,
}

/// Record that the running reader depends on `(target, key)`.
///
/// A no-op when tracking is paused or no reader is running.
pub fn track(target: &Obj, op: TrackOpType, key: impl Into<TrackKey>) {
    if !is_tracking() {
        return;
    }
    let Some(subscriber_id) = ReactiveContext::current_subscriber() else {
        return;
    };

    let location = DepLocation::new(target.id(), key.into());
    if !Runtime::add_dependency(&location, subscriber_id) {
        return;
    }

    trace!(target_id = target.id().raw(), key = ?location.key, ?op, "track");
    ReactiveContext::track_dependency(location.clone());

    if let Some(reader) = Runtime::lookup(subscriber_id) {
        reader.on_track(&DebuggerEvent {
            effect: subscriber_id,
            target: target.clone(),
            op: DebuggerOp::Track(op),
            key: Some(location.key),
            new_value: None,
            old_value: None,
        });
    }
}

/// Schedule every reader of the slots affected by a write to `target`.
///
/// `key` is `None` only for [`TriggerOpType::Clear`].
pub fn trigger(
    target: &Obj,
    op: TriggerOpType,
    key: Option<TrackKey>,
    new_value: Option<&Value>,
    old_value: Option<&Value>,
) {
    let is_array = target.kind() == ObjectKind::Array;
    let is_map = matches!(target.kind(), ObjectKind::Map | ObjectKind::WeakMap);

    let readers = Runtime::with_target(target.id(), |deps| {
        let mut selected: SmallVec<[&runtime::Dep; 4]> = SmallVec::new();

        if op == TriggerOpType::Clear {
            selected.extend(deps.values());
        } else if is_array && key.as_ref() == Some(&TrackKey::length()) {
            let new_length = new_value.and_then(Value::as_number).unwrap_or(0.0);
            for (tracked, dep) in deps {
                let truncated = tracked
                    .index()
                    .is_some_and(|index| f64::from(index) >= new_length);
                if *tracked == TrackKey::length() || truncated {
                    selected.push(dep);
                }
            }
        } else {
            if let Some(dep) = key.as_ref().and_then(|key| deps.get(key)) {
                selected.push(dep);
            }
            let mut sentinel = |key: &TrackKey| {
                if let Some(dep) = deps.get(key) {
                    selected.push(dep);
                }
            };
            match op {
                TriggerOpType::Add if !is_array => {
                    sentinel(&TrackKey::Iterate);
                    if is_map {
                        sentinel(&TrackKey::MapKeyIterate);
                    }
                }
                TriggerOpType::Add => {
                    if key.as_ref().and_then(TrackKey::index).is_some() {
                        sentinel(&TrackKey::length());
                    }
                }
                TriggerOpType::Delete if !is_array => {
                    sentinel(&TrackKey::Iterate);
                    if is_map {
                        sentinel(&TrackKey::MapKeyIterate);
                    }
                }
                TriggerOpType::Set if is_map => sentinel(&TrackKey::Iterate),
                _ => {}
            }
        }

        selected
            .into_iter()
            .flatten()
            .copied()
            .collect::<IndexSet<SubscriberId>>()
    });

    let Some(readers) = readers else {
        return;
    };
    trace!(target_id = target.id().raw(), ?key, ?op, readers = readers.len(), "trigger");

    let current = ReactiveContext::current_subscriber();
    for subscriber_id in readers {
        let Some(reader) = Runtime::lookup(subscriber_id) else {
            continue;
        };
        if Some(subscriber_id) == current && !reader.allow_recurse() {
            continue;
        }
        reader.on_trigger(&DebuggerEvent {
            effect: subscriber_id,
            target: target.clone(),
            op: DebuggerOp::Trigger(op),
            key: key.clone(),
            new_value: new_value.cloned(),
            old_value: old_value.cloned(),
        });
        reader.schedule();
    }
}

/// Drop every edge recorded against a target that no longer exists.
pub(crate) fn release_target(target: ObjectId) {
    Runtime::release_target(target);
}
