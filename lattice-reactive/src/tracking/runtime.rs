//! Reactive Runtime
//!
//! The runtime is the central coordinator between tracked reads and the
//! readers that depend on them.
//!
//! # How It Works
//!
//! 1. A reader registers with the runtime and receives a handle.
//!
//! 2. When a reader reads a tracked slot, the runtime records the edge
//!    `(target, key) -> reader`.
//!
//! 3. When a slot is written, `trigger` asks the runtime for the readers of
//!    the affected slots and schedules them.
//!
//! # Memory
//!
//! The registry stores weak references to readers, and edges refer to targets
//! by id. Dropping a reader's handle unregisters it; dropping a target object
//! releases its edge table.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use indexmap::{IndexMap, IndexSet};

use super::{DebuggerEvent, DepLocation, SubscriberId, TrackKey};
use crate::value::ObjectId;

/// A reader that can be notified when its dependencies change.
pub trait Reactive {
    /// Get the subscriber ID for this reader.
    fn subscriber_id(&self) -> SubscriberId;

    /// Schedule this reader to run again.
    fn schedule(&self);

    /// Whether this reader may be triggered by its own writes.
    fn allow_recurse(&self) -> bool {
        false
    }

    /// Called once for every new dependency edge.
    fn on_track(&self, _event: &DebuggerEvent) {}

    /// Called before the reader is scheduled by a write.
    fn on_trigger(&self, _event: &DebuggerEvent) {}
}

/// Handle to a registered reader.
///
/// Dropping this handle unregisters the reader from the runtime.
pub struct ReactiveHandle {
    subscriber_id: SubscriberId,
}

impl Drop for ReactiveHandle {
    fn drop(&mut self) {
        Runtime::unregister(self.subscriber_id);
    }
}

/// Readers of one tracked slot, in the order they subscribed.
pub(crate) type Dep = IndexSet<SubscriberId>;

/// Tracked slots of one target.
pub(crate) type KeyToDep = IndexMap<TrackKey, Dep>;

/// The per-thread reactive runtime.
pub struct Runtime;

thread_local! {
    static REGISTRY: RefCell<HashMap<SubscriberId, Weak<dyn Reactive>>> = RefCell::new(HashMap::new());
    static TARGET_MAP: RefCell<HashMap<ObjectId, KeyToDep>> = RefCell::new(HashMap::new());
}

impl Runtime {
    /// Register a reader with the runtime.
    ///
    /// Returns a handle that unregisters the reader when dropped.
    pub fn register(reactive: Rc<dyn Reactive>) -> ReactiveHandle {
        let id = reactive.subscriber_id();

        REGISTRY.with(|registry| {
            registry.borrow_mut().insert(id, Rc::downgrade(&reactive));
        });

        ReactiveHandle { subscriber_id: id }
    }

    /// Unregister a reader and drop all of its edges.
    fn unregister(id: SubscriberId) {
        let _ = REGISTRY.try_with(|registry| {
            if let Ok(mut registry) = registry.try_borrow_mut() {
                registry.remove(&id);
            }
        });
        Self::clear_dependencies(id);
    }

    /// Resolve a live reader.
    pub fn lookup(id: SubscriberId) -> Option<Rc<dyn Reactive>> {
        REGISTRY.with(|registry| registry.borrow().get(&id).and_then(Weak::upgrade))
    }

    /// Record that `subscriber_id` reads `location`.
    ///
    /// Returns `true` if the edge is new.
    pub fn add_dependency(location: &DepLocation, subscriber_id: SubscriberId) -> bool {
        TARGET_MAP.with(|targets| {
            targets
                .borrow_mut()
                .entry(location.target)
                .or_default()
                .entry(location.key.clone())
                .or_default()
                .insert(subscriber_id)
        })
    }

    /// Remove the given edges of a reader. Slots left without readers are
    /// dropped, and so are targets left without slots.
    pub fn remove_dependencies(subscriber_id: SubscriberId, locations: &[DepLocation]) {
        TARGET_MAP.with(|targets| {
            let mut targets = targets.borrow_mut();
            for location in locations {
                let Some(deps) = targets.get_mut(&location.target) else {
                    continue;
                };
                if let Some(dep) = deps.get_mut(&location.key) {
                    dep.shift_remove(&subscriber_id);
                    if dep.is_empty() {
                        deps.shift_remove(&location.key);
                    }
                }
                if deps.is_empty() {
                    targets.remove(&location.target);
                }
            }
        });
    }

    /// Remove every edge of a reader, pruning emptied slots and targets.
    pub fn clear_dependencies(subscriber_id: SubscriberId) {
        let _ = TARGET_MAP.try_with(|targets| {
            if let Ok(mut targets) = targets.try_borrow_mut() {
                targets.retain(|_, deps| {
                    deps.retain(|_, dep| {
                        dep.shift_remove(&subscriber_id);
                        !dep.is_empty()
                    });
                    !deps.is_empty()
                });
            }
        });
    }

    /// Inspect the edge table of a target.
    pub(crate) fn with_target<R>(target: ObjectId, f: impl FnOnce(&KeyToDep) -> R) -> Option<R> {
        TARGET_MAP.with(|targets| targets.borrow().get(&target).map(f))
    }

    /// Number of readers of `(target, key)`.
    pub fn dependent_count(target: ObjectId, key: &TrackKey) -> usize {
        Self::with_target(target, |deps| deps.get(key).map_or(0, IndexSet::len)).unwrap_or(0)
    }

    /// Number of slots of `target` that currently have readers.
    pub fn tracked_slot_count(target: ObjectId) -> usize {
        Self::with_target(target, IndexMap::len).unwrap_or(0)
    }

    /// Drop the edge table of a target that no longer exists.
    ///
    /// Ids are never reused, so a table skipped here because the map is
    /// borrowed is unreachable rather than wrong.
    pub(crate) fn release_target(target: ObjectId) {
        let _ = TARGET_MAP.try_with(|targets| {
            if let Ok(mut targets) = targets.try_borrow_mut() {
                targets.remove(&target);
            }
        });
    }
}
