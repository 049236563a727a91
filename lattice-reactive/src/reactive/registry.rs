//! The variant registry: one wrapper per `(raw target, variant)`.
//!
//! Entries are keyed by the target's id and hold the wrapper weakly, so the
//! registry keeps neither side alive. A dropped target releases its entries.

use std::cell::RefCell;
use std::collections::HashMap;

use super::Variant;
use crate::value::{Obj, ObjectId, WeakObj};

type ProxyMap = HashMap<ObjectId, WeakObj>;

thread_local! {
    static REACTIVE_MAP: RefCell<ProxyMap> = RefCell::new(HashMap::new());
    static SHALLOW_REACTIVE_MAP: RefCell<ProxyMap> = RefCell::new(HashMap::new());
    static READONLY_MAP: RefCell<ProxyMap> = RefCell::new(HashMap::new());
    static SHALLOW_READONLY_MAP: RefCell<ProxyMap> = RefCell::new(HashMap::new());
}

fn with_map<R>(variant: Variant, f: impl FnOnce(&RefCell<ProxyMap>) -> R) -> R {
    match variant {
        Variant::Reactive => REACTIVE_MAP.with(f),
        Variant::ShallowReactive => SHALLOW_REACTIVE_MAP.with(f),
        Variant::Readonly => READONLY_MAP.with(f),
        Variant::ShallowReadonly => SHALLOW_READONLY_MAP.with(f),
    }
}

/// The live wrapper of `target` for `variant`, if any.
pub(crate) fn lookup(target: &Obj, variant: Variant) -> Option<Obj> {
    with_map(variant, |map| {
        map.borrow().get(&target.id()).and_then(WeakObj::upgrade)
    })
}

pub(crate) fn insert(target: &Obj, variant: Variant, proxy: &Obj) {
    with_map(variant, |map| {
        map.borrow_mut().insert(target.id(), proxy.downgrade());
    });
}

/// Drop every entry keyed by `id`. Called when the object is dropped.
pub(crate) fn release(id: ObjectId) {
    for variant in Variant::ALL {
        let release = |map: &RefCell<ProxyMap>| {
            if let Ok(mut map) = map.try_borrow_mut() {
                map.remove(&id);
            }
        };
        let _ = match variant {
            Variant::Reactive => REACTIVE_MAP.try_with(release),
            Variant::ShallowReactive => SHALLOW_REACTIVE_MAP.try_with(release),
            Variant::Readonly => READONLY_MAP.try_with(release),
            Variant::ShallowReadonly => SHALLOW_READONLY_MAP.try_with(release),
        };
    }
}

/// Number of entries across all variants, dead or alive.
#[cfg(test)]
pub(crate) fn len() -> usize {
    Variant::ALL
        .iter()
        .map(|variant| with_map(*variant, |map| map.borrow().len()))
        .sum()
}
