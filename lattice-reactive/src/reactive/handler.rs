//! The interception interface every wrapper dispatches through.

use super::Variant;
use crate::value::{Obj, PropertyKey, Value};

/// Traps installed on a wrapper.
///
/// `target` is the wrapped object (raw, or another wrapper when a readonly
/// wrapper is layered over a mutable one). Only `get` is required; every
/// other trap forwards to the target by default.
pub trait ProxyHandler {
    /// The variant this handler implements.
    fn variant(&self) -> Variant;

    fn get(&self, target: &Obj, key: &PropertyKey, receiver: &Value) -> Value;

    fn set(&self, target: &Obj, key: &PropertyKey, value: Value, receiver: &Value) -> bool {
        target.set(key, value, receiver)
    }

    fn has(&self, target: &Obj, key: &PropertyKey) -> bool {
        target.has(key)
    }

    fn delete_property(&self, target: &Obj, key: &PropertyKey) -> bool {
        target.delete(key)
    }

    fn own_keys(&self, target: &Obj) -> Vec<PropertyKey> {
        target.own_keys()
    }
}
