//! Handlers for records and arrays.
//!
//! Four statics, one per variant. The mutable pair tracks reads and triggers
//! writes; the readonly pair never tracks and rejects every write.

use tracing::warn;

use super::array_shims;
use super::boxed::is_boxed;
use super::factory::{reactive, readonly, Variant};
use super::flags::{is_readonly, is_shallow, to_raw};
use super::handler::ProxyHandler;
use super::registry;
use super::ReactiveFlag;
use crate::config;
use crate::tracking::{track, trigger, TrackKey, TrackOpType, TriggerOpType};
use crate::value::{Obj, PropertyKey, Value};

pub(crate) struct MutableHandler {
    shallow: bool,
}

pub(crate) struct ReadonlyHandler {
    shallow: bool,
}

static MUTABLE_HANDLER: MutableHandler = MutableHandler { shallow: false };
static SHALLOW_MUTABLE_HANDLER: MutableHandler = MutableHandler { shallow: true };
static READONLY_HANDLER: ReadonlyHandler = ReadonlyHandler { shallow: false };
static SHALLOW_READONLY_HANDLER: ReadonlyHandler = ReadonlyHandler { shallow: true };

pub(crate) fn for_variant(variant: Variant) -> &'static dyn ProxyHandler {
    match variant {
        Variant::Reactive => &MUTABLE_HANDLER,
        Variant::ShallowReactive => &SHALLOW_MUTABLE_HANDLER,
        Variant::Readonly => &READONLY_HANDLER,
        Variant::ShallowReadonly => &SHALLOW_READONLY_HANDLER,
    }
}

/// Keys read by language machinery rather than by code depending on data.
fn is_non_trackable(key: &PropertyKey) -> bool {
    match key {
        PropertyKey::Symbol(symbol) => symbol.is_well_known(),
        PropertyKey::String(name) => matches!(&**name, "__proto__" | "__v_isRef" | "__isVue"),
        _ => false,
    }
}

/// Whether `receiver` is the wrapper registered for `(target, variant)`.
fn is_registered_receiver(target: &Obj, receiver: &Value, variant: Variant) -> bool {
    match (registry::lookup(target, variant), receiver.as_object()) {
        (Some(proxy), Some(receiver)) => proxy.ptr_eq(receiver),
        _ => false,
    }
}

/// Whether a write observed through `receiver` is a write to `target`, and
/// not to an object inheriting from its wrapper.
fn receiver_is_target(target: &Obj, receiver: &Value) -> bool {
    to_raw(receiver).as_object().is_some_and(|raw| raw.ptr_eq(target))
}

/// Flag reads answered by every handler, never tracked.
pub(crate) fn flag_value(target: &Obj, flag: ReactiveFlag, receiver: &Value, variant: Variant) -> Value {
    match flag {
        ReactiveFlag::IsReactive => Value::Bool(!variant.is_readonly()),
        ReactiveFlag::IsReadonly => Value::Bool(variant.is_readonly()),
        ReactiveFlag::IsShallow => Value::Bool(variant.is_shallow()),
        ReactiveFlag::Raw if is_registered_receiver(target, receiver, variant) => {
            Value::Object(target.clone())
        }
        _ => target.get(&PropertyKey::Flag(flag), receiver),
    }
}

fn get(variant: Variant, target: &Obj, key: &PropertyKey, receiver: &Value) -> Value {
    if let PropertyKey::Flag(flag) = key {
        return flag_value(target, *flag, receiver, variant);
    }

    let target_is_array = target.is_array();
    if !variant.is_readonly() && target_is_array {
        if let Some(shim) = array_shims::lookup(key) {
            return shim;
        }
    }

    let result = target.get(key, receiver);

    if is_non_trackable(key) {
        return result;
    }

    if !variant.is_readonly() {
        track(target, TrackOpType::Get, key);
    }

    if variant.is_shallow() {
        return result;
    }

    if is_boxed(&result) {
        // Array elements hand out the box itself.
        if target_is_array && key.is_integer_key() {
            return result;
        }
        return result.get("value");
    }

    if result.is_object() {
        return if variant.is_readonly() {
            readonly(&result)
        } else {
            reactive(&result)
        };
    }

    result
}

impl MutableHandler {
    fn variant_of(&self) -> Variant {
        if self.shallow {
            Variant::ShallowReactive
        } else {
            Variant::Reactive
        }
    }
}

impl ProxyHandler for MutableHandler {
    fn variant(&self) -> Variant {
        self.variant_of()
    }

    fn get(&self, target: &Obj, key: &PropertyKey, receiver: &Value) -> Value {
        get(self.variant_of(), target, key, receiver)
    }

    fn set(&self, target: &Obj, key: &PropertyKey, value: Value, receiver: &Value) -> bool {
        let mut value = value;
        let mut old_value = target.get(key, &Value::Object(target.clone()));

        if is_readonly(&old_value) && is_boxed(&old_value) && !is_boxed(&value) {
            return false;
        }

        if !self.shallow {
            if !is_shallow(&value) && !is_readonly(&value) {
                value = to_raw(&value);
                old_value = to_raw(&old_value);
            }
            if !target.is_array() && is_boxed(&old_value) && !is_boxed(&value) {
                old_value.set("value", value);
                return true;
            }
        }

        // Decided before the write: an append is an add.
        let had_key = match key.as_index() {
            Some(index) if target.is_array() => {
                (index as usize) < target.array_length().unwrap_or(0)
            }
            _ => target.has_own(key),
        };

        let result = target.set(key, value.clone(), receiver);

        if result && receiver_is_target(target, receiver) {
            if !had_key {
                trigger(target, TriggerOpType::Add, Some(TrackKey::from(key)), Some(&value), None);
            } else if !value.same_value(&old_value) {
                trigger(
                    target,
                    TriggerOpType::Set,
                    Some(TrackKey::from(key)),
                    Some(&value),
                    Some(&old_value),
                );
            }
        }

        result
    }

    fn has(&self, target: &Obj, key: &PropertyKey) -> bool {
        let result = target.has(key);
        let untracked = matches!(key, PropertyKey::Flag(_))
            || matches!(key, PropertyKey::Symbol(symbol) if symbol.is_well_known());
        if !untracked {
            track(target, TrackOpType::Has, key);
        }
        result
    }

    fn delete_property(&self, target: &Obj, key: &PropertyKey) -> bool {
        let had_key = target.has_own(key);
        let old_value = target.get(key, &Value::Object(target.clone()));
        let result = target.delete(key);
        if result && had_key {
            trigger(target, TriggerOpType::Delete, Some(TrackKey::from(key)), None, Some(&old_value));
        }
        result
    }

    fn own_keys(&self, target: &Obj) -> Vec<PropertyKey> {
        let key = if target.is_array() {
            TrackKey::length()
        } else {
            TrackKey::Iterate
        };
        track(target, TrackOpType::Iterate, key);
        target.own_keys()
    }
}

impl ReadonlyHandler {
    fn variant_of(&self) -> Variant {
        if self.shallow {
            Variant::ShallowReadonly
        } else {
            Variant::Readonly
        }
    }
}

impl ProxyHandler for ReadonlyHandler {
    fn variant(&self) -> Variant {
        self.variant_of()
    }

    fn get(&self, target: &Obj, key: &PropertyKey, receiver: &Value) -> Value {
        get(self.variant_of(), target, key, receiver)
    }

    fn set(&self, target: &Obj, key: &PropertyKey, _value: Value, _receiver: &Value) -> bool {
        if config::dev_warnings() {
            warn!(%key, ?target, "set operation failed: target is readonly");
        }
        true
    }

    fn delete_property(&self, target: &Obj, key: &PropertyKey) -> bool {
        if config::dev_warnings() {
            warn!(%key, ?target, "delete operation failed: target is readonly");
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{boxed, readonly_boxed, shallow_reactive, shallow_readonly};
    use crate::tracking::{Effect, Runtime};
    use crate::value::WellKnownSymbol;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    fn raw_obj(value: &Value) -> Obj {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn deep_reads_wrap_nested_objects() {
        let nested = Value::record([("b", 1)]);
        let raw = Value::record([("a", nested.clone())]);
        let observed = reactive(&raw);

        let inner = observed.get("a");
        assert!(inner.ptr_eq(&reactive(&nested)));
        assert!(observed.get("a").ptr_eq(&inner));

        let locked = readonly(&raw).get("a");
        assert!(locked.ptr_eq(&readonly(&nested)));
    }

    #[test]
    fn shallow_reads_return_raw_nested() {
        let nested = Value::object();
        let counter = boxed(Value::from(1));
        let raw = Value::record([("a", nested.clone()), ("n", counter.clone())]);

        assert!(shallow_reactive(&raw).get("a").ptr_eq(&nested));
        assert!(shallow_readonly(&raw).get("n").ptr_eq(&counter));
    }

    #[test]
    fn boxes_unwrap_except_array_elements() {
        let counter = boxed(Value::from(1));
        let record = reactive(&Value::record([("n", counter.clone())]));
        assert_eq!(record.get("n"), Value::from(1));

        let list = reactive(&Value::array([counter.clone()]));
        assert!(list.get(0usize).ptr_eq(&counter));
    }

    #[test]
    fn reads_track_the_raw_target() {
        let raw = Value::record([("a", 1)]);
        let target = raw_obj(&raw);
        let observed = reactive(&raw);

        let reader = observed.clone();
        let _effect = Effect::new(move || {
            reader.get("a");
            reader.get(ReactiveFlag::Raw);
            reader.get(WellKnownSymbol::Iterator);
            reader.get("__proto__");
        });

        assert_eq!(Runtime::dependent_count(target.id(), &TrackKey::from("a")), 1);
        assert_eq!(
            Runtime::dependent_count(target.id(), &TrackKey::Prop(PropertyKey::from(ReactiveFlag::Raw))),
            0
        );
        assert_eq!(Runtime::dependent_count(target.id(), &TrackKey::from("__proto__")), 0);
    }

    #[test]
    fn readonly_reads_do_not_track() {
        let raw = Value::record([("a", 1)]);
        let target = raw_obj(&raw);
        let locked = readonly(&raw);

        let reader = locked.clone();
        let effect = Effect::new(move || {
            reader.get("a");
        });
        assert_eq!(effect.dependency_count(), 0);
        assert_eq!(Runtime::dependent_count(target.id(), &TrackKey::from("a")), 0);
    }

    #[test]
    fn writes_store_raw_values() {
        let raw = Value::object();
        let observed = reactive(&raw);
        let nested = Value::object();

        observed.set("child", reactive(&nested));
        assert!(raw.get("child").ptr_eq(&nested));

        let shallow = shallow_reactive(&Value::object());
        let wrapped = reactive(&nested);
        shallow.set("child", wrapped.clone());
        assert!(to_raw(&shallow).get("child").ptr_eq(&wrapped));
    }

    #[test]
    fn write_into_box_keeps_box_identity() {
        let counter = boxed(Value::from(0));
        let raw = Value::record([("count", counter.clone())]);
        let observed = reactive(&raw);

        assert!(observed.set("count", 5));
        assert!(raw.get("count").ptr_eq(&counter));
        assert_eq!(counter.get("value"), Value::from(5));

        let replacement = boxed(Value::from(9));
        assert!(observed.set("count", replacement.clone()));
        assert!(raw.get("count").ptr_eq(&replacement));
    }

    #[test]
    fn readonly_box_rejects_plain_value() {
        let locked = readonly_boxed(Value::from(1));
        let observed = reactive(&Value::record([("n", locked.clone())]));

        assert!(!observed.set("n", 2));
        assert_eq!(locked.get("value"), Value::from(1));
    }

    #[test]
    fn set_notifies_only_on_change() {
        let raw = Value::record([("a", Value::from(1)), ("nan", Value::from(f64::NAN))]);
        let observed = reactive(&raw);
        let runs = Rc::new(Cell::new(0));

        let reader = observed.clone();
        let counter = runs.clone();
        let _effect = Effect::new(move || {
            reader.get("a");
            reader.get("nan");
            counter.set(counter.get() + 1);
        });

        observed.set("a", 1);
        observed.set("nan", f64::NAN);
        assert_eq!(runs.get(), 1);

        observed.set("a", 2);
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn array_append_is_add() {
        let observed = reactive(&Value::array([1]));
        let runs = Rc::new(Cell::new(0));

        let reader = observed.clone();
        let counter = runs.clone();
        let _effect = Effect::new(move || {
            reader.len();
            counter.set(counter.get() + 1);
        });

        observed.set(1usize, 2);
        assert_eq!(runs.get(), 2);
        observed.set(0usize, 5);
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn far_index_write_extends_length_sparsely() {
        let observed = reactive(&Value::array(Vec::<Value>::new()));
        let lengths = Rc::new(RefCell::new(Vec::new()));

        let reader = observed.clone();
        let log = lengths.clone();
        let _effect = Effect::new(move || log.borrow_mut().push(reader.len()));

        assert!(observed.set(4_000_000_000usize, 1));
        assert_eq!(observed.len(), 4_000_000_001);
        assert_eq!(observed.get(4_000_000_000usize), Value::from(1));
        assert!(!observed.has(3_999_999_999usize));
        assert_eq!(*lengths.borrow(), vec![0, 4_000_000_001]);

        assert!(observed.set("length", 0));
        assert!(!observed.has(4_000_000_000usize));
        assert_eq!(*lengths.borrow(), vec![0, 4_000_000_001, 0]);
    }

    #[test]
    fn has_and_own_keys_track() {
        let raw = Value::record([("a", 1)]);
        let target = raw_obj(&raw);
        let observed = reactive(&raw);
        let seen = Rc::new(RefCell::new(Vec::new()));

        let reader = observed.clone();
        let log = seen.clone();
        let _effect = Effect::new(move || {
            log.borrow_mut().push((reader.has("b"), reader.own_keys().len()));
        });
        assert_eq!(Runtime::dependent_count(target.id(), &TrackKey::from("b")), 1);
        assert_eq!(Runtime::dependent_count(target.id(), &TrackKey::Iterate), 1);

        observed.set("b", 2);
        assert_eq!(*seen.borrow(), vec![(false, 1), (true, 2)]);

        observed.delete("a");
        assert_eq!(seen.borrow().last(), Some(&(true, 1)));
    }

    #[test]
    fn delete_of_missing_key_is_silent() {
        let observed = reactive(&Value::object());
        let runs = Rc::new(Cell::new(0));

        let reader = observed.clone();
        let counter = runs.clone();
        let _effect = Effect::new(move || {
            reader.own_keys();
            counter.set(counter.get() + 1);
        });

        assert!(observed.delete("missing"));
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn readonly_rejects_writes_and_deletes() {
        let raw = Value::record([("a", 1)]);
        let locked = readonly(&raw);

        assert!(locked.set("a", 2));
        assert!(locked.set("b", 2));
        assert!(locked.delete("a"));
        assert_eq!(raw.get("a"), Value::from(1));
        assert!(!raw.has("b"));
    }

    #[test]
    fn inherited_write_through_wrapper_does_not_notify_parent() {
        let parent_raw = Value::record([("a", 1)]);
        let parent = reactive(&parent_raw);
        let child = Value::object_with_proto(&parent);
        let runs = Rc::new(Cell::new(0));

        let reader = parent.clone();
        let counter = runs.clone();
        let _effect = Effect::new(move || {
            reader.get("a");
            counter.set(counter.get() + 1);
        });

        assert!(child.set("a", 2));
        assert_eq!(runs.get(), 1);
        assert_eq!(parent_raw.get("a"), Value::from(1));
        assert_eq!(child.get("a"), Value::from(2));
    }
}
