//! Handlers for maps and sets.
//!
//! Only `get` is intercepted. Reading a method name returns an instrumented
//! version bound to the handler's variant; every instrumented method resolves
//! the raw collection through the receiver, tracks or triggers against it,
//! and wraps what it hands back.

use indexmap::IndexMap;
use tracing::warn;

use super::base_handlers::flag_value;
use super::factory::{to_reactive, to_readonly, Variant};
use super::flags::to_raw;
use super::handler::ProxyHandler;
use super::ReactiveFlag;
use crate::config;
use crate::error::{ReactiveError, Result};
use crate::tracking::{track, trigger, TrackKey, TrackOpType, TriggerOpType};
use crate::value::{collection, KeyIdentity, Obj, ObjectKind, PropertyKey, Value};

pub(crate) struct CollectionHandler {
    variant: Variant,
}

static REACTIVE_COLLECTION_HANDLER: CollectionHandler = CollectionHandler {
    variant: Variant::Reactive,
};
static SHALLOW_COLLECTION_HANDLER: CollectionHandler = CollectionHandler {
    variant: Variant::ShallowReactive,
};
static READONLY_COLLECTION_HANDLER: CollectionHandler = CollectionHandler {
    variant: Variant::Readonly,
};
static SHALLOW_READONLY_COLLECTION_HANDLER: CollectionHandler = CollectionHandler {
    variant: Variant::ShallowReadonly,
};

pub(crate) fn for_variant(variant: Variant) -> &'static dyn ProxyHandler {
    match variant {
        Variant::Reactive => &REACTIVE_COLLECTION_HANDLER,
        Variant::ShallowReactive => &SHALLOW_COLLECTION_HANDLER,
        Variant::Readonly => &READONLY_COLLECTION_HANDLER,
        Variant::ShallowReadonly => &SHALLOW_READONLY_COLLECTION_HANDLER,
    }
}

impl ProxyHandler for CollectionHandler {
    fn variant(&self) -> Variant {
        self.variant
    }

    fn get(&self, target: &Obj, key: &PropertyKey, receiver: &Value) -> Value {
        if let PropertyKey::Flag(flag) = key {
            return flag_value(target, *flag, receiver, self.variant);
        }

        // Methods the target itself lacks (weak collections) stay absent.
        if !target.has(key) {
            return target.get(key, receiver);
        }

        if key.is("size") {
            return size(target, self.variant);
        }

        match key.as_str().and_then(|name| instrumentation(self.variant, name)) {
            Some(method) => method,
            None => target.get(key, receiver),
        }
    }
}

type Instrumented = fn(&Value, &[Value], Variant) -> Result<Value>;

const ITERATION_METHODS: [&str; 3] = ["keys", "values", "entries"];
const MUTATOR_METHODS: [&str; 4] = ["add", "set", "delete", "clear"];

thread_local! {
    static INSTRUMENTATIONS: [IndexMap<&'static str, Value>; 4] = Variant::ALL.map(instrumentations);
}

fn instrumentations(variant: Variant) -> IndexMap<&'static str, Value> {
    let mut table = IndexMap::new();

    let readers: [(&'static str, Instrumented); 3] = [("get", get), ("has", has), ("forEach", for_each)];
    let mutators: [(&'static str, Instrumented); 4] =
        [("add", add), ("set", set), ("delete", delete), ("clear", clear)];

    for (name, method) in readers {
        table.insert(name, Value::function(name, move |this, args| method(this, args, variant)));
    }
    for name in ITERATION_METHODS {
        table.insert(
            name,
            Value::function(name, move |this, _args| iterate(name, this, variant)),
        );
    }
    if variant.is_readonly() {
        for name in MUTATOR_METHODS {
            table.insert(name, Value::function(name, move |this, _args| Ok(readonly_mutation(name, this))));
        }
    } else {
        for (name, method) in mutators {
            table.insert(name, Value::function(name, move |this, args| method(this, args, variant)));
        }
    }

    table
}

fn instrumentation(variant: Variant, name: &str) -> Option<Value> {
    INSTRUMENTATIONS.with(|tables| tables[variant as usize].get(name).cloned())
}

fn arg(args: &[Value], index: usize) -> Value {
    args.get(index).cloned().unwrap_or(Value::Undefined)
}

fn wrap_for(variant: Variant) -> fn(&Value) -> Value {
    if variant.is_shallow() {
        Value::clone
    } else if variant.is_readonly() {
        to_readonly
    } else {
        to_reactive
    }
}

fn entry(key: &Value) -> Option<TrackKey> {
    Some(TrackKey::Entry(KeyIdentity::of(key)))
}

/// The receiver's immediate target and the raw collection beneath it.
fn targets(this: &Value, method: &'static str) -> Result<(Value, Obj)> {
    let raw = to_raw(this);
    match raw.as_object() {
        Some(obj)
            if matches!(
                obj.kind(),
                ObjectKind::Map | ObjectKind::Set | ObjectKind::WeakMap | ObjectKind::WeakSet
            ) =>
        {
            let target = this.get(ReactiveFlag::Raw);
            let target = if target.is_object() { target } else { raw.clone() };
            Ok((target, obj.clone()))
        }
        _ => Err(ReactiveError::IncompatibleReceiver {
            method,
            expected: "Map or Set",
        }),
    }
}

fn size(target: &Obj, variant: Variant) -> Value {
    let target = Value::Object(target.clone());
    if !variant.is_readonly() {
        if let Some(raw) = to_raw(&target).as_object() {
            track(raw, TrackOpType::Iterate, TrackKey::Iterate);
        }
    }
    target.get("size")
}

fn track_key(raw: &Obj, op: TrackOpType, key: &Value, raw_key: &Value) {
    if KeyIdentity::of(key) != KeyIdentity::of(raw_key) {
        track(raw, op, TrackKey::Entry(KeyIdentity::of(key)));
    }
    track(raw, op, TrackKey::Entry(KeyIdentity::of(raw_key)));
}

fn get(this: &Value, args: &[Value], variant: Variant) -> Result<Value> {
    let (target, raw) = targets(this, "get")?;
    let key = arg(args, 0);
    let raw_key = to_raw(&key);
    if !variant.is_readonly() {
        track_key(&raw, TrackOpType::Get, &key, &raw_key);
    }

    let wrap = wrap_for(variant);
    if collection::has(&raw, &key) {
        Ok(wrap(&target.call_method("get", &[key])?))
    } else if collection::has(&raw, &raw_key) {
        Ok(wrap(&target.call_method("get", &[raw_key])?))
    } else {
        // Lets a readonly wrapper over a mutable one track the miss.
        if !target.ptr_eq(&Value::Object(raw)) {
            target.call_method("get", &[key])?;
        }
        Ok(Value::Undefined)
    }
}

fn has(this: &Value, args: &[Value], variant: Variant) -> Result<Value> {
    let (target, raw) = targets(this, "has")?;
    let key = arg(args, 0);
    let raw_key = to_raw(&key);
    if !variant.is_readonly() {
        track_key(&raw, TrackOpType::Has, &key, &raw_key);
    }

    if KeyIdentity::of(&key) == KeyIdentity::of(&raw_key) {
        return target.call_method("has", &[key]);
    }
    let found = target.call_method("has", &[key])?.is_truthy()
        || target.call_method("has", &[raw_key])?.is_truthy();
    Ok(Value::Bool(found))
}

fn for_each(this: &Value, args: &[Value], variant: Variant) -> Result<Value> {
    let (target, raw) = targets(this, "forEach")?;
    if !variant.is_readonly() {
        track(&raw, TrackOpType::Iterate, TrackKey::Iterate);
    }

    let wrap = wrap_for(variant);
    let callback = arg(args, 0);
    let this_arg = arg(args, 1);
    let observed = this.clone();
    let forward = Value::function("forEach", move |_, inner| {
        callback.call(
            &this_arg,
            &[wrap(&arg(inner, 0)), wrap(&arg(inner, 1)), observed.clone()],
        )
    });
    target.call_method("forEach", &[forward])?;
    Ok(Value::Undefined)
}

/// `keys`, `values` and `entries`, returned as array snapshots.
fn iterate(method: &'static str, this: &Value, variant: Variant) -> Result<Value> {
    let (target, raw) = targets(this, method)?;
    let is_map = collection::is_map(&raw);
    let is_pair = method == "entries";
    let is_key_only = method == "keys" && is_map;

    let inner = target.call_method(method, &[])?;
    if !variant.is_readonly() {
        let key = if is_key_only {
            TrackKey::MapKeyIterate
        } else {
            TrackKey::Iterate
        };
        track(&raw, TrackOpType::Iterate, key);
    }

    let wrap = wrap_for(variant);
    let items = (0..inner.len()).map(|index| {
        let item = inner.get(index);
        if is_pair {
            Value::array([wrap(&item.get(0usize)), wrap(&item.get(1usize))])
        } else {
            wrap(&item)
        }
    });
    Ok(Value::array(items.collect::<Vec<_>>()))
}

fn add(this: &Value, args: &[Value], _variant: Variant) -> Result<Value> {
    let (_, raw) = targets(this, "add")?;
    let value = to_raw(&arg(args, 0));
    if !collection::has(&raw, &value) {
        Value::Object(raw.clone()).call_method("add", &[value.clone()])?;
        trigger(&raw, TriggerOpType::Add, entry(&value), Some(&value), None);
    }
    Ok(this.clone())
}

fn set(this: &Value, args: &[Value], _variant: Variant) -> Result<Value> {
    let (_, raw) = targets(this, "set")?;
    let mut key = arg(args, 0);
    let value = to_raw(&arg(args, 1));

    let mut had_key = collection::has(&raw, &key);
    if !had_key {
        key = to_raw(&key);
        had_key = collection::has(&raw, &key);
    } else {
        check_identity_keys(&raw, &key);
    }

    let old_value = collection::get(&raw, &key);
    Value::Object(raw.clone()).call_method("set", &[key.clone(), value.clone()])?;
    if !had_key {
        trigger(&raw, TriggerOpType::Add, entry(&key), Some(&value), None);
    } else if !value.same_value(&old_value) {
        trigger(&raw, TriggerOpType::Set, entry(&key), Some(&value), Some(&old_value));
    }
    Ok(this.clone())
}

fn delete(this: &Value, args: &[Value], _variant: Variant) -> Result<Value> {
    let (_, raw) = targets(this, "delete")?;
    let mut key = arg(args, 0);

    let mut had_key = collection::has(&raw, &key);
    if !had_key {
        key = to_raw(&key);
        had_key = collection::has(&raw, &key);
    } else {
        check_identity_keys(&raw, &key);
    }

    let old_value = collection::get(&raw, &key);
    let result = Value::Object(raw.clone()).call_method("delete", &[key.clone()])?;
    if had_key {
        trigger(&raw, TriggerOpType::Delete, entry(&key), None, Some(&old_value));
    }
    Ok(result)
}

fn clear(this: &Value, _args: &[Value], _variant: Variant) -> Result<Value> {
    let (_, raw) = targets(this, "clear")?;
    let had_items = collection::size(&raw) != 0;
    Value::Object(raw.clone()).call_method("clear", &[])?;
    if had_items {
        trigger(&raw, TriggerOpType::Clear, None, None, None);
    }
    Ok(Value::Undefined)
}

fn readonly_mutation(method: &'static str, this: &Value) -> Value {
    if config::dev_warnings() {
        warn!(method, target = ?to_raw(this), "collection operation failed: target is readonly");
    }
    if method == "delete" {
        Value::Bool(false)
    } else {
        this.clone()
    }
}

/// Warn when a collection holds both a wrapper and its raw value as keys.
fn check_identity_keys(raw: &Obj, key: &Value) {
    let raw_key = to_raw(key);
    if config::dev_warnings()
        && KeyIdentity::of(&raw_key) != KeyIdentity::of(key)
        && collection::has(raw, &raw_key)
    {
        warn!(
            ?raw,
            "collection contains both the raw and reactive versions of the same object"
        );
    }
}
