//! The wrap factory.
//!
//! `wrap` decides whether a value may be wrapped, reuses the registered
//! wrapper when there is one, and otherwise builds a new wrapper bound to the
//! handler for the requested variant and the target's shape.

use tracing::{debug, warn};

use super::base_handlers;
use super::collection_handlers;
use super::flags::{is_reactive, is_readonly};
use super::handler::ProxyHandler;
use super::registry;
use super::target::{classify, TargetType};
use super::ReactiveFlag;
use crate::config;
use crate::value::{Obj, Value};

/// The four wrapper flavours: {mutable, readonly} x {deep, shallow}.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variant {
    Reactive,
    ShallowReactive,
    Readonly,
    ShallowReadonly,
}

impl Variant {
    pub const ALL: [Variant; 4] = [
        Variant::Reactive,
        Variant::ShallowReactive,
        Variant::Readonly,
        Variant::ShallowReadonly,
    ];

    pub fn is_readonly(self) -> bool {
        matches!(self, Variant::Readonly | Variant::ShallowReadonly)
    }

    pub fn is_shallow(self) -> bool {
        matches!(self, Variant::ShallowReactive | Variant::ShallowReadonly)
    }

    fn handler(self, target_type: TargetType) -> &'static dyn ProxyHandler {
        match target_type {
            TargetType::Collection => collection_handlers::for_variant(self),
            _ => base_handlers::for_variant(self),
        }
    }
}

/// Wrap `raw` as `variant`, or return it unchanged when it cannot or need
/// not be wrapped.
pub fn wrap(raw: &Value, variant: Variant) -> Value {
    let Value::Object(target) = raw else {
        if config::dev_warnings() {
            warn!(value = ?raw, ?variant, "value cannot be made reactive");
        }
        return raw.clone();
    };

    // Readonly wrappers are never made mutable or wrapped again.
    if is_readonly(raw) {
        return raw.clone();
    }

    // Already a wrapper. Only a readonly wrapper may be layered over a
    // mutable one.
    if raw.get(ReactiveFlag::Raw).is_object() && !(variant.is_readonly() && is_reactive(raw)) {
        return raw.clone();
    }

    if let Some(existing) = registry::lookup(target, variant) {
        return Value::Object(existing);
    }

    let target_type = classify(raw);
    if target_type == TargetType::Invalid {
        return raw.clone();
    }

    let proxy = Obj::new_proxy(target.clone(), variant.handler(target_type));
    registry::insert(target, variant, &proxy);
    debug!(target_id = target.id().raw(), proxy_id = proxy.id().raw(), ?variant, "created wrapper");

    Value::Object(proxy)
}

/// A deep mutable wrapper.
pub fn reactive(target: &Value) -> Value {
    wrap(target, Variant::Reactive)
}

/// A mutable wrapper that tracks only root-level access.
pub fn shallow_reactive(target: &Value) -> Value {
    wrap(target, Variant::ShallowReactive)
}

/// A deep readonly wrapper.
pub fn readonly(target: &Value) -> Value {
    wrap(target, Variant::Readonly)
}

/// A readonly wrapper whose nested values are returned as-is.
pub fn shallow_readonly(target: &Value) -> Value {
    wrap(target, Variant::ShallowReadonly)
}

/// `reactive` for objects, passthrough for everything else.
pub fn to_reactive(value: &Value) -> Value {
    if value.is_object() {
        reactive(value)
    } else {
        value.clone()
    }
}

/// `readonly` for objects, passthrough for everything else.
pub fn to_readonly(value: &Value) -> Value {
    if value.is_object() {
        readonly(value)
    } else {
        value.clone()
    }
}
