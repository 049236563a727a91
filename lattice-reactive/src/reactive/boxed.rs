//! Boxed references.
//!
//! A box is a single-slot container read and written through its `value`
//! property. Reads track `value` on the box itself; writes compare raw values
//! and trigger on change. Boxes are never wrapped: the base handlers unwrap
//! them on property reads instead.

use std::cell::RefCell;

use tracing::warn;

use super::factory::{to_reactive, to_readonly};
use super::flags::to_raw;
use crate::config;
use crate::tracking::{track, trigger, TrackKey, TrackOpType, TriggerOpType};
use crate::value::{Obj, ObjectBody, ObjectKind, Value};

/// The slot of a boxed reference.
pub(crate) struct BoxedRef {
    value: RefCell<Value>,
    raw: RefCell<Value>,
    shallow: bool,
    readonly: bool,
}

impl BoxedRef {
    pub fn is_readonly(&self) -> bool {
        self.readonly
    }

    pub fn is_shallow(&self) -> bool {
        self.shallow
    }

    /// Read the slot, tracking `value` on `owner`.
    pub(crate) fn read(&self, owner: &Obj) -> Value {
        track(owner, TrackOpType::Get, "value");
        let value = self.value.borrow().clone();
        // A readonly box over another box is a view of it.
        if self.readonly && is_boxed(&value) {
            let inner = value.get("value");
            return if self.shallow { inner } else { to_readonly(&inner) };
        }
        value
    }

    /// Write the slot, triggering `value` on `owner` if the raw value changed.
    pub(crate) fn write(&self, owner: &Obj, value: Value) -> bool {
        if self.readonly {
            if config::dev_warnings() {
                warn!(box_id = owner.id().raw(), "set operation failed: box is readonly");
            }
            return true;
        }

        let new_raw = if self.shallow { value } else { to_raw(&value) };
        let old_raw = self.raw.borrow().clone();
        if new_raw.same_value(&old_raw) {
            return true;
        }

        *self.raw.borrow_mut() = new_raw.clone();
        *self.value.borrow_mut() = if self.shallow {
            new_raw.clone()
        } else {
            to_reactive(&new_raw)
        };
        trigger(
            owner,
            TriggerOpType::Set,
            Some(TrackKey::from("value")),
            Some(&new_raw),
            Some(&old_raw),
        );
        true
    }
}

fn new_box(value: Value, raw: Value, shallow: bool, readonly: bool) -> Value {
    Value::Object(Obj::new(ObjectBody::Boxed(BoxedRef {
        value: RefCell::new(value),
        raw: RefCell::new(raw),
        shallow,
        readonly,
    })))
}

/// A box holding `value`, made deeply reactive. A box argument is returned
/// as-is.
pub fn boxed(value: Value) -> Value {
    if is_boxed(&value) {
        return value;
    }
    new_box(to_reactive(&value), to_raw(&value), false, false)
}

/// A box whose contents are stored and returned untouched.
pub fn shallow_boxed(value: Value) -> Value {
    if is_boxed(&value) {
        return value;
    }
    new_box(value.clone(), value, true, false)
}

/// A box that rejects writes. Over another box, it reads through to it.
pub fn readonly_boxed(value: Value) -> Value {
    if is_boxed(&value) {
        if value.get(super::ReactiveFlag::IsReadonly).is_truthy() {
            return value;
        }
        return new_box(value.clone(), value, false, true);
    }
    new_box(to_readonly(&value), to_raw(&value), false, true)
}

pub fn is_boxed(value: &Value) -> bool {
    value
        .as_object()
        .is_some_and(|obj| obj.kind() == ObjectKind::Boxed)
}

/// The contents of a box, or the value itself.
pub fn unbox(value: &Value) -> Value {
    if is_boxed(value) {
        value.get("value")
    } else {
        value.clone()
    }
}
