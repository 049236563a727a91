//! Reserved flag keys and the identity utilities built on them.
//!
//! Every handler answers the flag keys before touching its target, and no
//! flag read is ever tracked. Flag keys live in their own variant of
//! [`PropertyKey`](crate::value::PropertyKey), so they cannot collide with
//! data.

use crate::value::Value;

/// A reserved sentinel key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReactiveFlag {
    /// Set on a raw value to keep it from ever being wrapped.
    Skip,
    /// `true` on mutable wrappers.
    IsReactive,
    /// `true` on readonly wrappers and readonly boxes.
    IsReadonly,
    /// `true` on shallow wrappers and shallow boxes.
    IsShallow,
    /// The wrapped target, answered only to the wrapper registered for it.
    Raw,
}

impl ReactiveFlag {
    /// The conventional name of the flag, for diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            ReactiveFlag::Skip => "__v_skip",
            ReactiveFlag::IsReactive => "__v_isReactive",
            ReactiveFlag::IsReadonly => "__v_isReadonly",
            ReactiveFlag::IsShallow => "__v_isShallow",
            ReactiveFlag::Raw => "__v_raw",
        }
    }
}

/// Whether `value` is a mutable wrapper, or a readonly wrapper layered over
/// one.
pub fn is_reactive(value: &Value) -> bool {
    if is_readonly(value) {
        return is_reactive(&value.get(ReactiveFlag::Raw));
    }
    value.get(ReactiveFlag::IsReactive).is_truthy()
}

/// Whether `value` is a readonly wrapper or a readonly box.
pub fn is_readonly(value: &Value) -> bool {
    value.get(ReactiveFlag::IsReadonly).is_truthy()
}

/// Whether `value` is a shallow wrapper or a shallow box.
pub fn is_shallow(value: &Value) -> bool {
    value.get(ReactiveFlag::IsShallow).is_truthy()
}

/// Whether `value` is any wrapper produced by the factory.
pub fn is_proxy(value: &Value) -> bool {
    value.as_object().is_some_and(|obj| obj.is_proxy())
}

/// Peel every wrapper off `value`.
///
/// Always terminates at a value that is not itself a wrapper.
pub fn to_raw(value: &Value) -> Value {
    let mut current = value.clone();
    loop {
        let raw = current.get(ReactiveFlag::Raw);
        if !raw.is_object() {
            return current;
        }
        current = raw;
    }
}

/// Mark `value` so that it is never wrapped. Irreversible.
pub fn mark_raw(value: &Value) -> Value {
    if let Some(obj) = value.as_object() {
        obj.set_skipped();
    }
    value.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{reactive, readonly};

    #[test]
    fn plain_values_carry_no_flags() {
        let value = Value::record([("a", 1)]);
        assert!(!is_reactive(&value));
        assert!(!is_readonly(&value));
        assert!(!is_shallow(&value));
        assert!(!is_proxy(&value));
        assert!(to_raw(&value).ptr_eq(&value));
        assert!(!is_reactive(&Value::from(1)));
    }

    #[test]
    fn readonly_over_reactive_is_reactive() {
        let raw = Value::object();
        let observed = reactive(&raw);
        let locked = readonly(&observed);

        assert!(is_reactive(&observed));
        assert!(is_reactive(&locked));
        assert!(is_readonly(&locked));
        assert!(!is_readonly(&observed));
        assert!(to_raw(&locked).ptr_eq(&raw));
    }

    #[test]
    fn mark_raw_on_wrapper_marks_target() {
        let raw = Value::object();
        let observed = reactive(&raw);
        mark_raw(&observed);
        assert!(raw.get(ReactiveFlag::Skip).is_truthy());
    }
}
