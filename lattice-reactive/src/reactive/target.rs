//! Target classification: which values may be wrapped, and by which handler
//! family.

use crate::value::{ObjectKind, Value};

/// How a value may be wrapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetType {
    /// Never wrapped: primitives, functions, dates, boxes, skipped or
    /// non-extensible objects.
    Invalid,
    /// Records and arrays, wrapped with the base handlers.
    Common,
    /// Maps and sets (weak or not), wrapped with the collection handlers.
    Collection,
}

fn target_type_of(kind: ObjectKind) -> TargetType {
    match kind {
        ObjectKind::Object | ObjectKind::Array => TargetType::Common,
        ObjectKind::Map | ObjectKind::Set | ObjectKind::WeakMap | ObjectKind::WeakSet => {
            TargetType::Collection
        }
        _ => TargetType::Invalid,
    }
}

/// Classify `value`.
pub fn classify(value: &Value) -> TargetType {
    match value {
        Value::Object(obj) if obj.is_skipped() || !obj.is_extensible() => TargetType::Invalid,
        Value::Object(obj) => target_type_of(obj.target_kind()),
        _ => TargetType::Invalid,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::mark_raw;

    #[test]
    fn containers_are_wrappable() {
        assert_eq!(classify(&Value::object()), TargetType::Common);
        assert_eq!(classify(&Value::array([1, 2])), TargetType::Common);
        assert_eq!(classify(&Value::map(Vec::<(Value, Value)>::new())), TargetType::Collection);
        assert_eq!(classify(&Value::set_of(Vec::new())), TargetType::Collection);
        assert_eq!(classify(&Value::weak_map()), TargetType::Collection);
        assert_eq!(classify(&Value::weak_set()), TargetType::Collection);
    }

    #[test]
    fn everything_else_is_invalid() {
        assert_eq!(classify(&Value::from(1)), TargetType::Invalid);
        assert_eq!(classify(&Value::from("a")), TargetType::Invalid);
        assert_eq!(classify(&Value::date(0.0)), TargetType::Invalid);
        assert_eq!(classify(&Value::function("f", |_, _| Ok(Value::Undefined))), TargetType::Invalid);
    }

    #[test]
    fn skipped_and_sealed_are_invalid() {
        let skipped = mark_raw(&Value::object());
        assert_eq!(classify(&skipped), TargetType::Invalid);

        let sealed = Value::array([1]);
        sealed.as_object().unwrap().prevent_extensions();
        assert_eq!(classify(&sealed), TargetType::Invalid);
    }
}
