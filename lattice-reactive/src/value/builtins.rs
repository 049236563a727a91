//! Builtin methods resolved by property reads on arrays, maps and sets.
//!
//! Array methods are generic over `this`: they only use `get`, `set`, `has`
//! and `delete` on the receiver, so invoking one on a proxy passes every
//! element access through the proxy's handler. Map and set methods require a
//! raw receiver of the matching kind.

use indexmap::IndexMap;

use super::object::ObjectBody;
use super::{to_length, MapKey, NativeFunction, Obj, ObjectKind, Value};
use crate::error::{ReactiveError, Result};

type Builtin = fn(&Value, &[Value]) -> Result<Value>;

thread_local! {
    static ARRAY_METHODS: IndexMap<&'static str, Value> = methods(&[
        ("push", array_push as Builtin),
        ("pop", array_pop as Builtin),
        ("shift", array_shift as Builtin),
        ("unshift", array_unshift as Builtin),
        ("splice", array_splice as Builtin),
        ("includes", array_includes as Builtin),
        ("indexOf", array_index_of as Builtin),
        ("lastIndexOf", array_last_index_of as Builtin),
    ]);

    static MAP_METHODS: IndexMap<&'static str, Value> = methods(&[
        ("get", map_get as Builtin),
        ("set", map_set as Builtin),
        ("has", collection_has as Builtin),
        ("delete", collection_delete as Builtin),
        ("clear", collection_clear as Builtin),
        ("forEach", collection_for_each as Builtin),
        ("keys", collection_keys as Builtin),
        ("values", collection_values as Builtin),
        ("entries", collection_entries as Builtin),
    ]);

    static SET_METHODS: IndexMap<&'static str, Value> = methods(&[
        ("add", set_add as Builtin),
        ("has", collection_has as Builtin),
        ("delete", collection_delete as Builtin),
        ("clear", collection_clear as Builtin),
        ("forEach", collection_for_each as Builtin),
        ("keys", collection_values as Builtin),
        ("values", collection_values as Builtin),
        ("entries", collection_entries as Builtin),
    ]);
}

const WEAK_MAP_METHODS: &[&str] = &["get", "set", "has", "delete"];
const WEAK_SET_METHODS: &[&str] = &["add", "has", "delete"];

fn methods(table: &[(&'static str, Builtin)]) -> IndexMap<&'static str, Value> {
    table
        .iter()
        .map(|(name, builtin)| {
            let builtin = *builtin;
            (*name, Value::function(name, builtin))
        })
        .collect()
}

pub(crate) fn array_method(name: &str) -> Option<Value> {
    ARRAY_METHODS.with(|table| table.get(name).cloned())
}

pub(crate) fn map_method(name: &str, weak: bool) -> Option<Value> {
    if weak && !WEAK_MAP_METHODS.contains(&name) {
        return None;
    }
    MAP_METHODS.with(|table| table.get(name).cloned())
}

pub(crate) fn set_method(name: &str, weak: bool) -> Option<Value> {
    if weak && !WEAK_SET_METHODS.contains(&name) {
        return None;
    }
    SET_METHODS.with(|table| table.get(name).cloned())
}

fn arg(args: &[Value], index: usize) -> Value {
    args.get(index).cloned().unwrap_or(Value::Undefined)
}

/// ToIntegerOrInfinity for the numeric arguments the builtins accept.
fn to_integer(value: &Value) -> f64 {
    match value {
        Value::Number(n) if n.is_nan() => 0.0,
        Value::Number(n) => n.trunc(),
        Value::Bool(true) => 1.0,
        _ => 0.0,
    }
}

/// Resolve a relative index against `len`, clamped to `0..=len`.
fn relative_index(value: &Value, len: usize) -> usize {
    let relative = to_integer(value);
    let len = len as f64;
    let resolved = if relative < 0.0 {
        (len + relative).max(0.0)
    } else {
        relative.min(len)
    };
    resolved as usize
}

fn length_of(this: &Value) -> usize {
    to_length(&this.get("length"))
}

/// Move element `from` to `to`, leaving a hole when `from` is a hole.
fn move_element(this: &Value, from: usize, to: usize) {
    if this.has(from) {
        let value = this.get(from);
        this.set(to, value);
    } else {
        this.delete(to);
    }
}

// ----------------------------------------------------------------------------
// Array
// ----------------------------------------------------------------------------

fn array_push(this: &Value, args: &[Value]) -> Result<Value> {
    let len = length_of(this);
    for (offset, item) in args.iter().enumerate() {
        this.set(len + offset, item.clone());
    }
    let new_len = len + args.len();
    this.set("length", new_len);
    Ok(Value::from(new_len))
}

fn array_pop(this: &Value, _args: &[Value]) -> Result<Value> {
    let len = length_of(this);
    if len == 0 {
        this.set("length", 0);
        return Ok(Value::Undefined);
    }
    let last = this.get(len - 1);
    this.delete(len - 1);
    this.set("length", len - 1);
    Ok(last)
}

fn array_shift(this: &Value, _args: &[Value]) -> Result<Value> {
    let len = length_of(this);
    if len == 0 {
        this.set("length", 0);
        return Ok(Value::Undefined);
    }
    let first = this.get(0usize);
    for from in 1..len {
        move_element(this, from, from - 1);
    }
    this.delete(len - 1);
    this.set("length", len - 1);
    Ok(first)
}

fn array_unshift(this: &Value, args: &[Value]) -> Result<Value> {
    let len = length_of(this);
    let count = args.len();
    if count > 0 {
        for from in (0..len).rev() {
            move_element(this, from, from + count);
        }
        for (index, item) in args.iter().enumerate() {
            this.set(index, item.clone());
        }
    }
    this.set("length", len + count);
    Ok(Value::from(len + count))
}

fn array_splice(this: &Value, args: &[Value]) -> Result<Value> {
    let len = length_of(this);
    let start = relative_index(&arg(args, 0), len);
    let delete_count = match args.len() {
        0 => 0,
        1 => len - start,
        _ => (to_integer(&args[1]).max(0.0) as usize).min(len - start),
    };
    let items = args.get(2..).unwrap_or(&[]);

    let removed: Vec<Option<Value>> = (start..start + delete_count)
        .map(|index| this.has(index).then(|| this.get(index)))
        .collect();

    if items.len() < delete_count {
        for index in start..len - delete_count {
            move_element(this, index + delete_count, index + items.len());
        }
        for index in (len - delete_count + items.len()..len).rev() {
            this.delete(index);
        }
    } else if items.len() > delete_count {
        for index in (start..len - delete_count).rev() {
            move_element(this, index + delete_count, index + items.len());
        }
    }
    for (offset, item) in items.iter().enumerate() {
        this.set(start + offset, item.clone());
    }
    this.set("length", len - delete_count + items.len());

    Ok(Value::Object(Obj::new(ObjectBody::array(removed))))
}

fn array_includes(this: &Value, args: &[Value]) -> Result<Value> {
    let len = length_of(this);
    let search = arg(args, 0);
    let start = relative_index(&arg(args, 1), len);
    let found = (start..len).any(|index| this.get(index).same_value_zero(&search));
    Ok(Value::Bool(found))
}

fn array_index_of(this: &Value, args: &[Value]) -> Result<Value> {
    let len = length_of(this);
    let search = arg(args, 0);
    let start = relative_index(&arg(args, 1), len);
    let found = (start..len).find(|index| this.has(*index) && this.get(*index).strict_equals(&search));
    Ok(found.map_or(Value::from(-1), Value::from))
}

fn array_last_index_of(this: &Value, args: &[Value]) -> Result<Value> {
    let len = length_of(this);
    if len == 0 {
        return Ok(Value::from(-1));
    }
    let search = arg(args, 0);
    let from = if args.len() > 1 {
        let n = to_integer(&args[1]);
        if n >= 0.0 {
            n.min(len as f64 - 1.0)
        } else {
            len as f64 + n
        }
    } else {
        len as f64 - 1.0
    };
    if from < 0.0 {
        return Ok(Value::from(-1));
    }
    let found = (0..=from as usize)
        .rev()
        .find(|index| this.has(*index) && this.get(*index).strict_equals(&search));
    Ok(found.map_or(Value::from(-1), Value::from))
}

// ----------------------------------------------------------------------------
// Map / Set
// ----------------------------------------------------------------------------

fn receiver<'a>(this: &'a Value, method: &'static str, expected: &'static str) -> Result<&'a Obj> {
    let incompatible = ReactiveError::IncompatibleReceiver { method, expected };
    let obj = this.as_object().ok_or(incompatible.clone())?;
    match obj.body() {
        ObjectBody::Map { .. } if expected == "Map" => Ok(obj),
        ObjectBody::Set { .. } if expected == "Set" => Ok(obj),
        ObjectBody::Map { .. } | ObjectBody::Set { .. } if expected == "Map or Set" => Ok(obj),
        _ => Err(incompatible),
    }
}

fn check_weak_key(obj: &Obj, key: &Value) -> Result<()> {
    let weak = matches!(obj.kind(), ObjectKind::WeakMap | ObjectKind::WeakSet);
    if weak && !key.is_object() {
        return Err(ReactiveError::InvalidWeakKey(format!("{:?}", key)));
    }
    Ok(())
}

fn map_get(this: &Value, args: &[Value]) -> Result<Value> {
    let obj = receiver(this, "get", "Map")?;
    Ok(collection::get(obj, &arg(args, 0)))
}

fn map_set(this: &Value, args: &[Value]) -> Result<Value> {
    let obj = receiver(this, "set", "Map")?;
    let key = arg(args, 0);
    check_weak_key(obj, &key)?;
    collection::insert(obj, key, arg(args, 1));
    Ok(this.clone())
}

fn set_add(this: &Value, args: &[Value]) -> Result<Value> {
    let obj = receiver(this, "add", "Set")?;
    let member = arg(args, 0);
    check_weak_key(obj, &member)?;
    collection::insert(obj, member.clone(), member);
    Ok(this.clone())
}

fn collection_has(this: &Value, args: &[Value]) -> Result<Value> {
    let obj = receiver(this, "has", "Map or Set")?;
    Ok(Value::Bool(collection::has(obj, &arg(args, 0))))
}

fn collection_delete(this: &Value, args: &[Value]) -> Result<Value> {
    let obj = receiver(this, "delete", "Map or Set")?;
    Ok(Value::Bool(collection::remove(obj, &arg(args, 0))))
}

fn collection_clear(this: &Value, _args: &[Value]) -> Result<Value> {
    let obj = receiver(this, "clear", "Map or Set")?;
    collection::clear(obj);
    Ok(Value::Undefined)
}

fn collection_for_each(this: &Value, args: &[Value]) -> Result<Value> {
    let obj = receiver(this, "forEach", "Map or Set")?;
    let callback = arg(args, 0);
    let this_arg = arg(args, 1);
    for (key, value) in collection::entries(obj) {
        callback.call(&this_arg, &[value, key, this.clone()])?;
    }
    Ok(Value::Undefined)
}

fn collection_keys(this: &Value, _args: &[Value]) -> Result<Value> {
    let obj = receiver(this, "keys", "Map or Set")?;
    Ok(Value::array(collection::entries(obj).into_iter().map(|(key, _)| key)))
}

fn collection_values(this: &Value, _args: &[Value]) -> Result<Value> {
    let obj = receiver(this, "values", "Map or Set")?;
    Ok(Value::array(collection::entries(obj).into_iter().map(|(_, value)| value)))
}

fn collection_entries(this: &Value, _args: &[Value]) -> Result<Value> {
    let obj = receiver(this, "entries", "Map or Set")?;
    Ok(Value::array(
        collection::entries(obj)
            .into_iter()
            .map(|(key, value)| Value::array([key, value])),
    ))
}

/// Raw collection storage access. Callers pass the raw map or set; any other
/// object behaves as an empty collection.
pub(crate) mod collection {
    use super::*;

    pub(crate) fn is_map(obj: &Obj) -> bool {
        matches!(obj.body(), ObjectBody::Map { .. })
    }

    pub(crate) fn has(obj: &Obj, key: &Value) -> bool {
        let key = MapKey::new(key.clone());
        match obj.body() {
            ObjectBody::Map { entries, .. } => entries.borrow().contains_key(&key),
            ObjectBody::Set { entries, .. } => entries.borrow().contains(&key),
            _ => false,
        }
    }

    pub(crate) fn get(obj: &Obj, key: &Value) -> Value {
        match obj.body() {
            ObjectBody::Map { entries, .. } => entries
                .borrow()
                .get(&MapKey::new(key.clone()))
                .cloned()
                .unwrap_or(Value::Undefined),
            _ => Value::Undefined,
        }
    }

    /// Map: set `key` to `value`. Set: add `key`.
    pub(crate) fn insert(obj: &Obj, key: Value, value: Value) {
        match obj.body() {
            ObjectBody::Map { entries, .. } => {
                entries.borrow_mut().insert(MapKey::new(key), value);
            }
            ObjectBody::Set { entries, .. } => {
                entries.borrow_mut().insert(MapKey::new(key));
            }
            _ => {}
        }
    }

    pub(crate) fn remove(obj: &Obj, key: &Value) -> bool {
        let key = MapKey::new(key.clone());
        match obj.body() {
            ObjectBody::Map { entries, .. } => entries.borrow_mut().shift_remove(&key).is_some(),
            ObjectBody::Set { entries, .. } => entries.borrow_mut().shift_remove(&key),
            _ => false,
        }
    }

    pub(crate) fn clear(obj: &Obj) {
        match obj.body() {
            ObjectBody::Map { entries, .. } => entries.borrow_mut().clear(),
            ObjectBody::Set { entries, .. } => entries.borrow_mut().clear(),
            _ => {}
        }
    }

    pub(crate) fn size(obj: &Obj) -> usize {
        match obj.body() {
            ObjectBody::Map { entries, .. } => entries.borrow().len(),
            ObjectBody::Set { entries, .. } => entries.borrow().len(),
            _ => 0,
        }
    }

    /// Snapshot of `(key, value)` pairs; sets yield `(member, member)`.
    pub(crate) fn entries(obj: &Obj) -> Vec<(Value, Value)> {
        match obj.body() {
            ObjectBody::Map { entries, .. } => entries
                .borrow()
                .iter()
                .map(|(key, value)| (key.value().clone(), value.clone()))
                .collect(),
            ObjectBody::Set { entries, .. } => entries
                .borrow()
                .iter()
                .map(|member| (member.value().clone(), member.value().clone()))
                .collect(),
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbers(array: &Value) -> Vec<f64> {
        (0..array.len())
            .map(|index| array.get(index).as_number().unwrap_or(f64::NAN))
            .collect()
    }

    #[test]
    fn push_pop_shift_unshift() {
        let array = Value::array([1, 2]);
        assert_eq!(array.call_method("push", &[Value::from(3)]).unwrap(), Value::from(3));
        assert_eq!(numbers(&array), vec![1.0, 2.0, 3.0]);

        assert_eq!(array.call_method("pop", &[]).unwrap(), Value::from(3));
        assert_eq!(array.call_method("shift", &[]).unwrap(), Value::from(1));
        assert_eq!(numbers(&array), vec![2.0]);

        assert_eq!(
            array.call_method("unshift", &[Value::from(0), Value::from(1)]).unwrap(),
            Value::from(3)
        );
        assert_eq!(numbers(&array), vec![0.0, 1.0, 2.0]);

        let empty = Value::array(Vec::<Value>::new());
        assert_eq!(empty.call_method("pop", &[]).unwrap(), Value::Undefined);
    }

    #[test]
    fn splice_removes_and_inserts() {
        let array = Value::array([1, 2, 3, 4, 5]);
        let removed = array
            .call_method("splice", &[Value::from(1), Value::from(2)])
            .unwrap();
        assert_eq!(numbers(&removed), vec![2.0, 3.0]);
        assert_eq!(numbers(&array), vec![1.0, 4.0, 5.0]);

        array
            .call_method(
                "splice",
                &[Value::from(-1), Value::from(0), Value::from(8), Value::from(9)],
            )
            .unwrap();
        assert_eq!(numbers(&array), vec![1.0, 4.0, 8.0, 9.0, 5.0]);

        let tail = array.call_method("splice", &[Value::from(3)]).unwrap();
        assert_eq!(numbers(&tail), vec![9.0, 5.0]);
        assert_eq!(numbers(&array), vec![1.0, 4.0, 8.0]);
    }

    #[test]
    fn search_methods() {
        let array = Value::array([Value::from(1), Value::Number(f64::NAN), Value::from(1)]);
        let nan = Value::Number(f64::NAN);

        assert_eq!(array.call_method("includes", &[nan.clone()]).unwrap(), Value::Bool(true));
        assert_eq!(array.call_method("indexOf", &[nan]).unwrap(), Value::from(-1));
        assert_eq!(array.call_method("indexOf", &[Value::from(1)]).unwrap(), Value::from(0));
        assert_eq!(
            array.call_method("lastIndexOf", &[Value::from(1)]).unwrap(),
            Value::from(2)
        );
        assert_eq!(
            array
                .call_method("indexOf", &[Value::from(1), Value::from(1)])
                .unwrap(),
            Value::from(2)
        );
    }

    #[test]
    fn map_and_set_methods() {
        let map = Value::map([(Value::from("a"), Value::from(1))]);
        assert_eq!(map.call_method("get", &[Value::from("a")]).unwrap(), Value::from(1));
        map.call_method("set", &[Value::from("b"), Value::from(2)]).unwrap();
        assert_eq!(map.get("size"), Value::from(2));
        assert_eq!(
            map.call_method("delete", &[Value::from("a")]).unwrap(),
            Value::Bool(true)
        );

        let set = Value::set_of([Value::Number(-0.0)]);
        assert_eq!(
            set.call_method("has", &[Value::from(0)]).unwrap(),
            Value::Bool(true)
        );
        set.call_method("add", &[Value::from(0)]).unwrap();
        assert_eq!(set.get("size"), Value::from(1));
    }

    #[test]
    fn weak_collections_reject_primitives() {
        let weak = Value::weak_map();
        assert!(matches!(
            weak.call_method("set", &[Value::from(1), Value::from(1)]),
            Err(ReactiveError::InvalidWeakKey(_))
        ));
        assert!(weak.get("size").is_undefined());
        assert!(weak.call_method("keys", &[]).is_err());
    }

    #[test]
    fn incompatible_receiver() {
        let get = Value::map(Vec::<(Value, Value)>::new()).get("get");
        let err = get.call(&Value::object(), &[]).unwrap_err();
        assert_eq!(
            err,
            ReactiveError::IncompatibleReceiver {
                method: "get",
                expected: "Map"
            }
        );
    }
}
