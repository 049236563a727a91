//! Heap objects and their ordinary structural operations.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::{IndexMap, IndexSet};

use super::builtins;
use super::{MapKey, NativeFunction, Obj, ObjectId, PropertyKey, Value};
use crate::error::{ReactiveError, Result};
use crate::reactive::{self, BoxedRef, ProxyHandler, ReactiveFlag};
use crate::tracking;

/// What a heap object is, independent of any proxy wrapping it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Object,
    Array,
    Map,
    Set,
    WeakMap,
    WeakSet,
    Function,
    Date,
    Boxed,
    Proxy,
}

pub(crate) struct ObjectData {
    id: ObjectId,
    extensible: Cell<bool>,
    skip: Cell<bool>,
    body: ObjectBody,
}

impl Drop for ObjectData {
    fn drop(&mut self) {
        reactive::registry::release(self.id);
        tracking::release_target(self.id);
    }
}

pub(crate) struct RecordData {
    props: RefCell<IndexMap<PropertyKey, Value>>,
    proto: RefCell<Option<Obj>>,
}

/// Elements are stored sparsely; any index below `length` without an
/// entry is a hole.
pub(crate) struct ArrayData {
    elements: RefCell<BTreeMap<u32, Value>>,
    length: Cell<u32>,
}

impl ArrayData {
    fn len(&self) -> usize {
        self.length.get() as usize
    }

    fn get(&self, index: u32) -> Option<Value> {
        self.elements.borrow().get(&index).cloned()
    }

    fn contains(&self, index: u32) -> bool {
        self.elements.borrow().contains_key(&index)
    }

    fn truncate(&self, length: u32) {
        self.elements.borrow_mut().retain(|index, _| *index < length);
        self.length.set(length);
    }
}

pub(crate) struct ProxyData {
    pub(crate) target: Obj,
    pub(crate) handler: &'static dyn ProxyHandler,
}

pub(crate) enum ObjectBody {
    Record(RecordData),
    Array(ArrayData),
    Map {
        entries: RefCell<IndexMap<MapKey, Value>>,
        weak: bool,
    },
    Set {
        entries: RefCell<IndexSet<MapKey>>,
        weak: bool,
    },
    Function(NativeFunction),
    Date(f64),
    Boxed(BoxedRef),
    Proxy(ProxyData),
}

impl ObjectBody {
    pub(crate) fn record(proto: Option<Obj>) -> Self {
        ObjectBody::Record(RecordData {
            props: RefCell::new(IndexMap::new()),
            proto: RefCell::new(proto),
        })
    }

    /// `None` slots become holes.
    pub(crate) fn array(slots: Vec<Option<Value>>) -> Self {
        let length = u32::try_from(slots.len()).unwrap_or(u32::MAX);
        let elements = (0..length)
            .zip(slots)
            .filter_map(|(index, slot)| slot.map(|value| (index, value)))
            .collect();
        ObjectBody::Array(ArrayData {
            elements: RefCell::new(elements),
            length: Cell::new(length),
        })
    }

    pub(crate) fn map(entries: impl IntoIterator<Item = (Value, Value)>, weak: bool) -> Self {
        let entries = entries
            .into_iter()
            .map(|(key, value)| (MapKey::new(key), value))
            .collect();
        ObjectBody::Map {
            entries: RefCell::new(entries),
            weak,
        }
    }

    pub(crate) fn set(items: impl IntoIterator<Item = Value>, weak: bool) -> Self {
        ObjectBody::Set {
            entries: RefCell::new(items.into_iter().map(MapKey::new).collect()),
            weak,
        }
    }

    fn kind(&self) -> ObjectKind {
        match self {
            ObjectBody::Record(_) => ObjectKind::Object,
            ObjectBody::Array(_) => ObjectKind::Array,
            ObjectBody::Map { weak: false, .. } => ObjectKind::Map,
            ObjectBody::Map { weak: true, .. } => ObjectKind::WeakMap,
            ObjectBody::Set { weak: false, .. } => ObjectKind::Set,
            ObjectBody::Set { weak: true, .. } => ObjectKind::WeakSet,
            ObjectBody::Function(_) => ObjectKind::Function,
            ObjectBody::Date(_) => ObjectKind::Date,
            ObjectBody::Boxed(_) => ObjectKind::Boxed,
            ObjectBody::Proxy(_) => ObjectKind::Proxy,
        }
    }
}

/// A weak handle to a heap object.
#[derive(Clone)]
pub struct WeakObj(Weak<ObjectData>);

impl WeakObj {
    pub fn upgrade(&self) -> Option<Obj> {
        self.0.upgrade().map(Obj)
    }
}

impl Obj {
    pub(crate) fn new(body: ObjectBody) -> Self {
        Obj(Rc::new(ObjectData {
            id: ObjectId::new(),
            extensible: Cell::new(true),
            skip: Cell::new(false),
            body,
        }))
    }

    pub(crate) fn new_proxy(target: Obj, handler: &'static dyn ProxyHandler) -> Self {
        Obj::new(ObjectBody::Proxy(ProxyData { target, handler }))
    }

    pub fn id(&self) -> ObjectId {
        self.0.id
    }

    pub fn ptr_eq(&self, other: &Obj) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn downgrade(&self) -> WeakObj {
        WeakObj(Rc::downgrade(&self.0))
    }

    pub(crate) fn body(&self) -> &ObjectBody {
        &self.0.body
    }

    /// The kind of this object itself; proxies report [`ObjectKind::Proxy`].
    pub fn kind(&self) -> ObjectKind {
        self.0.body.kind()
    }

    /// The kind of the innermost object behind any proxies.
    pub fn target_kind(&self) -> ObjectKind {
        self.innermost().kind()
    }

    pub fn is_array(&self) -> bool {
        self.target_kind() == ObjectKind::Array
    }

    pub fn is_proxy(&self) -> bool {
        matches!(self.0.body, ObjectBody::Proxy(_))
    }

    /// Follow proxy targets until a non-proxy object is reached.
    ///
    /// Unlike unwrapping through the raw flag, this never consults a handler.
    pub(crate) fn innermost(&self) -> Obj {
        let mut current = self.clone();
        loop {
            let next = match current.body() {
                ObjectBody::Proxy(proxy) => proxy.target.clone(),
                _ => return current,
            };
            current = next;
        }
    }

    pub(crate) fn as_boxed(&self) -> Option<&BoxedRef> {
        match self.body() {
            ObjectBody::Boxed(boxed) => Some(boxed),
            _ => None,
        }
    }

    // ------------------------------------------------------------------
    // Integrity
    // ------------------------------------------------------------------

    pub fn is_extensible(&self) -> bool {
        self.innermost().0.extensible.get()
    }

    /// Forbid adding new properties or elements. Existing ones stay writable.
    pub fn prevent_extensions(&self) {
        self.innermost().0.extensible.set(false);
    }

    pub(crate) fn is_skipped(&self) -> bool {
        self.innermost().0.skip.get()
    }

    pub(crate) fn set_skipped(&self) {
        self.innermost().0.skip.set(true);
    }

    // ------------------------------------------------------------------
    // Prototype
    // ------------------------------------------------------------------

    pub fn prototype(&self) -> Option<Obj> {
        match self.innermost().body() {
            ObjectBody::Record(record) => record.proto.borrow().clone(),
            _ => None,
        }
    }

    pub fn set_prototype(&self, proto: Option<Obj>) -> bool {
        match self.innermost().body() {
            ObjectBody::Record(record) => {
                *record.proto.borrow_mut() = proto;
                true
            }
            _ => false,
        }
    }

    // ------------------------------------------------------------------
    // Structural operations
    // ------------------------------------------------------------------

    /// Read `key`, resolving accessors and inherited properties against
    /// `receiver`.
    pub fn get(&self, key: &PropertyKey, receiver: &Value) -> Value {
        if let PropertyKey::Flag(flag) = key {
            return self.flag(*flag, receiver);
        }
        match self.body() {
            ObjectBody::Proxy(proxy) => proxy.handler.get(&proxy.target, key, receiver),
            ObjectBody::Record(record) => {
                let own = record.props.borrow().get(key).cloned();
                if let Some(value) = own {
                    return value;
                }
                let proto = record.proto.borrow().clone();
                match proto {
                    Some(proto) => proto.get(key, receiver),
                    None => Value::Undefined,
                }
            }
            ObjectBody::Array(array) => match key {
                PropertyKey::Index(index) => array.get(*index).unwrap_or(Value::Undefined),
                PropertyKey::String(name) if &**name == "length" => Value::from(array.len()),
                PropertyKey::String(name) => {
                    builtins::array_method(name).unwrap_or(Value::Undefined)
                }
                _ => Value::Undefined,
            },
            ObjectBody::Map { entries, weak } => match key.as_str() {
                Some("size") if !weak => Value::from(entries.borrow().len()),
                Some(name) => builtins::map_method(name, *weak).unwrap_or(Value::Undefined),
                None => Value::Undefined,
            },
            ObjectBody::Set { entries, weak } => match key.as_str() {
                Some("size") if !weak => Value::from(entries.borrow().len()),
                Some(name) => builtins::set_method(name, *weak).unwrap_or(Value::Undefined),
                None => Value::Undefined,
            },
            ObjectBody::Boxed(boxed) if key.is("value") => boxed.read(self),
            _ => Value::Undefined,
        }
    }

    /// Reserved flag reads. Proxies answer through their handler; plain
    /// objects only know their skip marker, boxes their own mutability.
    fn flag(&self, flag: ReactiveFlag, receiver: &Value) -> Value {
        match self.body() {
            ObjectBody::Proxy(proxy) => {
                proxy
                    .handler
                    .get(&proxy.target, &PropertyKey::Flag(flag), receiver)
            }
            ObjectBody::Boxed(boxed) => match flag {
                ReactiveFlag::IsReadonly => Value::Bool(boxed.is_readonly()),
                ReactiveFlag::IsShallow => Value::Bool(boxed.is_shallow()),
                ReactiveFlag::Skip => Value::Bool(self.0.skip.get()),
                _ => Value::Undefined,
            },
            _ => match flag {
                ReactiveFlag::Skip => Value::Bool(self.0.skip.get()),
                _ => Value::Undefined,
            },
        }
    }

    /// Write `key`. Writes that land on an inherited data property, or on a
    /// missing one, define an own property on the receiver's innermost target.
    pub fn set(&self, key: &PropertyKey, value: Value, receiver: &Value) -> bool {
        if matches!(key, PropertyKey::Flag(_)) {
            return false;
        }
        match self.body() {
            ObjectBody::Proxy(proxy) => proxy.handler.set(&proxy.target, key, value, receiver),
            ObjectBody::Record(record) => {
                let own = record.props.borrow().contains_key(key);
                if !own {
                    let proto = record.proto.borrow().clone();
                    if let Some(proto) = proto {
                        return proto.set(key, value, receiver);
                    }
                }
                define_on_receiver(receiver, key, value)
            }
            ObjectBody::Array(_) => define_on_receiver(receiver, key, value),
            ObjectBody::Boxed(boxed) if key.is("value") => boxed.write(self, value),
            _ => false,
        }
    }

    /// Create or overwrite an own data property, bypassing any handler.
    pub(crate) fn define_own_property(&self, key: &PropertyKey, value: Value) -> bool {
        match self.body() {
            ObjectBody::Proxy(proxy) => proxy.target.define_own_property(key, value),
            ObjectBody::Record(record) => {
                let mut props = record.props.borrow_mut();
                if !props.contains_key(key) && !self.0.extensible.get() {
                    return false;
                }
                props.insert(key.clone(), value);
                true
            }
            ObjectBody::Array(array) => match key {
                PropertyKey::Index(index) => {
                    let index = *index;
                    if !array.contains(index) && !self.0.extensible.get() {
                        return false;
                    }
                    array.elements.borrow_mut().insert(index, value);
                    if index >= array.length.get() {
                        array.length.set(index + 1);
                    }
                    true
                }
                PropertyKey::String(name) if &**name == "length" => {
                    self.set_array_length(&value).is_ok()
                }
                _ => false,
            },
            _ => false,
        }
    }

    fn set_array_length(&self, value: &Value) -> Result<()> {
        let ObjectBody::Array(array) = self.body() else {
            return Ok(());
        };
        let requested = value.as_number().unwrap_or(f64::NAN);
        if !(requested >= 0.0 && requested.fract() == 0.0 && requested <= f64::from(u32::MAX)) {
            return Err(ReactiveError::InvalidArrayLength(requested));
        }
        let length = requested as u32;
        if length < array.length.get() {
            array.truncate(length);
        } else {
            array.length.set(length);
        }
        Ok(())
    }

    /// Presence check, including the prototype chain.
    pub fn has(&self, key: &PropertyKey) -> bool {
        match self.body() {
            ObjectBody::Proxy(proxy) => proxy.handler.has(&proxy.target, key),
            _ if matches!(key, PropertyKey::Flag(_)) => false,
            ObjectBody::Record(record) => {
                if record.props.borrow().contains_key(key) {
                    return true;
                }
                let proto = record.proto.borrow().clone();
                proto.is_some_and(|proto| proto.has(key))
            }
            ObjectBody::Array(_) => {
                self.has_own(key)
                    || key
                        .as_str()
                        .is_some_and(|name| builtins::array_method(name).is_some())
            }
            ObjectBody::Map { weak, .. } => key.as_str().is_some_and(|name| {
                (name == "size" && !weak) || builtins::map_method(name, *weak).is_some()
            }),
            ObjectBody::Set { weak, .. } => key.as_str().is_some_and(|name| {
                (name == "size" && !weak) || builtins::set_method(name, *weak).is_some()
            }),
            ObjectBody::Boxed(_) => key.is("value"),
            _ => false,
        }
    }

    /// Own-property check. Never consults a handler.
    pub fn has_own(&self, key: &PropertyKey) -> bool {
        match self.body() {
            ObjectBody::Proxy(proxy) => proxy.target.has_own(key),
            ObjectBody::Record(record) => record.props.borrow().contains_key(key),
            ObjectBody::Array(array) => match key {
                PropertyKey::Index(index) => array.contains(*index),
                PropertyKey::String(name) => &**name == "length",
                _ => false,
            },
            ObjectBody::Boxed(_) => key.is("value"),
            _ => false,
        }
    }

    /// Delete an own property. Deleting a missing key succeeds.
    pub fn delete(&self, key: &PropertyKey) -> bool {
        match self.body() {
            ObjectBody::Proxy(proxy) => proxy.handler.delete_property(&proxy.target, key),
            _ if matches!(key, PropertyKey::Flag(_)) => false,
            ObjectBody::Record(record) => {
                record.props.borrow_mut().shift_remove(key);
                true
            }
            ObjectBody::Array(array) => match key {
                PropertyKey::Index(index) => {
                    array.elements.borrow_mut().remove(index);
                    true
                }
                PropertyKey::String(name) => &**name != "length",
                _ => true,
            },
            ObjectBody::Boxed(_) => !key.is("value"),
            _ => true,
        }
    }

    /// Own keys: indices ascending, then strings in insertion order, then
    /// symbols.
    pub fn own_keys(&self) -> Vec<PropertyKey> {
        match self.body() {
            ObjectBody::Proxy(proxy) => proxy.handler.own_keys(&proxy.target),
            ObjectBody::Record(record) => {
                let props = record.props.borrow();
                let mut indices: Vec<u32> = props.keys().filter_map(PropertyKey::as_index).collect();
                indices.sort_unstable();
                let mut keys: Vec<PropertyKey> =
                    indices.into_iter().map(PropertyKey::Index).collect();
                keys.extend(
                    props
                        .keys()
                        .filter(|key| matches!(key, PropertyKey::String(_)))
                        .cloned(),
                );
                keys.extend(
                    props
                        .keys()
                        .filter(|key| matches!(key, PropertyKey::Symbol(_)))
                        .cloned(),
                );
                keys
            }
            ObjectBody::Array(array) => {
                let mut keys: Vec<PropertyKey> = array
                    .elements
                    .borrow()
                    .keys()
                    .map(|index| PropertyKey::Index(*index))
                    .collect();
                keys.push(PropertyKey::from("length"));
                keys
            }
            ObjectBody::Boxed(_) => vec![PropertyKey::from("value")],
            _ => Vec::new(),
        }
    }

    /// Invoke this object as a function.
    pub fn call(&self, this: &Value, args: &[Value]) -> Result<Value> {
        match self.body() {
            ObjectBody::Function(function) => function.call(this, args),
            _ => Err(ReactiveError::NotCallable {
                name: format!("{:?}", self),
            }),
        }
    }

    /// Length of the innermost array, read without passing through handlers.
    pub(crate) fn array_length(&self) -> Option<usize> {
        match self.innermost().body() {
            ObjectBody::Array(array) => Some(array.len()),
            _ => None,
        }
    }
}

fn define_on_receiver(receiver: &Value, key: &PropertyKey, value: Value) -> bool {
    match receiver {
        Value::Object(obj) => obj.innermost().define_own_property(key, value),
        _ => false,
    }
}

impl fmt::Debug for Obj {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = self.id().raw();
        match self.body() {
            ObjectBody::Proxy(proxy) => {
                write!(f, "Proxy<{:?}>#{} -> {:?}", proxy.handler.variant(), id, proxy.target)
            }
            ObjectBody::Array(array) => write!(f, "Array#{}(len {})", id, array.len()),
            ObjectBody::Function(function) => write!(f, "Function#{}({})", id, function.name()),
            ObjectBody::Date(millis) => write!(f, "Date#{}({})", id, millis),
            body => write!(f, "{:?}#{}", body.kind(), id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_length_and_holes() {
        let array = Value::array([1, 2, 3]);
        assert_eq!(array.len(), 3);

        assert!(array.set(5usize, 6));
        assert_eq!(array.len(), 6);
        assert!(!array.as_object().unwrap().has_own(&PropertyKey::Index(4)));
        assert_eq!(array.get(4usize), Value::Undefined);

        assert!(array.set("length", 2));
        assert_eq!(array.own_keys().len(), 3);
        assert!(!array.set("length", -1));
        assert!(!array.set("length", 1.5));
    }

    #[test]
    fn far_indices_leave_holes_without_storage() {
        let array = Value::array([1]);
        assert!(array.set(4_000_000_000usize, 2));
        assert_eq!(array.len(), 4_000_000_001);
        assert_eq!(array.own_keys().len(), 3);
        assert_eq!(array.get(4_000_000_000usize), Value::from(2));
        assert_eq!(array.get(1usize), Value::Undefined);

        assert!(array.set("length", 4_294_967_295u32));
        assert_eq!(array.len(), 4_294_967_295);
        assert!(!array.set("length", 4_294_967_296i64));

        assert!(array.set("length", 1));
        assert_eq!(array.own_keys(), vec![PropertyKey::Index(0), PropertyKey::from("length")]);
    }

    #[test]
    fn inherited_writes_land_on_receiver() {
        let parent = Value::record([("shared", 1)]);
        let child = Value::object_with_proto(&parent);

        assert_eq!(child.get("shared"), Value::from(1));
        assert!(child.has("shared"));
        assert!(!child.as_object().unwrap().has_own(&PropertyKey::from("shared")));

        assert!(child.set("shared", 2));
        assert_eq!(child.get("shared"), Value::from(2));
        assert_eq!(parent.get("shared"), Value::from(1));
    }

    #[test]
    fn non_extensible_rejects_new_keys_only() {
        let record = Value::record([("a", 1)]);
        record.as_object().unwrap().prevent_extensions();

        assert!(record.set("a", 2));
        assert!(!record.set("b", 3));
        assert_eq!(record.get("a"), Value::from(2));
        assert!(!record.has("b"));
    }

    #[test]
    fn own_key_order() {
        let record = Value::object();
        record.set("b", 1);
        record.set("2", 1);
        record.set("a", 1);
        record.set("1", 1);
        assert_eq!(
            record.own_keys(),
            vec![
                PropertyKey::Index(1),
                PropertyKey::Index(2),
                PropertyKey::from("b"),
                PropertyKey::from("a"),
            ]
        );
    }

    #[test]
    fn flags_are_not_data() {
        let record = Value::object();
        assert!(!record.set(ReactiveFlag::Raw, 1));
        assert_eq!(record.get(ReactiveFlag::Raw), Value::Undefined);
        assert_eq!(record.get(ReactiveFlag::Skip), Value::Bool(false));
        assert!(record.own_keys().is_empty());
    }
}
