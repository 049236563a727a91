//! Array methods that need tracking behavior of their own.
//!
//! Identity searches track every index and retry with raw arguments when the
//! first attempt misses. Length-mutating methods run with tracking paused, so
//! their internal `length` reads never become dependencies of the caller.

use indexmap::IndexMap;

use super::flags::to_raw;
use crate::error::Result;
use crate::tracking::{pause_tracking, track, TrackOpType};
use crate::value::{PropertyKey, Value};

const SEARCH_METHODS: [&str; 3] = ["includes", "indexOf", "lastIndexOf"];
const MUTATOR_METHODS: [&str; 5] = ["push", "pop", "shift", "unshift", "splice"];

thread_local! {
    static INSTRUMENTATIONS: IndexMap<&'static str, Value> = instrumentations();
}

fn instrumentations() -> IndexMap<&'static str, Value> {
    let mut table = IndexMap::new();
    for name in SEARCH_METHODS {
        table.insert(name, Value::function(name, move |this, args| search(name, this, args)));
    }
    for name in MUTATOR_METHODS {
        table.insert(name, Value::function(name, move |this, args| mutate(name, this, args)));
    }
    table
}

/// The shim for `key`, if the key names an instrumented method.
pub(crate) fn lookup(key: &PropertyKey) -> Option<Value> {
    let name = key.as_str()?;
    INSTRUMENTATIONS.with(|table| table.get(name).cloned())
}

fn is_miss(result: &Value) -> bool {
    matches!(result, Value::Bool(false)) || result.as_number() == Some(-1.0)
}

fn search(method: &str, this: &Value, args: &[Value]) -> Result<Value> {
    let raw = to_raw(this);
    if let Some(array) = raw.as_object() {
        for index in 0..this.len() {
            track(array, TrackOpType::Get, PropertyKey::from(index));
        }
    }

    let result = raw.call_method(method, args)?;
    if !is_miss(&result) {
        return Ok(result);
    }

    let raw_args: Vec<Value> = args.iter().map(to_raw).collect();
    raw.call_method(method, &raw_args)
}

fn mutate(method: &str, this: &Value, args: &[Value]) -> Result<Value> {
    let _paused = pause_tracking();
    to_raw(this).get(method).call(this, args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{boxed, reactive, readonly};
    use crate::tracking::{Effect, Runtime, TrackKey};
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn search_finds_wrapped_and_raw_elements() {
        let first = Value::object();
        let raw = Value::array([first.clone(), Value::from(2)]);
        let observed = reactive(&raw);

        let wrapped_first = observed.get(0usize);
        assert!(!wrapped_first.ptr_eq(&first));

        assert_eq!(observed.call_method("includes", &[wrapped_first.clone()]).unwrap(), Value::Bool(true));
        assert_eq!(observed.call_method("includes", &[first.clone()]).unwrap(), Value::Bool(true));
        assert_eq!(observed.call_method("indexOf", &[wrapped_first]).unwrap(), Value::from(0));
        assert_eq!(observed.call_method("lastIndexOf", &[Value::from(2)]).unwrap(), Value::from(1));
        assert_eq!(observed.call_method("indexOf", &[Value::from(3)]).unwrap(), Value::from(-1));
    }

    #[test]
    fn raw_retry_compares_against_stored_boxes() {
        let cell = boxed(Value::from(1));
        let observed = reactive(&Value::array([cell.clone(), Value::from(2)]));
        // Elements are compared as stored; a box never equals its contents.
        assert_eq!(observed.call_method("includes", &[Value::from(1)]).unwrap(), Value::Bool(false));
        assert_eq!(observed.call_method("includes", &[cell]).unwrap(), Value::Bool(true));
        assert_eq!(observed.call_method("includes", &[Value::from(2)]).unwrap(), Value::Bool(true));
    }

    #[test]
    fn search_tracks_every_index() {
        let raw = Value::array([1, 2, 3]);
        let target = raw.as_object().unwrap().clone();
        let observed = reactive(&raw);

        let reader = observed.clone();
        let _effect = Effect::new(move || {
            let _ = reader.call_method("includes", &[Value::from(1)]);
        });

        for index in 0..3u32 {
            assert_eq!(Runtime::dependent_count(target.id(), &TrackKey::from(PropertyKey::Index(index))), 1);
        }
        assert_eq!(Runtime::dependent_count(target.id(), &TrackKey::length()), 1);
    }

    #[test]
    fn readonly_over_reactive_still_searches() {
        let first = Value::object();
        let locked = readonly(&reactive(&Value::array([first.clone()])));
        assert_eq!(locked.call_method("includes", &[first]).unwrap(), Value::Bool(true));
    }

    #[test]
    fn mutators_do_not_track_length() {
        let raw = Value::array([1]);
        let target = raw.as_object().unwrap().clone();
        let observed = reactive(&raw);

        let writer = observed.clone();
        let _effect = Effect::new(move || {
            let _ = writer.call_method("push", &[Value::from(2)]);
        });

        assert_eq!(Runtime::dependent_count(target.id(), &TrackKey::length()), 0);
        assert_eq!(raw.len(), 2);
    }

    #[test]
    fn two_pushing_readers_do_not_loop() {
        let observed = reactive(&Value::array(Vec::<Value>::new()));
        let runs = Rc::new(Cell::new(0));

        let make = |observed: Value, runs: Rc<Cell<usize>>| {
            Effect::new(move || {
                runs.set(runs.get() + 1);
                let _ = observed.call_method("push", &[Value::from(1)]);
            })
        };
        let _a = make(observed.clone(), runs.clone());
        let _b = make(observed.clone(), runs.clone());

        assert_eq!(runs.get(), 2);
        assert_eq!(observed.len(), 2);
    }

    #[test]
    fn mutators_notify_length_readers() {
        let observed = reactive(&Value::array([1, 2, 3]));
        let lengths = Rc::new(std::cell::RefCell::new(Vec::new()));

        let reader = observed.clone();
        let log = lengths.clone();
        let _effect = Effect::new(move || log.borrow_mut().push(reader.len()));

        observed.call_method("push", &[Value::from(4)]).unwrap();
        observed.call_method("pop", &[]).unwrap();
        observed.call_method("splice", &[Value::from(0), Value::from(1)]).unwrap();
        assert_eq!(lengths.borrow().last(), Some(&2));
        assert_eq!(observed.len(), 2);
    }

    #[test]
    fn nested_pause_restores_outer_state() {
        let observed = reactive(&Value::array([1]));
        let outer = observed.clone();
        let _effect = Effect::new(move || {
            let _ = outer.call_method("push", &[Value::from(1)]);
            assert!(crate::tracking::should_track());
        });
    }
}
