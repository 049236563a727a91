//! Property tests: wrapper identity and notification invariants hold for
//! arbitrary data and write sequences.

use std::cell::Cell;
use std::rc::Rc;

use lattice_reactive::{
    mark_raw, reactive, readonly, shallow_reactive, shallow_readonly, to_raw, wrap, Effect, Value,
    Variant,
};
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Helpers / Strategies
// ---------------------------------------------------------------------------

/// Generate a wrapper variant.
fn arb_variant() -> impl Strategy<Value = Variant> {
    prop_oneof![
        Just(Variant::Reactive),
        Just(Variant::ShallowReactive),
        Just(Variant::Readonly),
        Just(Variant::ShallowReadonly),
    ]
}

/// Generate a chain of wrap requests.
fn arb_chain() -> impl Strategy<Value = Vec<Variant>> {
    prop::collection::vec(arb_variant(), 1..6)
}

/// Generate a raw record with small integer fields.
fn arb_record() -> impl Strategy<Value = Vec<(String, i32)>> {
    prop::collection::vec(("[a-e]", -3i32..3), 0..6)
}

/// Generate a sequence of `(key, value)` writes.
fn arb_writes() -> impl Strategy<Value = Vec<(String, i32)>> {
    prop::collection::vec(("[a-e]", -3i32..3), 1..20)
}

fn build(fields: &[(String, i32)]) -> Value {
    Value::record(fields.iter().map(|(key, value)| (key.as_str(), *value)))
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn wrap_is_idempotent(fields in arb_record(), variant in arb_variant()) {
        let raw = build(&fields);
        let once = wrap(&raw, variant);
        prop_assert!(wrap(&once, variant).ptr_eq(&once));
        prop_assert!(wrap(&raw, variant).ptr_eq(&once));
    }

    #[test]
    fn raw_is_stable_for_any_chain(fields in arb_record(), chain in arb_chain()) {
        let raw = build(&fields);
        let mut current = raw.clone();
        for variant in chain {
            current = wrap(&current, variant);
        }

        let unwrapped = to_raw(&current);
        prop_assert!(unwrapped.ptr_eq(&raw));
        prop_assert!(to_raw(&unwrapped).ptr_eq(&unwrapped));
    }

    #[test]
    fn skipped_values_are_never_wrapped(fields in arb_record(), chain in arb_chain()) {
        let raw = mark_raw(&build(&fields));
        for variant in chain {
            prop_assert!(wrap(&raw, variant).ptr_eq(&raw));
        }
    }

    #[test]
    fn readonly_variants_never_mutate(fields in arb_record(), writes in arb_writes()) {
        let raw = build(&fields);
        let before = raw.to_json().unwrap();

        for locked in [readonly(&raw), shallow_readonly(&raw)] {
            for (key, value) in &writes {
                prop_assert!(locked.set(key.as_str(), *value));
                prop_assert!(locked.delete(key.as_str()));
            }
        }

        prop_assert_eq!(raw.to_json().unwrap(), before);
    }

    #[test]
    fn effects_rerun_exactly_on_change(fields in arb_record(), writes in arb_writes()) {
        let raw = build(&fields);
        let observed = reactive(&raw);
        let runs = Rc::new(Cell::new(0usize));

        let reader = observed.clone();
        let counter = runs.clone();
        let _effect = Effect::new(move || {
            for key in ["a", "b", "c", "d", "e"] {
                reader.get(key);
            }
            counter.set(counter.get() + 1);
        });

        let mut expected = 1;
        for (key, value) in &writes {
            let current = raw.get(key.as_str());
            if !current.same_value(&Value::from(*value)) {
                expected += 1;
            }
            observed.set(key.as_str(), *value);
        }

        prop_assert_eq!(runs.get(), expected);
    }

    #[test]
    fn mutable_writes_match_raw_writes(fields in arb_record(), writes in arb_writes()) {
        let raw = build(&fields);
        let mirror = build(&fields);
        let observed = shallow_reactive(&raw);

        for (key, value) in &writes {
            observed.set(key.as_str(), *value);
            mirror.set(key.as_str(), *value);
        }

        prop_assert_eq!(raw.to_json().unwrap(), mirror.to_json().unwrap());
    }
}
