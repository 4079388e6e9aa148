//! Property-based invariant tests for batching and effect registration.
//!
//! 1. Any burst of scalar writes before a tick yields exactly one dispatch
//!    observing the last value.
//! 2. Any burst of facade writes yields one dispatch observing final storage.
//! 3. Registering any sequence of effects, in any grouping, stores each
//!    effect once and first-calls it at most once.
//! 4. Dispatch order is stable list, then groups by creation, for any
//!    registration sequence.
//! 5. Coalescer slots never hold more than one queued callback each.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use frameref_core::effect::{Effect, EffectOptions, EffectRegistry};
use frameref_core::facade::{Facade, Interception};
use frameref_core::frame::{FrameCoalescer, ManualFrames};
use frameref_core::reference::{ProxyRef, Reactive, ScalarRef};
use proptest::prelude::*;
use serde_json::{Map, Value, json};

// ── Helpers ─────────────────────────────────────────────────────────────

/// One registration call: which effects (by index) and which group.
#[derive(Clone, Debug)]
struct Registration {
    effects: Vec<usize>,
    group: Option<u8>,
}

fn registration_strategy(pool: usize) -> impl Strategy<Value = Registration> {
    (
        proptest::collection::vec(0..pool, 1..4),
        proptest::option::of(0u8..3),
    )
        .prop_map(|(effects, group)| Registration { effects, group })
}

fn options_for(group: Option<u8>) -> EffectOptions {
    match group {
        Some(g) => EffectOptions::named(format!("group-{g}")),
        None => EffectOptions::new(),
    }
}

fn interception_strategy() -> impl Strategy<Value = Interception> {
    prop_oneof![
        Just(Interception::Shallow),
        Just(Interception::DeepAll),
        Just(Interception::DeepInner),
    ]
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Scalar batching collapse
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn scalar_burst_dispatches_last_value(writes in proptest::collection::vec(any::<i64>(), 1..64)) {
        let frames = Rc::new(ManualFrames::new());
        let r = ScalarRef::new(0i64, frames.clone());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        r.effect(
            Effect::new(move |v: &i64| sink.borrow_mut().push(*v)),
            EffectOptions::new().first_call(false),
        );

        for w in &writes {
            r.set(*w);
        }
        prop_assert_eq!(frames.pending(), 1);
        frames.run_until_idle(4);
        prop_assert_eq!(seen.borrow().clone(), vec![*writes.last().unwrap()]);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. Facade batching collapse
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn facade_burst_dispatches_final_storage(
        writes in proptest::collection::vec(("[a-d]", any::<i32>()), 1..32),
        interception in interception_strategy(),
    ) {
        let frames = Rc::new(ManualFrames::new());
        let proxy = ProxyRef::new(json!({}), interception, frames.clone()).unwrap();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        proxy.effect(
            Effect::new(move |v: &Facade| sink.borrow_mut().push(v.snapshot())),
            EffectOptions::new().first_call(false),
        );

        let mut expected = Map::new();
        let root = proxy.value();
        for (key, value) in &writes {
            root.set(key.as_str(), *value).unwrap();
            expected.insert(key.clone(), json!(value));
        }
        frames.run_until_idle(4);
        prop_assert_eq!(seen.borrow().clone(), vec![Value::Object(expected)]);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Dedup idempotence and 4. dispatch order
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn registration_stores_each_effect_once(
        registrations in proptest::collection::vec(registration_strategy(6), 1..12),
    ) {
        let frames = Rc::new(ManualFrames::new());
        let r = ScalarRef::new((), frames.clone());
        let calls = Rc::new(RefCell::new(Vec::new()));
        let pool: Vec<Effect<()>> = (0..6)
            .map(|i| {
                let calls = Rc::clone(&calls);
                Effect::new(move |_: &()| calls.borrow_mut().push(i))
            })
            .collect();

        // Model: first bucket each effect landed in, and bucket creation order.
        let mut placed: Vec<(usize, Option<u8>)> = Vec::new();
        let mut groups: Vec<u8> = Vec::new();
        for reg in &registrations {
            let effects: Vec<Effect<()>> = reg.effects.iter().map(|&i| pool[i].clone()).collect();
            r.effect(effects, options_for(reg.group));
            let mut added_any = false;
            for &i in &reg.effects {
                if !placed.iter().any(|(p, _)| *p == i) {
                    placed.push((i, reg.group));
                    added_any = true;
                }
            }
            if let (true, Some(g)) = (added_any, reg.group) {
                if !groups.contains(&g) {
                    groups.push(g);
                }
            }
        }

        // First calls: each placed effect exactly once, in placement order.
        let first_calls = calls.borrow().clone();
        let placement: Vec<usize> = placed.iter().map(|(i, _)| *i).collect();
        prop_assert_eq!(&first_calls, &placement);
        let unique: HashSet<usize> = first_calls.iter().copied().collect();
        prop_assert_eq!(unique.len(), first_calls.len());

        let expected_names: Vec<String> = groups.iter().map(|g| format!("group-{g}")).collect();
        prop_assert_eq!(r.effect_names(), expected_names);

        // Dispatch: stable bucket, then groups in creation order.
        calls.borrow_mut().clear();
        r.call_effects();
        let mut expected_order: Vec<usize> = placed
            .iter()
            .filter(|(_, g)| g.is_none())
            .map(|(i, _)| *i)
            .collect();
        for g in &groups {
            expected_order.extend(placed.iter().filter(|(_, pg)| *pg == Some(*g)).map(|(i, _)| *i));
        }
        prop_assert_eq!(calls.borrow().clone(), expected_order);
    }

    #[test]
    fn registering_twice_is_idempotent(ids in proptest::collection::vec(0usize..4, 1..8), named in any::<bool>()) {
        let registry = EffectRegistry::<u8>::new();
        let pool: Vec<Effect<u8>> = (0..4).map(|_| Effect::new(|_: &u8| {})).collect();
        let effects: Vec<Effect<u8>> = ids.iter().map(|&i| pool[i].clone()).collect();
        let name = named.then_some("g");

        let first = registry.register(effects.clone(), name);
        let len = registry.len();
        prop_assert!(registry.register(effects.clone(), name).is_empty());
        prop_assert!(registry.register(effects.clone(), None).is_empty());
        prop_assert_eq!(registry.len(), len);
        prop_assert_eq!(first.len(), ids.iter().collect::<HashSet<_>>().len());
        prop_assert!(registry.is_registered(effects));
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5. One queued callback per coalescer slot
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn coalescer_slots_hold_at_most_one_callback(
        schedules in proptest::collection::vec(0usize..3, 0..40),
    ) {
        let frames = Rc::new(ManualFrames::new());
        let slots: Vec<FrameCoalescer> = (0..3).map(|_| FrameCoalescer::new(frames.clone())).collect();
        let mut touched = HashSet::new();
        for &s in &schedules {
            slots[s].schedule(|| {});
            touched.insert(s);
            prop_assert!(frames.pending() <= slots.len());
        }
        prop_assert_eq!(frames.pending(), touched.len());
        prop_assert_eq!(frames.tick(), touched.len());
        prop_assert!(slots.iter().all(|slot| !slot.is_pending()));
    }
}
