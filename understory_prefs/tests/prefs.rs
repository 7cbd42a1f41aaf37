// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tests for the `understory_prefs` crate.
//!
//! These exercise bindings end to end against a `Prefs` context: change
//! detection, cache sharing between bindings, identity of cached outer
//! values, defaults, and store round-tripping.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use proptest::prelude::*;
use serde::{Deserialize, Serialize};
use understory_prefs::{
    Convert, JsonString, MemoryStore, Prefs, PrefsFloat, PrefsInt, PrefsParam, PrefsString,
    StoreError, StoreValue, ValueStore, ValueStoreExt, Vector3,
};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
struct Profile {
    name: String,
    level: i32,
}

/// A profile shared by reference and stored as JSON text.
#[derive(Default)]
struct SharedProfile;

impl Convert for SharedProfile {
    type Outer = Rc<RefCell<Profile>>;
    type Inner = String;

    fn to_inner(&self, outer: &Self::Outer) -> String {
        serde_json::to_string(&*outer.borrow()).unwrap()
    }

    fn to_outer(&self, inner: &String) -> Self::Outer {
        Rc::new(RefCell::new(serde_json::from_str(inner).unwrap_or_default()))
    }
}

/// A counter shared by reference but stored as a plain integer.
#[derive(Default)]
struct SharedCounter;

impl Convert for SharedCounter {
    type Outer = Rc<Cell<i32>>;
    type Inner = i32;

    fn to_inner(&self, outer: &Self::Outer) -> i32 {
        outer.get()
    }

    fn to_outer(&self, inner: &i32) -> Self::Outer {
        Rc::new(Cell::new(*inner))
    }
}

/// A volume shown as a percentage and stored as a fraction.
#[derive(Default)]
struct Percent;

impl Convert for Percent {
    type Outer = f32;
    type Inner = f32;

    fn to_inner(&self, outer: &f32) -> f32 {
        outer / 100.0
    }

    fn to_outer(&self, inner: &f32) -> f32 {
        inner * 100.0
    }
}

fn profile(name: &str, level: i32) -> Rc<RefCell<Profile>> {
    Rc::new(RefCell::new(Profile {
        name: name.to_string(),
        level,
    }))
}

#[test]
fn volume_scenario() {
    let prefs = Prefs::in_memory();
    let mut volume = PrefsFloat::new(&prefs, "Volume", 1.0);

    assert!(volume.set(0.5));
    assert_eq!(volume.get(), 0.5);
    assert!(!volume.is_default());

    volume.set_current_to_default();
    assert!(!volume.set(0.5));
    assert!(volume.is_default());
}

#[test]
fn repeated_set_writes_and_notifies_once() {
    let prefs = Prefs::in_memory();
    let mut name = PrefsString::new(&prefs, "Name", String::new());
    let notified = Rc::new(Cell::new(0));
    let counter = notified.clone();
    name.register_value_changed_callback(move |_, _| counter.set(counter.get() + 1));

    assert!(name.set("ada".to_string()));
    assert!(!name.set("ada".to_string()));

    assert_eq!(prefs.stats().store_writes, 1);
    assert_eq!(notified.get(), 1);
}

#[test]
fn get_after_set_does_not_read_store() {
    let prefs = Prefs::in_memory();
    let mut volume = PrefsFloat::new(&prefs, "Volume", 1.0);
    volume.set(0.25);

    let reads = prefs.stats().store_reads;
    assert_eq!(volume.get(), 0.25);
    assert_eq!(volume.get_inner(), 0.25);
    assert_eq!(prefs.stats().store_reads, reads);
}

#[test]
fn bindings_of_one_key_share_writes() {
    let prefs = Prefs::in_memory();
    let mut a = PrefsInt::new(&prefs, "Level", 0);
    let b = PrefsInt::new(&prefs, "Level", 0);
    assert_eq!(b.get(), 0);

    a.set(7);
    let reads = prefs.stats().store_reads;
    assert_eq!(b.get(), 7);
    assert_eq!(prefs.stats().store_reads, reads);
    assert_eq!(prefs.cache_count(), 1);
}

#[test]
fn callback_may_write_through_another_binding_of_the_same_key() {
    let prefs = Prefs::in_memory();
    let mirror = Rc::new(RefCell::new(PrefsInt::new(&prefs, "Level", 0)));
    let mut primary = PrefsInt::new(&prefs, "Level", 0);

    let target = mirror.clone();
    primary.register_value_changed_callback(move |_, new| {
        // Already current through the shared cache, so this is a no-op.
        assert!(!target.borrow_mut().set(*new));
    });

    assert!(primary.set(3));
    assert_eq!(mirror.borrow().get(), 3);
    assert_eq!(prefs.stats().store_writes, 1);
}

#[test]
fn converters_over_the_same_types_keep_their_own_outer() {
    let prefs = Prefs::in_memory();
    let mut raw = PrefsFloat::new(&prefs, "Volume", 1.0);
    let mut percent = PrefsParam::<Percent>::new(&prefs, "Volume", 100.0);

    assert!(raw.set(0.5));
    assert_eq!(raw.get(), 0.5);
    assert_eq!(percent.get(), 50.0);

    // Each write is seen by the other converter on its next read.
    assert!(percent.set(25.0));
    assert_eq!(raw.get(), 0.25);
    assert_eq!(percent.get(), 25.0);
    assert_eq!(prefs.cache_count(), 2);
}

#[test]
fn in_place_edit_keeps_outer_identity() {
    let prefs = Prefs::in_memory();
    let mut param = PrefsParam::<SharedProfile>::new(&prefs, "Profile", profile("", 0));

    let live = param.get();
    live.borrow_mut().name = "ada".to_string();
    assert!(param.set(live.clone()));

    assert!(Rc::ptr_eq(&live, &param.get()));
    assert_eq!(param.get().borrow().name, "ada");
}

#[test]
fn unrelated_write_replaces_outer() {
    let prefs = Prefs::in_memory();
    let mut param = PrefsParam::<SharedProfile>::new(&prefs, "Profile", profile("", 0));

    let live = param.get();
    let replacement = profile("bob", 2);
    assert!(param.set(replacement.clone()));

    let after = param.get();
    assert!(!Rc::ptr_eq(&after, &live));
    assert!(!Rc::ptr_eq(&after, &replacement));
    assert_eq!(*after.borrow(), *replacement.borrow());
}

#[test]
fn value_inner_always_replaces_outer() {
    let prefs = Prefs::in_memory();
    let mut param = PrefsParam::<SharedCounter>::new(&prefs, "Counter", Rc::new(Cell::new(0)));

    let live = param.get();
    live.set(5);
    assert!(param.set(live.clone()));

    let after = param.get();
    assert!(!Rc::ptr_eq(&after, &live));
    assert_eq!(after.get(), 5);
}

#[test]
fn default_does_not_alias_live_value() {
    let prefs = Prefs::in_memory();
    let mut param = PrefsParam::<SharedProfile>::new(&prefs, "Profile", profile("", 0));
    param.set(profile("ada", 3));
    param.set_current_to_default();

    let live = param.get();
    live.borrow_mut().level = 99;

    assert!(!Rc::ptr_eq(&live, param.default_value()));
    assert_eq!(param.default_value().borrow().level, 3);
    assert!(param.is_default());
}

#[test]
fn reset_picks_up_an_edited_default() {
    let prefs = Prefs::in_memory();
    let mut param = PrefsParam::<SharedProfile>::new(&prefs, "Profile", profile("", 0));
    param.set(profile("ada", 3));
    assert!(!param.is_default());

    {
        let mut default = param.default_value().borrow_mut();
        default.name = "ada".to_string();
        default.level = 3;
    }
    // The stored form of the default is memoized until reset.
    assert!(!param.is_default());

    param.reset();
    assert!(param.is_default());
}

#[test]
fn stored_values_are_loaded() {
    let mut store = MemoryStore::new();
    store.set_value("Volume", &0.75_f32);
    store.set_value("Name", &"ada".to_string());
    // Wrong variant for an f32 binding.
    store.set("Scale", StoreValue::Str("big".to_string()));

    let json = serde_json::to_string(&store).unwrap();
    let restored: MemoryStore = serde_json::from_str(&json).unwrap();
    assert_eq!(restored.len(), 3);

    let prefs = Prefs::new(restored);
    assert_eq!(PrefsFloat::new(&prefs, "Volume", 1.0).get(), 0.75);
    assert_eq!(PrefsString::new(&prefs, "Name", String::new()).get(), "ada");
    assert_eq!(PrefsFloat::new(&prefs, "Scale", 1.0).get(), 1.0);
}

#[test]
fn json_binding_survives_delete_all() {
    let prefs = Prefs::in_memory();
    let mut spawn = PrefsParam::<JsonString<Vector3>>::new(&prefs, "Spawn", Vector3::default());
    spawn.set(Vector3::new(1.0, 2.0, 3.0));

    prefs.delete_all();
    assert_eq!(spawn.get(), Vector3::default());
    assert!(spawn.set(Vector3::new(0.0, 0.0, 1.0)));
}

struct ReadOnlyStore(MemoryStore);

impl ValueStore for ReadOnlyStore {
    fn get(&self, key: &str) -> Option<StoreValue> {
        self.0.get(key)
    }

    fn set(&mut self, key: &str, value: StoreValue) {
        self.0.set(key, value);
    }

    fn delete_key(&mut self, key: &str) {
        self.0.delete_key(key);
    }

    fn delete_all(&mut self) {
        self.0.delete_all();
    }

    fn save(&mut self) -> Result<(), StoreError> {
        Err(StoreError::Backend("read-only".to_string()))
    }
}

#[test]
fn save_errors_propagate() {
    let prefs = Prefs::new(ReadOnlyStore(MemoryStore::new()));
    let mut count = PrefsInt::new(&prefs, "Count", 0);
    count.set(1);

    assert!(prefs.has_key("Count"));
    assert_eq!(
        prefs.save(),
        Err(StoreError::Backend("read-only".to_string()))
    );
}

fn vector_strategy() -> impl Strategy<Value = Vector3> {
    // Eighths are exact in binary, so JSON text round-trips them exactly.
    let component = (-8000_i32..8000).prop_map(|i| i as f32 / 8.0);
    (component.clone(), component.clone(), component)
        .prop_map(|(x, y, z)| Vector3::new(x, y, z))
}

proptest! {
    /// Property: converting to the stored form and back yields an equal value.
    #[test]
    fn prop_vector_round_trip(v in vector_strategy()) {
        let convert = JsonString::<Vector3>::default();
        prop_assert_eq!(convert.to_outer(&convert.to_inner(&v)), v);
    }

    /// Property: the store is written exactly once per actual change.
    #[test]
    fn prop_writes_only_on_change(values in prop::collection::vec(-3_i32..3, 0..40)) {
        let prefs = Prefs::in_memory();
        let mut param = PrefsInt::new(&prefs, "N", 0);
        let mut last = 0;
        let mut changes = 0_u64;

        for v in values {
            let changed = param.set(v);
            prop_assert_eq!(changed, v != last);
            if changed {
                changes += 1;
            }
            last = v;
        }
        prop_assert_eq!(prefs.stats().store_writes, changes);
        prop_assert_eq!(param.get(), last);
    }

    /// Property: a second binding of the key always reads the latest write.
    #[test]
    fn prop_shared_key_reads_latest(values in prop::collection::vec(any::<i32>(), 1..20)) {
        let prefs = Prefs::in_memory();
        let mut writer = PrefsInt::new(&prefs, "Shared", 0);
        let reader = PrefsInt::new(&prefs, "Shared", 0);

        for v in values {
            writer.set(v);
            prop_assert_eq!(reader.get(), v);
        }
    }
}
