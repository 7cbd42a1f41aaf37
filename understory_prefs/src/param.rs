// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Typed preference bindings.
//!
//! A [`PrefsParam`] binds one key of a [`Prefs`] store to a typed value. Reads
//! go through the key's shared [`OuterInnerCache`](crate::OuterInnerCache) and
//! fall back to the store, then to the default. Writes are skipped entirely
//! when the inner value does not change.
//!
//! # Cache updates on write
//!
//! When a write changes the inner value, the shared cache takes the new inner
//! value and the cached outer value is handled according to the inner type's
//! [`ValueSemantics`]:
//!
//! | Semantics | Cached outer value |
//! |-----------|--------------------|
//! | `ByValue` | always dropped |
//! | `ByReference` | kept if its own inner projection equals the new value |
//!
//! Caches of the same key held by bindings with a different converter are
//! emptied, so they re-read the store on their next access.

use alloc::boxed::Box;
use alloc::string::String;
use core::cell::OnceCell;
use core::fmt;

use smallvec::SmallVec;

use crate::accessor::{AnyPrefsParam, InnerAccessor};
use crate::cache::SharedCache;
use crate::convert::{BoolAsInt, Color, Convert, EnumAsInt, Identity, JsonString, Vector2, Vector3};
use crate::prefs::Prefs;
use crate::value::{InnerValue, ValueSemantics};

/// Equality used to decide whether a write changes the stored value.
///
/// Defaults to [`InnerValue::same_value`], which treats NaN floats as equal.
pub type InnerEquality<I> = fn(&I, &I) -> bool;

/// Callback invoked after a write changed the value.
///
/// The callback receives the old and the new inner value.
pub type ValueChangedCallback<I> = Box<dyn FnMut(&I, &I)>;

/// Most bindings have at most a couple of listeners.
const INLINE_CALLBACKS: usize = 2;

/// An `i32` preference.
pub type PrefsInt = PrefsParam<Identity<i32>>;
/// An `f32` preference.
pub type PrefsFloat = PrefsParam<Identity<f32>>;
/// A `String` preference.
pub type PrefsString = PrefsParam<Identity<String>>;
/// A `bool` preference, stored as an integer.
pub type PrefsBool = PrefsParam<BoolAsInt>;
/// An enum preference, stored as its index.
pub type PrefsEnum<E> = PrefsParam<EnumAsInt<E>>;
/// A preference of any `serde` type, stored as JSON.
pub type PrefsJson<T> = PrefsParam<JsonString<T>>;
/// A [`Vector2`] preference.
pub type PrefsVector2 = PrefsJson<Vector2>;
/// A [`Vector3`] preference.
pub type PrefsVector3 = PrefsJson<Vector3>;
/// A [`Color`] preference.
pub type PrefsColor = PrefsJson<Color>;

#[derive(Clone, Debug)]
struct SyncState<I> {
    baseline: I,
    synced: bool,
}

/// A typed binding of one preference key.
///
/// # Example
///
/// ```rust
/// use understory_prefs::{Prefs, PrefsFloat};
///
/// let prefs = Prefs::in_memory();
/// let mut volume = PrefsFloat::new(&prefs, "Volume", 1.0);
///
/// assert!(volume.set(0.5));
/// assert_eq!(volume.get(), 0.5);
/// assert!(!volume.is_default());
///
/// volume.set_current_to_default();
/// assert!(!volume.set(0.5));
/// assert!(volume.is_default());
/// ```
pub struct PrefsParam<C: Convert> {
    key: String,
    default_value: C::Outer,
    default_inner: OnceCell<C::Inner>,
    convert: C,
    equality: InnerEquality<C::Inner>,
    prefs: Prefs,
    cache: SharedCache<C::Outer, C::Inner>,
    callbacks: SmallVec<[ValueChangedCallback<C::Inner>; INLINE_CALLBACKS]>,
    sync: Option<SyncState<C::Inner>>,
}

impl<C: Convert + Default> PrefsParam<C> {
    /// Creates a binding of `key` in `prefs`.
    #[must_use]
    pub fn new(prefs: &Prefs, key: impl Into<String>, default_value: C::Outer) -> Self {
        PrefsParamBuilder::new(key, default_value).build(prefs)
    }

    /// Starts building a binding of `key`.
    #[must_use]
    pub fn builder(key: impl Into<String>, default_value: C::Outer) -> PrefsParamBuilder<C> {
        PrefsParamBuilder::new(key, default_value)
    }
}

impl<C: Convert> PrefsParam<C> {
    /// Creates a binding of `key` in `prefs` with an explicit converter.
    #[must_use]
    pub fn with_converter(
        prefs: &Prefs,
        key: impl Into<String>,
        default_value: C::Outer,
        convert: C,
    ) -> Self {
        PrefsParamBuilder::with_converter(key, default_value, convert).build(prefs)
    }

    /// Returns the key this binding reads and writes.
    #[must_use]
    #[inline]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Rebinds to another key.
    ///
    /// The shared cache of the new key is attached; the old key's cache is
    /// left as is for any other binding still using it.
    pub fn set_key(&mut self, key: impl Into<String>) {
        let key = key.into();
        if key == self.key {
            return;
        }
        tracing::debug!(from = %self.key, to = %key, "rebinding preference");
        self.cache = self.prefs.cache_for::<C>(&key);
        self.key = key;
    }

    /// Returns the default value.
    #[must_use]
    #[inline]
    pub fn default_value(&self) -> &C::Outer {
        &self.default_value
    }

    /// Replaces the default value.
    pub fn set_default_value(&mut self, default_value: C::Outer) {
        self.default_value = default_value;
        self.default_inner = OnceCell::new();
    }

    /// Returns the converter.
    #[must_use]
    #[inline]
    pub fn converter(&self) -> &C {
        &self.convert
    }

    /// Returns the [`Prefs`] context this binding belongs to.
    #[must_use]
    #[inline]
    pub fn prefs(&self) -> &Prefs {
        &self.prefs
    }

    /// Returns the current value.
    ///
    /// Missing or mistyped store entries read as the default.
    #[must_use]
    pub fn get(&self) -> C::Outer {
        if let Some(outer) = self.cache.borrow().outer() {
            self.prefs.record_cache_lookup(true);
            return outer.clone();
        }
        let inner = self.get_inner();
        let outer = self.convert.to_outer(&inner);
        self.cache.borrow_mut().set_outer(outer.clone());
        outer
    }

    /// Returns the current inner value.
    #[must_use]
    pub fn get_inner(&self) -> C::Inner {
        if let Some(inner) = self.cache.borrow().inner() {
            self.prefs.record_cache_lookup(true);
            return inner.clone();
        }
        self.prefs.record_cache_lookup(false);
        let inner = self.prefs.read(&self.key, self.default_inner());
        self.cache.borrow_mut().set_inner(inner.clone());
        inner
    }

    /// Sets the value.
    ///
    /// Returns `true` if the stored value changed.
    pub fn set(&mut self, value: C::Outer) -> bool {
        let inner = self.convert.to_inner(&value);
        self.set_inner(inner)
    }

    /// Sets the inner value.
    ///
    /// If `value` equals the current inner value this does nothing and returns
    /// `false`. Otherwise the value is written to the store, the shared cache
    /// is updated, and the value-changed callbacks run before this returns.
    pub fn set_inner(&mut self, value: C::Inner) -> bool {
        let equality = self.equality;
        let current = self.get_inner();
        if equality(&current, &value) {
            return false;
        }

        self.prefs.write(&self.key, &value);
        {
            let mut cache = self.cache.borrow_mut();
            let keep_outer = match <C::Inner as InnerValue>::SEMANTICS {
                ValueSemantics::ByValue => false,
                ValueSemantics::ByReference => cache
                    .outer()
                    .is_some_and(|outer| equality(&self.convert.to_inner(outer), &value)),
            };
            if !keep_outer {
                cache.clear_outer();
            }
            cache.set_inner(value.clone());
        }
        self.prefs.clear_other_converters::<C>(&self.key);
        tracing::debug!(key = %self.key, "preference changed");

        if let Some(sync) = &mut self.sync {
            sync.synced = equality(&sync.baseline, &value);
        }
        for callback in &mut self.callbacks {
            callback(&current, &value);
        }
        true
    }

    /// Returns `true` if the current value equals the default.
    #[must_use]
    pub fn is_default(&self) -> bool {
        (self.equality)(&self.get_inner(), self.default_inner())
    }

    /// Makes the current value the new default.
    ///
    /// The default is rebuilt from the current inner value, so it never
    /// aliases the value handed out by [`get`](Self::get).
    pub fn set_current_to_default(&mut self) {
        let inner = self.get_inner();
        self.default_value = self.convert.to_outer(&inner);
        self.default_inner = OnceCell::from(inner);
    }

    /// Sets the value back to the default.
    ///
    /// Returns `true` if the stored value changed.
    pub fn revert_to_default(&mut self) -> bool {
        let default = self.default_inner().clone();
        self.set_inner(default)
    }

    /// Forgets the memoized default projection and detaches the synced state.
    pub fn reset(&mut self) {
        self.default_inner = OnceCell::new();
        self.sync = None;
        tracing::debug!(key = %self.key, "preference reset");
    }

    /// Registers a callback run after every write that changes the value.
    ///
    /// Callbacks run in registration order.
    pub fn register_value_changed_callback<F>(&mut self, callback: F)
    where
        F: FnMut(&C::Inner, &C::Inner) + 'static,
    {
        self.callbacks.push(Box::new(callback));
    }

    /// Returns `true` if the value has been read or written since the cache
    /// was created.
    #[must_use]
    pub fn is_already_get(&self) -> bool {
        self.cache.borrow().is_populated()
    }

    /// Returns `true` if the store holds a value for this key.
    #[must_use]
    pub fn has_stored_value(&self) -> bool {
        self.prefs.has_key(&self.key)
    }

    /// Returns `true` if the value still equals the last synced value.
    ///
    /// Always `false` until a value is written through
    /// [`InnerAccessor::set_synced_value`].
    #[must_use]
    pub fn is_synced(&self) -> bool {
        self.sync.as_ref().is_some_and(|sync| sync.synced)
    }

    /// Returns an accessor working on inner values of type `T`.
    ///
    /// # Panics
    ///
    /// Panics if `T` is not this binding's inner type.
    pub fn inner_accessor<T: InnerValue>(&mut self) -> InnerAccessor<'_, T> {
        let param: &mut dyn AnyPrefsParam = self;
        param.inner_accessor()
    }

    pub(crate) fn set_synced_value(&mut self, value: C::Inner) -> bool {
        let changed = self.set_inner(value.clone());
        self.sync = Some(SyncState {
            baseline: value,
            synced: true,
        });
        changed
    }

    fn default_inner(&self) -> &C::Inner {
        self.default_inner
            .get_or_init(|| self.convert.to_inner(&self.default_value))
    }
}

impl<C: Convert> fmt::Debug for PrefsParam<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrefsParam")
            .field("key", &self.key)
            .field("inner_type", &core::any::type_name::<C::Inner>())
            .field("default_inner", &self.default_inner.get())
            .field("callbacks", &self.callbacks.len())
            .field("synced", &self.is_synced())
            .finish_non_exhaustive()
    }
}

/// Builder for [`PrefsParam`].
///
/// # Example
///
/// ```rust
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use understory_prefs::{Prefs, PrefsFloat};
///
/// let prefs = Prefs::in_memory();
/// let changes = Rc::new(Cell::new(0));
/// let counter = changes.clone();
///
/// let mut gain = PrefsFloat::builder("Gain", 1.0)
///     .equality(|a, b| (a - b).abs() < 0.01)
///     .on_value_changed(move |_, _| counter.set(counter.get() + 1))
///     .build(&prefs);
///
/// assert!(!gain.set(1.001));
/// assert!(gain.set(2.0));
/// assert_eq!(changes.get(), 1);
/// ```
pub struct PrefsParamBuilder<C: Convert> {
    key: String,
    default_value: C::Outer,
    convert: C,
    equality: InnerEquality<C::Inner>,
    callbacks: SmallVec<[ValueChangedCallback<C::Inner>; INLINE_CALLBACKS]>,
}

impl<C: Convert + Default> PrefsParamBuilder<C> {
    /// Creates a builder using the converter's default value.
    #[must_use]
    pub fn new(key: impl Into<String>, default_value: C::Outer) -> Self {
        Self::with_converter(key, default_value, C::default())
    }
}

impl<C: Convert> PrefsParamBuilder<C> {
    /// Creates a builder with an explicit converter.
    #[must_use]
    pub fn with_converter(key: impl Into<String>, default_value: C::Outer, convert: C) -> Self {
        Self {
            key: key.into(),
            default_value,
            convert,
            equality: <C::Inner as InnerValue>::same_value,
            callbacks: SmallVec::new(),
        }
    }

    /// Replaces the converter.
    #[must_use]
    pub fn converter(mut self, convert: C) -> Self {
        self.convert = convert;
        self
    }

    /// Sets the equality used to detect changes.
    ///
    /// Defaults to [`InnerValue::same_value`].
    #[must_use]
    pub fn equality(mut self, equality: InnerEquality<C::Inner>) -> Self {
        self.equality = equality;
        self
    }

    /// Registers a value-changed callback.
    #[must_use]
    pub fn on_value_changed<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&C::Inner, &C::Inner) + 'static,
    {
        self.callbacks.push(Box::new(callback));
        self
    }

    /// Builds the binding, attaching it to the shared cache of its key.
    #[must_use]
    pub fn build(self, prefs: &Prefs) -> PrefsParam<C> {
        PrefsParam {
            cache: prefs.cache_for::<C>(&self.key),
            key: self.key,
            default_value: self.default_value,
            default_inner: OnceCell::new(),
            convert: self.convert,
            equality: self.equality,
            prefs: prefs.clone(),
            callbacks: self.callbacks,
            sync: None,
        }
    }
}

impl<C: Convert> fmt::Debug for PrefsParamBuilder<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrefsParamBuilder")
            .field("key", &self.key)
            .field("inner_type", &core::any::type_name::<C::Inner>())
            .field("callbacks", &self.callbacks.len())
            .finish_non_exhaustive()
    }
}
