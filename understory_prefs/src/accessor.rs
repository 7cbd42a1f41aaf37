// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Type-erased bindings and inner-value accessors.
//!
//! [`AnyPrefsParam`] lets heterogeneous bindings live in one collection.
//! Consumers that synchronize against an external representation (an editor
//! panel, a network peer) dispatch on [`AnyPrefsParam::inner_type_id`] and
//! work on inner values through an [`InnerAccessor`].
//!
//! The type check happens once, when the accessor is created. After that an
//! accessor talks to the binding through a typed view, without boxing values.

use core::any::{Any, TypeId};
use core::fmt;

use crate::convert::Convert;
use crate::param::PrefsParam;
use crate::value::{ErasedValue, InnerValue};

/// Object-safe view of a [`PrefsParam`].
pub trait AnyPrefsParam {
    /// Returns the key of the binding.
    fn key(&self) -> &str;

    /// Returns the [`TypeId`] of the binding's inner type.
    fn inner_type_id(&self) -> TypeId;

    /// Returns the name of the binding's inner type.
    fn inner_type_name(&self) -> &'static str;

    /// See [`PrefsParam::is_default`].
    fn is_default(&self) -> bool;

    /// See [`PrefsParam::is_already_get`].
    fn is_already_get(&self) -> bool;

    /// See [`PrefsParam::is_synced`].
    fn is_synced(&self) -> bool;

    /// See [`PrefsParam::set_current_to_default`].
    fn set_current_to_default(&mut self);

    /// See [`PrefsParam::revert_to_default`].
    fn revert_to_default(&mut self) -> bool;

    /// See [`PrefsParam::reset`].
    fn reset(&mut self);

    /// Returns the current inner value.
    fn get_inner_erased(&self) -> ErasedValue;

    /// Sets the inner value.
    ///
    /// # Panics
    ///
    /// Panics if `value` is not of the binding's inner type.
    fn set_inner_erased(&mut self, value: ErasedValue) -> bool;

    /// Returns the binding as [`Any`], for downcasting to its concrete type.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Fills `out` with the typed view used by [`InnerAccessor`].
    ///
    /// `out` is left untouched unless it is the view slot for the binding's
    /// inner type.
    fn inner_view(&self, out: &mut dyn Any);
}

impl dyn AnyPrefsParam + '_ {
    /// Returns an accessor working on inner values of type `T`.
    ///
    /// # Panics
    ///
    /// Panics if `T` is not the binding's inner type.
    pub fn inner_accessor<T: InnerValue>(&mut self) -> InnerAccessor<'_, T> {
        let mut view: Option<InnerView<T>> = None;
        self.inner_view(&mut view);
        let Some(view) = view else {
            panic!(
                "preference '{}' stores {}, not {}",
                self.key(),
                self.inner_type_name(),
                core::any::type_name::<T>()
            );
        };
        let Some(param) = view(self.as_any_mut()) else {
            panic!("inner view does not match its binding");
        };
        InnerAccessor { param }
    }
}

/// Typed operations an [`InnerAccessor`] needs from a binding.
trait InnerParam<I> {
    fn key(&self) -> &str;
    fn get_inner(&self) -> I;
    fn set_synced_value(&mut self, value: I) -> bool;
    fn is_synced(&self) -> bool;
    fn is_already_get(&self) -> bool;
}

type InnerView<I> = fn(&mut dyn Any) -> Option<&mut dyn InnerParam<I>>;

fn inner_view<C: Convert>(param: &mut dyn Any) -> Option<&mut dyn InnerParam<C::Inner>> {
    let param: &mut dyn InnerParam<C::Inner> = param.downcast_mut::<PrefsParam<C>>()?;
    Some(param)
}

impl<C: Convert> InnerParam<C::Inner> for PrefsParam<C> {
    fn key(&self) -> &str {
        Self::key(self)
    }

    fn get_inner(&self) -> C::Inner {
        Self::get_inner(self)
    }

    fn set_synced_value(&mut self, value: C::Inner) -> bool {
        Self::set_synced_value(self, value)
    }

    fn is_synced(&self) -> bool {
        Self::is_synced(self)
    }

    fn is_already_get(&self) -> bool {
        Self::is_already_get(self)
    }
}

impl<C: Convert> AnyPrefsParam for PrefsParam<C> {
    fn key(&self) -> &str {
        Self::key(self)
    }

    fn inner_type_id(&self) -> TypeId {
        TypeId::of::<C::Inner>()
    }

    fn inner_type_name(&self) -> &'static str {
        core::any::type_name::<C::Inner>()
    }

    fn is_default(&self) -> bool {
        Self::is_default(self)
    }

    fn is_already_get(&self) -> bool {
        Self::is_already_get(self)
    }

    fn is_synced(&self) -> bool {
        Self::is_synced(self)
    }

    fn set_current_to_default(&mut self) {
        Self::set_current_to_default(self);
    }

    fn revert_to_default(&mut self) -> bool {
        Self::revert_to_default(self)
    }

    fn reset(&mut self) {
        Self::reset(self);
    }

    fn get_inner_erased(&self) -> ErasedValue {
        ErasedValue::new(self.get_inner())
    }

    fn set_inner_erased(&mut self, value: ErasedValue) -> bool {
        let found = value.type_name();
        let Some(value) = value.downcast::<C::Inner>() else {
            panic!(
                "preference '{}' stores {}, not {found}",
                Self::key(self),
                core::any::type_name::<C::Inner>()
            );
        };
        self.set_inner(value)
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn inner_view(&self, out: &mut dyn Any) {
        if let Some(out) = out.downcast_mut::<Option<InnerView<C::Inner>>>() {
            *out = Some(inner_view::<C>);
        }
    }
}

/// A view of a binding that works on inner values directly.
///
/// Obtained from [`PrefsParam::inner_accessor`] or
/// `<dyn AnyPrefsParam>::inner_accessor`.
///
/// # Example
///
/// ```rust
/// use understory_prefs::{Prefs, PrefsBool};
///
/// let prefs = Prefs::in_memory();
/// let mut muted = PrefsBool::new(&prefs, "Muted", false);
///
/// let mut accessor = muted.inner_accessor::<i32>();
/// assert!(!accessor.is_already_get());
/// accessor.set_synced_value(1);
/// assert!(accessor.is_synced());
///
/// // A later local change drifts away from the synced value.
/// muted.set(false);
/// assert!(!muted.is_synced());
/// ```
pub struct InnerAccessor<'a, T> {
    param: &'a mut dyn InnerParam<T>,
}

impl<T: InnerValue> InnerAccessor<'_, T> {
    /// Returns the key of the underlying binding.
    #[must_use]
    pub fn key(&self) -> &str {
        self.param.key()
    }

    /// Returns the current inner value.
    #[must_use]
    pub fn get(&self) -> T {
        self.param.get_inner()
    }

    /// Writes `value`, marks the binding as synced, and remembers `value` as
    /// the synced baseline.
    ///
    /// Returns `true` if the stored value changed.
    pub fn set_synced_value(&mut self, value: T) -> bool {
        self.param.set_synced_value(value)
    }

    /// Returns `true` if the current value still equals the synced baseline.
    #[must_use]
    pub fn is_synced(&self) -> bool {
        self.param.is_synced()
    }

    /// Returns `true` if the binding's cache already holds a value.
    #[must_use]
    pub fn is_already_get(&self) -> bool {
        self.param.is_already_get()
    }
}

impl<T> fmt::Debug for InnerAccessor<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InnerAccessor")
            .field("key", &self.param.key())
            .field("inner_type", &core::any::type_name::<T>())
            .finish_non_exhaustive()
    }
}
