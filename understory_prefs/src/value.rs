// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Inner value contract and type-erased value boxes.
//!
//! [`InnerValue`] is implemented by every type that can be persisted in a
//! [`ValueStore`](crate::ValueStore). [`ErasedValue`] carries an inner value
//! across the type-erased [`AnyPrefsParam`](crate::AnyPrefsParam) boundary.

use alloc::boxed::Box;
use alloc::string::String;
use core::any::{Any, TypeId};
use core::fmt;

use crate::store::StoreValue;

/// How a cached outer value is treated when the inner value changes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ValueSemantics {
    /// The cached outer value is always dropped on change and rebuilt on the
    /// next read.
    ByValue,
    /// The cached outer value is only dropped when its own inner projection
    /// differs from the newly written inner value.
    ///
    /// This keeps the identity of an outer object that a consumer is editing
    /// in place, so an editor holding on to it is not handed a fresh copy
    /// after every keystroke.
    ByReference,
}

/// A value that can be persisted in a [`ValueStore`](crate::ValueStore).
///
/// # Example
///
/// ```rust
/// use understory_prefs::{InnerValue, StoreValue, ValueSemantics};
///
/// assert_eq!(42_i32.to_store_value(), StoreValue::Int(42));
/// assert_eq!(i32::from_store_value(&StoreValue::Float(1.0)), None);
/// assert_eq!(<String as InnerValue>::SEMANTICS, ValueSemantics::ByReference);
/// ```
pub trait InnerValue: Clone + PartialEq + fmt::Debug + 'static {
    /// Cache invalidation policy for outer values derived from this type.
    const SEMANTICS: ValueSemantics;

    /// Converts this value into its store representation.
    fn to_store_value(&self) -> StoreValue;

    /// Reads a value back from its store representation.
    ///
    /// Returns `None` if the stored variant does not hold this type.
    fn from_store_value(value: &StoreValue) -> Option<Self>;

    /// Default change detection for bindings of this type.
    ///
    /// Uses `PartialEq` unless the type overrides it.
    #[inline]
    fn same_value(a: &Self, b: &Self) -> bool {
        a == b
    }
}

impl InnerValue for i32 {
    const SEMANTICS: ValueSemantics = ValueSemantics::ByValue;

    fn to_store_value(&self) -> StoreValue {
        StoreValue::Int(*self)
    }

    fn from_store_value(value: &StoreValue) -> Option<Self> {
        match value {
            StoreValue::Int(v) => Some(*v),
            _ => None,
        }
    }
}

impl InnerValue for f32 {
    const SEMANTICS: ValueSemantics = ValueSemantics::ByValue;

    fn to_store_value(&self) -> StoreValue {
        StoreValue::Float(*self)
    }

    fn from_store_value(value: &StoreValue) -> Option<Self> {
        match value {
            StoreValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// NaN equals NaN, so writing NaN twice is not a change. `0.0` and `-0.0`
    /// stay equal.
    #[inline]
    fn same_value(a: &Self, b: &Self) -> bool {
        a == b || (a.is_nan() && b.is_nan())
    }
}

impl InnerValue for String {
    const SEMANTICS: ValueSemantics = ValueSemantics::ByReference;

    fn to_store_value(&self) -> StoreValue {
        StoreValue::Str(self.clone())
    }

    fn from_store_value(value: &StoreValue) -> Option<Self> {
        match value {
            StoreValue::Str(v) => Some(v.clone()),
            _ => None,
        }
    }
}

/// A type-erased inner value.
///
/// This wraps a value of any `'static + Clone` type, storing it on the heap
/// with its type information for later downcasting.
///
/// # Example
///
/// ```rust
/// use understory_prefs::ErasedValue;
///
/// let value = ErasedValue::new(42_i32);
/// assert!(value.is::<i32>());
/// assert_eq!(value.downcast_ref::<i32>(), Some(&42));
/// assert_eq!(value.clone().downcast::<f32>(), None);
/// assert_eq!(value.downcast::<i32>(), Some(42));
/// ```
pub struct ErasedValue {
    inner: Box<dyn ErasedValueTrait>,
    type_id: TypeId,
    type_name: &'static str,
}

impl ErasedValue {
    /// Creates a new erased value from a concrete value.
    #[must_use]
    pub fn new<T: Clone + 'static>(value: T) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: core::any::type_name::<T>(),
            inner: Box::new(value),
        }
    }

    /// Returns the [`TypeId`] of the contained value.
    #[must_use]
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the type name of the contained value.
    #[must_use]
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns `true` if the contained value is of type `T`.
    #[must_use]
    #[inline]
    pub fn is<T: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    /// Attempts to downcast to a reference of type `T`.
    #[must_use]
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        if self.is::<T>() {
            self.inner.as_any().downcast_ref()
        } else {
            None
        }
    }

    /// Attempts to unwrap the contained value as `T`.
    ///
    /// Returns `None` (dropping the value) if it is not of type `T`.
    #[must_use]
    pub fn downcast<T: 'static>(self) -> Option<T> {
        if !self.is::<T>() {
            return None;
        }
        self.inner.into_any().downcast::<T>().ok().map(|v| *v)
    }
}

impl Clone for ErasedValue {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone_boxed(),
            type_id: self.type_id,
            type_name: self.type_name,
        }
    }
}

impl fmt::Debug for ErasedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErasedValue")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

trait ErasedValueTrait: Any {
    fn as_any(&self) -> &dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
    fn clone_boxed(&self) -> Box<dyn ErasedValueTrait>;
}

impl<T: Clone + 'static> ErasedValueTrait for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }

    fn clone_boxed(&self) -> Box<dyn ErasedValueTrait> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::format;

    #[test]
    fn inner_value_store_variants() {
        assert_eq!(i32::from_store_value(&StoreValue::Int(7)), Some(7));
        assert_eq!(f32::from_store_value(&StoreValue::Float(0.5)), Some(0.5));
        assert_eq!(
            String::from_store_value(&StoreValue::Str(String::from("a"))),
            Some(String::from("a"))
        );

        // Mismatched variants are rejected rather than coerced.
        assert_eq!(i32::from_store_value(&StoreValue::Float(7.0)), None);
        assert_eq!(f32::from_store_value(&StoreValue::Int(7)), None);
        assert_eq!(String::from_store_value(&StoreValue::Int(7)), None);
    }

    #[test]
    fn inner_value_semantics() {
        assert_eq!(<i32 as InnerValue>::SEMANTICS, ValueSemantics::ByValue);
        assert_eq!(<f32 as InnerValue>::SEMANTICS, ValueSemantics::ByValue);
        assert_eq!(
            <String as InnerValue>::SEMANTICS,
            ValueSemantics::ByReference
        );
    }

    #[test]
    fn float_nan_is_same_value() {
        assert!(f32::same_value(&f32::NAN, &f32::NAN));
        assert!(f32::same_value(&0.0, &-0.0));
        assert!(!f32::same_value(&f32::NAN, &0.0));
        assert!(i32::same_value(&3, &3));
    }

    #[test]
    fn erased_value_downcast() {
        let value = ErasedValue::new(String::from("hello"));
        assert!(value.is::<String>());
        assert!(!value.is::<i32>());
        assert_eq!(value.downcast_ref::<i32>(), None);
        assert_eq!(value.downcast::<String>().as_deref(), Some("hello"));
    }

    #[test]
    fn erased_value_clone_is_independent() {
        let value = ErasedValue::new(42_i32);
        let cloned = value.clone();
        assert_eq!(cloned.downcast::<i32>(), Some(42));
        assert_eq!(value.downcast_ref::<i32>(), Some(&42));
    }

    #[test]
    fn erased_value_debug_names_type() {
        let value = ErasedValue::new(1.5_f32);
        assert_eq!(value.type_id(), TypeId::of::<f32>());
        let debug = format!("{value:?}");
        assert!(debug.contains("ErasedValue"));
        assert!(debug.contains("f32"));
    }
}
