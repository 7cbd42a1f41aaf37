// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Outer/inner conversions.
//!
//! A [`Convert`] implementation defines one kind of preference: the outer type
//! consumers work with, the inner type persisted in the store, and the pair of
//! conversions between them.
//!
//! Conversions must be pure, deterministic, and cheap. `to_inner` in
//! particular is also called by the cache when deciding whether a cached
//! outer value is still current, so it must not have side effects.

use alloc::string::String;
use core::fmt;
use core::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::value::InnerValue;

/// Conversion between a preference's outer and inner representations.
///
/// `to_outer(to_inner(x))` should compare equal to `x`.
///
/// Bindings of one key share their cache with every binding using the same
/// `Convert` type, so all instances of a type must convert identically. A
/// converter carrying state that changes the mapping needs its own type.
pub trait Convert: 'static {
    /// The strongly-typed value exposed to consumers.
    type Outer: Clone + 'static;
    /// The serializable value persisted in the store.
    type Inner: InnerValue;

    /// Projects an outer value to its inner representation.
    fn to_inner(&self, outer: &Self::Outer) -> Self::Inner;

    /// Builds an outer value from its inner representation.
    fn to_outer(&self, inner: &Self::Inner) -> Self::Outer;
}

/// Stores the value as-is.
pub struct Identity<T>(PhantomData<fn() -> T>);

impl<T> Default for Identity<T> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<T> fmt::Debug for Identity<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Identity")
            .field(&core::any::type_name::<T>())
            .finish()
    }
}

impl<T: InnerValue> Convert for Identity<T> {
    type Outer = T;
    type Inner = T;

    fn to_inner(&self, outer: &T) -> T {
        outer.clone()
    }

    fn to_outer(&self, inner: &T) -> T {
        inner.clone()
    }
}

/// Stores a `bool` as `0` or `1`; any non-zero value reads back as `true`.
#[derive(Clone, Copy, Debug, Default)]
pub struct BoolAsInt;

impl Convert for BoolAsInt {
    type Outer = bool;
    type Inner = i32;

    fn to_inner(&self, outer: &bool) -> i32 {
        i32::from(*outer)
    }

    fn to_outer(&self, inner: &i32) -> bool {
        *inner != 0
    }
}

/// An enum that can be stored as its integer index.
pub trait IndexedEnum: Clone + Default + 'static {
    /// Returns the stored index of this variant.
    fn to_index(&self) -> i32;

    /// Returns the variant stored at `index`, if any.
    fn from_index(index: i32) -> Option<Self>;
}

/// Stores an [`IndexedEnum`] as its index; unknown indices read back as the
/// enum's default variant.
pub struct EnumAsInt<E>(PhantomData<fn() -> E>);

impl<E> Default for EnumAsInt<E> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<E> fmt::Debug for EnumAsInt<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EnumAsInt")
            .field(&core::any::type_name::<E>())
            .finish()
    }
}

impl<E: IndexedEnum> Convert for EnumAsInt<E> {
    type Outer = E;
    type Inner = i32;

    fn to_inner(&self, outer: &E) -> i32 {
        outer.to_index()
    }

    fn to_outer(&self, inner: &i32) -> E {
        E::from_index(*inner).unwrap_or_else(|| {
            tracing::warn!(
                index = *inner,
                ty = core::any::type_name::<E>(),
                "unknown enum index, using default variant"
            );
            E::default()
        })
    }
}

/// Stores any `serde` type as a JSON string.
///
/// Text that fails to decode reads back as `T::default()`.
pub struct JsonString<T>(PhantomData<fn() -> T>);

impl<T> Default for JsonString<T> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<T> fmt::Debug for JsonString<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("JsonString")
            .field(&core::any::type_name::<T>())
            .finish()
    }
}

impl<T> Convert for JsonString<T>
where
    T: Serialize + DeserializeOwned + Clone + Default + 'static,
{
    type Outer = T;
    type Inner = String;

    fn to_inner(&self, outer: &T) -> String {
        // Plain data types cannot fail to encode; a failing custom
        // `Serialize` impl stores an empty string.
        serde_json::to_string(outer).unwrap_or_else(|err| {
            tracing::warn!(
                error = %err,
                ty = core::any::type_name::<T>(),
                "failed to encode preference as JSON"
            );
            String::new()
        })
    }

    fn to_outer(&self, inner: &String) -> T {
        serde_json::from_str(inner).unwrap_or_else(|err| {
            tracing::warn!(
                error = %err,
                ty = core::any::type_name::<T>(),
                "failed to decode stored JSON preference, using default"
            );
            T::default()
        })
    }
}

/// A two-component vector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector2 {
    /// X component.
    pub x: f32,
    /// Y component.
    pub y: f32,
}

impl Vector2 {
    /// Creates a new vector.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A three-component vector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    /// X component.
    pub x: f32,
    /// Y component.
    pub y: f32,
    /// Z component.
    pub z: f32,
}

impl Vector3 {
    /// Creates a new vector.
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// An RGBA color with components in `0.0..=1.0`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Color {
    /// Red.
    pub r: f32,
    /// Green.
    pub g: f32,
    /// Blue.
    pub b: f32,
    /// Alpha.
    pub a: f32,
}

impl Color {
    /// Opaque white.
    pub const WHITE: Self = Self::rgb(1.0, 1.0, 1.0);
    /// Opaque black.
    pub const BLACK: Self = Self::rgb(0.0, 0.0, 0.0);

    /// Creates a color from all four components.
    #[must_use]
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Creates an opaque color.
    #[must_use]
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self::rgba(r, g, b, 1.0)
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}
