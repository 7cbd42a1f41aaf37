// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Prefs: typed preference bindings over a key-value store.
//!
//! This crate binds typed *preference* values to a persistent key-value
//! store, memoizing both the typed value and its stored form so repeated
//! reads never touch the store, and skipping writes that would not change
//! anything.
//!
//! ## Core Concepts
//!
//! - **Outer value**: the strongly-typed value consumers work with
//!   (a `bool`, an enum, a [`Vector3`]).
//! - **Inner value**: the serializable form persisted in the store
//!   (an `i32`, an `f32`, a `String`). See [`InnerValue`].
//! - [`Convert`]: the pair of pure conversions between the two.
//! - [`ValueStore`]: the persistence backend. [`MemoryStore`] is provided.
//! - [`Prefs`]: owns a store and the per-key caches of every binding made
//!   against it.
//! - [`PrefsParam`]: one binding, with a key, a default, change callbacks,
//!   and "synced" tracking through an [`InnerAccessor`].
//!
//! ## Quick Start
//!
//! ```rust
//! use understory_prefs::{Prefs, PrefsBool, PrefsFloat, PrefsVector3, Vector3};
//!
//! let prefs = Prefs::in_memory();
//!
//! let mut volume = PrefsFloat::new(&prefs, "Volume", 1.0);
//! let mut muted = PrefsBool::new(&prefs, "Muted", false);
//! let mut spawn = PrefsVector3::new(&prefs, "Spawn", Vector3::default());
//!
//! assert!(volume.set(0.5));
//! assert!(!volume.set(0.5)); // unchanged, nothing written
//! assert!(muted.set(true));
//! spawn.set(Vector3::new(0.0, 1.0, 0.0));
//!
//! assert_eq!(volume.get(), 0.5);
//! assert!(!volume.is_default());
//!
//! // "Revert to default" for a single binding.
//! volume.revert_to_default();
//! assert!(volume.is_default());
//!
//! // Or wipe everything.
//! prefs.delete_all();
//! assert!(!muted.get());
//! ```
//!
//! ## Sharing
//!
//! Bindings of the same key and [`Convert`] type share one [`OuterInnerCache`].
//! A write through one binding is visible to the others immediately, without
//! a store read. Bindings of the key with another converter re-read the store
//! after the write. Value-changed callbacks belong to the binding they were registered
//! on and only run for writes made through it.
//!
//! ## Threading
//!
//! Everything here is single-threaded: [`Prefs`] and [`PrefsParam`] are
//! `!Send`. Callbacks run synchronously before `set` returns. A callback
//! cannot write back into the binding that is running it, but may write
//! through any other binding, including one of the same key; unchanged writes
//! are no-ops, which ends any ping-pong between bindings.
//!
//! ## `no_std` Support
//!
//! This crate is `no_std` and uses `alloc`. It does not depend on `std`.

#![no_std]

extern crate alloc;

mod accessor;
mod cache;
mod convert;
mod param;
mod prefs;
mod store;
mod value;

pub use accessor::{AnyPrefsParam, InnerAccessor};
pub use cache::{CacheRegistry, OuterInnerCache, SharedCache};
pub use convert::{
    BoolAsInt, Color, Convert, EnumAsInt, Identity, IndexedEnum, JsonString, Vector2, Vector3,
};
pub use param::{
    InnerEquality, PrefsBool, PrefsColor, PrefsEnum, PrefsFloat, PrefsInt, PrefsJson, PrefsParam,
    PrefsParamBuilder, PrefsString, PrefsVector2, PrefsVector3, ValueChangedCallback,
};
pub use prefs::{Prefs, PrefsStats};
pub use store::{MemoryStore, StoreError, StoreValue, ValueStore, ValueStoreExt};
pub use value::{ErasedValue, InnerValue, ValueSemantics};
