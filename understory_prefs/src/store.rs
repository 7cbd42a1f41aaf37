// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Key-value store contract.
//!
//! [`ValueStore`] is the persistence boundary of this crate. Bindings only
//! need value-semantics round-tripping from it: a `get` after a `set` with the
//! same key returns an equal value. The storage format is entirely the
//! backend's concern.
//!
//! [`MemoryStore`] is an ordered in-memory implementation, useful for tests
//! and as a snapshot format a host can serialize with `serde`.

use alloc::collections::BTreeMap;
use alloc::string::String;

use serde::{Deserialize, Serialize};

use crate::value::InnerValue;

/// A serialized value as held by a [`ValueStore`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum StoreValue {
    /// A 32-bit integer.
    Int(i32),
    /// A 32-bit float.
    Float(f32),
    /// A string, also used for structured values encoded as JSON.
    Str(String),
}

impl StoreValue {
    /// Returns a short name for the stored variant, for diagnostics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
        }
    }
}

/// Errors reported by a [`ValueStore`] backend.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    /// The backend failed to flush or access its storage.
    #[error("store backend error: {0}")]
    Backend(String),

    /// The backend failed to encode or decode its contents.
    #[error("store serialization error: {0}")]
    Serialization(String),
}

/// An abstract mapping from string keys to [`StoreValue`]s.
pub trait ValueStore {
    /// Returns the value stored under `key`, if any.
    fn get(&self, key: &str) -> Option<StoreValue>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&mut self, key: &str, value: StoreValue);

    /// Returns `true` if a value is stored under `key`.
    fn has_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Removes the value stored under `key`.
    fn delete_key(&mut self, key: &str);

    /// Removes every stored value.
    fn delete_all(&mut self);

    /// Flushes pending writes to durable storage.
    fn save(&mut self) -> Result<(), StoreError>;
}

/// Typed helpers over any [`ValueStore`].
pub trait ValueStoreExt: ValueStore {
    /// Reads `key` as `T`, returning `default` if the key is missing or holds
    /// a different variant.
    fn get_or<T: InnerValue>(&self, key: &str, default: T) -> T {
        let Some(stored) = self.get(key) else {
            return default;
        };
        match T::from_store_value(&stored) {
            Some(value) => value,
            None => {
                tracing::warn!(
                    key,
                    stored = stored.kind(),
                    expected = core::any::type_name::<T>(),
                    "stored preference has an unexpected type, using default"
                );
                default
            }
        }
    }

    /// Stores `value` under `key`.
    fn set_value<T: InnerValue>(&mut self, key: &str, value: &T) {
        self.set(key, value.to_store_value());
    }
}

impl<S: ValueStore + ?Sized> ValueStoreExt for S {}

/// An ordered in-memory [`ValueStore`].
///
/// # Example
///
/// ```rust
/// use understory_prefs::{MemoryStore, ValueStore, ValueStoreExt};
///
/// let mut store = MemoryStore::new();
/// assert_eq!(store.get_or("Volume", 1.0_f32), 1.0);
///
/// store.set_value("Volume", &0.5_f32);
/// assert_eq!(store.get_or("Volume", 1.0_f32), 0.5);
///
/// // A different variant falls back to the default.
/// assert_eq!(store.get_or("Volume", 3_i32), 3);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryStore {
    entries: BTreeMap<String, StoreValue>,
    #[serde(skip)]
    save_count: u64,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns how many times [`ValueStore::save`] has been called.
    #[must_use]
    pub fn save_count(&self) -> u64 {
        self.save_count
    }

    /// Iterates stored entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &StoreValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl ValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<StoreValue> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: StoreValue) {
        self.entries.insert(String::from(key), value);
    }

    fn has_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    fn delete_key(&mut self, key: &str) {
        self.entries.remove(key);
    }

    fn delete_all(&mut self) {
        self.entries.clear();
    }

    fn save(&mut self) -> Result<(), StoreError> {
        self.save_count += 1;
        Ok(())
    }
}
