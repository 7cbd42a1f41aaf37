// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The preferences context.
//!
//! [`Prefs`] owns a [`ValueStore`] together with the [`CacheRegistry`] of
//! every binding created against it. Cloning a `Prefs` clones the handle, not
//! the store; the store and its caches are dropped with the last handle (and
//! the last binding, which keeps a handle of its own).
//!
//! # Threading
//!
//! `Prefs` is `!Send` and `!Sync`. All bindings of one context are meant to be
//! driven from a single thread, typically the host's main or UI thread.

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::string::String;
use core::cell::{Cell, RefCell};
use core::fmt;

use crate::cache::{CacheRegistry, SharedCache};
use crate::convert::Convert;
use crate::param::PrefsParam;
use crate::store::{MemoryStore, StoreError, ValueStore, ValueStoreExt};
use crate::value::InnerValue;

/// Counters describing how a [`Prefs`] context has been used.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PrefsStats {
    /// Reads that went through to the store.
    pub store_reads: u64,
    /// Writes that went through to the store.
    pub store_writes: u64,
    /// Reads answered from a shared cache.
    pub cache_hits: u64,
    /// Reads that missed the shared cache.
    pub cache_misses: u64,
}

impl PrefsStats {
    /// Returns the fraction of reads answered from a cache (0.0 to 1.0).
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f64 / total as f64
        }
    }
}

struct Shared {
    store: RefCell<Box<dyn ValueStore>>,
    caches: RefCell<CacheRegistry>,
    stats: Cell<PrefsStats>,
}

/// A handle to a value store and the caches of its bindings.
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
///
/// // Another binding of the same key sees the write.
/// let other = PrefsFloat::new(&prefs, "Volume", 1.0);
/// assert_eq!(other.get(), 0.5);
/// ```
#[derive(Clone)]
pub struct Prefs {
    shared: Rc<Shared>,
}

impl Prefs {
    /// Creates a context over `store`.
    #[must_use]
    pub fn new<S: ValueStore + 'static>(store: S) -> Self {
        Self {
            shared: Rc::new(Shared {
                store: RefCell::new(Box::new(store)),
                caches: RefCell::new(CacheRegistry::new()),
                stats: Cell::new(PrefsStats::default()),
            }),
        }
    }

    /// Creates a context over an empty [`MemoryStore`].
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new())
    }

    /// Creates a binding for `key` using the converter's default value.
    #[must_use]
    pub fn param<C: Convert + Default>(
        &self,
        key: impl Into<String>,
        default_value: C::Outer,
    ) -> PrefsParam<C> {
        PrefsParam::new(self, key, default_value)
    }

    /// Returns usage counters.
    #[must_use]
    pub fn stats(&self) -> PrefsStats {
        self.shared.stats.get()
    }

    /// Returns the number of shared caches created so far.
    #[must_use]
    pub fn cache_count(&self) -> usize {
        self.shared.caches.borrow().len()
    }

    /// Returns `true` if the store holds a value for `key`.
    #[must_use]
    pub fn has_key(&self, key: &str) -> bool {
        self.shared.store.borrow().has_key(key)
    }

    /// Runs `f` with read access to the underlying store.
    pub fn with_store<R>(&self, f: impl FnOnce(&dyn ValueStore) -> R) -> R {
        f(&**self.shared.store.borrow())
    }

    /// Flushes the store.
    pub fn save(&self) -> Result<(), StoreError> {
        self.shared.store.borrow_mut().save()
    }

    /// Removes every stored value and empties every shared cache.
    ///
    /// Bindings stay valid and read back their defaults.
    pub fn delete_all(&self) {
        self.shared.store.borrow_mut().delete_all();
        self.shared.caches.borrow().clear_all();
        tracing::debug!("deleted all preferences");
    }

    /// Returns `true` if `self` and `other` share the same store.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.shared, &other.shared)
    }

    pub(crate) fn cache_for<C: Convert>(&self, key: &str) -> SharedCache<C::Outer, C::Inner> {
        self.shared.caches.borrow_mut().cache_for::<C>(key)
    }

    pub(crate) fn clear_other_converters<C: Convert>(&self, key: &str) {
        self.shared.caches.borrow().clear_other_converters::<C>(key);
    }

    pub(crate) fn read<I: InnerValue>(&self, key: &str, default: &I) -> I {
        self.update_stats(|s| s.store_reads += 1);
        tracing::trace!(key, "reading preference from store");
        self.shared.store.borrow().get_or(key, default.clone())
    }

    pub(crate) fn write<I: InnerValue>(&self, key: &str, value: &I) {
        self.update_stats(|s| s.store_writes += 1);
        self.shared.store.borrow_mut().set_value(key, value);
    }

    pub(crate) fn record_cache_lookup(&self, hit: bool) {
        self.update_stats(|s| {
            if hit {
                s.cache_hits += 1;
            } else {
                s.cache_misses += 1;
            }
        });
    }

    fn update_stats(&self, f: impl FnOnce(&mut PrefsStats)) {
        let mut stats = self.shared.stats.get();
        f(&mut stats);
        self.shared.stats.set(stats);
    }
}

impl fmt::Debug for Prefs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Prefs")
            .field("caches", &*self.shared.caches.borrow())
            .field("stats", &self.shared.stats.get())
            .finish_non_exhaustive()
    }
}
