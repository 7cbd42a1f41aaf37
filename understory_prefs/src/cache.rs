// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shared outer/inner value caches.
//!
//! Every binding of a given key and [`Convert`] type shares one
//! [`OuterInnerCache`], so a write through one binding is observed by all of
//! them without re-reading the store. Caches are owned by a [`CacheRegistry`],
//! which in turn is owned by a [`Prefs`](crate::Prefs) context.

use alloc::rc::Rc;
use alloc::string::String;
use core::any::{Any, TypeId};
use core::cell::RefCell;
use core::fmt;

use hashbrown::HashMap;
use smallvec::SmallVec;

use crate::convert::Convert;

/// The last-known outer and inner representations of one preference.
#[derive(Clone, Debug, PartialEq)]
pub struct OuterInnerCache<O, I> {
    outer: Option<O>,
    inner: Option<I>,
}

impl<O, I> OuterInnerCache<O, I> {
    /// Creates an empty cache.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            outer: None,
            inner: None,
        }
    }

    /// Returns the cached outer value.
    #[must_use]
    #[inline]
    pub fn outer(&self) -> Option<&O> {
        self.outer.as_ref()
    }

    /// Returns the cached inner value.
    #[must_use]
    #[inline]
    pub fn inner(&self) -> Option<&I> {
        self.inner.as_ref()
    }

    /// Returns `true` if either representation is cached.
    #[must_use]
    #[inline]
    pub fn is_populated(&self) -> bool {
        self.outer.is_some() || self.inner.is_some()
    }

    /// Replaces the cached outer value.
    #[inline]
    pub fn set_outer(&mut self, outer: O) {
        self.outer = Some(outer);
    }

    /// Replaces the cached inner value.
    #[inline]
    pub fn set_inner(&mut self, inner: I) {
        self.inner = Some(inner);
    }

    /// Drops the cached outer value.
    #[inline]
    pub fn clear_outer(&mut self) {
        self.outer = None;
    }

    /// Drops both cached values.
    #[inline]
    pub fn clear(&mut self) {
        self.outer = None;
        self.inner = None;
    }
}

impl<O, I> Default for OuterInnerCache<O, I> {
    fn default() -> Self {
        Self::new()
    }
}

/// A shared handle to an [`OuterInnerCache`].
pub type SharedCache<O, I> = Rc<RefCell<OuterInnerCache<O, I>>>;

struct CacheSlot {
    converter: TypeId,
    cache: Rc<dyn Any>,
    clear: fn(&dyn Any),
}

fn clear_slot<O: 'static, I: 'static>(cache: &dyn Any) {
    if let Some(cache) = cache.downcast_ref::<RefCell<OuterInnerCache<O, I>>>() {
        cache.borrow_mut().clear();
    }
}

/// Owner of the per-key caches.
///
/// There is one cache per key and [`Convert`] type. Caches are created lazily
/// on first lookup and are never removed: a binding that moves to another key
/// leaves its old cache in place for any other binding still using it.
///
/// # Example
///
/// ```rust
/// use understory_prefs::{CacheRegistry, Identity};
///
/// let mut registry = CacheRegistry::new();
/// let a = registry.cache_for::<Identity<f32>>("Volume");
/// let b = registry.cache_for::<Identity<f32>>("Volume");
///
/// a.borrow_mut().set_inner(0.5);
/// assert_eq!(b.borrow().inner(), Some(&0.5));
/// assert_eq!(registry.len(), 1);
/// ```
#[derive(Default)]
pub struct CacheRegistry {
    slots: HashMap<String, SmallVec<[CacheSlot; 1]>>,
}

impl CacheRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of caches created so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.values().map(SmallVec::len).sum()
    }

    /// Returns `true` if no cache has been created.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Returns the cache of `key` for the converter `C`, creating it if needed.
    ///
    /// Bindings with different converters get different caches even when
    /// their outer and inner types agree, so a cached outer value is always
    /// one its own converter produced.
    pub fn cache_for<C: Convert>(&mut self, key: &str) -> SharedCache<C::Outer, C::Inner> {
        let converter = TypeId::of::<C>();
        let slots = self.slots.entry_ref(key).or_default();
        if let Some(slot) = slots.iter().find(|slot| slot.converter == converter)
            && let Ok(cache) =
                Rc::clone(&slot.cache).downcast::<RefCell<OuterInnerCache<C::Outer, C::Inner>>>()
        {
            return cache;
        }

        let cache: SharedCache<C::Outer, C::Inner> = Rc::new(RefCell::new(OuterInnerCache::new()));
        slots.push(CacheSlot {
            converter,
            cache: cache.clone(),
            clear: clear_slot::<C::Outer, C::Inner>,
        });
        cache
    }

    /// Empties the caches of `key` that belong to converters other than `C`.
    ///
    /// Called after `C` wrote a new value, so bindings with other converters
    /// re-read the store instead of returning what they cached before.
    pub fn clear_other_converters<C: Convert>(&self, key: &str) {
        let converter = TypeId::of::<C>();
        let Some(slots) = self.slots.get(key) else {
            return;
        };
        for slot in slots.iter().filter(|slot| slot.converter != converter) {
            (slot.clear)(&*slot.cache);
        }
    }

    /// Empties every cache without removing it.
    ///
    /// Bindings keep their handles and re-read the store on next access.
    pub fn clear_all(&self) {
        for slot in self.slots.values().flatten() {
            (slot.clear)(&*slot.cache);
        }
    }
}

impl fmt::Debug for CacheRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheRegistry")
            .field("keys", &self.slots.len())
            .field("count", &self.len())
            .finish_non_exhaustive()
    }
}
