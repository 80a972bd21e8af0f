use std::ffi::c_void;
use std::fmt;
use std::marker::PhantomData;
use std::ptr::{self, NonNull};
use std::sync::atomic::{AtomicPtr, Ordering};

use tether_common::Result;
use tether_interface::{Interface, InterfaceRef, release};

use crate::set::{InterfaceSet, Slot};

/// Caches the interfaces of one object, one atomic slot per interface in `S`.
///
/// Slot 0 holds the root interface from construction on. Every other slot starts empty
/// and is published at most once: the first successful query wins, and the slot keeps
/// that pointer until the cache is dropped. Lookups are lock-free and may race; a thread
/// that loses a race releases its own reference and uses the winner's.
///
/// Queries that fail are not remembered, so asking again for an unsupported interface
/// queries the object again.
pub struct InterfaceCache<S: InterfaceSet> {
    slots: S::Slots,
    _marker: PhantomData<S>,
}

impl<S: InterfaceSet> InterfaceCache<S> {
    /// Creates a cache for `root`, taking a new reference on it.
    pub fn new(root: &S::Root) -> InterfaceCache<S> {
        InterfaceCache::from_owned(root.clone())
    }

    /// Creates a cache that takes over the caller's reference to `root`.
    pub fn from_owned(root: S::Root) -> InterfaceCache<S> {
        let raw = root.into_raw();
        unsafe { InterfaceCache::from_raw(NonNull::new_unchecked(raw)) }
    }

    /// Creates a cache from a raw root interface pointer, taking over one reference.
    ///
    /// # Safety
    ///
    /// `root` must point to `S::Root` and the caller must own the reference transferred.
    pub unsafe fn from_raw(root: NonNull<c_void>) -> InterfaceCache<S> {
        let cache = InterfaceCache {
            slots: S::Slots::default(),
            _marker: PhantomData,
        };
        AsRef::<[AtomicPtr<c_void>]>::as_ref(&cache.slots)[0].store(root.as_ptr(), Ordering::Release);
        cache
    }

    /// Returns the root interface.
    pub fn root(&self) -> InterfaceRef<'_, S::Root> {
        let raw = self.slots.as_ref()[0].load(Ordering::Acquire);
        debug_assert!(!raw.is_null());
        unsafe { InterfaceRef::from_raw(NonNull::new_unchecked(raw)) }
    }

    /// Returns interface `C`, querying the root for it on first use.
    ///
    /// The returned reference is owned by the cache and lives as long as the borrow of
    /// `self`.
    ///
    /// # Errors
    ///
    /// Whatever the query reports: `InterfaceNotSupported` if the object does not
    /// implement `C`. Failures leave the slot empty.
    #[inline]
    pub fn get<C, I>(&self) -> Result<InterfaceRef<'_, C>>
    where
        C: Interface,
        S: Slot<C, I>,
    {
        let slot = &self.slots.as_ref()[<S as Slot<C, I>>::INDEX];
        match NonNull::new(slot.load(Ordering::Acquire)) {
            Some(existing) => Ok(unsafe { InterfaceRef::from_raw(existing) }),
            None => self.load_interface::<C>(slot),
        }
    }

    /// Returns `true` if interface `C` has already been published.
    pub fn is_cached<C, I>(&self) -> bool
    where
        C: Interface,
        S: Slot<C, I>,
    {
        !self.slots.as_ref()[<S as Slot<C, I>>::INDEX]
            .load(Ordering::Acquire)
            .is_null()
    }

    /// Queries the root for any interface, declared in `S` or not, without caching the
    /// result. The caller owns the returned reference.
    pub fn query<C: Interface>(&self) -> Result<C> {
        self.root().cast::<C>()
    }

    /// Resolves interface `C` through [`get`](Self::get) and passes it to `f`.
    pub fn call<C, I, F, R>(&self, f: F) -> Result<R>
    where
        C: Interface,
        S: Slot<C, I>,
        F: FnOnce(&C) -> R,
    {
        let iface = self.get::<C, I>()?;
        Ok(f(&iface))
    }

    #[cold]
    fn load_interface<C: Interface>(&self, slot: &AtomicPtr<c_void>) -> Result<InterfaceRef<'_, C>> {
        let candidate = self.root().as_unknown().query_raw(&C::IID)?;
        match slot.compare_exchange(
            ptr::null_mut(),
            candidate.as_ptr(),
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => Ok(unsafe { InterfaceRef::from_raw(candidate) }),
            Err(winner) => {
                log::trace!("interface {} already published, releasing duplicate", C::IID);
                unsafe { release(candidate) };
                // Published slots never revert to null.
                Ok(unsafe { InterfaceRef::from_raw(NonNull::new_unchecked(winner)) })
            }
        }
    }
}

impl<S: InterfaceSet> Drop for InterfaceCache<S> {
    fn drop(&mut self) {
        for slot in self.slots.as_ref() {
            if let Some(raw) = NonNull::new(slot.swap(ptr::null_mut(), Ordering::Acquire)) {
                unsafe { release(raw) };
            }
        }
    }
}

impl<S: InterfaceSet> fmt::Debug for InterfaceCache<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(
                self.slots
                    .as_ref()
                    .iter()
                    .map(|slot| slot.load(Ordering::Relaxed)),
            )
            .finish()
    }
}
