use std::ffi::c_void;
use std::fmt;
use std::marker::PhantomData;
use std::mem::ManuallyDrop;
use std::ops::Deref;
use std::ptr::{self, NonNull};

use tether_common::{Error, HResult, Result};
use tether_guid::Guid;

/// The three slots every interface vtable starts with.
#[repr(C)]
pub struct UnknownVtbl {
    pub query_interface: unsafe extern "system" fn(
        this: *mut c_void,
        iid: *const Guid,
        object: *mut *mut c_void,
    ) -> HResult,
    pub add_ref: unsafe extern "system" fn(this: *mut c_void) -> u32,
    pub release: unsafe extern "system" fn(this: *mut c_void) -> u32,
}

/// Increments the reference count of a raw interface pointer.
///
/// # Safety
///
/// `raw` must be a live interface pointer.
#[inline]
pub unsafe fn add_ref(raw: NonNull<c_void>) -> u32 {
    unsafe { (vtable_of(raw).add_ref)(raw.as_ptr()) }
}

/// Releases one reference held on a raw interface pointer, returning the new count.
///
/// # Safety
///
/// `raw` must be a live interface pointer and the caller must own the reference being
/// released.
#[inline]
pub unsafe fn release(raw: NonNull<c_void>) -> u32 {
    unsafe { (vtable_of(raw).release)(raw.as_ptr()) }
}

#[inline]
unsafe fn vtable_of<'a>(raw: NonNull<c_void>) -> &'a UnknownVtbl {
    unsafe { &**(raw.as_ptr() as *const *const UnknownVtbl) }
}

/// An owned reference to an object's `IUnknown`-compatible interface.
///
/// Cloning calls `AddRef`, dropping calls `Release`. Equality compares interface
/// pointers, so two handles obtained from the same query on the same object are equal.
///
/// Objects handled through this type are assumed to be free-threaded: references may be
/// added and released from any thread.
#[repr(transparent)]
pub struct Unknown(NonNull<c_void>);

unsafe impl Send for Unknown {}
unsafe impl Sync for Unknown {}

impl Unknown {
    /// Queries the object for the interface identified by `iid`.
    ///
    /// On success the caller owns the returned reference.
    ///
    /// # Errors
    ///
    /// `InterfaceNotSupported` when the object answers `E_NOINTERFACE` (or succeeds
    /// without producing a pointer); `Abi` for any other failure.
    pub fn query_raw(&self, iid: &Guid) -> Result<NonNull<c_void>> {
        let mut object = ptr::null_mut();
        let hr = unsafe { (self.vtable().query_interface)(self.0.as_ptr(), iid, &mut object) };
        match NonNull::new(object) {
            Some(object) if hr.is_ok() => Ok(object),
            Some(object) => {
                // The callee broke the contract by returning both a failure and a pointer.
                unsafe { release(object) };
                Err(Error::abi("QueryInterface", hr))
            }
            None if hr == HResult::E_NOINTERFACE || hr.is_ok() => {
                log::trace!("interface {iid} not supported");
                Err(Error::not_supported(*iid))
            }
            None => Err(Error::abi("QueryInterface", hr)),
        }
    }

    #[inline]
    fn vtable(&self) -> &UnknownVtbl {
        unsafe { vtable_of(self.0) }
    }
}

impl Clone for Unknown {
    fn clone(&self) -> Self {
        unsafe { add_ref(self.0) };
        Unknown(self.0)
    }
}

impl Drop for Unknown {
    fn drop(&mut self) {
        unsafe { release(self.0) };
    }
}

impl PartialEq for Unknown {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Unknown {}

impl fmt::Debug for Unknown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Unknown").field(&self.0).finish()
    }
}

/// A typed, owned interface pointer.
///
/// # Safety
///
/// Implementors must be `#[repr(transparent)]` wrappers around [`Unknown`] (or `Unknown`
/// itself), `IID` must identify the interface, and `Vtable` must be a `#[repr(C)]`
/// struct whose first field is an [`UnknownVtbl`]. The [`interface!`](crate::interface)
/// macro produces conforming types.
pub unsafe trait Interface: Sized + Clone {
    type Vtable;

    const IID: Guid;

    /// Returns the raw interface pointer without touching the reference count.
    #[inline]
    fn as_raw(&self) -> *mut c_void {
        unsafe { std::mem::transmute_copy::<Self, *mut c_void>(self) }
    }

    /// Wraps a raw interface pointer, taking ownership of one reference.
    ///
    /// # Safety
    ///
    /// `raw` must be a non-null pointer to this interface, and the caller must own the
    /// reference being transferred.
    #[inline]
    unsafe fn from_raw(raw: *mut c_void) -> Self {
        debug_assert!(!raw.is_null());
        unsafe { std::mem::transmute_copy::<*mut c_void, Self>(&raw) }
    }

    /// Gives up ownership of the reference, returning the raw pointer.
    #[inline]
    fn into_raw(self) -> *mut c_void {
        let raw = self.as_raw();
        std::mem::forget(self);
        raw
    }

    /// Returns the interface's vtable.
    #[inline]
    fn vtable(&self) -> &Self::Vtable {
        unsafe { &**(self.as_raw() as *const *const Self::Vtable) }
    }

    /// Views this interface as its `IUnknown` base.
    #[inline]
    fn as_unknown(&self) -> &Unknown {
        unsafe { &*(self as *const Self as *const Unknown) }
    }

    /// Queries the same object for another interface.
    fn cast<T: Interface>(&self) -> Result<T> {
        let raw = self.as_unknown().query_raw(&T::IID)?;
        Ok(unsafe { T::from_raw(raw.as_ptr()) })
    }
}

unsafe impl Interface for Unknown {
    type Vtable = UnknownVtbl;

    const IID: Guid = Guid::from_u128(0x00000000_0000_0000_c000_000000000046);
}

/// Declares a typed interface handle.
///
/// ```ignore
/// tether_interface::interface! {
///     /// The `IStringable` interface.
///     pub IStringable: IStringableVtbl = 0x96369f54_8eb6_48f0_abce_c1b211e627c3
/// }
/// ```
#[macro_export]
macro_rules! interface {
    ($(#[$attr:meta])* $vis:vis $name:ident : $vtbl:ty = $iid:literal) => {
        $(#[$attr])*
        #[repr(transparent)]
        #[derive(Clone, PartialEq, Eq, Debug)]
        $vis struct $name($crate::Unknown);

        unsafe impl $crate::Interface for $name {
            type Vtable = $vtbl;

            const IID: $crate::Guid = $crate::Guid::from_u128($iid);
        }

        impl ::std::convert::From<$name> for $crate::Unknown {
            fn from(value: $name) -> Self {
                value.0
            }
        }
    };
}

/// A borrowed interface pointer whose reference belongs to someone else.
///
/// Derefs to the interface type, so methods can be called as on an owned handle; use
/// [`InterfaceRef::to_owned`] to take a reference of one's own.
pub struct InterfaceRef<'a, I: Interface> {
    inner: ManuallyDrop<I>,
    _marker: PhantomData<&'a I>,
}

impl<'a, I: Interface> InterfaceRef<'a, I> {
    /// Borrows a raw interface pointer for `'a`.
    ///
    /// # Safety
    ///
    /// `raw` must point to interface `I` and stay alive (someone must hold a reference)
    /// for all of `'a`.
    #[inline]
    pub unsafe fn from_raw(raw: NonNull<c_void>) -> InterfaceRef<'a, I> {
        InterfaceRef {
            inner: ManuallyDrop::new(unsafe { I::from_raw(raw.as_ptr()) }),
            _marker: PhantomData,
        }
    }

    /// Takes a new reference on the interface.
    pub fn to_owned(&self) -> I {
        I::clone(&self.inner)
    }
}

impl<I: Interface> Deref for InterfaceRef<'_, I> {
    type Target = I;

    #[inline]
    fn deref(&self) -> &I {
        &self.inner
    }
}

impl<I: Interface> Clone for InterfaceRef<'_, I> {
    fn clone(&self) -> Self {
        InterfaceRef {
            inner: ManuallyDrop::new(unsafe { I::from_raw(self.inner.as_raw()) }),
            _marker: PhantomData,
        }
    }
}

impl<I: Interface + fmt::Debug> fmt::Debug for InterfaceRef<'_, I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("InterfaceRef").field(&*self.inner).finish()
    }
}
