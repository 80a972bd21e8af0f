use std::ffi::c_void;

use tether_array::ComArray;
use tether_common::{HResult, Result};
use tether_guid::Guid;

use crate::{Interface, UnknownVtbl, interface};

/// How far the object's host trusts it.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct TrustLevel(pub i32);

impl TrustLevel {
    pub const BASE: TrustLevel = TrustLevel(0);
    pub const PARTIAL: TrustLevel = TrustLevel(1);
    pub const FULL: TrustLevel = TrustLevel(2);
}

#[repr(C)]
pub struct InspectableVtbl {
    pub base: UnknownVtbl,
    /// Returns the identifiers of every interface the object implements, in a block
    /// from the task allocator that the caller frees.
    pub get_iids:
        unsafe extern "system" fn(this: *mut c_void, count: *mut u32, iids: *mut *mut Guid) -> HResult,
    /// Produces a string handle; string handles are not modelled here, the slot is kept
    /// for layout.
    pub get_runtime_class_name:
        unsafe extern "system" fn(this: *mut c_void, name: *mut *mut c_void) -> HResult,
    pub get_trust_level:
        unsafe extern "system" fn(this: *mut c_void, level: *mut TrustLevel) -> HResult,
}

interface! {
    /// An object that can enumerate the interfaces it implements.
    pub Inspectable: InspectableVtbl = 0xaf86e2e0_b12d_4c6a_9c5a_d7aa65101e90
}

/// Returns the identifiers of the interfaces `object` implements.
///
/// The object allocates the array with the task allocator and transfers it; the
/// returned `ComArray` frees it.
pub fn get_interfaces(object: &Inspectable) -> Result<ComArray<Guid>> {
    let mut value = ComArray::new();
    {
        let out = value.put_abi();
        let hr =
            unsafe { (object.vtable().get_iids)(object.as_raw(), out.len_ptr(), out.data_ptr()) };
        hr.ok("GetIids")?;
    }
    Ok(value)
}

/// Returns the trust level reported by `object`.
pub fn get_trust_level(object: &Inspectable) -> Result<TrustLevel> {
    let mut level = TrustLevel::default();
    let hr = unsafe { (object.vtable().get_trust_level)(object.as_raw(), &mut level) };
    hr.ok("GetTrustLevel")?;
    Ok(level)
}
