//! A component object implemented in Rust, laid out the way foreign code would lay it
//! out: a heap block whose first field is a vtable pointer.
//!
//! The primary object answers `IUnknown` and `IInspectable` with itself. Every other
//! supported interface is answered with a fresh tear-off: a small object of its own,
//! holding a reference to the primary. Two queries for the same interface therefore
//! return different pointers, which is what makes publication races observable.

use std::ffi::c_void;
use std::ptr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering, fence};

use tether_array::ComArray;
use tether_common::HResult;
use tether_guid::Guid;
use tether_interface::{
    Inspectable, InspectableVtbl, Interface, TrustLevel, Unknown, UnknownVtbl, interface,
};

interface! {
    pub IAlpha: InspectableVtbl = 0x3f1c2a54_7d0e_4b8a_9e61_52c0d8a4f101
}

interface! {
    pub IBeta: InspectableVtbl = 0x3f1c2a54_7d0e_4b8a_9e61_52c0d8a4f102
}

interface! {
    pub IGamma: InspectableVtbl = 0x3f1c2a54_7d0e_4b8a_9e61_52c0d8a4f103
}

interface! {
    /// Never supported by a [`TestObject`] unless asked for explicitly.
    pub IMissing: InspectableVtbl = 0x3f1c2a54_7d0e_4b8a_9e61_52c0d8a4f1ff
}

/// Builds test objects.
///
/// ```ignore
/// let (object, probe) = TestObject::new().supports::<IAlpha>().build();
/// ```
#[derive(Debug, Default)]
pub struct TestObject {
    supported: Vec<Guid>,
    answers: Vec<(Guid, HResult)>,
    trust_level: TrustLevel,
}

impl TestObject {
    pub fn new() -> TestObject {
        TestObject::default()
    }

    /// Adds `I` to the supported interfaces.
    pub fn supports<I: Interface>(self) -> TestObject {
        self.supports_iid(I::IID)
    }

    pub fn supports_iid(mut self, iid: Guid) -> TestObject {
        self.supported.push(iid);
        self
    }

    /// Makes queries for `I` return `hr` without producing a pointer.
    pub fn answer<I: Interface>(mut self, hr: HResult) -> TestObject {
        self.answers.push((I::IID, hr));
        self
    }

    pub fn trust_level(mut self, level: TrustLevel) -> TestObject {
        self.trust_level = level;
        self
    }

    /// Creates the object, returning the only reference to it and a probe into its
    /// bookkeeping.
    pub fn build(self) -> (Inspectable, ObjectProbe) {
        let shared = Arc::new(Shared {
            refs: AtomicU32::new(1),
            ..Shared::default()
        });
        let block = Box::new(ObjectBlock {
            vtable: &OBJECT_VTBL,
            shared: shared.clone(),
            supported: self.supported,
            answers: self.answers,
            trust_level: self.trust_level,
        });
        let raw = Box::into_raw(block) as *mut c_void;
        log::trace!("test object created at {raw:p}");
        let object = unsafe { Inspectable::from_raw(raw) };
        (object, ObjectProbe { shared })
    }
}

/// Read-only view of a test object's bookkeeping. Outlives the object.
#[derive(Clone, Debug)]
pub struct ObjectProbe {
    shared: Arc<Shared>,
}

impl ObjectProbe {
    /// References held on the primary object, including those held by live tear-offs.
    pub fn refs(&self) -> u32 {
        self.shared.refs.load(Ordering::SeqCst)
    }

    /// `QueryInterface` calls answered so far, on the object or any tear-off.
    pub fn queries(&self) -> usize {
        self.shared.queries.load(Ordering::SeqCst)
    }

    pub fn live_tear_offs(&self) -> usize {
        self.shared.live_tear_offs.load(Ordering::SeqCst)
    }

    pub fn is_destroyed(&self) -> bool {
        self.shared.destroyed.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Default)]
struct Shared {
    refs: AtomicU32,
    queries: AtomicUsize,
    live_tear_offs: AtomicUsize,
    destroyed: AtomicBool,
}

#[repr(C)]
struct ObjectBlock {
    vtable: *const InspectableVtbl,
    shared: Arc<Shared>,
    supported: Vec<Guid>,
    answers: Vec<(Guid, HResult)>,
    trust_level: TrustLevel,
}

#[repr(C)]
struct TearOff {
    vtable: *const InspectableVtbl,
    refs: AtomicU32,
    iid: Guid,
    /// The primary object; the tear-off holds one reference on it.
    owner: *mut c_void,
}

static OBJECT_VTBL: InspectableVtbl = InspectableVtbl {
    base: UnknownVtbl {
        query_interface: object_query,
        add_ref: object_add_ref,
        release: object_release,
    },
    get_iids: object_get_iids,
    get_runtime_class_name: not_implemented,
    get_trust_level: object_get_trust_level,
};

static TEAR_OFF_VTBL: InspectableVtbl = InspectableVtbl {
    base: UnknownVtbl {
        query_interface: tear_off_query,
        add_ref: tear_off_add_ref,
        release: tear_off_release,
    },
    get_iids: tear_off_get_iids,
    get_runtime_class_name: not_implemented,
    get_trust_level: tear_off_get_trust_level,
};

unsafe fn block<'a>(this: *mut c_void) -> &'a ObjectBlock {
    unsafe { &*(this as *const ObjectBlock) }
}

unsafe fn tear_off<'a>(this: *mut c_void) -> &'a TearOff {
    unsafe { &*(this as *const TearOff) }
}

unsafe extern "system" fn object_query(
    this: *mut c_void,
    iid: *const Guid,
    out: *mut *mut c_void,
) -> HResult {
    if iid.is_null() || out.is_null() {
        return HResult::E_POINTER;
    }
    let object = unsafe { block(this) };
    let iid = unsafe { *iid };
    unsafe { *out = ptr::null_mut() };
    object.shared.queries.fetch_add(1, Ordering::SeqCst);
    // Widen the window between the query and the caller's publication.
    std::thread::yield_now();

    if iid == Unknown::IID || iid == Inspectable::IID {
        unsafe { object_add_ref(this) };
        unsafe { *out = this };
        return HResult::S_OK;
    }
    if let Some(&(_, hr)) = object.answers.iter().find(|(answered, _)| *answered == iid) {
        return hr;
    }
    if !object.supported.contains(&iid) {
        return HResult::E_NOINTERFACE;
    }

    unsafe { object_add_ref(this) };
    object.shared.live_tear_offs.fetch_add(1, Ordering::SeqCst);
    let tear_off = Box::new(TearOff {
        vtable: &TEAR_OFF_VTBL,
        refs: AtomicU32::new(1),
        iid,
        owner: this,
    });
    unsafe { *out = Box::into_raw(tear_off) as *mut c_void };
    HResult::S_OK
}

unsafe extern "system" fn object_add_ref(this: *mut c_void) -> u32 {
    let object = unsafe { block(this) };
    object.shared.refs.fetch_add(1, Ordering::Relaxed) + 1
}

unsafe extern "system" fn object_release(this: *mut c_void) -> u32 {
    let object = unsafe { block(this) };
    let previous = object.shared.refs.fetch_sub(1, Ordering::Release);
    debug_assert_ne!(previous, 0, "test object released too often");
    if previous == 1 {
        fence(Ordering::Acquire);
        let object = unsafe { Box::from_raw(this as *mut ObjectBlock) };
        object.shared.destroyed.store(true, Ordering::SeqCst);
        log::trace!("test object at {this:p} destroyed");
    }
    previous - 1
}

unsafe extern "system" fn object_get_iids(
    this: *mut c_void,
    count: *mut u32,
    iids: *mut *mut Guid,
) -> HResult {
    if count.is_null() || iids.is_null() {
        return HResult::E_POINTER;
    }
    let object = unsafe { block(this) };
    match ComArray::from_slice(object.supported.as_slice()) {
        Ok(array) => {
            unsafe { array.detach_into(count, iids) };
            HResult::S_OK
        }
        Err(e) => HResult::from(&e),
    }
}

unsafe extern "system" fn object_get_trust_level(
    this: *mut c_void,
    level: *mut TrustLevel,
) -> HResult {
    if level.is_null() {
        return HResult::E_POINTER;
    }
    unsafe { *level = block(this).trust_level };
    HResult::S_OK
}

unsafe extern "system" fn not_implemented(_this: *mut c_void, name: *mut *mut c_void) -> HResult {
    if !name.is_null() {
        unsafe { *name = ptr::null_mut() };
    }
    HResult::E_NOTIMPL
}

unsafe extern "system" fn tear_off_query(
    this: *mut c_void,
    iid: *const Guid,
    out: *mut *mut c_void,
) -> HResult {
    if iid.is_null() || out.is_null() {
        return HResult::E_POINTER;
    }
    let tear = unsafe { tear_off(this) };
    if unsafe { *iid } == tear.iid {
        unsafe { tear_off_add_ref(this) };
        unsafe { *out = this };
        return HResult::S_OK;
    }
    unsafe { object_query(tear.owner, iid, out) }
}

unsafe extern "system" fn tear_off_add_ref(this: *mut c_void) -> u32 {
    unsafe { tear_off(this) }.refs.fetch_add(1, Ordering::Relaxed) + 1
}

unsafe extern "system" fn tear_off_release(this: *mut c_void) -> u32 {
    let previous = unsafe { tear_off(this) }.refs.fetch_sub(1, Ordering::Release);
    debug_assert_ne!(previous, 0, "tear-off released too often");
    if previous == 1 {
        fence(Ordering::Acquire);
        let tear = unsafe { Box::from_raw(this as *mut TearOff) };
        let owner = tear.owner;
        unsafe { block(owner) }
            .shared
            .live_tear_offs
            .fetch_sub(1, Ordering::SeqCst);
        drop(tear);
        unsafe { object_release(owner) };
    }
    previous - 1
}

unsafe extern "system" fn tear_off_get_iids(
    this: *mut c_void,
    count: *mut u32,
    iids: *mut *mut Guid,
) -> HResult {
    unsafe { object_get_iids(tear_off(this).owner, count, iids) }
}

unsafe extern "system" fn tear_off_get_trust_level(
    this: *mut c_void,
    level: *mut TrustLevel,
) -> HResult {
    unsafe { object_get_trust_level(tear_off(this).owner, level) }
}
