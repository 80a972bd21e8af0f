use std::ptr::NonNull;

use tether_interface::{
    ErrorKind, HResult, Inspectable, Interface, InterfaceRef, TrustLevel, Unknown,
    get_interfaces, get_trust_level,
};
use tether_testkit::{IAlpha, IBeta, IGamma, IMissing, TestObject};

#[test]
fn test_cast_to_supported_interface() {
    let (object, probe) = TestObject::new().supports::<IAlpha>().build();
    let alpha = object.cast::<IAlpha>().unwrap();
    assert_eq!(probe.live_tear_offs(), 1);
    assert_eq!(probe.refs(), 2);

    let inspectable = alpha.cast::<Inspectable>().unwrap();
    assert_eq!(inspectable, object);
    drop((alpha, inspectable));
    assert_eq!(probe.refs(), 1);
    assert_eq!(probe.live_tear_offs(), 0);
}

#[test]
fn test_cast_to_unsupported_interface() {
    let (object, probe) = TestObject::new().supports::<IAlpha>().build();
    for _ in 0..3 {
        let err = object.cast::<IMissing>().unwrap_err();
        assert!(err.is_not_supported());
        match err.kind() {
            ErrorKind::InterfaceNotSupported { iid } => assert_eq!(*iid, IMissing::IID),
            other => panic!("unexpected error {other:?}"),
        }
    }
    assert_eq!(probe.queries(), 3);
    assert_eq!(probe.refs(), 1);
}

#[test]
fn test_success_without_pointer_is_not_supported() {
    let (object, _probe) = TestObject::new().answer::<IBeta>(HResult::S_OK).build();
    assert!(object.cast::<IBeta>().unwrap_err().is_not_supported());
}

#[test]
fn test_other_failures_keep_their_code() {
    let (object, probe) = TestObject::new()
        .answer::<IGamma>(HResult::E_OUTOFMEMORY)
        .build();
    let err = object.cast::<IGamma>().unwrap_err();
    assert!(!err.is_not_supported());
    assert!(err.is_out_of_memory());
    assert_eq!(err.hresult(), HResult::E_OUTOFMEMORY);
    assert_eq!(probe.refs(), 1);
}

#[test]
fn test_get_interfaces_lists_supported_iids() {
    let (object, _probe) = TestObject::new()
        .supports::<IAlpha>()
        .supports::<IGamma>()
        .build();
    let iids = get_interfaces(&object).unwrap();
    assert_eq!(iids, [IAlpha::IID, IGamma::IID]);

    let (bare, _probe) = TestObject::new().build();
    let none = get_interfaces(&bare).unwrap();
    assert!(none.is_empty());
}

#[test]
fn test_get_interfaces_through_tear_off() {
    let (object, _probe) = TestObject::new().supports::<IBeta>().build();
    let beta = object.cast::<IBeta>().unwrap();
    let inspectable = unsafe { Inspectable::from_raw(beta.clone().into_raw()) };
    assert_eq!(get_interfaces(&inspectable).unwrap(), [IBeta::IID]);
}

#[test]
fn test_trust_level() {
    let (object, _probe) = TestObject::new().trust_level(TrustLevel::FULL).build();
    assert_eq!(get_trust_level(&object).unwrap(), TrustLevel::FULL);
}

#[test]
fn test_unknown_identity_and_refcounts() {
    let (object, probe) = TestObject::new().supports::<IAlpha>().build();
    let first = object.cast::<Unknown>().unwrap();
    let second = object.cast::<IAlpha>().unwrap().cast::<Unknown>().unwrap();
    assert_eq!(first, second);
    assert_eq!(probe.refs(), 3);

    let raw = first.clone().into_raw();
    assert_eq!(probe.refs(), 4);
    let back = unsafe { Unknown::from_raw(raw) };
    drop(back);
    drop((first, second, object));
    assert!(probe.is_destroyed());
}

#[test]
fn test_interface_ref_borrows_without_releasing() {
    let (object, probe) = TestObject::new().build();
    let raw = NonNull::new(object.as_raw()).unwrap();
    {
        let borrowed: InterfaceRef<'_, Inspectable> = unsafe { InterfaceRef::from_raw(raw) };
        let copy = borrowed.clone();
        assert_eq!(probe.refs(), 1);
        let owned = copy.to_owned();
        assert_eq!(probe.refs(), 2);
        assert_eq!(owned, object);
    }
    assert_eq!(probe.refs(), 1);
    drop(object);
    assert!(probe.is_destroyed());
}
