use tether::array::ComArray;
use tether::iface_cache::InterfaceCache;
use tether::interface::{Inspectable, Interface, get_interfaces};
use tether::support::guid::Guid;
use tether_testkit::{IAlpha, IBeta, TestObject};

#[test]
fn test_interfaces_listed_then_cached() {
    let (object, probe) = TestObject::new()
        .supports::<IAlpha>()
        .supports::<IBeta>()
        .build();

    let ids: ComArray<Guid> = get_interfaces(&object).unwrap();
    let cache = InterfaceCache::<(Inspectable, IAlpha, IBeta)>::new(&object);
    for iid in &ids {
        if *iid == IAlpha::IID {
            cache.get::<IAlpha, _>().unwrap();
        } else if *iid == IBeta::IID {
            cache.get::<IBeta, _>().unwrap();
        }
    }
    assert!(cache.is_cached::<IAlpha, _>());
    assert!(cache.is_cached::<IBeta, _>());
    assert_eq!(probe.live_tear_offs(), 2);

    drop((cache, object));
    assert!(probe.is_destroyed());
}

#[test]
fn test_detached_ids_round_trip() {
    let (object, _probe) = TestObject::new().supports::<IAlpha>().build();
    let mut ids = get_interfaces(&object).unwrap();
    let (len, data) = ids.detach();
    assert_eq!(len, 1);

    let owner = unsafe { ComArray::from_raw_parts(data, len) };
    assert_eq!(owner, [IAlpha::IID]);
}
