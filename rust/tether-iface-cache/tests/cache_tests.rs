use std::collections::HashSet;
use std::sync::Barrier;

use tether_common::{ErrorKind, HResult};
use tether_iface_cache::InterfaceCache;
use tether_interface::{Inspectable, Interface};
use tether_testkit::{IAlpha, IBeta, IGamma, IMissing, TestObject};

type Cached = InterfaceCache<(Inspectable, IAlpha, IBeta, IGamma)>;

const THREADS: usize = 8;

#[test]
fn test_first_get_queries_later_gets_load() {
    let (object, probe) = TestObject::new()
        .supports::<IAlpha>()
        .supports::<IBeta>()
        .build();
    let cache = Cached::new(&object);
    assert_eq!(probe.refs(), 2);
    assert!(!cache.is_cached::<IAlpha, _>());

    let first = cache.get::<IAlpha, _>().unwrap().as_raw();
    assert!(cache.is_cached::<IAlpha, _>());
    assert!(!cache.is_cached::<IBeta, _>());
    assert_eq!(probe.queries(), 1);

    for _ in 0..10 {
        assert_eq!(cache.get::<IAlpha, _>().unwrap().as_raw(), first);
    }
    assert_eq!(probe.queries(), 1);
    assert_eq!(probe.refs(), 3);
    assert_eq!(probe.live_tear_offs(), 1);
}

#[test]
fn test_racing_threads_publish_one_reference() {
    let (object, probe) = TestObject::new()
        .supports::<IAlpha>()
        .supports::<IBeta>()
        .supports::<IGamma>()
        .build();
    let cache = Cached::new(&object);
    let base = probe.refs();
    let barrier = Barrier::new(THREADS);

    let seen: HashSet<usize> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    cache.get::<IBeta, _>().unwrap().as_raw() as usize
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(seen.len(), 1);
    assert_eq!(
        seen.into_iter().next(),
        Some(cache.get::<IBeta, _>().unwrap().as_raw() as usize)
    );
    assert_eq!(probe.refs(), base + 1);
    assert_eq!(probe.live_tear_offs(), 1);
    assert!(probe.queries() >= 1);

    drop(cache);
    assert_eq!(probe.refs(), 1);
    assert_eq!(probe.live_tear_offs(), 0);
    drop(object);
    assert!(probe.is_destroyed());
}

#[test]
fn test_mixed_races_on_every_slot() {
    for round in 0..25u64 {
        let (object, probe) = TestObject::new()
            .supports::<IAlpha>()
            .supports::<IBeta>()
            .supports::<IGamma>()
            .build();
        let cache = Cached::from_owned(object);
        let barrier = Barrier::new(THREADS);

        std::thread::scope(|s| {
            for thread in 0..THREADS as u64 {
                let cache = &cache;
                let barrier = &barrier;
                s.spawn(move || {
                    let mut rng = fastrand::Rng::with_seed(round * 100 + thread);
                    barrier.wait();
                    for _ in 0..16 {
                        let resolved = match rng.u8(0..3) {
                            0 => cache.get::<IAlpha, _>().map(|i| i.as_raw()),
                            1 => cache.get::<IBeta, _>().map(|i| i.as_raw()),
                            _ => cache.get::<IGamma, _>().map(|i| i.as_raw()),
                        };
                        assert!(!resolved.unwrap().is_null());
                    }
                });
            }
        });

        let cached = [
            cache.is_cached::<IAlpha, _>(),
            cache.is_cached::<IBeta, _>(),
            cache.is_cached::<IGamma, _>(),
        ]
        .into_iter()
        .filter(|&c| c)
        .count();
        assert_eq!(probe.live_tear_offs(), cached);
        assert_eq!(probe.refs(), 1 + cached as u32);

        drop(cache);
        assert!(probe.is_destroyed());
    }
}

#[test]
fn test_unsupported_interface_is_never_cached() {
    let (object, probe) = TestObject::new().supports::<IAlpha>().build();
    let cache = InterfaceCache::<(Inspectable, IAlpha, IMissing)>::new(&object);
    let refs = probe.refs();

    for attempt in 1..=3 {
        let err = cache.get::<IMissing, _>().unwrap_err();
        assert!(err.is_not_supported());
        assert!(!cache.is_cached::<IMissing, _>());
        assert_eq!(probe.queries(), attempt);
        assert_eq!(probe.refs(), refs);
    }

    // Other slots keep working.
    cache.get::<IAlpha, _>().unwrap();
    assert_eq!(probe.refs(), refs + 1);

    drop(cache);
    assert_eq!(probe.refs(), 1);
}

#[test]
fn test_foreign_failure_is_reported_and_not_cached() {
    let (object, probe) = TestObject::new()
        .answer::<IGamma>(HResult::E_FAIL)
        .build();
    let cache = Cached::new(&object);

    let err = cache.get::<IGamma, _>().unwrap_err();
    match err.kind() {
        ErrorKind::Abi { hresult, .. } => assert_eq!(*hresult, HResult::E_FAIL),
        other => panic!("unexpected error {other:?}"),
    }
    assert!(!cache.is_cached::<IGamma, _>());
    cache.get::<IGamma, _>().unwrap_err();
    assert_eq!(probe.queries(), 2);
}

#[test]
fn test_query_bypasses_the_cache() {
    let (object, probe) = TestObject::new()
        .supports::<IAlpha>()
        .supports::<IMissing>()
        .build();
    let cache = InterfaceCache::<(Inspectable, IAlpha)>::new(&object);

    let missing = cache.query::<IMissing>().unwrap();
    let again = cache.query::<IAlpha>().unwrap();
    assert!(!cache.is_cached::<IAlpha, _>());
    assert_eq!(probe.live_tear_offs(), 2);
    assert_ne!(again.as_raw(), cache.get::<IAlpha, _>().unwrap().as_raw());

    drop((missing, again));
    assert_eq!(probe.live_tear_offs(), 1);
}

#[test]
fn test_call_and_root() {
    let (object, probe) = TestObject::new().supports::<IBeta>().build();
    let cache = Cached::from_owned(object.clone());
    assert_eq!(cache.root().as_raw(), object.as_raw());

    let raw = cache.call::<IBeta, _, _, _>(|beta| beta.as_raw()).unwrap();
    assert_eq!(raw, cache.get::<IBeta, _>().unwrap().as_raw());
    assert!(cache.call::<IAlpha, _, _, _>(|alpha| alpha.as_raw()).is_err());

    let owned = cache.get::<IBeta, _>().unwrap().to_owned();
    drop(cache);
    // The owned reference outlives the cache.
    assert_eq!(probe.live_tear_offs(), 1);
    drop(owned);
    assert_eq!(probe.live_tear_offs(), 0);
    assert_eq!(probe.refs(), 1);
}
