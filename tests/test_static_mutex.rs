// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Static initializers: lazy, exactly-once resolution.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Barrier as StdBarrier};
use std::thread;

use pthread_emu::{MutexAttr, MutexKind, MutexTag, StaticKind, StaticMutex, SyncError};

#[test]
fn pending_until_first_use() {
    static M: StaticMutex = StaticMutex::new(StaticKind::ErrorCheck);
    assert_eq!(M.tag(), MutexTag::StaticPending(StaticKind::ErrorCheck));

    M.lock().expect("lock");
    assert_eq!(M.tag(), MutexTag::Live);
    assert_eq!(M.get().unwrap().kind(), MutexKind::ErrorCheck);
    assert_eq!(M.lock(), Err(SyncError::Deadlock));
    M.unlock().expect("unlock");
}

#[test]
fn each_initializer_resolves_to_its_kind() {
    let cases = [
        (StaticKind::Default, MutexKind::Normal),
        (StaticKind::Normal, MutexKind::Normal),
        (StaticKind::Recursive, MutexKind::Recursive),
        (StaticKind::ErrorCheck, MutexKind::ErrorCheck),
    ];
    for (requested, expected) in cases {
        let m = StaticMutex::new(requested);
        assert_eq!(m.get().expect("resolve").kind(), expected);
    }
}

#[test]
fn recursive_initializer_allows_relock() {
    static M: StaticMutex = StaticMutex::new(StaticKind::Recursive);
    M.lock().expect("lock");
    M.lock().expect("relock");
    M.unlock().expect("unlock");
    M.unlock().expect("unlock");
    assert_eq!(M.unlock(), Err(SyncError::Invalid));
}

#[test]
fn uninitialized_slot_is_invalid_until_init() {
    let m = StaticMutex::uninit();
    assert_eq!(m.tag(), MutexTag::Uninitialized);
    assert_eq!(m.lock(), Err(SyncError::Invalid));
    assert_eq!(m.try_lock(), Err(SyncError::Invalid));
    assert_eq!(m.unlock(), Err(SyncError::Invalid));
    assert_eq!(m.destroy(), Err(SyncError::Invalid));

    let mut attr = MutexAttr::new();
    attr.set_kind(MutexKind::Recursive).unwrap();
    m.init(Some(&attr)).expect("init");
    assert_eq!(m.tag(), MutexTag::Live);
    assert_eq!(m.init(None), Err(SyncError::Busy));

    m.lock().expect("lock");
    m.lock().expect("relock");
    m.unlock().expect("unlock");
    m.unlock().expect("unlock");
}

#[test]
fn destroy_after_resolution() {
    let m = StaticMutex::default();
    m.lock().expect("lock");
    assert_eq!(m.destroy(), Err(SyncError::Busy));
    m.unlock().expect("unlock");
    m.destroy().expect("destroy");
    assert_eq!(m.tag(), MutexTag::Destroyed);
    assert_eq!(m.lock(), Err(SyncError::Invalid));
}

#[test]
fn concurrent_first_use_resolves_once() {
    let m = Arc::new(StaticMutex::new(StaticKind::Normal));
    let start = Arc::new(StdBarrier::new(8));
    let counter = Arc::new(AtomicI32::new(0));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let m = Arc::clone(&m);
            let start = Arc::clone(&start);
            let counter = Arc::clone(&counter);
            thread::spawn(move || {
                start.wait();
                let resolved = m.get().expect("resolve") as *const _ as usize;
                for _ in 0..100 {
                    m.lock().expect("lock");
                    let v = counter.load(Ordering::Relaxed);
                    counter.store(v + 1, Ordering::Relaxed);
                    m.unlock().expect("unlock");
                }
                resolved
            })
        })
        .collect();

    let addrs: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let first = m.get().unwrap() as *const _ as usize;
    assert!(addrs.iter().all(|&a| a == first), "every thread saw the same mutex");
    assert_eq!(counter.load(Ordering::Relaxed), 800);
}

#[test]
fn destroyed_slot_can_be_reinitialised() {
    static M: StaticMutex = StaticMutex::new(StaticKind::Normal);
    M.lock().expect("lock");
    M.unlock().expect("unlock");
    M.destroy().expect("destroy");
    assert_eq!(M.lock(), Err(SyncError::Invalid));

    let mut attr = MutexAttr::new();
    attr.set_kind(MutexKind::Recursive).unwrap();
    M.init(Some(&attr)).expect("reinit");
    assert_eq!(M.tag(), MutexTag::Live);
    assert_eq!(M.get().unwrap().kind(), MutexKind::Recursive);

    M.lock().expect("lock");
    M.lock().expect("relock");
    assert_eq!(M.init(None), Err(SyncError::Busy));
    M.unlock().expect("unlock");
    M.unlock().expect("unlock");

    // Live and unlocked is still Busy.
    assert_eq!(M.init(None), Err(SyncError::Busy));
}
