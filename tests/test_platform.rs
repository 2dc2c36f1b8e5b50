// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Host primitives underneath the emulated mutex.

use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use pthread_emu::platform::{HostLock, PlatformCriticalSection, PlatformSemaphore};

#[test]
fn semaphore_rejects_bad_bounds() {
    assert!(PlatformSemaphore::new(0, 0).is_err());
    assert!(PlatformSemaphore::new(3, 2).is_err());
}

#[test]
fn semaphore_wait_post() {
    let sem = PlatformSemaphore::new(1, 1).expect("new");
    sem.wait().expect("wait");
    assert_eq!(sem.value(), 0);
    sem.post(1).expect("post");
    assert_eq!(sem.value(), 1);
}

#[test]
fn semaphore_try_wait() {
    let sem = PlatformSemaphore::new(2, 4).expect("new");
    assert!(sem.try_wait().expect("try_wait"));
    assert!(sem.try_wait().expect("try_wait"));
    assert!(!sem.try_wait().expect("try_wait"));
    assert_eq!(sem.value(), 0);
}

#[test]
fn semaphore_post_beyond_max_fails() {
    let sem = PlatformSemaphore::new(1, 3).expect("new");
    sem.post(2).expect("post to max");
    assert!(sem.post(1).is_err());
    assert_eq!(sem.value(), 3);
}

#[test]
fn semaphore_wait_blocks_until_post() {
    let sem = Arc::new(PlatformSemaphore::new(0, 1).expect("new"));
    let done = Arc::new(AtomicBool::new(false));

    let waiter = {
        let (sem, done) = (Arc::clone(&sem), Arc::clone(&done));
        thread::spawn(move || {
            sem.wait().expect("wait");
            done.store(true, Ordering::SeqCst);
        })
    };

    thread::sleep(Duration::from_millis(50));
    assert!(!done.load(Ordering::SeqCst));
    sem.post(1).expect("post");
    waiter.join().unwrap();
    assert!(done.load(Ordering::SeqCst));
}

#[test]
fn semaphore_post_many_wakes_many() {
    let sem = Arc::new(PlatformSemaphore::new(0, 8).expect("new"));
    let woke = Arc::new(AtomicI32::new(0));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let (sem, woke) = (Arc::clone(&sem), Arc::clone(&woke));
            thread::spawn(move || {
                sem.wait().expect("wait");
                woke.fetch_add(1, Ordering::SeqCst);
            })
        })
        .collect();

    thread::sleep(Duration::from_millis(20));
    sem.post(4).expect("post");
    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(woke.load(Ordering::SeqCst), 4);
    assert_eq!(sem.value(), 0);
}

#[test]
fn critical_section_lock_unlock() {
    let cs = PlatformCriticalSection::new().expect("new");
    cs.lock().expect("lock");
    cs.unlock().expect("unlock");
    assert!(cs.try_lock().expect("try_lock"));
    cs.unlock().expect("unlock");
}

#[test]
fn critical_section_try_lock_contended() {
    let cs = Arc::new(PlatformCriticalSection::new().expect("new"));
    cs.lock().expect("lock");

    let cs2 = Arc::clone(&cs);
    let got = thread::spawn(move || cs2.try_lock().expect("try_lock"))
        .join()
        .unwrap();
    assert!(!got);
    cs.unlock().expect("unlock");
}

#[test]
fn critical_section_serializes() {
    let cs = Arc::new(PlatformCriticalSection::new().expect("new"));
    let counter = Arc::new(AtomicI32::new(0));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let (cs, counter) = (Arc::clone(&cs), Arc::clone(&counter));
            thread::spawn(move || {
                for _ in 0..1000 {
                    cs.lock().expect("lock");
                    let v = counter.load(Ordering::Relaxed);
                    counter.store(v + 1, Ordering::Relaxed);
                    cs.unlock().expect("unlock");
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(counter.load(Ordering::Relaxed), 4000);
}

fn exercise_host<L: HostLock + 'static>() {
    let lock = Arc::new(L::create().expect("create"));
    lock.acquire().expect("acquire");
    let l2 = Arc::clone(&lock);
    let free = thread::spawn(move || l2.try_acquire().expect("try")).join().unwrap();
    assert!(!free);
    lock.release().expect("release");

    assert!(lock.try_acquire().expect("try"));
    lock.release().expect("release");
}

#[test]
fn host_lock_backends() {
    exercise_host::<PlatformSemaphore>();
    exercise_host::<PlatformCriticalSection>();
    assert!(!<PlatformSemaphore as HostLock>::OWNER_BOUND);
    assert!(<PlatformCriticalSection as HostLock>::OWNER_BOUND);
}
