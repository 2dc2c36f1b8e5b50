// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Barrier + mutex + cancellation walkthrough.
//
// Usage: demo_phases [workers] [phases]
//        RUST_LOG=pthread_emu=trace demo_phases   (show state-machine events)
//
// Workers meet at a barrier once per phase and bump a shared counter under a
// recursive mutex. The serial thread of each phase reports the phase total.
// Afterwards an extra worker is cancelled while parked in a condition wait,
// and its cleanup handler releases the mutex it held.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use pthread_emu::{cancel, cleanup, Barrier, Condition, Mutex, MutexKind};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let workers: u32 = args.next().and_then(|a| a.parse().ok()).unwrap_or(4);
    let phases: u32 = args.next().and_then(|a| a.parse().ok()).unwrap_or(3);

    let barrier = Arc::new(Barrier::new(workers).expect("barrier init"));
    let lock = Arc::new(Mutex::new(MutexKind::Recursive).expect("mutex init"));
    let counter = Arc::new(AtomicU32::new(0));

    let handles: Vec<_> = (0..workers)
        .map(|id| {
            let barrier = Arc::clone(&barrier);
            let lock = Arc::clone(&lock);
            let counter = Arc::clone(&counter);
            thread::spawn(move || {
                for phase in 0..phases {
                    lock.lock().expect("lock");
                    lock.lock().expect("relock");
                    counter.fetch_add(1, Ordering::Relaxed);
                    lock.unlock().expect("unlock");
                    lock.unlock().expect("unlock");

                    if barrier.wait().expect("barrier wait").is_serial() {
                        println!(
                            "phase {phase}: worker {id} is serial, total = {}",
                            counter.load(Ordering::Relaxed)
                        );
                    }
                }
            })
        })
        .collect();

    for h in handles {
        h.join().expect("worker panicked");
    }
    barrier.destroy().expect("barrier destroy");

    // Cancellation: park a thread in a condition wait and cancel it.
    let gate = Arc::new(Mutex::new(MutexKind::ErrorCheck).expect("mutex init"));
    let cond = Arc::new(Condition::new().expect("cond init"));
    let (tx, rx) = std::sync::mpsc::channel();

    let parked = {
        let gate = Arc::clone(&gate);
        let cond = Arc::clone(&cond);
        thread::spawn(move || {
            tx.send(cancel::handle()).expect("send handle");
            cancel::cancellable(|| {
                gate.lock().expect("lock");
                let g = Arc::clone(&gate);
                let _unlock = cleanup::push(move || {
                    println!("cleanup: releasing gate");
                    let _ = g.unlock();
                });
                loop {
                    cond.wait(&gate).expect("wait");
                }
            })
        })
    };

    let handle = rx.recv().expect("recv handle");
    thread::sleep(Duration::from_millis(50));
    handle.cancel();
    while !parked.is_finished() {
        // The waiter only notices the request once it passes a cancellation point.
        let _ = cond.broadcast();
        thread::sleep(Duration::from_millis(10));
    }
    let outcome = parked.join().expect("parked thread panicked");
    println!("parked thread: {outcome:?}");
    gate.destroy().expect("gate destroy");
}
