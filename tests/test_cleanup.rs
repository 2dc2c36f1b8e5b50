// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Cleanup stack and cancellation delivery.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use pthread_emu::cancel::{self, CancelState, CancelType, Cancelled};
use pthread_emu::{cleanup, Condition, Mutex, MutexKind};

type Log = Rc<RefCell<Vec<&'static str>>>;

fn recorder(log: &Log, tag: &'static str) -> impl FnOnce() + 'static {
    let log = Rc::clone(log);
    move || log.borrow_mut().push(tag)
}

// Each test runs on a fresh thread so cancel state and the cleanup stack
// never leak between tests sharing a harness thread.
fn on_fresh_thread<T: Send + 'static>(f: impl FnOnce() -> T + Send + 'static) -> T {
    thread::spawn(f).join().expect("test thread panicked")
}

#[test]
fn pop_runs_lifo() {
    on_fresh_thread(|| {
        let log: Log = Rc::default();
        let a = cleanup::push(recorder(&log, "A"));
        let b = cleanup::push(recorder(&log, "B"));
        assert_eq!(cleanup::depth(), 2);

        b.pop(true);
        a.pop(true);
        assert_eq!(*log.borrow(), ["B", "A"]);
        assert_eq!(cleanup::depth(), 0);
    });
}

#[test]
fn pop_without_execute_skips_action() {
    on_fresh_thread(|| {
        let log: Log = Rc::default();
        let g = cleanup::push(recorder(&log, "skipped"));
        g.pop(false);
        assert!(log.borrow().is_empty());
        assert_eq!(cleanup::depth(), 0);
    });
}

#[test]
fn drop_runs_action_on_early_return() {
    fn body(log: &Log, bail: bool) -> Option<()> {
        let _outer = cleanup::push(recorder(log, "outer"));
        let _inner = cleanup::push(recorder(log, "inner"));
        if bail {
            return None;
        }
        log.borrow_mut().push("body");
        Some(())
    }

    on_fresh_thread(|| {
        let log: Log = Rc::default();
        assert!(body(&log, true).is_none());
        assert_eq!(*log.borrow(), ["inner", "outer"]);

        log.borrow_mut().clear();
        assert!(body(&log, false).is_some());
        assert_eq!(*log.borrow(), ["body", "inner", "outer"]);
        assert_eq!(cleanup::depth(), 0);
    });
}

#[test]
fn action_may_use_the_stack() {
    on_fresh_thread(|| {
        let log: Log = Rc::default();
        let nested_log = Rc::clone(&log);
        let g = cleanup::push(move || {
            let inner = cleanup::push(recorder(&nested_log, "nested"));
            assert_eq!(cleanup::depth(), 1);
            inner.pop(true);
            nested_log.borrow_mut().push("outer");
        });
        g.pop(true);
        assert_eq!(*log.borrow(), ["nested", "outer"]);
        assert_eq!(cleanup::depth(), 0);
    });
}

#[test]
fn out_of_order_pop_runs_newer_records_first() {
    on_fresh_thread(|| {
        let log: Log = Rc::default();
        let a = cleanup::push(recorder(&log, "A"));
        let b = cleanup::push(recorder(&log, "B"));

        a.pop(false);
        assert_eq!(*log.borrow(), ["B"]);
        assert_eq!(cleanup::depth(), 0);

        // B's record is gone already; its guard is a no-op now.
        b.pop(true);
        assert_eq!(*log.borrow(), ["B"]);
    });
}

#[test]
fn unwind_to_stops_at_boundary() {
    on_fresh_thread(|| {
        let log: Log = Rc::default();
        let keep = cleanup::push(recorder(&log, "keep"));
        let boundary = cleanup::depth();
        let x = cleanup::push(recorder(&log, "x"));
        let y = cleanup::push(recorder(&log, "y"));

        cleanup::unwind_to(boundary);
        assert_eq!(*log.borrow(), ["y", "x"]);
        assert_eq!(cleanup::depth(), 1);

        drop(y);
        drop(x);
        assert_eq!(log.borrow().len(), 2);
        keep.pop(true);
        assert_eq!(*log.borrow(), ["y", "x", "keep"]);
    });
}

#[test]
fn testcancel_runs_cleanup_and_reports_cancelled() {
    on_fresh_thread(|| {
        let log: Log = Rc::default();
        let inner_log = Rc::clone(&log);
        let outcome = cancel::cancellable(move || {
            let _a = cleanup::push(recorder(&inner_log, "A"));
            let _b = cleanup::push(recorder(&inner_log, "B"));
            cancel::handle().cancel();
            cancel::testcancel();
            inner_log.borrow_mut().push("unreachable");
        });
        assert_eq!(outcome, Err(Cancelled));
        assert_eq!(*log.borrow(), ["B", "A"]);
        assert_eq!(cleanup::depth(), 0);
        assert!(!cancel::handle().is_pending());
    });
}

#[test]
fn cancellable_passes_value_through() {
    on_fresh_thread(|| {
        assert_eq!(cancel::cancellable(|| 42), Ok(42));
    });
}

#[test]
fn disabled_state_holds_request_pending() {
    on_fresh_thread(|| {
        let outcome = cancel::cancellable(|| {
            assert_eq!(cancel::set_cancel_state(CancelState::Disable), CancelState::Enable);
            let h = cancel::handle();
            h.cancel();
            cancel::testcancel();
            assert!(h.is_pending());

            cancel::set_cancel_state(CancelState::Enable);
            cancel::testcancel();
        });
        assert_eq!(outcome, Err(Cancelled));
    });
}

#[test]
fn asynchronous_type_fires_at_mutex_lock() {
    on_fresh_thread(|| {
        let m = Mutex::new(MutexKind::ErrorCheck).expect("mutex");
        let outcome = cancel::cancellable(|| {
            assert_eq!(cancel::set_cancel_type(CancelType::Asynchronous), CancelType::Deferred);
            cancel::handle().cancel();
            m.lock().expect("lock");
        });
        assert_eq!(outcome, Err(Cancelled));
        assert!(!m.is_locked());
        cancel::set_cancel_type(CancelType::Deferred);
    });
}

#[test]
fn deferred_type_ignores_mutex_lock() {
    on_fresh_thread(|| {
        let m = Mutex::new(MutexKind::ErrorCheck).expect("mutex");
        let outcome = cancel::cancellable(|| {
            cancel::handle().cancel();
            m.lock().expect("lock");
            m.unlock().expect("unlock");
            "finished"
        });
        assert_eq!(outcome, Ok("finished"));
        assert!(cancel::handle().is_pending());
        assert_eq!(cancel::cancellable(cancel::testcancel), Err(Cancelled));
    });
}

#[test]
fn switching_to_asynchronous_fires_pending_request() {
    on_fresh_thread(|| {
        let reached = Rc::new(RefCell::new(false));
        let flag = Rc::clone(&reached);
        let outcome = cancel::cancellable(move || {
            cancel::handle().cancel();
            cancel::set_cancel_type(CancelType::Asynchronous);
            *flag.borrow_mut() = true;
        });
        assert_eq!(outcome, Err(Cancelled));
        assert!(!*reached.borrow());
    });
}

#[test]
fn condition_wait_is_a_cancellation_point() {
    let gate = Arc::new(Mutex::new(MutexKind::ErrorCheck).expect("mutex"));
    let cond = Arc::new(Condition::new().expect("cond"));
    let released = Arc::new(AtomicBool::new(false));
    let (tx, rx) = std::sync::mpsc::channel();

    let parked = {
        let (gate, cond, released) = (Arc::clone(&gate), Arc::clone(&cond), Arc::clone(&released));
        thread::spawn(move || {
            tx.send(cancel::handle()).expect("send");
            cancel::cancellable(|| {
                gate.lock().expect("lock");
                let g = Arc::clone(&gate);
                let r = Arc::clone(&released);
                let _unlock = cleanup::push(move || {
                    g.unlock().expect("cleanup unlock");
                    r.store(true, Ordering::SeqCst);
                });
                loop {
                    cond.wait(&gate).expect("wait");
                }
            })
        })
    };

    let handle = rx.recv().expect("recv");
    handle.cancel();
    while !parked.is_finished() {
        let _ = cond.broadcast();
        thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(parked.join().expect("join"), Err(Cancelled));
    assert!(released.load(Ordering::SeqCst));
    assert!(!gate.is_locked());
    gate.destroy().expect("destroy");
}

#[test]
fn cancelled_condition_wait_holds_mutex_for_cleanup() {
    let gate = Arc::new(Mutex::new(MutexKind::ErrorCheck).expect("mutex"));
    let cond = Arc::new(Condition::new().expect("cond"));
    let unlocked = Arc::new(std::sync::Mutex::new(None));
    let (tx, rx) = std::sync::mpsc::channel();

    let parked = {
        let (gate, cond, unlocked) = (Arc::clone(&gate), Arc::clone(&cond), Arc::clone(&unlocked));
        thread::spawn(move || {
            tx.send(cancel::handle()).expect("send");
            cancel::cancellable(|| {
                gate.lock().expect("lock");
                let g = Arc::clone(&gate);
                let _unlock = cleanup::push(move || {
                    *unlocked.lock().unwrap() = Some(g.unlock());
                });
                cancel::set_cancel_type(CancelType::Asynchronous);
                loop {
                    cond.wait(&gate).expect("wait");
                }
            })
        })
    };

    let handle = rx.recv().expect("recv");
    let start = std::time::Instant::now();
    while cond.waiters() == 0 && start.elapsed() < Duration::from_secs(5) {
        thread::sleep(Duration::from_millis(1));
    }
    handle.cancel();
    while !parked.is_finished() {
        let _ = cond.broadcast();
        thread::sleep(Duration::from_millis(5));
    }

    assert_eq!(parked.join().expect("join"), Err(Cancelled));
    // The cleanup action ran with the mutex held again.
    assert_eq!(*unlocked.lock().unwrap(), Some(Ok(())));
    assert!(!gate.is_locked());
    gate.destroy().expect("destroy");
}
