// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Per-thread cleanup stack.
//
// `push` links a record on top of the calling thread's chain and hands back
// a `CleanupGuard`. The guard pops its record either explicitly through
// `CleanupGuard::pop(execute)` or implicitly on drop, which runs the action.
// Because guards drop in reverse order of creation, early returns and
// cancellation unwinding both run the actions strictly LIFO.
//
// Records are always unlinked before their action runs, so an action that
// pushes or pops its own records sees a consistent chain.

use std::marker::PhantomData;
use std::sync::atomic::{compiler_fence, Ordering};

use tracing::warn;

use crate::thread::{with_control, ThreadControl};

pub(crate) struct CleanupRecord {
    serial: u64,
    action: Box<dyn FnOnce()>,
    next: Option<Box<CleanupRecord>>,
}

/// Handle to a pushed cleanup record. Not `Send`: records belong to the
/// thread that pushed them.
#[must_use = "dropping the guard runs the cleanup action immediately"]
pub struct CleanupGuard {
    serial: u64,
    _thread_bound: PhantomData<*const ()>,
}

/// Push `action` onto the calling thread's cleanup stack.
pub fn push<F>(action: F) -> CleanupGuard
where
    F: FnOnce() + 'static,
{
    let serial = with_control(|tc| {
        let serial = tc.next_serial.get();
        tc.next_serial.set(serial + 1);

        let mut head = tc.cleanup_head.borrow_mut();
        let record = Box::new(CleanupRecord {
            serial,
            action: Box::new(action),
            next: head.take(),
        });
        // The record is complete before it becomes the head.
        compiler_fence(Ordering::SeqCst);
        *head = Some(record);
        compiler_fence(Ordering::SeqCst);

        tc.cleanup_depth.set(tc.cleanup_depth.get() + 1);
        serial
    });
    CleanupGuard {
        serial,
        _thread_bound: PhantomData,
    }
}

impl CleanupGuard {
    /// Unlink this record, running its action when `execute` is true.
    pub fn pop(self, execute: bool) {
        let serial = self.serial;
        std::mem::forget(self);
        pop_serial(serial, execute);
    }
}

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        pop_serial(self.serial, true);
    }
}

/// Number of records on the calling thread's stack.
pub fn depth() -> usize {
    with_control(|tc| tc.cleanup_depth.get())
}

/// Pop and run records until only `boundary` remain.
pub fn unwind_to(boundary: usize) {
    while let Some(record) = with_control(|tc| {
        if tc.cleanup_depth.get() > boundary {
            unlink_top(tc)
        } else {
            None
        }
    }) {
        (record.action)();
    }
}

fn unlink_top(tc: &ThreadControl) -> Option<Box<CleanupRecord>> {
    let mut head = tc.cleanup_head.borrow_mut();
    let mut record = head.take()?;
    *head = record.next.take();
    tc.cleanup_depth.set(tc.cleanup_depth.get() - 1);
    Some(record)
}

fn contains(tc: &ThreadControl, serial: u64) -> bool {
    let head = tc.cleanup_head.borrow();
    let mut cur = head.as_deref();
    while let Some(rec) = cur {
        if rec.serial == serial {
            return true;
        }
        // Serials grow towards the head; anything below is older.
        if rec.serial < serial {
            return false;
        }
        cur = rec.next.as_deref();
    }
    false
}

fn pop_serial(serial: u64, execute: bool) {
    // Already consumed by `unwind_to`.
    if !with_control(|tc| contains(tc, serial)) {
        return;
    }
    loop {
        let Some(record) = with_control(unlink_top) else {
            return;
        };
        if record.serial == serial {
            if execute {
                (record.action)();
            }
            return;
        }
        // A record pushed after this one is still linked: its scope is
        // nested inside ours, so it runs first.
        warn!(
            popped = serial,
            top = record.serial,
            "cleanup record popped out of order"
        );
        (record.action)();
    }
}
