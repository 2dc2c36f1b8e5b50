// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Thread cancellation, delivered as a stack unwind.
//
// Another thread requests cancellation through a `CancelHandle`. The target
// acts on it at a cancellation point by unwinding with a `Cancelled`
// payload: every live `CleanupGuard` on the way drops and runs its action.
// `cancellable` marks the boundary, catches the unwind, runs whatever
// records are still linked above the boundary and reports `Err(Cancelled)`.
//
// Deferred type: acted on only at `testcancel` and `Condition::wait` (on
// entry and after wakeup, once the mutex is held again).
// Asynchronous type: additionally acted on when entering `Mutex::lock` and
// `Barrier::wait`, and immediately when the type or state is switched while
// a request is pending.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::cleanup;
use crate::thread::with_control;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelState {
    Enable,
    Disable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelType {
    Deferred,
    Asynchronous,
}

/// The thread was cancelled. Also the unwind payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("thread was cancelled")]
pub struct Cancelled;

/// Cross-thread handle used to request cancellation of one thread.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    pending: Arc<AtomicBool>,
    thread: u64,
}

impl CancelHandle {
    /// Request cancellation. The target acts on it at its next cancellation point.
    pub fn cancel(&self) {
        self.pending.store(true, Ordering::Release);
        debug!(thread = self.thread, "cancellation requested");
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Identity of the thread this handle targets.
    pub fn thread_id(&self) -> u64 {
        self.thread
    }
}

/// Handle for cancelling the calling thread from elsewhere.
pub fn handle() -> CancelHandle {
    with_control(|tc| CancelHandle {
        pending: Arc::clone(&tc.pending),
        thread: tc.id,
    })
}

/// Set the calling thread's cancel state and return the previous one.
pub fn set_cancel_state(state: CancelState) -> CancelState {
    let old = with_control(|tc| tc.cancel_state.replace(state));
    async_point();
    old
}

/// Set the calling thread's cancel type and return the previous one.
pub fn set_cancel_type(ty: CancelType) -> CancelType {
    let old = with_control(|tc| tc.cancel_type.replace(ty));
    async_point();
    old
}

/// Deferred cancellation point.
pub fn testcancel() {
    if should_act(false) {
        deliver();
    }
}

/// Cancellation point that only fires for the asynchronous type.
pub(crate) fn async_point() {
    if should_act(true) {
        deliver();
    }
}

fn should_act(async_only: bool) -> bool {
    with_control(|tc| {
        tc.cancel_state.get() == CancelState::Enable
            && (!async_only || tc.cancel_type.get() == CancelType::Asynchronous)
            && tc.pending.load(Ordering::Acquire)
    })
}

fn deliver() -> ! {
    let id = with_control(|tc| {
        tc.pending.store(false, Ordering::Release);
        // Cleanup actions must not be cancelled in turn.
        tc.cancel_state.set(CancelState::Disable);
        tc.id
    });
    debug!(thread = id, "delivering cancellation");
    panic::resume_unwind(Box::new(Cancelled))
}

/// Run `f` as a cancellable region.
///
/// Returns `Err(Cancelled)` when a cancellation was delivered inside `f`,
/// after every cleanup record pushed inside `f` has run, newest first.
/// Other panics propagate after the same cleanup.
pub fn cancellable<T, F>(f: F) -> Result<T, Cancelled>
where
    F: FnOnce() -> T,
{
    let boundary = cleanup::depth();
    let state = with_control(|tc| tc.cancel_state.get());
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(v) => Ok(v),
        Err(payload) => {
            cleanup::unwind_to(boundary);
            if payload.is::<Cancelled>() {
                with_control(|tc| tc.cancel_state.set(state));
                Err(Cancelled)
            } else {
                panic::resume_unwind(payload)
            }
        }
    }
}
