// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Per-thread control block: identity, the cleanup chain and cancel state.
// Lives in thread-local storage, so nothing in it is ever shared between
// threads except the pending-cancel flag, which other threads set through
// a `CancelHandle`.

use std::cell::{Cell, RefCell};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crate::cancel::{CancelState, CancelType};
use crate::cleanup::CleanupRecord;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

pub(crate) struct ThreadControl {
    pub(crate) id: u64,
    pub(crate) cleanup_head: RefCell<Option<Box<CleanupRecord>>>,
    pub(crate) cleanup_depth: Cell<usize>,
    pub(crate) next_serial: Cell<u64>,
    pub(crate) cancel_state: Cell<CancelState>,
    pub(crate) cancel_type: Cell<CancelType>,
    pub(crate) pending: Arc<AtomicBool>,
}

impl ThreadControl {
    fn new() -> Self {
        Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            cleanup_head: RefCell::new(None),
            cleanup_depth: Cell::new(0),
            next_serial: Cell::new(0),
            cancel_state: Cell::new(CancelState::Enable),
            cancel_type: Cell::new(CancelType::Deferred),
            pending: Arc::new(AtomicBool::new(false)),
        }
    }
}

thread_local! {
    static CONTROL: ThreadControl = ThreadControl::new();
}

pub(crate) fn with_control<R>(f: impl FnOnce(&ThreadControl) -> R) -> R {
    CONTROL.with(f)
}

/// Identity of the calling thread. Never zero, never reused within a process.
pub fn current_id() -> u64 {
    with_control(|tc| tc.id)
}
