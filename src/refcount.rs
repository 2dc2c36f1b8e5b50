// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// In-flight reference counting for safe destroy.
// Every operation on a guarded object holds a `RefGuard` for its duration.
// `close` only succeeds when no guard is outstanding, and once closed no new
// guard can be taken. Both transitions act on one atomic word, so entering
// never blocks on whatever protocol the object runs internally.

use std::sync::atomic::{AtomicU32, Ordering};

use crate::error::{Result, SyncError};

const CLOSED: u32 = u32::MAX;

pub(crate) struct RefGate {
    refs: AtomicU32,
}

/// RAII reference: released on drop, including during unwinding.
pub(crate) struct RefGuard<'a> {
    gate: &'a RefGate,
}

impl RefGate {
    pub(crate) const fn new() -> Self {
        Self {
            refs: AtomicU32::new(0),
        }
    }

    /// Take a reference. `Invalid` once the gate is closed.
    pub(crate) fn enter(&self) -> Result<RefGuard<'_>> {
        self.refs
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                // CLOSED - 1 is left unused so a full count never reads as closed.
                if n >= CLOSED - 1 {
                    None
                } else {
                    Some(n + 1)
                }
            })
            .map_err(|_| SyncError::Invalid)?;
        Ok(RefGuard { gate: self })
    }

    /// Number of operations currently inside the object.
    pub(crate) fn in_flight(&self) -> u32 {
        match self.refs.load(Ordering::Acquire) {
            CLOSED => 0,
            n => n,
        }
    }

    /// Close the gate. `Busy` while references are outstanding,
    /// `Invalid` if it was already closed.
    pub(crate) fn close(&self) -> Result<()> {
        match self
            .refs
            .compare_exchange(0, CLOSED, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => Ok(()),
            Err(CLOSED) => Err(SyncError::Invalid),
            Err(_) => Err(SyncError::Busy),
        }
    }

    /// Undo a `close` whose teardown had to be abandoned.
    pub(crate) fn reopen(&self) {
        let _ = self
            .refs
            .compare_exchange(CLOSED, 0, Ordering::AcqRel, Ordering::Acquire);
    }
}

impl Drop for RefGuard<'_> {
    fn drop(&mut self) {
        self.gate.refs.fetch_sub(1, Ordering::Release);
    }
}
