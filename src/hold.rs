// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Logical hold count of a mutex, kept apart from the host primitive.
// The count saturates at zero: an unlock with nothing to release is
// discarded here and never reaches the host, so a stray or duplicate
// unlock cannot push a semaphore-backed lock above one permit.

use std::sync::atomic::{AtomicU32, Ordering};

use crate::error::{Result, SyncError};

pub(crate) struct HoldCount(AtomicU32);

impl HoldCount {
    pub(crate) const fn new() -> Self {
        Self(AtomicU32::new(0))
    }

    pub(crate) fn get(&self) -> u32 {
        self.0.load(Ordering::Acquire)
    }

    /// Record one more hold and return the new depth.
    pub(crate) fn acquire(&self) -> Result<u32> {
        self.0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_add(1))
            .map(|prev| prev + 1)
            .map_err(|_| SyncError::Again)
    }

    /// Drop one hold and return the remaining depth.
    /// `None` when the count was already zero; nothing changes in that case.
    pub(crate) fn release(&self) -> Option<u32> {
        self.0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .ok()
            .map(|prev| prev - 1)
    }
}
