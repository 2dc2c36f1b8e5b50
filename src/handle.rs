// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Magic-tag validation applied to every primitive.
// A live object carries its "alive" tag; destroy swaps it for the "dead"
// tag exactly once. Every entry point checks the tag before touching state.

use std::sync::atomic::{AtomicU32, Ordering};

use crate::error::{Result, SyncError};

/// Alive/dead tag pair for one kind of primitive.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Magic {
    live: u32,
    dead: u32,
}

impl Magic {
    pub(crate) const MUTEX: Magic = Magic { live: 0xBAB1_F00D, dead: 0xDEAD_BEEF };
    pub(crate) const BARRIER: Magic = Magic { live: 0xBAB1_FEED, dead: 0xDEAD_B00F };
    pub(crate) const CONDITION: Magic = Magic { live: 0xC0BA_B1FD, dead: 0xC0DE_ADBF };
}

pub(crate) struct Validity {
    tag: AtomicU32,
    magic: Magic,
}

impl Validity {
    /// A tag that starts out alive.
    pub(crate) const fn live(magic: Magic) -> Self {
        Self {
            tag: AtomicU32::new(magic.live),
            magic,
        }
    }

    pub(crate) fn is_live(&self) -> bool {
        self.tag.load(Ordering::Acquire) == self.magic.live
    }

    /// `Err(Invalid)` unless the object is alive.
    #[inline]
    pub(crate) fn check(&self) -> Result<()> {
        if self.is_live() {
            Ok(())
        } else {
            Err(SyncError::Invalid)
        }
    }

    /// Move alive -> dead. Only one caller can win; everyone else gets `Invalid`.
    pub(crate) fn retire(&self) -> Result<()> {
        self.tag
            .compare_exchange(
                self.magic.live,
                self.magic.dead,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map(drop)
            .map_err(|_| SyncError::Invalid)
    }

    /// Move dead -> alive, for reinitialising a destroyed object in place.
    /// `Busy` if it is still alive.
    pub(crate) fn revive(&self) -> Result<()> {
        self.tag
            .compare_exchange(
                self.magic.dead,
                self.magic.live,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map(drop)
            .map_err(|_| SyncError::Busy)
    }
}
