// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Phased barrier built on `Mutex` + `Condition`.
//
// `total` is both the arrival counter and the phase discriminator:
// - below FLAG: counting arrivals for the current phase;
// - FLAG + k:   releasing, k threads still have to leave;
// - exactly FLAG: the previous phase fully drained.
// The last arriver turns `required` into `FLAG + required - 1` and returns
// Serial; every other waiter decrements on its way out, and the one that
// brings the counter back to FLAG wakes threads queued for the next phase.

use std::sync::atomic::{AtomicU32, Ordering};

use tracing::{debug, trace};

use crate::attr::BarrierAttr;
use crate::cancel;
use crate::condition::Condition;
use crate::error::{Result, SyncError};
use crate::handle::{Magic, Validity};
use crate::mutex::{Mutex, MutexKind};
use crate::refcount::RefGate;

/// Phase discriminator. Barrier counts must stay below it.
pub const BARRIER_FLAG: u32 = 1 << 30;

/// Outcome of [`Barrier::wait`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarrierWait {
    /// This caller completed the phase.
    Serial,
    NotSerial,
}

impl BarrierWait {
    /// Whether this caller completed the phase.
    pub fn is_serial(self) -> bool {
        self == Self::Serial
    }
}

pub struct Barrier {
    valid: Validity,
    refs: RefGate,
    required: u32,
    // Only touched while holding `gate`.
    total: AtomicU32,
    gate: Mutex,
    cond: Condition,
}

impl Barrier {
    /// Create a barrier that releases every `count` arrivals.
    /// `InvalidArgument` for 0 or anything at or above [`BARRIER_FLAG`].
    pub fn new(count: u32) -> Result<Self> {
        Self::with_attr(None, count)
    }

    /// The attribute is validated but its process-shared flag is ignored.
    pub fn with_attr(attr: Option<&BarrierAttr>, count: u32) -> Result<Self> {
        if count == 0 || count >= BARRIER_FLAG {
            return Err(SyncError::InvalidArgument);
        }
        if let Some(a) = attr {
            a.pshared()?;
        }
        let gate = Mutex::new(MutexKind::Normal).map_err(|_| SyncError::OutOfMemory)?;
        let cond = Condition::new().map_err(|_| SyncError::OutOfMemory)?;
        Ok(Self {
            valid: Validity::live(Magic::BARRIER),
            refs: RefGate::new(),
            required: count,
            total: AtomicU32::new(0),
            gate,
            cond,
        })
    }

    /// Arrivals needed per phase.
    pub fn required(&self) -> u32 {
        self.required
    }

    /// Threads currently inside `wait`.
    pub fn in_flight(&self) -> u32 {
        self.refs.in_flight()
    }

    fn total(&self) -> u32 {
        self.total.load(Ordering::Relaxed)
    }

    fn set_total(&self, v: u32) {
        self.total.store(v, Ordering::Relaxed);
    }

    /// Abandon the protocol after a gate/condition failure.
    fn bail(&self) -> SyncError {
        // Harmless if the gate is no longer ours: the hold guard discards it.
        let _ = self.gate.unlock();
        SyncError::Invalid
    }

    /// Block until `required` threads have called `wait` in this phase.
    /// Exactly one of them gets [`BarrierWait::Serial`].
    ///
    /// A pending asynchronous cancellation is acted on at entry only; once
    /// counted, the caller always leaves the phase through the protocol.
    pub fn wait(&self) -> Result<BarrierWait> {
        self.valid.check()?;
        cancel::async_point();
        let _ref = self.refs.enter()?;

        self.gate.lock_uncancellable().map_err(|_| SyncError::Invalid)?;

        // Let the previous phase drain before counting a new one.
        while self.total() > BARRIER_FLAG {
            if self.cond.wait_uncancellable(&self.gate).is_err() {
                return Err(self.bail());
            }
        }

        if self.total() == BARRIER_FLAG {
            self.set_total(0);
        }
        let arrived = self.total() + 1;
        self.set_total(arrived);

        if arrived == self.required {
            self.set_total(BARRIER_FLAG + self.required - 1);
            let woke = self.cond.broadcast();
            let unlocked = self.gate.unlock();
            if woke.is_err() || unlocked.is_err() {
                return Err(SyncError::Invalid);
            }
            trace!(required = self.required, "barrier tripped");
            return Ok(BarrierWait::Serial);
        }

        while self.total() < BARRIER_FLAG {
            if self.cond.wait_uncancellable(&self.gate).is_err() {
                return Err(self.bail());
            }
        }

        let left = self.total() - 1;
        self.set_total(left);
        let woke = if left == BARRIER_FLAG {
            self.cond.broadcast()
        } else {
            Ok(())
        };
        let unlocked = self.gate.unlock();
        if woke.is_err() || unlocked.is_err() {
            return Err(SyncError::Invalid);
        }
        Ok(BarrierWait::NotSerial)
    }

    /// Retire the barrier. `Busy` while any thread is inside `wait`.
    pub fn destroy(&self) -> Result<()> {
        self.valid.check()?;
        if let Err(e) = self.refs.close() {
            debug!(in_flight = self.refs.in_flight(), "barrier destroy rejected");
            return Err(e);
        }

        if self.gate.lock_uncancellable().is_err() {
            self.refs.reopen();
            return Err(SyncError::Invalid);
        }
        if self.cond.destroy().is_err() {
            self.refs.reopen();
            let _ = self.gate.unlock();
            return Err(SyncError::Busy);
        }
        let retired = self.valid.retire();
        let _ = self.gate.unlock();
        let _ = self.gate.destroy();
        retired
    }
}
