// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Condition variable paired with `crate::Mutex`.
//
// Waiters take a ticket under an internal lock before releasing the user
// mutex, and sleep until the served counter passes their ticket. `signal`
// serves one ticket, `broadcast` serves all issued ones. A thread that
// starts waiting after a broadcast holds a newer ticket, so it can never
// consume a wakeup owed to an older waiter.

use parking_lot::{Condvar, Mutex as TicketLock};

use crate::cancel;
use crate::error::{Result, SyncError};
use crate::handle::{Magic, Validity};
use crate::mutex::Mutex;

struct Tickets {
    issued: u64,
    served: u64,
}

pub struct Condition {
    valid: Validity,
    tickets: TicketLock<Tickets>,
    cv: Condvar,
}

impl Condition {
    /// Create a condition with no waiters.
    pub fn new() -> Result<Self> {
        Ok(Self {
            valid: Validity::live(Magic::CONDITION),
            tickets: TicketLock::new(Tickets { issued: 0, served: 0 }),
            cv: Condvar::new(),
        })
    }

    /// Atomically release `mtx` and sleep until signalled, then relock `mtx`.
    /// The caller must hold `mtx`.
    ///
    /// This is a cancellation point, checked on entry and again after
    /// wakeup. A cancellation is only delivered while `mtx` is held, so
    /// cleanup actions may unlock it.
    pub fn wait(&self, mtx: &Mutex) -> Result<()> {
        self.valid.check()?;
        cancel::testcancel();
        self.wait_uncancellable(mtx)?;
        cancel::testcancel();
        Ok(())
    }

    /// `wait` that never unwinds, including on the relock.
    pub(crate) fn wait_uncancellable(&self, mtx: &Mutex) -> Result<()> {
        self.valid.check()?;
        let mut t = self.tickets.lock();
        let ticket = t.issued;
        t.issued += 1;
        if let Err(e) = mtx.unlock() {
            t.issued -= 1;
            return Err(e);
        }
        while t.served <= ticket {
            self.cv.wait(&mut t);
        }
        drop(t);
        mtx.lock_uncancellable()
    }

    /// Wake the longest-waiting thread, if any.
    pub fn signal(&self) -> Result<()> {
        self.valid.check()?;
        let mut t = self.tickets.lock();
        if t.served < t.issued {
            t.served += 1;
            self.cv.notify_all();
        }
        Ok(())
    }

    /// Wake every waiting thread.
    pub fn broadcast(&self) -> Result<()> {
        self.valid.check()?;
        let mut t = self.tickets.lock();
        if t.served < t.issued {
            t.served = t.issued;
            self.cv.notify_all();
        }
        Ok(())
    }

    /// Threads currently blocked in `wait`.
    pub fn waiters(&self) -> u64 {
        let t = self.tickets.lock();
        t.issued - t.served
    }

    /// Retire the condition. `Busy` while threads are waiting.
    pub fn destroy(&self) -> Result<()> {
        self.valid.check()?;
        let t = self.tickets.lock();
        if t.served < t.issued {
            return Err(SyncError::Busy);
        }
        self.valid.retire()
    }
}
