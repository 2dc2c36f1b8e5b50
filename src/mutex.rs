// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Typed mutex (normal / recursive / error-checking) over a host lock.
//
// The host primitive only provides exclusion. Ownership and depth live
// next to it:
// - `owner` is the holder's thread id (0 when unheld). A caller that finds
//   its own id there is relocking: recursive mutexes deepen, the others
//   fail with Deadlock instead of blocking on themselves.
// - `hold` is the logical hold count. It saturates at zero, so an unlock
//   that has nothing to release never reaches the host.
// - `waiters` counts threads blocked in the host acquire, for destroy.

use std::sync::atomic::{AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::sync::OnceLock;

use tracing::{debug, trace, warn};

use crate::attr::{MutexAttr, ProcessShared};
use crate::cancel;
use crate::error::{Result, SyncError};
use crate::handle::{Magic, Validity};
use crate::hold::HoldCount;
use crate::platform::{DefaultHostLock, HostLock};
use crate::spin_lock::SpinLock;
use crate::thread;

pub const PTHREAD_MUTEX_NORMAL: i32 = 0;
pub const PTHREAD_MUTEX_RECURSIVE: i32 = 1;
pub const PTHREAD_MUTEX_ERRORCHECK: i32 = 2;
pub const PTHREAD_MUTEX_DEFAULT: i32 = 3;

/// Behaviour of a mutex on relock and foreign unlock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutexKind {
    /// Relock by the owner reports `Deadlock`.
    Normal,
    /// The owner may relock; each lock needs a matching unlock.
    Recursive,
    /// Like `Normal`, with every misuse reported.
    ErrorCheck,
}

impl MutexKind {
    /// What `PTHREAD_MUTEX_DEFAULT` resolves to.
    pub const DEFAULT: MutexKind = MutexKind::Normal;

    const fn to_raw(self) -> u8 {
        match self {
            Self::Normal => 0,
            Self::Recursive => 1,
            Self::ErrorCheck => 2,
        }
    }

    const fn from_raw(raw: u8) -> Self {
        match raw {
            1 => Self::Recursive,
            2 => Self::ErrorCheck,
            _ => Self::Normal,
        }
    }
}

impl TryFrom<i32> for MutexKind {
    type Error = SyncError;

    fn try_from(raw: i32) -> Result<Self> {
        match raw {
            PTHREAD_MUTEX_NORMAL | PTHREAD_MUTEX_DEFAULT => Ok(Self::Normal),
            PTHREAD_MUTEX_RECURSIVE => Ok(Self::Recursive),
            PTHREAD_MUTEX_ERRORCHECK => Ok(Self::ErrorCheck),
            _ => Err(SyncError::InvalidArgument),
        }
    }
}

/// Kind requested by a static initializer, resolved on first use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StaticKind {
    Default,
    Normal,
    Recursive,
    ErrorCheck,
}

impl StaticKind {
    /// The mutex kind this initializer resolves to.
    pub fn kind(self) -> MutexKind {
        match self {
            Self::Default => MutexKind::DEFAULT,
            Self::Normal => MutexKind::Normal,
            Self::Recursive => MutexKind::Recursive,
            Self::ErrorCheck => MutexKind::ErrorCheck,
        }
    }
}

/// Lifecycle tag as observed from outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutexTag {
    /// A slot that needs an explicit `init` before use.
    Uninitialized,
    /// A static initializer not resolved yet.
    StaticPending(StaticKind),
    Live,
    Destroyed,
}

/// A POSIX-style mutex.
///
/// Unlike `std::sync::Mutex` this is a bare lock with explicit `lock` /
/// `unlock` calls and errno-style failures. `destroy` retires the object:
/// every later call fails with `Invalid`. The host primitive itself is
/// released when the value is dropped.
pub struct Mutex {
    valid: Validity,
    // Only changes while the mutex is destroyed, see `reinit`.
    kind: AtomicU8,
    owner: AtomicU64,
    hold: HoldCount,
    waiters: AtomicU32,
    host: DefaultHostLock,
}

impl Mutex {
    /// Create an unlocked mutex of the given kind.
    ///
    /// Fails with `OutOfMemory` when the host primitive cannot be created.
    pub fn new(kind: MutexKind) -> Result<Self> {
        let host = DefaultHostLock::create().map_err(|_| SyncError::OutOfMemory)?;
        Ok(Self {
            valid: Validity::live(Magic::MUTEX),
            kind: AtomicU8::new(kind.to_raw()),
            owner: AtomicU64::new(0),
            hold: HoldCount::new(),
            waiters: AtomicU32::new(0),
            host,
        })
    }

    /// Initialise from optional attributes. Process-shared mutexes are not
    /// supported and fail with `InvalidArgument`.
    pub fn with_attr(attr: Option<&MutexAttr>) -> Result<Self> {
        Self::new(attr_kind(attr)?)
    }

    /// The kind chosen at initialisation.
    pub fn kind(&self) -> MutexKind {
        MutexKind::from_raw(self.kind.load(Ordering::Acquire))
    }

    /// `Live` until [`destroy`](Self::destroy) succeeds, `Destroyed` after.
    pub fn tag(&self) -> MutexTag {
        if self.valid.is_live() {
            MutexTag::Live
        } else {
            MutexTag::Destroyed
        }
    }

    /// Whether some thread currently holds the mutex.
    pub fn is_locked(&self) -> bool {
        self.hold.get() > 0
    }

    /// Lock depth: 0 when unheld, >1 only for a relocked recursive mutex.
    pub fn depth(&self) -> u32 {
        self.hold.get()
    }

    /// Block until the mutex is acquired.
    ///
    /// The owner relocking gets `Deadlock` unless the mutex is recursive.
    /// A pending asynchronous cancellation is acted on before blocking.
    pub fn lock(&self) -> Result<()> {
        self.valid.check()?;
        cancel::async_point();
        self.lock_uncancellable()
    }

    /// `lock` without the cancellation point, for internal protocols that
    /// must not unwind between wakeup and their own bookkeeping.
    pub(crate) fn lock_uncancellable(&self) -> Result<()> {
        self.valid.check()?;
        let me = thread::current_id();
        if self.owner.load(Ordering::Acquire) == me {
            return self.relock();
        }

        self.waiters.fetch_add(1, Ordering::AcqRel);
        let acquired = self.host.acquire();
        self.waiters.fetch_sub(1, Ordering::AcqRel);
        acquired.map_err(|_| SyncError::Invalid)?;
        self.take_ownership(me)
    }

    /// Never blocks. `Busy` when held, including by the caller for the
    /// non-recursive kinds.
    pub fn try_lock(&self) -> Result<()> {
        self.valid.check()?;
        let me = thread::current_id();
        if self.owner.load(Ordering::Acquire) == me {
            return match self.kind() {
                MutexKind::Recursive => self.hold.acquire().map(drop),
                _ => Err(SyncError::Busy),
            };
        }
        match self.host.try_acquire() {
            Ok(true) => self.take_ownership(me),
            Ok(false) => Err(SyncError::Busy),
            Err(_) => Err(SyncError::Invalid),
        }
    }

    /// Release one hold.
    ///
    /// `Invalid` when nothing is held, `PermissionDenied` when another
    /// thread holds it.
    pub fn unlock(&self) -> Result<()> {
        self.valid.check()?;
        let me = thread::current_id();
        let owner = self.owner.load(Ordering::Acquire);
        if owner != me {
            if owner == 0 {
                warn!("discarding unlock of a mutex that is not held");
                return Err(SyncError::Invalid);
            }
            // Recursive mutexes accept a foreign release unless the host
            // ties release to the acquiring thread.
            if self.kind() != MutexKind::Recursive || DefaultHostLock::OWNER_BOUND {
                return Err(SyncError::PermissionDenied);
            }
        }

        let Some(remaining) = self.hold.release() else {
            warn!("discarding unlock beyond the hold count");
            return Err(SyncError::Invalid);
        };
        if remaining > 0 {
            return Ok(());
        }
        self.owner.store(0, Ordering::Release);
        self.host.release().map_err(|_| SyncError::Invalid)
    }

    /// Retire the mutex. `Busy` while held or while threads wait on it.
    pub fn destroy(&self) -> Result<()> {
        self.valid.check()?;
        if self.is_locked() || self.waiters.load(Ordering::Acquire) > 0 {
            debug!(depth = self.hold.get(), "mutex destroy rejected: busy");
            return Err(SyncError::Busy);
        }
        // Holding the host lock keeps late lockers out while the tag flips.
        match self.host.try_acquire() {
            Ok(true) => {}
            Ok(false) => return Err(SyncError::Busy),
            Err(_) => return Err(SyncError::Invalid),
        }
        if self.waiters.load(Ordering::Acquire) > 0 {
            let _ = self.host.release();
            return Err(SyncError::Busy);
        }
        let retired = self.valid.retire();
        let _ = self.host.release();
        retired
    }

    /// Bring a destroyed mutex back to life as a fresh, unlocked mutex.
    /// `Busy` while it is still live.
    pub(crate) fn reinit(&self, kind: MutexKind) -> Result<()> {
        if self.valid.is_live() {
            return Err(SyncError::Busy);
        }
        self.kind.store(kind.to_raw(), Ordering::Release);
        self.owner.store(0, Ordering::Release);
        self.valid.revive()
    }

    fn relock(&self) -> Result<()> {
        match self.kind() {
            MutexKind::Recursive => self.hold.acquire().map(drop),
            _ => Err(SyncError::Deadlock),
        }
    }

    fn take_ownership(&self, me: u64) -> Result<()> {
        // Destroyed while we were blocked: hand the host lock back.
        if let Err(e) = self.valid.check() {
            let _ = self.host.release();
            return Err(e);
        }
        if let Err(e) = self.hold.acquire() {
            let _ = self.host.release();
            return Err(e);
        }
        self.owner.store(me, Ordering::Release);
        Ok(())
    }
}

/// Kind requested by optional attributes. Process-shared is rejected.
fn attr_kind(attr: Option<&MutexAttr>) -> Result<MutexKind> {
    match attr {
        None => Ok(MutexKind::DEFAULT),
        Some(a) => {
            if a.pshared()? == ProcessShared::Shared {
                return Err(SyncError::InvalidArgument);
            }
            a.kind()
        }
    }
}

// ---------------------------------------------------------------------------
// StaticMutex: lazily resolved static initializer
// ---------------------------------------------------------------------------

/// Serializes the first resolution of every static mutex in the process.
static STATIC_INIT_GATE: SpinLock = SpinLock::new();

const SLOT_UNINIT: u8 = 0;

const fn encode(kind: StaticKind) -> u8 {
    match kind {
        StaticKind::Default => 1,
        StaticKind::Normal => 2,
        StaticKind::Recursive => 3,
        StaticKind::ErrorCheck => 4,
    }
}

fn decode(raw: u8) -> Option<StaticKind> {
    match raw {
        1 => Some(StaticKind::Default),
        2 => Some(StaticKind::Normal),
        3 => Some(StaticKind::Recursive),
        4 => Some(StaticKind::ErrorCheck),
        _ => None,
    }
}

/// A mutex slot usable in a `static`.
///
/// Built with [`StaticMutex::new`] it behaves like a pthread static
/// initializer: the real mutex is created on first use, exactly once even
/// under concurrent first use. Built with [`StaticMutex::uninit`] every
/// operation fails with `Invalid` until [`init`](StaticMutex::init).
/// A destroyed slot may be initialised again the same way.
///
/// ```
/// use pthread_emu::{StaticKind, StaticMutex};
///
/// static LOCK: StaticMutex = StaticMutex::new(StaticKind::Recursive);
///
/// LOCK.lock().unwrap();
/// LOCK.lock().unwrap();
/// LOCK.unlock().unwrap();
/// LOCK.unlock().unwrap();
/// ```
pub struct StaticMutex {
    pending: AtomicU8,
    cell: OnceLock<Mutex>,
}

impl StaticMutex {
    /// Static initializer: the mutex is created on first use.
    pub const fn new(kind: StaticKind) -> Self {
        Self {
            pending: AtomicU8::new(encode(kind)),
            cell: OnceLock::new(),
        }
    }

    /// An empty slot. Every operation fails with `Invalid` until `init`.
    pub const fn uninit() -> Self {
        Self {
            pending: AtomicU8::new(SLOT_UNINIT),
            cell: OnceLock::new(),
        }
    }

    /// Explicit initialisation. `Busy` if the slot holds a live mutex; a
    /// destroyed one is reinitialised in place.
    pub fn init(&self, attr: Option<&MutexAttr>) -> Result<()> {
        let _gate = STATIC_INIT_GATE.lock();
        if let Some(m) = self.cell.get() {
            let kind = attr_kind(attr)?;
            m.reinit(kind)?;
            trace!(?kind, "reinitialised destroyed static mutex");
            return Ok(());
        }
        let m = Mutex::with_attr(attr)?;
        let _ = self.cell.set(m);
        Ok(())
    }

    /// Lifecycle tag of the slot.
    pub fn tag(&self) -> MutexTag {
        match self.cell.get() {
            Some(m) => m.tag(),
            None => match decode(self.pending.load(Ordering::Acquire)) {
                Some(kind) => MutexTag::StaticPending(kind),
                None => MutexTag::Uninitialized,
            },
        }
    }

    /// The underlying mutex, resolving a pending static initializer.
    pub fn get(&self) -> Result<&Mutex> {
        if let Some(m) = self.cell.get() {
            return Ok(m);
        }
        let kind = decode(self.pending.load(Ordering::Acquire)).ok_or(SyncError::Invalid)?;

        let _gate = STATIC_INIT_GATE.lock();
        if let Some(m) = self.cell.get() {
            return Ok(m);
        }
        let m = Mutex::new(kind.kind())?;
        trace!(?kind, "resolved static mutex initializer");
        Ok(self.cell.get_or_init(|| m))
    }

    /// [`Mutex::lock`] on the resolved mutex.
    pub fn lock(&self) -> Result<()> {
        self.get()?.lock()
    }

    /// [`Mutex::try_lock`] on the resolved mutex.
    pub fn try_lock(&self) -> Result<()> {
        self.get()?.try_lock()
    }

    /// [`Mutex::unlock`] on the resolved mutex.
    pub fn unlock(&self) -> Result<()> {
        self.get()?.unlock()
    }

    /// [`Mutex::destroy`] on the resolved mutex. The slot can be `init`ed
    /// again afterwards.
    pub fn destroy(&self) -> Result<()> {
        self.get()?.destroy()
    }
}

impl Default for StaticMutex {
    fn default() -> Self {
        Self::new(StaticKind::Default)
    }
}
