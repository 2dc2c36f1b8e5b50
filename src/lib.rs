// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// POSIX thread-synchronization semantics on top of simpler host primitives:
// typed mutexes with ownership and deadlock checks, a phased barrier with
// reference-counted destroy, and per-thread cleanup stacks unwound on
// cancellation.

mod error;
pub use error::{Result, SyncError};

mod handle;
mod hold;
mod refcount;
mod spin_lock;

pub mod platform;

pub mod thread;

mod attr;
pub use attr::{BarrierAttr, MutexAttr, ProcessShared, PTHREAD_PROCESS_PRIVATE, PTHREAD_PROCESS_SHARED};

mod mutex;
pub use mutex::{
    Mutex, MutexKind, MutexTag, StaticKind, StaticMutex, PTHREAD_MUTEX_DEFAULT,
    PTHREAD_MUTEX_ERRORCHECK, PTHREAD_MUTEX_NORMAL, PTHREAD_MUTEX_RECURSIVE,
};

mod condition;
pub use condition::Condition;

mod barrier;
pub use barrier::{Barrier, BarrierWait, BARRIER_FLAG};

pub mod cleanup;
pub use cleanup::CleanupGuard;

pub mod cancel;
pub use cancel::{CancelHandle, CancelState, CancelType, Cancelled};
