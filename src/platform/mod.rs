// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors

use std::io;

#[cfg(unix)]
pub mod posix;

#[cfg(windows)]
pub mod windows;

// Re-export the platform-specific implementations under a uniform name.

#[cfg(unix)]
pub use posix::{PlatformCriticalSection, PlatformSemaphore};

#[cfg(windows)]
pub use windows::{PlatformCriticalSection, PlatformSemaphore};

/// Host mutual-exclusion primitive underneath [`crate::Mutex`].
///
/// The mutex layer keeps its own owner and depth bookkeeping; the host only
/// has to provide exclusion.
pub trait HostLock: Sized + Send + Sync {
    /// Whether only the acquiring thread may release the primitive.
    const OWNER_BOUND: bool;

    fn create() -> io::Result<Self>;
    fn acquire(&self) -> io::Result<()>;
    /// `Ok(false)` when the primitive is held.
    fn try_acquire(&self) -> io::Result<bool>;
    fn release(&self) -> io::Result<()>;
}

/// Wait-handle backend: a binary semaphore, releasable by any thread.
impl HostLock for PlatformSemaphore {
    const OWNER_BOUND: bool = false;

    fn create() -> io::Result<Self> {
        PlatformSemaphore::new(1, 1)
    }

    fn acquire(&self) -> io::Result<()> {
        self.wait()
    }

    fn try_acquire(&self) -> io::Result<bool> {
        self.try_wait()
    }

    fn release(&self) -> io::Result<()> {
        self.post(1)
    }
}

impl HostLock for PlatformCriticalSection {
    const OWNER_BOUND: bool = true;

    fn create() -> io::Result<Self> {
        PlatformCriticalSection::new()
    }

    fn acquire(&self) -> io::Result<()> {
        self.lock()
    }

    fn try_acquire(&self) -> io::Result<bool> {
        self.try_lock()
    }

    fn release(&self) -> io::Result<()> {
        self.unlock()
    }
}

/// Backend selected at build time by the `critical-section` feature.
#[cfg(not(feature = "critical-section"))]
pub type DefaultHostLock = PlatformSemaphore;

#[cfg(feature = "critical-section")]
pub type DefaultHostLock = PlatformCriticalSection;
