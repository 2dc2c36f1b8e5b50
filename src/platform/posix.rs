// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// POSIX host primitives.
// - PlatformSemaphore: counting semaphore built from a pthread mutex, a
//   pthread condition variable and a counter. Any thread may post it, which
//   is what makes it usable as an ownerless "wait handle".
// - PlatformCriticalSection: a PTHREAD_MUTEX_ERRORCHECK mutex. Only the
//   acquiring thread may release it.
//
// The pthread objects live in heap storage obtained from the global
// allocator so they never move, and so allocation failure is reported
// instead of aborting.

use std::alloc::{self, Layout};
use std::io;
use std::ptr::{self, NonNull};

fn check(eno: libc::c_int) -> io::Result<()> {
    if eno != 0 {
        return Err(io::Error::from_raw_os_error(eno));
    }
    Ok(())
}

fn alloc_zeroed<T>() -> io::Result<NonNull<T>> {
    let layout = Layout::new::<T>();
    let p = unsafe { alloc::alloc_zeroed(layout) } as *mut T;
    NonNull::new(p).ok_or_else(|| io::Error::from(io::ErrorKind::OutOfMemory))
}

/// # Safety
/// `p` must come from `alloc_zeroed::<T>` and not be used afterwards.
unsafe fn dealloc<T>(p: NonNull<T>) {
    alloc::dealloc(p.as_ptr() as *mut u8, Layout::new::<T>());
}

// ---------------------------------------------------------------------------
// PlatformSemaphore
// ---------------------------------------------------------------------------

struct SemState {
    mtx: libc::pthread_mutex_t,
    cond: libc::pthread_cond_t,
    count: u32,
}

pub struct PlatformSemaphore {
    state: NonNull<SemState>,
    max: u32,
}

// Safety: all access to `SemState` goes through its own pthread mutex.
unsafe impl Send for PlatformSemaphore {}
unsafe impl Sync for PlatformSemaphore {}

impl PlatformSemaphore {
    /// Create a semaphore holding `initial` permits, capped at `max`.
    pub fn new(initial: u32, max: u32) -> io::Result<Self> {
        if max == 0 || initial > max {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "initial count exceeds maximum",
            ));
        }
        let state = alloc_zeroed::<SemState>()?;
        let s = state.as_ptr();
        unsafe {
            if let Err(e) = check(libc::pthread_mutex_init(ptr::addr_of_mut!((*s).mtx), ptr::null())) {
                dealloc(state);
                return Err(e);
            }
            if let Err(e) = check(libc::pthread_cond_init(ptr::addr_of_mut!((*s).cond), ptr::null())) {
                libc::pthread_mutex_destroy(ptr::addr_of_mut!((*s).mtx));
                dealloc(state);
                return Err(e);
            }
            (*s).count = initial;
        }
        Ok(Self { state, max })
    }

    fn mtx(&self) -> *mut libc::pthread_mutex_t {
        unsafe { ptr::addr_of_mut!((*self.state.as_ptr()).mtx) }
    }

    fn cond(&self) -> *mut libc::pthread_cond_t {
        unsafe { ptr::addr_of_mut!((*self.state.as_ptr()).cond) }
    }

    fn count(&self) -> *mut u32 {
        unsafe { ptr::addr_of_mut!((*self.state.as_ptr()).count) }
    }

    /// Block until a permit is available, then take it.
    pub fn wait(&self) -> io::Result<()> {
        unsafe {
            check(libc::pthread_mutex_lock(self.mtx()))?;
            while *self.count() == 0 {
                let eno = libc::pthread_cond_wait(self.cond(), self.mtx());
                if eno != 0 {
                    libc::pthread_mutex_unlock(self.mtx());
                    return Err(io::Error::from_raw_os_error(eno));
                }
            }
            *self.count() -= 1;
            check(libc::pthread_mutex_unlock(self.mtx()))
        }
    }

    /// Take a permit if one is available. Returns `Ok(false)` otherwise.
    pub fn try_wait(&self) -> io::Result<bool> {
        unsafe {
            check(libc::pthread_mutex_lock(self.mtx()))?;
            let taken = *self.count() > 0;
            if taken {
                *self.count() -= 1;
            }
            check(libc::pthread_mutex_unlock(self.mtx()))?;
            Ok(taken)
        }
    }

    /// Add `n` permits. Fails without changing the count if that would
    /// exceed the maximum.
    pub fn post(&self, n: u32) -> io::Result<()> {
        unsafe {
            check(libc::pthread_mutex_lock(self.mtx()))?;
            let cur = *self.count();
            if n > self.max - cur {
                libc::pthread_mutex_unlock(self.mtx());
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "semaphore count would exceed maximum",
                ));
            }
            *self.count() = cur + n;
            let eno = if n > 1 {
                libc::pthread_cond_broadcast(self.cond())
            } else {
                libc::pthread_cond_signal(self.cond())
            };
            libc::pthread_mutex_unlock(self.mtx());
            check(eno)
        }
    }

    /// Current number of permits (a snapshot).
    pub fn value(&self) -> u32 {
        unsafe {
            libc::pthread_mutex_lock(self.mtx());
            let v = *self.count();
            libc::pthread_mutex_unlock(self.mtx());
            v
        }
    }
}

impl Drop for PlatformSemaphore {
    fn drop(&mut self) {
        unsafe {
            libc::pthread_cond_destroy(self.cond());
            libc::pthread_mutex_destroy(self.mtx());
            dealloc(self.state);
        }
    }
}

// ---------------------------------------------------------------------------
// PlatformCriticalSection
// ---------------------------------------------------------------------------

pub struct PlatformCriticalSection {
    mtx: NonNull<libc::pthread_mutex_t>,
}

// Safety: pthread mutexes are designed for concurrent access.
unsafe impl Send for PlatformCriticalSection {}
unsafe impl Sync for PlatformCriticalSection {}

impl PlatformCriticalSection {
    pub fn new() -> io::Result<Self> {
        let mtx = alloc_zeroed::<libc::pthread_mutex_t>()?;
        unsafe {
            let mut attr: libc::pthread_mutexattr_t = std::mem::zeroed();
            if let Err(e) = check(libc::pthread_mutexattr_init(&mut attr)) {
                dealloc(mtx);
                return Err(e);
            }
            let mut eno = libc::pthread_mutexattr_settype(&mut attr, libc::PTHREAD_MUTEX_ERRORCHECK);
            if eno == 0 {
                eno = libc::pthread_mutex_init(mtx.as_ptr(), &attr);
            }
            libc::pthread_mutexattr_destroy(&mut attr);
            if let Err(e) = check(eno) {
                dealloc(mtx);
                return Err(e);
            }
        }
        Ok(Self { mtx })
    }

    pub fn lock(&self) -> io::Result<()> {
        check(unsafe { libc::pthread_mutex_lock(self.mtx.as_ptr()) })
    }

    /// Returns `Ok(false)` if another thread holds it.
    pub fn try_lock(&self) -> io::Result<bool> {
        match unsafe { libc::pthread_mutex_trylock(self.mtx.as_ptr()) } {
            0 => Ok(true),
            libc::EBUSY => Ok(false),
            eno => Err(io::Error::from_raw_os_error(eno)),
        }
    }

    /// Fails with `EPERM` when the caller is not the holder.
    pub fn unlock(&self) -> io::Result<()> {
        check(unsafe { libc::pthread_mutex_unlock(self.mtx.as_ptr()) })
    }
}

impl Drop for PlatformCriticalSection {
    fn drop(&mut self) {
        unsafe {
            libc::pthread_mutex_destroy(self.mtx.as_ptr());
            dealloc(self.mtx);
        }
    }
}
