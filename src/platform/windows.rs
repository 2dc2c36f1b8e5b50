// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Windows host primitives.
// - PlatformSemaphore: an unnamed kernel semaphore (the "wait handle").
// - PlatformCriticalSection: a CRITICAL_SECTION in heap storage.

use std::alloc::{self, Layout};
use std::io;
use std::ptr::{self, NonNull};

use windows_sys::Win32::Foundation::{CloseHandle, HANDLE, WAIT_OBJECT_0, WAIT_TIMEOUT};
use windows_sys::Win32::System::Threading::{
    CreateSemaphoreW, DeleteCriticalSection, EnterCriticalSection, InitializeCriticalSection,
    LeaveCriticalSection, ReleaseSemaphore, TryEnterCriticalSection, WaitForSingleObject,
    CRITICAL_SECTION, INFINITE,
};

// ---------------------------------------------------------------------------
// PlatformSemaphore
// ---------------------------------------------------------------------------

pub struct PlatformSemaphore {
    h: HANDLE,
}

// Safety: kernel handles may be used from any thread.
unsafe impl Send for PlatformSemaphore {}
unsafe impl Sync for PlatformSemaphore {}

impl PlatformSemaphore {
    pub fn new(initial: u32, max: u32) -> io::Result<Self> {
        if max == 0 || initial > max || max > i32::MAX as u32 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "initial count exceeds maximum",
            ));
        }
        let h = unsafe { CreateSemaphoreW(ptr::null(), initial as i32, max as i32, ptr::null()) };
        if h.is_null() {
            return Err(io::Error::last_os_error());
        }
        Ok(Self { h })
    }

    fn wait_for(&self, ms: u32) -> io::Result<bool> {
        match unsafe { WaitForSingleObject(self.h, ms) } {
            WAIT_OBJECT_0 => Ok(true),
            WAIT_TIMEOUT => Ok(false),
            _ => Err(io::Error::last_os_error()),
        }
    }

    pub fn wait(&self) -> io::Result<()> {
        self.wait_for(INFINITE).map(drop)
    }

    pub fn try_wait(&self) -> io::Result<bool> {
        self.wait_for(0)
    }

    /// Add `n` permits. The kernel refuses (ERROR_TOO_MANY_POSTS) rather
    /// than exceed the maximum.
    pub fn post(&self, n: u32) -> io::Result<()> {
        let ok = unsafe { ReleaseSemaphore(self.h, n as i32, ptr::null_mut()) };
        if ok == 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    /// Current number of permits (a snapshot).
    pub fn value(&self) -> u32 {
        // No direct query: borrow every permit, then hand them back.
        let mut n = 0u32;
        while let Ok(true) = self.try_wait() {
            n += 1;
        }
        if n > 0 {
            let _ = self.post(n);
        }
        n
    }
}

impl Drop for PlatformSemaphore {
    fn drop(&mut self) {
        unsafe { CloseHandle(self.h) };
    }
}

// ---------------------------------------------------------------------------
// PlatformCriticalSection
// ---------------------------------------------------------------------------

pub struct PlatformCriticalSection {
    cs: NonNull<CRITICAL_SECTION>,
}

// Safety: critical sections are designed for concurrent access.
unsafe impl Send for PlatformCriticalSection {}
unsafe impl Sync for PlatformCriticalSection {}

impl PlatformCriticalSection {
    pub fn new() -> io::Result<Self> {
        let layout = Layout::new::<CRITICAL_SECTION>();
        let p = unsafe { alloc::alloc_zeroed(layout) } as *mut CRITICAL_SECTION;
        let cs = NonNull::new(p).ok_or_else(|| io::Error::from(io::ErrorKind::OutOfMemory))?;
        unsafe { InitializeCriticalSection(cs.as_ptr()) };
        Ok(Self { cs })
    }

    pub fn lock(&self) -> io::Result<()> {
        unsafe { EnterCriticalSection(self.cs.as_ptr()) };
        Ok(())
    }

    /// Returns `Ok(false)` if another thread holds it.
    pub fn try_lock(&self) -> io::Result<bool> {
        Ok(unsafe { TryEnterCriticalSection(self.cs.as_ptr()) } != 0)
    }

    /// Only the holder may call this; `crate::Mutex` checks ownership first.
    pub fn unlock(&self) -> io::Result<()> {
        unsafe { LeaveCriticalSection(self.cs.as_ptr()) };
        Ok(())
    }
}

impl Drop for PlatformCriticalSection {
    fn drop(&mut self) {
        unsafe {
            DeleteCriticalSection(self.cs.as_ptr());
            alloc::dealloc(self.cs.as_ptr() as *mut u8, Layout::new::<CRITICAL_SECTION>());
        }
    }
}
