// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// POSIX-style error taxonomy shared by every primitive.
// Host failures never leak out raw: the core translates them into one of
// these kinds, each of which maps onto a classic errno value.

use std::io;

/// Error kinds reported by mutex, condition and barrier operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum SyncError {
    /// Malformed input, e.g. a barrier count of zero or an unknown attribute value.
    #[error("invalid argument")]
    InvalidArgument,
    /// The object is destroyed, never initialised, or not in a state the call needs.
    #[error("invalid or destroyed synchronization object")]
    Invalid,
    /// A non-recursive mutex was relocked by its owner.
    #[error("resource deadlock would occur")]
    Deadlock,
    /// The object is in use (held, or has waiters).
    #[error("resource busy")]
    Busy,
    /// The caller does not own the lock it tried to release.
    #[error("operation not permitted: caller does not own the mutex")]
    PermissionDenied,
    /// The host primitive could not be allocated.
    #[error("out of memory")]
    OutOfMemory,
    /// A recursive mutex hit its maximum lock depth.
    #[error("recursive lock depth exhausted")]
    Again,
}

pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(unix)]
mod errno {
    pub const EINVAL: i32 = libc::EINVAL;
    pub const EDEADLK: i32 = libc::EDEADLK;
    pub const EBUSY: i32 = libc::EBUSY;
    pub const EPERM: i32 = libc::EPERM;
    pub const ENOMEM: i32 = libc::ENOMEM;
    pub const EAGAIN: i32 = libc::EAGAIN;
}

// MSVC CRT values.
#[cfg(not(unix))]
mod errno {
    pub const EINVAL: i32 = 22;
    pub const EDEADLK: i32 = 36;
    pub const EBUSY: i32 = 16;
    pub const EPERM: i32 = 1;
    pub const ENOMEM: i32 = 12;
    pub const EAGAIN: i32 = 11;
}

impl SyncError {
    /// The errno a pthread implementation would return for this error.
    pub fn errno(self) -> i32 {
        match self {
            Self::InvalidArgument | Self::Invalid => errno::EINVAL,
            Self::Deadlock => errno::EDEADLK,
            Self::Busy => errno::EBUSY,
            Self::PermissionDenied => errno::EPERM,
            Self::OutOfMemory => errno::ENOMEM,
            Self::Again => errno::EAGAIN,
        }
    }

    /// Inverse of [`errno`](Self::errno). `EINVAL` decodes to `Invalid`.
    pub fn from_errno(code: i32) -> Option<Self> {
        match code {
            errno::EINVAL => Some(Self::Invalid),
            errno::EDEADLK => Some(Self::Deadlock),
            errno::EBUSY => Some(Self::Busy),
            errno::EPERM => Some(Self::PermissionDenied),
            errno::ENOMEM => Some(Self::OutOfMemory),
            errno::EAGAIN => Some(Self::Again),
            _ => None,
        }
    }
}

impl From<SyncError> for io::Error {
    fn from(e: SyncError) -> Self {
        let kind = match e {
            SyncError::InvalidArgument | SyncError::Invalid => io::ErrorKind::InvalidInput,
            SyncError::Busy | SyncError::Again => io::ErrorKind::WouldBlock,
            SyncError::PermissionDenied => io::ErrorKind::PermissionDenied,
            SyncError::OutOfMemory => io::ErrorKind::OutOfMemory,
            SyncError::Deadlock => io::ErrorKind::Other,
        };
        io::Error::new(kind, e)
    }
}
