// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Attribute objects for mutex and barrier initialisation.
// Like their pthread counterparts they have an explicit destroy; any use
// after destroy fails with InvalidArgument.

use crate::error::{Result, SyncError};
use crate::mutex::MutexKind;

pub const PTHREAD_PROCESS_PRIVATE: i32 = 0;
pub const PTHREAD_PROCESS_SHARED: i32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessShared {
    #[default]
    Private,
    Shared,
}

impl TryFrom<i32> for ProcessShared {
    type Error = SyncError;

    fn try_from(raw: i32) -> Result<Self> {
        match raw {
            PTHREAD_PROCESS_PRIVATE => Ok(Self::Private),
            PTHREAD_PROCESS_SHARED => Ok(Self::Shared),
            _ => Err(SyncError::InvalidArgument),
        }
    }
}

impl From<ProcessShared> for i32 {
    fn from(p: ProcessShared) -> i32 {
        match p {
            ProcessShared::Private => PTHREAD_PROCESS_PRIVATE,
            ProcessShared::Shared => PTHREAD_PROCESS_SHARED,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct MutexAttrData {
    kind: MutexKind,
    pshared: ProcessShared,
}

/// Mutex attributes: kind and process-shared flag.
#[derive(Debug, Clone)]
pub struct MutexAttr {
    data: Option<MutexAttrData>,
}

impl MutexAttr {
    pub fn new() -> Self {
        Self {
            data: Some(MutexAttrData {
                kind: MutexKind::DEFAULT,
                pshared: ProcessShared::Private,
            }),
        }
    }

    fn data(&self) -> Result<&MutexAttrData> {
        self.data.as_ref().ok_or(SyncError::InvalidArgument)
    }

    fn data_mut(&mut self) -> Result<&mut MutexAttrData> {
        self.data.as_mut().ok_or(SyncError::InvalidArgument)
    }

    pub fn destroy(&mut self) -> Result<()> {
        self.data.take().map(drop).ok_or(SyncError::InvalidArgument)
    }

    pub fn kind(&self) -> Result<MutexKind> {
        self.data().map(|d| d.kind)
    }

    pub fn set_kind(&mut self, kind: MutexKind) -> Result<()> {
        self.data_mut()?.kind = kind;
        Ok(())
    }

    /// `settype` with a raw `PTHREAD_MUTEX_*` value.
    pub fn set_kind_raw(&mut self, raw: i32) -> Result<()> {
        let kind = MutexKind::try_from(raw)?;
        self.set_kind(kind)
    }

    pub fn pshared(&self) -> Result<ProcessShared> {
        self.data().map(|d| d.pshared)
    }

    pub fn set_pshared(&mut self, pshared: ProcessShared) -> Result<()> {
        self.data_mut()?.pshared = pshared;
        Ok(())
    }

    pub fn set_pshared_raw(&mut self, raw: i32) -> Result<()> {
        let pshared = ProcessShared::try_from(raw)?;
        self.set_pshared(pshared)
    }
}

impl Default for MutexAttr {
    fn default() -> Self {
        Self::new()
    }
}

/// Barrier attributes. Only the process-shared flag exists, and the
/// barrier itself ignores it.
#[derive(Debug, Clone)]
pub struct BarrierAttr {
    pshared: Option<ProcessShared>,
}

impl BarrierAttr {
    pub fn new() -> Self {
        Self {
            pshared: Some(ProcessShared::Private),
        }
    }

    pub fn destroy(&mut self) -> Result<()> {
        self.pshared.take().map(drop).ok_or(SyncError::InvalidArgument)
    }

    pub fn pshared(&self) -> Result<ProcessShared> {
        self.pshared.ok_or(SyncError::InvalidArgument)
    }

    pub fn set_pshared(&mut self, pshared: ProcessShared) -> Result<()> {
        let slot = self.pshared.as_mut().ok_or(SyncError::InvalidArgument)?;
        *slot = pshared;
        Ok(())
    }

    pub fn set_pshared_raw(&mut self, raw: i32) -> Result<()> {
        let pshared = ProcessShared::try_from(raw)?;
        self.set_pshared(pshared)
    }
}

impl Default for BarrierAttr {
    fn default() -> Self {
        Self::new()
    }
}
