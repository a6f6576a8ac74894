use thiserror::Error;

use crate::syscalls::{
    CmdStatus, ExtStatus,
    ERR1_NO_DISC, ERR1_DISC_CHANGED,
};

/// Every way a drive operation can fail.
///
/// This is the only error callers of [`crate::Cdrom`] see for polled
/// commands. A successful outcome is `Ok`.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CdError {
    #[error("no disc in drive")]
    NoDisc,
    #[error("disc changed, drive needs reinitialising")]
    DiscChanged,
    #[error("system error")]
    System,
    #[error("command aborted")]
    Aborted,
    #[error("no active command")]
    NoActive,
    /// The command was aborted after running past its time budget.
    #[error("command timed out")]
    Timeout,
    /// A non-blocking request found the drive in use by another command.
    #[error("drive is in use")]
    Contended,
}

pub type CdResult<T = ()> = Result<T, CdError>;

impl CdError {
    /// The firmware's return code for this error, where it has one.
    /// Success is 0.
    pub const fn code(self) -> Option<u8> {
        match self {
            CdError::NoDisc => Some(1),
            CdError::DiscChanged => Some(2),
            CdError::System => Some(3),
            CdError::Aborted => Some(4),
            CdError::NoActive => Some(5),
            CdError::Timeout => Some(6),
            CdError::Contended => None,
        }
    }

    /// Inverse of [`CdError::code`]. 0 is `Ok`, unknown codes are system errors.
    pub const fn from_code(code: u8) -> CdResult {
        match code {
            0 => Ok(()),
            1 => Err(CdError::NoDisc),
            2 => Err(CdError::DiscChanged),
            4 => Err(CdError::Aborted),
            5 => Err(CdError::NoActive),
            6 => Err(CdError::Timeout),
            _ => Err(CdError::System),
        }
    }
}

/// A synchronous firmware call (sector mode, drive check) returned failure.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("firmware call failed with code {0}")]
pub struct SyscallError(pub i32);

impl From<SyscallError> for CdError {
    fn from(_: SyscallError) -> Self {
        CdError::System
    }
}

/// Turn the terminal status of a command into a result.
///
/// The error codes in `ext` are only consulted for unsuccessful commands.
pub fn classify(status: CmdStatus, ext: &ExtStatus) -> CdResult {
    match status {
        CmdStatus::Completed | CmdStatus::Streaming => Ok(()),
        CmdStatus::NotFound => Err(CdError::NoActive),
        _ => match ext.err1 {
            ERR1_NO_DISC => Err(CdError::NoDisc),
            ERR1_DISC_CHANGED => Err(CdError::DiscChanged),
            _ => Err(CdError::System),
        },
    }
}
