//! Submitting a command and waiting for it.
//!
//! None of this takes the drive gate: callers hold it across the whole
//! [`run`] cycle.


use crate::clock::Clock;
use crate::error::{classify, CdError, CdResult};
use crate::syscalls::{
    CmdHandle, CmdStatus, CommandCode, CommandParams, ExtStatus, Syscalls,
};

/// Times to retry a command submission.
pub const CMD_RETRY_MAX: u32 = 10;

/// Queue a command with the firmware.
///
/// A processor that is momentarily full returns handle 0; it is given a tick
/// and the caller yields before the next attempt. A negative handle is a hard
/// failure and is not retried.
pub fn submit<S: Syscalls, C: Clock>(
    syscalls: &mut S,
    clock: &C,
    cmd: CommandCode,
    params: &mut CommandParams<'_>,
    retries: u32,
) -> CdResult<CmdHandle> {
    let mut id = 0;
    for _ in 0..retries {
        id = syscalls.send_command(cmd, params);
        if id != 0 {
            break;
        }
        syscalls.exec_server();
        clock.pass();
    }

    match CmdHandle::from_raw(id) {
        Some(handle) => {
            log::trace!("submitted {:?} as #{}", cmd, handle.get());
            Ok(handle)
        },
        None => {
            log::warn!("could not submit {:?} (last id {})", cmd, id);
            Err(CdError::System)
        }
    }
}

/// Where a poll is at after a step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PollState {
    /// Still processing (or the firmware is busy). Yield and step again.
    Pending,
    /// The command reached a terminal status.
    Completed(CmdStatus, ExtStatus),
    /// The time budget ran out. The command has been aborted.
    TimedOut,
}

/// Polls one submitted command to a terminal state.
pub struct Poll {
    handle:     CmdHandle,
    /// Only set for timed polls.
    deadline:   Option<(u64, u64)>,
    state:      PollState,
}

impl Poll {
    /// `timeout_ms` of 0 polls forever.
    pub fn new<C: Clock>(handle: CmdHandle, timeout_ms: u32, clock: &C) -> Self {
        let deadline = (timeout_ms != 0).then(|| (clock.now_ms(), timeout_ms as u64));
        Self {
            handle,
            deadline,
            state: PollState::Pending,
        }
    }

    /// Tick the firmware once and look at the command.
    ///
    /// Once the poll has left [`PollState::Pending`] further steps do nothing.
    pub fn step<S: Syscalls, C: Clock>(&mut self, syscalls: &mut S, clock: &C) -> PollState {
        if self.state != PollState::Pending {
            return self.state;
        }

        syscalls.exec_server();
        let (raw, ext) = syscalls.check_command(self.handle);
        let status = CmdStatus::from_raw(raw);

        if status.is_terminal() {
            self.state = PollState::Completed(status, ext);
        } else if let Some((begin, budget)) = self.deadline {
            if clock.now_ms().saturating_sub(begin) >= budget {
                syscalls.abort_command(self.handle);
                syscalls.exec_server();
                log::error!("command #{} timed out after {} ms", self.handle.get(), budget);
                self.state = PollState::TimedOut;
            }
        }
        self.state
    }
}

/// Step a poll until it completes or times out, yielding between steps.
pub fn poll_to_completion<S: Syscalls, C: Clock>(
    syscalls: &mut S,
    clock: &C,
    handle: CmdHandle,
    timeout_ms: u32,
) -> PollState {
    let mut poll = Poll::new(handle, timeout_ms, clock);
    loop {
        match poll.step(syscalls, clock) {
            PollState::Pending => clock.pass(),
            done => return done,
        }
    }
}

/// One full command cycle: submit, poll, classify.
pub fn run<S: Syscalls, C: Clock>(
    syscalls: &mut S,
    clock: &C,
    cmd: CommandCode,
    params: &mut CommandParams<'_>,
    timeout_ms: u32,
    retries: u32,
) -> CdResult {
    let handle = submit(syscalls, clock, cmd, params, retries)?;
    match poll_to_completion(syscalls, clock, handle, timeout_ms) {
        PollState::Completed(status, ext) => {
            let result = classify(status, &ext);
            if let Err(e) = result {
                log::debug!("{:?} failed: {} (err1 {}, err2 {})", cmd, e, ext.err1, ext.err2);
            }
            result
        },
        PollState::TimedOut => Err(CdError::Timeout),
        // poll_to_completion only returns once the poll has finished.
        PollState::Pending => Err(CdError::System),
    }
}
