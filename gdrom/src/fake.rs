//! Scripted firmware for unit tests.

use std::collections::VecDeque;

use crate::state::{DiscType, DriveStatus};
use crate::syscalls::*;

/// How one submitted command plays out.
#[derive(Clone, Copy, Debug)]
pub struct Outcome {
    /// Checks that report processing before the final status.
    pub pending:    u32,
    pub status:     CmdStatus,
    pub err1:       i32,
}

impl Outcome {
    pub fn ok() -> Self {
        Self { pending: 0, status: CmdStatus::Completed, err1: 0 }
    }

    pub fn after(pending: u32) -> Self {
        Self { pending, ..Self::ok() }
    }

    pub fn failed(err1: i32) -> Self {
        Self { pending: 0, status: CmdStatus::Failed, err1 }
    }

    /// Never finishes.
    pub fn hang() -> Self {
        Self { pending: u32::MAX, ..Self::ok() }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    Reset,
    Boot,
    Send(CommandCode),
    Finished(i32),
    Abort(i32),
    Mode([u32; 4]),
}

struct Current {
    handle:     i32,
    left:       u32,
    outcome:    Outcome,
}

pub struct Scripted {
    /// Return values for the next sends, before handles are handed out.
    pub refusals:   VecDeque<i32>,
    /// Outcome of each accepted command, in order. Empty means `Outcome::ok`.
    pub outcomes:   VecDeque<Outcome>,
    /// Raw check_drive returns to give before `drive`.
    pub drive_busy: u32,
    pub drive:      (i32, [i32; 2]),
    pub mode_ret:   i32,

    pub events:     Vec<Event>,
    pub sends:      u32,
    pub ticks:      u32,
    pub aborts:     u32,
    pub drive_checks: u32,
    pub plays:      Vec<PlayParams>,

    current:        Option<Current>,
    next_handle:    i32,
}

impl Scripted {
    pub fn new() -> Self {
        Self {
            refusals:   VecDeque::new(),
            outcomes:   VecDeque::new(),
            drive_busy: 0,
            drive:      (0, [DriveStatus::Standby as i32, DiscType::CdRom as i32]),
            mode_ret:   0,

            events:     Vec::new(),
            sends:      0,
            ticks:      0,
            aborts:     0,
            drive_checks: 0,
            plays:      Vec::new(),

            current:    None,
            next_handle: 1,
        }
    }

    pub fn with_outcomes(outcomes: impl IntoIterator<Item = Outcome>) -> Self {
        let mut s = Self::new();
        s.outcomes.extend(outcomes);
        s
    }

    pub fn with_disc(mut self, disc: DiscType) -> Self {
        self.drive.1[1] = disc as i32;
        self
    }

    pub fn sent(&self) -> Vec<CommandCode> {
        self.events.iter().filter_map(|e| match e {
            Event::Send(c) => Some(*c),
            _ => None,
        }).collect()
    }

    pub fn modes(&self) -> Vec<[u32; 4]> {
        self.events.iter().filter_map(|e| match e {
            Event::Mode(m) => Some(*m),
            _ => None,
        }).collect()
    }
}

impl Syscalls for Scripted {
    fn init(&mut self) {
        self.events.push(Event::Boot);
    }

    fn reset(&mut self) {
        self.current = None;
        self.events.push(Event::Reset);
    }

    fn send_command(&mut self, cmd: CommandCode, params: &mut CommandParams<'_>) -> i32 {
        self.sends += 1;
        if let Some(r) = self.refusals.pop_front() {
            return r;
        }
        if self.current.is_some() {
            return 0;
        }
        let handle = self.next_handle;
        self.next_handle += 1;
        let outcome = self.outcomes.pop_front().unwrap_or_else(Outcome::ok);
        self.current = Some(Current { handle, left: outcome.pending, outcome });
        self.events.push(Event::Send(cmd));
        if let CommandParams::Play(play) = params {
            self.plays.push(*play);
        }
        handle
    }

    fn exec_server(&mut self) {
        self.ticks += 1;
    }

    fn check_command(&mut self, handle: CmdHandle) -> (i32, ExtStatus) {
        let Some(current) = self.current.as_mut().filter(|c| c.handle == handle.get()) else {
            return (CmdStatus::NotFound as i32, ExtStatus::default());
        };
        if current.left > 0 {
            if current.left != u32::MAX {
                current.left -= 1;
            }
            return (CmdStatus::Processing as i32, ExtStatus::default());
        }
        let outcome = current.outcome;
        self.current = None;
        self.events.push(Event::Finished(handle.get()));
        (outcome.status as i32, ExtStatus { err1: outcome.err1, ..Default::default() })
    }

    fn abort_command(&mut self, handle: CmdHandle) -> i32 {
        self.aborts += 1;
        self.events.push(Event::Abort(handle.get()));
        if self.current.as_ref().is_some_and(|c| c.handle == handle.get()) {
            self.current = None;
            0
        } else {
            -1
        }
    }

    fn check_drive(&mut self) -> (i32, [i32; 2]) {
        self.drive_checks += 1;
        if self.drive_busy > 0 {
            self.drive_busy -= 1;
            return (CmdStatus::Busy as i32, [0, 0]);
        }
        self.drive
    }

    fn sector_mode(&mut self, params: [u32; 4]) -> i32 {
        self.events.push(Event::Mode(params));
        self.mode_ret
    }
}
