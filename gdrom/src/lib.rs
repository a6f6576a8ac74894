mod utils;
pub mod syscalls;
pub mod clock;
pub mod gate;
pub mod command;
pub mod error;
pub mod state;
pub mod sector;
pub mod toc;
pub mod sim;
pub mod service;

#[cfg(test)]
mod fake;

pub use crate::clock::{Clock, SystemClock, VirtualClock};
pub use crate::error::{CdError, CdResult, SyscallError};
pub use crate::sector::{SectorFormat, SectorMode, SectorPart, TrackType};
pub use crate::state::{DiscType, DriveState, DriveStatus};
pub use crate::syscalls::{Area, CommandCode, CommandParams, QChannel, SubcodeAudio, SubcodeType, Syscalls};
pub use crate::toc::{Toc, TocEntry};

use crate::gate::{DriveGate, GateGuard};
use crate::syscalls::{sector_mode_params, CmdStatus, PlayParams, ReadParams};

/// Config for the drive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DriveConfig {
    /// Attempts at submitting a command before giving up.
    pub retry_max:          u32,
    /// Budget for each INIT while reinitialising, in ms.
    pub reinit_timeout_ms:  u32,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            retry_max:          command::CMD_RETRY_MAX,
            reinit_timeout_ms:  10000,
        }
    }
}

/// How sector data is transferred.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReadMode {
    #[default]
    Pio,
    Dma,
}

/// What the start and end of a CDDA play request count.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CddaMode {
    Tracks,
    Sectors,
}

/// The GD-ROM drive.
///
/// Every operation takes `&self`: callers on any thread share one `Cdrom`
/// and the drive gate serialises their command cycles.
pub struct Cdrom<S, C = SystemClock> {
    gate:   DriveGate<S>,
    clock:  C,
    config: DriveConfig,
}

impl<S: Syscalls> Cdrom<S> {
    pub fn new(syscalls: S) -> Self {
        Self::with_config(syscalls, SystemClock::new(), DriveConfig::default())
    }
}

impl<S: Syscalls, C: Clock> Cdrom<S, C> {
    pub fn with_config(syscalls: S, clock: C, config: DriveConfig) -> Self {
        Self {
            gate: DriveGate::new(syscalls),
            clock,
            config,
        }
    }

    pub fn config(&self) -> &DriveConfig {
        &self.config
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Direct access to the firmware, for anything not covered here.
    pub fn gate(&self) -> &DriveGate<S> {
        &self.gate
    }

    pub fn into_inner(self) -> S {
        self.gate.into_inner()
    }

    /// Reset the firmware and bring the drive up.
    pub fn init(&self) -> CdResult<SectorMode> {
        {
            let mut fw = self.gate.lock();
            fw.reset();
            fw.init();
        }
        self.reinit()
    }
}

// Command cycles
impl<S: Syscalls, C: Clock> Cdrom<S, C> {
    /// Run a command to completion, however long it takes.
    pub fn exec_cmd(&self, cmd: CommandCode, params: &mut CommandParams<'_>) -> CdResult {
        self.exec_cmd_timed(cmd, params, 0)
    }

    /// Run a command, aborting it after `timeout_ms`. 0 waits forever.
    pub fn exec_cmd_timed(&self, cmd: CommandCode, params: &mut CommandParams<'_>, timeout_ms: u32) -> CdResult {
        let mut fw = self.gate.lock();
        command::run(&mut *fw, &self.clock, cmd, params, timeout_ms, self.config.retry_max)
    }

    /// Read the drive status, waiting for any command cycle in progress.
    pub fn get_status(&self) -> CdResult<DriveState> {
        let fw = self.gate.lock();
        self.drive_state(fw)
    }

    /// Read the drive status without waiting for the gate.
    ///
    /// Safe to call from a context that must not block. Fails with
    /// [`CdError::Contended`] if a command cycle is in progress.
    pub fn try_get_status(&self) -> CdResult<DriveState> {
        let fw = self.gate.try_lock().ok_or(CdError::Contended)?;
        self.drive_state(fw)
    }

    fn drive_state(&self, mut fw: GateGuard<'_, S>) -> CdResult<DriveState> {
        let (rv, words) = loop {
            let (rv, words) = fw.check_drive();
            if rv != CmdStatus::Busy as i32 {
                break (rv, words);
            }
            self.clock.pass();
        };
        drop(fw);

        if rv < 0 {
            log::debug!("drive check failed ({})", rv);
            return Err(CdError::System);
        }
        DriveState::from_words(words).ok_or_else(|| {
            log::warn!("undecodable drive state {:?}", words);
            CdError::System
        })
    }

    /// Resolve `format` against the disc and set it as the sector mode.
    pub fn change_datatype(&self, format: SectorFormat) -> Result<SectorMode, SyscallError> {
        let mut fw = self.gate.lock();
        let mode = SectorMode::resolve(format, || {
            let (rv, words) = fw.check_drive();
            if rv < 0 || rv == CmdStatus::Busy as i32 {
                log::warn!("could not read disc type ({}), assuming CD-ROM", rv);
                return None;
            }
            DiscType::from_raw(words[1])
        });

        match fw.sector_mode(sector_mode_params(&mode)) {
            0 => {
                log::debug!("sector mode {:?}", mode);
                Ok(mode)
            },
            rv => {
                log::warn!("sector mode {:?} refused ({})", mode, rv);
                Err(SyscallError(rv))
            }
        }
    }

    /// Initialise the drive after a disc change, then set the sector format.
    ///
    /// INIT is repeated for as long as the drive reports a disc change.
    pub fn reinit_ex(&self, format: SectorFormat) -> CdResult<SectorMode> {
        loop {
            match self.exec_cmd_timed(CommandCode::Init, &mut CommandParams::None, self.config.reinit_timeout_ms) {
                Err(CdError::DiscChanged) => log::debug!("disc changed during INIT, retrying"),
                Err(e @ (CdError::NoDisc | CdError::System | CdError::Timeout)) => return Err(e),
                _ => break,
            }
        }
        Ok(self.change_datatype(format)?)
    }

    /// Reinitialise with the default sector format.
    pub fn reinit(&self) -> CdResult<SectorMode> {
        self.reinit_ex(SectorFormat::default())
    }

    pub fn set_sector_size(&self, size: u32) -> CdResult<SectorMode> {
        self.reinit_ex(SectorFormat::with_size(size))
    }
}

// Disc access
impl<S: Syscalls, C: Clock> Cdrom<S, C> {
    pub fn read_toc(&self, area: Area) -> CdResult<Toc> {
        let mut toc = Toc::default();
        self.exec_cmd(CommandCode::GetToc2, &mut CommandParams::Toc {
            area,
            buffer: &mut toc,
        })?;
        Ok(toc)
    }

    /// Read `count` sectors starting at FAD `sector`, each of the current
    /// sector size.
    pub fn read_sectors_ex(&self, buffer: &mut [u8], sector: u32, count: usize, mode: ReadMode) -> CdResult {
        let cmd = match mode {
            ReadMode::Pio => CommandCode::PioRead,
            ReadMode::Dma => CommandCode::DmaRead,
        };
        self.exec_cmd(cmd, &mut CommandParams::Read(ReadParams {
            start_sec:  sector,
            num_sec:    count,
            buffer,
            is_test:    false,
        }))
    }

    pub fn read_sectors(&self, buffer: &mut [u8], sector: u32, count: usize) -> CdResult {
        self.read_sectors_ex(buffer, sector, count, ReadMode::Pio)
    }

    pub fn get_subcode(&self, buffer: &mut [u8], which: SubcodeType) -> CdResult {
        self.exec_cmd(CommandCode::GetScd, &mut CommandParams::Subcode { which, buffer })
    }
}

// CDDA
impl<S: Syscalls, C: Clock> Cdrom<S, C> {
    /// Play audio from `start` to `end`. A `repeat` of 15 or more loops
    /// forever.
    pub fn cdda_play(&self, start: u32, end: u32, repeat: u32, mode: CddaMode) -> CdResult {
        let cmd = match mode {
            CddaMode::Tracks => CommandCode::Play,
            CddaMode::Sectors => CommandCode::Play2,
        };
        self.exec_cmd(cmd, &mut CommandParams::Play(PlayParams {
            start,
            end,
            repeat: repeat.min(15),
        }))
    }

    pub fn cdda_pause(&self) -> CdResult {
        self.exec_cmd(CommandCode::Pause, &mut CommandParams::None)
    }

    pub fn cdda_resume(&self) -> CdResult {
        self.exec_cmd(CommandCode::Release, &mut CommandParams::None)
    }

    pub fn spin_down(&self) -> CdResult {
        self.exec_cmd(CommandCode::Stop, &mut CommandParams::None)
    }
}
