//! A simulated GD-ROM controller.
//!
//! Commands are evaluated when they are accepted and then held for a number
//! of `exec_server` ticks before `check_command` reports the result. One
//! command is in flight at a time, as on the real processor.

mod cue;
mod disc;
#[cfg(test)]
mod test;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub use cue::{CueError, CueSheet, CueTrack, CueTrackType};
pub use disc::{Msf, SimDisc, SimTrack, TrackKind, FRAMES_PER_SECOND, PREGAP_FRAMES};

use crate::sector::{SectorMode, TrackType};
use crate::state::{DiscType, DriveStatus};
use crate::syscalls::*;
use crate::toc::TOC_SIZE;
use crate::utils::bcd::{frames_to_bcd_msf, to_bcd};

const Q_CHANNEL_SIZE: usize = QChannel::SIZE;
/// Bytes in a full Q subcode report.
const Q_ALL_SIZE: usize = 100;
/// Bytes in a media catalog or ISRC report.
const CODE_REPORT_SIZE: usize = 24;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SimConfig {
    /// Ticks between accepting a command and reporting its result.
    pub latency: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self { latency: 4 }
    }
}

/// Counters for what the controller has been asked to do.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SimStats {
    pub submits:    u32,
    pub refused:    u32,
    pub commands:   u32,
    pub aborts:     u32,
    pub inits:      u32,
    pub mode_sets:  u32,
    pub ticks:      u64,
}

struct Slot {
    disc:       Option<Arc<SimDisc>>,
    /// Set by any insert or eject. Cleared by the next INIT.
    changed:    bool,
}

/// The disc tray, shared between the controller and whoever swaps discs.
#[derive(Clone)]
pub struct Tray {
    slot: Arc<Mutex<Slot>>,
}

impl Tray {
    fn new(disc: Option<SimDisc>) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Slot {
                disc: disc.map(Arc::new),
                changed: false,
            }))
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Put a disc in. The drive sees a disc change.
    pub fn insert(&self, disc: SimDisc) {
        let mut slot = self.lock();
        slot.disc = Some(Arc::new(disc));
        slot.changed = true;
        log::info!("disc inserted");
    }

    pub fn eject(&self) {
        let mut slot = self.lock();
        slot.disc = None;
        slot.changed = true;
        log::info!("disc ejected");
    }

    pub fn disc(&self) -> Option<Arc<SimDisc>> {
        self.lock().disc.clone()
    }

    fn snapshot(&self) -> (Option<Arc<SimDisc>>, bool) {
        let slot = self.lock();
        (slot.disc.clone(), slot.changed)
    }

    fn clear_changed(&self) {
        self.lock().changed = false;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Audio {
    Idle,
    Playing,
    Paused,
}

#[derive(Clone, Copy, Debug)]
struct Playback {
    state:  Audio,
    start:  u32,
    /// Current FAD.
    pos:    u32,
    end:    u32,
    repeat: u32,
}

impl Playback {
    const IDLE: Playback = Playback { state: Audio::Idle, start: 0, pos: 0, end: 0, repeat: 0 };
}

struct Active {
    handle:     i32,
    cmd:        CommandCode,
    ticks_left: u32,
    status:     CmdStatus,
    ext:        ExtStatus,
}

/// Ok holds the bytes transferred, Err the `err1` code.
type DriveResult<T = usize> = Result<T, i32>;

pub struct SimController {
    config:         SimConfig,
    tray:           Tray,
    mode:           SectorMode,
    playback:       Playback,

    active:         Option<Active>,
    next_handle:    i32,

    refuse:         u32,
    stall:          bool,
    busy_checks:    u32,

    stats:          SimStats,
}

impl SimController {
    pub fn new(config: SimConfig) -> Self {
        Self::with_tray(config, Tray::new(None))
    }

    /// A controller that powers on with `disc` already in the tray.
    pub fn with_disc(config: SimConfig, disc: SimDisc) -> Self {
        Self::with_tray(config, Tray::new(Some(disc)))
    }

    fn with_tray(config: SimConfig, tray: Tray) -> Self {
        Self {
            config,
            tray,
            mode:           SectorMode::default(),
            playback:       Playback::IDLE,

            active:         None,
            next_handle:    1,

            refuse:         0,
            stall:          false,
            busy_checks:    0,

            stats:          SimStats::default(),
        }
    }

    pub fn tray(&self) -> Tray {
        self.tray.clone()
    }

    pub fn stats(&self) -> SimStats {
        self.stats
    }

    /// The sector mode reads currently use.
    pub fn mode(&self) -> SectorMode {
        self.mode
    }

    /// Refuse the next `n` submissions as if the processor were full.
    pub fn refuse_submits(&mut self, n: u32) {
        self.refuse = n;
    }

    /// A stalled controller never finishes its command.
    pub fn set_stall(&mut self, stall: bool) {
        self.stall = stall;
    }

    /// Answer the next `n` drive checks with busy.
    pub fn report_busy(&mut self, n: u32) {
        self.busy_checks = n;
    }
}

// Command evaluation
impl SimController {
    fn execute(&mut self, cmd: CommandCode, params: &mut CommandParams<'_>) -> DriveResult {
        let (disc, changed) = self.tray.snapshot();

        match cmd {
            CommandCode::Init => {
                self.stats.inits += 1;
                if disc.is_none() {
                    return Err(ERR1_NO_DISC);
                }
                if changed {
                    self.tray.clear_changed();
                    return Err(ERR1_DISC_CHANGED);
                }
                self.mode = SectorMode::default();
                self.playback = Playback::IDLE;
                Ok(0)
            },
            CommandCode::Stop => {
                self.playback.state = Audio::Idle;
                Ok(0)
            },
            cmd if cmd.needs_disc() => {
                let Some(disc) = disc else {
                    return Err(ERR1_NO_DISC);
                };
                if changed {
                    return Err(ERR1_DISC_CHANGED);
                }
                self.disc_command(&disc, cmd, params)
            },
            _ => Ok(0),
        }
    }

    fn disc_command(&mut self, disc: &SimDisc, cmd: CommandCode, params: &mut CommandParams<'_>) -> DriveResult {
        use CommandCode::*;
        match (cmd, params) {
            (PioRead | DmaRead, CommandParams::Read(read)) => self.read(disc, read),
            (GetToc | GetToc2, CommandParams::Toc { area, buffer }) => {
                if *area != Area::Low {
                    return Err(ERR1_ILLEGAL_REQUEST);
                }
                **buffer = disc.toc();
                Ok(TOC_SIZE)
            },
            (Play, CommandParams::Play(play)) => {
                let track = |n: u32| u8::try_from(n).ok().and_then(|n| disc.track(n));
                let first = track(play.start).ok_or(ERR1_ILLEGAL_REQUEST)?;
                let last = track(play.end).ok_or(ERR1_ILLEGAL_REQUEST)?;
                if first.start > last.start {
                    return Err(ERR1_ILLEGAL_REQUEST);
                }
                self.start_playback(first.start, last.end(), play.repeat);
                Ok(0)
            },
            (Play2, CommandParams::Play(play)) => {
                if play.start >= play.end || play.end > disc.leadout() {
                    return Err(ERR1_ILLEGAL_REQUEST);
                }
                self.start_playback(play.start, play.end, play.repeat);
                Ok(0)
            },
            (Pause, _) => {
                if self.playback.state == Audio::Playing {
                    self.playback.state = Audio::Paused;
                }
                Ok(0)
            },
            (Release, _) => {
                if self.playback.state == Audio::Paused {
                    self.playback.state = Audio::Playing;
                }
                Ok(0)
            },
            (GetScd, CommandParams::Subcode { which, buffer }) => Ok(self.subcode(disc, *which, buffer)),
            (PioRead | DmaRead | GetToc | GetToc2 | Play | Play2 | GetScd, _) => Err(ERR1_ILLEGAL_REQUEST),
            _ => Ok(0),
        }
    }

    fn read(&self, disc: &SimDisc, read: &mut ReadParams<'_>) -> DriveResult {
        let size = self.mode.size as usize;
        let total = read.num_sec.checked_mul(size).ok_or(ERR1_ILLEGAL_REQUEST)?;
        if read.num_sec == 0 || read.buffer.len() < total {
            return Err(ERR1_ILLEGAL_REQUEST);
        }
        let end = read.start_sec.checked_add(read.num_sec as u32).ok_or(ERR1_ILLEGAL_REQUEST)?;
        if read.start_sec < PREGAP_FRAMES || end > disc.leadout() {
            return Err(ERR1_ILLEGAL_REQUEST);
        }
        let data_mode = !matches!(self.mode.track_type, TrackType::Any | TrackType::Cdda);
        for fad in read.start_sec..end {
            let audio = disc.track_at(fad).is_none_or(|t| t.kind == TrackKind::Audio);
            if audio && data_mode {
                return Err(ERR1_ILLEGAL_REQUEST);
            }
        }
        if read.is_test {
            return Ok(0);
        }

        for (fad, sector) in (read.start_sec..end).zip(read.buffer.chunks_exact_mut(size)) {
            disc.fill_sector(fad, &self.mode, sector);
        }
        Ok(total)
    }

    fn start_playback(&mut self, start: u32, end: u32, repeat: u32) {
        self.playback = Playback { state: Audio::Playing, start, pos: start, end, repeat };
        log::debug!("playing {}..{} repeat {}", start, end, repeat);
    }

    /// Advance playback by one sector.
    fn play_sector(&mut self) {
        let pb = &mut self.playback;
        if pb.state != Audio::Playing {
            return;
        }
        pb.pos += 1;
        if pb.pos < pb.end {
            return;
        }
        match pb.repeat {
            // Forever.
            15 => pb.pos = pb.start,
            0 => {
                pb.state = Audio::Idle;
                pb.pos = pb.end;
            },
            _ => {
                pb.repeat -= 1;
                pb.pos = pb.start;
            }
        }
    }

    fn audio_status(&self) -> SubcodeAudio {
        match self.playback.state {
            Audio::Playing => SubcodeAudio::Playing,
            Audio::Paused => SubcodeAudio::Paused,
            Audio::Idle if self.playback.end != 0 && self.playback.pos >= self.playback.end => SubcodeAudio::Ended,
            Audio::Idle => SubcodeAudio::NoInfo,
        }
    }

    /// Write the subcode report into `buffer`. Returns the bytes written.
    fn subcode(&self, disc: &SimDisc, which: SubcodeType, buffer: &mut [u8]) -> usize {
        let mut report = [0_u8; Q_ALL_SIZE];
        let len = match which {
            SubcodeType::QChannel => Q_CHANNEL_SIZE,
            SubcodeType::QAll => Q_ALL_SIZE,
            _ => CODE_REPORT_SIZE,
        };
        report[1] = self.audio_status() as u8;
        report[3] = len as u8;

        if which == SubcodeType::QChannel {
            let pos = self.playback.pos;
            if let Some(track) = disc.track_at(pos) {
                report[4] = (track.kind.control().bits() << 4) | 1;
                report[5] = to_bcd(track.number).unwrap_or(0);
                report[6] = 0x01;
                report[7..10].copy_from_slice(&frames_to_bcd_msf(pos - track.start));
                report[11..14].copy_from_slice(&frames_to_bcd_msf(pos));
            }
        }

        let n = len.min(buffer.len());
        buffer[..n].copy_from_slice(&report[..n]);
        n
    }
}

impl Syscalls for SimController {
    fn init(&mut self) {
        log::debug!("controller up");
    }

    fn reset(&mut self) {
        self.active = None;
        self.playback = Playback::IDLE;
    }

    fn send_command(&mut self, cmd: CommandCode, params: &mut CommandParams<'_>) -> i32 {
        self.stats.submits += 1;
        if self.refuse > 0 || self.active.is_some() {
            self.refuse = self.refuse.saturating_sub(1);
            self.stats.refused += 1;
            return 0;
        }

        let (status, ext) = match self.execute(cmd, params) {
            Ok(size) => (CmdStatus::Completed, ExtStatus { size, ..Default::default() }),
            Err(err1) => (CmdStatus::Failed, ExtStatus { err1, ..Default::default() }),
        };
        let handle = self.next_handle;
        self.next_handle = self.next_handle.checked_add(1).unwrap_or(1);
        self.active = Some(Active { handle, cmd, ticks_left: self.config.latency, status, ext });
        self.stats.commands += 1;
        log::trace!("accepted {:?} as #{}", cmd, handle);
        handle
    }

    fn exec_server(&mut self) {
        self.stats.ticks += 1;
        self.play_sector();
        if self.stall {
            return;
        }
        if let Some(active) = self.active.as_mut() {
            active.ticks_left = active.ticks_left.saturating_sub(1);
        }
    }

    fn check_command(&mut self, handle: CmdHandle) -> (i32, ExtStatus) {
        match self.active.as_ref() {
            Some(active) if active.handle == handle.get() => {
                if self.stall || active.ticks_left > 0 {
                    return (CmdStatus::Processing as i32, ExtStatus::default());
                }
            },
            _ => return (CmdStatus::NotFound as i32, ExtStatus::default()),
        }
        match self.active.take() {
            Some(done) => {
                log::trace!("#{} {:?} finished: {:?}", done.handle, done.cmd, done.status);
                (done.status as i32, done.ext)
            },
            None => (CmdStatus::NotFound as i32, ExtStatus::default()),
        }
    }

    fn abort_command(&mut self, handle: CmdHandle) -> i32 {
        self.stats.aborts += 1;
        if self.active.as_ref().is_some_and(|a| a.handle == handle.get()) {
            self.active = None;
            0
        } else {
            -1
        }
    }

    fn check_drive(&mut self) -> (i32, [i32; 2]) {
        if self.busy_checks > 0 {
            self.busy_checks -= 1;
            return (CmdStatus::Busy as i32, [0, 0]);
        }
        let disc = self.tray.disc();
        let status = match (&disc, self.playback.state) {
            (None, _) => DriveStatus::NoDisc,
            (Some(_), Audio::Playing) => DriveStatus::Playing,
            (Some(_), Audio::Paused) => DriveStatus::Paused,
            (Some(_), Audio::Idle) if self.active.is_some() => DriveStatus::Busy,
            (Some(_), Audio::Idle) => DriveStatus::Standby,
        };
        let disc_type = disc.map_or(DiscType::Cdda, |d| d.disc_type());
        (0, [status as i32, disc_type as i32])
    }

    fn sector_mode(&mut self, params: [u32; 4]) -> i32 {
        match SectorMode::from_params(params) {
            Some(mode) if (2048..=2352).contains(&mode.size) => {
                self.mode = mode;
                self.stats.mode_sets += 1;
                0
            },
            _ => {
                log::warn!("rejected sector mode {:x?}", params);
                -1
            }
        }
    }
}
